// Routines for reading input files
pub mod datafile;
// Routines for the per-step estimation
pub mod estimation;
// Routines for scoring reconstructions
pub mod evaluation;
// Routines for logging
pub mod logger;
// NaN-aware reductions
pub mod math;
// Routines for output
pub mod output;
// Routines for resampling fields
pub mod regrid;
// Routines for settings
pub mod settings;
// Routines for time conversion
pub mod time;

pub mod field;
pub mod grid;
pub mod observations;
pub mod parameters;

// Spectral scores
pub mod psd;
// RMSE scores
pub mod rmse;

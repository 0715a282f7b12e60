// Covariance kernel
pub mod kernel;
// Linear solvers for the observation covariance
pub mod linalg;
// Solve a single time step
pub mod step;

pub mod observer;
pub mod oi;

mod driver;
pub mod calibration;

pub use driver::*;

//! Parameter calibration: a calibration objective driven by a box-constrained
//! global minimiser.

pub mod calibrator;
pub mod optimizer;

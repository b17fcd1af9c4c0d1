//! Technical indicators computed from closing-price series.

pub mod momentum;

pub use momentum::*;

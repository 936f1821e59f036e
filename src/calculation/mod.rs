//! Calculation utilities shared by every days-supply strategy and signature builder.
//!
//! Pure, stateless helpers: period conversion, unit classification and
//! conversion, dispenser and strength-ratio conversion, float-safe rounding,
//! and the composite consumption-per-day calculation.

pub mod consumption;
pub mod duration;
pub mod precision;
pub mod units;

pub use consumption::*;
pub use duration::*;
pub use precision::*;
pub use units::*;

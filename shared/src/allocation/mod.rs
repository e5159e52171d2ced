//! Stock allocation engine
//!
//! Request + batches → availability → auto-fill plan → optional manual
//! adjustment → validation → issuance payload. Every entry point is a pure,
//! synchronous function over immutable inputs.

mod adjustment;
mod availability;
mod issuance;
mod planner;

pub use adjustment::*;
pub use availability::*;
pub use issuance::*;
pub use planner::*;

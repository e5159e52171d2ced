//! Domain models for sowing-request stock allocation

mod batch;
mod context;
mod issuance;
mod plan;
mod request;

pub use batch::*;
pub use context::*;
pub use issuance::*;
pub use plan::*;
pub use request::*;

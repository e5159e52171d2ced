//! Stock allocation engine for sowing requests
//!
//! Given a requested quantity and stock batches recorded in either of two
//! units, builds a plan that covers the request exactly (within 0.01)
//! without drawing more than any batch holds. Shared by the backend
//! service and the browser dialog (via WASM).

pub mod allocation;
pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use allocation::*;
pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;

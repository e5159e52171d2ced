//! HTTP request handlers

pub mod allocation;
pub mod health;

pub use allocation::*;
pub use health::*;

//! Business logic services for the allocation server

pub mod allocation;

pub use allocation::AllocationService;

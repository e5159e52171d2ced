//! External API integrations
//!
//! The allocation service reaches the inventory system only through
//! [`StockGateway`], so tests can substitute an in-memory fake.

pub mod inventory;

use std::future::Future;

use shared::{IssuanceOutcome, IssueStockRequest, SowingRequest};

use crate::error::AppResult;

pub use inventory::InventoryApiClient;

/// GetRequest / IssueStock boundary of the inventory system
pub trait StockGateway: Send + Sync {
    /// Fresh snapshot of the request and its candidate batches
    fn get_request(
        &self,
        request_id: &str,
    ) -> impl Future<Output = AppResult<SowingRequest>> + Send;

    /// Commit a validated plan. The executor re-checks stock atomically and
    /// either applies every row or none.
    fn issue_stock(
        &self,
        request_id: &str,
        payload: &IssueStockRequest,
    ) -> impl Future<Output = AppResult<IssuanceOutcome>> + Send;
}

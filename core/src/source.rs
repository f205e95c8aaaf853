//! The data-source capability the engine reads through.
//!
//! The engine never talks to storage directly. A `DataSource` is handed
//! to the assembler; production code passes a `ReportStore`, tests pass
//! in-memory fakes.

use crate::{
    error::ReportResult,
    filter::{DateWindow, ReportFilter},
    model::{DailyPerformance, InteractionEvent, LoanRecord, RawPromise, Specialist},
    types::DataOrigin,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Profile of one specialist.
    async fn specialist(&self, specialist_id: &str) -> ReportResult<Specialist>;

    /// All active specialists.
    async fn specialists(&self) -> ReportResult<Vec<Specialist>>;

    /// Cases assigned to the specialist. Implementations may push the
    /// filter down; the engine re-applies it either way. `limit` counts
    /// cases that pass the filter, so it must not be applied to rows that
    /// are filtered afterwards.
    async fn loan_cases(
        &self,
        specialist_id: &str,
        filter: &ReportFilter,
        limit: usize,
    ) -> ReportResult<Vec<LoanRecord>>;

    /// Interactions logged by the specialist inside the window.
    async fn interactions(
        &self,
        specialist_id: &str,
        window: &DateWindow,
    ) -> ReportResult<Vec<InteractionEvent>>;

    /// Promises recorded by the specialist whose date falls in the window,
    /// plus every still-active promise.
    async fn promises(
        &self,
        specialist_id: &str,
        window: &DateWindow,
    ) -> ReportResult<Vec<RawPromise>>;

    /// Daily officer metrics inside the window, any order.
    async fn performance_history(
        &self,
        specialist_id: &str,
        window: &DateWindow,
    ) -> ReportResult<Vec<DailyPerformance>>;
}

/// One report slice together with where it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sourced<T> {
    pub origin: DataOrigin,
    pub value:  T,
    /// Why the live fetch failed, for fallback slices.
    pub error:  Option<String>,
}

impl<T> Sourced<T> {
    pub fn live(value: T) -> Self {
        Self { origin: DataOrigin::Live, value, error: None }
    }

    pub fn fallback(value: T, error: impl Into<String>) -> Self {
        Self {
            origin: DataOrigin::Fallback,
            value,
            error:  Some(error.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.origin.is_fallback()
    }
}

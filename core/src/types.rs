//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};

/// A collections officer identifier (e.g. "OFF001").
pub type SpecialistId = String;

/// A loan or case identifier. Cases are keyed by their loan account.
pub type LoanId = String;

/// A customer identifier. Loans reference customers only by id.
pub type CustomerId = String;

/// Where a slice of report data came from.
///
/// Every slice carries this tag explicitly; nothing downstream infers
/// it from sentinel ids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Live,
    Fallback,
}

impl DataOrigin {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live     => "live",
            Self::Fallback => "fallback",
        }
    }
}

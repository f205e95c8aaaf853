//! Assembly diagnostics: what happened while one report was built.
//!
//! Every slice resolution and state transition is recorded here and
//! returned with the outcome, so a caller can see exactly which parts of
//! a report are sample data and why.

use crate::types::DataOrigin;
use serde::{Deserialize, Serialize};

/// Report slices fetched independently during assembly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Slice {
    Specialist,
    Loans,
    Interactions,
    Promises,
    Performance,
}

impl Slice {
    pub const ALL: [Slice; 5] = [
        Slice::Specialist,
        Slice::Loans,
        Slice::Interactions,
        Slice::Promises,
        Slice::Performance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Specialist   => "specialist",
            Self::Loans        => "loans",
            Self::Interactions => "interactions",
            Self::Promises     => "promises",
            Self::Performance  => "performance",
        }
    }
}

/// Lifecycle of one assembly. There is no failed state: every path ends
/// in a usable report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyState {
    Idle,
    FetchingSlices,
    Aggregating,
    Assembled,
    FallbackAssembled,
}

impl AssemblyState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Assembled | Self::FallbackAssembled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssemblyEvent {
    StateChanged {
        from: AssemblyState,
        to:   AssemblyState,
    },
    SliceResolved {
        slice:   Slice,
        origin:  DataOrigin,
        records: usize,
    },
    SliceFailed {
        slice:  Slice,
        reason: String,
    },
    FilterCorrected {
        field:   String,
        value:   String,
        applied: String,
    },
}

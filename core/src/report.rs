//! The assembled report and the envelope it is returned in.

use crate::{
    analysis::{RiskAnalysis, SegmentStat, TimelineEvent},
    communication::{CommunicationStats, DailyStat},
    event::{AssemblyEvent, AssemblyState, Slice},
    filter::{DateWindow, ReportFilter},
    kpi::{KpiSet, PerformanceMetrics, ReportSummary},
    model::{LoanCase, Specialist},
    promise::{PromiseSummary, TrackedPromise},
    trend::TrendPoint,
    types::DataOrigin,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistReport {
    pub specialist:         Specialist,
    pub kpis:               KpiSet,
    pub summary:            ReportSummary,
    pub loans:              Vec<LoanCase>,
    pub communication_data: Vec<DailyStat>,
    pub communication_stats: CommunicationStats,
    pub promises_to_pay:    Vec<TrackedPromise>,
    pub promise_summary:    PromiseSummary,
    pub performance:        PerformanceMetrics,
    pub trends:             Vec<TrendPoint>,
    pub customer_segments:  Vec<SegmentStat>,
    pub risk_analysis:      RiskAnalysis,
    pub timeline:           Vec<TimelineEvent>,
    pub filter:             ReportFilter,
    pub period:             DateWindow,
    pub generated_at:       DateTime<Utc>,
}

/// Origin of each slice that fed the report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SliceSources {
    pub specialist:   DataOrigin,
    pub loans:        DataOrigin,
    pub interactions: DataOrigin,
    pub promises:     DataOrigin,
    pub performance:  DataOrigin,
}

impl SliceSources {
    pub fn get(&self, slice: Slice) -> DataOrigin {
        match slice {
            Slice::Specialist   => self.specialist,
            Slice::Loans        => self.loans,
            Slice::Interactions => self.interactions,
            Slice::Promises     => self.promises,
            Slice::Performance  => self.performance,
        }
    }

    pub fn fallback_slices(&self) -> Vec<Slice> {
        Slice::ALL
            .into_iter()
            .filter(|slice| self.get(*slice).is_fallback())
            .collect()
    }
}

/// What the assembler hands back. `success == false` means some slices
/// are sample data; `data` is always a complete report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutcome {
    pub success:     bool,
    pub data:        SpecialistReport,
    pub error:       Option<String>,
    pub sources:     SliceSources,
    pub state:       AssemblyState,
    pub diagnostics: Vec<AssemblyEvent>,
}

impl ReportOutcome {
    /// The dashboard shows a "showing sample data" notice when this is set.
    pub fn uses_sample_data(&self) -> bool {
        !self.success
    }
}

/// Specialist list with the same success contract as a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterOutcome {
    pub success: bool,
    pub data:    Vec<Specialist>,
    pub error:   Option<String>,
    pub origin:  DataOrigin,
}

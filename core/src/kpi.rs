//! KPI aggregation: loan totals plus the communication and promise
//! rollups folded into one KPI set, and the performance scorecard built
//! on top of it.
//!
//! Every rate goes through `rates::percent`; an empty portfolio, a day
//! with no calls or a specialist with no promises all yield 0.

use crate::{
    communication::CommunicationStats,
    model::{DailyPerformance, LoanCase},
    promise::PromiseSummary,
    rates::{clamp_pct, mean, percent, round1},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KpiSet {
    pub total_loans:           usize,
    pub total_portfolio_value: f64,
    pub total_outstanding:     f64,
    pub total_overdue_amount:  f64,
    pub total_collected:       f64,
    pub collection_rate:       f64,
    pub overdue_rate:          f64,
    pub conversion_rate:       f64,
    pub average_dpd:           f64,
    pub promises_count:        u32,
    pub active_promises:       u32,
    pub total_calls:           u32,
    pub total_messages:        u32,
    pub response_rate:         f64,
    pub fulfillment_rate:      f64,
}

pub fn aggregate(
    loans: &[LoanCase],
    comm: &CommunicationStats,
    promises: &PromiseSummary,
) -> KpiSet {
    let total_portfolio_value: f64 = loans.iter().map(|l| l.loan_amount).sum();
    let total_overdue_amount: f64 = loans.iter().map(|l| l.overdue_amount).sum();
    let total_outstanding: f64 = loans.iter().map(|l| l.outstanding_balance).sum();
    let total_collected: f64 = loans.iter().map(|l| l.paid_amount).sum();
    let loans_count = loans.len() as f64;

    KpiSet {
        total_loans: loans.len(),
        total_portfolio_value,
        total_outstanding,
        total_overdue_amount,
        total_collected,
        collection_rate: round1(percent(
            total_portfolio_value - total_overdue_amount,
            total_portfolio_value,
        )),
        overdue_rate: round1(percent(total_overdue_amount, total_portfolio_value)),
        conversion_rate: round1(percent(promises.total as f64, loans_count)),
        average_dpd: round1(mean(loans.iter().map(|l| l.dpd as f64))),
        promises_count: promises.total,
        active_promises: promises.pending,
        total_calls: comm.total_calls,
        total_messages: comm.total_messages,
        response_rate: comm.response_rate,
        fulfillment_rate: promises.fulfillment_rate,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub collection_rate:  f64,
    pub response_rate:    f64,
    pub promise_rate:     f64,
    pub fulfillment_rate: f64,
    pub efficiency:       f64,
    pub quality_score:    f64,
}

/// Build the scorecard. Daily history, when present, drives the
/// response/promise/fulfillment rates as a mean of per-day rates;
/// otherwise the live aggregates are used directly.
pub fn performance(
    kpis: &KpiSet,
    comm: &CommunicationStats,
    promises: &PromiseSummary,
    history: &[DailyPerformance],
) -> PerformanceMetrics {
    let (response_rate, promise_rate, fulfillment_rate) = if history.is_empty() {
        (comm.response_rate, comm.promise_rate, promises.fulfillment_rate)
    } else {
        (
            mean(history.iter().map(|d| percent(d.calls_answered as f64, d.calls_made as f64))),
            mean(history.iter().map(|d| percent(d.promises_made as f64, d.calls_answered as f64))),
            mean(history.iter().map(|d| percent(d.promises_kept as f64, d.promises_made as f64))),
        )
    };
    let collection_rate = kpis.collection_rate;

    let efficiency = mean([collection_rate, response_rate, fulfillment_rate]);
    let quality_score = 0.4 * fulfillment_rate
        + 0.3 * response_rate
        + 0.3 * (100.0 - kpis.overdue_rate);

    PerformanceMetrics {
        collection_rate,
        response_rate:    round1(clamp_pct(response_rate)),
        promise_rate:     round1(clamp_pct(promise_rate)),
        fulfillment_rate: round1(clamp_pct(fulfillment_rate)),
        efficiency:       round1(clamp_pct(efficiency)),
        quality_score:    round1(clamp_pct(quality_score)),
    }
}

/// Headline totals shown above the loan table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_loans:          usize,
    pub total_amount:         f64,
    pub overdue_amount:       f64,
    pub average_overdue_days: f64,
}

impl ReportSummary {
    pub fn from_kpis(kpis: &KpiSet) -> Self {
        Self {
            total_loans:          kpis.total_loans,
            total_amount:         kpis.total_portfolio_value,
            overdue_amount:       kpis.total_overdue_amount,
            average_overdue_days: kpis.average_dpd,
        }
    }
}

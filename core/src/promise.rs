//! Promise-to-pay tracking.
//!
//! Normalizes raw promise records, derives days remaining and a
//! confidence score per promise, and rolls the set up into counts and a
//! fulfillment rate.
//!
//! Confidence is a heuristic:
//!   start 50
//!   +30 prior KEPT, +15 prior PARTIAL, -20 prior BROKEN
//!   +10 below the small-ticket threshold, -10 above the large-ticket one
//!   clamp to [0, 100] last

use crate::{
    config::TicketThresholds,
    model::{PromiseStatus, RawPromise},
    rates::{clamp_pct, percent, round1},
    types::LoanId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const BASE_CONFIDENCE: f64 = 50.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedPromise {
    pub promise_id:            String,
    pub loan_id:               LoanId,
    pub amount:                f64,
    pub promise_date:          NaiveDate,
    pub status:                PromiseStatus,
    pub prior_status:          Option<PromiseStatus>,
    pub days_remaining:        i64,
    pub is_overdue:            bool,
    pub confidence:            f64,
    pub actual_payment_date:   Option<NaiveDate>,
    pub actual_payment_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromiseSummary {
    pub total:            u32,
    pub fulfilled:        u32,
    pub pending:          u32,
    pub broken:           u32,
    pub partial:          u32,
    pub fulfillment_rate: f64,
    pub promised_amount:  f64,
    pub collected_amount: f64,
    pub average_confidence: f64,
}

/// Whole days from `now` until the start of `date`, rounded up.
/// Negative when the promise date has passed.
pub fn days_remaining(date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let due = date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()).unwrap_or(now);
    let secs = (due - now).num_seconds() as f64;
    (secs / SECONDS_PER_DAY).ceil() as i64
}

pub fn confidence(
    amount: f64,
    prior_status: Option<PromiseStatus>,
    tickets: &TicketThresholds,
) -> f64 {
    let mut score = BASE_CONFIDENCE;
    score += match prior_status {
        Some(PromiseStatus::Kept)    => 30.0,
        Some(PromiseStatus::Partial) => 15.0,
        Some(PromiseStatus::Broken)  => -20.0,
        Some(PromiseStatus::Active) | None => 0.0,
    };
    if amount < tickets.small_ticket {
        score += 10.0;
    } else if amount > tickets.large_ticket {
        score -= 10.0;
    }
    clamp_pct(score)
}

/// Track every promise. Output is ordered by promise date, then id.
///
/// A promise without an explicit prior status inherits the outcome of the
/// latest earlier resolved promise on the same loan.
pub fn track(
    promises: &[RawPromise],
    now: DateTime<Utc>,
    tickets: &TicketThresholds,
) -> Vec<TrackedPromise> {
    let mut ordered: Vec<&RawPromise> = promises.iter().collect();
    ordered.sort_by(|a, b| {
        a.promise_date
            .cmp(&b.promise_date)
            .then_with(|| a.promise_id.cmp(&b.promise_id))
    });

    let mut last_outcome: HashMap<&str, PromiseStatus> = HashMap::new();
    let mut tracked = Vec::with_capacity(ordered.len());

    for raw in ordered {
        let amount = if raw.amount.is_finite() { raw.amount.max(0.0) } else { 0.0 };
        let prior_status = raw
            .prior_status
            .or_else(|| last_outcome.get(raw.loan_id.as_str()).copied());
        let days = days_remaining(raw.promise_date, now);

        tracked.push(TrackedPromise {
            promise_id:            raw.promise_id.clone(),
            loan_id:               raw.loan_id.clone(),
            amount,
            promise_date:          raw.promise_date,
            status:                raw.status,
            prior_status,
            days_remaining:        days,
            is_overdue:            days < 0 && raw.status == PromiseStatus::Active,
            confidence:            confidence(amount, prior_status, tickets),
            actual_payment_date:   raw.actual_payment_date,
            actual_payment_amount: raw.actual_payment_amount,
        });

        if raw.status.is_resolved() {
            last_outcome.insert(raw.loan_id.as_str(), raw.status);
        }
    }

    tracked
}

pub fn summarize(tracked: &[TrackedPromise]) -> PromiseSummary {
    let mut summary = PromiseSummary::default();
    let mut confidence_total = 0.0;

    for promise in tracked {
        summary.total += 1;
        match promise.status {
            PromiseStatus::Kept    => summary.fulfilled += 1,
            PromiseStatus::Active  => summary.pending += 1,
            PromiseStatus::Broken  => summary.broken += 1,
            PromiseStatus::Partial => summary.partial += 1,
        }
        summary.promised_amount += promise.amount;
        summary.collected_amount += promise
            .actual_payment_amount
            .filter(|a| a.is_finite() && *a > 0.0)
            .unwrap_or(0.0);
        confidence_total += promise.confidence;
    }

    summary.fulfillment_rate = round1(percent(summary.fulfilled as f64, summary.total as f64));
    summary.average_confidence = if summary.total == 0 {
        0.0
    } else {
        round1(confidence_total / summary.total as f64)
    };
    summary
}

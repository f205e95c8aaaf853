//! Trend synthesis: a fixed-length daily series ending today.
//!
//! Each day is filled from the best source available, in order:
//!   1. a daily performance record for that date
//!   2. interaction/promise activity observed on that date
//!   3. the fallback provider's synthetic point for that date
//!
//! The series always has exactly `window` points, oldest first, with
//! `window` capped at MAX_TREND_WINDOW.

use crate::{
    config::MAX_TREND_WINDOW,
    fallback::FallbackProvider,
    model::{Channel, DailyPerformance, InteractionEvent, PromiseStatus, RawPromise},
    rates::{percent, round1},
    types::DataOrigin,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date:             NaiveDate,
    pub collected_amount: f64,
    pub calls:            u32,
    pub answered_calls:   u32,
    pub promises:         u32,
    pub response_rate:    f64,
    pub origin:           DataOrigin,
}

impl TrendPoint {
    pub fn new(
        date: NaiveDate,
        collected_amount: f64,
        calls: u32,
        answered_calls: u32,
        promises: u32,
        origin: DataOrigin,
    ) -> Self {
        Self {
            date,
            collected_amount,
            calls,
            answered_calls,
            promises,
            response_rate: round1(percent(answered_calls as f64, calls as f64)),
            origin,
        }
    }
}

/// Per-day totals observed in raw interactions and promises.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyActivity {
    pub calls:            u32,
    pub answered_calls:   u32,
    pub promises:         u32,
    pub collected_amount: f64,
}

/// Bucket raw activity by calendar day. Collected amounts land on the
/// day the payment was actually made.
pub fn daily_activity(
    events: &[InteractionEvent],
    promises: &[RawPromise],
) -> BTreeMap<NaiveDate, DailyActivity> {
    let mut days: BTreeMap<NaiveDate, DailyActivity> = BTreeMap::new();

    for event in events {
        let day = days.entry(event.timestamp.date_naive()).or_default();
        if event.channel == Channel::Call {
            day.calls += 1;
            if event.status.is_answered() {
                day.answered_calls += 1;
            }
        }
        if event.promise_flag {
            day.promises += 1;
        }
    }

    for promise in promises {
        if !matches!(promise.status, PromiseStatus::Kept | PromiseStatus::Partial) {
            continue;
        }
        let (Some(paid_on), Some(amount)) = (promise.actual_payment_date, promise.actual_payment_amount)
        else {
            continue;
        };
        if amount.is_finite() && amount > 0.0 {
            days.entry(paid_on).or_default().collected_amount += amount;
        }
    }

    days
}

/// Inputs for one synthesis run.
pub struct TrendSources<'a> {
    pub history:        &'a [DailyPerformance],
    /// Origin of `history`; points built from it inherit this tag.
    pub history_origin: DataOrigin,
    pub activity:       &'a BTreeMap<NaiveDate, DailyActivity>,
    /// Fallback when either the interaction or the promise slice was.
    pub activity_origin: DataOrigin,
}

pub fn synthesize(
    window: usize,
    today: NaiveDate,
    sources: &TrendSources<'_>,
    fallback: &FallbackProvider,
) -> Vec<TrendPoint> {
    let by_date: BTreeMap<NaiveDate, &DailyPerformance> = sources
        .history
        .iter()
        .map(|record| (record.metric_date, record))
        .collect();

    let mut backfilled = 0usize;
    let points: Vec<TrendPoint> = (0..window.min(MAX_TREND_WINDOW))
        .rev()
        .map(|offset| today - Duration::days(offset as i64))
        .map(|date| {
            if let Some(record) = by_date.get(&date) {
                return TrendPoint::new(
                    date,
                    record.amount_collected,
                    record.calls_made,
                    record.calls_answered,
                    record.promises_made,
                    sources.history_origin,
                );
            }
            if let Some(day) = sources.activity.get(&date) {
                return TrendPoint::new(
                    date,
                    day.collected_amount,
                    day.calls,
                    day.answered_calls,
                    day.promises,
                    sources.activity_origin,
                );
            }
            backfilled += 1;
            fallback.trend_point(date)
        })
        .collect();

    if backfilled > 0 {
        log::debug!("trend: backfilled {backfilled} of {window} day(s) with synthetic points");
    }
    points
}

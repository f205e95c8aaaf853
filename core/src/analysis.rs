//! Portfolio views built from the normalized slices: customer segments,
//! risk distribution with contributing factors, and an activity timeline.

use crate::{
    bucket::{Bucket, RiskLevel},
    communication::CommunicationStats,
    model::{Channel, InteractionEvent, LoanCase, PromiseStatus},
    promise::{PromiseSummary, TrackedPromise},
    rates::{clamp_pct, mean, percent, round1},
    types::LoanId,
};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cases beyond this many days past due count as severe.
const SEVERE_DPD: u32 = 90;

// ── Customer segments ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStat {
    pub segment:        String,
    pub loan_count:     usize,
    pub total_amount:   f64,
    pub overdue_amount: f64,
    /// Share of the portfolio's loan amount, in percent.
    pub share:          f64,
    pub average_dpd:    f64,
}

/// Group loans by customer type. Largest exposure first.
pub fn customer_segments(loans: &[LoanCase]) -> Vec<SegmentStat> {
    let portfolio: f64 = loans.iter().map(|l| l.loan_amount).sum();
    let mut groups: BTreeMap<&str, Vec<&LoanCase>> = BTreeMap::new();
    for loan in loans {
        groups.entry(loan.customer_type.as_str()).or_default().push(loan);
    }

    let mut segments: Vec<SegmentStat> = groups
        .into_iter()
        .map(|(segment, members)| {
            let total_amount: f64 = members.iter().map(|l| l.loan_amount).sum();
            SegmentStat {
                segment:        segment.to_string(),
                loan_count:     members.len(),
                total_amount,
                overdue_amount: members.iter().map(|l| l.overdue_amount).sum(),
                share:          round1(percent(total_amount, portfolio)),
                average_dpd:    round1(mean(members.iter().map(|l| l.dpd as f64))),
            }
        })
        .collect();

    segments.sort_by(|a, b| {
        b.total_amount
            .partial_cmp(&a.total_amount)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.segment.cmp(&b.segment))
    });
    segments
}

// ── Risk analysis ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskLevelStat {
    pub level:  RiskLevel,
    pub count:  usize,
    pub amount: f64,
    pub share:  f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BucketStat {
    pub bucket:         Bucket,
    pub count:          usize,
    pub overdue_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    pub name:        String,
    /// 0 (no concern) to 100 (maximal concern).
    pub score:       f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub distribution: Vec<RiskLevelStat>,
    pub buckets:      Vec<BucketStat>,
    pub factors:      Vec<RiskFactor>,
}

pub fn risk_analysis(
    loans: &[LoanCase],
    promises: &PromiseSummary,
    comm: &CommunicationStats,
) -> RiskAnalysis {
    let distribution = RiskLevel::ALL
        .iter()
        .map(|level| {
            let members: Vec<&LoanCase> = loans.iter().filter(|l| l.risk_level == *level).collect();
            RiskLevelStat {
                level:  *level,
                count:  members.len(),
                amount: members.iter().map(|l| l.loan_amount).sum(),
                share:  round1(percent(members.len() as f64, loans.len() as f64)),
            }
        })
        .collect();

    let buckets = Bucket::ALL
        .iter()
        .map(|bucket| {
            let members = loans.iter().filter(|l| l.bucket == *bucket);
            let (count, overdue_amount) = members.fold((0, 0.0), |(c, a), l| (c + 1, a + l.overdue_amount));
            BucketStat { bucket: *bucket, count, overdue_amount }
        })
        .collect();

    let severe = loans.iter().filter(|l| l.dpd > SEVERE_DPD).count();
    let portfolio: f64 = loans.iter().map(|l| l.loan_amount).sum();
    let overdue: f64 = loans.iter().map(|l| l.overdue_amount).sum();
    let resolved = promises.fulfilled + promises.broken + promises.partial;
    let contact_gap = if comm.total_calls == 0 {
        0.0
    } else {
        clamp_pct(100.0 - comm.response_rate)
    };

    let factors = vec![
        RiskFactor {
            name:        "severe_delinquency".into(),
            score:       round1(percent(severe as f64, loans.len() as f64)),
            description: format!("{severe} of {} case(s) more than {SEVERE_DPD} days past due", loans.len()),
        },
        RiskFactor {
            name:        "overdue_exposure".into(),
            score:       round1(percent(overdue, portfolio)),
            description: "Overdue amount as a share of the portfolio".into(),
        },
        RiskFactor {
            name:        "broken_promises".into(),
            score:       round1(percent(promises.broken as f64, resolved as f64)),
            description: format!("{} broken of {resolved} resolved promise(s)", promises.broken),
        },
        RiskFactor {
            name:        "contact_gap".into(),
            score:       round1(contact_gap),
            description: "Share of calls that did not reach the customer".into(),
        },
    ];

    RiskAnalysis { distribution, buckets, factors }
}

// ── Timeline ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    Call,
    Message,
    Email,
    Visit,
    PromiseDue,
    PromiseKept,
    PromisePartial,
    PromiseBroken,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub timestamp:   DateTime<Utc>,
    pub kind:        TimelineKind,
    pub loan_id:     Option<LoanId>,
    pub description: String,
    pub amount:      Option<f64>,
}

/// Interactions and promise milestones merged, newest first, at most
/// `limit` entries.
pub fn timeline(
    events: &[InteractionEvent],
    promises: &[TrackedPromise],
    limit: usize,
) -> Vec<TimelineEvent> {
    let mut entries: Vec<TimelineEvent> = events
        .iter()
        .map(|event| {
            let kind = match event.channel {
                Channel::Call                    => TimelineKind::Call,
                Channel::Sms | Channel::Whatsapp => TimelineKind::Message,
                Channel::Email                   => TimelineKind::Email,
                Channel::Visit                   => TimelineKind::Visit,
            };
            let mut description = format!("{} {}", event.channel.as_str(), event.status.as_str());
            if let Some(outcome) = &event.outcome {
                description.push_str(&format!(" ({outcome})"));
            }
            TimelineEvent {
                timestamp: event.timestamp,
                kind,
                loan_id: event.loan_id.clone(),
                description,
                amount: None,
            }
        })
        .collect();

    for promise in promises {
        let (kind, date, amount) = match promise.status {
            PromiseStatus::Active  => (TimelineKind::PromiseDue, promise.promise_date, promise.amount),
            PromiseStatus::Kept    => (
                TimelineKind::PromiseKept,
                promise.actual_payment_date.unwrap_or(promise.promise_date),
                promise.actual_payment_amount.unwrap_or(promise.amount),
            ),
            PromiseStatus::Partial => (
                TimelineKind::PromisePartial,
                promise.actual_payment_date.unwrap_or(promise.promise_date),
                promise.actual_payment_amount.unwrap_or(0.0),
            ),
            PromiseStatus::Broken  => (TimelineKind::PromiseBroken, promise.promise_date, promise.amount),
        };
        entries.push(TimelineEvent {
            timestamp:   date.and_time(NaiveTime::MIN).and_utc(),
            kind,
            loan_id:     Some(promise.loan_id.clone()),
            description: format!(
                "Promise {} {} (confidence {:.0})",
                promise.promise_id,
                promise.status.as_str(),
                promise.confidence,
            ),
            amount:      Some(amount),
        });
    }

    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    entries.truncate(limit);
    entries
}

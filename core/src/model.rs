//! Records the engine reads from a data source, and the normalized
//! loan case it derives from them.
//!
//! Loans, customers and specialists relate only by id. Nothing here holds
//! a reference to another record.

use crate::{
    bucket::{classify_bucket, classify_risk, overdue_ratio, Bucket, RiskLevel},
    types::{CustomerId, LoanId, SpecialistId},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Specialist ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Specialist {
    pub id:      SpecialistId,
    pub name:    String,
    pub role:    String,
    pub team:    String,
    pub contact: Option<String>,
    pub email:   Option<String>,
    pub active:  bool,
}

// ── Loan cases ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Active,
    Pending,
    Overdue,
    Escalated,
    Default,
    Suspended,
    Resolved,
    Closed,
    Unknown,
}

impl CaseStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE"    => Some(Self::Active),
            "PENDING"   => Some(Self::Pending),
            "OVERDUE"   => Some(Self::Overdue),
            "ESCALATED" => Some(Self::Escalated),
            "DEFAULT"   => Some(Self::Default),
            "SUSPENDED" => Some(Self::Suspended),
            "RESOLVED"  => Some(Self::Resolved),
            "CLOSED"    => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active    => "ACTIVE",
            Self::Pending   => "PENDING",
            Self::Overdue   => "OVERDUE",
            Self::Escalated => "ESCALATED",
            Self::Default   => "DEFAULT",
            Self::Suspended => "SUSPENDED",
            Self::Resolved  => "RESOLVED",
            Self::Closed    => "CLOSED",
            Self::Unknown   => "UNKNOWN",
        }
    }
}

/// A case row as a data source delivers it. Amounts and DPD are taken
/// as-is; `LoanCase::from_record` sanitizes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanRecord {
    pub loan_id:             LoanId,
    pub customer_id:         CustomerId,
    pub customer_name:       Option<String>,
    pub customer_type:       Option<String>,
    pub product_type:        Option<String>,
    pub loan_amount:         f64,
    pub outstanding_balance: f64,
    pub overdue_amount:      f64,
    pub dpd:                 i64,
    pub status:              String,
    pub priority:            Option<String>,
    pub last_contact_date:   Option<NaiveDate>,
    pub next_action_date:    Option<NaiveDate>,
}

/// One normalized collections case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoanCase {
    pub loan_id:             LoanId,
    pub customer_id:         CustomerId,
    pub customer_name:       String,
    pub customer_type:       String,
    pub product_type:        String,
    pub loan_amount:         f64,
    pub outstanding_balance: f64,
    pub overdue_amount:      f64,
    /// Principal already repaid: loan amount less outstanding balance.
    pub paid_amount:         f64,
    pub dpd:                 u32,
    pub status:              CaseStatus,
    pub priority:            String,
    pub bucket:              Bucket,
    pub risk_level:          RiskLevel,
    pub last_contact_date:   Option<NaiveDate>,
    pub next_action_date:    Option<NaiveDate>,
}

fn money(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

impl LoanCase {
    pub fn from_record(record: LoanRecord) -> Self {
        let loan_amount = money(record.loan_amount);
        let outstanding_balance = money(record.outstanding_balance);
        let overdue_amount = money(record.overdue_amount);
        let dpd = record.dpd.clamp(0, u32::MAX as i64) as u32;
        let ratio = overdue_ratio(overdue_amount, loan_amount);

        let status = CaseStatus::parse(&record.status).unwrap_or_else(|| {
            log::debug!("loan {}: unknown case status '{}'", record.loan_id, record.status);
            CaseStatus::Unknown
        });

        Self {
            customer_name: record
                .customer_name
                .unwrap_or_else(|| format!("Customer {}", record.customer_id)),
            customer_type: record.customer_type.unwrap_or_else(|| "individual".into()),
            product_type:  record.product_type.unwrap_or_else(|| "tawarruq".into()),
            priority:      record.priority.unwrap_or_else(|| "MEDIUM".into()),
            paid_amount:   (loan_amount - outstanding_balance).max(0.0),
            bucket:        classify_bucket(dpd),
            risk_level:    classify_risk(dpd, ratio),
            loan_id:       record.loan_id,
            customer_id:   record.customer_id,
            loan_amount,
            outstanding_balance,
            overdue_amount,
            dpd,
            status,
            last_contact_date: record.last_contact_date,
            next_action_date:  record.next_action_date,
        }
    }

    pub fn overdue_ratio(&self) -> f64 {
        overdue_ratio(self.overdue_amount, self.loan_amount)
    }
}

// ── Interactions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Call,
    Sms,
    Whatsapp,
    Email,
    Visit,
}

impl Channel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CALL" | "PHONE"         => Some(Self::Call),
            "SMS"                    => Some(Self::Sms),
            "WHATSAPP"               => Some(Self::Whatsapp),
            "EMAIL"                  => Some(Self::Email),
            "VISIT" | "FIELD_VISIT"  => Some(Self::Visit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call     => "CALL",
            Self::Sms      => "SMS",
            Self::Whatsapp => "WHATSAPP",
            Self::Email    => "EMAIL",
            Self::Visit    => "VISIT",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OUTBOUND" | "OUT" => Some(Self::Outbound),
            "INBOUND" | "IN"   => Some(Self::Inbound),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Outbound => "OUTBOUND",
            Self::Inbound  => "INBOUND",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionStatus {
    Answered,
    Completed,
    NoAnswer,
    Busy,
    WrongNumber,
    Delivered,
    Failed,
}

impl InteractionStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ANSWERED" | "CONTACTED"  => Some(Self::Answered),
            "COMPLETED"               => Some(Self::Completed),
            "NO_ANSWER" | "MISSED"    => Some(Self::NoAnswer),
            "BUSY"                    => Some(Self::Busy),
            "WRONG_NUMBER"            => Some(Self::WrongNumber),
            "DELIVERED" | "SENT"      => Some(Self::Delivered),
            "FAILED"                  => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Answered    => "ANSWERED",
            Self::Completed   => "COMPLETED",
            Self::NoAnswer    => "NO_ANSWER",
            Self::Busy        => "BUSY",
            Self::WrongNumber => "WRONG_NUMBER",
            Self::Delivered   => "DELIVERED",
            Self::Failed      => "FAILED",
        }
    }

    /// The customer was actually reached.
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered | Self::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub interaction_id:   String,
    pub loan_id:          Option<LoanId>,
    #[serde(rename = "type")]
    pub channel:          Channel,
    pub direction:        Direction,
    pub timestamp:        DateTime<Utc>,
    pub status:           InteractionStatus,
    pub duration_seconds: Option<u32>,
    pub outcome:          Option<String>,
    pub promise_flag:     bool,
}

// ── Promises ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromiseStatus {
    Active,
    Kept,
    Broken,
    Partial,
}

impl PromiseStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" | "PENDING" => Some(Self::Active),
            "KEPT" | "FULFILLED" => Some(Self::Kept),
            "BROKEN"             => Some(Self::Broken),
            "PARTIAL"            => Some(Self::Partial),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active  => "ACTIVE",
            Self::Kept    => "KEPT",
            Self::Broken  => "BROKEN",
            Self::Partial => "PARTIAL",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawPromise {
    pub promise_id:           String,
    pub loan_id:              LoanId,
    pub customer_id:          Option<CustomerId>,
    pub amount:               f64,
    pub promise_date:         NaiveDate,
    pub status:               PromiseStatus,
    /// Outcome of the customer's previous promise, when the source knows it.
    pub prior_status:         Option<PromiseStatus>,
    pub created_at:           Option<DateTime<Utc>>,
    pub actual_payment_date:  Option<NaiveDate>,
    pub actual_payment_amount: Option<f64>,
}

// ── Daily officer metrics ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyPerformance {
    pub metric_date:      NaiveDate,
    pub calls_made:       u32,
    pub calls_answered:   u32,
    pub promises_made:    u32,
    pub promises_kept:    u32,
    pub amount_collected: f64,
}

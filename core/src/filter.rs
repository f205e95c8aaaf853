//! Report filter input and its normalization.
//!
//! RULE: malformed filter input is never rejected. Every unknown or
//! out-of-range value is replaced with the nearest valid default and
//! recorded as a FilterIssue.

use crate::{
    bucket::{filter_range, DpdRange, RiskLevel},
    communication::ChannelGroup,
    model::{CaseStatus, InteractionEvent, LoanCase},
    types::SpecialistId,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter exactly as the dashboard sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawReportFilter {
    pub specialist_id:         String,
    pub date_range:            Option<String>,
    pub custom_start:          Option<String>,
    pub custom_end:            Option<String>,
    pub loan_status:           Option<String>,
    pub delinquency_bucket:    Option<String>,
    pub risk_level:            Option<String>,
    pub communication_channel: Option<String>,
    pub min_amount:            Option<f64>,
    pub max_amount:            Option<f64>,
    #[serde(rename = "minDPD")]
    pub min_dpd:               Option<f64>,
    #[serde(rename = "maxDPD")]
    pub max_dpd:               Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateRange {
    Today,
    Yesterday,
    Last7Days,
    CurrentMonth,
    LastMonth,
    CurrentQuarter,
    CurrentYear,
    Custom { start: NaiveDate, end: NaiveDate },
}

/// Inclusive calendar-day window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end:   NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// First instant of the window.
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant after the window. A window ending on the last
    /// representable day is open-ended.
    pub fn end_instant(&self) -> DateTime<Utc> {
        self.end
            .succ_opt()
            .map(|next| next.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn month_start(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    month_start(next_year, next_month).pred_opt().unwrap_or(NaiveDate::MAX)
}

impl DateRange {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "today"           => Some(Self::Today),
            "yesterday"       => Some(Self::Yesterday),
            "last_7_days"     => Some(Self::Last7Days),
            "current_month"   => Some(Self::CurrentMonth),
            "last_month"      => Some(Self::LastMonth),
            "current_quarter" => Some(Self::CurrentQuarter),
            "current_year"    => Some(Self::CurrentYear),
            _ => None,
        }
    }

    pub fn window(&self, today: NaiveDate) -> DateWindow {
        let (y, m) = (today.year(), today.month());
        let (start, end) = match *self {
            Self::Today     => (today, today),
            Self::Yesterday => {
                let day = today - Duration::days(1);
                (day, day)
            }
            Self::Last7Days    => (today - Duration::days(6), today),
            Self::CurrentMonth => (month_start(y, m), month_end(y, m)),
            Self::LastMonth    => {
                let (ly, lm) = if m == 1 { (y - 1, 12) } else { (y, m - 1) };
                (month_start(ly, lm), month_end(ly, lm))
            }
            Self::CurrentQuarter => {
                let first = (m - 1) / 3 * 3 + 1;
                (month_start(y, first), month_end(y, first + 2))
            }
            Self::CurrentYear => (month_start(y, 1), month_end(y, 12)),
            Self::Custom { start, end } => (start, end),
        };
        DateWindow { start, end }
    }
}

/// A delinquency filter: the token the user picked and the DPD range it
/// resolves to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DelinquencyFilter {
    pub token: String,
    pub range: DpdRange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    pub specialist_id: SpecialistId,
    pub date_range:    DateRange,
    /// `None` means all statuses.
    pub loan_status:   Option<CaseStatus>,
    pub delinquency:   Option<DelinquencyFilter>,
    pub risk_level:    Option<RiskLevel>,
    pub channel:       Option<ChannelGroup>,
    pub min_amount:    Option<f64>,
    pub max_amount:    Option<f64>,
    pub min_dpd:       Option<u32>,
    pub max_dpd:       Option<u32>,
}

/// One correction applied during normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterIssue {
    pub field:   String,
    pub value:   String,
    pub applied: String,
}

fn is_all(raw: &Option<String>) -> bool {
    raw.as_deref()
        .map(|v| v.trim().is_empty() || v.trim().eq_ignore_ascii_case("all"))
        .unwrap_or(true)
}

/// Custom ranges are kept inside these years; anything outside is clamped.
const CUSTOM_MIN_YEAR: i32 = 1900;
const CUSTOM_MAX_YEAR: i32 = 2999;

fn clamp_custom(date: NaiveDate) -> NaiveDate {
    let lo = NaiveDate::from_ymd_opt(CUSTOM_MIN_YEAR, 1, 1).unwrap_or(NaiveDate::MIN);
    let hi = NaiveDate::from_ymd_opt(CUSTOM_MAX_YEAR, 12, 31).unwrap_or(NaiveDate::MAX);
    date.clamp(lo, hi)
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

impl ReportFilter {
    /// Everything unfiltered for the current month.
    pub fn for_specialist(specialist_id: impl Into<SpecialistId>) -> Self {
        Self {
            specialist_id: specialist_id.into(),
            date_range:    DateRange::CurrentMonth,
            loan_status:   None,
            delinquency:   None,
            risk_level:    None,
            channel:       None,
            min_amount:    None,
            max_amount:    None,
            min_dpd:       None,
            max_dpd:       None,
        }
    }

    pub fn normalize(raw: &RawReportFilter) -> (Self, Vec<FilterIssue>) {
        let mut issues = Vec::new();
        let mut note = |field: &str, value: &str, applied: &str| {
            log::warn!("filter: {field}='{value}' is invalid, using {applied}");
            issues.push(FilterIssue {
                field:   field.to_string(),
                value:   value.to_string(),
                applied: applied.to_string(),
            });
        };

        let mut filter = Self::for_specialist(raw.specialist_id.trim());

        match raw.date_range.as_deref().map(str::trim) {
            None | Some("") => {}
            Some(token) if token.eq_ignore_ascii_case("custom") => {
                let start = parse_date(raw.custom_start.as_deref());
                let end = parse_date(raw.custom_end.as_deref());
                match (start, end) {
                    (Some(s), Some(e)) => {
                        let (cs, ce) = (clamp_custom(s), clamp_custom(e));
                        if (cs, ce) != (s, e) {
                            note("customStart/customEnd", &format!("{s}..{e}"), &format!("{cs}..{ce}"));
                        }
                        let (s, e) = (cs, ce);
                        let (start, end) = if s <= e { (s, e) } else { (e, s) };
                        if s > e {
                            note("customStart/customEnd", &format!("{s}..{e}"), &format!("{start}..{end}"));
                        }
                        filter.date_range = DateRange::Custom { start, end };
                    }
                    _ => note("dateRange", "custom without start and end", "current_month"),
                }
            }
            Some(token) => match DateRange::parse(token) {
                Some(range) => filter.date_range = range,
                None => note("dateRange", token, "current_month"),
            },
        }

        if !is_all(&raw.loan_status) {
            let token = raw.loan_status.as_deref().unwrap_or_default();
            match CaseStatus::parse(token) {
                Some(status) => filter.loan_status = Some(status),
                None => note("loanStatus", token, "all"),
            }
        }

        if !is_all(&raw.delinquency_bucket) {
            let token = raw.delinquency_bucket.as_deref().unwrap_or_default();
            match filter_range(token) {
                Some(range) => {
                    filter.delinquency = Some(DelinquencyFilter {
                        token: token.trim().to_string(),
                        range,
                    })
                }
                None => note("delinquencyBucket", token, "all"),
            }
        }

        if !is_all(&raw.risk_level) {
            let token = raw.risk_level.as_deref().unwrap_or_default();
            match RiskLevel::parse(token) {
                Some(level) => filter.risk_level = Some(level),
                None => note("riskLevel", token, "all"),
            }
        }

        if !is_all(&raw.communication_channel) {
            let token = raw.communication_channel.as_deref().unwrap_or_default();
            match ChannelGroup::parse(token) {
                Some(group) => filter.channel = Some(group),
                None => note("communicationChannel", token, "all"),
            }
        }

        let mut bound = |field: &str, value: Option<f64>| -> Option<f64> {
            let v = value?;
            if v.is_finite() && v >= 0.0 {
                Some(v)
            } else {
                note(field, &v.to_string(), "no bound");
                None
            }
        };
        let mut min_amount = bound("minAmount", raw.min_amount);
        let mut max_amount = bound("maxAmount", raw.max_amount);
        let min_dpd = bound("minDPD", raw.min_dpd).map(|v| v.floor().min(u32::MAX as f64) as u32);
        let max_dpd = bound("maxDPD", raw.max_dpd).map(|v| v.ceil().min(u32::MAX as f64) as u32);

        if let (Some(lo), Some(hi)) = (min_amount, max_amount) {
            if lo > hi {
                note("minAmount/maxAmount", &format!("{lo}..{hi}"), "swapped");
                min_amount = Some(hi);
                max_amount = Some(lo);
            }
        }
        let (min_dpd, max_dpd) = match (min_dpd, max_dpd) {
            (Some(lo), Some(hi)) if lo > hi => {
                note("minDPD/maxDPD", &format!("{lo}..{hi}"), "swapped");
                (Some(hi), Some(lo))
            }
            pair => pair,
        };

        filter.min_amount = min_amount;
        filter.max_amount = max_amount;
        filter.min_dpd = min_dpd;
        filter.max_dpd = max_dpd;

        (filter, issues)
    }

    /// Combined DPD bounds from the delinquency bucket and the explicit
    /// min/max DPD fields.
    pub fn dpd_bounds(&self) -> DpdRange {
        let mut range = self
            .delinquency
            .as_ref()
            .map(|d| d.range)
            .unwrap_or(DpdRange { min_days: 0, max_days: None });
        if let Some(min) = self.min_dpd {
            range.min_days = range.min_days.max(min);
        }
        if let Some(max) = self.max_dpd {
            range.max_days = Some(range.max_days.map_or(max, |m| m.min(max)));
        }
        range
    }

    pub fn matches_loan(&self, loan: &LoanCase) -> bool {
        if self.loan_status.is_some_and(|s| s != loan.status) {
            return false;
        }
        if self.risk_level.is_some_and(|r| r != loan.risk_level) {
            return false;
        }
        if !self.dpd_bounds().contains(loan.dpd) {
            return false;
        }
        if self.min_amount.is_some_and(|min| loan.loan_amount < min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| loan.loan_amount > max) {
            return false;
        }
        true
    }

    /// True when any loan-level field narrows the case list.
    pub fn has_loan_constraints(&self) -> bool {
        self.loan_status.is_some()
            || self.delinquency.is_some()
            || self.risk_level.is_some()
            || self.min_amount.is_some()
            || self.max_amount.is_some()
            || self.min_dpd.is_some()
            || self.max_dpd.is_some()
    }

    pub fn matches_event(&self, event: &InteractionEvent) -> bool {
        self.channel
            .map_or(true, |group| ChannelGroup::of(event.channel) == group)
    }

    /// Stable key for a request: same specialist and filter, same key.
    pub fn signature(&self) -> String {
        let body = serde_json::to_string(self).unwrap_or_default();
        format!("{}|{}", self.specialist_id, body)
    }
}

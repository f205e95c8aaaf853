//! Delinquency buckets and risk levels.
//!
//! One table drives both the display bucket of a case and the DPD range
//! pushed down to the data source when filtering, so the two cannot
//! disagree at the edges.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    #[serde(rename = "Current")]
    Current,
    #[serde(rename = "1-30")]
    Days1To30,
    #[serde(rename = "31-60")]
    Days31To60,
    #[serde(rename = "61-90")]
    Days61To90,
    #[serde(rename = "91-180")]
    Days91To180,
    #[serde(rename = "181-360")]
    Days181To360,
    #[serde(rename = ">360")]
    Over360,
}

/// Inclusive DPD bounds. `max_days == None` is open-ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DpdRange {
    pub min_days: u32,
    pub max_days: Option<u32>,
}

impl DpdRange {
    pub fn contains(&self, dpd: u32) -> bool {
        dpd >= self.min_days && self.max_days.map_or(true, |max| dpd <= max)
    }
}

// (bucket, inclusive upper bound). Ordered; the last row is open-ended.
const BUCKET_TABLE: [(Bucket, Option<u32>); 7] = [
    (Bucket::Current,      Some(0)),
    (Bucket::Days1To30,    Some(30)),
    (Bucket::Days31To60,   Some(60)),
    (Bucket::Days61To90,   Some(90)),
    (Bucket::Days91To180,  Some(180)),
    (Bucket::Days181To360, Some(360)),
    (Bucket::Over360,      None),
];

impl Bucket {
    pub const ALL: [Bucket; 7] = [
        Bucket::Current,
        Bucket::Days1To30,
        Bucket::Days31To60,
        Bucket::Days61To90,
        Bucket::Days91To180,
        Bucket::Days181To360,
        Bucket::Over360,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Current      => "Current",
            Self::Days1To30    => "1-30",
            Self::Days31To60   => "31-60",
            Self::Days61To90   => "61-90",
            Self::Days91To180  => "91-180",
            Self::Days181To360 => "181-360",
            Self::Over360      => ">360",
        }
    }

    pub fn range(&self) -> DpdRange {
        let position = BUCKET_TABLE
            .iter()
            .position(|(bucket, _)| bucket == self)
            .unwrap_or(0);
        let min_days = match position {
            0 => 0,
            n => BUCKET_TABLE[n - 1].1.map_or(0, |upper| upper + 1),
        };
        DpdRange {
            min_days,
            max_days: BUCKET_TABLE[position].1,
        }
    }

    /// Parse a bucket label. Accepts the dashboard's "1-30 Days" and
    /// "BUCKET_1" spellings as well as the canonical labels.
    pub fn parse(raw: &str) -> Option<Self> {
        let token = raw.trim();
        let token = token
            .strip_suffix(" Days")
            .or_else(|| token.strip_suffix(" DPD"))
            .unwrap_or(token)
            .trim();
        match token.to_ascii_lowercase().as_str() {
            "current" | "bucket_0"     => Some(Self::Current),
            "1-30" | "bucket_1"        => Some(Self::Days1To30),
            "31-60" | "bucket_2"       => Some(Self::Days31To60),
            "61-90" | "bucket_3"       => Some(Self::Days61To90),
            "91-180" | "bucket_4"      => Some(Self::Days91To180),
            "181-360"                  => Some(Self::Days181To360),
            ">360" | "360+"            => Some(Self::Over360),
            _ => None,
        }
    }
}

/// Map days-past-due to exactly one bucket.
pub fn classify_bucket(dpd: u32) -> Bucket {
    BUCKET_TABLE
        .iter()
        .find(|(_, upper)| upper.map_or(true, |max| dpd <= max))
        .map(|(bucket, _)| *bucket)
        .unwrap_or(Bucket::Over360)
}

/// Resolve a delinquency filter token to a DPD range.
///
/// Besides bucket labels, the dashboard sends open-ended tokens such as
/// "90+" and "180+"; those start at the first day of the next bucket in
/// the table rather than at the number in the token.
pub fn filter_range(raw: &str) -> Option<DpdRange> {
    if let Some(bucket) = Bucket::parse(raw) {
        return Some(bucket.range());
    }
    let token = raw.trim().trim_end_matches(" Days").trim();
    let floor: u32 = token.strip_suffix('+')?.trim().parse().ok()?;
    let start = Bucket::ALL
        .iter()
        .map(|b| b.range())
        .find(|r| r.min_days > floor)?;
    Some(DpdRange {
        min_days: start.min_days,
        max_days: None,
    })
}

/// Five ordered risk levels, lowest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::VeryLow,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::VeryHigh,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryLow  => "very-low",
            Self::Low      => "low",
            Self::Medium   => "medium",
            Self::High     => "high",
            Self::VeryHigh => "very-high",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "very-low"  => Some(Self::VeryLow),
            "low"       => Some(Self::Low),
            "medium"    => Some(Self::Medium),
            "high"      => Some(Self::High),
            "very-high" => Some(Self::VeryHigh),
            _ => None,
        }
    }

    fn from_tier(tier: u8) -> Self {
        match tier {
            0 => Self::VeryLow,
            1 => Self::Low,
            2 => Self::Medium,
            3 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

fn dpd_tier(dpd: u32) -> u8 {
    match dpd {
        0        => 0,
        1..=30   => 1,
        31..=90  => 2,
        91..=180 => 3,
        _        => 4,
    }
}

fn ratio_tier(ratio: f64) -> u8 {
    if ratio.is_nan() || ratio <= 0.0 {
        0
    } else if ratio < 0.10 {
        1
    } else if ratio < 0.25 {
        2
    } else if ratio < 0.50 {
        3
    } else {
        4
    }
}

/// Combine delinquency age and overdue exposure into a risk level.
///
/// level = max(dpd_tier, ceil((dpd_tier + ratio_tier) / 2)). Both terms
/// are non-decreasing in each input, so raising either signal never
/// lowers the level.
pub fn classify_risk(dpd: u32, overdue_ratio: f64) -> RiskLevel {
    let d = dpd_tier(dpd);
    let r = ratio_tier(overdue_ratio);
    let blended = (d + r).div_ceil(2);
    RiskLevel::from_tier(d.max(blended))
}

/// Overdue-to-principal ratio with a guarded zero principal.
pub fn overdue_ratio(overdue: f64, principal: f64) -> f64 {
    if principal > 0.0 {
        (overdue / principal).max(0.0)
    } else if overdue > 0.0 {
        1.0
    } else {
        0.0
    }
}

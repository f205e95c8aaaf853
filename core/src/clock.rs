//! Report clock: the single notion of "now" for one report request.
//!
//! Days-remaining, date windows and trend ranges all derive from this
//! value. Tests pin it with `ReportClock::fixed`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportClock {
    now: DateTime<Utc>,
}

impl ReportClock {
    /// Wall-clock time. Only the runner should use this.
    pub fn system() -> Self {
        Self { now: Utc::now() }
    }

    pub fn fixed(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Noon UTC on the given date.
    pub fn at_date(date: NaiveDate) -> Self {
        let now = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

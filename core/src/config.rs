use crate::communication::WorkWeek;
use serde::{Deserialize, Serialize};

/// Amount thresholds used by promise confidence scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TicketThresholds {
    /// Promises below this amount are easier to honour.
    pub small_ticket: f64,
    /// Promises above this amount are harder to honour.
    pub large_ticket: f64,
}

impl Default for TicketThresholds {
    fn default() -> Self {
        Self {
            small_ticket: 10_000.0,
            large_ticket: 50_000.0,
        }
    }
}

/// Longest supported trend series, in days.
pub const MAX_TREND_WINDOW: usize = 366;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Master seed for every synthetic fallback slice.
    pub fallback_seed: u64,
    /// Number of daily points in the trend series.
    pub trend_window: usize,
    pub tickets: TicketThresholds,
    pub work_week: WorkWeek,
    /// Maximum loan cases pulled per report.
    pub loan_limit: usize,
    /// Maximum timeline entries kept in the report.
    pub timeline_limit: usize,
    /// Seeded cases appended after the fixed fallback table.
    pub fallback_generated_loans: usize,
    /// Upper bound on one slice fetch before it falls back.
    pub slice_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_seed:            0x5EED_C011_EC71_0000,
            trend_window:             30,
            tickets:                  TicketThresholds::default(),
            work_week:                WorkWeek::SundayToThursday,
            loan_limit:               100,
            timeline_limit:           50,
            fallback_generated_loans: 9,
            slice_timeout_ms:         5_000,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    /// In tests, use EngineConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Config with a fixed seed and a small fallback portfolio for tests.
    pub fn default_test() -> Self {
        Self {
            fallback_seed: 42,
            fallback_generated_loans: 3,
            ..Self::default()
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.tickets.small_ticket > self.tickets.large_ticket {
            anyhow::bail!(
                "small_ticket ({}) must not exceed large_ticket ({})",
                self.tickets.small_ticket,
                self.tickets.large_ticket,
            );
        }
        if self.loan_limit == 0 {
            anyhow::bail!("loan_limit must be > 0");
        }
        if self.trend_window == 0 || self.trend_window > MAX_TREND_WINDOW {
            anyhow::bail!("trend_window must be in 1..={MAX_TREND_WINDOW}, got {}", self.trend_window);
        }
        if self.slice_timeout_ms == 0 {
            anyhow::bail!("slice_timeout_ms must be > 0");
        }
        Ok(())
    }
}

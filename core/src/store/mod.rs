//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The assembler reads through `DataSource`; it never executes SQL.
//!
//! Dates are stored as `YYYY-MM-DD` text and instants as
//! `YYYY-MM-DDTHH:MM:SSZ`, so range filters compare lexically.

mod activity;
mod cases;
mod roster;

use crate::{
    clock::ReportClock,
    error::{ReportError, ReportResult},
    fallback::FallbackProvider,
    filter::{DateWindow, ReportFilter},
    model::{DailyPerformance, InteractionEvent, LoanRecord, RawPromise, Specialist},
    source::DataSource,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

const DATE_FMT: &str = "%Y-%m-%d";
const INSTANT_FMT: &str = "%Y-%m-%dT%H:%M:%SZ";

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FMT).to_string()
}

fn fmt_instant(at: DateTime<Utc>) -> String {
    at.format(INSTANT_FMT).to_string()
}

fn parse_date(field: &str, raw: &str) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FMT).map_err(|_| ReportError::malformed(field, raw))
}

fn parse_instant(field: &str, raw: &str) -> ReportResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| at.with_timezone(&Utc))
        .map_err(|_| ReportError::malformed(field, raw))
}

/// Lenient parse for optional date columns: unreadable values read as absent.
fn opt_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FMT).ok())
}

pub struct ReportStore {
    conn: Mutex<Connection>,
}

impl ReportStore {
    /// Open (or create) the collections database at `path`.
    pub fn open(path: &str) -> ReportResult<Self> {
        let conn = Connection::open(path)?;
        // WAL only applies to real files; ignore the result for URIs.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ReportResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ReportResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(include_str!("../../../migrations/001_collections.sql"))?;
        conn.execute_batch(include_str!("../../../migrations/002_performance_metrics.sql"))?;
        Ok(())
    }

    fn conn(&self) -> ReportResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ReportError::StoreLockPoisoned)
    }

    // ── Demo data ──────────────────────────────────────────────

    /// Fill an empty database with the sample portfolio, spread across
    /// the sample roster. Ids are prefixed per officer so they stay unique.
    pub fn seed_demo(&self, fallback: &FallbackProvider, clock: &ReportClock) -> ReportResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let roster = fallback.roster();
        for officer in &roster {
            roster::write_officer(&tx, officer)?;
        }

        let records = fallback.loan_records();
        let mut seeded = 0usize;
        for (idx, officer) in roster.iter().enumerate() {
            let owned: Vec<&LoanRecord> = records
                .iter()
                .skip(idx)
                .step_by(roster.len())
                .collect();
            if owned.is_empty() {
                continue;
            }
            let ids: Vec<String> = owned.iter().map(|r| r.loan_id.clone()).collect();

            for record in &owned {
                cases::write_case(&tx, &officer.id, record)?;
            }
            for mut event in fallback.interactions(&ids, clock) {
                event.interaction_id = format!("{}-{}", officer.id, event.interaction_id);
                activity::write_interaction(&tx, &officer.id, &event)?;
            }
            for mut promise in fallback.promises(&ids, clock) {
                promise.promise_id = format!("{}-{}", officer.id, promise.promise_id);
                activity::write_promise(&tx, &officer.id, &promise)?;
            }
            for day in fallback.performance_history(clock) {
                activity::write_performance(&tx, &officer.id, &day)?;
            }
            seeded += owned.len();
        }

        tx.commit()?;
        log::info!("store: seeded {} officers, {seeded} cases", roster.len());
        Ok(())
    }
}

#[async_trait]
impl DataSource for ReportStore {
    async fn specialist(&self, specialist_id: &str) -> ReportResult<Specialist> {
        let conn = self.conn()?;
        roster::read_officer(&conn, specialist_id)?.ok_or_else(|| ReportError::SpecialistNotFound {
            id: specialist_id.to_string(),
        })
    }

    async fn specialists(&self) -> ReportResult<Vec<Specialist>> {
        let conn = self.conn()?;
        roster::read_active_officers(&conn)
    }

    async fn loan_cases(
        &self,
        specialist_id: &str,
        filter: &ReportFilter,
        limit: usize,
    ) -> ReportResult<Vec<LoanRecord>> {
        let conn = self.conn()?;
        cases::read_cases(&conn, specialist_id, filter, limit)
    }

    async fn interactions(
        &self,
        specialist_id: &str,
        window: &DateWindow,
    ) -> ReportResult<Vec<InteractionEvent>> {
        let conn = self.conn()?;
        activity::read_interactions(&conn, specialist_id, window)
    }

    async fn promises(
        &self,
        specialist_id: &str,
        window: &DateWindow,
    ) -> ReportResult<Vec<RawPromise>> {
        let conn = self.conn()?;
        activity::read_promises(&conn, specialist_id, window)
    }

    async fn performance_history(
        &self,
        specialist_id: &str,
        window: &DateWindow,
    ) -> ReportResult<Vec<DailyPerformance>> {
        let conn = self.conn()?;
        activity::read_performance(&conn, specialist_id, window)
    }
}

// ── Direct writes ──────────────────────────────────────────────

impl ReportStore {
    pub fn insert_officer(&self, officer: &Specialist) -> ReportResult<()> {
        let conn = self.conn()?;
        roster::write_officer(&conn, officer)
    }

    pub fn insert_case(&self, officer_id: &str, record: &LoanRecord) -> ReportResult<()> {
        let conn = self.conn()?;
        cases::write_case(&conn, officer_id, record)
    }

    pub fn insert_interaction(&self, officer_id: &str, event: &InteractionEvent) -> ReportResult<()> {
        let conn = self.conn()?;
        activity::write_interaction(&conn, officer_id, event)
    }

    pub fn insert_promise(&self, officer_id: &str, promise: &RawPromise) -> ReportResult<()> {
        let conn = self.conn()?;
        activity::write_promise(&conn, officer_id, promise)
    }

    pub fn insert_performance(&self, officer_id: &str, day: &DailyPerformance) -> ReportResult<()> {
        let conn = self.conn()?;
        activity::write_performance(&conn, officer_id, day)
    }
}

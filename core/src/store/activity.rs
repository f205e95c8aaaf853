//! Interaction, promise-to-pay and daily metric queries.
//!
//! Rows with an unreadable channel, status or date are skipped with a
//! warning rather than failing the whole slice.

use super::{fmt_date, fmt_instant, opt_date, parse_date, parse_instant};
use crate::{
    error::{ReportError, ReportResult},
    filter::DateWindow,
    model::{
        Channel, DailyPerformance, Direction, InteractionEvent, InteractionStatus, PromiseStatus,
        RawPromise,
    },
};
use rusqlite::{params, Connection};

// ── Interactions ───────────────────────────────────────────────

struct InteractionRow {
    interaction_id:   String,
    loan_id:          Option<String>,
    channel:          String,
    direction:        String,
    occurred_at:      String,
    status:           String,
    duration_seconds: Option<i64>,
    outcome:          Option<String>,
    promise_flag:     bool,
}

impl InteractionRow {
    fn into_event(self) -> ReportResult<InteractionEvent> {
        let channel = Channel::parse(&self.channel)
            .ok_or_else(|| ReportError::malformed("interaction.channel", &self.channel))?;
        let direction = Direction::parse(&self.direction)
            .ok_or_else(|| ReportError::malformed("interaction.direction", &self.direction))?;
        let status = InteractionStatus::parse(&self.status)
            .ok_or_else(|| ReportError::malformed("interaction.status", &self.status))?;
        Ok(InteractionEvent {
            timestamp: parse_instant("interaction.occurred_at", &self.occurred_at)?,
            duration_seconds: self
                .duration_seconds
                .and_then(|secs| u32::try_from(secs).ok()),
            interaction_id: self.interaction_id,
            loan_id: self.loan_id,
            channel,
            direction,
            status,
            outcome: self.outcome,
            promise_flag: self.promise_flag,
        })
    }
}

pub(super) fn write_interaction(
    conn: &Connection,
    officer_id: &str,
    event: &InteractionEvent,
) -> ReportResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO interaction (
            interaction_id, officer_id, loan_id, channel, direction, occurred_at,
            status, duration_seconds, outcome, promise_flag
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            event.interaction_id,
            officer_id,
            event.loan_id,
            event.channel.as_str(),
            event.direction.as_str(),
            fmt_instant(event.timestamp),
            event.status.as_str(),
            event.duration_seconds,
            event.outcome,
            event.promise_flag as i32,
        ],
    )?;
    Ok(())
}

pub(super) fn read_interactions(
    conn: &Connection,
    officer_id: &str,
    window: &DateWindow,
) -> ReportResult<Vec<InteractionEvent>> {
    let mut stmt = conn.prepare(
        "SELECT interaction_id, loan_id, channel, direction, occurred_at, status,
                duration_seconds, outcome, promise_flag
         FROM interaction
         WHERE officer_id = ?1 AND occurred_at >= ?2 AND occurred_at < ?3
         ORDER BY occurred_at ASC, interaction_id ASC",
    )?;
    let rows = stmt
        .query_map(
            params![
                officer_id,
                fmt_instant(window.start_instant()),
                fmt_instant(window.end_instant()),
            ],
            |r| {
                Ok(InteractionRow {
                    interaction_id:   r.get(0)?,
                    loan_id:          r.get(1)?,
                    channel:          r.get(2)?,
                    direction:        r.get(3)?,
                    occurred_at:      r.get(4)?,
                    status:           r.get(5)?,
                    duration_seconds: r.get(6)?,
                    outcome:          r.get(7)?,
                    promise_flag:     r.get::<_, i32>(8)? != 0,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(keep_readable("interaction", rows, InteractionRow::into_event))
}

// ── Promises ───────────────────────────────────────────────────

struct PromiseRow {
    promise_id:            String,
    loan_id:               String,
    customer_id:           Option<String>,
    amount:                f64,
    promise_date:          String,
    status:                String,
    prior_status:          Option<String>,
    created_at:            Option<String>,
    actual_payment_date:   Option<String>,
    actual_payment_amount: Option<f64>,
}

impl PromiseRow {
    fn into_promise(self) -> ReportResult<RawPromise> {
        let status = PromiseStatus::parse(&self.status)
            .ok_or_else(|| ReportError::malformed("promise.status", &self.status))?;
        Ok(RawPromise {
            promise_date: parse_date("promise.promise_date", &self.promise_date)?,
            prior_status: self.prior_status.as_deref().and_then(PromiseStatus::parse),
            created_at: self
                .created_at
                .as_deref()
                .and_then(|raw| parse_instant("promise.created_at", raw).ok()),
            actual_payment_date: opt_date(self.actual_payment_date),
            promise_id: self.promise_id,
            loan_id: self.loan_id,
            customer_id: self.customer_id,
            amount: self.amount,
            status,
            actual_payment_amount: self.actual_payment_amount,
        })
    }
}

pub(super) fn write_promise(conn: &Connection, officer_id: &str, promise: &RawPromise) -> ReportResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO promise_to_pay (
            promise_id, officer_id, loan_id, customer_id, amount, promise_date, status,
            prior_status, created_at, actual_payment_date, actual_payment_amount
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            promise.promise_id,
            officer_id,
            promise.loan_id,
            promise.customer_id,
            promise.amount,
            fmt_date(promise.promise_date),
            promise.status.as_str(),
            promise.prior_status.map(|s| s.as_str()),
            promise.created_at.map(fmt_instant),
            promise.actual_payment_date.map(fmt_date),
            promise.actual_payment_amount,
        ],
    )?;
    Ok(())
}

/// Promises dated inside the window, plus every promise still active.
pub(super) fn read_promises(
    conn: &Connection,
    officer_id: &str,
    window: &DateWindow,
) -> ReportResult<Vec<RawPromise>> {
    let mut stmt = conn.prepare(
        "SELECT promise_id, loan_id, customer_id, amount, promise_date, status,
                prior_status, created_at, actual_payment_date, actual_payment_amount
         FROM promise_to_pay
         WHERE officer_id = ?1
           AND ((promise_date >= ?2 AND promise_date <= ?3) OR status = 'ACTIVE')
         ORDER BY promise_date ASC, promise_id ASC",
    )?;
    let rows = stmt
        .query_map(
            params![officer_id, fmt_date(window.start), fmt_date(window.end)],
            |r| {
                Ok(PromiseRow {
                    promise_id:            r.get(0)?,
                    loan_id:               r.get(1)?,
                    customer_id:           r.get(2)?,
                    amount:                r.get(3)?,
                    promise_date:          r.get(4)?,
                    status:                r.get(5)?,
                    prior_status:          r.get(6)?,
                    created_at:            r.get(7)?,
                    actual_payment_date:   r.get(8)?,
                    actual_payment_amount: r.get(9)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(keep_readable("promise", rows, PromiseRow::into_promise))
}

// ── Daily metrics ──────────────────────────────────────────────

pub(super) fn write_performance(
    conn: &Connection,
    officer_id: &str,
    day: &DailyPerformance,
) -> ReportResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO officer_performance_metric (
            officer_id, metric_date, calls_made, calls_answered,
            promises_made, promises_kept, amount_collected
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            officer_id,
            fmt_date(day.metric_date),
            day.calls_made,
            day.calls_answered,
            day.promises_made,
            day.promises_kept,
            day.amount_collected,
        ],
    )?;
    Ok(())
}

pub(super) fn read_performance(
    conn: &Connection,
    officer_id: &str,
    window: &DateWindow,
) -> ReportResult<Vec<DailyPerformance>> {
    let mut stmt = conn.prepare(
        "SELECT metric_date, calls_made, calls_answered, promises_made, promises_kept,
                amount_collected
         FROM officer_performance_metric
         WHERE officer_id = ?1 AND metric_date >= ?2 AND metric_date <= ?3
         ORDER BY metric_date ASC",
    )?;
    let rows = stmt
        .query_map(
            params![officer_id, fmt_date(window.start), fmt_date(window.end)],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, u32>(1)?,
                    r.get::<_, u32>(2)?,
                    r.get::<_, u32>(3)?,
                    r.get::<_, u32>(4)?,
                    r.get::<_, f64>(5)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(keep_readable("performance", rows, |(date, calls, answered, made, kept, collected)| {
        Ok(DailyPerformance {
            metric_date:      parse_date("performance.metric_date", &date)?,
            calls_made:       calls,
            calls_answered:   answered,
            promises_made:    made,
            promises_kept:    kept,
            amount_collected: collected,
        })
    }))
}

fn keep_readable<R, T>(kind: &str, rows: Vec<R>, convert: impl Fn(R) -> ReportResult<T>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match convert(row) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("store: skipping unreadable {kind} row: {e}");
                None
            }
        })
        .collect()
}

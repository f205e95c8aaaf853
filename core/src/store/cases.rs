//! Collection case queries.
//!
//! Numeric filter fields and the case status are pushed into SQL.
//! Risk level depends on derived values and is filtered after the query.

use super::{fmt_date, opt_date};
use crate::{
    error::ReportResult,
    filter::ReportFilter,
    model::{CaseStatus, LoanCase, LoanRecord},
};
use rusqlite::{params, params_from_iter, types::Value, Connection};

pub(super) fn write_case(conn: &Connection, officer_id: &str, record: &LoanRecord) -> ReportResult<()> {
    // Statuses are stored in canonical spelling so the status filter can
    // match them exactly.
    let status = CaseStatus::parse(&record.status)
        .map(|s| s.as_str().to_string())
        .unwrap_or_else(|| record.status.clone());
    conn.execute(
        "INSERT OR REPLACE INTO collection_case (
            loan_id, officer_id, customer_id, customer_name, customer_type, product_type,
            loan_amount, outstanding_balance, overdue_amount, dpd, status, priority,
            last_contact_date, next_action_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            record.loan_id,
            officer_id,
            record.customer_id,
            record.customer_name,
            record.customer_type,
            record.product_type,
            record.loan_amount,
            record.outstanding_balance,
            record.overdue_amount,
            record.dpd,
            status,
            record.priority,
            record.last_contact_date.map(fmt_date),
            record.next_action_date.map(fmt_date),
        ],
    )?;
    Ok(())
}

/// Cases for one officer, most delinquent first, at most `limit` rows.
pub(super) fn read_cases(
    conn: &Connection,
    officer_id: &str,
    filter: &ReportFilter,
    limit: usize,
) -> ReportResult<Vec<LoanRecord>> {
    let mut sql = String::from(
        "SELECT loan_id, customer_id, customer_name, customer_type, product_type,
                loan_amount, outstanding_balance, overdue_amount, dpd, status, priority,
                last_contact_date, next_action_date
         FROM collection_case WHERE officer_id = ?",
    );
    let mut args: Vec<Value> = vec![Value::Text(officer_id.to_string())];

    if let Some(status) = filter.loan_status {
        sql.push_str(" AND status = ?");
        args.push(Value::Text(status.as_str().to_string()));
    }
    let dpd = filter.dpd_bounds();
    if dpd.min_days > 0 {
        sql.push_str(" AND dpd >= ?");
        args.push(Value::Integer(dpd.min_days as i64));
    }
    if let Some(max) = dpd.max_days {
        sql.push_str(" AND dpd <= ?");
        args.push(Value::Integer(max as i64));
    }
    if let Some(min) = filter.min_amount {
        sql.push_str(" AND loan_amount >= ?");
        args.push(Value::Real(min));
    }
    if let Some(max) = filter.max_amount {
        sql.push_str(" AND loan_amount <= ?");
        args.push(Value::Real(max));
    }
    sql.push_str(" ORDER BY dpd DESC, loan_id ASC");
    // Risk level is derived, not stored: with a risk filter the limit can
    // only be applied after classifying each row.
    if filter.risk_level.is_none() {
        sql.push_str(" LIMIT ?");
        args.push(Value::Integer(limit.min(i64::MAX as usize) as i64));
    }

    let mut stmt = conn.prepare(&sql)?;
    let cases = stmt
        .query_map(params_from_iter(args), |r| {
            Ok(LoanRecord {
                loan_id:             r.get(0)?,
                customer_id:         r.get(1)?,
                customer_name:       r.get(2)?,
                customer_type:       r.get(3)?,
                product_type:        r.get(4)?,
                loan_amount:         r.get(5)?,
                outstanding_balance: r.get(6)?,
                overdue_amount:      r.get(7)?,
                dpd:                 r.get(8)?,
                status:              r.get(9)?,
                priority:            r.get(10)?,
                last_contact_date:   opt_date(r.get(11)?),
                next_action_date:    opt_date(r.get(12)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let Some(level) = filter.risk_level else {
        return Ok(cases);
    };
    Ok(cases
        .into_iter()
        .filter(|record| LoanCase::from_record(record.clone()).risk_level == level)
        .take(limit)
        .collect())
}

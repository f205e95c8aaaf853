//! Officer (specialist) queries.

use crate::{error::ReportResult, model::Specialist};
use rusqlite::{params, Connection, OptionalExtension, Row};

const OFFICER_COLUMNS: &str = "officer_id, name, role, team, contact, email, active";

fn officer_from_row(r: &Row<'_>) -> rusqlite::Result<Specialist> {
    Ok(Specialist {
        id:      r.get(0)?,
        name:    r.get(1)?,
        role:    r.get(2)?,
        team:    r.get(3)?,
        contact: r.get(4)?,
        email:   r.get(5)?,
        active:  r.get::<_, i32>(6)? != 0,
    })
}

pub(super) fn write_officer(conn: &Connection, officer: &Specialist) -> ReportResult<()> {
    // Upsert rather than REPLACE: a replaced row would orphan its cases.
    conn.execute(
        "INSERT INTO officer (officer_id, name, role, team, contact, email, active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(officer_id) DO UPDATE SET
             name = excluded.name, role = excluded.role, team = excluded.team,
             contact = excluded.contact, email = excluded.email, active = excluded.active",
        params![
            officer.id,
            officer.name,
            officer.role,
            officer.team,
            officer.contact,
            officer.email,
            officer.active as i32,
        ],
    )?;
    Ok(())
}

pub(super) fn read_officer(conn: &Connection, officer_id: &str) -> ReportResult<Option<Specialist>> {
    let sql = format!("SELECT {OFFICER_COLUMNS} FROM officer WHERE officer_id = ?1");
    Ok(conn
        .query_row(&sql, params![officer_id], officer_from_row)
        .optional()?)
}

pub(super) fn read_active_officers(conn: &Connection) -> ReportResult<Vec<Specialist>> {
    let sql = format!("SELECT {OFFICER_COLUMNS} FROM officer WHERE active = 1 ORDER BY officer_id");
    let mut stmt = conn.prepare(&sql)?;
    let officers = stmt
        .query_map([], officer_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(officers)
}

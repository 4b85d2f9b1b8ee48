use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::AssignmentType;
use crate::models::{PatientAssignment, QueryScope};

use super::{format_opt_ts, format_ts, parse_opt_ts, parse_ts};

pub fn insert_assignment(
    conn: &Connection,
    assignment: &PatientAssignment,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_assignments
         (id, tenant_id, patient_id, physician_id, assignment_type,
          assigned_by, assigned_date, expiry_date, is_active, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            assignment.id.to_string(),
            assignment.tenant_id.to_string(),
            assignment.patient_id.to_string(),
            assignment.physician_id.to_string(),
            assignment.assignment_type.as_str(),
            assignment.assigned_by.to_string(),
            format_ts(&assignment.assigned_date),
            format_opt_ts(&assignment.expiry_date),
            assignment.is_active as i32,
            assignment.notes,
        ],
    )?;
    Ok(())
}

/// True when at least one active assignment binds the physician to the
/// patient within the tenant.
pub fn has_active_assignment(
    conn: &Connection,
    tenant_id: &Uuid,
    patient_id: &Uuid,
    physician_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM patient_assignments
         WHERE tenant_id = ?1 AND patient_id = ?2 AND physician_id = ?3
           AND is_active = 1",
        params![
            tenant_id.to_string(),
            patient_id.to_string(),
            physician_id.to_string()
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Soft-deactivate an assignment. Returns false when no active row matched
/// the id within the tenant.
pub fn deactivate_assignment(
    conn: &Connection,
    assignment_id: &Uuid,
    tenant_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE patient_assignments SET is_active = 0
         WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1",
        params![assignment_id.to_string(), tenant_id.to_string()],
    )?;
    Ok(changed > 0)
}

pub fn get_assignment(
    conn: &Connection,
    assignment_id: &Uuid,
    tenant_id: &Uuid,
) -> Result<Option<PatientAssignment>, DatabaseError> {
    let mut rows = query_assignments(
        conn,
        "SELECT id, tenant_id, patient_id, physician_id, assignment_type,
                assigned_by, assigned_date, expiry_date, is_active, notes
         FROM patient_assignments WHERE id = ?1 AND tenant_id = ?2",
        params![assignment_id.to_string(), tenant_id.to_string()],
    )?;
    Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
}

/// List assignments for a patient. Inactive rows are included only on
/// request (assignment history is retained after revocation).
pub fn list_for_patient(
    conn: &Connection,
    scope: &QueryScope,
    patient_id: &Uuid,
    include_inactive: bool,
) -> Result<Vec<PatientAssignment>, DatabaseError> {
    let active_clause = if include_inactive { "" } else { " AND is_active = 1" };

    match scope.tenant_filter() {
        Some(tenant_id) => query_assignments(
            conn,
            &format!(
                "SELECT id, tenant_id, patient_id, physician_id, assignment_type,
                        assigned_by, assigned_date, expiry_date, is_active, notes
                 FROM patient_assignments
                 WHERE tenant_id = ?1 AND patient_id = ?2{active_clause}
                 ORDER BY assigned_date DESC"
            ),
            params![tenant_id.to_string(), patient_id.to_string()],
        ),
        None => query_assignments(
            conn,
            &format!(
                "SELECT id, tenant_id, patient_id, physician_id, assignment_type,
                        assigned_by, assigned_date, expiry_date, is_active, notes
                 FROM patient_assignments
                 WHERE patient_id = ?1{active_clause}
                 ORDER BY assigned_date DESC"
            ),
            params![patient_id.to_string()],
        ),
    }
}

type AssignmentRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i32,
    Option<String>,
);

fn query_assignments(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<PatientAssignment>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, i32>(8)?,
                row.get::<_, Option<String>>(9)?,
            ))
        })?
        .collect::<Result<Vec<AssignmentRow>, _>>()?;

    let mut assignments = Vec::with_capacity(rows.len());
    for (id, tenant, patient, physician, kind, assigned_by, assigned, expiry, active, notes) in
        rows
    {
        assignments.push(PatientAssignment {
            id: id.parse().unwrap_or_else(|_| Uuid::nil()),
            tenant_id: tenant.parse().unwrap_or_else(|_| Uuid::nil()),
            patient_id: patient.parse().unwrap_or_else(|_| Uuid::nil()),
            physician_id: physician.parse().unwrap_or_else(|_| Uuid::nil()),
            assignment_type: AssignmentType::from_str(&kind)?,
            assigned_by: assigned_by.parse().unwrap_or_else(|_| Uuid::nil()),
            assigned_date: parse_ts(&assigned),
            expiry_date: parse_opt_ts(expiry),
            is_active: active != 0,
            notes,
        });
    }
    Ok(assignments)
}

use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::db::DatabaseError;
use crate::models::enums::AuditKind;

use super::{format_ts, parse_ts};

/// Append one entry to the audit log.
pub fn insert_audit_entry(conn: &Connection, entry: &AuditEntry) -> Result<(), DatabaseError> {
    let payload_json =
        serde_json::to_string(&entry.payload).unwrap_or_else(|_| "{}".to_string());
    conn.execute(
        "INSERT INTO audit_log (tenant_id, patient_id, actor_id, kind, payload, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            entry.tenant_id.to_string(),
            entry.patient_id.to_string(),
            entry.actor_id.to_string(),
            entry.kind.as_str(),
            payload_json,
            format_ts(&entry.timestamp),
        ],
    )?;
    Ok(())
}

/// Query audit entries for a patient within the last N days, newest first.
pub fn query_by_patient(
    conn: &Connection,
    tenant_id: &Uuid,
    patient_id: &Uuid,
    days: i64,
) -> Result<Vec<AuditEntry>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT tenant_id, patient_id, actor_id, kind, payload, timestamp
         FROM audit_log
         WHERE tenant_id = ?1 AND patient_id = ?2 AND timestamp >= datetime('now', ?3)
         ORDER BY timestamp DESC",
    )?;
    let rows = stmt
        .query_map(
            params![
                tenant_id.to_string(),
                patient_id.to_string(),
                format!("-{days} days")
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let mut entries = Vec::with_capacity(rows.len());
    for (tenant, patient, actor, kind, payload, timestamp) in rows {
        entries.push(AuditEntry {
            tenant_id: tenant.parse().unwrap_or_else(|_| Uuid::nil()),
            patient_id: patient.parse().unwrap_or_else(|_| Uuid::nil()),
            actor_id: actor.parse().unwrap_or_else(|_| Uuid::nil()),
            kind: AuditKind::from_str(&kind)?,
            payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
            timestamp: parse_ts(&timestamp),
        });
    }
    Ok(entries)
}

/// Prune audit entries older than the given number of days.
pub fn prune_audit_log(conn: &Connection, retention_days: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM audit_log WHERE timestamp < datetime('now', ?1)",
        params![format!("-{retention_days} days")],
    )?;
    Ok(deleted)
}

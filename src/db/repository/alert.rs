use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{AlertKind, Severity};
use crate::models::ClinicalAlertRecord;

use super::{format_opt_ts, format_ts, parse_opt_ts, parse_ts};

const ALERT_COLUMNS: &str =
    "id, tenant_id, patient_id, prescription_id, alert_kind, severity, title,
     message, recommendations, triggered_by, created_at,
     acknowledged_by, acknowledged_at, dismissed_reason";

/// Insert a clinical alert record. Plain INSERT: records are immutable and
/// a duplicate id is a caller bug surfaced as a constraint error.
pub fn insert_alert(
    conn: &Connection,
    alert: &ClinicalAlertRecord,
) -> Result<(), DatabaseError> {
    let recommendations_json =
        serde_json::to_string(&alert.recommendations).unwrap_or_else(|_| "[]".to_string());

    conn.execute(
        "INSERT INTO clinical_alerts
         (id, tenant_id, patient_id, prescription_id, alert_kind, severity,
          title, message, recommendations, triggered_by, created_at,
          acknowledged_by, acknowledged_at, dismissed_reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            alert.id.to_string(),
            alert.tenant_id.to_string(),
            alert.patient_id.to_string(),
            alert.prescription_id.map(|id| id.to_string()),
            alert.kind.as_str(),
            alert.severity.as_str(),
            alert.title,
            alert.message,
            recommendations_json,
            alert.triggered_by.to_string(),
            format_ts(&alert.created_at),
            alert.acknowledged_by.map(|id| id.to_string()),
            format_opt_ts(&alert.acknowledged_at),
            alert.dismissed_reason,
        ],
    )?;
    Ok(())
}

pub fn get_alert(
    conn: &Connection,
    alert_id: &Uuid,
    tenant_id: &Uuid,
) -> Result<Option<ClinicalAlertRecord>, DatabaseError> {
    let mut rows = query_alerts(
        conn,
        &format!("SELECT {ALERT_COLUMNS} FROM clinical_alerts WHERE id = ?1 AND tenant_id = ?2"),
        params![alert_id.to_string(), tenant_id.to_string()],
    )?;
    Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
}

/// Record an acknowledgement. Only the acknowledgement columns ever change,
/// and only once: an already-acknowledged alert is left untouched.
pub fn acknowledge_alert(
    conn: &Connection,
    alert_id: &Uuid,
    tenant_id: &Uuid,
    acknowledged_by: &Uuid,
    acknowledged_at: &NaiveDateTime,
    dismissed_reason: Option<&str>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE clinical_alerts
         SET acknowledged_by = ?1, acknowledged_at = ?2, dismissed_reason = ?3
         WHERE id = ?4 AND tenant_id = ?5 AND acknowledged_by IS NULL",
        params![
            acknowledged_by.to_string(),
            format_ts(acknowledged_at),
            dismissed_reason,
            alert_id.to_string(),
            tenant_id.to_string(),
        ],
    )?;
    Ok(changed > 0)
}

/// Alerts for one patient, most severe first.
pub fn list_for_patient(
    conn: &Connection,
    tenant_id: &Uuid,
    patient_id: &Uuid,
) -> Result<Vec<ClinicalAlertRecord>, DatabaseError> {
    query_alerts(
        conn,
        &format!(
            "SELECT {ALERT_COLUMNS} FROM clinical_alerts
             WHERE tenant_id = ?1 AND patient_id = ?2
             ORDER BY CASE severity
               WHEN 'critical' THEN 0
               WHEN 'major' THEN 1
               WHEN 'moderate' THEN 2
               ELSE 3
             END, created_at DESC"
        ),
        params![tenant_id.to_string(), patient_id.to_string()],
    )
}

/// Unacknowledged critical alerts across the tenant.
pub fn list_critical(
    conn: &Connection,
    tenant_id: &Uuid,
) -> Result<Vec<ClinicalAlertRecord>, DatabaseError> {
    query_alerts(
        conn,
        &format!(
            "SELECT {ALERT_COLUMNS} FROM clinical_alerts
             WHERE tenant_id = ?1 AND severity = 'critical' AND acknowledged_by IS NULL
             ORDER BY created_at DESC"
        ),
        params![tenant_id.to_string()],
    )
}

type AlertRow = (
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn query_alerts(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<ClinicalAlertRecord>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, String>(10)?,
                row.get::<_, Option<String>>(11)?,
                row.get::<_, Option<String>>(12)?,
                row.get::<_, Option<String>>(13)?,
            ))
        })?
        .collect::<Result<Vec<AlertRow>, _>>()?;

    let mut alerts = Vec::with_capacity(rows.len());
    for (
        id,
        tenant,
        patient,
        prescription,
        kind,
        severity,
        title,
        message,
        recommendations,
        triggered_by,
        created_at,
        acked_by,
        acked_at,
        dismissed_reason,
    ) in rows
    {
        alerts.push(ClinicalAlertRecord {
            id: id.parse().unwrap_or_else(|_| Uuid::nil()),
            tenant_id: tenant.parse().unwrap_or_else(|_| Uuid::nil()),
            patient_id: patient.parse().unwrap_or_else(|_| Uuid::nil()),
            prescription_id: prescription.and_then(|p| p.parse().ok()),
            kind: AlertKind::from_str(&kind)?,
            severity: Severity::from_str(&severity)?,
            title,
            message,
            recommendations: serde_json::from_str(&recommendations).unwrap_or_default(),
            triggered_by: triggered_by.parse().unwrap_or_else(|_| Uuid::nil()),
            created_at: parse_ts(&created_at),
            acknowledged_by: acked_by.and_then(|a| a.parse().ok()),
            acknowledged_at: parse_opt_ts(acked_at),
            dismissed_reason,
        });
    }
    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn sample(tenant: Uuid, patient: Uuid, severity: Severity) -> ClinicalAlertRecord {
        ClinicalAlertRecord {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            patient_id: patient,
            prescription_id: None,
            kind: AlertKind::DrugInteraction,
            severity,
            title: "Interaction: warfarin + aspirin".into(),
            message: "Concurrent use increases bleeding risk.".into(),
            recommendations: vec!["Monitor INR closely".into()],
            triggered_by: Uuid::new_v4(),
            created_at: super::super::now_utc(),
            acknowledged_by: None,
            acknowledged_at: None,
            dismissed_reason: None,
        }
    }

    #[test]
    fn insert_and_list_round_trip() {
        let conn = open_memory_database().unwrap();
        let (tenant, patient) = (Uuid::new_v4(), Uuid::new_v4());
        let alert = sample(tenant, patient, Severity::Major);
        insert_alert(&conn, &alert).unwrap();

        let listed = list_for_patient(&conn, &tenant, &patient).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, alert.id);
        assert_eq!(listed[0].severity, Severity::Major);
        assert_eq!(listed[0].recommendations, vec!["Monitor INR closely".to_string()]);
    }

    #[test]
    fn listing_orders_by_severity() {
        let conn = open_memory_database().unwrap();
        let (tenant, patient) = (Uuid::new_v4(), Uuid::new_v4());
        insert_alert(&conn, &sample(tenant, patient, Severity::Minor)).unwrap();
        insert_alert(&conn, &sample(tenant, patient, Severity::Critical)).unwrap();
        insert_alert(&conn, &sample(tenant, patient, Severity::Moderate)).unwrap();

        let listed = list_for_patient(&conn, &tenant, &patient).unwrap();
        assert_eq!(listed[0].severity, Severity::Critical);
        assert_eq!(listed[2].severity, Severity::Minor);
    }

    #[test]
    fn acknowledge_only_once() {
        let conn = open_memory_database().unwrap();
        let (tenant, patient) = (Uuid::new_v4(), Uuid::new_v4());
        let alert = sample(tenant, patient, Severity::Critical);
        insert_alert(&conn, &alert).unwrap();

        let physician = Uuid::new_v4();
        let now = super::super::now_utc();
        assert!(acknowledge_alert(
            &conn,
            &alert.id,
            &tenant,
            &physician,
            &now,
            Some("reviewed with pharmacist"),
        )
        .unwrap());

        // Second acknowledgement leaves the first untouched
        assert!(!acknowledge_alert(&conn, &alert.id, &tenant, &Uuid::new_v4(), &now, None).unwrap());

        let stored = get_alert(&conn, &alert.id, &tenant).unwrap().unwrap();
        assert_eq!(stored.acknowledged_by, Some(physician));
        assert_eq!(stored.dismissed_reason.as_deref(), Some("reviewed with pharmacist"));
    }

    #[test]
    fn critical_listing_excludes_acknowledged() {
        let conn = open_memory_database().unwrap();
        let tenant = Uuid::new_v4();
        let acked = sample(tenant, Uuid::new_v4(), Severity::Critical);
        let open = sample(tenant, Uuid::new_v4(), Severity::Critical);
        insert_alert(&conn, &acked).unwrap();
        insert_alert(&conn, &open).unwrap();
        acknowledge_alert(
            &conn,
            &acked.id,
            &tenant,
            &Uuid::new_v4(),
            &super::super::now_utc(),
            None,
        )
        .unwrap();

        let critical = list_critical(&conn, &tenant).unwrap();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].id, open.id);
    }

    #[test]
    fn alerts_are_tenant_scoped() {
        let conn = open_memory_database().unwrap();
        let (tenant, patient) = (Uuid::new_v4(), Uuid::new_v4());
        insert_alert(&conn, &sample(tenant, patient, Severity::Major)).unwrap();

        assert!(list_for_patient(&conn, &Uuid::new_v4(), &patient)
            .unwrap()
            .is_empty());
    }
}

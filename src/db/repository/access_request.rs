use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::{AccessRequestType, RequestStatus, RequestUrgency};
use crate::models::{PatientAccessRequest, QueryScope};

use super::{format_opt_ts, format_ts, parse_opt_ts, parse_ts};

const REQUEST_COLUMNS: &str =
    "id, tenant_id, patient_id, requesting_physician_id, target_physician_id,
     request_type, reason, urgency, status, requested_date,
     reviewed_by, reviewed_date, review_notes, access_granted_until";

pub fn insert_request(
    conn: &Connection,
    request: &PatientAccessRequest,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO access_requests
         (id, tenant_id, patient_id, requesting_physician_id, target_physician_id,
          request_type, reason, urgency, status, requested_date,
          reviewed_by, reviewed_date, review_notes, access_granted_until)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            request.id.to_string(),
            request.tenant_id.to_string(),
            request.patient_id.to_string(),
            request.requesting_physician_id.to_string(),
            request.target_physician_id.map(|id| id.to_string()),
            request.request_type.as_str(),
            request.reason,
            request.urgency.as_str(),
            request.status.as_str(),
            format_ts(&request.requested_date),
            request.reviewed_by.map(|id| id.to_string()),
            format_opt_ts(&request.reviewed_date),
            request.review_notes,
            format_opt_ts(&request.access_granted_until),
        ],
    )?;
    Ok(())
}

/// Fetch a request by id, scoped to the caller's tenant. A request belonging
/// to another tenant is indistinguishable from a missing one.
pub fn get_scoped(
    conn: &Connection,
    request_id: &Uuid,
    tenant_id: &Uuid,
) -> Result<Option<PatientAccessRequest>, DatabaseError> {
    let mut rows = query_requests(
        conn,
        &format!("SELECT {REQUEST_COLUMNS} FROM access_requests WHERE id = ?1 AND tenant_id = ?2"),
        params![request_id.to_string(), tenant_id.to_string()],
    )?;
    Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
}

/// True when an approved request currently grants the physician access to
/// the patient. The expiry comparison runs against the clock on every call;
/// an approved request whose window has passed grants nothing.
pub fn has_live_approval(
    conn: &Connection,
    tenant_id: &Uuid,
    patient_id: &Uuid,
    physician_id: &Uuid,
) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM access_requests
         WHERE tenant_id = ?1 AND patient_id = ?2 AND requesting_physician_id = ?3
           AND status = 'approved'
           AND (access_granted_until IS NULL OR access_granted_until > datetime('now'))",
        params![
            tenant_id.to_string(),
            patient_id.to_string(),
            physician_id.to_string()
        ],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Move a pending request to its terminal status. The pending guard in the
/// WHERE clause makes the transition one-way even under concurrent
/// reviewers: whoever updates first wins, later calls change nothing.
#[allow(clippy::too_many_arguments)]
pub fn mark_reviewed(
    conn: &Connection,
    request_id: &Uuid,
    tenant_id: &Uuid,
    status: RequestStatus,
    reviewed_by: &Uuid,
    reviewed_date: &NaiveDateTime,
    review_notes: Option<&str>,
    access_granted_until: Option<NaiveDateTime>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE access_requests
         SET status = ?1, reviewed_by = ?2, reviewed_date = ?3,
             review_notes = ?4, access_granted_until = ?5
         WHERE id = ?6 AND tenant_id = ?7 AND status = 'pending'",
        params![
            status.as_str(),
            reviewed_by.to_string(),
            format_ts(reviewed_date),
            review_notes,
            format_opt_ts(&access_granted_until),
            request_id.to_string(),
            tenant_id.to_string(),
        ],
    )?;
    Ok(changed > 0)
}

/// List pending requests, most urgent review queue first by request date.
pub fn list_pending(
    conn: &Connection,
    scope: &QueryScope,
) -> Result<Vec<PatientAccessRequest>, DatabaseError> {
    match scope.tenant_filter() {
        Some(tenant_id) => query_requests(
            conn,
            &format!(
                "SELECT {REQUEST_COLUMNS} FROM access_requests
                 WHERE tenant_id = ?1 AND status = 'pending'
                 ORDER BY requested_date ASC"
            ),
            params![tenant_id.to_string()],
        ),
        None => query_requests(
            conn,
            &format!(
                "SELECT {REQUEST_COLUMNS} FROM access_requests
                 WHERE status = 'pending'
                 ORDER BY requested_date ASC"
            ),
            [],
        ),
    }
}

type RequestRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn query_requests(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<PatientAccessRequest>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, Option<String>>(10)?,
                row.get::<_, Option<String>>(11)?,
                row.get::<_, Option<String>>(12)?,
                row.get::<_, Option<String>>(13)?,
            ))
        })?
        .collect::<Result<Vec<RequestRow>, _>>()?;

    let mut requests = Vec::with_capacity(rows.len());
    for (
        id,
        tenant,
        patient,
        requester,
        target,
        kind,
        reason,
        urgency,
        status,
        requested,
        reviewed_by,
        reviewed_date,
        review_notes,
        granted_until,
    ) in rows
    {
        requests.push(PatientAccessRequest {
            id: id.parse().unwrap_or_else(|_| Uuid::nil()),
            tenant_id: tenant.parse().unwrap_or_else(|_| Uuid::nil()),
            patient_id: patient.parse().unwrap_or_else(|_| Uuid::nil()),
            requesting_physician_id: requester.parse().unwrap_or_else(|_| Uuid::nil()),
            target_physician_id: target.and_then(|t| t.parse().ok()),
            request_type: AccessRequestType::from_str(&kind)?,
            reason,
            urgency: RequestUrgency::from_str(&urgency)?,
            status: RequestStatus::from_str(&status)?,
            requested_date: parse_ts(&requested),
            reviewed_by: reviewed_by.and_then(|r| r.parse().ok()),
            reviewed_date: parse_opt_ts(reviewed_date),
            review_notes,
            access_granted_until: parse_opt_ts(granted_until),
        });
    }
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn pending(tenant: Uuid, patient: Uuid, physician: Uuid) -> PatientAccessRequest {
        PatientAccessRequest {
            id: Uuid::new_v4(),
            tenant_id: tenant,
            patient_id: patient,
            requesting_physician_id: physician,
            target_physician_id: None,
            request_type: AccessRequestType::Consultation,
            reason: "covering weekend rounds".into(),
            urgency: RequestUrgency::Routine,
            status: RequestStatus::Pending,
            requested_date: super::super::now_utc(),
            reviewed_by: None,
            reviewed_date: None,
            review_notes: None,
            access_granted_until: None,
        }
    }

    #[test]
    fn insert_and_scoped_fetch() {
        let conn = open_memory_database().unwrap();
        let request = pending(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        insert_request(&conn, &request).unwrap();

        let found = get_scoped(&conn, &request.id, &request.tenant_id).unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().reason, "covering weekend rounds");

        // Another tenant sees nothing
        assert!(get_scoped(&conn, &request.id, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn review_transition_is_one_way() {
        let conn = open_memory_database().unwrap();
        let request = pending(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        insert_request(&conn, &request).unwrap();
        let reviewer = Uuid::new_v4();
        let now = super::super::now_utc();

        assert!(mark_reviewed(
            &conn,
            &request.id,
            &request.tenant_id,
            RequestStatus::Approved,
            &reviewer,
            &now,
            None,
            None,
        )
        .unwrap());

        // A second reviewer cannot flip the decision
        assert!(!mark_reviewed(
            &conn,
            &request.id,
            &request.tenant_id,
            RequestStatus::Denied,
            &Uuid::new_v4(),
            &now,
            Some("late denial"),
            None,
        )
        .unwrap());

        let stored = get_scoped(&conn, &request.id, &request.tenant_id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, RequestStatus::Approved);
        assert_eq!(stored.reviewed_by, Some(reviewer));
    }

    #[test]
    fn live_approval_requires_future_or_open_window() {
        let conn = open_memory_database().unwrap();
        let (tenant, patient, physician) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let request = pending(tenant, patient, physician);
        insert_request(&conn, &request).unwrap();
        let now = super::super::now_utc();

        // Pending grants nothing
        assert!(!has_live_approval(&conn, &tenant, &patient, &physician).unwrap());

        // Approved with an already-expired window still grants nothing
        mark_reviewed(
            &conn,
            &request.id,
            &tenant,
            RequestStatus::Approved,
            &Uuid::new_v4(),
            &now,
            None,
            Some(now - chrono::Duration::hours(1)),
        )
        .unwrap();
        assert!(!has_live_approval(&conn, &tenant, &patient, &physician).unwrap());

        // A second, open-ended approval grants access
        let open = pending(tenant, patient, physician);
        insert_request(&conn, &open).unwrap();
        mark_reviewed(
            &conn,
            &open.id,
            &tenant,
            RequestStatus::Approved,
            &Uuid::new_v4(),
            &now,
            None,
            None,
        )
        .unwrap();
        assert!(has_live_approval(&conn, &tenant, &patient, &physician).unwrap());
    }

    #[test]
    fn pending_list_is_tenant_scoped() {
        let conn = open_memory_database().unwrap();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        insert_request(&conn, &pending(tenant_a, Uuid::new_v4(), Uuid::new_v4())).unwrap();
        insert_request(&conn, &pending(tenant_b, Uuid::new_v4(), Uuid::new_v4())).unwrap();

        let scoped = list_pending(&conn, &QueryScope::tenant(tenant_a)).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].tenant_id, tenant_a);

        let all = list_pending(
            &conn,
            &QueryScope::platform(crate::models::PlatformAdmin),
        )
        .unwrap();
        assert_eq!(all.len(), 2);
    }
}

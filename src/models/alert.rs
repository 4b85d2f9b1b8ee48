use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AlertKind, Severity};

/// Persisted output of a safety check. Immutable after insert except the
/// acknowledgement fields; never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalAlertRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    pub prescription_id: Option<Uuid>,
    pub kind: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub recommendations: Vec<String>,
    pub triggered_by: Uuid,
    pub created_at: NaiveDateTime,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<NaiveDateTime>,
    pub dismissed_reason: Option<String>,
}

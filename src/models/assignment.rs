use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AssignmentType;

/// Durable binding of one physician to one patient within one tenant.
/// Removal is a soft-deactivation; rows are retained for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientAssignment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    pub physician_id: Uuid,
    pub assignment_type: AssignmentType,
    pub assigned_by: Uuid,
    pub assigned_date: NaiveDateTime,
    pub expiry_date: Option<NaiveDateTime>,
    pub is_active: bool,
    pub notes: Option<String>,
}

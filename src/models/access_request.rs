use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AccessRequestType, RequestStatus, RequestUrgency};

/// A time-bounded exception to normal assignment, raised by a physician who
/// is not assigned to the patient.
///
/// Status only ever moves pending -> approved or pending -> denied. Whether an
/// approved request currently grants access is a separate temporal question:
/// `access_granted_until` is compared against the clock at every access check,
/// never baked into the status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientAccessRequest {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    pub requesting_physician_id: Uuid,
    pub target_physician_id: Option<Uuid>,
    pub request_type: AccessRequestType,
    pub reason: String,
    pub urgency: RequestUrgency,
    pub status: RequestStatus,
    pub requested_date: NaiveDateTime,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_date: Option<NaiveDateTime>,
    pub review_notes: Option<String>,
    pub access_granted_until: Option<NaiveDateTime>,
}

//! Patient access authorization.
//!
//! Implements the 2-rule access cascade:
//! 1. Active assignment for (physician, patient, tenant) → ACCESS
//! 2. Approved access request whose window is open → ACCESS
//! 3. Default → DENY
//!
//! Default-deny, checked in order. Every operation takes an explicit tenant
//! id; there is no way to query across tenants from here. Any storage
//! failure during a check is converted to a denial, never an error.

use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository::{
    access_request as request_repo, assignment as assignment_repo, now_utc,
};
use crate::db::DatabaseError;
use crate::models::enums::{AccessRequestType, AssignmentType, RequestStatus, RequestUrgency};
use crate::models::{PatientAccessRequest, PatientAssignment, QueryScope};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Input for raising an access request.
#[derive(Debug, Clone)]
pub struct AccessRequestInput {
    pub patient_id: Uuid,
    pub tenant_id: Uuid,
    pub requesting_physician_id: Uuid,
    pub target_physician_id: Option<Uuid>,
    pub request_type: AccessRequestType,
    pub reason: String,
    pub urgency: RequestUrgency,
}

/// Errors from access-control mutations. Read paths never surface these;
/// `has_access` folds every failure into a denial.
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Review notes are required when denying a request")]
    EmptyReviewNotes,

    #[error("Internal lock failed")]
    LockFailed,
}

// ═══════════════════════════════════════════════════════════
// Guard
// ═══════════════════════════════════════════════════════════

/// Decides whether a physician may act on a patient's record, and owns the
/// assignment / access-request lifecycle.
pub struct AccessControlGuard {
    conn: Arc<Mutex<Connection>>,
}

impl AccessControlGuard {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Check whether the physician may act on the patient within the tenant.
    ///
    /// Never fails: absence of a grant, an unknown patient, and a storage
    /// fault all come back as `false`. The request-expiry predicate is
    /// evaluated against the clock on every call, never cached.
    pub fn has_access(&self, physician_id: &Uuid, patient_id: &Uuid, tenant_id: &Uuid) -> bool {
        match self.check_access(physician_id, patient_id, tenant_id) {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!(
                    %physician_id,
                    %patient_id,
                    %tenant_id,
                    error = %e,
                    "Access check failed, denying"
                );
                false
            }
        }
    }

    fn check_access(
        &self,
        physician_id: &Uuid,
        patient_id: &Uuid,
        tenant_id: &Uuid,
    ) -> Result<bool, AccessError> {
        let conn = self.lock()?;

        // Rule 1: active assignment
        if assignment_repo::has_active_assignment(&conn, tenant_id, patient_id, physician_id)? {
            return Ok(true);
        }

        // Rule 2: approved request with an open window
        if request_repo::has_live_approval(&conn, tenant_id, patient_id, physician_id)? {
            return Ok(true);
        }

        // Rule 3: default deny
        Ok(false)
    }

    /// Create a new assignment. Prior assignments stay active; a patient can
    /// hold a primary-care and a consulting physician at once.
    pub fn assign(
        &self,
        patient_id: Uuid,
        physician_id: Uuid,
        tenant_id: Uuid,
        assignment_type: AssignmentType,
        assigned_by: Uuid,
        notes: Option<String>,
    ) -> Result<PatientAssignment, AccessError> {
        let assignment = PatientAssignment {
            id: Uuid::new_v4(),
            tenant_id,
            patient_id,
            physician_id,
            assignment_type,
            assigned_by,
            assigned_date: now_utc(),
            expiry_date: None,
            is_active: true,
            notes,
        };

        let conn = self.lock()?;
        assignment_repo::insert_assignment(&conn, &assignment)?;
        tracing::info!(
            assignment_id = %assignment.id,
            %tenant_id,
            %patient_id,
            %physician_id,
            kind = assignment_type.as_str(),
            "Created patient assignment"
        );
        Ok(assignment)
    }

    /// Raise a pending access request.
    pub fn request_access(
        &self,
        input: AccessRequestInput,
    ) -> Result<PatientAccessRequest, AccessError> {
        let request = PatientAccessRequest {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            patient_id: input.patient_id,
            requesting_physician_id: input.requesting_physician_id,
            target_physician_id: input.target_physician_id,
            request_type: input.request_type,
            reason: input.reason,
            urgency: input.urgency,
            status: RequestStatus::Pending,
            requested_date: now_utc(),
            reviewed_by: None,
            reviewed_date: None,
            review_notes: None,
            access_granted_until: None,
        };

        let conn = self.lock()?;
        request_repo::insert_request(&conn, &request)?;
        tracing::info!(
            request_id = %request.id,
            tenant_id = %request.tenant_id,
            patient_id = %request.patient_id,
            urgency = request.urgency.as_str(),
            "Raised access request"
        );
        Ok(request)
    }

    /// Approve a pending request, optionally bounding the granted window.
    ///
    /// Returns `None` when the request is missing, belongs to another
    /// tenant, has already been reviewed, or the proposed window is already
    /// closed; concurrent reviewers are expected, so none of these are
    /// errors.
    pub fn approve(
        &self,
        request_id: &Uuid,
        tenant_id: &Uuid,
        reviewed_by: &Uuid,
        access_until: Option<NaiveDateTime>,
    ) -> Result<Option<PatientAccessRequest>, AccessError> {
        if let Some(until) = access_until {
            if until <= now_utc() {
                tracing::warn!(
                    %request_id,
                    %tenant_id,
                    "Rejected approval with an expiry already in the past"
                );
                return Ok(None);
            }
        }

        let conn = self.lock()?;
        let transitioned = request_repo::mark_reviewed(
            &conn,
            request_id,
            tenant_id,
            RequestStatus::Approved,
            reviewed_by,
            &now_utc(),
            None,
            access_until,
        )?;
        if !transitioned {
            return Ok(None);
        }

        tracing::info!(%request_id, %tenant_id, "Approved access request");
        request_repo::get_scoped(&conn, request_id, tenant_id).map_err(AccessError::from)
    }

    /// Deny a pending request. Review notes are mandatory: a denial with no
    /// recorded reason is not auditable.
    pub fn deny(
        &self,
        request_id: &Uuid,
        tenant_id: &Uuid,
        reviewed_by: &Uuid,
        review_notes: &str,
    ) -> Result<Option<PatientAccessRequest>, AccessError> {
        if review_notes.trim().is_empty() {
            return Err(AccessError::EmptyReviewNotes);
        }

        let conn = self.lock()?;
        let transitioned = request_repo::mark_reviewed(
            &conn,
            request_id,
            tenant_id,
            RequestStatus::Denied,
            reviewed_by,
            &now_utc(),
            Some(review_notes),
            None,
        )?;
        if !transitioned {
            return Ok(None);
        }

        tracing::info!(%request_id, %tenant_id, "Denied access request");
        request_repo::get_scoped(&conn, request_id, tenant_id).map_err(AccessError::from)
    }

    /// Soft-deactivate an assignment. Returns `false` when nothing matched.
    pub fn revoke(&self, assignment_id: &Uuid, tenant_id: &Uuid) -> Result<bool, AccessError> {
        let conn = self.lock()?;
        let revoked = assignment_repo::deactivate_assignment(&conn, assignment_id, tenant_id)?;
        if revoked {
            tracing::info!(%assignment_id, %tenant_id, "Revoked patient assignment");
        }
        Ok(revoked)
    }

    /// Assignments for a patient. Revoked rows are retained and included
    /// only on request.
    pub fn assignments_for_patient(
        &self,
        scope: &QueryScope,
        patient_id: &Uuid,
        include_inactive: bool,
    ) -> Result<Vec<PatientAssignment>, AccessError> {
        let conn = self.lock()?;
        Ok(assignment_repo::list_for_patient(
            &conn,
            scope,
            patient_id,
            include_inactive,
        )?)
    }

    /// Requests awaiting review.
    pub fn pending_requests(
        &self,
        scope: &QueryScope,
    ) -> Result<Vec<PatientAccessRequest>, AccessError> {
        let conn = self.lock()?;
        Ok(request_repo::list_pending(&conn, scope)?)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, AccessError> {
        self.conn.lock().map_err(|_| AccessError::LockFailed)
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

//! Orchestration of the single "propose prescription" use case: access
//! check first, clinical screening second, persistence of every finding
//! last. The access decision is settled and audited before any clinical
//! computation runs, so a denied actor can never learn patient facts from
//! alert content.

use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::access::AccessControlGuard;
use crate::audit::{AuditEntry, AuditError, AuditSink};
use crate::db::repository::{alert as alert_repo, now_utc};
use crate::db::DatabaseError;
use crate::engine::{ClinicalRuleEngine, SafetyCheckRequest, SafetyEvaluation};
use crate::gateway::{PatientRecordGateway, RuleCatalog};
use crate::models::enums::AuditKind;
use crate::models::ClinicalAlertRecord;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// A proposed prescription, presented by the (excluded) prescription
/// workflow.
#[derive(Debug, Clone)]
pub struct PrescriptionProposal {
    pub actor_id: Uuid,
    pub patient_id: Uuid,
    pub tenant_id: Uuid,
    pub drug_name: String,
    pub dosage: String,
    pub frequency: String,
    pub patient_conditions: Vec<String>,
    pub prescription_id: Option<Uuid>,
}

/// The single decision object returned to the caller.
#[derive(Debug, Clone)]
pub struct ProposalOutcome {
    pub allowed: bool,
    pub evaluation: SafetyEvaluation,
}

/// Coordinator failures. Clinical and access faults never land here; they
/// degrade inside their subsystems. What does land here is an audit or
/// alert-record write failure: an unaudited safety finding is worse than a
/// failed prescription attempt, so this is where the core fails loud.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("audit write failed: {0}")]
    Audit(#[from] AuditError),

    #[error("alert record write failed: {0}")]
    AlertStore(#[from] DatabaseError),

    #[error("internal lock failed")]
    LockFailed,
}

// ═══════════════════════════════════════════════════════════
// Coordinator
// ═══════════════════════════════════════════════════════════

pub struct SafetyDecisionCoordinator<G, C, A> {
    guard: AccessControlGuard,
    engine: ClinicalRuleEngine<G, C>,
    audit: Arc<A>,
    conn: Arc<Mutex<Connection>>,
}

impl<G, C, A> SafetyDecisionCoordinator<G, C, A>
where
    G: PatientRecordGateway,
    C: RuleCatalog,
    A: AuditSink,
{
    pub fn new(
        guard: AccessControlGuard,
        engine: ClinicalRuleEngine<G, C>,
        audit: Arc<A>,
        conn: Arc<Mutex<Connection>>,
    ) -> Self {
        Self {
            guard,
            engine,
            audit,
            conn,
        }
    }

    /// Screen a proposed prescription.
    ///
    /// Sequence: access decision, audit of that decision, clinical
    /// evaluation, persistence of every alert (record + audit entry), then
    /// the aggregate outcome. Alerts are written only after the full
    /// evaluation completes, never mid-flight.
    pub async fn propose_prescription(
        &self,
        proposal: &PrescriptionProposal,
    ) -> Result<ProposalOutcome, CoordinatorError> {
        let permitted = self.guard.has_access(
            &proposal.actor_id,
            &proposal.patient_id,
            &proposal.tenant_id,
        );

        self.audit.append(&AuditEntry::new(
            proposal.tenant_id,
            proposal.patient_id,
            proposal.actor_id,
            AuditKind::AccessDecision,
            serde_json::json!({
                "operation": "propose_prescription",
                "allowed": permitted,
            }),
        ))?;

        if !permitted {
            tracing::info!(
                actor_id = %proposal.actor_id,
                patient_id = %proposal.patient_id,
                tenant_id = %proposal.tenant_id,
                "Prescription proposal denied before clinical screening"
            );
            return Ok(ProposalOutcome {
                allowed: false,
                evaluation: SafetyEvaluation::empty(),
            });
        }

        let evaluation = self
            .engine
            .evaluate(&SafetyCheckRequest {
                patient_id: proposal.patient_id,
                tenant_id: proposal.tenant_id,
                drug_name: proposal.drug_name.clone(),
                dosage: proposal.dosage.clone(),
                frequency: proposal.frequency.clone(),
                patient_conditions: proposal.patient_conditions.clone(),
            })
            .await;

        for alert in &evaluation.alerts {
            let record = ClinicalAlertRecord {
                id: Uuid::new_v4(),
                tenant_id: proposal.tenant_id,
                patient_id: proposal.patient_id,
                prescription_id: proposal.prescription_id,
                kind: alert.kind,
                severity: alert.severity,
                title: alert.title.clone(),
                message: alert.message.clone(),
                recommendations: alert.recommendations.clone(),
                triggered_by: proposal.actor_id,
                created_at: now_utc(),
                acknowledged_by: None,
                acknowledged_at: None,
                dismissed_reason: None,
            };

            {
                let conn = self.lock()?;
                alert_repo::insert_alert(&conn, &record)?;
            }

            self.audit.append(&AuditEntry::new(
                proposal.tenant_id,
                proposal.patient_id,
                proposal.actor_id,
                AuditKind::ClinicalAlert,
                serde_json::json!({
                    "alert_id": record.id,
                    "kind": record.kind.as_str(),
                    "severity": record.severity.as_str(),
                    "title": record.title,
                }),
            ))?;
        }

        Ok(ProposalOutcome {
            allowed: evaluation.can_proceed,
            evaluation,
        })
    }

    /// Acknowledge a stored alert. Only the acknowledgement fields change,
    /// and only the first acknowledgement sticks.
    pub fn acknowledge_alert(
        &self,
        alert_id: &Uuid,
        tenant_id: &Uuid,
        acknowledged_by: &Uuid,
        dismissed_reason: Option<&str>,
    ) -> Result<bool, CoordinatorError> {
        let now: NaiveDateTime = now_utc();
        let conn = self.lock()?;
        Ok(alert_repo::acknowledge_alert(
            &conn,
            alert_id,
            tenant_id,
            acknowledged_by,
            &now,
            dismissed_reason,
        )?)
    }

    /// Stored alerts for one patient, most severe first.
    pub fn alerts_for_patient(
        &self,
        tenant_id: &Uuid,
        patient_id: &Uuid,
    ) -> Result<Vec<ClinicalAlertRecord>, CoordinatorError> {
        let conn = self.lock()?;
        Ok(alert_repo::list_for_patient(&conn, tenant_id, patient_id)?)
    }

    /// Unacknowledged critical alerts across the tenant.
    pub fn critical_alerts(
        &self,
        tenant_id: &Uuid,
    ) -> Result<Vec<ClinicalAlertRecord>, CoordinatorError> {
        let conn = self.lock()?;
        Ok(alert_repo::list_critical(&conn, tenant_id)?)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CoordinatorError> {
        self.conn.lock().map_err(|_| CoordinatorError::LockFailed)
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

//! Audited cross-tenant reads.
//!
//! A tenant reading another tenant's patient data (a pharmacy pulling
//! allergies for dispensing, a laboratory pulling prescription history)
//! must present an explicit context naming itself and its justification.
//! The audit entry is written synchronously before the gateway is called,
//! so every cross-tenant read leaves a trace even if the caller crashes
//! immediately after receiving the data.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditError, AuditSink};
use crate::gateway::{AllergyRecord, GatewayError, PatientRecordGateway, PrescriptionRecord};
use crate::models::enums::{AccessJustification, AuditKind};

/// Who is asking, and why. Mandatory on every cross-tenant accessor; there
/// is no default and no way to reach the data without one.
#[derive(Debug, Clone)]
pub struct CrossTenantContext {
    pub requesting_tenant: Uuid,
    pub actor_id: Uuid,
    pub justification: AccessJustification,
}

#[derive(Error, Debug)]
pub enum CrossTenantError {
    /// The pre-read audit write failed; no data was fetched or returned.
    #[error("cross-tenant audit write failed: {0}")]
    Audit(#[from] AuditError),

    #[error("patient record gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("patient record gateway timed out after {0:?}")]
    Timeout(Duration),
}

/// Cross-tenant read surface over the patient-record gateway.
pub struct CrossTenantReader<G, A> {
    gateway: Arc<G>,
    audit: Arc<A>,
    timeout: Duration,
}

impl<G: PatientRecordGateway, A: AuditSink> CrossTenantReader<G, A> {
    pub fn new(gateway: Arc<G>, audit: Arc<A>, timeout: Duration) -> Self {
        Self {
            gateway,
            audit,
            timeout,
        }
    }

    /// Read another tenant's patient allergy list.
    pub async fn read_allergies(
        &self,
        context: &CrossTenantContext,
        patient_id: &Uuid,
        owning_tenant: &Uuid,
    ) -> Result<Vec<AllergyRecord>, CrossTenantError> {
        self.log_read(context, patient_id, owning_tenant, "allergies")?;
        self.bounded(self.gateway.allergies(patient_id, owning_tenant))
            .await
    }

    /// Read another tenant's patient prescription history.
    pub async fn read_prescriptions(
        &self,
        context: &CrossTenantContext,
        patient_id: &Uuid,
        owning_tenant: &Uuid,
    ) -> Result<Vec<PrescriptionRecord>, CrossTenantError> {
        self.log_read(context, patient_id, owning_tenant, "prescriptions")?;
        self.bounded(self.gateway.active_prescriptions(patient_id, owning_tenant))
            .await
    }

    /// Synchronous audit write. A failure here aborts the read.
    fn log_read(
        &self,
        context: &CrossTenantContext,
        patient_id: &Uuid,
        owning_tenant: &Uuid,
        dataset: &str,
    ) -> Result<(), CrossTenantError> {
        self.audit.append(&AuditEntry::new(
            context.requesting_tenant,
            *patient_id,
            context.actor_id,
            AuditKind::CrossTenantRead,
            serde_json::json!({
                "owning_tenant": owning_tenant,
                "justification": context.justification.as_str(),
                "dataset": dataset,
            }),
        ))?;
        tracing::info!(
            requesting_tenant = %context.requesting_tenant,
            %owning_tenant,
            %patient_id,
            justification = context.justification.as_str(),
            dataset,
            "Cross-tenant read"
        );
        Ok(())
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, CrossTenantError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(CrossTenantError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::RecordingSink;
    use crate::gateway::testing::StaticGateway;
    use crate::models::enums::AllergySeverity;

    fn context() -> CrossTenantContext {
        CrossTenantContext {
            requesting_tenant: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            justification: AccessJustification::Billing,
        }
    }

    fn reader(
        gateway: StaticGateway,
        sink: RecordingSink,
    ) -> CrossTenantReader<StaticGateway, RecordingSink> {
        CrossTenantReader::new(
            Arc::new(gateway),
            Arc::new(sink),
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn read_is_audited_before_data_returns() {
        let gateway = StaticGateway {
            allergies: vec![AllergyRecord {
                allergen: "penicillin".into(),
                severity: AllergySeverity::Severe,
                reaction: Some("hives".into()),
            }],
            ..Default::default()
        };
        let reader = reader(gateway, RecordingSink::default());
        let ctx = context();

        let (patient, owner) = (Uuid::new_v4(), Uuid::new_v4());
        let allergies = reader.read_allergies(&ctx, &patient, &owner).await.unwrap();
        assert_eq!(allergies.len(), 1);

        let entries = reader.audit.recorded();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, AuditKind::CrossTenantRead);
        assert_eq!(entries[0].tenant_id, ctx.requesting_tenant);
        assert_eq!(entries[0].payload["justification"], "billing");
        assert_eq!(entries[0].payload["dataset"], "allergies");
    }

    #[tokio::test]
    async fn audit_failure_blocks_the_read() {
        let gateway = StaticGateway::default();
        let sink = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let reader = reader(gateway, sink);

        let outcome = reader
            .read_allergies(&context(), &Uuid::new_v4(), &Uuid::new_v4())
            .await;
        assert!(matches!(outcome, Err(CrossTenantError::Audit(_))));
        // The gateway was never consulted
        assert_eq!(reader.gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn gateway_failure_still_leaves_an_audit_entry() {
        let gateway = StaticGateway {
            fail: true,
            ..Default::default()
        };
        let reader = reader(gateway, RecordingSink::default());

        let outcome = reader
            .read_prescriptions(&context(), &Uuid::new_v4(), &Uuid::new_v4())
            .await;
        assert!(matches!(outcome, Err(CrossTenantError::Gateway(_))));
        assert_eq!(reader.audit.recorded().len(), 1);
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let gateway = StaticGateway {
            delay: Some(Duration::from_millis(500)),
            ..Default::default()
        };
        let reader = reader(gateway, RecordingSink::default());

        let outcome = reader
            .read_allergies(&context(), &Uuid::new_v4(), &Uuid::new_v4())
            .await;
        assert!(matches!(outcome, Err(CrossTenantError::Timeout(_))));
    }
}

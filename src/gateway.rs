//! Contracts for the two external collaborators: the patient-record service
//! that owns clinical facts, and the rule catalog that owns screening
//! reference content. Neither is implemented here; callers inject their own.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::engine::classes::DrugClassTable;
use crate::models::enums::{AllergySeverity, PrescriptionStatus, Severity};

// ═══════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════

/// One prescription on the patient's record, as reported by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    pub medication_name: String,
    pub status: PrescriptionStatus,
}

/// One recorded allergy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllergyRecord {
    pub allergen: String,
    pub severity: AllergySeverity,
    pub reaction: Option<String>,
}

/// A catalog rule relating two drug names, order-independent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugInteractionRule {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub description: String,
    pub clinical_impact: String,
    pub management: String,
}

/// A dosing constraint for one drug, optionally tied to a patient condition.
/// `condition: None` marks a general, condition-independent ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DosageWarning {
    pub drug_name: String,
    pub condition: Option<String>,
    pub min_dose: Option<f64>,
    pub max_dose: Option<f64>,
    pub unit: String,
    pub guidance: String,
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The patient does not exist, or exists under a different tenant than
    /// claimed. Loggable, but callers must present it exactly like any
    /// other denial or empty result.
    #[error("patient {patient_id} not known to tenant {tenant_id}")]
    UnknownPatient { patient_id: Uuid, tenant_id: Uuid },

    #[error("patient record service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("rule catalog unavailable: {0}")]
    Unavailable(String),
}

// ═══════════════════════════════════════════════════════════
// Collaborator traits
// ═══════════════════════════════════════════════════════════

/// Read-only view of a patient's clinical facts, scoped by tenant.
#[allow(async_fn_in_trait)]
pub trait PatientRecordGateway: Send + Sync {
    /// Prescriptions currently on record, any status. Filtering out
    /// non-current statuses is the caller's concern.
    async fn active_prescriptions(
        &self,
        patient_id: &Uuid,
        tenant_id: &Uuid,
    ) -> Result<Vec<PrescriptionRecord>, GatewayError>;

    async fn allergies(
        &self,
        patient_id: &Uuid,
        tenant_id: &Uuid,
    ) -> Result<Vec<AllergyRecord>, GatewayError>;
}

/// Read-only screening reference content.
#[allow(async_fn_in_trait)]
pub trait RuleCatalog: Send + Sync {
    /// Rule for the unordered pair (drug_a, drug_b), if one exists.
    async fn find_interaction(
        &self,
        drug_a: &str,
        drug_b: &str,
    ) -> Result<Option<DrugInteractionRule>, CatalogError>;

    async fn find_dosage_warning(
        &self,
        drug_name: &str,
        condition: Option<&str>,
    ) -> Result<Option<DosageWarning>, CatalogError>;

    async fn general_dosage_warnings(
        &self,
        drug_name: &str,
    ) -> Result<Vec<DosageWarning>, CatalogError>;

    /// Therapeutic-class patterns for duplicate-therapy screening.
    async fn drug_classes(&self) -> Result<DrugClassTable, CatalogError>;
}

// ═══════════════════════════════════════════════════════════
// Test doubles
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Canned-response gateway for tests. `fail` simulates an outage,
    /// `delay` a slow backend; `calls` counts fetches for ordering checks.
    #[derive(Default)]
    pub(crate) struct StaticGateway {
        pub prescriptions: Vec<PrescriptionRecord>,
        pub allergies: Vec<AllergyRecord>,
        pub fail: bool,
        pub delay: Option<Duration>,
        pub calls: AtomicUsize,
    }

    impl StaticGateway {
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn simulate(&self) -> Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(GatewayError::Unavailable("record service offline".into()));
            }
            Ok(())
        }
    }

    impl PatientRecordGateway for StaticGateway {
        async fn active_prescriptions(
            &self,
            _patient_id: &Uuid,
            _tenant_id: &Uuid,
        ) -> Result<Vec<PrescriptionRecord>, GatewayError> {
            self.simulate().await?;
            Ok(self.prescriptions.clone())
        }

        async fn allergies(
            &self,
            _patient_id: &Uuid,
            _tenant_id: &Uuid,
        ) -> Result<Vec<AllergyRecord>, GatewayError> {
            self.simulate().await?;
            Ok(self.allergies.clone())
        }
    }

    #[derive(Default)]
    pub(crate) struct StaticCatalog {
        pub interactions: Vec<DrugInteractionRule>,
        pub warnings: Vec<DosageWarning>,
        pub classes: DrugClassTable,
        pub fail: bool,
    }

    impl StaticCatalog {
        fn check_available(&self) -> Result<(), CatalogError> {
            if self.fail {
                return Err(CatalogError::Unavailable("catalog offline".into()));
            }
            Ok(())
        }
    }

    impl RuleCatalog for StaticCatalog {
        async fn find_interaction(
            &self,
            drug_a: &str,
            drug_b: &str,
        ) -> Result<Option<DrugInteractionRule>, CatalogError> {
            self.check_available()?;
            Ok(self
                .interactions
                .iter()
                .find(|rule| {
                    (rule.drug_a.eq_ignore_ascii_case(drug_a)
                        && rule.drug_b.eq_ignore_ascii_case(drug_b))
                        || (rule.drug_a.eq_ignore_ascii_case(drug_b)
                            && rule.drug_b.eq_ignore_ascii_case(drug_a))
                })
                .cloned())
        }

        async fn find_dosage_warning(
            &self,
            drug_name: &str,
            condition: Option<&str>,
        ) -> Result<Option<DosageWarning>, CatalogError> {
            self.check_available()?;
            Ok(self
                .warnings
                .iter()
                .find(|w| {
                    w.drug_name.eq_ignore_ascii_case(drug_name)
                        && match (w.condition.as_deref(), condition) {
                            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                            (None, None) => true,
                            _ => false,
                        }
                })
                .cloned())
        }

        async fn general_dosage_warnings(
            &self,
            drug_name: &str,
        ) -> Result<Vec<DosageWarning>, CatalogError> {
            self.check_available()?;
            Ok(self
                .warnings
                .iter()
                .filter(|w| w.condition.is_none() && w.drug_name.eq_ignore_ascii_case(drug_name))
                .cloned()
                .collect())
        }

        async fn drug_classes(&self) -> Result<DrugClassTable, CatalogError> {
            self.check_available()?;
            Ok(self.classes.clone())
        }
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::gateway::{PatientRecordGateway, RuleCatalog};

use super::checks::{check_allergies, check_dosage, check_duplicates, check_interactions};
use super::matcher::{NameMatcher, SubstringMatcher};
use super::types::{CheckFailure, SafetyAlert, SafetyCheckRequest, SafetyEvaluation};

/// Screens a proposed prescription with four independent checks and folds
/// their findings into one decision.
///
/// The engine is deliberately infallible: a collaborator fault inside a
/// check degrades that check to "no findings" so a catalog outage cannot
/// block prescribing. The opposite stance, fail closed, belongs to the
/// access guard, not here.
pub struct ClinicalRuleEngine<G, C> {
    gateway: Arc<G>,
    catalog: Arc<C>,
    matcher: Arc<dyn NameMatcher>,
    timeout: Duration,
}

impl<G, C> ClinicalRuleEngine<G, C>
where
    G: PatientRecordGateway,
    C: RuleCatalog,
{
    pub fn new(gateway: Arc<G>, catalog: Arc<C>, timeout: Duration) -> Self {
        Self {
            gateway,
            catalog,
            matcher: Arc::new(SubstringMatcher),
            timeout,
        }
    }

    /// Swap the allergy name matcher (e.g. for a coded terminology lookup).
    pub fn with_matcher(mut self, matcher: Arc<dyn NameMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Run all four checks concurrently and aggregate.
    pub async fn evaluate(&self, request: &SafetyCheckRequest) -> SafetyEvaluation {
        let start = Instant::now();

        let (interactions, allergies, dosage, duplicates) = tokio::join!(
            check_interactions(request, self.gateway.as_ref(), self.catalog.as_ref(), self.timeout),
            check_allergies(request, self.gateway.as_ref(), self.matcher.as_ref(), self.timeout),
            check_dosage(request, self.catalog.as_ref(), self.timeout),
            check_duplicates(request, self.gateway.as_ref(), self.catalog.as_ref(), self.timeout),
        );

        let mut alerts = neutralize("interaction", interactions);
        alerts.extend(neutralize("allergy", allergies));
        alerts.extend(neutralize("dosage", dosage));
        alerts.extend(neutralize("duplicate_therapy", duplicates));

        let evaluation = SafetyEvaluation::aggregate(alerts);

        tracing::info!(
            patient_id = %request.patient_id,
            drug = %request.drug_name,
            alerts = evaluation.alerts.len(),
            severity = evaluation.severity.map(|s| s.as_str()).unwrap_or("none"),
            can_proceed = evaluation.can_proceed,
            processing_ms = start.elapsed().as_millis() as u64,
            "Safety evaluation complete"
        );

        evaluation
    }
}

/// Convert a failed check into "no findings from this check".
fn neutralize(check: &str, result: Result<Vec<SafetyAlert>, CheckFailure>) -> Vec<SafetyAlert> {
    match result {
        Ok(alerts) => alerts,
        Err(e) => {
            tracing::warn!(check, error = %e, "Safety check degraded to no findings");
            Vec::new()
        }
    }
}

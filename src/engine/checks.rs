//! The four safety checks. Each one gathers its own facts, consults the
//! catalog where needed, and returns its findings; a failure anywhere in a
//! check fails only that check. No check depends on another's result.

use std::collections::HashSet;
use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::gateway::{PatientRecordGateway, RuleCatalog};
use crate::models::enums::{AlertKind, Severity};

use super::matcher::NameMatcher;
use super::types::{CheckFailure, SafetyAlert, SafetyCheckRequest};

/// Await a collaborator call under the configured bound. A timeout is a
/// collaborator failure like any other.
pub(crate) async fn bounded<T, E>(
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, CheckFailure>
where
    CheckFailure: From<E>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CheckFailure::from(e)),
        Err(_) => Err(CheckFailure::Timeout(limit)),
    }
}

static RE_FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

/// First numeric token of a dosage string ("500mg" -> 500.0). `None` for
/// strings carrying no number at all.
pub(crate) fn leading_dose(dosage: &str) -> Option<f64> {
    RE_FIRST_NUMBER
        .captures(dosage)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

// ---------------------------------------------------------------------------
// [1] Drug-drug interactions
// ---------------------------------------------------------------------------

/// Screen the proposed drug against each current prescription via the
/// catalog's unordered-pair lookup. The proposed drug's own name is dropped
/// from the existing set so an already-recorded prescription of the same
/// drug cannot pair with itself; that situation belongs to the duplicate
/// check.
pub(crate) async fn check_interactions<G, C>(
    request: &SafetyCheckRequest,
    gateway: &G,
    catalog: &C,
    limit: Duration,
) -> Result<Vec<SafetyAlert>, CheckFailure>
where
    G: PatientRecordGateway,
    C: RuleCatalog,
{
    let prescriptions = bounded(
        limit,
        gateway.active_prescriptions(&request.patient_id, &request.tenant_id),
    )
    .await?;

    let new_drug = request.drug_name.trim();
    let mut alerts = Vec::new();

    for existing in prescriptions.iter().filter(|p| p.status.is_current()) {
        if existing.medication_name.trim().eq_ignore_ascii_case(new_drug) {
            continue;
        }

        let rule = bounded(
            limit,
            catalog.find_interaction(new_drug, &existing.medication_name),
        )
        .await?;

        if let Some(rule) = rule {
            alerts.push(SafetyAlert {
                kind: AlertKind::DrugInteraction,
                severity: rule.severity,
                title: format!("Interaction: {} + {}", new_drug, existing.medication_name),
                message: format!("{} {}", rule.description, rule.clinical_impact),
                recommendations: vec![rule.management],
            });
        }
    }

    Ok(alerts)
}

// ---------------------------------------------------------------------------
// [2] Allergies
// ---------------------------------------------------------------------------

pub(crate) async fn check_allergies<G>(
    request: &SafetyCheckRequest,
    gateway: &G,
    matcher: &dyn NameMatcher,
    limit: Duration,
) -> Result<Vec<SafetyAlert>, CheckFailure>
where
    G: PatientRecordGateway,
{
    let allergies = bounded(
        limit,
        gateway.allergies(&request.patient_id, &request.tenant_id),
    )
    .await?;

    let mut alerts = Vec::new();
    for allergy in &allergies {
        if !matcher.matches(&allergy.allergen, &request.drug_name) {
            continue;
        }

        let message = match &allergy.reaction {
            Some(reaction) => format!(
                "Proposed {} matches recorded allergy to {} (reaction: {}).",
                request.drug_name, allergy.allergen, reaction
            ),
            None => format!(
                "Proposed {} matches recorded allergy to {}.",
                request.drug_name, allergy.allergen
            ),
        };

        alerts.push(SafetyAlert {
            kind: AlertKind::Allergy,
            severity: Severity::from_allergy(allergy.severity),
            title: format!("Allergy risk: {}", allergy.allergen),
            message,
            recommendations: vec![
                "Verify the allergy history with the patient before proceeding".into(),
                "Consider an alternative agent outside the allergen group".into(),
            ],
        });
    }

    Ok(alerts)
}

// ---------------------------------------------------------------------------
// [3] Dosage
// ---------------------------------------------------------------------------

pub(crate) async fn check_dosage<C>(
    request: &SafetyCheckRequest,
    catalog: &C,
    limit: Duration,
) -> Result<Vec<SafetyAlert>, CheckFailure>
where
    C: RuleCatalog,
{
    // An unparseable dose leaves nothing to compare: skip, not an error.
    let Some(dose) = leading_dose(&request.dosage) else {
        return Ok(Vec::new());
    };

    let drug = request.drug_name.trim();
    let mut alerts = Vec::new();

    for condition in &request.patient_conditions {
        let warning =
            bounded(limit, catalog.find_dosage_warning(drug, Some(condition.as_str()))).await?;
        let Some(warning) = warning else { continue };

        let below = warning.min_dose.is_some_and(|min| dose < min);
        let above = warning.max_dose.is_some_and(|max| dose > max);
        let has_bounds = warning.min_dose.is_some() || warning.max_dose.is_some();

        if below || above {
            alerts.push(SafetyAlert {
                kind: AlertKind::Dosage,
                severity: Severity::Major,
                title: format!("Dose outside {condition} range for {drug}"),
                message: format!(
                    "{} {} is outside the recommended range for patients with {}. {}",
                    request.dosage, drug, condition, warning.guidance
                ),
                recommendations: vec![warning.guidance],
            });
        } else if has_bounds {
            alerts.push(SafetyAlert {
                kind: AlertKind::Dosage,
                severity: Severity::Minor,
                title: format!("Dosing guidance: {drug} with {condition}"),
                message: warning.guidance.clone(),
                recommendations: vec![warning.guidance],
            });
        }
    }

    // Condition-independent ceilings apply to everyone.
    let general = bounded(limit, catalog.general_dosage_warnings(drug)).await?;
    for warning in general {
        if let Some(max) = warning.max_dose {
            if dose > max {
                alerts.push(SafetyAlert {
                    kind: AlertKind::Dosage,
                    severity: Severity::Major,
                    title: format!("Dose exceeds maximum for {drug}"),
                    message: format!(
                        "{} {} exceeds the maximum of {}{}. {}",
                        request.dosage, drug, max, warning.unit, warning.guidance
                    ),
                    recommendations: vec![warning.guidance],
                });
            }
        }
    }

    Ok(alerts)
}

// ---------------------------------------------------------------------------
// [4] Duplicate therapy
// ---------------------------------------------------------------------------

pub(crate) async fn check_duplicates<G, C>(
    request: &SafetyCheckRequest,
    gateway: &G,
    catalog: &C,
    limit: Duration,
) -> Result<Vec<SafetyAlert>, CheckFailure>
where
    G: PatientRecordGateway,
    C: RuleCatalog,
{
    let prescriptions = bounded(
        limit,
        gateway.active_prescriptions(&request.patient_id, &request.tenant_id),
    )
    .await?;
    let current: Vec<_> = prescriptions.iter().filter(|p| p.status.is_current()).collect();

    let new_drug = request.drug_name.trim();
    let mut alerts = Vec::new();

    // Exact duplicate: the same medication is already on the record.
    if let Some(existing) = current
        .iter()
        .find(|p| p.medication_name.trim().eq_ignore_ascii_case(new_drug))
    {
        alerts.push(SafetyAlert {
            kind: AlertKind::DuplicateTherapy,
            severity: Severity::Major,
            title: format!("Already prescribed: {}", existing.medication_name),
            message: format!(
                "An active prescription for {} already exists.",
                existing.medication_name
            ),
            recommendations: vec![
                "Review the existing prescription before adding another".into(),
            ],
        });
    }

    // Class duplicate: another agent from the same therapeutic class.
    let table = bounded(limit, catalog.drug_classes()).await?;
    if let Some(class) = table.class_of(new_drug) {
        let mut flagged: HashSet<String> = HashSet::new();
        for existing in &current {
            let name = existing.medication_name.trim();
            if name.eq_ignore_ascii_case(new_drug) {
                continue;
            }
            if class.matches(name) && flagged.insert(name.to_lowercase()) {
                alerts.push(SafetyAlert {
                    kind: AlertKind::DuplicateTherapy,
                    severity: Severity::Moderate,
                    title: format!("Same class as {}: {}", name, class.name),
                    message: format!(
                        "{} and {} are both {}; doubling the class is usually unintended.",
                        new_drug, name, class.name
                    ),
                    recommendations: vec![format!(
                        "Confirm whether {} should replace {}",
                        new_drug, name
                    )],
                });
            }
        }
    }

    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_dose_parses_first_numeric_token() {
        assert_eq!(leading_dose("500mg"), Some(500.0));
        assert_eq!(leading_dose("12.5 mg twice daily"), Some(12.5));
        assert_eq!(leading_dose("take 2 tablets"), Some(2.0));
        assert_eq!(leading_dose("one tablet"), None);
        assert_eq!(leading_dose(""), None);
    }
}

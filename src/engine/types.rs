use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::gateway::{CatalogError, GatewayError};
use crate::models::enums::{AlertKind, Severity};

// ---------------------------------------------------------------------------
// SafetyCheckRequest
// ---------------------------------------------------------------------------

/// A proposed prescription to screen against the patient's record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheckRequest {
    pub patient_id: Uuid,
    pub tenant_id: Uuid,
    pub drug_name: String,
    pub dosage: String,
    pub frequency: String,
    pub patient_conditions: Vec<String>,
}

// ---------------------------------------------------------------------------
// SafetyAlert
// ---------------------------------------------------------------------------

/// One finding from a safety check, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// SafetyEvaluation
// ---------------------------------------------------------------------------

/// Aggregated outcome of the four checks. `severity` is the highest rank
/// present (`None` when nothing fired); only a critical finding blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyEvaluation {
    pub has_alerts: bool,
    pub alerts: Vec<SafetyAlert>,
    pub severity: Option<Severity>,
    pub can_proceed: bool,
}

impl SafetyEvaluation {
    /// The no-findings outcome. Also what an unauthorized caller receives:
    /// it carries no patient detail.
    pub fn empty() -> Self {
        Self {
            has_alerts: false,
            alerts: Vec::new(),
            severity: None,
            can_proceed: true,
        }
    }

    /// Fold alerts into the aggregate decision.
    pub fn aggregate(alerts: Vec<SafetyAlert>) -> Self {
        let severity = alerts.iter().map(|a| a.severity).max();
        Self {
            has_alerts: !alerts.is_empty(),
            can_proceed: severity != Some(Severity::Critical),
            severity,
            alerts,
        }
    }
}

// ---------------------------------------------------------------------------
// CheckFailure
// ---------------------------------------------------------------------------

/// Why a single check produced nothing. Never escapes the engine: each
/// failure is logged and neutralized so the remaining checks still count.
#[derive(Error, Debug)]
pub enum CheckFailure {
    #[error("patient record gateway: {0}")]
    Gateway(#[from] GatewayError),

    #[error("rule catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("collaborator call timed out after {0:?}")]
    Timeout(Duration),
}

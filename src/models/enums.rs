use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AssignmentType {
    PrimaryCare => "primary_care",
    Consulting => "consulting",
    Temporary => "temporary",
});

str_enum!(RequestStatus {
    Pending => "pending",
    Approved => "approved",
    Denied => "denied",
});

str_enum!(AccessRequestType {
    Consultation => "consultation",
    Coverage => "coverage",
    SecondOpinion => "second_opinion",
    Emergency => "emergency",
});

str_enum!(RequestUrgency {
    Routine => "routine",
    Urgent => "urgent",
    Emergency => "emergency",
});

str_enum!(AlertKind {
    DrugInteraction => "drug_interaction",
    Allergy => "allergy",
    Dosage => "dosage",
    DuplicateTherapy => "duplicate_therapy",
    Contraindication => "contraindication",
});

str_enum!(AllergySeverity {
    Mild => "mild",
    Moderate => "moderate",
    Severe => "severe",
    LifeThreatening => "life_threatening",
});

str_enum!(PrescriptionStatus {
    Active => "active",
    OnHold => "on_hold",
    Cancelled => "cancelled",
    Dispensed => "dispensed",
});

impl PrescriptionStatus {
    /// Cancelled and dispensed prescriptions no longer count as current
    /// therapy for safety screening.
    pub fn is_current(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::Dispensed)
    }
}

str_enum!(AccessJustification {
    Billing => "billing",
    LabHistory => "lab_history",
    EmergencyCare => "emergency_care",
    CareCoordination => "care_coordination",
});

str_enum!(AuditKind {
    AccessDecision => "access_decision",
    ClinicalAlert => "clinical_alert",
    CrossTenantRead => "cross_tenant_read",
});

/// Alert severity, ranked. Variant order is the aggregation order:
/// critical outranks major outranks moderate outranks minor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    Minor,
    Moderate,
    Major,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }

    /// Map a recorded allergy severity onto an alert severity.
    pub fn from_allergy(severity: AllergySeverity) -> Self {
        match severity {
            AllergySeverity::LifeThreatening => Self::Critical,
            AllergySeverity::Severe => Self::Major,
            AllergySeverity::Moderate => Self::Moderate,
            AllergySeverity::Mild => Self::Minor,
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minor" => Ok(Self::Minor),
            "moderate" => Ok(Self::Moderate),
            "major" => Ok(Self::Major),
            "critical" => Ok(Self::Critical),
            _ => Err(DatabaseError::InvalidEnum {
                field: "Severity".into(),
                value: s.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn request_status_round_trip() {
        for (variant, s) in [
            (RequestStatus::Pending, "pending"),
            (RequestStatus::Approved, "approved"),
            (RequestStatus::Denied, "denied"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(RequestStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn alert_kind_round_trip() {
        for (variant, s) in [
            (AlertKind::DrugInteraction, "drug_interaction"),
            (AlertKind::Allergy, "allergy"),
            (AlertKind::Dosage, "dosage"),
            (AlertKind::DuplicateTherapy, "duplicate_therapy"),
            (AlertKind::Contraindication, "contraindication"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AlertKind::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn invalid_enum_value_is_an_error() {
        assert!(RequestStatus::from_str("revoked").is_err());
        assert!(Severity::from_str("fatal").is_err());
    }

    #[test]
    fn severity_ranking() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
    }

    #[test]
    fn allergy_severity_mapping() {
        assert_eq!(
            Severity::from_allergy(AllergySeverity::LifeThreatening),
            Severity::Critical
        );
        assert_eq!(Severity::from_allergy(AllergySeverity::Severe), Severity::Major);
        assert_eq!(
            Severity::from_allergy(AllergySeverity::Moderate),
            Severity::Moderate
        );
        assert_eq!(Severity::from_allergy(AllergySeverity::Mild), Severity::Minor);
    }

    #[test]
    fn prescription_status_currency() {
        assert!(PrescriptionStatus::Active.is_current());
        assert!(PrescriptionStatus::OnHold.is_current());
        assert!(!PrescriptionStatus::Cancelled.is_current());
        assert!(!PrescriptionStatus::Dispensed.is_current());
    }
}

use serde::{Deserialize, Serialize};

/// One therapeutic class: a display name plus the substring patterns that
/// place a drug name in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugClass {
    pub name: String,
    pub patterns: Vec<String>,
}

impl DrugClass {
    pub fn matches(&self, drug_name: &str) -> bool {
        let lower = drug_name.trim().to_lowercase();
        if lower.is_empty() {
            return false;
        }
        self.patterns.iter().any(|p| lower.contains(p.as_str()))
    }
}

/// Therapeutic-class patterns for duplicate-therapy screening. Served by
/// the rule catalog so the engine carries no drug literals of its own; the
/// built-in table here is the bundled fallback content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrugClassTable {
    classes: Vec<DrugClass>,
}

impl DrugClassTable {
    pub fn new(classes: Vec<DrugClass>) -> Self {
        Self { classes }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Bundled class content. Patterns are lowercase substrings; most lean
    /// on the shared stem of the class (-statin, -pril, -sartan) with named
    /// members where no stem exists.
    pub fn builtin() -> Self {
        let class = |name: &str, patterns: &[&str]| DrugClass {
            name: name.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        };
        Self::new(vec![
            class("statins", &["statin"]),
            class("ACE inhibitors", &["pril"]),
            class("ARBs", &["sartan"]),
            class("beta blockers", &["olol"]),
            class("benzodiazepines", &["azepam", "azolam"]),
            class("proton pump inhibitors", &["prazole"]),
            class("SSRIs", &["oxetine", "citalopram", "sertraline"]),
            class(
                "NSAIDs",
                &["ibuprofen", "naproxen", "diclofenac", "ketorolac", "indomethacin", "aspirin"],
            ),
        ])
    }

    /// First class the drug name falls into, if any.
    pub fn class_of(&self, drug_name: &str) -> Option<&DrugClass> {
        self.classes.iter().find(|c| c.matches(drug_name))
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

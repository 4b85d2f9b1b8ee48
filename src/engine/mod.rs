pub mod checks;
pub mod classes;
pub mod engine;
pub mod matcher;
pub mod types;

pub use engine::ClinicalRuleEngine;
pub use matcher::{NameMatcher, SubstringMatcher};
pub use types::{SafetyAlert, SafetyCheckRequest, SafetyEvaluation};

use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const CORE_NAME: &str = "Careguard";
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "careguard=info"
}

/// Get the application data directory
/// ~/Careguard/ on all platforms (user-visible, per design requirement)
pub fn data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Careguard")
}

/// Default location of the core database.
pub fn database_path() -> PathBuf {
    data_dir().join("careguard.db")
}

/// Tunables for the safety core.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Bound on every patient-record and rule-catalog call. A call that
    /// outlives this is treated as a collaborator failure.
    pub collaborator_timeout: Duration,
    /// How long audit entries are retained before pruning.
    pub audit_retention_days: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout: Duration::from_secs(2),
            // Seven years, the common clinical-records retention floor.
            audit_retention_days: 2555,
        }
    }
}

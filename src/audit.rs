//! Append-only audit trail. Every access decision, every triggered clinical
//! alert, and every cross-tenant read lands here; nothing is ever updated.

use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository::audit as audit_repo;
use crate::db::DatabaseError;
use crate::models::enums::AuditKind;

/// One audit record. Owned by the tenant under whose context the decision
/// or read ran, even when the underlying patient is shared cross-tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub tenant_id: Uuid,
    pub patient_id: Uuid,
    pub actor_id: Uuid,
    pub kind: AuditKind,
    pub payload: serde_json::Value,
    pub timestamp: NaiveDateTime,
}

impl AuditEntry {
    pub fn new(
        tenant_id: Uuid,
        patient_id: Uuid,
        actor_id: Uuid,
        kind: AuditKind,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            tenant_id,
            patient_id,
            actor_id,
            kind,
            payload,
            timestamp: chrono::Utc::now().naive_utc(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit store: {0}")]
    Store(#[from] DatabaseError),

    #[error("internal lock failed")]
    LockFailed,
}

/// Write-only audit surface, from this core's perspective.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Audit sink backed by the core's SQLite database.
pub struct SqliteAuditSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAuditSink {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Audit entries for a patient within the last `days`, newest first.
    pub fn entries_for_patient(
        &self,
        tenant_id: &Uuid,
        patient_id: &Uuid,
        days: i64,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let conn = self.conn.lock().map_err(|_| AuditError::LockFailed)?;
        Ok(audit_repo::query_by_patient(&conn, tenant_id, patient_id, days)?)
    }

    /// Drop entries older than the retention window. Returns the number
    /// removed.
    pub fn prune(&self, retention_days: i64) -> Result<usize, AuditError> {
        let conn = self.conn.lock().map_err(|_| AuditError::LockFailed)?;
        let deleted = audit_repo::prune_audit_log(&conn, retention_days)?;
        if deleted > 0 {
            tracing::info!(deleted, retention_days, "Pruned audit log");
        }
        Ok(deleted)
    }
}

impl AuditSink for SqliteAuditSink {
    fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let conn = self.conn.lock().map_err(|_| AuditError::LockFailed)?;
        audit_repo::insert_audit_entry(&conn, entry)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory sink that records entries, optionally failing every append.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub entries: Mutex<Vec<AuditEntry>>,
        pub fail: bool,
    }

    impl RecordingSink {
        pub fn recorded(&self) -> Vec<AuditEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    impl AuditSink for RecordingSink {
        fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
            if self.fail {
                return Err(AuditError::Store(DatabaseError::ConstraintViolation(
                    "audit store unavailable".into(),
                )));
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }
}

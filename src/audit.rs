// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Wallet creation, key export and transfer outcomes are appended to daily
//! JSONL files under the audit directory. Audit writes must never fail the
//! operation they describe; callers use [`AuditLog::record`], which logs a
//! warning on write failure and moves on.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Wallet events
    WalletCreated,

    // Key export events
    KeysExported,
    ExportDenied,

    // Transfer events
    TipSent,
    TipFailed,

    // Reconciliation events
    ReconciliationFlagged,
    ReconciliationResolved,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Account that triggered the event (if known).
    pub account_id: Option<String>,
    /// Resource affected (wallet address, transfer ID, etc.).
    pub resource_id: Option<String>,
    /// Resource type (wallet, transfer, etc.).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            account_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the account ID.
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Append-only audit log backed by daily JSONL files.
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    /// Open the audit log rooted at `dir`, creating the directory if needed.
    pub fn open(dir: PathBuf) -> Result<Self, AuditError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn events_file(&self, date: &str) -> PathBuf {
        self.dir.join(format!("audit-{date}.jsonl"))
    }

    /// Append an audit event to the daily log file.
    pub fn log(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let line = serde_json::to_string(event)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.events_file(&date))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Log an event, swallowing (but reporting) write failures.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.log(&event) {
            tracing::warn!(error = %e, event_type = ?event.event_type, "failed to write audit event");
        }
    }

    /// Read audit events for a specific date.
    pub fn read_events(&self, date: &str) -> Result<Vec<AuditEvent>, AuditError> {
        let content = std::fs::read_to_string(self.events_file(date))?;

        let mut events = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            events.push(serde_json::from_str(line)?);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, AuditLog) {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::open(temp.path().join("audit")).unwrap();
        (temp, log)
    }

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::WalletCreated)
            .with_account("acct_123")
            .with_resource("wallet", "xte1qqabc");

        assert_eq!(event.event_type, AuditEventType::WalletCreated);
        assert_eq!(event.account_id, Some("acct_123".to_string()));
        assert_eq!(event.resource_type, Some("wallet".to_string()));
        assert_eq!(event.resource_id, Some("xte1qqabc".to_string()));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::ExportDenied)
            .with_account("acct_123")
            .failed("channel is not private");

        assert!(!event.success);
        assert_eq!(event.error, Some("channel is not private".to_string()));
    }

    #[test]
    fn log_and_read_events() {
        let (_temp, log) = setup();

        let event1 = AuditEvent::new(AuditEventType::WalletCreated)
            .with_account("acct_1")
            .with_resource("wallet", "addr1");

        let event2 = AuditEvent::new(AuditEventType::TipSent)
            .with_account("acct_2")
            .with_resource("transfer", "tx2")
            .with_details(serde_json::json!({ "amount": 5.0 }));

        log.log(&event1).unwrap();
        log.log(&event2).unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = log.read_events(&today).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::WalletCreated);
        assert_eq!(events[1].event_type, AuditEventType::TipSent);
        assert_eq!(
            events[1].details,
            Some(serde_json::json!({ "amount": 5.0 }))
        );
    }

    #[test]
    fn record_swallows_write_failures() {
        let temp = TempDir::new().unwrap();
        let log = AuditLog::open(temp.path().join("audit")).unwrap();
        // Replace the directory with a file so the append fails.
        std::fs::remove_dir_all(temp.path().join("audit")).unwrap();
        std::fs::write(temp.path().join("audit"), b"not a dir").unwrap();

        log.record(AuditEvent::new(AuditEventType::TipFailed));
    }
}

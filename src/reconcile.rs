// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Reconciliation Sweeper
//!
//! Background task that resolves transfers whose remote and local state
//! disagree. Two sources feed it:
//!
//! 1. The in-memory [`ReconcileQueue`]: completion writes that failed after
//!    a successful broadcast. The daemon reference is known, so the sweeper
//!    just retries the write.
//! 2. The ledger itself: records flagged with an unknown remote outcome and
//!    pending records older than the stale cutoff. These cannot be resolved
//!    automatically (the reference is unknown) and are reported at WARN for
//!    an operator.
//!
//! The queue is a best-effort accelerator: every queued entry also has its
//! record flagged in the ledger, so a crash loses no information.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown. Spawn
//! as a background task:
//! ```rust,ignore
//! tokio::spawn(reconciler.run(shutdown.clone()));
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditEventType, AuditLog};
use crate::ledger::{LedgerError, LedgerStore};

/// Pending records older than this are reported as stale.
const STALE_PENDING_AFTER_SECS: i64 = 15 * 60;

/// A completion write to retry: the broadcast succeeded with this reference
/// but the local record could not be updated at the time.
pub struct PendingResolution {
    pub transfer_id: String,
    pub remote_reference: String,
}

/// Shared queue of completion writes awaiting retry.
#[derive(Default)]
pub struct ReconcileQueue {
    entries: Mutex<Vec<PendingResolution>>,
}

impl ReconcileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, transfer_id: &str, remote_reference: &str) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push(PendingResolution {
            transfer_id: transfer_id.to_string(),
            remote_reference: remote_reference.to_string(),
        });
    }

    pub fn drain(&self) -> Vec<PendingResolution> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Background reconciliation sweeper.
pub struct Reconciler {
    ledger: Arc<dyn LedgerStore>,
    queue: Arc<ReconcileQueue>,
    audit: Arc<AuditLog>,
    sweep_interval: Duration,
}

impl Reconciler {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        queue: Arc<ReconcileQueue>,
        audit: Arc<AuditLog>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            ledger,
            queue,
            audit,
            sweep_interval,
        }
    }

    /// Run the sweeper loop until the cancellation token is triggered.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Reconciliation sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Reconciliation sweeper shutting down");
                return;
            }

            self.sweep_step();

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Reconciliation sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Execute one sweep: retry queued completion writes, then report
    /// records still awaiting manual reconciliation.
    pub fn sweep_step(&self) {
        self.retry_queued_completions();
        self.report_unreconciled();
    }

    fn retry_queued_completions(&self) {
        let entries = self.queue.drain();
        if entries.is_empty() {
            return;
        }

        info!(count = entries.len(), "Retrying queued completion writes");

        for entry in entries {
            match self
                .ledger
                .complete_transfer(&entry.transfer_id, &entry.remote_reference)
            {
                Ok(record) => {
                    info!(
                        transfer_id = %record.transfer_id,
                        reference = %entry.remote_reference,
                        "Reconciliation resolved, transfer completed"
                    );
                    self.audit.record(
                        AuditEvent::new(AuditEventType::ReconciliationResolved)
                            .with_account(&record.sender_account_id)
                            .with_resource("transfer", &record.transfer_id)
                            .with_details(serde_json::json!({
                                "remote_reference": entry.remote_reference,
                            })),
                    );
                }
                Err(LedgerError::InvalidTransition { .. }) => {
                    // Someone else already settled it.
                    debug!(
                        transfer_id = %entry.transfer_id,
                        "Record already terminal, dropping queued resolution"
                    );
                }
                Err(LedgerError::NotFound(_)) => {
                    warn!(
                        transfer_id = %entry.transfer_id,
                        "Queued resolution references a missing record, dropping"
                    );
                }
                Err(e) => {
                    warn!(
                        transfer_id = %entry.transfer_id,
                        error = %e,
                        "Completion retry failed, requeueing"
                    );
                    self.queue.push(&entry.transfer_id, &entry.remote_reference);
                }
            }
        }
    }

    fn report_unreconciled(&self) {
        match self.ledger.list_flagged_transfers() {
            Ok(flagged) => {
                for record in &flagged {
                    warn!(
                        transfer_id = %record.transfer_id,
                        status = ?record.status,
                        detail = ?record.detail,
                        "Transfer awaiting reconciliation"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Failed to list flagged transfers"),
        }

        let cutoff = Utc::now() - chrono::Duration::seconds(STALE_PENDING_AFTER_SECS);
        match self.ledger.list_stale_pending(cutoff) {
            Ok(stale) => {
                for record in &stale {
                    warn!(
                        transfer_id = %record.transfer_id,
                        created_at = %record.created_at,
                        "Pending transfer past the stale cutoff, daemon outcome unverified"
                    );
                }
            }
            Err(e) => warn!(error = %e, "Failed to scan for stale pending transfers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerDb, TransactionRecord, TransferStatus};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<LedgerDb>, Arc<ReconcileQueue>, Reconciler) {
        let temp = TempDir::new().unwrap();
        let ledger = Arc::new(LedgerDb::open(&temp.path().join("ledger.redb")).unwrap());
        let queue = Arc::new(ReconcileQueue::new());
        let audit = Arc::new(AuditLog::open(temp.path().join("audit")).unwrap());
        let reconciler = Reconciler::new(
            ledger.clone(),
            queue.clone(),
            audit,
            Duration::from_secs(60),
        );
        (temp, ledger, queue, reconciler)
    }

    #[test]
    fn queued_resolution_completes_the_record() {
        let (_temp, ledger, queue, reconciler) = setup();
        let record = TransactionRecord::new_pending("acct_1", "addr-x", 5.0);
        ledger.insert_transfer(&record).unwrap();
        queue.push(&record.transfer_id, "ref-99");

        reconciler.sweep_step();

        assert!(queue.is_empty());
        let updated = ledger.get_transfer(&record.transfer_id).unwrap().unwrap();
        assert_eq!(updated.status, TransferStatus::Completed);
        assert_eq!(updated.remote_reference, Some("ref-99".to_string()));
        assert!(!updated.needs_reconciliation);
    }

    #[test]
    fn already_terminal_record_drops_the_queued_resolution() {
        let (_temp, ledger, queue, reconciler) = setup();
        let record = TransactionRecord::new_pending("acct_1", "addr-x", 5.0);
        ledger.insert_transfer(&record).unwrap();
        ledger
            .complete_transfer(&record.transfer_id, "ref-first")
            .unwrap();
        queue.push(&record.transfer_id, "ref-second");

        reconciler.sweep_step();

        assert!(queue.is_empty());
        let updated = ledger.get_transfer(&record.transfer_id).unwrap().unwrap();
        assert_eq!(updated.remote_reference, Some("ref-first".to_string()));
    }

    #[test]
    fn missing_record_drops_the_queued_resolution() {
        let (_temp, _ledger, queue, reconciler) = setup();
        queue.push("ghost-transfer", "ref-1");

        reconciler.sweep_step();

        assert!(queue.is_empty());
    }

    #[test]
    fn reporting_leaves_flagged_records_untouched() {
        let (_temp, ledger, queue, reconciler) = setup();
        let record = TransactionRecord::new_pending("acct_1", "addr-x", 5.0);
        ledger.insert_transfer(&record).unwrap();
        ledger
            .flag_transfer(&record.transfer_id, "daemon timed out")
            .unwrap();

        reconciler.sweep_step();

        assert!(queue.is_empty());
        let updated = ledger.get_transfer(&record.transfer_id).unwrap().unwrap();
        assert_eq!(updated.status, TransferStatus::Pending);
        assert!(updated.needs_reconciliation);
    }

    #[tokio::test]
    async fn run_stops_on_cancellation() {
        let (_temp, _ledger, _queue, reconciler) = setup();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(reconciler.run(shutdown.clone()));

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

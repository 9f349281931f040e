// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tip execution pipeline.
//!
//! ## Order of operations
//!
//! A tip validates cheaply first (amount, wallets, recipient address), then
//! serializes on the sender account and settles:
//!
//! 1. Durable `Pending` record, strictly before any remote effect.
//! 2. Transient spend key decryption (plaintext lives only for the send).
//! 3. Daemon broadcast.
//! 4. Terminal update: `Completed` with the daemon reference, or `Failed`
//!    with the rejection detail.
//!
//! ## Unknown outcomes
//!
//! A timed-out or undecodable broadcast leaves the record `Pending` and
//! flagged for reconciliation: the daemon may or may not have moved funds,
//! so neither terminal state would be honest. If the broadcast succeeds but
//! the completion write fails, the caller gets `ReconciliationRequired` and
//! the known daemon reference is queued for the background sweeper.
//!
//! ## Caller cancellation
//!
//! Settlement runs on a detached task. Dropping the caller's future (a
//! disconnected HTTP client, say) cannot abandon a record between the
//! broadcast and the terminal update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use crate::audit::{AuditEvent, AuditEventType, AuditLog};
use crate::error::{TipError, TipResult};
use crate::keyvault::KeyVault;
use crate::ledger::{LedgerStore, TransactionRecord, TransferStatus};
use crate::node::{NodeError, WalletNode};
use crate::reconcile::ReconcileQueue;

/// Balance snapshot for one account's wallet.
#[derive(Debug)]
pub struct AccountBalance {
    pub address: String,
    pub available_balance: f64,
}

/// Successful tip settlement.
#[derive(Debug, Clone)]
pub struct TipOutcome {
    pub transfer_id: String,
    pub status: TransferStatus,
    pub remote_reference: Option<String>,
}

pub struct TransactionOrchestrator {
    shared: Shared,
    /// Per-sender serialization locks. Entries are never evicted: an evicted
    /// lock could be re-created while the original is still held.
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// The collaborators settlement needs, clonable into the detached task.
#[derive(Clone)]
struct Shared {
    ledger: Arc<dyn LedgerStore>,
    node: Arc<dyn WalletNode>,
    vault: Arc<KeyVault>,
    audit: Arc<AuditLog>,
    queue: Arc<ReconcileQueue>,
}

impl TransactionOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        node: Arc<dyn WalletNode>,
        vault: Arc<KeyVault>,
        audit: Arc<AuditLog>,
        queue: Arc<ReconcileQueue>,
    ) -> Self {
        Self {
            shared: Shared {
                ledger,
                node,
                vault,
                audit,
                queue,
            },
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Spendable balance for the account's wallet, straight from the daemon.
    ///
    /// Not retried here: balance reads are idempotent, so retry policy
    /// belongs to the caller.
    pub async fn get_balance(&self, account_id: &str) -> TipResult<AccountBalance> {
        let wallet = self
            .shared
            .ledger
            .get_wallet(account_id)?
            .ok_or_else(|| TipError::NotFound(format!("account {account_id} has no wallet")))?;

        let info = self.shared.node.get_balance(&wallet.address).await?;
        Ok(AccountBalance {
            address: wallet.address,
            available_balance: info.available_balance,
        })
    }

    /// Send `amount` from the sender's wallet to the recipient's address.
    pub async fn tip(
        &self,
        sender_account_id: &str,
        recipient_account_id: &str,
        amount: f64,
    ) -> TipResult<TipOutcome> {
        validate_amount(amount)?;

        let sender = self
            .shared
            .ledger
            .get_wallet(sender_account_id)?
            .ok_or_else(|| TipError::SenderHasNoWallet(sender_account_id.to_string()))?;
        let recipient = self
            .shared
            .ledger
            .get_wallet(recipient_account_id)?
            .ok_or_else(|| TipError::RecipientHasNoWallet(recipient_account_id.to_string()))?;

        if !self.shared.node.validate_address(&recipient.address).await? {
            return Err(TipError::InvalidRecipientAddress(recipient.address));
        }

        // Serialize the rest of the pipeline per sender, so two tips from
        // the same account cannot interleave between balance observation and
        // broadcast.
        let guard = self.sender_lock(sender_account_id).lock_owned().await;

        let record = TransactionRecord::new_pending(sender_account_id, &recipient.address, amount);
        let transfer_id = record.transfer_id.clone();
        debug!(
            transfer_id = %transfer_id,
            sender_account_id,
            recipient_account_id,
            amount,
            "tip admitted, settling"
        );

        let ctx = self.shared.clone();
        let encrypted_spend_key = sender.encrypted_spend_key.clone();
        let handle = tokio::spawn(ctx.settle(guard, record, encrypted_spend_key));

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                // The settlement task itself died; its record may be in any
                // pre-terminal state.
                error!(transfer_id = %transfer_id, error = %e, "settlement task failed");
                Err(TipError::ReconciliationRequired {
                    transfer_id,
                    detail: format!("settlement task failed: {e}"),
                })
            }
        }
    }

    fn sender_lock(&self, account_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(account_id.to_string()).or_default().clone()
    }
}

impl Shared {
    /// Steps 1-4 of the pipeline, detached from the caller. The sender lock
    /// is held until this returns.
    async fn settle(
        self,
        _guard: OwnedMutexGuard<()>,
        record: TransactionRecord,
        encrypted_spend_key: String,
    ) -> TipResult<TipOutcome> {
        let transfer_id = record.transfer_id.clone();

        // Durable intent strictly before the remote call: a crash after
        // broadcast must never lose the record.
        self.ledger.insert_transfer(&record)?;

        let spend_key = match self.vault.decrypt(&encrypted_spend_key) {
            Ok(key) => key,
            Err(e) => {
                let detail = "spend key decryption failed";
                error!(transfer_id = %transfer_id, error = %e, "{detail}");
                if let Err(write_err) = self.ledger.fail_transfer(&transfer_id, detail) {
                    error!(
                        transfer_id = %transfer_id,
                        error = %write_err,
                        "failed to record decryption failure, record stays pending"
                    );
                }
                self.audit.record(
                    AuditEvent::new(AuditEventType::TipFailed)
                        .with_account(&record.sender_account_id)
                        .with_resource("transfer", &transfer_id)
                        .failed(detail),
                );
                return Err(e.into());
            }
        };
        let sent = self
            .node
            .send_transfer(&spend_key, &record.recipient_address, record.amount)
            .await;
        drop(spend_key);

        match sent {
            Ok(receipt) => self.finish_completed(&record, &receipt.transaction_reference),
            Err(e @ NodeError::Rejected { .. }) => {
                let detail = e.to_string();
                warn!(transfer_id = %transfer_id, detail = %detail, "daemon rejected transfer");
                if let Err(write_err) = self.ledger.fail_transfer(&transfer_id, &detail) {
                    error!(
                        transfer_id = %transfer_id,
                        error = %write_err,
                        "failed to record rejection, record stays pending"
                    );
                }
                self.audit.record(
                    AuditEvent::new(AuditEventType::TipFailed)
                        .with_account(&record.sender_account_id)
                        .with_resource("transfer", &transfer_id)
                        .failed(&detail),
                );
                Err(e.into())
            }
            Err(e) => {
                // Timeout or transport failure: the daemon may have executed
                // the send, so the record must not claim a definite failure.
                let detail = e.to_string();
                warn!(
                    transfer_id = %transfer_id,
                    detail = %detail,
                    "remote outcome unknown, flagging for reconciliation"
                );
                if let Err(write_err) = self.ledger.flag_transfer(&transfer_id, &detail) {
                    error!(
                        transfer_id = %transfer_id,
                        error = %write_err,
                        "failed to flag transfer, stale-pending sweep will catch it"
                    );
                }
                self.audit.record(
                    AuditEvent::new(AuditEventType::ReconciliationFlagged)
                        .with_account(&record.sender_account_id)
                        .with_resource("transfer", &transfer_id)
                        .failed(&detail),
                );
                Err(e.into())
            }
        }
    }

    fn finish_completed(&self, record: &TransactionRecord, reference: &str) -> TipResult<TipOutcome> {
        match self.ledger.complete_transfer(&record.transfer_id, reference) {
            Ok(updated) => {
                info!(
                    transfer_id = %updated.transfer_id,
                    reference = %reference,
                    amount = record.amount,
                    "tip completed"
                );
                self.audit.record(
                    AuditEvent::new(AuditEventType::TipSent)
                        .with_account(&record.sender_account_id)
                        .with_resource("transfer", &record.transfer_id)
                        .with_details(serde_json::json!({
                            "amount": record.amount,
                            "remote_reference": reference,
                        })),
                );
                Ok(TipOutcome {
                    transfer_id: updated.transfer_id,
                    status: updated.status,
                    remote_reference: updated.remote_reference,
                })
            }
            Err(e) => {
                // Funds moved remotely but the record still says pending.
                // Flag it, queue the known reference for the sweeper, and
                // tell the caller the truth instead of success or failure.
                let detail = format!(
                    "remote send succeeded (reference {reference}) but local completion failed: {e}"
                );
                error!(
                    transfer_id = %record.transfer_id,
                    reference = %reference,
                    error = %e,
                    "completion write failed after remote success"
                );
                if let Err(flag_err) = self.ledger.flag_transfer(&record.transfer_id, &detail) {
                    error!(
                        transfer_id = %record.transfer_id,
                        error = %flag_err,
                        "failed to flag transfer, stale-pending sweep will catch it"
                    );
                }
                self.queue.push(&record.transfer_id, reference);
                self.audit.record(
                    AuditEvent::new(AuditEventType::ReconciliationFlagged)
                        .with_account(&record.sender_account_id)
                        .with_resource("transfer", &record.transfer_id)
                        .failed(&detail),
                );
                Err(TipError::ReconciliationRequired {
                    transfer_id: record.transfer_id.clone(),
                    detail,
                })
            }
        }
    }
}

fn validate_amount(amount: f64) -> TipResult<()> {
    if !amount.is_finite() {
        return Err(TipError::InvalidAmount(format!(
            "amount must be finite, got {amount}"
        )));
    }
    if amount <= 0.0 {
        return Err(TipError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable ledger for accounts, wallets and transfer records, backed by
//! redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `accounts`: account_id → serialized Account
//! - `wallets`: account_id → serialized Wallet (one wallet per account is
//!   this table's key constraint)
//! - `transfers`: transfer_id → serialized TransactionRecord
//! - `account_transfer_index`: composite key (account_id|!created_at|transfer_id)
//!   → transfer_id, for descending-time range scans
//!
//! ## Transfer state machine
//!
//! `Pending → {Completed, Failed}`, exactly once; a terminal record is never
//! mutated again (`InvalidTransition` otherwise). Records are never deleted.
//! A timed-out send keeps its record `Pending` with `needs_reconciliation`
//! set, so it is distinguishable from a known failure.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// account_id → serialized Account (JSON bytes).
const ACCOUNTS: TableDefinition<&str, &[u8]> = TableDefinition::new("accounts");

/// account_id → serialized Wallet (JSON bytes). Keyed by owner, so the
/// one-wallet-per-account constraint is enforced by the table itself.
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// transfer_id → serialized TransactionRecord (JSON bytes).
const TRANSFERS: TableDefinition<&str, &[u8]> = TableDefinition::new("transfers");

/// Index: composite key → transfer_id.
/// Key format: `account_id|!created_at_millis_be|transfer_id` for
/// descending-time range scans.
const ACCOUNT_TRANSFER_INDEX: TableDefinition<&[u8], &str> =
    TableDefinition::new("account_transfer_index");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("transfer {transfer_id} is already {status:?} and cannot transition")]
    InvalidTransition {
        transfer_id: String,
        status: TransferStatus,
    },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Records
// =============================================================================

/// A registered external identity eligible to own a custodial wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// A custodial wallet: remote-assigned address plus the encrypted private
/// spend key. The plaintext key is never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Owning account (immutable binding).
    pub account_id: String,
    /// Public address assigned by the wallet daemon.
    pub address: String,
    /// Spend key ciphertext as produced by the KeyVault.
    pub encrypted_spend_key: String,
    /// Public spend key, if the daemon returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_spend_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Transfer status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Durably recorded; the remote send may or may not have happened yet.
    Pending,
    /// The remote daemon reported success.
    Completed,
    /// The remote daemon explicitly rejected the send.
    Failed,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl Default for TransferStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Append-only ledger entry for one tip attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique record id (UUID v4).
    pub transfer_id: String,
    pub sender_account_id: String,
    pub recipient_address: String,
    /// Decimal amount in the wallet's native unit.
    pub amount: f64,
    pub status: TransferStatus,
    /// Reference returned by the daemon on a successful broadcast.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_reference: Option<String>,
    /// Set when the remote outcome is unknown (timeout) or the local commit
    /// failed after a remote success. Cleared when a terminal state is
    /// reached.
    #[serde(default)]
    pub needs_reconciliation: bool,
    /// Failure or reconciliation detail, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Create a new pending record for a tip attempt.
    pub fn new_pending(
        sender_account_id: impl Into<String>,
        recipient_address: impl Into<String>,
        amount: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            transfer_id: uuid::Uuid::new_v4().to_string(),
            sender_account_id: sender_account_id.into(),
            recipient_address: recipient_address.into(),
            amount,
            status: TransferStatus::Pending,
            remote_reference: None,
            needs_reconciliation: false,
            detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn mark_completed(&mut self, remote_reference: &str) {
        self.status = TransferStatus::Completed;
        self.remote_reference = Some(remote_reference.to_string());
        self.needs_reconciliation = false;
        self.updated_at = Utc::now();
    }

    fn mark_failed(&mut self, detail: &str) {
        self.status = TransferStatus::Failed;
        self.detail = Some(detail.to_string());
        self.needs_reconciliation = false;
        self.updated_at = Utc::now();
    }

    fn mark_flagged(&mut self, detail: &str) {
        self.needs_reconciliation = true;
        self.detail = Some(detail.to_string());
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// Store contract
// =============================================================================

/// Transactional CRUD consumed by the registry, orchestrator and sweeper.
pub trait LedgerStore: Send + Sync {
    fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>>;

    fn get_wallet(&self, account_id: &str) -> LedgerResult<Option<Wallet>>;

    /// Atomically bind a wallet to its (possibly new) account.
    ///
    /// Fails with [`LedgerError::AlreadyExists`] if the account already owns
    /// a wallet; the check and the insert happen in one write transaction,
    /// so under concurrent calls exactly one caller wins.
    fn create_wallet(&self, account: &Account, wallet: &Wallet) -> LedgerResult<()>;

    fn insert_transfer(&self, record: &TransactionRecord) -> LedgerResult<()>;

    fn get_transfer(&self, transfer_id: &str) -> LedgerResult<Option<TransactionRecord>>;

    /// Pending → Completed with the daemon's reference.
    fn complete_transfer(
        &self,
        transfer_id: &str,
        remote_reference: &str,
    ) -> LedgerResult<TransactionRecord>;

    /// Pending → Failed with the rejection detail.
    fn fail_transfer(&self, transfer_id: &str, detail: &str) -> LedgerResult<TransactionRecord>;

    /// Mark a still-pending record as needing reconciliation (unknown remote
    /// outcome). The status does not change.
    fn flag_transfer(&self, transfer_id: &str, detail: &str) -> LedgerResult<TransactionRecord>;

    /// Newest-first transfer history for one account.
    fn list_transfers_for_account(
        &self,
        account_id: &str,
        limit: usize,
    ) -> LedgerResult<Vec<TransactionRecord>>;

    /// All records currently flagged for reconciliation.
    fn list_flagged_transfers(&self) -> LedgerResult<Vec<TransactionRecord>>;

    /// Unflagged pending records created before `older_than` (likely stuck).
    fn list_stale_pending(
        &self,
        older_than: DateTime<Utc>,
    ) -> LedgerResult<Vec<TransactionRecord>>;
}

// =============================================================================
// Index Key Helpers
// =============================================================================

/// Build a composite key for the account_transfer_index table.
///
/// Format: `account_id | inverted_millis_be_bytes | transfer_id`
///
/// The inverted timestamp ensures newest-first ordering when scanning forward.
fn make_index_key(account_id: &str, created_at: DateTime<Utc>, transfer_id: &str) -> Vec<u8> {
    let millis = created_at.timestamp_millis();
    let mut key = Vec::with_capacity(account_id.len() + 1 + 8 + 1 + transfer_id.len());
    key.extend_from_slice(account_id.as_bytes());
    key.push(b'|');
    // Invert timestamp for descending order (newest first)
    key.extend_from_slice(&(!millis as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(transfer_id.as_bytes());
    key
}

/// Build a prefix key for range scanning all transfers of an account.
fn make_prefix(account_id: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(account_id.len() + 1);
    prefix.extend_from_slice(account_id.as_bytes());
    prefix.push(b'|');
    prefix
}

/// Build the upper bound for a range scan (prefix with 0xFF bytes appended).
fn make_prefix_end(account_id: &str) -> Vec<u8> {
    let mut end = Vec::with_capacity(account_id.len() + 1 + 20);
    end.extend_from_slice(account_id.as_bytes());
    end.push(b'|');
    end.extend_from_slice(&[0xFF; 20]);
    end
}

// =============================================================================
// LedgerDb
// =============================================================================

/// Embedded ACID ledger database.
pub struct LedgerDb {
    db: Database,
}

impl LedgerDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ACCOUNTS)?;
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(TRANSFERS)?;
            let _ = write_txn.open_table(ACCOUNT_TRANSFER_INDEX)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Apply a Pending-only mutation to a transfer inside one write
    /// transaction, enforcing the terminal-once state machine.
    fn update_pending_transfer(
        &self,
        transfer_id: &str,
        apply: impl FnOnce(&mut TransactionRecord),
    ) -> LedgerResult<TransactionRecord> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(TRANSFERS)?;

            // Read existing value and deserialize before mutating
            let existing_bytes = {
                let existing = table
                    .get(transfer_id)?
                    .ok_or_else(|| LedgerError::NotFound(format!("transfer {transfer_id}")))?;
                existing.value().to_vec()
            };

            let mut record: TransactionRecord = serde_json::from_slice(&existing_bytes)?;
            if record.status != TransferStatus::Pending {
                return Err(LedgerError::InvalidTransition {
                    transfer_id: transfer_id.to_string(),
                    status: record.status,
                });
            }

            apply(&mut record);

            let json = serde_json::to_vec(&record)?;
            table.insert(transfer_id, json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }
}

impl LedgerStore for LedgerDb {
    fn get_account(&self, account_id: &str) -> LedgerResult<Option<Account>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ACCOUNTS)?;
        match table.get(account_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn get_wallet(&self, account_id: &str) -> LedgerResult<Option<Wallet>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;
        match table.get(account_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn create_wallet(&self, account: &Account, wallet: &Wallet) -> LedgerResult<()> {
        let account_json = serde_json::to_vec(account)?;
        let wallet_json = serde_json::to_vec(wallet)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut wallets = write_txn.open_table(WALLETS)?;
            if wallets.get(wallet.account_id.as_str())?.is_some() {
                return Err(LedgerError::AlreadyExists(format!(
                    "wallet for account {}",
                    wallet.account_id
                )));
            }
            wallets.insert(wallet.account_id.as_str(), wallet_json.as_slice())?;

            let mut accounts = write_txn.open_table(ACCOUNTS)?;
            if accounts.get(account.account_id.as_str())?.is_none() {
                accounts.insert(account.account_id.as_str(), account_json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn insert_transfer(&self, record: &TransactionRecord) -> LedgerResult<()> {
        let json = serde_json::to_vec(record)?;
        let index_key = make_index_key(
            &record.sender_account_id,
            record.created_at,
            &record.transfer_id,
        );

        let write_txn = self.db.begin_write()?;
        {
            let mut transfers = write_txn.open_table(TRANSFERS)?;
            if transfers.get(record.transfer_id.as_str())?.is_some() {
                return Err(LedgerError::AlreadyExists(format!(
                    "transfer {}",
                    record.transfer_id
                )));
            }
            transfers.insert(record.transfer_id.as_str(), json.as_slice())?;

            let mut index = write_txn.open_table(ACCOUNT_TRANSFER_INDEX)?;
            index.insert(index_key.as_slice(), record.transfer_id.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_transfer(&self, transfer_id: &str) -> LedgerResult<Option<TransactionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSFERS)?;
        match table.get(transfer_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn complete_transfer(
        &self,
        transfer_id: &str,
        remote_reference: &str,
    ) -> LedgerResult<TransactionRecord> {
        self.update_pending_transfer(transfer_id, |record| {
            record.mark_completed(remote_reference);
        })
    }

    fn fail_transfer(&self, transfer_id: &str, detail: &str) -> LedgerResult<TransactionRecord> {
        self.update_pending_transfer(transfer_id, |record| {
            record.mark_failed(detail);
        })
    }

    fn flag_transfer(&self, transfer_id: &str, detail: &str) -> LedgerResult<TransactionRecord> {
        self.update_pending_transfer(transfer_id, |record| {
            record.mark_flagged(detail);
        })
    }

    fn list_transfers_for_account(
        &self,
        account_id: &str,
        limit: usize,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(ACCOUNT_TRANSFER_INDEX)?;
        let transfers = read_txn.open_table(TRANSFERS)?;

        let prefix = make_prefix(account_id);
        let prefix_end = make_prefix_end(account_id);

        let mut results = Vec::with_capacity(limit.min(64));
        for entry in index.range(prefix.as_slice()..prefix_end.as_slice())? {
            if results.len() >= limit {
                break;
            }
            let entry = entry?;
            let transfer_id = entry.1.value().to_string();
            if let Some(value) = transfers.get(transfer_id.as_str())? {
                results.push(serde_json::from_slice(value.value())?);
            }
        }

        Ok(results)
    }

    fn list_flagged_transfers(&self) -> LedgerResult<Vec<TransactionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSFERS)?;

        let mut flagged = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let record: TransactionRecord = serde_json::from_slice(entry.1.value())?;
            if record.needs_reconciliation {
                flagged.push(record);
            }
        }
        Ok(flagged)
    }

    fn list_stale_pending(
        &self,
        older_than: DateTime<Utc>,
    ) -> LedgerResult<Vec<TransactionRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSFERS)?;

        let mut stale = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let record: TransactionRecord = serde_json::from_slice(entry.1.value())?;
            if record.status == TransferStatus::Pending
                && !record.needs_reconciliation
                && record.created_at < older_than
            {
                stale.push(record);
            }
        }
        Ok(stale)
    }
}

// =============================================================================
// Tests
// =============================================================================

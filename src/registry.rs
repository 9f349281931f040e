// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet provisioning, one custodial wallet per account.
//!
//! [`WalletRegistry::get_or_create_wallet`] is idempotent: an account that
//! already owns a wallet gets it back without any remote call. Concurrent
//! first calls for the same account are settled by the ledger's uniqueness
//! constraint on the account binding: the loser discards its local attempt,
//! logs the orphaned remote wallet and re-fetches the winning row (a single
//! retry, no loop).

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::audit::{AuditEvent, AuditEventType, AuditLog};
use crate::error::{TipError, TipResult};
use crate::keyvault::KeyVault;
use crate::ledger::{Account, LedgerError, LedgerStore, Wallet};
use crate::node::WalletNode;

pub struct WalletRegistry {
    ledger: Arc<dyn LedgerStore>,
    node: Arc<dyn WalletNode>,
    vault: Arc<KeyVault>,
    audit: Arc<AuditLog>,
}

impl WalletRegistry {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        node: Arc<dyn WalletNode>,
        vault: Arc<KeyVault>,
        audit: Arc<AuditLog>,
    ) -> Self {
        Self {
            ledger,
            node,
            vault,
            audit,
        }
    }

    /// Return the account's wallet, provisioning one via the daemon if none
    /// exists yet. The boolean is true when this call created the wallet.
    ///
    /// The plaintext spend key returned by the daemon is encrypted
    /// immediately and only the ciphertext is persisted.
    pub async fn get_or_create_wallet(&self, account_id: &str) -> TipResult<(Wallet, bool)> {
        if let Some(existing) = self.ledger.get_wallet(account_id)? {
            return Ok((existing, false));
        }

        debug!(account_id, "no wallet on file, provisioning via daemon");
        let created = self.node.create_wallet().await?;
        let spend_key = Zeroizing::new(created.private_spend_key);
        let encrypted_spend_key = self.vault.encrypt(&spend_key)?;

        let account = Account::new(account_id);
        let wallet = Wallet {
            account_id: account_id.to_string(),
            address: created.address,
            encrypted_spend_key,
            public_spend_key: created.public_spend_key,
            created_at: Utc::now(),
        };

        match self.ledger.create_wallet(&account, &wallet) {
            Ok(()) => {
                info!(account_id, address = %wallet.address, "wallet created");
                self.audit.record(
                    AuditEvent::new(AuditEventType::WalletCreated)
                        .with_account(account_id)
                        .with_resource("wallet", &wallet.address),
                );
                Ok((wallet, true))
            }
            Err(LedgerError::AlreadyExists(_)) => {
                // Lost the creation race. The remote wallet we just made has
                // no local row and cannot be reached again; log it so the
                // orphan is traceable.
                warn!(
                    account_id,
                    orphaned_address = %wallet.address,
                    "wallet creation raced, keeping the winning row"
                );
                let winner = self.ledger.get_wallet(account_id)?.ok_or_else(|| {
                    TipError::NotFound(format!("wallet for account {account_id}"))
                })?;
                Ok((winner, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Look up an existing wallet without provisioning.
    pub fn find_wallet(&self, account_id: &str) -> TipResult<Wallet> {
        self.ledger
            .get_wallet(account_id)?
            .ok_or_else(|| TipError::NotFound(format!("account {account_id} has no wallet")))
    }
}

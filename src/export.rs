// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key export policy.
//!
//! Plaintext spend keys may only leave the service over a private channel.
//! The channel check runs before any ledger or vault access, so for a
//! non-private request the plaintext is never constructed, not merely
//! withheld.

use std::sync::Arc;

use tracing::info;
use zeroize::Zeroizing;

use crate::audit::{AuditEvent, AuditEventType, AuditLog};
use crate::error::{TipError, TipResult};
use crate::keyvault::KeyVault;
use crate::ledger::LedgerStore;

/// Decrypted key material handed to the caller exactly once.
#[derive(Debug)]
pub struct ExportedKeys {
    pub address: String,
    pub private_spend_key: Zeroizing<String>,
    pub public_spend_key: Option<String>,
}

pub struct ExportGuard {
    ledger: Arc<dyn LedgerStore>,
    vault: Arc<KeyVault>,
    audit: Arc<AuditLog>,
}

impl ExportGuard {
    pub fn new(ledger: Arc<dyn LedgerStore>, vault: Arc<KeyVault>, audit: Arc<AuditLog>) -> Self {
        Self {
            ledger,
            vault,
            audit,
        }
    }

    /// Decrypt and return the account's spend keys.
    ///
    /// Callers must not retain or log the plaintext.
    pub fn export_keys(&self, account_id: &str, channel_private: bool) -> TipResult<ExportedKeys> {
        if !channel_private {
            self.audit.record(
                AuditEvent::new(AuditEventType::ExportDenied)
                    .with_account(account_id)
                    .failed("channel is not private"),
            );
            return Err(TipError::PolicyViolation(
                "keys can only be exported over a private channel".to_string(),
            ));
        }

        let wallet = self
            .ledger
            .get_wallet(account_id)?
            .ok_or_else(|| TipError::NotFound(format!("account {account_id} has no wallet")))?;

        let private_spend_key = self.vault.decrypt(&wallet.encrypted_spend_key)?;

        info!(account_id, address = %wallet.address, "spend keys exported");
        self.audit.record(
            AuditEvent::new(AuditEventType::KeysExported)
                .with_account(account_id)
                .with_resource("wallet", &wallet.address),
        );

        Ok(ExportedKeys {
            address: wallet.address,
            private_spend_key,
            public_spend_key: wallet.public_spend_key,
        })
    }
}

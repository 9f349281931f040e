// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Remote wallet daemon integration.
//!
//! The daemon owns address generation, balance accounting and broadcast;
//! this module provides:
//! - the [`WalletNode`] trait the core is written against (mocked in tests)
//! - the canonical wire types, validated at this boundary
//! - the HTTP client implementation ([`NodeClient`])
//!
//! Transport failures are distinguished from application rejections: a
//! timeout or an undecodable response means the remote outcome is *unknown*,
//! which callers must not treat as a definite failure.

pub mod client;
pub mod types;

pub use client::NodeClient;
pub use types::{BalanceInfo, CreatedWallet, TransferReceipt};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The request timed out; for mutating calls the remote outcome is
    /// unknown.
    #[error("wallet daemon timed out during {operation}")]
    Timeout { operation: String },

    /// The daemon answered and said no (application-level rejection).
    #[error("wallet daemon rejected {operation}: {message}")]
    Rejected { operation: String, message: String },

    /// Transport failure or undecodable response; the remote outcome cannot
    /// be determined.
    #[error("wallet daemon outcome unknown during {operation}: {detail}")]
    Unknown { operation: String, detail: String },

    /// Client construction failed; raised at startup, never mid-call.
    #[error("wallet daemon client configuration: {0}")]
    Config(String),
}

pub type NodeResult<T> = Result<T, NodeError>;

/// The wallet daemon operations the core consumes.
#[async_trait]
pub trait WalletNode: Send + Sync {
    /// Create a fresh wallet (address + spend keys) on the daemon.
    async fn create_wallet(&self) -> NodeResult<CreatedWallet>;

    /// Spendable balance for an address, in the native unit.
    async fn get_balance(&self, address: &str) -> NodeResult<BalanceInfo>;

    /// Whether the daemon considers the address well-formed and usable.
    async fn validate_address(&self, address: &str) -> NodeResult<bool>;

    /// Broadcast a transfer signed with the given plaintext spend key.
    async fn send_transfer(
        &self,
        spend_key: &str,
        recipient_address: &str,
        amount: f64,
    ) -> NodeResult<TransferReceipt>;
}

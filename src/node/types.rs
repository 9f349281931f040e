// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical wire types for the wallet daemon API.
//!
//! The daemon speaks camelCase JSON. Every response is deserialized with
//! `deny_unknown_fields` so schema drift (a daemon variant answering
//! `spendKey` instead of `privateSpendKey`, or `available_balance` instead
//! of `availableBalance`) is rejected here instead of propagating a half
//! parsed record into the ledger.

use serde::{Deserialize, Serialize};

/// Response of `POST /addresses/create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatedWallet {
    /// Public address of the new wallet.
    pub address: String,
    /// Plaintext private spend key. Callers must encrypt it immediately and
    /// drop this struct; it is never persisted as-is.
    pub private_spend_key: String,
    /// Public spend key, when the daemon provides one.
    #[serde(default)]
    pub public_spend_key: Option<String>,
}

/// Response of `GET /balance/{address}`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BalanceInfo {
    /// Spendable balance in the native unit (decimal).
    pub available_balance: f64,
}

/// Body of `POST /addresses/validate`.
#[derive(Debug, Serialize)]
pub struct ValidateAddressRequest<'a> {
    pub address: &'a str,
}

/// One destination of a basic transfer.
#[derive(Debug, Serialize)]
pub struct Destination<'a> {
    pub address: &'a str,
    pub amount: f64,
}

/// Body of `POST /transactions/send/basic`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransferRequest<'a> {
    pub destinations: Vec<Destination<'a>>,
    pub spend_key: &'a str,
}

/// Response of `POST /transactions/send/basic`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TransferReceipt {
    /// Daemon-reported status string (e.g. "success").
    pub status: String,
    /// Broadcast reference; recorded as `remote_reference` in the ledger.
    pub transaction_reference: String,
}

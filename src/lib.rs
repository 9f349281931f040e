// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TipVault - Custodial Wallet and Tip Ledger Service
//!
//! This crate provides a custodial wallet subsystem over an external wallet
//! daemon: per-account wallet provisioning with encrypted spend keys, a
//! durable transfer ledger, and guarded plaintext key export.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `keyvault` - Spend key encryption at rest (XChaCha20-Poly1305)
//! - `ledger` - Durable accounts, wallets and transfer records (redb)
//! - `node` - Wallet daemon client (reqwest)
//! - `orchestrator` - Tip settlement with per-sender serialization
//! - `reconcile` - Background sweep for unsettled transfer records
//! - `registry` - Idempotent account-to-wallet provisioning
//! - `export` - Private-channel key export policy

pub mod api;
pub mod audit;
pub mod config;
pub mod error;
pub mod export;
pub mod keyvault;
pub mod ledger;
pub mod node;
pub mod orchestrator;
pub mod reconcile;
pub mod registry;
pub mod state;

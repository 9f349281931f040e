// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state: every collaborator is an injected, explicitly
//! scoped resource behind an `Arc`. Nothing in the service reaches for
//! globals.

use std::sync::Arc;

use crate::audit::AuditLog;
use crate::config::AppConfig;
use crate::export::ExportGuard;
use crate::keyvault::KeyVault;
use crate::ledger::LedgerStore;
use crate::node::WalletNode;
use crate::orchestrator::TransactionOrchestrator;
use crate::reconcile::ReconcileQueue;
use crate::registry::WalletRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub ledger: Arc<dyn LedgerStore>,
    pub registry: Arc<WalletRegistry>,
    pub orchestrator: Arc<TransactionOrchestrator>,
    pub exporter: Arc<ExportGuard>,
}

impl AppState {
    /// Wire the component graph from its leaf collaborators. The same entry
    /// point serves production (`main`) and tests (mock node, temp ledger).
    pub fn new(
        config: Arc<AppConfig>,
        ledger: Arc<dyn LedgerStore>,
        node: Arc<dyn WalletNode>,
        vault: Arc<KeyVault>,
        audit: Arc<AuditLog>,
        queue: Arc<ReconcileQueue>,
    ) -> Self {
        let registry = Arc::new(WalletRegistry::new(
            ledger.clone(),
            node.clone(),
            vault.clone(),
            audit.clone(),
        ));
        let orchestrator = Arc::new(TransactionOrchestrator::new(
            ledger.clone(),
            node,
            vault.clone(),
            audit.clone(),
            queue,
        ));
        let exporter = Arc::new(ExportGuard::new(ledger.clone(), vault, audit));

        Self {
            config,
            ledger,
            registry,
            orchestrator,
            exporter,
        }
    }
}

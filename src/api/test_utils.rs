// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared fixtures for handler tests: an [`AppState`] wired over a temp
//! ledger and an in-memory daemon double.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::audit::AuditLog;
use crate::config::AppConfig;
use crate::keyvault::KeyVault;
use crate::ledger::LedgerDb;
use crate::node::types::{BalanceInfo, CreatedWallet, TransferReceipt};
use crate::node::{NodeError, NodeResult, WalletNode};
use crate::reconcile::ReconcileQueue;
use crate::state::AppState;

/// Daemon double: sequential wallet creation, balance bookkeeping keyed by
/// spend key, rejection on insufficient funds.
pub(crate) struct TestNode {
    counter: AtomicUsize,
    refs: AtomicUsize,
    // address -> (spend key, balance)
    wallets: Mutex<HashMap<String, (String, f64)>>,
}

impl TestNode {
    pub(crate) fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            refs: AtomicUsize::new(0),
            wallets: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn set_balance(&self, address: &str, balance: f64) {
        let mut wallets = self.wallets.lock().unwrap();
        if let Some(entry) = wallets.get_mut(address) {
            entry.1 = balance;
        }
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletNode for TestNode {
    async fn create_wallet(&self) -> NodeResult<CreatedWallet> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let address = format!("xte1qq-test-{n}");
        let spend_key = format!("spend-key-{n}");
        self.wallets
            .lock()
            .unwrap()
            .insert(address.clone(), (spend_key.clone(), 0.0));
        Ok(CreatedWallet {
            address,
            private_spend_key: spend_key,
            public_spend_key: Some(format!("pub-key-{n}")),
        })
    }

    async fn get_balance(&self, address: &str) -> NodeResult<BalanceInfo> {
        let wallets = self.wallets.lock().unwrap();
        match wallets.get(address) {
            Some((_, balance)) => Ok(BalanceInfo {
                available_balance: *balance,
            }),
            None => Err(NodeError::Rejected {
                operation: "get_balance".to_string(),
                message: "unknown address".to_string(),
            }),
        }
    }

    async fn validate_address(&self, address: &str) -> NodeResult<bool> {
        Ok(!address.starts_with("invalid"))
    }

    async fn send_transfer(
        &self,
        spend_key: &str,
        recipient_address: &str,
        amount: f64,
    ) -> NodeResult<TransferReceipt> {
        let mut wallets = self.wallets.lock().unwrap();
        let sender_address = wallets
            .iter()
            .find(|(_, (key, _))| key == spend_key)
            .map(|(address, _)| address.clone())
            .ok_or_else(|| NodeError::Rejected {
                operation: "send_transfer".to_string(),
                message: "unknown spend key".to_string(),
            })?;

        {
            let sender = wallets.get_mut(&sender_address).unwrap();
            if sender.1 < amount {
                return Err(NodeError::Rejected {
                    operation: "send_transfer".to_string(),
                    message: "insufficient funds".to_string(),
                });
            }
            sender.1 -= amount;
        }
        if let Some(recipient) = wallets.get_mut(recipient_address) {
            recipient.1 += amount;
        }

        let n = self.refs.fetch_add(1, Ordering::SeqCst);
        Ok(TransferReceipt {
            status: "SUCCESS".to_string(),
            transaction_reference: format!("ref-{n}"),
        })
    }
}

/// A fully wired state over a temp data dir. The [`TestNode`] handle is
/// returned separately so tests can seed balances.
pub(crate) fn test_state() -> (TempDir, AppState, Arc<TestNode>) {
    let temp = TempDir::new().unwrap();
    let config = Arc::new(AppConfig {
        data_dir: temp.path().to_path_buf(),
        host: "127.0.0.1".to_string(),
        port: 0,
        node_base_url: "http://127.0.0.1:8441".to_string(),
        node_api_key: "test-secret".to_string(),
        node_timeout: Duration::from_secs(5),
        master_key: [5u8; 32],
        reconcile_interval: Duration::from_secs(60),
    });
    let ledger = Arc::new(LedgerDb::open(&config.ledger_db_path()).unwrap());
    let vault = Arc::new(KeyVault::new(&config.master_key));
    let audit = Arc::new(AuditLog::open(config.audit_dir()).unwrap());
    let queue = Arc::new(ReconcileQueue::new());
    let node = Arc::new(TestNode::new());

    let state = AppState::new(config, ledger, node.clone(), vault, audit, queue);
    (temp, state, node)
}

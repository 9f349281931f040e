// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tipping endpoints.
//!
//! `POST /v1/tips` settles a transfer between two registered accounts and
//! `GET /v1/accounts/{account_id}/transfers` lists an account's history.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{error::ApiError, ledger::TransactionRecord, state::AppState};

const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;

/// Request to send a tip from one account to another.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TipRequest {
    pub sender_account_id: String,
    pub recipient_account_id: String,
    /// Amount in native units. Must be finite and strictly positive.
    pub amount: f64,
}

/// Outcome of a settled tip.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TipResponse {
    pub transfer_id: String,
    pub status: String,
    /// Transaction reference assigned by the wallet daemon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_reference: Option<String>,
}

/// One entry in an account's transfer history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransferSummary {
    pub transfer_id: String,
    pub recipient_address: String,
    pub amount: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_reference: Option<String>,
    /// True while the record awaits operator reconciliation.
    pub needs_reconciliation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TransactionRecord> for TransferSummary {
    fn from(record: TransactionRecord) -> Self {
        Self {
            transfer_id: record.transfer_id,
            recipient_address: record.recipient_address,
            amount: record.amount,
            status: record.status.as_str().to_string(),
            remote_reference: record.remote_reference,
            needs_reconciliation: record.needs_reconciliation,
            detail: record.detail,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Query parameters for transfer history.
#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of entries to return (default 20, capped at 100).
    pub limit: Option<usize>,
}

/// Send a tip.
///
/// Both accounts must already have wallets. The call returns once the
/// transfer settles; a timed-out or unclassifiable daemon outcome leaves
/// the record pending and flagged rather than failed.
#[utoipa::path(
    post,
    path = "/v1/tips",
    tag = "Tips",
    request_body = TipRequest,
    responses(
        (status = 200, description = "Tip settled", body = TipResponse),
        (status = 400, description = "Invalid amount or recipient address"),
        (status = 404, description = "Sender or recipient has no wallet"),
        (status = 502, description = "Wallet daemon rejected or failed the transfer"),
        (status = 504, description = "Wallet daemon timed out; transfer flagged for reconciliation")
    )
)]
pub async fn send_tip(
    State(state): State<AppState>,
    Json(request): Json<TipRequest>,
) -> Result<Json<TipResponse>, ApiError> {
    // Reject unknown recipients before touching the daemon so the error
    // names the account rather than a missing wallet.
    let recipient_known = state
        .ledger
        .get_account(&request.recipient_account_id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_some();
    if !recipient_known {
        return Err(ApiError::not_found(format!(
            "recipient account {} is not registered",
            request.recipient_account_id
        )));
    }

    let outcome = state
        .orchestrator
        .tip(
            &request.sender_account_id,
            &request.recipient_account_id,
            request.amount,
        )
        .await?;

    Ok(Json(TipResponse {
        transfer_id: outcome.transfer_id,
        status: outcome.status.as_str().to_string(),
        remote_reference: outcome.remote_reference,
    }))
}

/// List an account's transfers, newest first.
#[utoipa::path(
    get,
    path = "/v1/accounts/{account_id}/transfers",
    tag = "Tips",
    params(
        ("account_id" = String, Path, description = "Account ID"),
        HistoryQuery
    ),
    responses(
        (status = 200, description = "Transfer history", body = [TransferSummary]),
        (status = 404, description = "Unknown account")
    )
)]
pub async fn list_transfers(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TransferSummary>>, ApiError> {
    let known = state
        .ledger
        .get_account(&account_id)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .is_some();
    if !known {
        return Err(ApiError::not_found(format!(
            "account {account_id} is not registered"
        )));
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let records = state
        .ledger
        .list_transfers_for_account(&account_id, limit)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(Json(records.into_iter().map(TransferSummary::from).collect()))
}

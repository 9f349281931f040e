// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance query endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::ApiError, state::AppState};

/// Spendable balance for an account's wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    pub account_id: String,
    /// Public address the balance belongs to.
    pub address: String,
    /// Spendable balance in native units, as reported by the wallet daemon.
    pub available_balance: f64,
}

/// Get the available balance for an account.
///
/// The account must already have a wallet; balance queries never create one.
#[utoipa::path(
    get,
    path = "/v1/accounts/{account_id}/balance",
    tag = "Balance",
    params(
        ("account_id" = String, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Balance retrieved", body = BalanceResponse),
        (status = 404, description = "Account has no wallet"),
        (status = 502, description = "Wallet daemon failure"),
        (status = 504, description = "Wallet daemon timed out")
    )
)]
pub async fn get_balance(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.orchestrator.get_balance(&account_id).await?;

    Ok(Json(BalanceResponse {
        account_id,
        address: balance.address,
        available_balance: balance.available_balance,
    }))
}

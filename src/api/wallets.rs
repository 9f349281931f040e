// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet provisioning endpoint.
//!
//! Creation is idempotent per account and returns the wallet metadata,
//! never any key material.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::ApiError, state::AppState};

/// Request to create (or fetch) the account's wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWalletRequest {
    /// External account identity that will own the wallet.
    pub account_id: String,
}

/// Wallet metadata returned to callers. Key material is deliberately
/// absent: the encrypted spend key never leaves storage and the plaintext
/// only via the export endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    pub account_id: String,
    /// Public address assigned by the wallet daemon.
    pub address: String,
    /// Public spend key, if the daemon returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_spend_key: Option<String>,
    /// True when this request created the wallet.
    pub created: bool,
    pub created_at: DateTime<Utc>,
}

/// Create the account's wallet, or return the existing one.
///
/// Safe to retry: a second call for the same account returns the same
/// wallet with `created = false` and makes no remote call.
#[utoipa::path(
    post,
    path = "/v1/wallets",
    tag = "Wallets",
    request_body = CreateWalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = WalletResponse),
        (status = 200, description = "Account already had a wallet", body = WalletResponse),
        (status = 400, description = "Invalid account id"),
        (status = 502, description = "Wallet daemon failure")
    )
)]
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<WalletResponse>), ApiError> {
    let account_id = request.account_id.trim();
    if account_id.is_empty() {
        return Err(ApiError::bad_request("account_id must not be empty"));
    }

    let (wallet, created) = state.registry.get_or_create_wallet(account_id).await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(WalletResponse {
            account_id: wallet.account_id,
            address: wallet.address,
            public_spend_key: wallet.public_spend_key,
            created,
            created_at: wallet.created_at,
        }),
    ))
}

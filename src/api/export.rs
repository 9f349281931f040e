// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key export endpoint.
//!
//! The only path that ever returns plaintext key material, and only after
//! the private-channel policy check passes.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{error::ApiError, state::AppState};

/// Request to export an account's keys.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportRequest {
    /// Whether the requesting channel is private. Export is refused over
    /// anything else.
    pub channel_private: bool,
}

/// Exported key material. Handle with care; this is the plaintext spend key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportResponse {
    pub address: String,
    pub private_spend_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_spend_key: Option<String>,
}

/// Export the account's wallet keys.
///
/// Policy is checked before the wallet lookup, so a public-channel request
/// is refused without revealing whether the wallet exists.
#[utoipa::path(
    post,
    path = "/v1/accounts/{account_id}/export",
    tag = "Export",
    params(
        ("account_id" = String, Path, description = "Account ID")
    ),
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Keys exported", body = ExportResponse),
        (status = 403, description = "Channel is not private"),
        (status = 404, description = "Account has no wallet"),
        (status = 500, description = "Stored key could not be decrypted")
    )
)]
pub async fn export_keys(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    Json(request): Json<ExportRequest>,
) -> Result<Json<ExportResponse>, ApiError> {
    let keys = state
        .exporter
        .export_keys(&account_id, request.channel_private)?;

    Ok(Json(ExportResponse {
        address: keys.address,
        private_spend_key: keys.private_spend_key.to_string(),
        public_spend_key: keys.public_spend_key,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_utils::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn private_channel_receives_the_plaintext_key() {
        let (_temp, state, _node) = test_state();
        let (wallet, _) = state.registry.get_or_create_wallet("acct_1").await.unwrap();

        let Json(response) = export_keys(
            State(state),
            Path("acct_1".to_string()),
            Json(ExportRequest {
                channel_private: true,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.address, wallet.address);
        assert_eq!(response.private_spend_key, "spend-key-0");
        assert_eq!(response.public_spend_key.as_deref(), Some("pub-key-0"));
    }

    #[tokio::test]
    async fn public_channel_is_refused() {
        let (_temp, state, _node) = test_state();
        state.registry.get_or_create_wallet("acct_1").await.unwrap();

        let err = export_keys(
            State(state),
            Path("acct_1".to_string()),
            Json(ExportRequest {
                channel_private: false,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.code, "policy_violation");
    }

    #[tokio::test]
    async fn missing_wallet_is_not_found() {
        let (_temp, state, _node) = test_state();

        let err = export_keys(
            State(state),
            Path("acct_ghost".to_string()),
            Json(ExportRequest {
                channel_private: true,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}

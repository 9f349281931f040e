// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy for the tip ledger core, plus the HTTP error envelope.
//!
//! Core operations return [`TipError`]; the API layer converts it into an
//! [`ApiError`] carrying an HTTP status, a machine-readable `code` and a
//! human-readable message. Outcomes that need operator attention
//! (`Remote(Unknown)`, `ReconciliationRequired`) keep their own codes so
//! they are distinguishable even where the user-facing text is generic.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::keyvault::CryptoError;
use crate::ledger::LedgerError;
use crate::node::NodeError;

// =============================================================================
// Core taxonomy
// =============================================================================

/// Errors produced by the wallet registry, orchestrator and export guard.
#[derive(Debug, thiserror::Error)]
pub enum TipError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid recipient address: {0}")]
    InvalidRecipientAddress(String),

    #[error("sender {0} has no wallet")]
    SenderHasNoWallet(String),

    #[error("recipient {0} has no wallet")]
    RecipientHasNoWallet(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("remote wallet daemon: {0}")]
    Remote(#[from] NodeError),

    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// The remote send succeeded but the local terminal update failed.
    /// The record is queued for the reconciliation sweeper.
    #[error("reconciliation required for transfer {transfer_id}: {detail}")]
    ReconciliationRequired { transfer_id: String, detail: String },

    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),
}

pub type TipResult<T> = Result<T, TipError>;

// =============================================================================
// HTTP envelope
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "already_exists", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "policy_violation", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            code: self.code,
        });
        (self.status, body).into_response()
    }
}

impl From<TipError> for ApiError {
    fn from(err: TipError) -> Self {
        match err {
            TipError::NotFound(what) => ApiError::not_found(what),
            TipError::AlreadyExists(what) => ApiError::conflict(what),
            TipError::InvalidAmount(reason) => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_amount", reason)
            }
            TipError::InvalidRecipientAddress(addr) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "invalid_recipient_address",
                format!("recipient address is not valid: {addr}"),
            ),
            TipError::SenderHasNoWallet(account) => ApiError::new(
                StatusCode::NOT_FOUND,
                "sender_has_no_wallet",
                format!("account {account} has no wallet"),
            ),
            TipError::RecipientHasNoWallet(account) => ApiError::new(
                StatusCode::NOT_FOUND,
                "recipient_has_no_wallet",
                format!("account {account} has no wallet"),
            ),
            TipError::PolicyViolation(reason) => ApiError::forbidden(reason),
            TipError::Remote(NodeError::Timeout { .. }) => ApiError::new(
                StatusCode::GATEWAY_TIMEOUT,
                "remote_timeout",
                "wallet daemon timed out; check your balance before retrying",
            ),
            TipError::Remote(NodeError::Rejected { message, .. }) => {
                ApiError::new(StatusCode::BAD_GATEWAY, "remote_rejected", message)
            }
            TipError::Remote(NodeError::Unknown { .. }) => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "remote_unknown",
                "wallet daemon outcome unknown; check your balance before retrying",
            ),
            TipError::Remote(e @ NodeError::Config(_)) => ApiError::internal(e.to_string()),
            TipError::Crypto(e) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "crypto_error",
                e.to_string(),
            ),
            TipError::ReconciliationRequired { transfer_id, .. } => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "reconciliation_required",
                format!("transfer {transfer_id} requires reconciliation; do not retry blindly"),
            ),
            TipError::Ledger(LedgerError::NotFound(what)) => ApiError::not_found(what),
            TipError::Ledger(LedgerError::AlreadyExists(what)) => ApiError::conflict(what),
            TipError::Ledger(e) => ApiError::internal(format!("ledger failure: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_code() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.code, "not_found");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let forb = ApiError::forbidden("private only");
        assert_eq!(forb.status, StatusCode::FORBIDDEN);
        assert_eq!(forb.code, "policy_violation");
    }

    #[tokio::test]
    async fn into_response_returns_tagged_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "bad data");
        assert_eq!(body["code"], "bad_request");
    }

    #[test]
    fn timeout_maps_to_gateway_timeout_with_distinct_code() {
        let err = TipError::Remote(NodeError::Timeout {
            operation: "send_transfer".to_string(),
        });
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(api.code, "remote_timeout");
    }

    #[test]
    fn reconciliation_required_keeps_its_code() {
        let err = TipError::ReconciliationRequired {
            transfer_id: "t-1".to_string(),
            detail: "local commit failed".to_string(),
        };
        let api: ApiError = err.into();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code, "reconciliation_required");
        assert!(api.message.contains("t-1"));
    }

    #[test]
    fn wallet_resolution_errors_map_to_not_found() {
        let sender: ApiError = TipError::SenderHasNoWallet("acct-1".to_string()).into();
        assert_eq!(sender.status, StatusCode::NOT_FOUND);
        assert_eq!(sender.code, "sender_has_no_wallet");

        let recipient: ApiError = TipError::RecipientHasNoWallet("acct-2".to_string()).into();
        assert_eq!(recipient.code, "recipient_has_no_wallet");
    }
}

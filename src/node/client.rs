// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the wallet daemon.
//!
//! Authentication is a static shared secret sent as `X-API-KEY` on every
//! request. A client-level timeout applies to every call; a timed-out
//! mutating call is reported as [`NodeError::Timeout`] so the orchestrator
//! can treat the outcome as unknown rather than failed.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

use super::types::{
    BalanceInfo, CreatedWallet, Destination, SendTransferRequest, TransferReceipt,
    ValidateAddressRequest,
};
use super::{NodeError, NodeResult, WalletNode};

/// Shared-secret header expected by the daemon.
const API_KEY_HEADER: &str = "X-API-KEY";

/// Longest rejection body excerpt carried into an error message.
const MAX_BODY_EXCERPT: usize = 200;

pub struct NodeClient {
    base: Url,
    api_key: String,
    http: Client,
}

impl NodeClient {
    /// Build a client for the daemon at `base_url`.
    ///
    /// The URL is validated here so a bad `NODE_BASE_URL` fails startup, not
    /// the first tip.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> NodeResult<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| NodeError::Config(format!("invalid daemon base url: {e}")))?;
        // Url::join treats the last path segment as a file unless the path
        // ends with a slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base,
            api_key: api_key.into(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> NodeResult<Url> {
        self.base
            .join(path)
            .map_err(|e| NodeError::Config(format!("invalid endpoint {path}: {e}")))
    }

    /// Send a request, map transport failures, and hand back status + body.
    async fn execute(
        &self,
        operation: &str,
        request: reqwest::RequestBuilder,
    ) -> NodeResult<(StatusCode, String)> {
        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| classify_transport(operation, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(operation, &e))?;
        Ok((status, body))
    }

    fn decode<T: serde::de::DeserializeOwned>(operation: &str, body: &str) -> NodeResult<T> {
        serde_json::from_str(body).map_err(|e| NodeError::Unknown {
            operation: operation.to_string(),
            detail: format!("undecodable response: {e}"),
        })
    }
}

#[async_trait]
impl WalletNode for NodeClient {
    async fn create_wallet(&self) -> NodeResult<CreatedWallet> {
        let operation = "create_wallet";
        let url = self.endpoint("addresses/create")?;
        let (status, body) = self.execute(operation, self.http.post(url)).await?;

        if !status.is_success() {
            return Err(rejected(operation, status, &body));
        }
        Self::decode(operation, &body)
    }

    async fn get_balance(&self, address: &str) -> NodeResult<BalanceInfo> {
        let operation = "get_balance";
        let url = self.endpoint(&format!("balance/{address}"))?;
        let (status, body) = self.execute(operation, self.http.get(url)).await?;

        if !status.is_success() {
            return Err(rejected(operation, status, &body));
        }
        Self::decode(operation, &body)
    }

    async fn validate_address(&self, address: &str) -> NodeResult<bool> {
        let operation = "validate_address";
        let url = self.endpoint("addresses/validate")?;
        let request = self
            .http
            .post(url)
            .json(&ValidateAddressRequest { address });
        let (status, body) = self.execute(operation, request).await?;

        match validity_from_status(status) {
            Some(valid) => Ok(valid),
            None => Err(rejected(operation, status, &body)),
        }
    }

    async fn send_transfer(
        &self,
        spend_key: &str,
        recipient_address: &str,
        amount: f64,
    ) -> NodeResult<TransferReceipt> {
        let operation = "send_transfer";
        let url = self.endpoint("transactions/send/basic")?;
        let payload = SendTransferRequest {
            destinations: vec![Destination {
                address: recipient_address,
                amount,
            }],
            spend_key,
        };

        let request = self.http.post(url).json(&payload);
        let (status, body) = self.execute(operation, request).await?;

        if !status.is_success() {
            return Err(rejected(operation, status, &body));
        }
        Self::decode(operation, &body)
    }
}

/// Map a reqwest transport error to the node taxonomy. Anything that is not
/// a clean timeout leaves the remote outcome undetermined.
fn classify_transport(operation: &str, err: &reqwest::Error) -> NodeError {
    if err.is_timeout() {
        NodeError::Timeout {
            operation: operation.to_string(),
        }
    } else {
        NodeError::Unknown {
            operation: operation.to_string(),
            detail: err.to_string(),
        }
    }
}

/// The daemon answered with a non-success status: an application rejection.
fn rejected(operation: &str, status: StatusCode, body: &str) -> NodeError {
    NodeError::Rejected {
        operation: operation.to_string(),
        message: format!("{status}: {}", rejection_message(body)),
    }
}

/// 2xx means valid, 4xx means the daemon judged the address invalid,
/// anything else is not an answer.
fn validity_from_status(status: StatusCode) -> Option<bool> {
    if status.is_success() {
        Some(true)
    } else if status.is_client_error() {
        Some(false)
    } else {
        None
    }
}

/// Pull a human-readable message out of a rejection body.
fn rejection_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["error", "message"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    let mut excerpt: String = trimmed.chars().take(MAX_BODY_EXCERPT).collect();
    if trimmed.chars().count() > MAX_BODY_EXCERPT {
        excerpt.push_str("...");
    }
    excerpt
}

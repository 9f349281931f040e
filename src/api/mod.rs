// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP surface: route table, OpenAPI document and middleware stack.

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod balance;
pub mod export;
pub mod health;
pub mod tips;
pub mod wallets;

#[cfg(test)]
pub(crate) mod test_utils;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/wallets", post(wallets::create_wallet))
        .route("/accounts/{account_id}/balance", get(balance::get_balance))
        .route("/accounts/{account_id}/export", post(export::export_keys))
        .route(
            "/accounts/{account_id}/transfers",
            get(tips::list_transfers),
        )
        .route("/tips", post(tips::send_tip))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        wallets::create_wallet,
        balance::get_balance,
        tips::send_tip,
        tips::list_transfers,
        export::export_keys,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            wallets::CreateWalletRequest,
            wallets::WalletResponse,
            balance::BalanceResponse,
            tips::TipRequest,
            tips::TipResponse,
            tips::TransferSummary,
            export::ExportRequest,
            export::ExportResponse,
            health::HealthResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    tags(
        (name = "Wallets", description = "Wallet provisioning"),
        (name = "Balance", description = "Balance queries"),
        (name = "Tips", description = "Tip settlement and history"),
        (name = "Export", description = "Key export"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

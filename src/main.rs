// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#[cfg(not(test))]
use std::{env, fs, net::SocketAddr, sync::Arc, time::Duration};

#[cfg(not(test))]
use tokio_util::sync::CancellationToken;
#[cfg(not(test))]
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(not(test))]
use tipvault::{
    api::router,
    audit::AuditLog,
    config::AppConfig,
    keyvault::KeyVault,
    ledger::LedgerDb,
    node::NodeClient,
    reconcile::{ReconcileQueue, Reconciler},
    state::AppState,
};

#[cfg(not(test))]
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tipvault=debug"));

    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true),
            )
            .init();
    }
}

#[cfg(not(test))]
#[tokio::main]
async fn main() {
    init_tracing();

    let config = Arc::new(AppConfig::from_env().expect("Failed to load configuration"));
    fs::create_dir_all(&config.data_dir).expect("Failed to create data directory");

    let ledger = Arc::new(
        LedgerDb::open(&config.ledger_db_path()).expect("Failed to open ledger database"),
    );
    let node = Arc::new(
        NodeClient::new(&config.node_base_url, &config.node_api_key, config.node_timeout)
            .expect("Failed to build wallet daemon client"),
    );
    let vault = Arc::new(KeyVault::new(&config.master_key));
    let audit = Arc::new(AuditLog::open(config.audit_dir()).expect("Failed to open audit log"));
    let queue = Arc::new(ReconcileQueue::new());

    let shutdown = CancellationToken::new();
    let reconciler = Reconciler::new(
        ledger.clone(),
        queue.clone(),
        audit.clone(),
        config.reconcile_interval,
    );
    let sweeper = tokio::spawn(reconciler.run(shutdown.clone()));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    let state = AppState::new(config, ledger, node, vault, audit, queue);
    let app = router(state);

    tracing::info!("TipVault server listening on http://{addr} (docs at /docs)");

    let handle = axum_server::Handle::new();
    tokio::spawn(shutdown_signal(shutdown, handle.clone()));

    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .expect("HTTP server failed");

    let _ = sweeper.await;
    tracing::info!("TipVault server stopped");
}

/// Wait for ctrl-c or SIGTERM, then stop the sweeper and drain in-flight
/// requests.
#[cfg(not(test))]
async fn shutdown_signal(shutdown: CancellationToken, handle: axum_server::Handle<SocketAddr>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}

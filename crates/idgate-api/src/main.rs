//! idgate server binary.
//!
//! Configuration comes from the environment:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `IDP_API_KEY` / `IDP_PROJECT_ID` | Provider credentials (required) |
//! | `IDP_SERVICE_ACCOUNT_PATH` | Optional service-account file |
//! | `IDP_TIMEOUT_SECS` / `IDP_KEY_CACHE_TTL_SECS` | Request timeout, signing-key cache ceiling |
//! | `PORT` | Listen port, default 8080 |
//! | `PUBLIC_PATHS` | Extra comma-separated public path prefixes |
//! | `RUST_LOG` | Log filter, default `info` |
//! | `LOG_FORMAT` | `json` for JSON lines, anything else for text |
//!
//! Missing provider credentials abort startup.

use std::net::SocketAddr;
use std::process::ExitCode;

use idgate_api::{app, AppConfig, AppState};
use idgate_provider::{IdentityProvider, ProviderConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let provider_config = match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid identity provider configuration");
            return ExitCode::FAILURE;
        }
    };
    let provider = match IdentityProvider::new(&provider_config) {
        Ok(provider) => provider,
        Err(err) => {
            tracing::error!(error = %err, "failed to initialise identity provider client");
            return ExitCode::FAILURE;
        }
    };

    let config = AppConfig::from_env();
    let state = AppState::new(&config, &provider);
    let public: Vec<&str> = state.gateway.public_paths().iter().collect();
    tracing::info!(project = %provider_config.project_id, public_paths = ?public, "gateway configured");

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(%addr, error = %err, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("idgate listening on {addr}");

    if let Err(err) = axum::serve(listener, app(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
        return ExitCode::FAILURE;
    }
    tracing::info!("shut down cleanly");
    ExitCode::SUCCESS
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

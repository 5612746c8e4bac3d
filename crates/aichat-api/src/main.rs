//! AiChat CLI and REST API entry point.
//!
//! Binary name: `aichat`
//!
//! Parses CLI arguments, initializes tracing, database and services, then
//! runs the requested command or starts the HTTP server.

mod cli;
mod http;
mod state;

use clap::Parser;
use secrecy::SecretString;

use aichat_observe::{LogFormat, init_tracing, shutdown_tracing};
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn,aichat=info",
        1 => "info,aichat=debug",
        _ => "trace",
    };
    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    let otel = matches!(cli.command, Commands::Serve { otel: true, .. });
    init_tracing(filter, format, otel).map_err(|e| anyhow::anyhow!(e))?;

    let api_key = cli.api_key.map(SecretString::from);

    let result = match cli.command {
        Commands::Serve { host, port, .. } => {
            if api_key.is_none() {
                anyhow::bail!("AICHAT_API_KEY must be set to serve requests");
            }
            let state = AppState::init(api_key).await?;
            serve(state, host, port).await
        }

        Commands::Works {
            owner,
            kind,
            page,
            hide_personal_uploads,
        } => {
            let state = AppState::init(api_key).await?;
            cli::works::print_works(&state, &owner, kind, page, hide_personal_uploads).await
        }
    };

    shutdown_tracing();
    result
}

async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, data_dir = %state.data_dir.display(), "AiChat API listening");

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
}

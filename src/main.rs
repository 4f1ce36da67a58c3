//! Umbra DM Server
//!
//! HTTP API for one-to-one messages plus a WebSocket channel that pushes
//! `newMessage`, `messageDelivered` and `messageRead` events to connected
//! users.

use clap::Parser;

use umbra_dm::{router, AppState, ServiceConfig};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "umbra-dm", version, about = "Umbra direct messaging server")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "DM_PORT")]
    port: u16,

    /// SQLite database file. Omit to keep data in memory only.
    #[arg(long, env = "DM_DATABASE_PATH")]
    database_path: Option<String>,

    /// Allowed CORS origin (e.g. "https://chat.example.com").
    /// Any origin is allowed when unset.
    #[arg(long, env = "DM_CORS_ORIGIN")]
    cors_origin: Option<String>,
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "umbra_dm=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = ServiceConfig {
        port: args.port,
        database_path: args.database_path.filter(|p| !p.trim().is_empty()),
        cors_origin: args.cors_origin,
    };

    let state = match AppState::open(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize storage");
            std::process::exit(1);
        }
    };

    let addr = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);
    tracing::info!("Umbra DM server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server error");
}

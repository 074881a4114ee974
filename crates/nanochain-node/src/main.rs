mod api;

use anyhow::Result;
use api::AppState;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    // Throwaway identity for this process; mining rewards credit it.
    let node_id = uuid::Uuid::new_v4().simple().to_string();
    let state = AppState::new(node_id.clone());
    let app = api::router(state.clone());

    let addr: SocketAddr = args.listen.parse()?;
    info!("nanochain-node {node_id} listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown(state))
        .await?;
    Ok(())
}

/// Ctrl-c stops the listener and aborts any in-flight proof search.
async fn shutdown(state: AppState) {
    let _ = tokio::signal::ctrl_c().await;
    state.cancel.store(true, Ordering::Relaxed);
    info!("shutting down");
}

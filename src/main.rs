use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_ask_server::api::{self, AppState};
use llm_ask_server::config::Args;
use llm_ask_server::host::ModelHost;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "llm_ask_server=info,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    args.validate()?;

    info!("Loading {}...", args.model);
    let load_args = args.clone();
    let host = tokio::task::spawn_blocking(move || ModelHost::load(&load_args)).await??;
    info!("Model loaded and ready.");

    match args.prompt.clone() {
        Some(prompt) => run_single_prompt(host, prompt).await,
        None => run_server(host, &args).await,
    }
}

async fn run_single_prompt(host: ModelHost, prompt: String) -> anyhow::Result<()> {
    let output = tokio::task::spawn_blocking(move || host.generate(&prompt)).await??;

    println!("{}", output.text);
    eprintln!(
        "[{} prompt tokens, {} new tokens, {:.2} tok/s, {}ms, {:?}]",
        output.prompt_tokens,
        output.tokens.len(),
        output.tokens_per_second,
        output.total_time_ms,
        output.finish_reason
    );
    Ok(())
}

async fn run_server(host: ModelHost, args: &Args) -> anyhow::Result<()> {
    info!("Generation settings: {:?}", host.config());
    let state = Arc::new(AppState::new(host, args.max_pending));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::new(args.host.parse()?, args.port);

    info!(
        "Listening on http://{} (POST /api/ask, GET /health, max_pending={})",
        addr, args.max_pending
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

mod config;
mod frame;
mod layout;
mod routes;
mod services;
mod state;

use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::layout::Layout;

#[tokio::main]
async fn main() {
    // A missing .env is normal; real env vars win either way.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "classdesk failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    let layout = match &config.layout_path {
        Some(path) => Layout::from_file(path)?,
        None => Layout::default_classroom(),
    };
    tracing::info!(
        desks = layout.desks().count(),
        seats = layout.seat_count(),
        custom = config.layout_path.is_some(),
        "layout loaded"
    );

    let state = state::AppState::new(layout, config.client_channel_capacity);
    let app = routes::app(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind((config.bind_addr, config.port)).await?;
    tracing::info!(addr = %config.bind_addr, port = config.port, "classdesk listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

use std::sync::Arc;

use webhook_router::config::RelayConfig;
use webhook_router::error::Result;
use webhook_router::pipeline::RelayController;
use webhook_router::server::router;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = RelayConfig::from_env()?;

    eprintln!("Webhook Router v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Listening: http://{}", config.bind_addr);
    eprintln!("   Forwarding to: {}", config.forwarding_url);
    eprintln!(
        "   Dedupe window: {}s, forward timeout: {}s",
        config.dedupe_ttl.as_secs(),
        config.forward_timeout.as_secs()
    );
    eprintln!(
        "   Payload logging: {}, require text: {}\n",
        if config.log_enabled { "on" } else { "off" },
        if config.require_text { "on" } else { "off" },
    );

    let controller = Arc::new(RelayController::from_config(&config)?);
    let app = router(controller);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "Webhook router started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Webhook router stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

use anyhow::Result;
use pesa_push::{
    config::Config,
    handlers::{build_router, HealthState, PaymentsState},
    services::{
        GatewayClient, InMemoryReceiptStore, PaymentInitiator, ReceiptStore, ReceiptValidator,
        StatusReconciler,
    },
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting pesa-push API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);

    if !config.gateway.credentials_configured() {
        tracing::warn!(
            "Gateway credentials not configured; payment initiation and receipt \
             validation will return configuration errors until they are set"
        );
    }

    // Initialize services
    let gateway = Arc::new(GatewayClient::new(&config.gateway)?);
    let store: Arc<dyn ReceiptStore> = Arc::new(InMemoryReceiptStore::default());

    let initiator = Arc::new(PaymentInitiator::new(gateway.clone(), config.gateway.clone()));
    let reconciler = Arc::new(StatusReconciler::new(gateway.clone()));
    let receipts = Arc::new(ReceiptValidator::new(config.gateway.clone(), store));

    // Build application state
    let payments_state = PaymentsState {
        initiator,
        reconciler,
        receipts,
    };

    let health_state = HealthState {
        gateway_configured: config.gateway.credentials_configured(),
        started_at: Instant::now(),
    };

    // Build router
    let app = build_router(payments_state, health_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");
    tracing::info!("Shutting down gracefully...");
}

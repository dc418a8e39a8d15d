pub mod docs;
pub mod handlers;
pub mod types;

use crate::{Result, config::Config, model, worker::InferencePool};
use axum::{
    Router,
    routing::{get, post},
};
use handlers::AppState;
use std::net::SocketAddr;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

pub async fn run(config: Config) -> Result<()> {
    // Load the model before accepting traffic
    let model_config = config.model.clone();
    let generation = config.generation.clone();
    let pipeline =
        tokio::task::spawn_blocking(move || model::load_pipeline(&model_config, &generation))
            .await
            .map_err(|e| crate::Error::internal(format!("model loader failed: {}", e)))?;

    let pool = InferencePool::from_config(&config.inference);
    let app_state = AppState {
        pipeline,
        pool: pool.clone(),
    };

    let app = router(app_state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/correct", post(handlers::correct))
        .merge(docs::openapi_routes::<AppState>())
        .layer(cors())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin, method and header, with credentials. Credentials rule out the
/// `*` wildcard, so the request's own values are echoed back.
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn shutdown_signal(pool: InferencePool) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, cancelling inference jobs");
    pool.shutdown();
}

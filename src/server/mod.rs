mod auth;
mod handlers;
mod response;

pub use response::{ResponseError, ResponseResult};

use anyhow::{Context, Result};
use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    BoxError, Router,
};
use std::{borrow::Cow, sync::Arc, time::Duration};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::catalog::CatalogClient;
use crate::config::ServerConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct AppState {
    pub client: CatalogClient,
}

/// Builds the JSON api around a catalog client.
pub fn router(client: CatalogClient, config: &ServerConfig) -> Router {
    let state = Arc::new(AppState { client });
    let admin = middleware::from_fn_with_state(state.clone(), auth::authorize);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    let v1_routes = Router::new()
        .route("/api/v1", get(handlers::health_check_handler))
        .route("/api/v1/me", get(handlers::me_handler))
        .route(
            "/api/v1/worksheets",
            get(handlers::list_worksheets_handler)
                .merge(post(handlers::create_worksheet_handler).layer(admin.clone())),
        )
        .route(
            "/api/v1/worksheets/publish",
            post(handlers::publish_handler).layer(admin.clone()),
        )
        .route("/api/v1/worksheets/stats", get(handlers::stats_handler))
        .route(
            "/api/v1/worksheets/:id",
            get(handlers::get_worksheet_handler)
                .merge(patch(handlers::update_worksheet_handler).layer(admin.clone())),
        )
        .route(
            "/api/v1/worksheets/:id/download",
            post(handlers::download_handler),
        )
        .route(
            "/api/v1/upload",
            post(handlers::upload_handler).layer(admin),
        );

    v1_routes
        .layer(DefaultBodyLimit::max(config.max_upload_mb * 1024 * 1024))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(REQUEST_TIMEOUT)
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
        .layer(cors)
}

/// Serves the api until ctrl-c or SIGTERM.
pub async fn serve(client: CatalogClient, config: &ServerConfig) -> Result<()> {
    let app = router(client, config);

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind address {}", address))?;

    log::info!("worksheet catalog listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("failed to serve listener")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                log::error!("failed to install signal handler: {}", err);
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

    log::info!("shutting down");
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Cow::from("service is overloaded, try again later"),
        );
    }

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Cow::from(format!("Unhandled internal error: {}", error)),
    )
}

// src/web.rs
use crate::config::AppConfig;
use crate::store;
use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch::Receiver as WatchReceiver;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

/// Largest accepted request body.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state for the site server.
pub struct AppState {
    /// Merged application configuration.
    pub config: Arc<AppConfig>,
    /// Resolved path of the site configuration file under the project root.
    pub site_config_path: PathBuf,
}

impl AppState {
    /// Builds the shared state, resolving the configuration file path.
    pub fn new(config: Arc<AppConfig>) -> Arc<Self> {
        let site_config_path = store::site_config_path(&config.root_dir);
        Arc::new(AppState {
            config,
            site_config_path,
        })
    }
}

/// Success acknowledgement returned after a configuration save.
#[derive(Serialize)]
struct SaveAck {
    success: bool,
    message: &'static str,
    timestamp: String,
}

/// Structured error returned when a configuration save fails.
#[derive(Serialize)]
struct SaveFailed {
    error: &'static str,
    message: String,
}

/// Rejection returned for any verb other than POST.
#[derive(Serialize)]
struct SaveRejected {
    error: &'static str,
}

/// Persists the posted JSON document as the site configuration.
///
/// The document is not validated against any schema; malformed JSON never
/// reaches this handler because the extractor rejects it first. On success
/// the on-disk file is overwritten wholesale and a timestamped
/// acknowledgement is returned.
async fn save_config(
    State(state): State<Arc<AppState>>,
    Json(document): Json<serde_json::Value>,
) -> Response {
    match store::persist(&state.site_config_path, &document).await {
        Ok(()) => {
            info!(
                "Site configuration saved to {}",
                state.site_config_path.display()
            );
            (
                StatusCode::OK,
                Json(SaveAck {
                    success: true,
                    message: "Configuration saved",
                    timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to save site configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SaveFailed {
                    error: e.category(),
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Rejects non-POST requests to the save endpoint with no side effect.
async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(SaveRejected {
            error: "Method not allowed",
        }),
    )
        .into_response()
}

/// Stamps the cache policy onto static file responses.
///
/// HTML documents are marked non-cacheable so the latest content is always
/// loaded; every other asset gets a bounded positive max-age.
async fn cache_policy(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("text/html"))
        .unwrap_or(false);
    let directive = if is_html {
        HeaderValue::from_static("no-cache")
    } else {
        match HeaderValue::from_str(&format!(
            "public, max-age={}",
            state.config.asset_max_age
        )) {
            Ok(value) => value,
            Err(_) => return response,
        }
    };
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, directive);
    response
}

/// Builds the site router: the save endpoint plus static file serving from
/// the project root.
pub fn site_router(state: Arc<AppState>) -> Router {
    let static_site = Router::new()
        .fallback_service(
            ServeDir::new(&state.config.root_dir).append_index_html_on_directories(true),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            cache_policy,
        ));

    Router::new()
        .route(
            "/api/save-config",
            post(save_config).fallback(method_not_allowed),
        )
        .fallback_service(static_site)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the site server.
///
/// - Serves static files from the project root at every path.
/// - Handles configuration saves at `POST /api/save-config`.
/// - Shuts down gracefully when the shutdown signal is triggered.
///
/// # Arguments
/// - `state`: Shared application state.
/// - `shutdown_signal`: Watch channel for graceful shutdown notification.
///
/// # Errors
/// Returns an error if the HTTP address is invalid or binding fails.
pub async fn start_server(state: Arc<AppState>, shutdown_signal: WatchReceiver<bool>) -> Result<()> {
    let socket_addr: SocketAddr = state.config.http_addr.parse()?;
    let app = site_router(state);

    info!("Site server starting on http://{}", socket_addr);

    let mut shutdown = shutdown_signal.clone();
    axum::serve(tokio::net::TcpListener::bind(socket_addr).await?, app)
        .with_graceful_shutdown(async move {
            shutdown.changed().await.ok();
            info!("Site server shutting down gracefully.");
        })
        .await?;

    info!("Site server stopped.");
    Ok(())
}

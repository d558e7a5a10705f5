//! Static file server for the build output.
//!
//! Files under the content base are served by `ServeDir`, mounted under the
//! public path. Requests it cannot answer go to a fallback that serves the
//! index document for navigation requests, so client-side routers see every
//! URL.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    handler::Handler,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use bale_config::BuildConfig;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

use crate::error::{CliError, Result};

/// What the server needs to know about the build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory files are served from.
    pub content_base: PathBuf,
    /// URL prefix the assets are mounted under, without a trailing slash.
    pub mount: String,
    /// Serve `index` for unmatched navigation requests.
    pub history_api_fallback: bool,
    /// Fallback document, relative to the content base.
    pub index: String,
}

impl ServerConfig {
    pub fn from_build_config(config: &BuildConfig) -> Self {
        Self {
            content_base: config.content_base().to_path_buf(),
            mount: mount_point(&config.output.public_path),
            history_api_fallback: config.dev_server.history_api_fallback,
            index: config.dev_server.index.clone(),
        }
    }
}

/// Absolute public paths mount the assets under that prefix; relative ones and
/// full URLs are served from the root.
fn mount_point(public_path: &str) -> String {
    if public_path.starts_with('/') && !public_path.starts_with("//") {
        public_path.trim_end_matches('/').to_string()
    } else {
        String::new()
    }
}

/// Build the router; exposed for tests.
pub fn router(config: ServerConfig) -> Router {
    let config = Arc::new(config);
    let files = ServeDir::new(&config.content_base)
        .fallback(history_fallback.with_state(Arc::clone(&config)));

    let router = if config.mount.is_empty() {
        Router::new().fallback_service(files)
    } else {
        Router::new()
            .nest_service(&config.mount, files)
            .fallback(not_found)
    };

    router.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

/// Development server bound to a listening socket.
pub struct DevServer {
    config: ServerConfig,
    listener: TcpListener,
}

impl DevServer {
    /// Bind `host:port`. Port 0 picks a free port.
    pub async fn bind(config: ServerConfig, host: &str, port: u16) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| CliError::Server(format!("Failed to bind to {}:{}: {}", host, port, e)))?;
        Ok(Self { config, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn content_base(&self) -> &Path {
        &self.config.content_base
    }

    /// Serve until Ctrl+C.
    pub async fn run(self) -> Result<()> {
        let app = router(self.config);
        axum::serve(self.listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await
            .map_err(|e| CliError::Server(format!("Server error: {}", e)))
    }
}

/// Called by `ServeDir` for paths it has no file for.
async fn history_fallback(State(config): State<Arc<ServerConfig>>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    if !(config.history_api_fallback && is_navigation(request.headers(), &path)) {
        return not_found(request).await;
    }

    tracing::debug!(path, index = %config.index, "history fallback");
    let index = config.content_base.join(&config.index);
    match ServeFile::new(index).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

async fn not_found(request: Request) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("File not found: {}", request.uri().path()),
    )
        .into_response()
}

/// A request a browser makes when the user navigates: it accepts HTML and
/// the last path segment does not look like a file name.
fn is_navigation(headers: &HeaderMap, path: &str) -> bool {
    let accepts_html = match headers.get(header::ACCEPT) {
        None => true,
        Some(value) => value
            .to_str()
            .map(|accept| accept.contains("text/html") || accept.contains("*/*"))
            .unwrap_or(false),
    };
    let last_segment = path.rsplit('/').next().unwrap_or_default();

    accepts_html && !last_segment.contains('.')
}

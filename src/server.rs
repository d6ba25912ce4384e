//! Static file server for local development.
//!
//! Serves a directory over HTTP: `/` and directory paths map to their
//! `index.html`, content types come from the file extension, and missing
//! files or paths escaping the root get an HTML 404 page.

use std::future::Future;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use crate::error::{FpError, Result};

/// Port used when neither `--port` nor `PORT` is given.
pub const DEFAULT_PORT: u16 = 8080;
/// File served for `/` and for directory paths.
pub const INDEX_FILE: &str = "index.html";

/// Where and what to serve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub root: PathBuf,
    pub port: u16,
    pub bind: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            port: DEFAULT_PORT,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    /// URL a browser on this machine can open.
    #[must_use]
    pub fn url(&self) -> String {
        let host = if self.bind.is_unspecified() {
            "localhost".to_string()
        } else {
            self.addr().ip().to_string()
        };
        format!("http://{host}:{}", self.port)
    }
}

/// Router serving `root`.
pub fn router(root: impl Into<PathBuf>) -> Router {
    let root = Arc::new(root.into());
    Router::new()
        .route("/", get(serve_index))
        .route("/{*path}", get(serve_path))
        .with_state(root)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until `shutdown` resolves.
#[instrument(skip(shutdown), fields(addr = %config.addr(), root = %config.root.display()))]
pub async fn serve<F>(config: &ServerConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if !config.root.is_dir() {
        return Err(FpError::WebServerFailed {
            addr: config.addr().to_string(),
            reason: format!("root {} is not a directory", config.root.display()),
        });
    }

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .map_err(|e| FpError::WebServerFailed {
            addr: config.addr().to_string(),
            reason: e.to_string(),
        })?;
    info!(url = %config.url(), "Static server listening");

    axum::serve(listener, router(config.root.clone()))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| FpError::WebServerFailed {
            addr: config.addr().to_string(),
            reason: e.to_string(),
        })?;
    info!("Static server stopped");
    Ok(())
}

async fn serve_index(State(root): State<Arc<PathBuf>>) -> Response {
    serve_file(&root.join(INDEX_FILE), "/").await
}

async fn serve_path(State(root): State<Arc<PathBuf>>, UrlPath(path): UrlPath<String>) -> Response {
    let Some(mut file) = resolve(&root, &path) else {
        warn!(path, "Rejected path outside root");
        return not_found(&path);
    };
    if file.is_dir() {
        file.push(INDEX_FILE);
    }
    serve_file(&file, &path).await
}

/// Map a decoded URL path onto `root`, refusing anything that could leave it.
fn resolve(root: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = Path::new(url_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }
    let candidate = root.join(relative);

    // Symlinks may still point outside; compare canonical forms when the file exists.
    if let (Ok(real_root), Ok(real)) = (root.canonicalize(), candidate.canonicalize()) {
        if !real.starts_with(&real_root) {
            return None;
        }
    }
    Some(candidate)
}

async fn serve_file(path: &Path, url_path: &str) -> Response {
    match tokio::fs::read(path).await {
        Ok(contents) => {
            debug!(path = %path.display(), len = contents.len(), "Serving file");
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime_type(path))
                .header(header::CACHE_CONTROL, "no-cache")
                .body(Body::from(contents))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            debug!(path = %path.display(), "File not found");
            not_found(url_path)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Error reading file");
            server_error(&e.to_string())
        }
    }
}

/// Content type for a file, by extension.
#[must_use]
pub fn mime_type(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8".to_string(),
        Some("js" | "mjs") => "text/javascript".to_string(),
        Some("css") => "text/css".to_string(),
        Some("json") => "application/json".to_string(),
        Some("png") => "image/png".to_string(),
        Some("jpg" | "jpeg") => "image/jpeg".to_string(),
        Some("gif") => "image/gif".to_string(),
        Some("svg") => "image/svg+xml".to_string(),
        Some("ico") => "image/x-icon".to_string(),
        Some("woff") => "font/woff".to_string(),
        Some("woff2") => "font/woff2".to_string(),
        Some("ttf") => "font/ttf".to_string(),
        Some("pdf") => "application/pdf".to_string(),
        Some("wasm") => "application/wasm".to_string(),
        _ => mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string(),
    }
}

fn not_found(url_path: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html><head><title>404 Not Found</title></head>\
         <body><h1>404 Not Found</h1><p>The requested path /{} was not found.</p></body></html>\n",
        escape_html(url_path.trim_start_matches('/'))
    );
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

fn server_error(message: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<html><head><title>500 Internal Server Error</title></head>\
         <body><h1>500 Internal Server Error</h1><p>{}</p></body></html>\n",
        escape_html(message)
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

//! # Repository File Routes
//!
//! Every path below the context path is a repository path.
//!
//! | Method       | Target                 | Response                              |
//! |--------------|------------------------|---------------------------------------|
//! | `GET`/`HEAD` | file                   | 200, body streamed                    |
//! | `GET`/`HEAD` | directory, no slash    | 302 to `…/`                           |
//! | `GET`/`HEAD` | directory, with slash  | 200, HTML index                       |
//! | `PUT`        | file                   | 200, or 405 when the store refuses    |
//! | `PUT`        | path ending in `/`     | 405                                   |
//! | other        | anything               | 405                                   |

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};

use depot_core::time;
use depot_vfs::{Entry, VfsPath};

use crate::error::AppError;
use crate::listing::{self, IndexRow};
use crate::routes::settings;
use crate::state::AppState;

/// Fallback handler for every request outside the health checks.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Result<Response, AppError> {
    let full_path = request.uri().path().to_string();
    let Some(path) = state.strip_context(&full_path).map(str::to_string) else {
        return Err(AppError::NotFound(full_path));
    };

    let method = request.method().clone();
    if method == Method::GET && settings::is_settings_path(&path) {
        return Ok(settings::document(&state, request.headers()));
    }

    match method {
        Method::GET | Method::HEAD => read(&state, &full_path, &path, method == Method::HEAD).await,
        Method::PUT => write(&state, &path, request).await,
        other => Err(AppError::MethodNotAllowed(format!("{other} {full_path}"))),
    }
}

// -- GET / HEAD ---------------------------------------------------------------

async fn read(state: &AppState, full_path: &str, path: &str, head: bool) -> Result<Response, AppError> {
    let vpath = VfsPath::parse(path)?;
    let entry = state.fs.lookup(&vpath).await?;

    match entry {
        Entry::Directory(_) if !full_path.ends_with('/') => {
            let location = format!("{full_path}/");
            Ok((
                StatusCode::FOUND,
                [(header::LOCATION, header_value(&location)?)],
            )
                .into_response())
        }
        Entry::Directory(dir) => {
            let page = index_page(state, &dir).await;
            let mut response = (
                [(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"))],
                page,
            )
                .into_response();
            if head {
                *response.body_mut() = Body::empty();
            }
            Ok(response)
        }
        file if head => {
            let stat = state.fs.stat(&file).await?;
            file_response(&file, stat.size.unwrap_or(0), stat.last_modified, Body::empty())
        }
        file => {
            let content = state.fs.open(&file).await?;
            let body = Body::from_stream(ReaderStream::new(content.reader));
            file_response(&file, content.size, content.last_modified, body)
        }
    }
}

fn file_response(
    entry: &Entry,
    size: u64,
    last_modified: DateTime<Utc>,
    body: Body,
) -> Result<Response, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(entry.name()))
        .header(header::CONTENT_LENGTH, size)
        .header(header::LAST_MODIFIED, time::format_http_date(last_modified))
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))
}

async fn index_page(state: &AppState, dir: &VfsPath) -> String {
    let mut rows = Vec::new();
    for entry in state.fs.list(dir).await {
        let stat = match state.fs.stat(&entry).await {
            Ok(stat) => Some(stat),
            Err(e) => {
                tracing::debug!(path = %entry.path(), error = %e, "stat failed in index");
                None
            }
        };
        rows.push(IndexRow { entry, stat });
    }
    let title = if dir.is_root() {
        format!("{}/", state.context_prefix())
    } else {
        format!("{}{}/", state.context_prefix(), dir)
    };
    listing::render(&title, !dir.is_root(), &rows, time::now())
}

/// `Content-Type` by file extension.
pub fn content_type(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "xml" | "pom" => "application/xml",
        "jar" | "war" | "ear" | "zip" => "application/java-archive",
        "md5" | "sha1" | "sha256" | "asc" | "txt" => "text/plain",
        "html" => "text/html",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

fn header_value(s: &str) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(s).map_err(|_| AppError::BadRequest(format!("unrepresentable path {s}")))
}

// -- PUT ----------------------------------------------------------------------

async fn write(state: &AppState, path: &str, request: Request) -> Result<Response, AppError> {
    if path.ends_with('/') {
        return Err(AppError::MethodNotAllowed(format!("PUT to directory {path}")));
    }
    let vpath = VfsPath::parse(path)?;
    let Some(dir) = vpath.parent() else {
        return Err(AppError::MethodNotAllowed("PUT to the repository root".into()));
    };
    let name = vpath.name().to_string();

    let stream = request
        .into_body()
        .into_data_stream()
        .map_err(std::io::Error::other);
    let reader = StreamReader::new(Box::pin(stream));

    state.fs.put(&dir, &name, Box::new(reader)).await?;
    tracing::info!(path = %vpath, "stored upload");
    Ok(StatusCode::OK.into_response())
}

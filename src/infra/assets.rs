//! Static assets compiled into the binary.

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::Mime;

use crate::application::error::ErrorReport;

static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Serve one file out of the embedded `static/` tree.
pub async fn serve_static(path: Option<Path<String>>) -> Response {
    let requested = path.map(|Path(value)| value).unwrap_or_default();
    let candidate = requested.trim_start_matches('/');

    // Avoid directory traversal and disallow directory listings.
    if candidate.is_empty() || candidate.ends_with('/') || candidate.contains("..") {
        return not_found_response();
    }

    match STATIC_ASSETS.get_file(candidate) {
        Some(file) => asset_response(
            Bytes::from_static(file.contents()),
            mime_guess::from_path(candidate).first_or_octet_stream(),
        ),
        None => not_found_response(),
    }
}

fn not_found_response() -> Response {
    let mut response = StatusCode::NOT_FOUND.into_response();
    ErrorReport::from_message("infra::assets::serve_static", "Static asset not found")
        .attach(&mut response);
    response
}

// Asset names carry no content hash, so the cache lifetime stays short.
fn asset_response(bytes: Bytes, mime: Mime) -> Response {
    let len = bytes.len();
    let mut response = Response::new(Body::from(bytes));

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(header::CONTENT_LENGTH, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    response
}

use std::{io::ErrorKind, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use metrics::counter;
use time::OffsetDateTime;
use tracing::error;

use crate::{
    application::{
        error::{ErrorReport, HttpError},
        gallery::DailyGallery,
    },
    infra::library::{PhotoLibrary, PhotoLibraryError},
    presentation::views::{
        GalleryEntryView, GalleryTemplate, IndexTemplate, PhotoTemplate, render_not_found_response,
        render_template_response,
    },
};

use super::{library_health_response, middleware::observe_requests};

const METRIC_PAGE_TOKEN_MISS_TOTAL: &str = "scatto_page_token_miss_total";
const METRIC_PHOTO_REJECT_TOTAL: &str = "scatto_photo_reject_total";

#[derive(Clone)]
pub struct HttpState {
    pub gallery: Arc<DailyGallery>,
    pub library: Arc<PhotoLibrary>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/main", get(gallery_index))
        .route("/page/{token}", get(photo_page))
        .route("/img/{category}/{filename}", get(serve_photo))
        .route("/_health", get(health))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .with_state(state)
        .layer(middleware::from_fn(observe_requests))
}

async fn index() -> Response {
    render_template_response(IndexTemplate, StatusCode::OK)
}

/// The daily listing. Every request revalidates the generation: the first
/// hit after midnight rotates, and an empty day retries the library.
async fn gallery_index(State(state): State<HttpState>) -> Response {
    let day = state.gallery.ensure_fresh(OffsetDateTime::now_utc()).await;

    let entries = day
        .entries()
        .into_iter()
        .map(|entry| GalleryEntryView {
            label: entry.slot.to_string(),
            page_href: format!("/page/{}", entry.token),
            image_src: format!("/img/{}/{}", entry.category, entry.filename),
        })
        .collect();

    render_template_response(
        GalleryTemplate {
            date: day.date().to_string(),
            day_index: day.day_index(),
            entries,
        },
        StatusCode::OK,
    )
}

async fn photo_page(State(state): State<HttpState>, Path(token): Path<String>) -> Response {
    let day = state.gallery.ensure_fresh(OffsetDateTime::now_utc()).await;

    match day.photo_for_token(&token) {
        Some((slot, photo)) => render_template_response(
            PhotoTemplate {
                label: slot.to_string(),
                image_src: format!("/img/{}/{}", photo.category, photo.filename),
            },
            StatusCode::OK,
        ),
        None => {
            counter!(METRIC_PAGE_TOKEN_MISS_TOTAL).increment(1);
            let mut response = render_not_found_response();
            ErrorReport::from_message("infra::http::public::photo_page", "Unknown photo token")
                .attach(&mut response);
            response
        }
    }
}

async fn serve_photo(
    State(state): State<HttpState>,
    Path((category, filename)): Path<(String, String)>,
) -> Response {
    const SOURCE: &str = "infra::http::public::serve_photo";

    let day = state.gallery.ensure_fresh(OffsetDateTime::now_utc()).await;
    if !day.is_current_photo(&category, &filename) {
        counter!(METRIC_PHOTO_REJECT_TOTAL).increment(1);
        return HttpError::new(
            SOURCE,
            StatusCode::FORBIDDEN,
            "Photo not available",
            "Requested file is not part of the current day",
        )
        .into_response();
    }

    match state.library.read(&category, &filename).await {
        Ok(bytes) => build_photo_response(&filename, bytes),
        Err(PhotoLibraryError::InvalidPath) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Photo not found",
            "The requested photo is not available",
        )
        .into_response(),
        Err(PhotoLibraryError::Io(err)) if err.kind() == ErrorKind::NotFound => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Photo not found",
            "The requested photo is not available",
        )
        .into_response(),
        Err(err) => {
            error!(
                target = SOURCE,
                category = %category,
                filename = %filename,
                error = %err,
                "failed to read photo from library"
            );
            HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read photo",
                &err,
            )
            .into_response()
        }
    }
}

async fn health(State(state): State<HttpState>) -> Response {
    library_health_response(state.library.health_check().await)
}

/// Daily links expire at midnight; the bytes go out uncacheable.
fn build_photo_response(filename: &str, bytes: Bytes) -> Response {
    let len = bytes.len();
    let mime = mime_guess::from_path(filename).first_or_octet_stream();
    let mut response = Response::new(Body::from(bytes));

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("private, no-store"));

    response
}

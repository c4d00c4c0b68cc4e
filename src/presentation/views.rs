use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

/// An askama render failure, tagged with the code site that triggered it.
#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        HttpError::from_error(
            err.source,
            StatusCode::INTERNAL_SERVER_ERROR,
            err.public_message,
            &err.error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|error| {
        TemplateRenderError {
            source: "presentation::views::render_template",
            public_message: "Template rendering failed",
            error,
        }
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    render_template(template)
        .map_or_else(IntoResponse::into_response, |html| {
            (status, html).into_response()
        })
}

/// The branded 404 page, served when a photo page token misses.
pub fn render_not_found_response() -> Response {
    let mut response = render_template_response(
        ErrorTemplate {
            status: 404,
            message: "Page not found",
        },
        StatusCode::NOT_FOUND,
    );
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Landing page with the link into the daily listing.
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate;

/// One card on the daily listing.
pub struct GalleryEntryView {
    pub label: String,
    pub page_href: String,
    pub image_src: String,
}

#[derive(Template)]
#[template(path = "gallery.html")]
pub struct GalleryTemplate {
    pub date: String,
    pub day_index: Option<u32>,
    pub entries: Vec<GalleryEntryView>,
}

#[derive(Template)]
#[template(path = "photo.html")]
pub struct PhotoTemplate {
    pub label: String,
    pub image_src: String,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub message: &'static str,
}

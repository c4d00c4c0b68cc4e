use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono_tz::Tz;
use http_body_util::BodyExt;
use scatto::application::catalog::PhotoCatalog;
use scatto::application::gallery::DailyGallery;
use scatto::domain::rotation::RotationSchedule;
use scatto::infra::http::{HttpState, build_router};
use scatto::infra::library::PhotoLibrary;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;

const CATEGORIES: [&str; 2] = ["category1", "category2"];

/// Seed a complete slot set for one cycle day. Tests seed days one and two so
/// a date change in the middle of a run still finds a full day.
fn seed_day(root: &Path, day: u32) {
    for (position, category) in CATEGORIES.iter().enumerate() {
        let ordinal = position + 1;
        let dir = root.join(category);
        std::fs::create_dir_all(&dir).expect("category dir");
        for picture in 1..=2 {
            let name = format!("pic{day}(cat{ordinal}-pic{picture}).jpg");
            let payload = format!("jpeg:{category}:{name}");
            std::fs::write(dir.join(name), payload).expect("photo file");
        }
    }
}

fn build_app(root: &Path) -> (Router, Arc<DailyGallery>) {
    let library = Arc::new(PhotoLibrary::new(root.to_path_buf()).expect("library root"));
    let schedule = RotationSchedule::new(OffsetDateTime::now_utc().date(), 730)
        .expect("schedule starting today");

    let catalog: Arc<dyn PhotoCatalog> = library.clone();
    let gallery = Arc::new(DailyGallery::new(
        schedule,
        CATEGORIES.iter().map(|name| name.to_string()).collect(),
        Tz::UTC,
        catalog,
    ));

    let router = build_router(HttpState {
        gallery: Arc::clone(&gallery),
        library,
    });
    (router, gallery)
}

fn seeded_app() -> (TempDir, Router, Arc<DailyGallery>) {
    let dir = TempDir::new().expect("temp dir");
    seed_day(dir.path(), 1);
    seed_day(dir.path(), 2);
    let (router, gallery) = build_app(dir.path());
    (dir, router, gallery)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.expect("collect body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

#[tokio::test]
async fn daily_listing_shows_every_slot() {
    let (_dir, app, gallery) = seeded_app();
    let day = gallery.ensure_fresh(OffsetDateTime::now_utc()).await;

    let response = app
        .oneshot(get("/main"))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_to_string(response.into_body()).await;
    assert_eq!(html.matches("photo-card").count(), 4);

    let entries = day.entries();
    assert_eq!(entries.len(), 4);
    for entry in &entries {
        assert!(html.contains(&format!("/page/{}", entry.token)));
        assert!(html.contains(&format!("/img/{}/{}", entry.category, entry.filename)));
    }
}

#[tokio::test]
async fn minted_token_serves_the_photo_page() {
    let (_dir, app, gallery) = seeded_app();
    let day = gallery.ensure_fresh(OffsetDateTime::now_utc()).await;
    let entry = &day.entries()[0];

    let response = app
        .oneshot(get(&format!("/page/{}", entry.token)))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_to_string(response.into_body()).await;
    assert!(html.contains(&format!("/img/{}/{}", entry.category, entry.filename)));
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let (_dir, app, _gallery) = seeded_app();

    let response = app
        .oneshot(get("/page/AAAAAAAAAAAAAAAAAAAAAA"))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let html = body_to_string(response.into_body()).await;
    assert!(html.contains("Page not found"));
}

#[tokio::test]
async fn current_photo_streams_uncacheable_bytes() {
    let (dir, app, gallery) = seeded_app();
    let day = gallery.ensure_fresh(OffsetDateTime::now_utc()).await;
    let entry = &day.entries()[0];

    let response = app
        .oneshot(get(&format!("/img/{}/{}", entry.category, entry.filename)))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("image/jpeg")
    );
    assert_eq!(
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok()),
        Some("private, no-store")
    );

    let expected = std::fs::read(dir.path().join(&entry.category).join(&entry.filename))
        .expect("seeded photo bytes");
    let body = body_to_string(response.into_body()).await;
    assert_eq!(body.as_bytes(), expected.as_slice());
}

#[tokio::test]
async fn on_disk_file_outside_the_day_is_refused() {
    let (dir, app, _gallery) = seeded_app();
    std::fs::write(dir.path().join("category1").join("vault.jpg"), b"secret")
        .expect("stray file");

    let response = app
        .oneshot(get("/img/category1/vault.jpg"))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn encoded_traversal_is_refused_before_any_read() {
    let (_dir, app, _gallery) = seeded_app();

    let response = app
        .oneshot(get("/img/%2E%2E/secret.jpg"))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn incomplete_library_serves_an_empty_day() {
    let dir = TempDir::new().expect("temp dir");
    let category1 = dir.path().join("category1");
    std::fs::create_dir_all(&category1).expect("category dir");
    std::fs::write(category1.join("pic1(cat1-pic1).jpg"), b"lonely").expect("photo file");
    let (app, _gallery) = build_app(dir.path());

    let listing = app
        .clone()
        .oneshot(get("/main"))
        .await
        .expect("router should respond");
    assert_eq!(listing.status(), StatusCode::OK);
    let html = body_to_string(listing.into_body()).await;
    assert!(html.contains("No photos today"));

    let photo = app
        .oneshot(get("/img/category1/pic1(cat1-pic1).jpg"))
        .await
        .expect("router should respond");
    assert_eq!(photo.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_endpoint_reports_no_content() {
    let (_dir, app, _gallery) = seeded_app();

    let response = app
        .oneshot(get("/_health"))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn stylesheet_is_served_from_the_binary() {
    let (_dir, app, _gallery) = seeded_app();

    let response = app
        .oneshot(get("/static/styles.css"))
        .await
        .expect("router should respond");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("text/css")
    );
    assert!(
        response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("max-age"))
    );
}

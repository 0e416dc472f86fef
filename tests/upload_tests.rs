mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use pharma_assure_backend::model::user::Role;
use serde_json::Value;

use common::TestApp;

const BOUNDARY: &str = "pharma-assure-test-boundary";

struct Part<'a> {
    field: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    bytes: Vec<u8>,
}

impl<'a> Part<'a> {
    fn new(field: &'a str, file_name: &'a str, content_type: &'a str, len: usize) -> Self {
        Part { field, file_name, content_type, bytes: vec![0x42; len] }
    }
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.field, part.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
        body.extend_from_slice(&part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn upload(app: &TestApp, uri: &str, token: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.send_request(request).await
}

#[tokio::test]
async fn test_single_upload_stores_object() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Warehouse", Role::Warehouse).await;

    let (status, body) = upload(&app, "/api/upload/single", &token, &[Part::new("file", "label.png", "image/png", 512)]).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["size"], 512);
    assert_eq!(body["originalName"], "label.png");
    let public_id = body["publicId"].as_str().unwrap();
    assert!(public_id.ends_with(".png"));
    assert_eq!(body["url"], format!("http://files.test/pharma-assure/{}", public_id));

    let objects = app.store.objects.lock().unwrap();
    let (bytes, content_type) = objects.get(public_id).unwrap();
    assert_eq!(bytes.len(), 512);
    assert_eq!(content_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_single_upload_rejections() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Pharmacist", Role::Pharmacist).await;

    let (status, _) = upload(&app, "/api/upload/single", &token, &[Part::new("file", "page.html", "text/html", 10)]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Above the per-file limit but inside the body limit
    let (status, body) = upload(&app, "/api/upload/single", &token, &[Part::new("file", "big.png", "image/png", 2048)]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "PayloadTooLarge");

    // Above the body limit itself
    let (status, _) = upload(&app, "/api/upload/single", &token, &[Part::new("file", "huge.png", "image/png", 100_000)]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let (status, _) = upload(&app, "/api/upload/single", &token, &[Part::new("other", "label.png", "image/png", 10)]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.store.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_multiple_upload_respects_file_count() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Warehouse", Role::Warehouse).await;

    let parts = [
        Part::new("files", "a.jpg", "image/jpeg", 100),
        Part::new("files", "b.pdf", "application/pdf", 200),
    ];
    let (status, body) = upload(&app, "/api/upload/multiple", &token, &parts).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files[1]["publicId"].as_str().unwrap().ends_with(".pdf"));

    let parts: Vec<Part> = (0..4).map(|_| Part::new("files", "x.png", "image/png", 10)).collect();
    let (status, _) = upload(&app, "/api/upload/multiple", &token, &parts).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // One bad file refuses the whole batch
    let parts = [
        Part::new("files", "ok.png", "image/png", 10),
        Part::new("files", "bad.exe", "application/x-msdownload", 10),
    ];
    let (status, _) = upload(&app, "/api/upload/multiple", &token, &parts).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.objects.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_upload() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Warehouse", Role::Warehouse).await;
    let (_, body) = upload(&app, "/api/upload/single", &token, &[Part::new("file", "label.png", "image/png", 10)]).await;
    let uri = format!("/api/upload/{}", body["publicId"].as_str().unwrap());

    let (status, body) = app.send("DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "File deleted successfully");
    assert!(app.store.objects.lock().unwrap().is_empty());

    let (status, _) = app.send("DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send("DELETE", "/api/upload/..hidden", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_drivers_cannot_upload() {
    let app = TestApp::new();
    let (_, token) = app.seed_user("Driver", Role::Driver).await;
    let (status, _) = upload(&app, "/api/upload/single", &token, &[Part::new("file", "label.png", "image/png", 10)]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", "/api/upload/pharma-assure-1.png", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chunkstore_backend::config::StorageConfig;
use chunkstore_backend::services::naming::SessionNamer;
use chunkstore_backend::services::storage::StorageService;
use chunkstore_backend::{AppState, create_app};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

pub const BOUNDARY: &str = "---------------------------123456789012345678901234567";

pub async fn test_app(root: &Path) -> Router {
    let config = StorageConfig::rooted_at(root);
    let storage = Arc::new(StorageService::new(&config).await.unwrap());
    let namer = Arc::new(SessionNamer::new());
    create_app(AppState {
        storage,
        namer,
        config,
    })
}

pub fn text_part(name: &str, value: &str) -> Vec<u8> {
    format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
        .into_bytes()
}

pub fn file_part(name: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut part = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    part.extend_from_slice(bytes);
    part.extend_from_slice(b"\r\n");
    part
}

pub fn close_delimiter() -> Vec<u8> {
    format!("--{BOUNDARY}--\r\n").into_bytes()
}

pub async fn post_raw(app: &Router, uri: &str, content_type: &str, body: Vec<u8>) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("Content-Type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn post_multipart(app: &Router, uri: &str, body: Vec<u8>) -> Value {
    post_raw(
        app,
        uri,
        &format!("multipart/form-data; boundary={BOUNDARY}"),
        body,
    )
    .await
}

pub async fn start_session(app: &Router, name: &str, size: usize, hash: &str) -> Value {
    let mut body = text_part("name", name);
    body.extend(text_part("size", &size.to_string()));
    body.extend(text_part("hash", hash));
    body.extend(close_delimiter());
    post_multipart(app, "/apis/v1/upload/chunked/start", body).await
}

pub async fn upload_chunk(app: &Router, destname: &str, offset: usize, bytes: &[u8]) -> Value {
    let mut body = text_part("destname", destname);
    body.extend(text_part("start", &offset.to_string()));
    body.extend(file_part("file", "chunk.bin", bytes));
    body.extend(close_delimiter());
    post_multipart(app, "/apis/v1/upload/chunked/upload", body).await
}

pub async fn end_session(
    app: &Router,
    name: &str,
    size: usize,
    hash: &str,
    destname: &str,
) -> Value {
    let mut body = text_part("name", name);
    body.extend(text_part("size", &size.to_string()));
    body.extend(text_part("hash", hash));
    body.extend(text_part("destname", destname));
    body.extend(close_delimiter());
    post_multipart(app, "/apis/v1/upload/chunked/end", body).await
}

pub async fn fetch_store(app: &Router, url: &str) -> Vec<u8> {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

//! Shared helpers for integration tests: a fake removal service and sample images

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// API key the `RequireKey` mode accepts
pub const VALID_API_KEY: &str = "secret";

/// How the fake service answers
#[derive(Debug, Clone, Copy)]
pub enum ServiceMode {
    /// `{"data": {"result_b64": ...}}`
    JsonNested,
    /// `{"result_b64": ...}`
    JsonTopLevel,
    /// Raw `image/png` body
    RawPng,
    /// Success without an image
    Empty,
    /// Error status with a short text body
    Error(u16),
    /// 401 unless `X-Api-Key` matches [`VALID_API_KEY`]
    RequireKey,
    /// Answer after the given delay
    Slow(Duration),
}

/// A request as the fake service received it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub body: Value,
    pub api_key: Option<String>,
}

impl RecordedRequest {
    /// Decoded `image_file_b64` upload, if present
    pub fn uploaded_bytes(&self) -> Option<Vec<u8>> {
        self.body
            .get("image_file_b64")
            .and_then(Value::as_str)
            .map(|b64| general_purpose::STANDARD.decode(b64).unwrap())
    }
}

#[derive(Clone)]
struct ServiceState {
    mode: ServiceMode,
    cutout_png: Arc<Vec<u8>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Removal service listening on an ephemeral localhost port
pub struct FakeRemovalService {
    pub endpoint: String,
    /// PNG bytes every successful response carries
    pub cutout_png: Vec<u8>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    server: JoinHandle<()>,
}

impl FakeRemovalService {
    pub async fn start(mode: ServiceMode) -> Self {
        let cutout_png = sample_png(8, 6);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServiceState {
            mode,
            cutout_png: Arc::new(cutout_png.clone()),
            requests: requests.clone(),
        };

        let app = Router::new()
            .route("/v1/remove", post(remove_background))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("http://{}/v1/remove", addr),
            cutout_png,
            requests,
            server,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeRemovalService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn remove_background(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().unwrap().push(RecordedRequest {
        body,
        api_key: api_key.clone(),
    });

    let b64 = general_purpose::STANDARD.encode(state.cutout_png.as_slice());
    match state.mode {
        ServiceMode::JsonNested => Json(json!({ "data": { "result_b64": b64 } })).into_response(),
        ServiceMode::JsonTopLevel => Json(json!({ "result_b64": b64 })).into_response(),
        ServiceMode::RawPng => (
            [(header::CONTENT_TYPE, "image/png")],
            state.cutout_png.as_ref().clone(),
        )
            .into_response(),
        ServiceMode::Empty => Json(json!({ "data": {} })).into_response(),
        ServiceMode::Error(code) => (
            StatusCode::from_u16(code).unwrap(),
            "model overloaded, try later",
        )
            .into_response(),
        ServiceMode::RequireKey => {
            if api_key.as_deref() == Some(VALID_API_KEY) {
                Json(json!({ "data": { "result_b64": b64 } })).into_response()
            } else {
                StatusCode::UNAUTHORIZED.into_response()
            }
        },
        ServiceMode::Slow(delay) => {
            tokio::time::sleep(delay).await;
            Json(json!({ "data": { "result_b64": b64 } })).into_response()
        },
    }
}

/// Encode a small gradient image as PNG
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut img = RgbaImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels_mut() {
        *pixel = Rgba([(x * 20) as u8, (y * 30) as u8, 90, 255]);
    }
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// Write a photo the picker can select
pub fn write_sample_photo(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, sample_png(32, 24)).unwrap();
    path
}

/// An endpoint on a port nothing listens on
pub async fn closed_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/v1/remove", addr)
}

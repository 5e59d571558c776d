//! Render API: the request/response boundary between the server-side
//! capture phase and the client-side encode/publish phase.

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::encode::FrameEncoder;
use crate::frame::FrameSequence;
use crate::publish::{PublishedResult, Publisher};
use crate::template::FRAME_COUNT;
use crate::worker::RenderWorker;
use crate::{Error, Result};

/// Path the render endpoint is served under.
pub const RENDER_PATH: &str = "/api/generate-frames";

/// Path of the one-shot endpoint: capture, encode and publish server-side.
pub const GIF_PATH: &str = "/api/generate-gif";

/// Path of the liveness endpoint.
pub const HEALTH_PATH: &str = "/api/health";

/// Headers attached to every response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "Content-Type"),
    ("Access-Control-Allow-Methods", "POST, OPTIONS"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub text: Option<String>,
}

/// Success body: four PNG data URIs in variant order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResponse {
    pub success: bool,
    pub frames: Vec<String>,
    pub frame_count: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Success body of [`GIF_PATH`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GifResponse {
    pub success: bool,
    #[serde(flatten)]
    pub published: PublishedResult,
    pub frame_count: usize,
    pub delay_ms: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub frame_count: usize,
}

/// A response ready to be written by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_string(value)
            .unwrap_or_else(|_| r#"{"success":false,"error":"serialization failed"}"#.to_string());
        Self { status, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, &ErrorResponse { success: false, error: message.into() })
    }
}

// The request text, or the response that ends the call early.
fn request_text(method: &str, body: &str) -> std::result::Result<String, ApiResponse> {
    match method.to_ascii_uppercase().as_str() {
        "OPTIONS" => return Err(ApiResponse { status: 200, body: String::new() }),
        "POST" => {}
        _ => return Err(ApiResponse::error(405, "Method Not Allowed")),
    }

    let request: RenderRequest = serde_json::from_str(body)
        .map_err(|e| ApiResponse::error(400, format!("Invalid request body: {}", e)))?;

    match request.text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(ApiResponse::error(400, "text must not be empty")),
    }
}

fn failure(context: &str, err: Error) -> ApiResponse {
    error!("{}: {}", context, err);
    ApiResponse::error(err.status_code(), format!("{}: {}", context, err))
}

/// Handle one call to the render endpoint.
pub async fn handle(method: &str, body: &str, worker: &RenderWorker) -> ApiResponse {
    let text = match request_text(method, body) {
        Ok(t) => t,
        Err(res) => return res,
    };

    info!("Render request ({} chars)", text.chars().count());
    match worker.capture(text).await {
        Ok(frames) => ApiResponse::json(
            200,
            &RenderResponse {
                success: true,
                frame_count: frames.len(),
                frames: frames.to_data_uris(),
                message: "frames generated".to_string(),
            },
        ),
        Err(e) => failure("Frame generation failed", e),
    }
}

/// Encoder and publisher behind [`GIF_PATH`].
#[derive(Clone)]
pub struct GifBackend {
    encoder: FrameEncoder,
    publisher: Arc<Publisher>,
}

impl GifBackend {
    pub fn new(encoder: FrameEncoder, publisher: Publisher) -> Self {
        Self { encoder, publisher: Arc::new(publisher) }
    }

    // Blocking: encodes and uploads on the calling thread.
    fn encode_and_publish(&self, frames: &FrameSequence) -> Result<GifResponse> {
        let artifact = self.encoder.encode(frames, |_| {})?;
        let published = self.publisher.publish(&artifact)?;
        Ok(GifResponse {
            success: true,
            published,
            frame_count: artifact.frame_count(),
            delay_ms: artifact.delay_ms(),
        })
    }
}

/// Handle one call to the one-shot GIF endpoint. Answers 503 when the
/// server has no object store configured.
pub async fn handle_gif(method: &str, body: &str, worker: &RenderWorker, backend: Option<&GifBackend>) -> ApiResponse {
    let text = match request_text(method, body) {
        Ok(t) => t,
        Err(res) => return res,
    };
    let backend = match backend {
        Some(b) => b.clone(),
        None => return ApiResponse::error(503, "object store not configured"),
    };

    info!("GIF request ({} chars)", text.chars().count());
    let frames = match worker.capture(text).await {
        Ok(frames) => frames,
        Err(e) => return failure("GIF generation failed", e),
    };

    match tokio::task::spawn_blocking(move || backend.encode_and_publish(&frames)).await {
        Ok(Ok(res)) => ApiResponse::json(200, &res),
        Ok(Err(e)) => failure("GIF generation failed", e),
        Err(e) => ApiResponse::error(500, format!("GIF generation failed: {}", e)),
    }
}

/// Liveness body for [`HEALTH_PATH`].
pub fn health() -> ApiResponse {
    ApiResponse::json(
        200,
        &HealthResponse {
            status: "OK".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            frame_count: FRAME_COUNT,
        },
    )
}

/// Blocking client for the render API.
pub struct RenderClient {
    client: Client,
    endpoint: String,
}

impl RenderClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        url::Url::parse(&endpoint)
            .map_err(|e| Error::ConfigError(format!("invalid render API URL `{}`: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the render API for the four frames of `text`.
    pub fn request_frames(&self, text: &str) -> Result<FrameSequence> {
        let res = self
            .client
            .post(&self.endpoint)
            .json(&RenderRequest { text: Some(text.to_string()) })
            .send()
            .map_err(|e| Error::RenderApi { status: 503, message: format!("render API unreachable: {}", e) })?;

        let status = res.status();
        let body = res
            .text()
            .map_err(|e| Error::RenderApi { status: status.as_u16(), message: format!("unreadable body: {}", e) })?;

        if !status.is_success() {
            let message = remote_error_message(&body)
                .unwrap_or_else(|| format!("server error ({})", status.as_u16()));
            warn!("Render API answered {}: {}", status, message);
            return Err(match status.as_u16() {
                400 => Error::InvalidInput(message),
                code => Error::RenderApi { status: code, message },
            });
        }

        if body.trim().is_empty() {
            return Err(Error::RenderApi { status: status.as_u16(), message: "empty response".into() });
        }

        let parsed: RenderResponse = serde_json::from_str(&body).map_err(|e| Error::RenderApi {
            status: status.as_u16(),
            message: format!("response is not valid JSON: {}", e),
        })?;

        if !parsed.success {
            return Err(Error::RenderApi {
                status: status.as_u16(),
                message: parsed.message,
            });
        }

        FrameSequence::from_data_uris(&parsed.frames)
    }
}

// Prefer the JSON `error` field, then the raw body.
fn remote_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Some(msg) = v.get("error").and_then(|e| e.as_str()) {
                return Some(msg.to_string());
            }
        }
    }
    Some(trimmed.to_string())
}

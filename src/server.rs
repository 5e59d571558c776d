//! HTTP transport for the render API (`tiny_http` accept loop feeding a
//! tokio runtime).

use std::io::Read;

use log::{debug, info, warn};
use tiny_http::{Header, Request, Response, Server};
use tokio::runtime::{Builder, Handle};

use crate::api::{self, ApiResponse, GifBackend, CORS_HEADERS, GIF_PATH, HEALTH_PATH, RENDER_PATH};
use crate::worker::RenderWorker;
use crate::{Error, Result};

/// Largest request body accepted; the payload is a short text.
pub const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Bind `addr` and serve until the process exits. Without `gif` the
/// one-shot GIF endpoint answers 503.
pub fn serve(addr: &str, worker: RenderWorker, gif: Option<GifBackend>) -> Result<()> {
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .thread_name("framecast-api")
        .build()
        .map_err(|e| Error::Other(format!("Failed to start runtime: {}", e)))?;

    let server = Server::http(addr).map_err(|e| Error::ConfigError(format!("Failed to bind {}: {}", addr, e)))?;
    info!("Render API listening on http://{}{}", server.server_addr(), RENDER_PATH);

    run(server, worker, gif, runtime.handle().clone());
    Ok(())
}

/// Accept loop. Each request, body included, is handled as a task on
/// `runtime`, so a slow client or capture never holds up the next request.
pub fn run(server: Server, worker: RenderWorker, gif: Option<GifBackend>, runtime: Handle) {
    for request in server.incoming_requests() {
        dispatch(request, &worker, gif.as_ref(), &runtime);
    }
}

fn dispatch(request: Request, worker: &RenderWorker, gif: Option<&GifBackend>, runtime: &Handle) {
    let method = request.method().as_str().to_string();
    let path = request.url().split('?').next().unwrap_or("").to_string();
    debug!("{} {}", method, path);

    match path.as_str() {
        RENDER_PATH | GIF_PATH => {
            let worker = worker.clone();
            let gif = gif.cloned();
            runtime.spawn(async move {
                let read = tokio::task::spawn_blocking(move || {
                    let mut request = request;
                    let body = read_body(&mut request);
                    (request, body)
                })
                .await;
                let (request, body) = match read {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("Body reader failed: {}", e);
                        return;
                    }
                };

                let res = match body {
                    Err(res) => res,
                    Ok(body) if path == RENDER_PATH => api::handle(&method, &body, &worker).await,
                    Ok(body) => api::handle_gif(&method, &body, &worker, gif.as_ref()).await,
                };
                respond(request, res);
            });
        }
        HEALTH_PATH => {
            let res = match method.as_str() {
                "GET" => api::health(),
                "OPTIONS" => ApiResponse { status: 200, body: String::new() },
                _ => ApiResponse::error(405, "Method Not Allowed"),
            };
            respond(request, res);
        }
        _ => respond(request, ApiResponse::error(404, "Not Found")),
    }
}

// Reads at most one byte past the limit, so oversized bodies are never
// buffered in full.
fn read_body(request: &mut Request) -> std::result::Result<String, ApiResponse> {
    let mut bytes = Vec::new();
    Read::take(request.as_reader(), MAX_BODY_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| ApiResponse::error(400, format!("unreadable body: {}", e)))?;
    if bytes.len() as u64 > MAX_BODY_BYTES {
        return Err(ApiResponse::error(413, format!("body exceeds {} bytes", MAX_BODY_BYTES)));
    }
    String::from_utf8(bytes).map_err(|e| ApiResponse::error(400, format!("body is not UTF-8: {}", e)))
}

fn respond(request: Request, res: ApiResponse) {
    let mut response = Response::from_string(res.body).with_status_code(res.status);
    let headers = CORS_HEADERS
        .iter()
        .copied()
        .chain(std::iter::once(("Content-Type", "application/json")));
    for (name, value) in headers {
        if let Ok(h) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response.add_header(h);
        }
    }
    if let Err(e) = request.respond(response) {
        warn!("Failed to write response: {}", e);
    }
}

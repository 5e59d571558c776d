//! Shared helpers: a scriptable in-memory rendering surface and a mock
//! object store.

#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use framecast::capture::{CaptureConfig, RenderSurface, SurfaceLauncher};
use framecast::{Error, Result, Viewport};
use image::{ImageFormat, Rgba, RgbaImage};
use tiny_http::{Response, Server};

pub fn solid_png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(w, h, Rgba(px));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Color the fake surface paints for variant `n`.
pub fn variant_color(n: u8) -> [u8; 4] {
    [n * 60, 255 - n * 50, n * 20, 255]
}

/// What the fake surface should do; shared with the test for assertions.
#[derive(Default)]
pub struct Script {
    /// Variant ordinal whose load times out
    pub timeout_on: Option<u8>,
    pub missing_target: bool,
    /// Override the captured size
    pub size: Option<(u32, u32)>,
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub loads: Mutex<Vec<u8>>,
}

impl Script {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> Vec<u8> {
        self.loads.lock().unwrap().clone()
    }
}

pub struct FakeLauncher(pub Arc<Script>);

impl SurfaceLauncher for FakeLauncher {
    fn launch(&self, config: &CaptureConfig) -> Result<Box<dyn RenderSurface>> {
        self.0.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSurface {
            script: self.0.clone(),
            viewport: config.viewport,
            current: None,
        }))
    }
}

struct FakeSurface {
    script: Arc<Script>,
    viewport: Viewport,
    current: Option<u8>,
}

fn variant_in(html: &str) -> Option<u8> {
    let idx = html.find("render-target frame-")? + "render-target frame-".len();
    html[idx..].chars().next()?.to_digit(10).map(|d| d as u8)
}

impl RenderSurface for FakeSurface {
    fn ensure_viewport(&mut self, viewport: Viewport, _scale: f64) -> Result<()> {
        self.viewport = viewport;
        Ok(())
    }

    fn set_content(&mut self, html: &str, timeout: Duration) -> Result<()> {
        let n = variant_in(html).ok_or_else(|| Error::CaptureFailure("no variant class".into()))?;
        self.script.loads.lock().unwrap().push(n);
        if self.script.timeout_on == Some(n) {
            return Err(Error::RenderTimeout(timeout.as_millis() as u64));
        }
        self.current = Some(n);
        Ok(())
    }

    fn capture_region(&mut self, selector: &str) -> Result<Vec<u8>> {
        if self.script.missing_target {
            return Err(Error::CaptureFailure(format!("Render target `{}` not found", selector)));
        }
        let n = self.current.ok_or_else(|| Error::CaptureFailure("nothing loaded".into()))?;
        let (w, h) = self.script.size.unwrap_or((self.viewport.width, self.viewport.height));
        Ok(solid_png(w, h, variant_color(n)))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.script.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn fake(script: Script) -> (Arc<dyn SurfaceLauncher>, Arc<Script>) {
    let script = Arc::new(script);
    let launcher: Arc<dyn SurfaceLauncher> = Arc::new(FakeLauncher(script.clone()));
    (launcher, script)
}

/// Capture config without the settle delay.
pub fn fast_config() -> CaptureConfig {
    CaptureConfig { settle_delay_ms: 0, ..Default::default() }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Start an object store stub answering every request with `status`/`body`.
pub fn start_store(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    std::thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let header = |name: &'static str| {
                request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv(name))
                    .map(|h| h.value.as_str().to_string())
            };
            let authorization = header("Authorization");
            let content_type = header("Content-Type");
            let mut bytes = Vec::new();
            let _ = request.as_reader().read_to_end(&mut bytes);
            log.lock().unwrap().push(Recorded {
                method: request.method().as_str().to_string(),
                url: request.url().to_string(),
                authorization,
                content_type,
                body: bytes,
            });
            let _ = request.respond(Response::from_string(body).with_status_code(status));
        }
    });

    (base, seen)
}

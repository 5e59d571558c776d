use std::sync::Arc;
use std::thread;

use log::debug;
use tokio::sync::{oneshot, Semaphore};

use crate::capture::{CaptureConfig, CaptureEngine, SurfaceLauncher};
use crate::frame::FrameSequence;
use crate::template;
use crate::{Error, Result};

/// An async-friendly capture front end.
///
/// Each capture runs on a dedicated OS thread that owns its rendering
/// session from launch to teardown, so the session never crosses threads
/// and is never shared between requests. Async callers await the result
/// without blocking the runtime. A semaphore bounds how many sessions run
/// at once.
#[derive(Clone)]
pub struct RenderWorker {
    engine: CaptureEngine,
    sessions: Arc<Semaphore>,
}

impl RenderWorker {
    pub fn new(launcher: Arc<dyn SurfaceLauncher>, config: CaptureConfig, max_sessions: usize) -> Self {
        Self {
            engine: CaptureEngine::new(launcher, config),
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }

    pub fn engine(&self) -> &CaptureEngine {
        &self.engine
    }

    /// Render and capture all variants of `text`.
    pub async fn capture(&self, text: String) -> Result<FrameSequence> {
        // Reject blank input before waiting for (or launching) a session.
        let markups = template::render(&text)?;

        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|e| Error::Other(format!("Session pool closed: {}", e)))?;

        let (tx, rx) = oneshot::channel();
        let engine = self.engine.clone();

        thread::Builder::new()
            .name("framecast-capture".into())
            .spawn(move || {
                let res = engine.capture(&markups);
                let _ = tx.send(res);
            })
            .map_err(|e| Error::RenderEngineUnavailable(format!("Failed to spawn capture thread: {}", e)))?;

        debug!("capture dispatched");
        rx.await
            .map_err(|e| Error::Other(format!("Capture canceled: {}", e)))?
    }
}

//! Capture engine: drives one rendering session through every frame variant
//!
//! A request owns exactly one [`RenderSurface`] for its whole lifetime. The
//! surface lives inside a [`Session`] guard, so it is closed on every exit
//! path, including early returns through `?`.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::frame::{FrameSequence, RasterFrame};
use crate::template::{self, FrameVariant, FRAME_COUNT, RENDER_TARGET_SELECTOR};
use crate::{Error, Result, Viewport};

/// Configuration for the capture phase
///
/// # Examples
///
/// ```
/// let cfg = framecast::CaptureConfig::default();
/// assert_eq!(cfg.viewport.width, 720);
/// assert_eq!(cfg.load_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Viewport pinned before the first capture; frames must match it exactly
    pub viewport: Viewport,
    /// Device pixels per CSS pixel
    pub device_scale_factor: f64,
    /// How long a single variant may take to load (resources and fonts)
    pub load_timeout_ms: u64,
    /// Fixed wait after load so async paint (web fonts, gradients) lands
    pub settle_delay_ms: u64,
    /// Selector of the region captured as the frame
    pub target_selector: String,
    /// Explicit browser executable; autodetected when `None`
    pub browser_path: Option<PathBuf>,
    /// Run the browser with its sandbox enabled
    pub sandbox: bool,
    /// Browser is torn down if the session is idle for this long
    pub idle_browser_timeout_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            device_scale_factor: 1.0,
            load_timeout_ms: 30_000,
            settle_delay_ms: 500,
            target_selector: RENDER_TARGET_SELECTOR.to_string(),
            browser_path: None,
            sandbox: true,
            idle_browser_timeout_ms: 60_000,
        }
    }
}

/// A live rendering session (one browser, one page).
pub trait RenderSurface {
    /// Verify or pin the CSS viewport and device scale used for captures.
    fn ensure_viewport(&mut self, viewport: Viewport, device_scale_factor: f64) -> Result<()>;

    /// Replace the page content in full and wait until resources settle.
    ///
    /// Fails with [`Error::RenderTimeout`] when `timeout` elapses first.
    fn set_content(&mut self, html: &str, timeout: Duration) -> Result<()>;

    /// Capture the single element matching `selector` as PNG bytes.
    fn capture_region(&mut self, selector: &str) -> Result<Vec<u8>>;

    /// Tear the session down, releasing the browser process.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Starts rendering sessions. Shared across requests; sessions are not.
pub trait SurfaceLauncher: Send + Sync {
    fn launch(&self, config: &CaptureConfig) -> Result<Box<dyn RenderSurface>>;
}

/// Exclusive handle on a rendering session, released on drop.
pub struct Session {
    surface: Option<Box<dyn RenderSurface>>,
}

impl Session {
    pub fn acquire(launcher: &dyn SurfaceLauncher, config: &CaptureConfig) -> Result<Self> {
        let surface = launcher.launch(config)?;
        debug!("rendering session acquired");
        Ok(Self { surface: Some(surface) })
    }

    pub fn surface(&mut self) -> Result<&mut dyn RenderSurface> {
        match self.surface.as_deref_mut() {
            Some(s) => Ok(s),
            None => Err(Error::Other("rendering session already released".into())),
        }
    }

    /// Close the session now and report the outcome.
    pub fn release(mut self) -> Result<()> {
        match self.surface.take() {
            Some(s) => {
                debug!("releasing rendering session");
                s.close()
            }
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(s) = self.surface.take() {
            debug!("releasing rendering session after failure");
            if let Err(e) = s.close() {
                warn!("Failed to release rendering session: {}", e);
            }
        }
    }
}

/// Renders the card variants and captures one frame per variant.
#[derive(Clone)]
pub struct CaptureEngine {
    launcher: Arc<dyn SurfaceLauncher>,
    config: CaptureConfig,
}

impl CaptureEngine {
    pub fn new(launcher: Arc<dyn SurfaceLauncher>, config: CaptureConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Render `text` into all variants and capture them.
    ///
    /// Blank text fails before any session is acquired.
    pub fn capture_text(&self, text: &str) -> Result<FrameSequence> {
        let markups = template::render(text)?;
        self.capture(&markups)
    }

    /// Capture pre-rendered variant markup, which must cover every variant
    /// in ascending order.
    pub fn capture(&self, markups: &[(FrameVariant, String)]) -> Result<FrameSequence> {
        if markups.len() != FRAME_COUNT {
            return Err(Error::CaptureFailure(format!(
                "expected markup for {} variants, got {}",
                FRAME_COUNT,
                markups.len()
            )));
        }
        if markups.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(Error::CaptureFailure("variants must be in ascending order".into()));
        }

        let mut session = Session::acquire(self.launcher.as_ref(), &self.config)?;
        // On error the guard closes the session as it goes out of scope.
        let frames = self.capture_all(&mut session, markups)?;

        if let Err(e) = session.release() {
            warn!("Rendering session did not close cleanly: {}", e);
        }

        FrameSequence::new(frames)
    }

    fn capture_all(
        &self,
        session: &mut Session,
        markups: &[(FrameVariant, String)],
    ) -> Result<Vec<RasterFrame>> {
        let viewport = self.config.viewport;
        let surface = session.surface()?;
        surface.ensure_viewport(viewport, self.config.device_scale_factor)?;

        let timeout = Duration::from_millis(self.config.load_timeout_ms);
        let settle = Duration::from_millis(self.config.settle_delay_ms);
        let mut frames = Vec::with_capacity(markups.len());

        for (variant, html) in markups {
            debug!("loading {}", variant);
            surface.set_content(html, timeout)?;
            if !settle.is_zero() {
                thread::sleep(settle);
            }

            let png = surface.capture_region(&self.config.target_selector)?;
            let frame = RasterFrame::from_png(Some(*variant), png)?;
            if frame.width() != viewport.width || frame.height() != viewport.height {
                return Err(Error::CaptureFailure(format!(
                    "{} captured at {}x{}, expected {}x{}",
                    variant,
                    frame.width(),
                    frame.height(),
                    viewport.width,
                    viewport.height
                )));
            }

            info!("Captured {} ({} bytes)", variant, frame.png().len());
            frames.push(frame);
        }

        Ok(frames)
    }
}

/// Launcher used when the crate is built without a browser backend.
pub struct UnavailableLauncher;

impl SurfaceLauncher for UnavailableLauncher {
    fn launch(&self, _config: &CaptureConfig) -> Result<Box<dyn RenderSurface>> {
        Err(Error::RenderEngineUnavailable(
            "built without a rendering backend (enable the `cdp` feature)".into(),
        ))
    }
}

/// The launcher for the best backend compiled in.
#[cfg(feature = "cdp")]
pub fn default_launcher() -> Arc<dyn SurfaceLauncher> {
    Arc::new(crate::cdp::CdpLauncher)
}

#[cfg(not(feature = "cdp"))]
pub fn default_launcher() -> Arc<dyn SurfaceLauncher> {
    Arc::new(UnavailableLauncher)
}

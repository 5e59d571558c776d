//! Chrome DevTools Protocol backend for the capture engine

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as Base64Engine;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Emulation, Page};
use headless_chrome::{Browser, LaunchOptions};
use log::debug;

use crate::capture::{CaptureConfig, RenderSurface, SurfaceLauncher};
use crate::{Error, Result, Viewport};

/// Launches a headless Chrome per session (uses the `headless_chrome` crate).
pub struct CdpLauncher;

impl SurfaceLauncher for CdpLauncher {
    fn launch(&self, config: &CaptureConfig) -> Result<Box<dyn RenderSurface>> {
        Ok(Box::new(CdpSurface::launch(config)?))
    }
}

/// One headless Chrome process with a single tab.
pub struct CdpSurface {
    browser: Browser,
    tab: Arc<Tab>,
}

impl CdpSurface {
    pub fn launch(config: &CaptureConfig) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.sandbox)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.browser_path.clone())
            .idle_browser_timeout(Duration::from_millis(config.idle_browser_timeout_ms))
            .build()
            .map_err(|e| Error::RenderEngineUnavailable(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::RenderEngineUnavailable(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::RenderEngineUnavailable(format!("Failed to create tab: {}", e)))?;

        tab.set_default_timeout(Duration::from_millis(config.load_timeout_ms));

        Ok(Self { browser, tab })
    }

    fn eval_json(&self, script: &str, await_promise: bool) -> Result<serde_json::Value> {
        let eval = self.tab.evaluate(script, await_promise)?;
        Ok(eval.value.unwrap_or(serde_json::Value::Null))
    }
}

/// Device metrics that pin the page to `viewport` at `scale`.
fn metrics_override(viewport: Viewport, scale: f64) -> Emulation::SetDeviceMetricsOverride {
    Emulation::SetDeviceMetricsOverride {
        width: viewport.width,
        height: viewport.height,
        device_scale_factor: scale,
        mobile: false,
        scale: None,
        screen_width: Some(viewport.width),
        screen_height: Some(viewport.height),
        position_x: None,
        position_y: None,
        dont_set_visible_size: None,
        screen_orientation: None,
        viewport: None,
        display_feature: None,
        device_posture: None,
    }
}

/// Compare `[innerWidth, innerHeight, devicePixelRatio]` read back from the
/// page against the pinned values.
fn check_metrics(metrics: &[f64], viewport: Viewport, scale: f64) -> Result<()> {
    let [width, height, ratio] = match metrics {
        [w, h, r] => [*w, *h, *r],
        _ => return Err(Error::RenderEngineUnavailable(format!("Unexpected viewport metrics: {:?}", metrics))),
    };

    if (ratio - scale).abs() > f64::EPSILON {
        return Err(Error::RenderEngineUnavailable(format!(
            "Device scale is {}, expected {}",
            ratio, scale
        )));
    }
    if width.round() as u32 != viewport.width || height.round() as u32 != viewport.height {
        return Err(Error::RenderEngineUnavailable(format!(
            "Viewport is {}x{}, expected {}x{}",
            width, height, viewport.width, viewport.height
        )));
    }
    Ok(())
}

/// What is left of a load budget, or `RenderTimeout` once it is spent.
fn budget_left(elapsed: Duration, timeout: Duration) -> Result<Duration> {
    match timeout.checked_sub(elapsed) {
        Some(left) if !left.is_zero() => Ok(left),
        _ => Err(Error::RenderTimeout(timeout.as_millis() as u64)),
    }
}

/// Border box of the target snapped to whole CSS pixels.
fn snap_clip(border: Page::Viewport) -> Page::Viewport {
    Page::Viewport {
        x: border.x.round(),
        y: border.y.round(),
        width: border.width.round(),
        height: border.height.round(),
        scale: 1.0,
    }
}

impl RenderSurface for CdpSurface {
    fn ensure_viewport(&mut self, viewport: Viewport, device_scale_factor: f64) -> Result<()> {
        self.tab
            .call_method(metrics_override(viewport, device_scale_factor))
            .map_err(|e| Error::RenderEngineUnavailable(format!("Failed to pin viewport: {}", e)))?;

        let metrics = self.eval_json(
            "JSON.stringify([window.innerWidth, window.innerHeight, window.devicePixelRatio])",
            false,
        )?;
        let parsed: Vec<f64> = metrics
            .as_str()
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();

        check_metrics(&parsed, viewport, device_scale_factor)?;
        debug!("viewport pinned at {}x{} @{}x", viewport.width, viewport.height, device_scale_factor);
        Ok(())
    }

    fn set_content(&mut self, html: &str, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let url = format!(
            "data:text/html;charset=utf-8;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(html)
        );

        // Every wait gets only what is left of the single load budget.
        let or_timeout = |err: Error| match budget_left(started.elapsed(), timeout) {
            Ok(_) => err,
            Err(timed_out) => timed_out,
        };

        self.tab
            .navigate_to(&url)
            .map_err(|e| or_timeout(Error::CaptureFailure(format!("Navigation failed: {}", e))))?;

        self.tab.set_default_timeout(budget_left(started.elapsed(), timeout)?);
        self.tab
            .wait_until_navigated()
            .map_err(|e| or_timeout(Error::CaptureFailure(format!("Wait for navigation failed: {}", e))))?;

        // Load event does not cover web fonts; race them against the rest of the budget.
        let left = budget_left(started.elapsed(), timeout)?;
        let script = format!(
            "Promise.race([document.fonts.ready.then(() => document.fonts.status), \
             new Promise(r => setTimeout(() => r('timeout'), {}))])",
            left.as_millis()
        );
        let fonts = self.eval_json(&script, true).map_err(or_timeout)?;
        self.tab.set_default_timeout(timeout);

        if fonts.as_str() == Some("timeout") {
            return Err(Error::RenderTimeout(timeout.as_millis() as u64));
        }
        budget_left(started.elapsed(), timeout)?;

        debug!("content settled in {:?} (fonts: {})", started.elapsed(), fonts);
        Ok(())
    }

    fn capture_region(&mut self, selector: &str) -> Result<Vec<u8>> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| Error::CaptureFailure(format!("Render target `{}` not found: {}", selector, e)))?;

        element
            .scroll_into_view()
            .map_err(|e| Error::CaptureFailure(format!("Render target `{}` not visible: {}", selector, e)))?;
        let border = element
            .get_box_model()
            .map_err(|e| Error::CaptureFailure(format!("No layout box for `{}`: {}", selector, e)))?
            .border_viewport();

        // The border box includes padding; the content box would crop it.
        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(snap_clip(border)), true)
            .map_err(|e| Error::CaptureFailure(format!("Screenshot failed: {}", e)))
    }

    fn close(self: Box<Self>) -> Result<()> {
        // Dropping the browser terminates the child process.
        let this = *self;
        drop(this.tab);
        drop(this.browser);
        Ok(())
    }
}

//! framecast
//!
//! Renders a parameterized promo card in four visual states, captures each
//! state in a headless browser, composites the stills into an animated GIF
//! and publishes it to an object store.
//!
//! # Pipeline
//!
//! - [`template`]: text -> four HTML variants (pure)
//! - [`capture`]: HTML variants -> four 720x900 PNG frames, one browser
//!   session per request (CDP backend behind the `cdp` feature)
//! - [`encode`]: frames -> GIF (800ms per frame, infinite loop)
//! - [`publish`]: GIF -> public URL + embed snippet
//!
//! The first two stages sit behind the render API ([`api`], [`server`]);
//! the last two run client-side ([`pipeline`]).
//!
//! # Example
//!
//! ```no_run
//! use framecast::{CaptureConfig, CaptureEngine, EncoderSettings, FrameEncoder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CaptureEngine::new(framecast::capture::default_launcher(), CaptureConfig::default());
//! let frames = engine.capture_text("아이템1: 100원\n아이템2: 200원")?;
//!
//! let encoder = FrameEncoder::new(EncoderSettings::default())?;
//! let gif = encoder.encode(&frames, |p| println!("encoding {:.0}%", p * 100.0))?;
//! println!("GIF is {} bytes", gif.size());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod template;
pub mod frame;
pub mod capture;

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod encode;
pub mod publish;
pub mod api;
pub mod worker;
pub mod server;
pub mod pipeline;
pub mod config;

pub use api::RenderClient;
pub use capture::{CaptureConfig, CaptureEngine, RenderSurface, Session, SurfaceLauncher};
pub use config::AppConfig;
pub use encode::{AnimatedArtifact, EncoderSettings, FrameEncoder, FRAME_DELAY_MS};
pub use frame::{FrameSequence, RasterFrame};
pub use pipeline::{GenerationOutcome, Pipeline, Stage};
pub use publish::{PublishedResult, Publisher, StoreConfig};
pub use template::FrameVariant;
pub use worker::RenderWorker;

/// Viewport dimensions in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: template::CARD_WIDTH,
            height: template::CARD_HEIGHT,
        }
    }
}

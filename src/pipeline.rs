//! Client-side orchestration: frames -> GIF -> published URL.

use log::info;

use crate::api::RenderClient;
use crate::capture::CaptureEngine;
use crate::encode::{AnimatedArtifact, FrameEncoder};
use crate::frame::FrameSequence;
use crate::publish::{PublishedResult, Publisher};
use crate::{template, Result};

/// Where the four frames come from.
pub trait FrameSource {
    fn frames(&self, text: &str) -> Result<FrameSequence>;
}

/// Frames from a remote render API.
impl FrameSource for RenderClient {
    fn frames(&self, text: &str) -> Result<FrameSequence> {
        self.request_frames(text)
    }
}

/// Frames captured in-process.
impl FrameSource for CaptureEngine {
    fn frames(&self, text: &str) -> Result<FrameSequence> {
        self.capture_text(text)
    }
}

/// Pipeline stage reported to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RequestingFrames,
    FramesReceived,
    Encoding,
    Encoded,
    Uploading,
    Uploaded,
}

impl Stage {
    /// Overall progress at the start of this stage, in percent.
    pub fn percent(self) -> u8 {
        match self {
            Stage::RequestingFrames => 10,
            Stage::FramesReceived => 30,
            Stage::Encoding => 50,
            Stage::Encoded => 80,
            Stage::Uploading => 85,
            Stage::Uploaded => 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub published: PublishedResult,
    /// Kept so callers can save or inspect the GIF locally
    pub artifact: AnimatedArtifact,
    pub frame_count: usize,
}

pub struct Pipeline<S: FrameSource> {
    source: S,
    encoder: FrameEncoder,
    publisher: Publisher,
}

impl<S: FrameSource> Pipeline<S> {
    pub fn new(source: S, encoder: FrameEncoder, publisher: Publisher) -> Self {
        Self { source, encoder, publisher }
    }

    /// Run every stage. `on_progress` receives the stage and overall percent
    /// (the encoding stage interpolates between 50 and 80).
    pub fn generate<F>(&self, text: &str, mut on_progress: F) -> Result<GenerationOutcome>
    where
        F: FnMut(Stage, u8),
    {
        template::prepare_text(text)?;

        on_progress(Stage::RequestingFrames, Stage::RequestingFrames.percent());
        let frames = self.source.frames(text)?;
        on_progress(Stage::FramesReceived, Stage::FramesReceived.percent());

        let artifact = self.encoder.encode(&frames, |p| {
            let pct = Stage::Encoding.percent() as f32 + p * 30.0;
            on_progress(Stage::Encoding, pct.round() as u8);
        })?;
        on_progress(Stage::Encoded, Stage::Encoded.percent());

        on_progress(Stage::Uploading, Stage::Uploading.percent());
        let published = self.publisher.publish(&artifact)?;
        on_progress(Stage::Uploaded, Stage::Uploaded.percent());

        info!("Generated {} ({})", published.public_url, published.file_size);
        Ok(GenerationOutcome {
            published,
            frame_count: frames.len(),
            artifact,
        })
    }
}

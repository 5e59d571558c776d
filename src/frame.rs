//! Captured frames and the fixed-length sequence handed to the encoder

use std::io::Cursor;

use base64::Engine as Base64Engine;
use image::{ImageFormat, ImageReader};

use crate::template::{FrameVariant, FRAME_COUNT};
use crate::{Error, Result};

/// Prefix of every frame exchanged over the render API.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// A captured still: PNG bytes plus their pixel dimensions.
///
/// `variant` is known when the frame was captured locally and `None` when
/// it was decoded from a data URI (the wire format carries order, not
/// variant numbers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    variant: Option<FrameVariant>,
    width: u32,
    height: u32,
    png: Vec<u8>,
}

impl RasterFrame {
    /// Wrap PNG bytes returned by a capture.
    pub fn from_png(variant: Option<FrameVariant>, png: Vec<u8>) -> Result<Self> {
        let (width, height) = png_dimensions(&png)
            .map_err(|e| Error::CaptureFailure(format!("snapshot is not a valid PNG: {}", e)))?;
        Ok(Self { variant, width, height, png })
    }

    /// Parse a `data:image/png;base64,...` string.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let payload = uri.strip_prefix(PNG_DATA_URI_PREFIX).ok_or_else(|| {
            let head: String = uri.chars().take(32).collect();
            Error::EncodingFailure(format!("frame is not a PNG data URI: {}", head))
        })?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::EncodingFailure(format!("frame payload is not base64: {}", e)))?;
        let (width, height) = png_dimensions(&png)
            .map_err(|e| Error::EncodingFailure(format!("frame payload is not a PNG: {}", e)))?;
        Ok(Self { variant: None, width, height, png })
    }

    pub fn to_data_uri(&self) -> String {
        format!(
            "{}{}",
            PNG_DATA_URI_PREFIX,
            base64::engine::general_purpose::STANDARD.encode(&self.png)
        )
    }

    pub fn variant(&self) -> Option<FrameVariant> {
        self.variant
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }
}

fn png_dimensions(png: &[u8]) -> image::ImageResult<(u32, u32)> {
    ImageReader::with_format(Cursor::new(png), ImageFormat::Png).into_dimensions()
}

/// Exactly [`FRAME_COUNT`] frames, kept in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<RasterFrame>,
}

impl FrameSequence {
    pub fn new(frames: Vec<RasterFrame>) -> Result<Self> {
        if frames.len() != FRAME_COUNT {
            return Err(Error::EncodingFailure(format!(
                "expected {} frames, got {}",
                FRAME_COUNT,
                frames.len()
            )));
        }
        Ok(Self { frames })
    }

    pub fn from_data_uris<S: AsRef<str>>(uris: &[S]) -> Result<Self> {
        let frames = uris
            .iter()
            .map(|u| RasterFrame::from_data_uri(u.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(frames)
    }

    pub fn to_data_uris(&self) -> Vec<String> {
        self.frames.iter().map(RasterFrame::to_data_uri).collect()
    }

    pub fn frames(&self) -> &[RasterFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<RasterFrame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

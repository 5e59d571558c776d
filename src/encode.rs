//! Frame encoder: composites captured frames into an animated GIF.

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, ImageFormat, Rgb, Rgba, RgbaImage};
use log::{debug, info};

use crate::frame::{FrameSequence, RasterFrame};
use crate::template::{CARD_HEIGHT, CARD_WIDTH};
use crate::{Error, Result};

/// Display time of each frame. Tied to the four-variant cadence.
pub const FRAME_DELAY_MS: u32 = 800;

/// Canvas and timing used for every animation
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub delay_ms: u32,
    pub width: u32,
    pub height: u32,
    /// `#rrggbb` color transparent pixels are composited over
    pub background: String,
    /// Quantizer speed (1 = best, 30 = fastest)
    pub speed: i32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            delay_ms: FRAME_DELAY_MS,
            width: CARD_WIDTH,
            height: CARD_HEIGHT,
            background: "#000000".to_string(),
            speed: 10,
        }
    }
}

/// The encoded animation.
#[derive(Debug, Clone)]
pub struct AnimatedArtifact {
    bytes: Vec<u8>,
    frame_count: usize,
    delay_ms: u32,
}

impl AnimatedArtifact {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    pub fn mime_type(&self) -> &'static str {
        "image/gif"
    }
}

/// Encodes frame sequences with fixed settings.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    settings: EncoderSettings,
    background: Rgb<u8>,
}

impl FrameEncoder {
    pub fn new(settings: EncoderSettings) -> Result<Self> {
        if settings.width == 0 || settings.height == 0 {
            return Err(Error::ConfigError("canvas dimensions must be non-zero".into()));
        }
        if !(1..=30).contains(&settings.speed) {
            return Err(Error::ConfigError(format!(
                "encoder speed must be within 1..=30, got {}",
                settings.speed
            )));
        }
        let background = parse_hex_color(&settings.background)?;
        Ok(Self { settings, background })
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Encode the four captured frames in sequence order.
    pub fn encode<F>(&self, frames: &FrameSequence, progress: F) -> Result<AnimatedArtifact>
    where
        F: FnMut(f32),
    {
        self.encode_frames(frames.frames(), progress)
    }

    /// Encode any non-empty run of frames in the order given.
    ///
    /// `progress` receives 0.0 first, then the completed fraction after each
    /// frame, and 1.0 once the artifact is complete. On error no artifact is
    /// produced.
    pub fn encode_frames<F>(&self, frames: &[RasterFrame], mut progress: F) -> Result<AnimatedArtifact>
    where
        F: FnMut(f32),
    {
        if frames.is_empty() {
            return Err(Error::EncodingFailure("no frames to encode".into()));
        }

        let (width, height) = (self.settings.width, self.settings.height);
        let delay = Delay::from_numer_denom_ms(self.settings.delay_ms, 1);
        let total = frames.len();
        progress(0.0);

        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new_with_speed(&mut bytes, self.settings.speed);
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| Error::EncodingFailure(format!("failed to set GIF repeat: {}", e)))?;

            for (i, frame) in frames.iter().enumerate() {
                if frame.width() != width || frame.height() != height {
                    return Err(Error::EncodingFailure(format!(
                        "frame {} has dimensions {}x{}, expected {}x{}",
                        i + 1,
                        frame.width(),
                        frame.height(),
                        width,
                        height
                    )));
                }

                let bitmap = self.decode(frame, i)?;
                encoder
                    .encode_frame(Frame::from_parts(bitmap, 0, 0, delay))
                    .map_err(|e| Error::EncodingFailure(format!("failed to encode frame {}: {}", i + 1, e)))?;

                debug!("encoded frame {}/{}", i + 1, total);
                progress((i + 1) as f32 / total as f32);
            }
            // The GIF trailer is written when the encoder drops.
        }

        progress(1.0);
        info!(
            "Encoded {} frames to GIF ({}x{}, delay={}ms, {} bytes)",
            total, width, height, self.settings.delay_ms, bytes.len()
        );

        Ok(AnimatedArtifact {
            bytes,
            frame_count: total,
            delay_ms: self.settings.delay_ms,
        })
    }

    fn decode(&self, frame: &RasterFrame, index: usize) -> Result<RgbaImage> {
        let mut bitmap = image::load_from_memory_with_format(frame.png(), ImageFormat::Png)
            .map_err(|e| Error::EncodingFailure(format!("failed to decode frame {}: {}", index + 1, e)))?
            .to_rgba8();
        flatten(&mut bitmap, self.background);
        Ok(bitmap)
    }
}

/// Composite every pixel over an opaque background.
fn flatten(bitmap: &mut RgbaImage, background: Rgb<u8>) {
    for px in bitmap.pixels_mut() {
        let Rgba([r, g, b, a]) = *px;
        if a == 255 {
            continue;
        }
        let blend = |fg: u8, bg: u8| -> u8 {
            let a = a as u32;
            ((fg as u32 * a + bg as u32 * (255 - a) + 127) / 255) as u8
        };
        *px = Rgba([
            blend(r, background[0]),
            blend(g, background[1]),
            blend(b, background[2]),
            255,
        ]);
    }
}

/// Parse `#rrggbb` (or `#rgb`).
pub fn parse_hex_color(s: &str) -> Result<Rgb<u8>> {
    let hex = s.trim().trim_start_matches('#');
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return Err(Error::ConfigError(format!("invalid color `{}`", s))),
    };
    let channel = |i: usize| {
        u8::from_str_radix(&expanded[i..i + 2], 16)
            .map_err(|_| Error::ConfigError(format!("invalid color `{}`", s)))
    };
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

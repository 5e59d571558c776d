//! Capture engine against a scripted in-memory surface

mod common;

use common::{fake, fast_config, variant_color, Script};
use framecast::{CaptureEngine, Error, FrameVariant};
use image::ImageFormat;

fn first_pixel(png: &[u8]) -> [u8; 4] {
    let img = image::load_from_memory_with_format(png, ImageFormat::Png)
        .expect("decode png")
        .to_rgba8();
    img.get_pixel(0, 0).0
}

#[test]
fn captures_four_frames_in_variant_order() {
    let (launcher, script) = fake(Script::default());
    let engine = CaptureEngine::new(launcher, fast_config());

    let frames = engine.capture_text("아이템1: 100원\n아이템2: 200원").expect("capture");

    assert_eq!(frames.len(), 4);
    for (i, frame) in frames.frames().iter().enumerate() {
        let n = i as u8 + 1;
        assert_eq!(frame.variant(), FrameVariant::from_ordinal(n));
        assert_eq!((frame.width(), frame.height()), (720, 900));
        assert_eq!(first_pixel(frame.png()), variant_color(n));
    }
    assert_eq!(script.loads(), vec![1, 2, 3, 4]);
    assert_eq!(script.launched(), 1);
    assert_eq!(script.closed(), 1);
}

#[test]
fn timeout_aborts_remaining_variants_and_releases_session() {
    let (launcher, script) = fake(Script { timeout_on: Some(2), ..Default::default() });
    let engine = CaptureEngine::new(launcher, fast_config());

    let err = engine.capture_text("hello").unwrap_err();

    assert!(matches!(err, Error::RenderTimeout(30_000)), "got {:?}", err);
    assert_eq!(err.status_code(), 500);
    assert_eq!(script.loads(), vec![1, 2]);
    assert_eq!(script.launched(), 1);
    assert_eq!(script.closed(), 1);
}

#[test]
fn missing_render_target_is_capture_failure() {
    let (launcher, script) = fake(Script { missing_target: true, ..Default::default() });
    let engine = CaptureEngine::new(launcher, fast_config());

    let err = engine.capture_text("hello").unwrap_err();

    assert!(matches!(err, Error::CaptureFailure(ref m) if m.contains(".render-target")));
    assert_eq!(script.closed(), 1);
}

#[test]
fn frame_of_wrong_size_is_rejected() {
    let (launcher, script) = fake(Script { size: Some((360, 450)), ..Default::default() });
    let engine = CaptureEngine::new(launcher, fast_config());

    let err = engine.capture_text("hello").unwrap_err();

    assert!(matches!(err, Error::CaptureFailure(ref m) if m.contains("360x450")));
    assert_eq!(script.loads(), vec![1]);
    assert_eq!(script.closed(), 1);
}

#[test]
fn each_request_gets_its_own_session() {
    let (launcher, script) = fake(Script::default());
    let engine = CaptureEngine::new(launcher, fast_config());

    engine.capture_text("first").unwrap();
    engine.capture_text("second").unwrap();

    assert_eq!(script.launched(), 2);
    assert_eq!(script.closed(), 2);
}

//! Text in, published GIF URL out, with a scripted surface and a stub store

mod common;

use std::io::Cursor;
use std::time::Duration;

use common::{fake, fast_config, start_store, Script};
use framecast::{
    CaptureEngine, EncoderSettings, Error, FrameEncoder, Pipeline, Publisher, RenderClient, Stage,
    StoreConfig,
};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;

const TEXT: &str = "아이템1: 100원\n아이템2: 200원";

fn publisher(base: &str) -> Publisher {
    Publisher::new(StoreConfig {
        base_url: base.to_string(),
        api_key: "k".to_string(),
        ..Default::default()
    })
    .unwrap()
}

fn encoder() -> FrameEncoder {
    FrameEncoder::new(EncoderSettings { speed: 30, ..Default::default() }).unwrap()
}

#[test]
fn generates_and_publishes_four_frame_gif() {
    let (launcher, script) = fake(Script::default());
    let (base, seen) = start_store(200, "{}");
    let pipeline = Pipeline::new(CaptureEngine::new(launcher, fast_config()), encoder(), publisher(&base));

    let mut progress = Vec::new();
    let outcome = pipeline.generate(TEXT, |stage, pct| progress.push((stage, pct))).unwrap();

    let url = &outcome.published.public_url;
    let prefix = format!("{}/storage/v1/object/public/changong-images/theblack_", base);
    let digits = url.strip_prefix(&prefix).and_then(|r| r.strip_suffix(".gif")).expect(url);
    assert!(!digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
    assert!(outcome.published.html_code.contains(url.as_str()));
    assert_eq!(outcome.frame_count, 4);

    let uploaded = &seen.lock().unwrap()[0];
    assert_eq!(uploaded.body, outcome.artifact.bytes());
    let frames = GifDecoder::new(Cursor::new(&uploaded.body[..]))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[0].buffer().dimensions(), (720, 900));

    let percents: Vec<u8> = progress.iter().map(|(_, p)| *p).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{:?}", percents);
    assert_eq!(progress.first(), Some(&(Stage::RequestingFrames, 10)));
    assert_eq!(progress.last(), Some(&(Stage::Uploaded, 100)));
    assert_eq!(script.closed(), 1);
}

#[test]
fn blank_text_fails_before_any_work() {
    let (launcher, script) = fake(Script::default());
    let (base, seen) = start_store(200, "{}");
    let pipeline = Pipeline::new(CaptureEngine::new(launcher, fast_config()), encoder(), publisher(&base));

    let mut calls = 0;
    let err = pipeline.generate(" \n ", |_, _| calls += 1).unwrap_err();

    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(calls, 0);
    assert_eq!(script.launched(), 0);
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn capture_failure_skips_encode_and_upload() {
    let (launcher, _) = fake(Script { timeout_on: Some(1), ..Default::default() });
    let (base, seen) = start_store(200, "{}");
    let pipeline = Pipeline::new(CaptureEngine::new(launcher, fast_config()), encoder(), publisher(&base));

    assert!(matches!(pipeline.generate(TEXT, |_, _| {}), Err(Error::RenderTimeout(_))));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn unreachable_render_api_is_service_unavailable() {
    let (base, seen) = start_store(200, "{}");
    let client = RenderClient::new("http://127.0.0.1:9/api/generate-frames", Duration::from_secs(2)).unwrap();
    let pipeline = Pipeline::new(client, encoder(), publisher(&base));

    match pipeline.generate(TEXT, |_, _| {}) {
        Err(e @ Error::RenderApi { .. }) => assert_eq!(e.status_code(), 503),
        other => panic!("unexpected {:?}", other.map(|o| o.frame_count)),
    }
    assert!(seen.lock().unwrap().is_empty());
}

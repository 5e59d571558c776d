use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion};
use framecast::{template, EncoderSettings, FrameEncoder, RasterFrame};
use image::{ImageFormat, Rgba, RgbaImage};

fn bench_render_template(c: &mut Criterion) {
    let text = "아이템1: 100원\n아이템2: 200원\n아이템3: 300원";
    c.bench_function("render_four_variants", |b| {
        b.iter(|| template::render(text).unwrap())
    });
}

fn frame(w: u32, h: u32, shade: u8) -> RasterFrame {
    let img = RgbaImage::from_fn(w, h, |x, y| Rgba([shade, (x % 256) as u8, (y % 256) as u8, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    RasterFrame::from_png(None, out.into_inner()).unwrap()
}

fn bench_encode_gif(c: &mut Criterion) {
    let (w, h) = (180, 225);
    let frames: Vec<RasterFrame> = (0..4).map(|i| frame(w, h, i * 60)).collect();
    let encoder = FrameEncoder::new(EncoderSettings { width: w, height: h, ..Default::default() }).unwrap();

    let mut group = c.benchmark_group("encode");
    group.sample_size(10);
    group.bench_function("four_frames_quarter_size", |b| {
        b.iter(|| encoder.encode_frames(&frames, |_| {}).unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_render_template, bench_encode_gif);
criterion_main!(benches);

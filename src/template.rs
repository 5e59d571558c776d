//! Card template and the fixed four-variant style table.
//!
//! Rendering is a pure string transformation: the user's text is bound into
//! one fixed layout, and each [`FrameVariant`] contributes only a generated
//! style block and a `frame-N` class on the render target. The structural
//! markup is byte-identical across variants.
//!
//! User text is interpolated as-is (line breaks become `<br>`); it is not
//! HTML-escaped, so callers must only pass trusted text.

use std::fmt;

use crate::{Error, Result};

/// CSS selector of the bounded region captured as a frame.
pub const RENDER_TARGET_SELECTOR: &str = ".render-target";

/// Intrinsic card size in CSS pixels.
pub const CARD_WIDTH: u32 = 720;
pub const CARD_HEIGHT: u32 = 900;

/// Number of frame variants; the animation always has this many frames.
pub const FRAME_COUNT: usize = 4;

/// One of the four visual states of the card.
///
/// Variants are totally ordered; captures and animation frames follow
/// [`FrameVariant::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameVariant {
    First,
    Second,
    Third,
    Fourth,
}

impl FrameVariant {
    /// All variants in playback order.
    pub const ALL: [FrameVariant; FRAME_COUNT] = [
        FrameVariant::First,
        FrameVariant::Second,
        FrameVariant::Third,
        FrameVariant::Fourth,
    ];

    /// 1-based ordinal.
    pub fn ordinal(self) -> u8 {
        match self {
            FrameVariant::First => 1,
            FrameVariant::Second => 2,
            FrameVariant::Third => 3,
            FrameVariant::Fourth => 4,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            1 => Some(FrameVariant::First),
            2 => Some(FrameVariant::Second),
            3 => Some(FrameVariant::Third),
            4 => Some(FrameVariant::Fourth),
            _ => None,
        }
    }

    /// Class added next to `render-target`, e.g. `frame-2`.
    pub fn class_name(self) -> String {
        format!("frame-{}", self.ordinal())
    }

    pub fn style(self) -> &'static VariantStyle {
        &STYLE_TABLE[self.ordinal() as usize - 1]
    }
}

impl fmt::Display for FrameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {}", self.ordinal())
    }
}

/// A three-stop linear gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gradient {
    pub angle_deg: u16,
    pub stops: [&'static str; 3],
}

impl Gradient {
    fn css(&self) -> String {
        format!(
            "linear-gradient({}deg, {}, {}, {})",
            self.angle_deg, self.stops[0], self.stops[1], self.stops[2]
        )
    }
}

/// A centered glow (`0 0 <blur> <color>`), used for box and text shadows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub blur_px: u8,
    pub color: &'static str,
}

impl Glow {
    fn css(&self) -> String {
        format!("0 0 {}px {}", self.blur_px, self.color)
    }
}

/// Style parameters of one frame variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantStyle {
    /// Gradient clipped to the shop title text
    pub title_gradient: Gradient,
    /// Scale applied to every icon
    pub icon_scale: f32,
    /// 1-based index of the info-list item whose icon is highlighted
    pub highlighted_item: usize,
    pub highlight_color: &'static str,
    /// Call-to-action button
    pub cta_gradient: Gradient,
    pub cta_border: &'static str,
    pub cta_glow: Glow,
    /// Price section heading
    pub price_color: &'static str,
    pub price_glow: Glow,
}

impl VariantStyle {
    /// CSS rules applied on top of the shared base stylesheet.
    pub fn css(&self) -> String {
        format!(
            ".render-target .shop-title {{ background: {title}; -webkit-background-clip: text; -webkit-text-fill-color: transparent; background-clip: text; }}\n\
             .render-target .icon {{ transform: scale({icon}); }}\n\
             .render-target .info-list li:nth-child({item}) .icon {{ color: {hl}; transform: scale(1.1); }}\n\
             .render-target .cta-btn {{ background: {cta}; border-color: {border}; box-shadow: {cta_glow}; }}\n\
             .render-target .section-price-title {{ color: {price}; text-shadow: {price_glow}; }}",
            title = self.title_gradient.css(),
            icon = self.icon_scale,
            item = self.highlighted_item,
            hl = self.highlight_color,
            cta = self.cta_gradient.css(),
            border = self.cta_border,
            cta_glow = self.cta_glow.css(),
            price = self.price_color,
            price_glow = self.price_glow.css(),
        )
    }
}

static STYLE_TABLE: [VariantStyle; FRAME_COUNT] = [
    VariantStyle {
        title_gradient: Gradient { angle_deg: 45, stops: ["#ffd700", "#ffb347", "#ff8c00"] },
        icon_scale: 1.0,
        highlighted_item: 1,
        highlight_color: "#ff6666",
        cta_gradient: Gradient { angle_deg: 45, stops: ["#4169e1", "#6a5acd", "#8a2be2"] },
        cta_border: "#4169e1",
        cta_glow: Glow { blur_px: 20, color: "rgba(65, 105, 225, 0.4)" },
        price_color: "#ffaa00",
        price_glow: Glow { blur_px: 4, color: "rgba(255, 170, 0, 0.7)" },
    },
    VariantStyle {
        title_gradient: Gradient { angle_deg: 90, stops: ["#ffb347", "#ff8c00", "#ff6347"] },
        icon_scale: 1.05,
        highlighted_item: 2,
        highlight_color: "#66ff66",
        cta_gradient: Gradient { angle_deg: 90, stops: ["#6a5acd", "#8a2be2", "#9370db"] },
        cta_border: "#6a5acd",
        cta_glow: Glow { blur_px: 22, color: "rgba(106, 90, 205, 0.5)" },
        price_color: "#ff6600",
        price_glow: Glow { blur_px: 2, color: "rgba(255, 102, 0, 0.8)" },
    },
    VariantStyle {
        title_gradient: Gradient { angle_deg: 135, stops: ["#ff8c00", "#ff6347", "#ff4500"] },
        icon_scale: 1.1,
        highlighted_item: 3,
        highlight_color: "#6666ff",
        cta_gradient: Gradient { angle_deg: 135, stops: ["#8a2be2", "#9370db", "#ba55d3"] },
        cta_border: "#8a2be2",
        cta_glow: Glow { blur_px: 25, color: "rgba(138, 43, 226, 0.6)" },
        price_color: "#ff0066",
        price_glow: Glow { blur_px: 4, color: "rgba(255, 0, 102, 0.9)" },
    },
    VariantStyle {
        title_gradient: Gradient { angle_deg: 180, stops: ["#ff6347", "#ff4500", "#ffd700"] },
        icon_scale: 1.05,
        highlighted_item: 4,
        highlight_color: "#ffff66",
        cta_gradient: Gradient { angle_deg: 180, stops: ["#9370db", "#ba55d3", "#4169e1"] },
        cta_border: "#9370db",
        cta_glow: Glow { blur_px: 22, color: "rgba(147, 112, 219, 0.5)" },
        price_color: "#ffaa00",
        price_glow: Glow { blur_px: 5, color: "rgba(255, 170, 0, 0.7)" },
    },
];

const FRAME_TOKEN: &str = "{{FRAME_CLASS}}";
const STYLE_TOKEN: &str = "{{FRAME_STYLE}}";
const TEXT_TOKEN: &str = "{{TEXT}}";

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head>
  <meta charset="UTF-8">
  <title>THE BLACK SHOP</title>
  <link href="https://fonts.googleapis.com/css2?family=Noto+Sans+KR:wght@400;500;600;700;800&display=swap" rel="stylesheet">
  <style>
    body { background: #000000; margin: 0; padding: 0; font-family: 'Noto Sans KR', Arial, sans-serif; }
    .render-target { width: 720px; height: 900px; margin: 0; padding: 15px; box-sizing: border-box; position: relative; overflow: hidden; color: #ffffff; background: linear-gradient(135deg, #1a1a1a 0%, #0d0d0d 100%); }
    .shop-title { font-size: 55px; font-weight: 800; text-align: center; margin: 2px 0; letter-spacing: 2px; }
    .shop-subtitle { text-align: center; font-size: 18px; color: #cccccc; margin-bottom: 10px; }
    .subtitle-divider { border: none; border-top: 1px solid #444444; margin: 20px auto; width: 80%; }
    .icon { display: inline-block; margin: 0 10px; font-size: 32px; }
    .info-list { list-style: none; padding: 0; margin: 1px 0; text-align: center; }
    .info-list li { font-size: 18px; margin: 3px 0; color: #ffffff; }
    .info-list .icon { margin-right: 15px; font-size: 24px; }
    .cta-btn { text-align: center; font-size: 22px; font-weight: 700; padding: 15px 1px; margin: 15px auto; border-radius: 15px; border: 2px solid transparent; max-width: 400px; }
    .divider { border: none; border-top: 2px solid #444444; margin: 20px auto; width: 90%; }
    .section-price-title { text-align: center; font-size: 33px; font-weight: 700; margin: 5px 0; }
    .description { text-align: center; font-size: 16px; color: #aaaaaa; margin: 20px 0; line-height: 1.6; word-wrap: break-word; }
  </style>
  <style id="frame-style">
{{FRAME_STYLE}}
  </style>
</head>
<body>
  <div class="render-target {{FRAME_CLASS}}">
    <div>
      <h1 class="shop-title">THE BLACK SHOP</h1>
      <div class="shop-subtitle">디아블로4 시즌9 버스 · 대리 · 아이템 전문 거래소</div>
      <hr class="subtitle-divider">
    </div>
    <ul class="info-list">
      <li><span class="icon">🦾</span>모든 장비, 아이템, 재료 완비</li>
      <li><span class="icon">🚌</span>버스, 대리, 세팅 풀 지원</li>
      <li><span class="icon">🦸‍♂️</span>경험 많은 전문 기사 상시 대기</li>
      <li><span class="icon">🔥</span>합리적인 실시간 최저가 보장</li>
    </ul>
    <div class="cta-btn">💬 오픈채팅은 가격표 클릭!</div>
    <hr class="divider">
    <div>
      <h2 class="section-price-title">💰 실시간 가격표</h2>
    </div>
    <div class="description">{{TEXT}}</div>
  </div>
</body>
</html>"#;

/// Check that `text` is usable and convert its line breaks to `<br>`.
pub fn prepare_text(text: &str) -> Result<String> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("text must not be empty".into()));
    }
    Ok(text.replace("\r\n", "\n").replace('\n', "<br>"))
}

/// Render a single variant of the card.
pub fn render_variant(text: &str, variant: FrameVariant) -> Result<String> {
    let body = prepare_text(text)?;
    Ok(fill(&body, variant))
}

/// Render all four variants in ascending order.
pub fn render(text: &str) -> Result<Vec<(FrameVariant, String)>> {
    let body = prepare_text(text)?;
    Ok(FrameVariant::ALL
        .iter()
        .map(|&v| (v, fill(&body, v)))
        .collect())
}

// Text goes in last so tokens inside user text are left alone.
fn fill(body: &str, variant: FrameVariant) -> String {
    LAYOUT
        .replace(FRAME_TOKEN, &variant.class_name())
        .replace(STYLE_TOKEN, &variant.style().css())
        .replace(TEXT_TOKEN, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_text() {
        for text in ["", "   ", "\n\t "] {
            assert!(matches!(render(text), Err(Error::InvalidInput(_))));
        }
    }

    #[test]
    fn converts_line_breaks() {
        assert_eq!(prepare_text("a\nb\r\nc").unwrap(), "a<br>b<br>c");
        let html = render_variant("line1\nline2", FrameVariant::First).unwrap();
        assert!(html.contains(r#"<div class="description">line1<br>line2</div>"#));
        assert!(!html.contains("line1\nline2"));
    }

    #[test]
    fn renders_four_variants_in_order() {
        let docs = render("hello").unwrap();
        let order: Vec<u8> = docs.iter().map(|(v, _)| v.ordinal()).collect();
        assert_eq!(order, vec![1, 2, 3, 4]);
        for (v, html) in &docs {
            assert!(html.contains(&format!("render-target {}", v.class_name())));
        }
    }

    #[test]
    fn text_tokens_in_input_are_not_expanded() {
        let html = render_variant("{{FRAME_STYLE}}", FrameVariant::Second).unwrap();
        assert!(html.contains(r#"<div class="description">{{FRAME_STYLE}}</div>"#));
    }

    #[test]
    fn style_table_entries_are_distinct() {
        for (i, a) in FrameVariant::ALL.iter().enumerate() {
            for b in FrameVariant::ALL.iter().skip(i + 1) {
                assert_ne!(a.style().css(), b.style().css());
            }
        }
        assert_eq!(FrameVariant::Third.style().highlighted_item, 3);
    }

    #[test]
    fn render_target_border_box_is_card_size() {
        let rule = LAYOUT
            .lines()
            .find(|l| l.trim_start().starts_with(".render-target {"))
            .expect("render target rule");
        assert!(rule.contains(&format!("width: {}px", CARD_WIDTH)));
        assert!(rule.contains(&format!("height: {}px", CARD_HEIGHT)));
        // Padding sits inside the captured box.
        assert!(rule.contains("box-sizing: border-box"));
    }

    #[test]
    fn ordinal_round_trip() {
        for v in FrameVariant::ALL {
            assert_eq!(FrameVariant::from_ordinal(v.ordinal()), Some(v));
        }
        assert_eq!(FrameVariant::from_ordinal(0), None);
        assert_eq!(FrameVariant::from_ordinal(5), None);
    }
}

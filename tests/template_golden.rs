use std::fs;
use std::path::PathBuf;

use framecast::template::{self, FrameVariant};
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};

const SAMPLE: &str = "아이템1: 100원\n아이템2: 200원";

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

// Drop the per-variant style block and class so only structure remains.
fn structure(html: &str, variant: FrameVariant) -> String {
    let start = html.find(r#"<style id="frame-style">"#).expect("frame style block");
    let end = start + html[start..].find("</style>").expect("closing style");
    let mut out = String::with_capacity(html.len());
    out.push_str(&html[..start]);
    out.push_str(&html[end..]);
    out.replace(&variant.class_name(), "frame-N")
}

#[test]
fn each_variant_has_one_tagged_render_target() {
    let target = Selector::parse(".render-target").unwrap();
    let description = Selector::parse(".render-target .description").unwrap();

    for (variant, html) in template::render(SAMPLE).unwrap() {
        let doc = Html::parse_document(&html);
        let targets: Vec<_> = doc.select(&target).collect();
        assert_eq!(targets.len(), 1, "{}", variant);

        let classes: Vec<&str> = targets[0].value().classes().collect();
        assert!(classes.contains(&variant.class_name().as_str()), "{}: {:?}", variant, classes);

        let desc = doc.select(&description).next().expect("description");
        assert_eq!(desc.inner_html(), "아이템1: 100원<br>아이템2: 200원");
    }
}

#[test]
fn variants_differ_only_in_style_and_class() {
    let docs = template::render(SAMPLE).unwrap();
    let (first_variant, first_html) = &docs[0];
    let baseline = structure(first_html, *first_variant);

    for (variant, html) in &docs[1..] {
        assert_ne!(html, first_html);
        assert_eq!(structure(html, *variant), baseline, "{}", variant);
    }
}

#[test]
fn golden_markup_matches_fixture() {
    for (variant, html) in template::render(SAMPLE).unwrap() {
        let digest = hex::encode(Sha256::digest(html.as_bytes()));
        let expected_path = golden_path(&format!("card_frame_{}.sha256", variant.ordinal()));

        if std::env::var("UPDATE_GOLDENS").is_ok() {
            fs::create_dir_all("tests/goldens/expected").ok();
            fs::write(&expected_path, &digest).expect("write golden");
            println!("Updated golden: {:?}", expected_path);
            continue;
        }

        let exp = fs::read_to_string(&expected_path)
            .unwrap_or_else(|e| panic!("missing golden {:?} ({}); run with UPDATE_GOLDENS=1", expected_path, e));
        assert_eq!(digest, exp.trim(), "{} markup changed", variant);
    }
}

mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::*;
use image::{ImageFormat, Rgb, RgbImage};
use lopdf::content::Operation;
use pdf_compose::fill::{Paragraph, Span};
use pdf_compose::*;
use serde_json::{Value, json};
use std::io::Cursor;

/// Courier is monospaced: 6pt per character at size 10
fn mono_registry() -> Registry {
    Registry::builder()
        .font(FontFamily::courier("Mono"))
        .build()
        .unwrap()
}

struct Page {
    document: ComposedDocument,
    page_id: lopdf::ObjectId,
}

fn blank_page() -> Page {
    let mut document = ComposedDocument::new();
    let source = TemplateSource::letter("page");
    let page_id = document.import_page(&source).unwrap();
    Page { document, page_id }
}

/// A 60 x 24 point region: ten Courier characters wide, two lines of 10pt
fn small_region(kind: &str) -> RegionSpec {
    RegionSpec::new("body", kind, Rect::new(100.0, 500.0, 60.0, 24.0))
}

fn shown_text(operations: &[Operation]) -> Vec<String> {
    operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .map(|op| String::from_utf8_lossy(op.operands[0].as_str().unwrap()).into_owned())
        .collect()
}

fn text_positions(operations: &[Operation]) -> Vec<(f32, f32)> {
    operations
        .iter()
        .filter(|op| op.operator == "Td")
        .map(|op| {
            (
                op.operands[0].as_float().unwrap(),
                op.operands[1].as_float().unwrap(),
            )
        })
        .collect()
}

// =============================================================================
// Text
// =============================================================================

#[test]
fn test_text_wraps_and_overflows() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let fillers = FillerRegistry::default();
    let mut canvas = Canvas::open(&document, page_id);

    let mut entry = location_entry("aaaa bbbb cccc dddd eeee");
    entry.insert("note".to_string(), json!("kept"));
    let overflow = fillers
        .fill(&mut document, &mut canvas, &small_region("text"), &entry, &context)
        .unwrap()
        .unwrap();

    assert_eq!(shown_text(canvas.operations()), vec!["aaaa bbbb", "cccc dddd"]);
    assert_eq!(overflow["contents"], json!("eeee"));
    assert_eq!(overflow["note"], json!("kept"));
}

#[test]
fn test_text_that_fits_has_no_overflow() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let overflow = FillerRegistry::default()
        .fill(
            &mut document,
            &mut canvas,
            &small_region("text"),
            &location_entry("one\ntwo"),
            &context,
        )
        .unwrap();

    assert!(overflow.is_none());
    assert_eq!(shown_text(canvas.operations()), vec!["one", "two"]);
    // Drawing is clipped to the region
    assert_eq!(canvas.operations()[0].operator, "q");
    assert_eq!(canvas.operations()[1].operator, "re");
    assert_eq!(canvas.operations().last().unwrap().operator, "Q");
}

#[test]
fn test_text_alignment_and_baselines() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let region = small_region("text").with_field("align", "right");
    FillerRegistry::default()
        .fill(
            &mut document,
            &mut canvas,
            &region,
            &location_entry("ab\ncd"),
            &context,
        )
        .unwrap();

    let positions = text_positions(canvas.operations());
    // Two characters are 12pt wide: right aligned in 60pt starting at 100
    assert!((positions[0].0 - 148.0).abs() < 0.01);
    // Baselines one line height (12pt) apart, below the region top
    assert!((positions[0].1 - positions[1].1 - 12.0).abs() < 0.01);
    assert!(positions[0].1 < 524.0);
}

#[test]
fn test_long_word_breaks_by_character() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let overflow = FillerRegistry::default()
        .fill(
            &mut document,
            &mut canvas,
            &small_region("text"),
            &location_entry("abcdefghijklmnopqrstuvwxyz"),
            &context,
        )
        .unwrap()
        .unwrap();

    assert_eq!(
        shown_text(canvas.operations()),
        vec!["abcdefghij", "klmnopqrst"]
    );
    assert_eq!(overflow["contents"], json!("uvwxyz"));
}

#[test]
fn test_text_contents_must_be_a_string() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let result = FillerRegistry::default().fill(
        &mut document,
        &mut canvas,
        &small_region("text"),
        &location_entry(42),
        &context,
    );
    assert!(matches!(result, Err(ComposeError::InvalidLocation { .. })));
}

#[test]
fn test_text_overflow_flows_across_pages() {
    let body = RegionSpec::new("body", "text", Rect::new(72.0, 72.0, 60.0, 24.0));
    let registry = Registry::builder()
        .font(FontFamily::courier("Mono"))
        .template(
            TemplateDescription::new("page")
                .region(body)
                .overflow_to("page"),
            letter_source("page"),
        )
        .build()
        .unwrap();

    // Two lines per page, five lines of text
    let text = "aaaa bbbb cccc dddd eeee ffff gggg hhhh iiii jjjj";
    let bytes = assemble(
        None,
        &[PageData::new("page").with_contents("body", text)],
        &registry,
        &AssembleOptions::default(),
    )
    .unwrap();

    assert_eq!(page_total(&bytes), 3);
}

// =============================================================================
// Rich text
// =============================================================================

#[test]
fn test_rich_text_splits_straddling_paragraph() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let first = Paragraph::new(vec![
        Span::new("aaaa bbbb "),
        Span::new("cccc dddd eeee").styled(FontStyle::Bold),
    ]);
    let second = Paragraph::new(vec![Span::new("next")]);
    let entry = location_entry(serde_json::to_value(vec![first, second.clone()]).unwrap());

    let overflow = FillerRegistry::default()
        .fill(
            &mut document,
            &mut canvas,
            &small_region("rich-text"),
            &entry,
            &context,
        )
        .unwrap()
        .unwrap();

    assert_eq!(
        shown_text(canvas.operations()),
        vec!["aaaa", "bbbb", "cccc", "dddd"]
    );
    let rest: Vec<Paragraph> = serde_json::from_value(overflow["contents"].clone()).unwrap();
    assert_eq!(rest.len(), 2);
    assert_eq!(
        rest[0].spans,
        vec![Span::new("eeee").styled(FontStyle::Bold)]
    );
    assert_eq!(rest[1], second);
}

#[test]
fn test_rich_text_trailing_blank_lines_do_not_overflow() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let fillers = FillerRegistry::default();
    let region = RegionSpec::new("body", "rich-text", Rect::new(100.0, 500.0, 60.0, 12.0));

    let trailing = vec![Paragraph::new(vec![Span::new("aaaa\n\n")])];
    let mut canvas = Canvas::open(&document, page_id);
    let overflow = fillers
        .fill(
            &mut document,
            &mut canvas,
            &region,
            &location_entry(serde_json::to_value(&trailing).unwrap()),
            &context,
        )
        .unwrap();
    assert!(overflow.is_none());
    assert_eq!(shown_text(canvas.operations()), vec!["aaaa"]);

    // Paragraphs holding only whitespace after the cut are not carried either
    let spacers = vec![
        Paragraph::new(vec![Span::new("aaaa")]),
        Paragraph::new(vec![Span::new("\n")]),
        Paragraph::new(vec![Span::new("  ")]),
    ];
    let mut canvas = Canvas::open(&document, page_id);
    let overflow = fillers
        .fill(
            &mut document,
            &mut canvas,
            &region,
            &location_entry(serde_json::to_value(&spacers).unwrap()),
            &context,
        )
        .unwrap();
    assert!(overflow.is_none());
}

#[test]
fn test_rich_text_blank_tail_adds_no_continuation_page() {
    let body = RegionSpec::new("body", "rich-text", Rect::new(72.0, 72.0, 60.0, 12.0));
    let registry = Registry::builder()
        .font(FontFamily::courier("Mono"))
        .template(
            TemplateDescription::new("page")
                .region(body)
                .overflow_to("page"),
            letter_source("page"),
        )
        .build()
        .unwrap();

    let paragraphs = vec![Paragraph::new(vec![Span::new("aaaa\n\n")])];
    let bytes = assemble(
        None,
        &[PageData::new("page").with_contents("body", serde_json::to_value(&paragraphs).unwrap())],
        &registry,
        &AssembleOptions::default().with_page_limit(5),
    )
    .unwrap();

    assert_eq!(page_total(&bytes), 1);
}

#[test]
fn test_rich_text_uses_span_fonts() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let paragraph = Paragraph::new(vec![
        Span::new("plain "),
        Span::new("bold").styled(FontStyle::Bold),
    ]);
    let entry = location_entry(serde_json::to_value(vec![paragraph]).unwrap());
    let region = RegionSpec::new("body", "rich-text", Rect::new(0.0, 0.0, 300.0, 100.0));
    let overflow = FillerRegistry::default()
        .fill(&mut document, &mut canvas, &region, &entry, &context)
        .unwrap();
    assert!(overflow.is_none());

    let regular = context.font(None, FontStyle::Regular).unwrap().resource_name().to_string();
    let bold = context.font(None, FontStyle::Bold).unwrap().resource_name().to_string();
    let fonts: Vec<String> = canvas
        .operations()
        .iter()
        .filter(|op| op.operator == "Tf")
        .map(|op| String::from_utf8_lossy(op.operands[0].as_name().unwrap()).into_owned())
        .collect();
    assert_eq!(fonts, vec![regular, bold]);

    // "plain" then a space, both 6pt per character
    let positions = text_positions(canvas.operations());
    assert!((positions[1].0 - positions[0].0 - 36.0).abs() < 0.01);
}

#[test]
fn test_rich_text_rejects_malformed_paragraphs() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let result = FillerRegistry::default().fill(
        &mut document,
        &mut canvas,
        &small_region("rich-text"),
        &location_entry(json!([{"text": "no spans"}])),
        &context,
    );
    assert!(matches!(result, Err(ComposeError::InvalidLocation { .. })));
}

// =============================================================================
// Images
// =============================================================================

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([20, 40, 200]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

#[test]
fn test_image_is_embedded_once() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let fillers = FillerRegistry::default();
    let mut canvas = Canvas::open(&document, page_id);

    let uri = data_uri(&png_bytes(4, 2));
    let region = RegionSpec::new("logo", "image", Rect::new(0.0, 0.0, 100.0, 100.0));
    fillers
        .fill(&mut document, &mut canvas, &region, &location_entry(uri.as_str()), &context)
        .unwrap();
    let objects = document.object_count();
    fillers
        .fill(&mut document, &mut canvas, &region, &location_entry(uri.as_str()), &context)
        .unwrap();

    assert_eq!(document.object_count(), objects);
    let image = document.image(&uri).unwrap();
    assert_eq!((image.width, image.height), (4, 2));

    // Contained: 100 x 50, centred vertically
    let placement = canvas
        .operations()
        .iter()
        .find(|op| op.operator == "cm")
        .unwrap();
    let values: Vec<f32> = placement
        .operands
        .iter()
        .map(|operand| operand.as_float().unwrap())
        .collect();
    assert_eq!(values, vec![100.0, 0.0, 0.0, 50.0, 0.0, 25.0]);
}

#[test]
fn test_image_path_resolves_against_asset_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logo.png"), png_bytes(2, 2)).unwrap();

    let region = RegionSpec::new("logo", "image", Rect::new(72.0, 600.0, 144.0, 144.0))
        .with_field("fit", "stretch");
    let registry = Registry::builder()
        .asset_root(dir.path())
        .template(
            TemplateDescription::new("letterhead").region(region),
            letter_source("letterhead"),
        )
        .build()
        .unwrap();

    let bytes = assemble(
        None,
        &[PageData::new("letterhead").with_contents("logo", "logo.png")],
        &registry,
        &AssembleOptions::default(),
    )
    .unwrap();

    let (doc, pages) = output_pages(&bytes);
    let resources = doc
        .get_dictionary(pages[0])
        .unwrap()
        .get(b"Resources")
        .unwrap()
        .as_dict()
        .unwrap();
    let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
    // The template plus the image
    assert_eq!(xobjects.len(), 2);
}

#[test]
fn test_missing_image_file_is_invalid_location() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let region = RegionSpec::new("logo", "image", Rect::new(0.0, 0.0, 10.0, 10.0));
    let result = FillerRegistry::default().fill(
        &mut document,
        &mut canvas,
        &region,
        &location_entry("/definitely/not/here.png"),
        &context,
    );
    assert!(matches!(result, Err(ComposeError::InvalidLocation { region, .. }) if region == "logo"));
}

#[test]
fn test_unknown_fit_is_rejected() {
    let registry = mono_registry();
    let Page {
        mut document,
        page_id,
    } = blank_page();
    let context = registry.embed_fonts(&mut document).unwrap();
    let mut canvas = Canvas::open(&document, page_id);

    let region = RegionSpec::new("logo", "image", Rect::new(0.0, 0.0, 10.0, 10.0))
        .with_field("fit", Value::from("tile"));
    let result = FillerRegistry::default().fill(
        &mut document,
        &mut canvas,
        &region,
        &location_entry(data_uri(&png_bytes(1, 1))),
        &context,
    );
    assert!(matches!(result, Err(ComposeError::InvalidLocation { .. })));
}

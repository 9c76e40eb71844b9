//! Integration tests for blue text extraction and reconstruction

use pdf_bluetext::{
    extract_blue_paragraphs, extract_blue_text, extract_blue_text_mem, process_upload,
    BlueTextError, ColorSample, FlowStyle, Layout, LopdfReader, PageSize, Pipeline,
    RebuildOptions, SpanReader, TextSpan, OUTPUT_FILE_NAME, PDF_CONTENT_TYPE,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create a PDF with one page per content stream, all sharing Helvetica as /F1
fn pdf_with_pages(contents: &[&str]) -> Vec<u8> {
    use lopdf::{dictionary, Object, Stream};

    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut page_ids = Vec::new();
    for content in contents {
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(count),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Load a fixture, change it and serialize it again
fn edit_pdf(bytes: &[u8], edit: impl FnOnce(&mut lopdf::Document)) -> Vec<u8> {
    let mut doc = lopdf::Document::load_mem(bytes).unwrap();
    edit(&mut doc);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Point the `/Contents` of page `number` (1-indexed) at `contents`
fn set_contents(doc: &mut lopdf::Document, number: u32, contents: lopdf::Object) {
    let page_id = doc.get_pages()[&number];
    doc.get_object_mut(page_id)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("Contents", contents);
}

fn write_fixture(dir: &TempDir, name: &str, contents: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, pdf_with_pages(contents)).unwrap();
    path
}

fn output_pages(path: &Path) -> Vec<Vec<TextSpan>> {
    let reader = LopdfReader::open(path).unwrap();
    (0..reader.page_count())
        .map(|i| reader.read_page(i).unwrap())
        .collect()
}

fn layout(spans: &[TextSpan]) -> Vec<(String, f32, f32, f32)> {
    spans
        .iter()
        .map(|s| (s.text.clone(), s.x, s.y, s.font_size))
        .collect()
}

const HELLO_WORLD: &str = "BT /F1 12 Tf 0 0 0.7843 rg 10 700 Td (Hello) Tj ET \
                           BT /F1 12 Tf 0.7843 0 0 rg 10 680 Td (World) Tj ET";

// ============================================================================
// Pipeline over files
// ============================================================================

#[test]
fn test_only_blue_span_survives() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(&dir, "source.pdf", &[HELLO_WORLD]);
    let output = dir.path().join(OUTPUT_FILE_NAME);

    let report = extract_blue_text(&source, &output).unwrap();
    assert_eq!(report.page_count, 1);
    assert_eq!(report.retained, vec![1]);
    assert_eq!(report.output.as_deref(), Some(output.as_path()));

    let pages = output_pages(&output);
    assert_eq!(pages.len(), 1);
    assert_eq!(layout(&pages[0]), vec![("Hello".to_string(), 10.0, 700.0, 12.0)]);
}

#[test]
fn test_page_count_preserved_without_blue_text() {
    let dir = TempDir::new().unwrap();
    let plain = "BT /F1 12 Tf 72 720 Td (Black text) Tj ET";
    let source = write_fixture(&dir, "plain.pdf", &[plain, plain, plain]);
    let output = dir.path().join("out.pdf");

    let report = extract_blue_text(&source, &output).unwrap();
    assert!(!report.has_blue_text());
    assert!(report.degraded.is_empty());

    let pages = output_pages(&output);
    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|p| p.is_empty()));
}

#[test]
fn test_blank_pages_keep_correspondence() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(
        &dir,
        "mixed.pdf",
        &[
            "BT /F1 10 Tf 0 0 1 rg 50 500 Td (first) Tj ET",
            "BT /F1 10 Tf 50 500 Td (nothing blue) Tj ET",
            "BT /F1 10 Tf 0 0 1 rg 60 400 Td (third) Tj ET",
        ],
    );
    let output = dir.path().join("out.pdf");
    extract_blue_text(&source, &output).unwrap();

    let pages = output_pages(&output);
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0][0].text, "first");
    assert!(pages[1].is_empty());
    assert_eq!((pages[2][0].x, pages[2][0].y), (60.0, 400.0));
}

#[test]
fn test_zero_page_source() {
    let (bytes, report) = extract_blue_text_mem(&pdf_with_pages(&[])).unwrap();
    assert_eq!(report.page_count, 0);
    let reader = LopdfReader::from_bytes(&bytes).unwrap();
    assert_eq!(reader.page_count(), 0);
}

#[test]
fn test_order_preserved() {
    let content = "BT /F1 10 Tf 0 0 1 rg 10 100 Td (low) Tj ET \
                   BT /F1 10 Tf 0 0 0 rg 10 400 Td (skip) Tj ET \
                   BT /F1 10 Tf 0.1 0.2 0.9 rg 10 700 Td (high) Tj ET \
                   BT /F1 10 Tf 0 0 1 rg 10 300 Td (middle) Tj ET";
    let (bytes, _) = extract_blue_text_mem(&pdf_with_pages(&[content])).unwrap();
    let reader = LopdfReader::from_bytes(&bytes).unwrap();
    let texts: Vec<String> = reader
        .read_page(0)
        .unwrap()
        .into_iter()
        .map(|s| s.text)
        .collect();
    assert_eq!(texts, vec!["low", "high", "middle"]);
}

#[test]
fn test_runs_are_idempotent() {
    let source = pdf_with_pages(&[HELLO_WORLD, "BT /F1 9 Tf 0 0 1 rg 30 30 Td (foot) Tj ET"]);
    let (first, _) = extract_blue_text_mem(&source).unwrap();
    let (second, _) = extract_blue_text_mem(&source).unwrap();

    let first = LopdfReader::from_bytes(&first).unwrap();
    let second = LopdfReader::from_bytes(&second).unwrap();
    assert_eq!(first.page_count(), second.page_count());
    for i in 0..first.page_count() {
        assert_eq!(
            layout(&first.read_page(i).unwrap()),
            layout(&second.read_page(i).unwrap())
        );
    }
}

#[test]
fn test_output_is_blue_again() {
    let (bytes, _) = extract_blue_text_mem(&pdf_with_pages(&[HELLO_WORLD])).unwrap();
    let (again, report) = extract_blue_text_mem(&bytes).unwrap();
    assert_eq!(report.retained, vec![1]);
    assert!(!again.is_empty());
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_missing_source_is_unreadable() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.pdf");
    let result = extract_blue_text(dir.path().join("missing.pdf"), &output);
    assert!(matches!(result, Err(BlueTextError::UnreadableDocument(_))));
    assert!(!output.exists());
}

#[test]
fn test_corrupt_source_is_unreadable() {
    let result = extract_blue_text_mem(b"%PDF-1.4\nthis is not really a pdf");
    assert!(matches!(result, Err(BlueTextError::UnreadableDocument(_))));
}

/// Wraps a real reader and fails one page
struct FailingPage {
    inner: LopdfReader,
    fail_at: usize,
}

impl SpanReader for FailingPage {
    fn page_count(&self) -> usize {
        self.inner.page_count()
    }

    fn read_page(&self, index: usize) -> Result<Vec<TextSpan>, BlueTextError> {
        if index == self.fail_at {
            return Err(BlueTextError::PageExtraction {
                page: index,
                reason: "content stream could not be decoded".into(),
            });
        }
        self.inner.read_page(index)
    }
}

#[test]
fn test_failed_page_degrades_to_blank() {
    let blue = "BT /F1 10 Tf 0 0 1 rg 20 20 Td (kept) Tj ET";
    let source = FailingPage {
        inner: LopdfReader::from_bytes(&pdf_with_pages(&[blue, blue, blue])).unwrap(),
        fail_at: 1,
    };
    let mut writer = pdf_bluetext::LopdfWriter::default();
    let report = Pipeline::new().rebuild(&source, &mut writer);

    assert_eq!(report.page_count, 3);
    assert_eq!(report.degraded_indices(), vec![1]);
    assert_eq!(report.retained, vec![1, 0, 1]);

    let rebuilt = LopdfReader::from_bytes(&writer.to_bytes().unwrap()).unwrap();
    assert_eq!(rebuilt.page_count(), 3);
    assert_eq!(rebuilt.read_page(0).unwrap()[0].text, "kept");
    assert!(rebuilt.read_page(1).unwrap().is_empty());
    assert_eq!(rebuilt.read_page(2).unwrap()[0].text, "kept");
}

#[test]
fn test_corrupt_page_stream_degrades_only_that_page() {
    use lopdf::{dictionary, Object, Stream};

    let source = edit_pdf(&pdf_with_pages(&[HELLO_WORLD, HELLO_WORLD, HELLO_WORLD]), |doc| {
        let junk = doc.add_object(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            b"\xde\xad\xbe\xef not deflate data".to_vec(),
        ));
        set_contents(doc, 2, Object::Reference(junk));
    });

    let (bytes, report) = extract_blue_text_mem(&source).unwrap();
    assert_eq!(report.degraded_indices(), vec![1]);
    assert_eq!(report.retained, vec![1, 0, 1]);

    let reader = LopdfReader::from_bytes(&bytes).unwrap();
    assert_eq!(reader.page_count(), 3);
    assert!(reader.read_page(1).unwrap().is_empty());
    assert_eq!(reader.read_page(2).unwrap()[0].text, "Hello");
}

#[test]
fn test_missing_content_object_degrades_page() {
    let source = edit_pdf(&pdf_with_pages(&[HELLO_WORLD, HELLO_WORLD]), |doc| {
        set_contents(doc, 1, lopdf::Object::Reference((9999, 0)));
    });

    let (_, report) = extract_blue_text_mem(&source).unwrap();
    assert_eq!(report.degraded_indices(), vec![0]);
    assert_eq!(report.retained, vec![0, 1]);
}

// ============================================================================
// Form XObjects
// ============================================================================

#[test]
fn test_blue_text_inside_form_is_kept() {
    use lopdf::{dictionary, Object, Stream};

    let source = edit_pdf(&pdf_with_pages(&["/Fm0 Do"]), |doc| {
        // No /Resources of its own; the form uses the page's /F1
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
            },
            HELLO_WORLD.as_bytes().to_vec(),
        ));
        let page_id = doc.get_pages()[&1];
        doc.get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .get_mut(b"Resources")
            .unwrap()
            .as_dict_mut()
            .unwrap()
            .set(
                "XObject",
                dictionary! { "Fm0" => Object::Reference(form_id) },
            );
    });

    let (bytes, report) = extract_blue_text_mem(&source).unwrap();
    assert_eq!(report.retained, vec![1]);
    let reader = LopdfReader::from_bytes(&bytes).unwrap();
    assert_eq!(
        layout(&reader.read_page(0).unwrap()),
        vec![("Hello".to_string(), 10.0, 700.0, 12.0)]
    );
}

// ============================================================================
// Configuration and rules
// ============================================================================

#[test]
fn test_custom_rule_and_options() {
    let source = pdf_with_pages(&[HELLO_WORLD]);
    let pipeline = Pipeline::with_rule(|c: ColorSample| c.r > c.b).with_options(RebuildOptions {
        match_source_page_size: true,
        text_color: None,
        ..Default::default()
    });
    let (bytes, report) = pipeline.run_mem(&source).unwrap();
    assert_eq!(report.retained, vec![1]);

    let reader = LopdfReader::from_bytes(&bytes).unwrap();
    let spans = reader.read_page(0).unwrap();
    assert_eq!(spans[0].text, "World");
    assert_eq!(spans[0].color, Some(ColorSample::BLACK));
    assert_eq!(
        reader.page_size(0),
        Some(PageSize {
            width: 612.0,
            height: 792.0
        })
    );
}

#[test]
fn test_default_output_page_is_a4() {
    let (bytes, _) = extract_blue_text_mem(&pdf_with_pages(&[HELLO_WORLD])).unwrap();
    let reader = LopdfReader::from_bytes(&bytes).unwrap();
    assert_eq!(reader.page_size(0), Some(PageSize::A4));
}

#[test]
fn test_flow_layout_output() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(&dir, "source.pdf", &[HELLO_WORLD, "", HELLO_WORLD]);
    let output = dir.path().join("flow.pdf");

    let report = Pipeline::new()
        .with_options(RebuildOptions {
            layout: Layout::Flow(FlowStyle::PARAGRAPH),
            ..Default::default()
        })
        .run(&source, &output)
        .unwrap();
    assert_eq!(report.page_count, 3);
    assert_eq!(report.output_pages, 1);

    let pages = output_pages(&output);
    assert_eq!(pages.len(), 1);
    let texts: Vec<&str> = pages[0].iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["[hal 1] Hello", "[hal 3] Hello"]);
    assert!(pages[0].iter().all(|s| s.x == 50.0));
    assert!(pages[0][0].y > pages[0][1].y);
    assert_eq!(pages[0][0].color, Some(ColorSample::new(0, 0, 255)));
}

// ============================================================================
// Paragraphs and uploads
// ============================================================================

#[test]
fn test_paragraphs_from_file() {
    let dir = TempDir::new().unwrap();
    let source = write_fixture(
        &dir,
        "para.pdf",
        &[
            "BT /F1 11 Tf 0 0 1 rg 10 700 Td (Line one) Tj 0 -14 Td (Line two) Tj \
             0 g 0 -14 Td (black) Tj ET",
            "BT /F1 11 Tf 0 0 0.9 rg 10 700 Td (Next page) Tj ET",
        ],
    );
    let paragraphs = extract_blue_paragraphs(&source).unwrap();
    assert_eq!(paragraphs.len(), 2);
    assert_eq!(paragraphs[0].text, "Line one\nLine two");
    assert_eq!(paragraphs[0].page, 1);
    assert_eq!(paragraphs[1].text, "Next page");
    assert_eq!(paragraphs[1].page, 2);
}

#[test]
fn test_upload_round_trip() {
    let download = process_upload("laporan.PDF", &pdf_with_pages(&[HELLO_WORLD])).unwrap();
    assert_eq!(download.file_name, "teks_biru.pdf");
    assert_eq!(download.content_type, PDF_CONTENT_TYPE);
    assert!(download.report.output.is_none());
    assert!(download.bytes.starts_with(b"%PDF"));

    let reader = LopdfReader::from_bytes(&download.bytes).unwrap();
    assert_eq!(reader.read_page(0).unwrap()[0].text, "Hello");
}

#[test]
fn test_upload_rejects_non_pdf_name() {
    let result = process_upload("scan.png", &pdf_with_pages(&[HELLO_WORLD]));
    assert!(matches!(result, Err(BlueTextError::InvalidUpload(_))));
}

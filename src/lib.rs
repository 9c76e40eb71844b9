//! Blue text extraction and PDF reconstruction using lopdf
//!
//! This crate provides:
//! - Per-span color, position and size extraction from PDF content streams
//! - A replaceable color rule deciding which spans count as blue
//! - Reconstruction of a new PDF holding only the kept spans, one page per source page
//! - Alternatively, a flowing paragraph layout of the kept text

pub mod color;
pub mod extractor;
pub mod flow;
pub mod paragraphs;
pub mod pipeline;
pub mod upload;
pub mod writer;

pub use color::{is_blue, BlueDominance, ColorRule, ColorSample};
pub use extractor::{LopdfReader, PageSize, SpanReader, TextSpan};
pub use flow::FlowStyle;
pub use paragraphs::{group_paragraphs, Paragraph};
pub use pipeline::{
    BlueTextReport, DegradedPage, Layout, PageOutcome, PageSpans, Pipeline, RebuildOptions,
};
pub use upload::{process_upload, Download};
pub use writer::{LopdfWriter, PdfWriter};

use std::path::Path;

/// File name given to the generated document
pub const OUTPUT_FILE_NAME: &str = "teks_biru.pdf";

/// MIME type of both the accepted upload and the generated document
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Keep only the blue text of `source`, writing the rebuilt document to `output`
///
/// Uses the default [`BlueDominance`] rule. Fails only when the source cannot be
/// opened or the output cannot be written; pages that fail extraction come out
/// blank and are listed in the report.
pub fn extract_blue_text<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    output: Q,
) -> Result<BlueTextReport, BlueTextError> {
    Pipeline::default().run(source, output)
}

/// Same as [`extract_blue_text`] over in-memory documents
pub fn extract_blue_text_mem(buffer: &[u8]) -> Result<(Vec<u8>, BlueTextReport), BlueTextError> {
    Pipeline::default().run_mem(buffer)
}

/// Blue paragraphs of a PDF file, in page order
pub fn extract_blue_paragraphs<P: AsRef<Path>>(source: P) -> Result<Vec<Paragraph>, BlueTextError> {
    let reader = LopdfReader::open(source)?;
    Ok(Pipeline::default().paragraphs(&reader))
}

#[derive(Debug, thiserror::Error)]
pub enum BlueTextError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unreadable document: {0}")]
    UnreadableDocument(String),
    #[error("page {page} extraction failed: {reason}")]
    PageExtraction { page: usize, reason: String },
    #[error("PDF write error: {0}")]
    Write(String),
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}

//! Extraction-and-rebuild pipeline
//!
//! Reads every page of a source, keeps the spans accepted by a [`ColorRule`]
//! and writes them to a fresh document with one output page per source page.
//! A page whose extraction fails is written blank and reported rather than
//! aborting the run. With [`Layout::Flow`] the kept text is instead laid out
//! as labeled paragraphs on as many pages as it needs.

use crate::color::{BlueDominance, ColorRule, ColorSample};
use crate::extractor::{LopdfReader, PageSize, SpanReader, TextSpan};
use crate::flow::{layout_paragraphs, FlowStyle};
use crate::paragraphs::{group_paragraphs, Paragraph};
use crate::writer::{LopdfWriter, PdfWriter};
use crate::BlueTextError;
use std::path::{Path, PathBuf};

/// Placement of the kept text in the output
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Layout {
    /// Each span at its source position, one output page per source page
    #[default]
    Positioned,
    /// Paragraphs flowed from the top of the page, labeled with their source page
    Flow(FlowStyle),
}

/// Options for the rebuilt document
#[derive(Debug, Clone)]
pub struct RebuildOptions {
    /// Size of every output page (default: A4, 595x842)
    pub page_size: PageSize,
    /// Use the source page's MediaBox when available instead of `page_size`
    pub match_source_page_size: bool,
    /// Standard Type1 font used for all text (default: Helvetica)
    pub base_font: String,
    /// Fill color of the re-emitted text; `None` leaves it black
    pub text_color: Option<ColorSample>,
    /// Stand-in for characters the WinAnsi font cannot show; `None` drops them
    pub unencodable: Option<char>,
    pub layout: Layout,
}

impl Default for RebuildOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            match_source_page_size: false,
            base_font: "Helvetica".to_string(),
            text_color: Some(ColorSample::new(0, 0, 255)),
            unencodable: Some('?'),
            layout: Layout::Positioned,
        }
    }
}

/// How a page's extraction went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Extracted,
    /// Extraction failed; the page is treated as having no spans
    Degraded { reason: String },
}

/// Kept spans of one source page, in extraction order
#[derive(Debug, Clone)]
pub struct PageSpans {
    /// Page index (0-indexed)
    pub index: usize,
    pub spans: Vec<TextSpan>,
    pub outcome: PageOutcome,
}

impl PageSpans {
    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, PageOutcome::Degraded { .. })
    }
}

/// A page that came out blank because its extraction failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedPage {
    /// Page index (0-indexed)
    pub index: usize,
    pub reason: String,
}

/// Summary of a pipeline run
#[derive(Debug, Clone, Default)]
pub struct BlueTextReport {
    /// Pages in the source
    pub page_count: usize,
    /// Pages written; equal to `page_count` unless the layout is [`Layout::Flow`]
    pub output_pages: usize,
    /// Number of kept spans per page
    pub retained: Vec<usize>,
    /// Pages whose extraction failed
    pub degraded: Vec<DegradedPage>,
    /// Where the output was written, when written to a file that outlives the run
    pub output: Option<PathBuf>,
}

impl BlueTextReport {
    pub fn total_retained(&self) -> usize {
        self.retained.iter().sum()
    }

    /// False when no page kept any span; the output is then all blank pages
    pub fn has_blue_text(&self) -> bool {
        self.total_retained() > 0
    }

    pub fn degraded_indices(&self) -> Vec<usize> {
        self.degraded.iter().map(|d| d.index).collect()
    }

    fn record(&mut self, page: PageSpans) {
        self.retained.push(page.spans.len());
        if let PageOutcome::Degraded { reason } = page.outcome {
            self.degraded.push(DegradedPage {
                index: page.index,
                reason,
            });
        }
    }
}

/// The extraction-and-rebuild pipeline, parameterized by its color rule
#[derive(Debug, Clone)]
pub struct Pipeline<R = BlueDominance> {
    rule: R,
    options: RebuildOptions,
}

impl Pipeline<BlueDominance> {
    pub fn new() -> Self {
        Self::with_rule(BlueDominance::default())
    }
}

impl Default for Pipeline<BlueDominance> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ColorRule> Pipeline<R> {
    /// Pipeline keeping the spans `rule` accepts
    pub fn with_rule(rule: R) -> Self {
        Self {
            rule,
            options: RebuildOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RebuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }

    pub fn options(&self) -> &RebuildOptions {
        &self.options
    }

    /// Read and filter every page of `source`
    pub fn collect<S: SpanReader>(&self, source: &S) -> Vec<PageSpans> {
        (0..source.page_count())
            .map(|index| self.read(source, index).0)
            .collect()
    }

    /// Write the kept spans of `source` into `writer` following the configured layout
    pub fn rebuild<S: SpanReader, W: PdfWriter>(&self, source: &S, writer: &mut W) -> BlueTextReport {
        let mut report = match self.options.layout {
            Layout::Positioned => self.rebuild_positioned(source, writer),
            Layout::Flow(style) => self.rebuild_flow(source, style, writer),
        };
        report.output_pages = writer.page_count();

        log::info!(
            "rebuilt {} pages into {}, kept {} spans, {} degraded",
            report.page_count,
            report.output_pages,
            report.total_retained(),
            report.degraded.len()
        );
        if !report.has_blue_text() {
            log::info!("no blue text found");
        }
        report
    }

    fn rebuild_positioned<S: SpanReader, W: PdfWriter>(
        &self,
        source: &S,
        writer: &mut W,
    ) -> BlueTextReport {
        let pages = self.collect(source);
        let mut report = BlueTextReport {
            page_count: pages.len(),
            ..Default::default()
        };

        for page in pages {
            writer.add_page(self.output_page_size(source, page.index));
            for span in &page.spans {
                writer.place_text(&span.text, span.x, span.y, span.font_size);
            }
            report.record(page);
        }
        report
    }

    fn rebuild_flow<S: SpanReader, W: PdfWriter>(
        &self,
        source: &S,
        style: FlowStyle,
        writer: &mut W,
    ) -> BlueTextReport {
        let mut report = BlueTextReport {
            page_count: source.page_count(),
            ..Default::default()
        };
        let mut paragraphs = Vec::new();
        for index in 0..source.page_count() {
            let (page, page_paragraphs) = self.read(source, index);
            paragraphs.extend(page_paragraphs);
            report.record(page);
        }
        layout_paragraphs(&paragraphs, style, self.options.page_size, writer);
        report
    }

    /// Paragraphs of consecutive kept spans, across all pages of `source`
    pub fn paragraphs<S: SpanReader>(&self, source: &S) -> Vec<Paragraph> {
        (0..source.page_count())
            .flat_map(|index| self.read(source, index).1)
            .collect()
    }

    /// Kept spans and paragraphs of one page; a failed page has neither
    fn read<S: SpanReader>(&self, source: &S, index: usize) -> (PageSpans, Vec<Paragraph>) {
        match source.read_page(index) {
            Ok(spans) => {
                let paragraphs = group_paragraphs(&spans, &self.rule);
                let total = spans.len();
                let kept: Vec<TextSpan> = spans
                    .into_iter()
                    .filter(|span| self.rule.accepts(span.color))
                    .collect();
                log::debug!("page {}: kept {} of {} spans", index + 1, kept.len(), total);
                let page = PageSpans {
                    index,
                    spans: kept,
                    outcome: PageOutcome::Extracted,
                };
                (page, paragraphs)
            }
            Err(e) => {
                log::warn!("page {} degraded to blank: {}", index + 1, e);
                let page = PageSpans {
                    index,
                    spans: Vec::new(),
                    outcome: PageOutcome::Degraded {
                        reason: e.to_string(),
                    },
                };
                (page, Vec::new())
            }
        }
    }

    /// Rebuild the PDF at `source` into a new file at `output`
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        source: P,
        output: Q,
    ) -> Result<BlueTextReport, BlueTextError> {
        let reader = LopdfReader::open(source)?;
        let mut writer = self.new_writer();
        let mut report = self.rebuild(&reader, &mut writer);
        writer.save(output.as_ref())?;
        report.output = Some(output.as_ref().to_path_buf());
        Ok(report)
    }

    /// Rebuild an in-memory PDF
    pub fn run_mem(&self, buffer: &[u8]) -> Result<(Vec<u8>, BlueTextReport), BlueTextError> {
        let reader = LopdfReader::from_bytes(buffer)?;
        let mut writer = self.new_writer();
        let report = self.rebuild(&reader, &mut writer);
        Ok((writer.to_bytes()?, report))
    }

    fn new_writer(&self) -> LopdfWriter {
        LopdfWriter::new(&self.options.base_font, self.options.text_color)
            .with_unencodable(self.options.unencodable)
    }

    fn output_page_size<S: SpanReader>(&self, source: &S, index: usize) -> PageSize {
        if self.options.match_source_page_size {
            source.page_size(index).unwrap_or(self.options.page_size)
        } else {
            self.options.page_size
        }
    }
}

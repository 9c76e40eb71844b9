//! Flow layout of blue paragraphs
//!
//! Instead of re-emitting spans at their source positions, paragraphs are
//! written top to bottom from the left margin, each prefixed with the number
//! of the page it came from. New output pages are started as the text runs
//! past the bottom margin, so the output page count follows the amount of
//! text rather than the source.

use crate::extractor::PageSize;
use crate::paragraphs::Paragraph;
use crate::writer::PdfWriter;

/// Margin on every side, in points
const MARGIN: f32 = 50.0;

/// Largest font size written
const MAX_FONT_SIZE: f32 = 12.0;

/// Line step as a multiple of the font size under tight spacing
const TIGHT_LINE_MULT: f32 = 1.05;

/// Vertical rhythm of a flow layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowStyle {
    /// Line step when spacing is not tight
    pub line_height: f32,
    /// Extra space after each line
    pub line_gap: f32,
    /// Extra space after each paragraph
    pub para_gap: f32,
    /// Always use tight spacing, even for multi-page sources
    pub tight: bool,
}

impl FlowStyle {
    /// Readable spacing
    pub const PARAGRAPH: FlowStyle = FlowStyle {
        line_height: 12.0,
        line_gap: 1.0,
        para_gap: 4.0,
        tight: false,
    };

    /// Lines packed together, for lists
    pub const COMPACT: FlowStyle = FlowStyle {
        line_height: 10.0,
        line_gap: 0.0,
        para_gap: 1.0,
        tight: true,
    };

    /// One line after another, for tabular text
    pub const LINES: FlowStyle = FlowStyle {
        line_height: 12.0,
        line_gap: 1.0,
        para_gap: 2.0,
        tight: false,
    };
}

impl Default for FlowStyle {
    fn default() -> Self {
        Self::PARAGRAPH
    }
}

/// Label put in front of each paragraph
pub fn page_label(page: u32) -> String {
    format!("[hal {}] ", page)
}

/// Write `paragraphs` into `writer` as flowing text on pages of `page_size`
///
/// At least one page is always added. Returns the number of pages added.
pub fn layout_paragraphs<W: PdfWriter + ?Sized>(
    paragraphs: &[Paragraph],
    style: FlowStyle,
    page_size: PageSize,
    writer: &mut W,
) -> usize {
    let mut pages = Cursor::new(page_size, writer);

    let single_source_page = paragraphs
        .first()
        .map(|first| paragraphs.iter().all(|p| p.page == first.page))
        .unwrap_or(true);
    let tight = single_source_page || style.tight;
    let (line_gap, para_gap) = if tight {
        (0.0, 0.0)
    } else {
        (style.line_gap, style.para_gap)
    };

    let mut previous_page = None;
    for paragraph in paragraphs {
        if paragraph.text.trim().is_empty() {
            continue;
        }
        let size = paragraph.font_size.min(MAX_FONT_SIZE);
        let (line_step, empty_line_step, min_line) = if tight {
            (
                size * TIGHT_LINE_MULT,
                size * TIGHT_LINE_MULT * 0.4,
                size * (TIGHT_LINE_MULT + 0.3),
            )
        } else {
            (style.line_height + line_gap, style.line_height * 0.5, style.line_height)
        };

        // One blank line between text of different source pages
        if previous_page.is_some_and(|p| p != paragraph.page) {
            pages.advance(line_step, min_line);
        }
        previous_page = Some(paragraph.page);

        let labeled = format!("{}{}", page_label(paragraph.page), paragraph.text);
        for line in labeled.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                pages.y += empty_line_step;
                continue;
            }
            pages.place(line, size);
            pages.advance(line_step, min_line);
        }
        pages.advance(para_gap, min_line);
    }

    pages.count
}

/// Write position, measured downward from the top edge
struct Cursor<'w, W: PdfWriter + ?Sized> {
    writer: &'w mut W,
    page_size: PageSize,
    y: f32,
    count: usize,
}

impl<'w, W: PdfWriter + ?Sized> Cursor<'w, W> {
    fn new(page_size: PageSize, writer: &'w mut W) -> Self {
        writer.add_page(page_size);
        Self {
            writer,
            page_size,
            y: MARGIN,
            count: 1,
        }
    }

    fn place(&mut self, line: &str, size: f32) {
        let baseline = self.page_size.height - (self.y + size * 0.9);
        self.writer.place_text(line, MARGIN, baseline, size);
    }

    /// Move down by `step`, starting a new page when `min_line` no longer fits
    fn advance(&mut self, step: f32, min_line: f32) {
        self.y += step;
        if self.y > self.page_size.height - MARGIN - min_line {
            self.writer.add_page(self.page_size);
            self.y = MARGIN;
            self.count += 1;
        }
    }
}

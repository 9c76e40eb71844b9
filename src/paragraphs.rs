//! Grouping of kept spans into paragraphs
//!
//! Consecutive kept spans of the same text object form one paragraph. Any
//! rejected span in between, a new text object or a new page ends it.

use crate::color::ColorRule;
use crate::extractor::TextSpan;

/// Text of consecutive kept spans
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// Page number (1-indexed)
    pub page: u32,
    /// Span texts joined by newlines
    pub text: String,
    /// Font size of the first span
    pub font_size: f32,
}

/// Group a page's full span list (kept and rejected) into paragraphs
pub fn group_paragraphs<R: ColorRule + ?Sized>(spans: &[TextSpan], rule: &R) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&TextSpan> = Vec::new();

    for span in spans {
        if !rule.accepts(span.color) {
            flush(&mut current, &mut paragraphs);
            continue;
        }
        let continues = current
            .last()
            .is_some_and(|last| last.page == span.page && last.block == span.block);
        if !continues {
            flush(&mut current, &mut paragraphs);
        }
        current.push(span);
    }
    flush(&mut current, &mut paragraphs);

    paragraphs
}

fn flush(current: &mut Vec<&TextSpan>, out: &mut Vec<Paragraph>) {
    let Some(first) = current.first() else {
        return;
    };
    let lines: Vec<&str> = current
        .iter()
        .map(|s| s.text.as_str())
        .filter(|t| !t.is_empty())
        .collect();
    if !lines.is_empty() {
        out.push(Paragraph {
            page: first.page,
            text: lines.join("\n"),
            font_size: first.font_size,
        });
    }
    current.clear();
}

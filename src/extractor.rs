//! Span extraction from PDF using lopdf
//!
//! This module walks each page's content stream, and the Form XObjects it
//! draws, yielding text spans with the fill color they were painted in, their
//! position and their rendered size.

use crate::color::ColorSample;
use crate::BlueTextError;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::path::Path;

/// A run of text sharing one color, position and font size
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// The text content (trimmed)
    pub text: String,
    /// X position on page
    pub x: f32,
    /// Y position on page (PDF coordinates, origin at bottom-left)
    pub y: f32,
    /// Rendered font size
    pub font_size: f32,
    /// Font resource name
    pub font: String,
    /// Fill color, `None` when the color space could not be resolved to RGB
    pub color: Option<ColorSample>,
    /// Index of the `BT`/`ET` text object on the page
    pub block: u32,
    /// Page number (1-indexed)
    pub page: u32,
}

/// Page size in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// A4 portrait
    pub const A4: PageSize = PageSize {
        width: 595.0,
        height: 842.0,
    };
}

/// Source of per-page text spans
pub trait SpanReader {
    /// Number of pages in the source
    fn page_count(&self) -> usize;

    /// Spans of the page at `index` (0-indexed), in content stream order
    fn read_page(&self, index: usize) -> Result<Vec<TextSpan>, BlueTextError>;

    /// Size of the page at `index`, if known
    fn page_size(&self, _index: usize) -> Option<PageSize> {
        None
    }
}

/// [`SpanReader`] over a document loaded with lopdf
pub struct LopdfReader {
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl LopdfReader {
    /// Open a PDF file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BlueTextError> {
        let doc = Document::load(path.as_ref()).map_err(|e| {
            BlueTextError::UnreadableDocument(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self::from_document(doc))
    }

    /// Open a PDF held in memory
    pub fn from_bytes(buffer: &[u8]) -> Result<Self, BlueTextError> {
        let doc = Document::load_mem(buffer)
            .map_err(|e| BlueTextError::UnreadableDocument(e.to_string()))?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let page_ids = doc.get_pages().into_values().collect();
        Self { doc, page_ids }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

impl SpanReader for LopdfReader {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn read_page(&self, index: usize) -> Result<Vec<TextSpan>, BlueTextError> {
        let page_id = *self.page_ids.get(index).ok_or_else(|| BlueTextError::PageExtraction {
            page: index,
            reason: "page index out of range".into(),
        })?;
        extract_page_spans(&self.doc, page_id, index as u32 + 1).map_err(|e| match e {
            BlueTextError::PageExtraction { reason, .. } => {
                BlueTextError::PageExtraction { page: index, reason }
            }
            other => BlueTextError::PageExtraction {
                page: index,
                reason: other.to_string(),
            },
        })
    }

    fn page_size(&self, index: usize) -> Option<PageSize> {
        let page_id = *self.page_ids.get(index)?;
        media_box(&self.doc, page_id)
    }
}

/// Read the page MediaBox, following inheritance through `Parent`
fn media_box(doc: &Document, page_id: ObjectId) -> Option<PageSize> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    // Page trees are shallow; the bound guards against Parent cycles
    for _ in 0..32 {
        if let Ok(obj) = dict.get(b"MediaBox") {
            let values: Vec<f32> = resolve(doc, obj)
                .as_array()
                .ok()?
                .iter()
                .filter_map(get_number)
                .collect();
            if values.len() == 4 {
                return Some(PageSize {
                    width: (values[2] - values[0]).abs(),
                    height: (values[3] - values[1]).abs(),
                });
            }
            return None;
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Fill color space, as far as it can be mapped to RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FillSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Pattern, Separation, Indexed, DeviceN or anything unknown
    Unsupported,
}

impl FillSpace {
    fn from_components(n: i64) -> Self {
        match n {
            1 => FillSpace::Gray,
            3 => FillSpace::Rgb,
            4 => FillSpace::Cmyk,
            _ => FillSpace::Unsupported,
        }
    }

    /// Initial color after `cs` selects this space
    fn initial_color(self) -> Option<ColorSample> {
        match self {
            FillSpace::Unsupported => None,
            _ => Some(ColorSample::BLACK),
        }
    }

    fn color(self, components: &[f32]) -> Option<ColorSample> {
        match (self, components) {
            (FillSpace::Gray, [g, ..]) => Some(ColorSample::from_gray(*g)),
            (FillSpace::Rgb, [r, g, b, ..]) => Some(ColorSample::from_unit_rgb(*r, *g, *b)),
            (FillSpace::Cmyk, [c, m, y, k, ..]) => Some(ColorSample::from_cmyk(*c, *m, *y, *k)),
            _ => None,
        }
    }
}

/// State saved and restored by `q`/`Q`
#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: [f32; 6],
    fill_space: FillSpace,
    fill: Option<ColorSample>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            fill_space: FillSpace::Gray,
            fill: Some(ColorSample::BLACK),
        }
    }
}

/// Text state tracking
struct TextState {
    font: String,
    font_size: f32,
    leading: Option<f32>,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    in_text_block: bool,
}

impl TextState {
    fn new() -> Self {
        Self {
            font: String::new(),
            font_size: 12.0,
            leading: None,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            in_text_block: false,
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        let translated = multiply_matrices(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.line_matrix = translated;
        self.text_matrix = translated;
    }

    fn next_line(&mut self) {
        // Approximate line height when no leading was set
        let leading = self.leading.unwrap_or(self.font_size * 1.2);
        self.move_line(0.0, -leading);
    }

    /// Advance horizontally by `tx` text space units
    fn advance(&mut self, tx: f32) {
        self.text_matrix[4] += tx * self.text_matrix[0];
        self.text_matrix[5] += tx * self.text_matrix[1];
    }
}

/// Glyph widths of a simple font, in thousandths of text space
struct FontMetrics {
    first_char: i64,
    widths: Vec<f32>,
    bytes_per_code: usize,
}

impl FontMetrics {
    const DEFAULT_WIDTH: f32 = 500.0;

    fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let is_type0 = font
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|s| s == b"Type0")
            .unwrap_or(false);
        let first_char = font
            .get(b"FirstChar")
            .and_then(|o| o.as_i64())
            .unwrap_or(0);
        let widths: Vec<f32> = font
            .get(b"Widths")
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_array())
            .map(|arr| arr.iter().filter_map(|w| get_number(resolve(doc, w))).collect())
            .unwrap_or_default();
        Self {
            first_char,
            widths,
            bytes_per_code: if is_type0 { 2 } else { 1 },
        }
    }

    fn fallback() -> Self {
        Self {
            first_char: 0,
            widths: Vec::new(),
            bytes_per_code: 1,
        }
    }

    /// Width of an encoded string in text space, before font size scaling
    fn string_width(&self, bytes: &[u8]) -> f32 {
        if self.bytes_per_code == 2 {
            return bytes.len().div_ceil(2) as f32 * Self::DEFAULT_WIDTH / 1000.0;
        }
        bytes
            .iter()
            .map(|&code| {
                let idx = code as i64 - self.first_char;
                if idx >= 0 {
                    self.widths
                        .get(idx as usize)
                        .copied()
                        .filter(|w| *w > 0.0)
                        .unwrap_or(Self::DEFAULT_WIDTH)
                } else {
                    Self::DEFAULT_WIDTH
                }
            })
            .sum::<f32>()
            / 1000.0
    }
}

/// Form XObjects nested deeper than this are not followed
const MAX_FORM_DEPTH: usize = 8;

/// Named resources visible to one content stream
struct Resources<'a> {
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    color_spaces: BTreeMap<Vec<u8>, FillSpace>,
    xobjects: BTreeMap<Vec<u8>, ObjectId>,
}

impl<'a> Resources<'a> {
    /// Page resources merged along the `Parent` chain, nearest entry first
    fn for_page(doc: &'a Document, page_id: ObjectId) -> Self {
        let mut resources = Self {
            fonts: doc.get_page_fonts(page_id).unwrap_or_default(),
            color_spaces: BTreeMap::new(),
            xobjects: BTreeMap::new(),
        };
        for dict in inherited_resource_dicts(doc, page_id) {
            resources.absorb(doc, dict, false);
        }
        resources
    }

    /// Form resources layered over those of the stream invoking the form
    fn for_form(doc: &'a Document, form: &'a Stream, parent: &Resources<'a>) -> Self {
        let mut resources = Self {
            fonts: parent.fonts.clone(),
            color_spaces: parent.color_spaces.clone(),
            xobjects: parent.xobjects.clone(),
        };
        if let Ok(dict) = form
            .dict
            .get(b"Resources")
            .map(|r| resolve(doc, r))
            .and_then(|r| r.as_dict())
        {
            resources.absorb(doc, dict, true);
        }
        resources
    }

    /// Take the entries of a `/Resources` dictionary; `shadow` lets them replace known names
    fn absorb(&mut self, doc: &'a Document, dict: &'a Dictionary, shadow: bool) {
        if let Some(fonts) = sub_dict(doc, dict, b"Font") {
            for (name, value) in fonts.iter() {
                if let Ok(font) = resolve(doc, value).as_dict() {
                    put(&mut self.fonts, name, font, shadow);
                }
            }
        }
        if let Some(spaces) = sub_dict(doc, dict, b"ColorSpace") {
            for (name, value) in spaces.iter() {
                let space = resolve_color_space(doc, resolve(doc, value));
                put(&mut self.color_spaces, name, space, shadow);
            }
        }
        if let Some(xobjects) = sub_dict(doc, dict, b"XObject") {
            for (name, value) in xobjects.iter() {
                if let Ok(id) = value.as_reference() {
                    put(&mut self.xobjects, name, id, shadow);
                }
            }
        }
    }
}

fn put<V>(map: &mut BTreeMap<Vec<u8>, V>, name: &[u8], value: V, shadow: bool) {
    if shadow || !map.contains_key(name) {
        map.insert(name.to_vec(), value);
    }
}

fn sub_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    dict.get(key).map(|o| resolve(doc, o)).and_then(|o| o.as_dict()).ok()
}

/// `/Resources` of the page and of each ancestor, nearest first
fn inherited_resource_dicts(doc: &Document, page_id: ObjectId) -> Vec<&Dictionary> {
    let mut dicts = Vec::new();
    let Ok(mut node) = doc.get_dictionary(page_id) else {
        return dicts;
    };
    // Same bound as the MediaBox lookup
    for _ in 0..32 {
        if let Ok(resources) = node
            .get(b"Resources")
            .map(|r| resolve(doc, r))
            .and_then(|r| r.as_dict())
        {
            dicts.push(resources);
        }
        let Some(parent) = node.get(b"Parent").ok().and_then(|p| p.as_reference().ok()) else {
            break;
        };
        match doc.get_dictionary(parent) {
            Ok(dict) => node = dict,
            Err(_) => break,
        }
    }
    dicts
}

/// Concatenated bytes of the page's content streams
///
/// Unlike `Document::get_page_content`, a missing content object or a stream
/// whose filter cannot be undone is an error rather than an empty page.
fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>, String> {
    let page = doc.get_dictionary(page_id).map_err(|e| e.to_string())?;
    let Ok(contents) = page.get(b"Contents") else {
        return Ok(Vec::new());
    };
    let contents = dereference(doc, contents)?;
    let parts: Vec<&Object> = match contents {
        Object::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    let mut data = Vec::new();
    for part in parts {
        let stream = dereference(doc, part)?
            .as_stream()
            .map_err(|_| "page content is not a stream".to_string())?;
        data.extend_from_slice(&stream_bytes(stream)?);
        data.push(b'\n');
    }
    Ok(data)
}

fn dereference<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object, String> {
    match obj {
        Object::Reference(id) => doc
            .get_object(*id)
            .map_err(|e| format!("content object {} {} missing: {}", id.0, id.1, e)),
        other => Ok(other),
    }
}

fn stream_bytes(stream: &Stream) -> Result<Vec<u8>, String> {
    if stream.dict.has(b"Filter") {
        let data = stream
            .decompressed_content()
            .map_err(|e| format!("content stream could not be decompressed: {}", e))?;
        // lopdf logs inflate failures and hands back whatever it got
        if data.is_empty() && !stream.content.is_empty() {
            return Err("content stream decompressed to nothing".into());
        }
        Ok(data)
    } else {
        Ok(stream.content.clone())
    }
}

/// Decode operators; a non-blank stream yielding none is corrupt
fn decode_content(data: &[u8]) -> Result<Content, String> {
    let content = Content::decode(data).map_err(|e| e.to_string())?;
    if content.operations.is_empty() && data.iter().any(|b| !b.is_ascii_whitespace()) {
        return Err("content stream holds no parseable operators".into());
    }
    Ok(content)
}

/// Extract text spans from a single page
fn extract_page_spans(
    doc: &Document,
    page_id: ObjectId,
    page_num: u32,
) -> Result<Vec<TextSpan>, BlueTextError> {
    let page_error = |reason: String| BlueTextError::PageExtraction {
        page: page_num.saturating_sub(1) as usize,
        reason,
    };

    let data = page_content(doc, page_id).map_err(page_error)?;
    let content = decode_content(&data).map_err(page_error)?;
    let resources = Resources::for_page(doc, page_id);

    let mut walker = PageWalker {
        doc,
        page_num,
        spans: Vec::new(),
        block: 0,
    };
    walker
        .walk(&content, &resources, GraphicsState::default(), 0)
        .map_err(page_error)?;
    Ok(walker.spans)
}

/// Interprets content streams of one page, descending into Form XObjects
struct PageWalker<'a> {
    doc: &'a Document,
    page_num: u32,
    spans: Vec<TextSpan>,
    /// Text objects seen so far, across forms
    block: u32,
}

impl<'a> PageWalker<'a> {
    fn walk(
        &mut self,
        content: &Content,
        resources: &Resources<'a>,
        mut gs: GraphicsState,
        depth: usize,
    ) -> Result<(), String> {
        let doc = self.doc;
        let fonts = &resources.fonts;
        let mut metrics: BTreeMap<String, FontMetrics> = BTreeMap::new();
        let mut gs_stack: Vec<GraphicsState> = Vec::new();
        let mut ts = TextState::new();

        for op in &content.operations {
            let operands = &op.operands;
            match op.operator.as_str() {
                "q" => gs_stack.push(gs),
                "Q" => {
                    if let Some(saved) = gs_stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if operands.len() >= 6 {
                        let m = matrix_from_operands(operands);
                        gs.ctm = multiply_matrices(&m, &gs.ctm);
                    }
                }
                "g" => {
                    if let Some(level) = operands.first().and_then(get_number) {
                        gs.fill_space = FillSpace::Gray;
                        gs.fill = Some(ColorSample::from_gray(level));
                    }
                }
                "rg" => {
                    let c = numbers(operands);
                    if c.len() >= 3 {
                        gs.fill_space = FillSpace::Rgb;
                        gs.fill = FillSpace::Rgb.color(&c);
                    }
                }
                "k" => {
                    let c = numbers(operands);
                    if c.len() >= 4 {
                        gs.fill_space = FillSpace::Cmyk;
                        gs.fill = FillSpace::Cmyk.color(&c);
                    }
                }
                "cs" => {
                    if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                        let space = match name {
                            b"DeviceGray" | b"G" => FillSpace::Gray,
                            b"DeviceRGB" | b"RGB" => FillSpace::Rgb,
                            b"DeviceCMYK" | b"CMYK" => FillSpace::Cmyk,
                            other => resources
                                .color_spaces
                                .get(other)
                                .copied()
                                .unwrap_or(FillSpace::Unsupported),
                        };
                        gs.fill_space = space;
                        gs.fill = space.initial_color();
                    }
                }
                "sc" | "scn" => {
                    // A trailing name operand selects a pattern
                    let has_pattern = operands.iter().any(|o| matches!(o, Object::Name(_)));
                    gs.fill = if has_pattern {
                        None
                    } else {
                        gs.fill_space.color(&numbers(operands))
                    };
                }
                "Do" => {
                    if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                        self.draw_form(name, resources, gs, depth)?;
                    }
                }
                "BT" => {
                    ts.in_text_block = true;
                    ts.text_matrix = IDENTITY;
                    ts.line_matrix = IDENTITY;
                }
                "ET" => {
                    ts.in_text_block = false;
                    self.block += 1;
                }
                "Tf" => {
                    if operands.len() >= 2 {
                        if let Ok(name) = operands[0].as_name() {
                            ts.font = String::from_utf8_lossy(name).to_string();
                        }
                        if let Some(size) = get_number(&operands[1]) {
                            ts.font_size = size;
                        }
                    }
                }
                "TL" => {
                    if let Some(leading) = operands.first().and_then(get_number) {
                        ts.leading = Some(leading);
                    }
                }
                "Td" | "TD" => {
                    if operands.len() >= 2 {
                        let tx = get_number(&operands[0]).unwrap_or(0.0);
                        let ty = get_number(&operands[1]).unwrap_or(0.0);
                        if op.operator == "TD" {
                            ts.leading = Some(-ty);
                        }
                        ts.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if operands.len() >= 6 {
                        ts.text_matrix = matrix_from_operands(operands);
                        ts.line_matrix = ts.text_matrix;
                    }
                }
                "T*" => ts.next_line(),
                "Tj" | "'" | "\"" => {
                    if op.operator != "Tj" {
                        ts.next_line();
                    }
                    let operand = if op.operator == "\"" {
                        operands.get(2)
                    } else {
                        operands.first()
                    };
                    if let (true, Some(Object::String(bytes, _))) = (ts.in_text_block, operand) {
                        let text = decode_string(bytes, doc, fonts, &ts.font);
                        self.push_span(text, &ts, &gs);
                        let width =
                            font_metrics(doc, fonts, &mut metrics, &ts.font).string_width(bytes);
                        ts.advance(width * ts.font_size);
                    }
                }
                "TJ" => {
                    if !ts.in_text_block {
                        continue;
                    }
                    if let Some(Ok(array)) = operands.first().map(|o| o.as_array()) {
                        let mut combined_text = String::new();
                        let mut width = 0.0;
                        for item in array {
                            match item {
                                Object::String(bytes, _) => {
                                    combined_text.push_str(&decode_string(bytes, doc, fonts, &ts.font));
                                    width += font_metrics(doc, fonts, &mut metrics, &ts.font)
                                        .string_width(bytes);
                                }
                                other => {
                                    if let Some(adjust) = get_number(other) {
                                        // Large negative kerning usually stands in for a space
                                        if adjust <= -250.0 && !combined_text.ends_with(' ') {
                                            combined_text.push(' ');
                                        }
                                        width -= adjust / 1000.0;
                                    }
                                }
                            }
                        }
                        self.push_span(combined_text, &ts, &gs);
                        ts.advance(width * ts.font_size);
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Run a Form XObject with the invoking graphics state; nothing it changes leaks back
    fn draw_form(
        &mut self,
        name: &[u8],
        resources: &Resources<'a>,
        gs: GraphicsState,
        depth: usize,
    ) -> Result<(), String> {
        let Some(&id) = resources.xobjects.get(name) else {
            return Ok(());
        };
        let stream = match self.doc.get_object(id).and_then(|o| o.as_stream()) {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!(
                    "page {}: XObject /{} unreadable: {}",
                    self.page_num,
                    String::from_utf8_lossy(name),
                    e
                );
                return Ok(());
            }
        };
        let is_form = stream
            .dict
            .get(b"Subtype")
            .and_then(|s| s.as_name())
            .map(|s| s == b"Form")
            .unwrap_or(false);
        if !is_form {
            return Ok(());
        }
        if depth >= MAX_FORM_DEPTH {
            log::warn!(
                "page {}: form /{} nested too deep, skipped",
                self.page_num,
                String::from_utf8_lossy(name)
            );
            return Ok(());
        }

        let mut form_gs = gs;
        if let Ok(matrix) = stream.dict.get(b"Matrix").and_then(|m| m.as_array()) {
            if matrix.len() == 6 {
                form_gs.ctm = multiply_matrices(&matrix_from_operands(matrix), &gs.ctm);
            }
        }
        let content = decode_content(&stream_bytes(stream)?)?;
        let form_resources = Resources::for_form(self.doc, stream, resources);
        self.walk(&content, &form_resources, form_gs, depth + 1)
    }

    /// Record a span at the current text position, skipping whitespace-only text
    fn push_span(&mut self, text: String, ts: &TextState, gs: &GraphicsState) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        // Transform position through CTM
        let combined = multiply_matrices(&ts.text_matrix, &gs.ctm);
        self.spans.push(TextSpan {
            text: trimmed.to_string(),
            x: combined[4],
            y: combined[5],
            font_size: effective_font_size(ts.font_size, &combined),
            font: ts.font.clone(),
            color: gs.fill,
            block: self.block,
            page: self.page_num,
        });
    }
}

fn font_metrics<'a>(
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    cache: &'a mut BTreeMap<String, FontMetrics>,
    current_font: &str,
) -> &'a FontMetrics {
    cache
        .entry(current_font.to_string())
        .or_insert_with(|| match fonts.get(current_font.as_bytes()) {
            Some(dict) => FontMetrics::from_dict(doc, dict),
            None => FontMetrics::fallback(),
        })
}

fn resolve_color_space(doc: &Document, obj: &Object) -> FillSpace {
    match obj {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" => FillSpace::Gray,
            b"DeviceRGB" => FillSpace::Rgb,
            b"DeviceCMYK" => FillSpace::Cmyk,
            _ => FillSpace::Unsupported,
        },
        Object::Array(items) => {
            let family = items.first().and_then(|f| f.as_name().ok());
            match family {
                Some(b"ICCBased") => items
                    .get(1)
                    .map(|s| resolve(doc, s))
                    .and_then(|s| s.as_stream().ok())
                    .and_then(|s| s.dict.get(b"N").ok())
                    .and_then(|n| n.as_i64().ok())
                    .map(FillSpace::from_components)
                    .unwrap_or(FillSpace::Unsupported),
                Some(b"CalGray") => FillSpace::Gray,
                Some(b"CalRGB") => FillSpace::Rgb,
                _ => FillSpace::Unsupported,
            }
        }
        _ => FillSpace::Unsupported,
    }
}

/// Follow a reference, or return the object itself
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn matrix_from_operands(operands: &[Object]) -> [f32; 6] {
    let mut m = IDENTITY;
    for (i, operand) in operands.iter().take(6).enumerate() {
        if let Some(v) = get_number(operand) {
            m[i] = v;
        }
    }
    m
}

fn numbers(operands: &[Object]) -> Vec<f32> {
    operands.iter().filter_map(get_number).collect()
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute effective font size from base size and the combined text/CTM matrix
fn effective_font_size(base_size: f32, matrix: &[f32; 6]) -> f32 {
    let scale_x = (matrix[0].powi(2) + matrix[1].powi(2)).sqrt();
    let scale_y = (matrix[2].powi(2) + matrix[3].powi(2)).sqrt();
    // Use the larger of the two scales (usually they're equal for non-rotated text)
    base_size * scale_x.max(scale_y)
}

/// Decode a string operand, handling encoding
fn decode_string(
    bytes: &[u8],
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &Dictionary>,
    current_font: &str,
) -> String {
    // Try to decode using font encoding
    if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
        if let Ok(encoding) = font_dict.get_font_encoding(doc) {
            if let Ok(text) = Document::decode_text(&encoding, bytes) {
                return text;
            }
        }
    }

    // Fallback: try UTF-16BE then Latin-1
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    bytes.iter().map(|&b| b as char).collect()
}

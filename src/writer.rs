//! PDF construction using lopdf
//!
//! Pages are buffered as content operations and only assembled into a lopdf
//! `Document` when saved, so the same writer can be serialized more than once.

use crate::color::ColorSample;
use crate::extractor::PageSize;
use crate::BlueTextError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Sink for rebuilt pages
pub trait PdfWriter {
    /// Start a new page; following text goes onto it
    fn add_page(&mut self, size: PageSize);

    /// Place `text` with its baseline origin at (`x`, `y`)
    fn place_text(&mut self, text: &str, x: f32, y: f32, font_size: f32);

    /// Number of pages added so far
    fn page_count(&self) -> usize;

    /// Serialize the document
    fn save_to(&self, target: &mut dyn Write) -> Result<(), BlueTextError>;
}

/// Resource name of the single font used for all text
const FONT_RESOURCE: &str = "F1";

struct PendingPage {
    size: PageSize,
    operations: Vec<Operation>,
}

/// [`PdfWriter`] producing a lopdf document with one standard Type1 font
pub struct LopdfWriter {
    base_font: String,
    text_color: Option<ColorSample>,
    unencodable: Option<char>,
    pages: Vec<PendingPage>,
}

impl Default for LopdfWriter {
    fn default() -> Self {
        Self::new("Helvetica", Some(ColorSample::new(0, 0, 255)))
    }
}

impl LopdfWriter {
    /// `text_color` of `None` leaves text in the default black fill
    pub fn new(base_font: &str, text_color: Option<ColorSample>) -> Self {
        Self {
            base_font: base_font.to_string(),
            text_color,
            unencodable: Some('?'),
            pages: Vec::new(),
        }
    }

    /// Character written in place of text outside Latin-1 (default `?`); `None` drops it
    pub fn with_unencodable(mut self, replacement: Option<char>) -> Self {
        self.unencodable = replacement;
        self
    }

    /// Write the document to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BlueTextError> {
        let mut out = BufWriter::new(File::create(path)?);
        self.save_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Serialize into a byte vector
    pub fn to_bytes(&self) -> Result<Vec<u8>, BlueTextError> {
        let mut buf = Vec::new();
        self.save_to(&mut buf)?;
        Ok(buf)
    }

    fn build_document(&self) -> Result<Document, BlueTextError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.base_font.as_str(),
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                FONT_RESOURCE => Object::Reference(font_id),
            },
        });

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content = Content {
                operations: page.operations.clone(),
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().map_err(write_error)?,
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(page.size.width),
                    Object::Real(page.size.height),
                ],
                "Contents" => Object::Reference(content_id),
                "Resources" => Object::Reference(resources_id),
            });
            kids.push(Object::Reference(page_id));
        }

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
        Ok(doc)
    }
}

impl PdfWriter for LopdfWriter {
    fn add_page(&mut self, size: PageSize) {
        self.pages.push(PendingPage {
            size,
            operations: Vec::new(),
        });
    }

    fn place_text(&mut self, text: &str, x: f32, y: f32, font_size: f32) {
        if self.pages.is_empty() {
            self.add_page(PageSize::A4);
        }
        let color = self.text_color;
        let encoded = encode_latin1(text, self.unencodable);
        let Some(page) = self.pages.last_mut() else {
            return;
        };
        let ops = &mut page.operations;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![
                Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                Object::Real(font_size),
            ],
        ));
        if let Some(color) = color {
            let [r, g, b] = color.to_unit_rgb();
            ops.push(Operation::new(
                "rg",
                vec![Object::Real(r), Object::Real(g), Object::Real(b)],
            ));
        }
        ops.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(x),
                Object::Real(y),
            ],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encoded, StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn save_to(&self, mut target: &mut dyn Write) -> Result<(), BlueTextError> {
        let mut doc = self.build_document()?;
        doc.save_to(&mut target).map_err(|e| write_error(e.into()))?;
        Ok(())
    }
}

/// Encode for a WinAnsi standard font; characters beyond Latin-1 become `replacement`
fn encode_latin1(text: &str, replacement: Option<char>) -> Vec<u8> {
    let latin1 = |c: char| u8::try_from(u32::from(c)).ok();
    let replacement = replacement.and_then(latin1);
    text.chars()
        .filter_map(|c| latin1(c).or(replacement))
        .collect()
}

fn write_error(e: lopdf::Error) -> BlueTextError {
    BlueTextError::Write(e.to_string())
}

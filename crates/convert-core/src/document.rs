//! Document intermediate representation.
//!
//! All conversions pass through this IR:
//! Input Plugin → Document → Transforms → Output Plugin.
//!
//! Geometry is in PDF points (1/72 inch), with `y` growing downwards from the
//! top edge of the page.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The central intermediate representation of a converted document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub metadata: Metadata,
    /// Pages in reading order.
    pub pages: Vec<Page>,
    /// Bookmark tree, if the source had one.
    pub outline: Outline,
    /// Path of the file this document was read from.
    pub source_path: Option<PathBuf>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Iterate over every block of every page.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }

    pub fn image_count(&self) -> usize {
        self.blocks()
            .filter(|b| matches!(b, Block::Image(_)))
            .count()
    }

    pub fn table_count(&self) -> usize {
        self.blocks()
            .filter(|b| matches!(b, Block::Table(_)))
            .count()
    }

    /// Mutable references to every image in the document.
    pub fn images_mut(&mut self) -> Vec<&mut ImageBlock> {
        self.pages
            .iter_mut()
            .flat_map(|p| p.blocks.iter_mut())
            .filter_map(|b| match b {
                Block::Image(img) => Some(img),
                _ => None,
            })
            .collect()
    }

    /// Concatenated plain text of all paragraphs, headings and table cells.
    pub fn plain_text(&self) -> String {
        let mut parts = Vec::new();
        for block in self.blocks() {
            match block {
                Block::Paragraph(p) => parts.push(p.text()),
                Block::Heading(h) => parts.push(h.text()),
                Block::Table(t) => {
                    for row in &t.rows {
                        parts.push(row.join("\t"));
                    }
                }
                Block::Image(_) => {}
            }
        }
        parts.join("\n")
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Document properties.
///
/// Terms are stored as a multimap: one term can have multiple values
/// (e.g. several `creator` entries for co-authors).
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    items: HashMap<String, Vec<String>>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for the given term. Blank values are ignored.
    pub fn add(&mut self, term: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return;
        }
        self.items
            .entry(term.into())
            .or_default()
            .push(trimmed.to_string());
    }

    /// Get all values for a term.
    pub fn get(&self, term: &str) -> Option<&[String]> {
        self.items.get(term).map(|v| v.as_slice())
    }

    /// Get the first value for a term.
    pub fn get_first(&self, term: &str) -> Option<&str> {
        self.items
            .get(term)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    /// Set a term to a single value (replacing any existing). Blank values
    /// are ignored.
    pub fn set(&mut self, term: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            self.items.insert(term.into(), vec![trimmed.to_string()]);
        }
    }

    pub fn contains(&self, term: &str) -> bool {
        self.items.contains_key(term)
    }

    pub fn title(&self) -> Option<&str> {
        self.get_first("title")
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.set("title", title);
    }

    pub fn authors(&self) -> Vec<&str> {
        self.get("creator")
            .map(|items| items.iter().map(|s| s.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn subject(&self) -> Option<&str> {
        self.get_first("subject")
    }

    pub fn keywords(&self) -> Option<&str> {
        self.get_first("keywords")
    }

    pub fn language(&self) -> Option<&str> {
        self.get_first("language")
    }

    /// The application that produced the source document.
    pub fn producer(&self) -> Option<&str> {
        self.get_first("producer")
    }
}

// ---------------------------------------------------------------------------
// Pages and blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    pub width: f64,
    pub height: f64,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(number: u32, width: f64, height: f64) -> Self {
        Self {
            number,
            width,
            height,
            blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    Heading(Heading),
    Image(ImageBlock),
    Table(Table),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Font size in points.
    pub font_size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl TextRun {
    pub fn new(text: impl Into<String>, font_size: f64) -> Self {
        Self {
            text: text.into(),
            font_size,
            bold: false,
            italic: false,
        }
    }

    /// Whether `other` can be merged into this run without losing styling.
    pub fn same_style(&self, other: &TextRun) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && (self.font_size - other.font_size).abs() < 0.5
    }
}

#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    pub runs: Vec<TextRun>,
    pub alignment: Alignment,
    /// Left indent in points, relative to the page's text column.
    pub indent: f64,
}

impl Paragraph {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self {
            runs,
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        runs_text(&self.runs)
    }
}

#[derive(Debug, Clone)]
pub struct Heading {
    /// 1..=6
    pub level: u8,
    pub runs: Vec<TextRun>,
}

impl Heading {
    pub fn new(level: u8, runs: Vec<TextRun>) -> Self {
        Self {
            level: level.clamp(1, 6),
            runs,
        }
    }

    pub fn text(&self) -> String {
        runs_text(&self.runs)
    }
}

fn runs_text(runs: &[TextRun]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

/// An encoded raster image placed in the flow.
#[derive(Debug, Clone)]
pub struct ImageBlock {
    /// Encoded bytes in `format`.
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Size on the page in points.
    pub display_width: f64,
    pub display_height: f64,
}

/// A rectangular grid of cell texts.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, padding short rows with empty cells so that every row
    /// has the same number of columns.
    pub fn new(mut rows: Vec<Vec<String>>) -> Self {
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(columns, String::new());
        }
        Self { rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// Hierarchical bookmark tree.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub entries: Vec<OutlineEntry>,
}

impl Outline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: OutlineEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate depth-first over all entries, yielding `(level, entry)` with
    /// top-level entries at level 1.
    pub fn iter_depth_first(&self) -> OutlineIter<'_> {
        OutlineIter {
            stack: self.entries.iter().rev().map(|e| (1, e)).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutlineEntry {
    pub title: String,
    /// 1-based target page, when the destination could be resolved.
    pub page: Option<u32>,
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    pub fn new(title: impl Into<String>, page: Option<u32>) -> Self {
        Self {
            title: title.into(),
            page,
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: OutlineEntry) {
        self.children.push(child);
    }
}

/// Depth-first iterator over outline entries.
pub struct OutlineIter<'a> {
    stack: Vec<(usize, &'a OutlineEntry)>,
}

impl<'a> Iterator for OutlineIter<'a> {
    type Item = (usize, &'a OutlineEntry);

    fn next(&mut self) -> Option<Self::Item> {
        let (level, entry) = self.stack.pop()?;
        // Push children in reverse so first child is popped next
        for child in entry.children.iter().rev() {
            self.stack.push((level + 1, child));
        }
        Some((level, entry))
    }
}

// ---------------------------------------------------------------------------
// Format enumeration
// ---------------------------------------------------------------------------

/// Formats known to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension().to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> Document {
        let mut doc = Document::new();
        let mut page = Page::new(1, 612.0, 792.0);
        page.blocks.push(Block::Heading(Heading::new(
            1,
            vec![TextRun::new("Intro", 18.0)],
        )));
        page.blocks.push(Block::Paragraph(Paragraph::new(vec![
            TextRun::new("Hello ", 12.0),
            TextRun::new("world", 12.0),
        ])));
        page.blocks.push(Block::Table(Table::new(vec![
            vec!["a".into(), "b".into()],
            vec!["c".into()],
        ])));
        page.blocks.push(Block::Image(ImageBlock {
            data: vec![1, 2, 3],
            format: ImageFormat::Png,
            pixel_width: 10,
            pixel_height: 10,
            display_width: 72.0,
            display_height: 72.0,
        }));
        doc.pages.push(page);
        doc.pages.push(Page::new(2, 612.0, 792.0));
        doc
    }

    #[test]
    fn test_document_counts() {
        let doc = sample_document();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.image_count(), 1);
        assert_eq!(doc.table_count(), 1);
    }

    #[test]
    fn test_plain_text() {
        let doc = sample_document();
        assert_eq!(doc.plain_text(), "Intro\nHello world\na\tb\nc\t");
    }

    #[test]
    fn test_images_mut() {
        let mut doc = sample_document();
        for img in doc.images_mut() {
            img.pixel_width = 5;
        }
        let widths: Vec<u32> = doc
            .blocks()
            .filter_map(|b| match b {
                Block::Image(i) => Some(i.pixel_width),
                _ => None,
            })
            .collect();
        assert_eq!(widths, vec![5]);
    }

    #[test]
    fn test_metadata() {
        let mut meta = Metadata::new();
        meta.set_title("  Test Document ");
        meta.add("creator", "Author One");
        meta.add("creator", "Author Two");
        meta.add("subject", "   ");

        assert_eq!(meta.title(), Some("Test Document"));
        assert_eq!(meta.authors(), vec!["Author One", "Author Two"]);
        assert!(!meta.contains("subject"));

        meta.set_title("");
        assert_eq!(meta.title(), Some("Test Document"));
    }

    #[test]
    fn test_table_is_rectangular() {
        let table = Table::new(vec![
            vec!["Name".into(), "Qty".into(), "Price".into()],
            vec!["Apple".into()],
        ]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.rows[1], vec!["Apple", "", ""]);
    }

    #[test]
    fn test_heading_level_clamped() {
        assert_eq!(Heading::new(0, vec![]).level, 1);
        assert_eq!(Heading::new(9, vec![]).level, 6);
    }

    #[test]
    fn test_outline_depth_first() {
        let mut outline = Outline::new();
        let mut ch1 = OutlineEntry::new("Chapter 1", Some(1));
        ch1.add_child(OutlineEntry::new("Section 1.1", Some(2)));
        ch1.add_child(OutlineEntry::new("Section 1.2", Some(3)));
        outline.add(ch1);
        outline.add(OutlineEntry::new("Chapter 2", Some(4)));

        let visited: Vec<(usize, &str)> = outline
            .iter_depth_first()
            .map(|(level, e)| (level, e.title.as_str()))
            .collect();
        assert_eq!(
            visited,
            vec![
                (1, "Chapter 1"),
                (2, "Section 1.1"),
                (2, "Section 1.2"),
                (1, "Chapter 2"),
            ]
        );
    }

    #[test]
    fn test_format_display() {
        assert_eq!(DocumentFormat::Pdf.to_string(), "PDF");
        assert_eq!(DocumentFormat::Docx.to_string(), "DOCX");
    }
}

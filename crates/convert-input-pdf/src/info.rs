//! Quick probing of a PDF without converting it.

use std::path::Path;

use lopdf::Document;
use serde::Serialize;

use convert_utils::fs::get_file_size;

use crate::content::{inherited_attribute, interpret_page, page_box, resolve_dict};
use crate::images::page_has_images;
use crate::metadata::{info_dictionary, info_string};

/// Only this many leading pages are inspected for text and images.
const PROBE_PAGES: usize = 3;

/// Summary of a PDF file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfInfo {
    pub pages: usize,
    pub size: String,
    pub title: String,
    pub author: String,
    pub producer: Option<String>,
    pub has_text: bool,
    pub has_images: bool,
}

impl PdfInfo {
    fn unreadable(size: String) -> Self {
        Self {
            pages: 0,
            size,
            title: "Unreadable".to_string(),
            author: "Unknown".to_string(),
            producer: None,
            has_text: false,
            has_images: false,
        }
    }
}

/// Probe `path`. A file that cannot be loaded yields a record with zero
/// pages and the title "Unreadable" instead of an error.
pub fn get_pdf_info(path: &Path) -> PdfInfo {
    let size = get_file_size(path);
    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            log::warn!("Cannot read {}: {}", path.display(), e);
            return PdfInfo::unreadable(size);
        }
    };

    let pages = doc.get_pages();
    let info = info_dictionary(&doc);
    let text_entry = |key: &[u8]| info.and_then(|dict| info_string(&doc, dict, key));

    let mut has_text = false;
    let mut has_images = false;
    for page_id in pages.values().take(PROBE_PAGES) {
        let resources = inherited_attribute(&doc, *page_id, b"Resources").and_then(|o| resolve_dict(&doc, o));
        has_images |= page_has_images(&doc, resources);
        match interpret_page(&doc, *page_id, page_box(&doc, *page_id)) {
            Ok(content) => {
                has_text |= content.has_text();
                has_images |= !content.images.is_empty();
            }
            Err(e) => log::debug!("Skipping unreadable page while probing: {}", e),
        }
    }

    PdfInfo {
        pages: pages.len(),
        size,
        title: text_entry(b"Title").unwrap_or_else(|| "Untitled".to_string()),
        author: text_entry(b"Author").unwrap_or_else(|| "Unknown".to_string()),
        producer: text_entry(b"Producer"),
        has_text,
        has_images,
    }
}

/// Whether `path` loads as a PDF with at least one page.
pub fn is_pdf_readable(path: &Path) -> bool {
    match Document::load(path) {
        Ok(doc) => !doc.get_pages().is_empty(),
        Err(e) => {
            log::debug!("{} is not readable: {}", path.display(), e);
            false
        }
    }
}

//! Document information dictionary.

use lopdf::{Dictionary, Document};

use convert_core::document::Metadata;
use convert_utils::encoding::decode_pdf_string;

use crate::content::{resolve, resolve_dict};

/// The trailer's `/Info` dictionary, if present.
pub fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    doc.trailer
        .get(b"Info")
        .ok()
        .and_then(|info| resolve_dict(doc, info))
}

/// Read a text entry of the info dictionary, trimmed; blank values are `None`.
pub fn info_string(doc: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    let raw = info.get(key).ok().map(|o| resolve(doc, o))?.as_str().ok()?;
    let value = decode_pdf_string(raw).trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Copy Title/Author/Subject/Keywords/Creator/Producer into `metadata`.
pub fn extract_metadata(doc: &Document, metadata: &mut Metadata) {
    let Some(info) = info_dictionary(doc) else {
        log::debug!("PDF has no info dictionary");
        return;
    };

    if let Some(title) = info_string(doc, info, b"Title") {
        metadata.set_title(title);
    }
    if let Some(author) = info_string(doc, info, b"Author") {
        for name in author.split(';') {
            metadata.add("creator", name.trim());
        }
    }
    if let Some(subject) = info_string(doc, info, b"Subject") {
        metadata.set("subject", subject);
    }
    if let Some(keywords) = info_string(doc, info, b"Keywords") {
        metadata.set("keywords", keywords);
    }
    if let Some(creator) = info_string(doc, info, b"Creator") {
        metadata.set("generator", creator);
    }
    if let Some(producer) = info_string(doc, info, b"Producer") {
        metadata.set("producer", producer);
    }
}

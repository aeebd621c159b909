//! Package properties: `docProps/core.xml` and `docProps/app.xml`.

use chrono::{DateTime, Utc};

use convert_core::document::{Document, Metadata};
use convert_utils::xml::XmlBuilder;

const APPLICATION: &str = "pdf2docx";

/// W3CDTF timestamp, e.g. `2024-05-01T09:30:00Z`.
fn w3cdtf(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

pub fn core_xml(metadata: &Metadata, now: &DateTime<Utc>) -> String {
    let mut xml = XmlBuilder::new();
    xml.open_tag(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:dcmitype", "http://purl.org/dc/dcmitype/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    );

    if let Some(title) = metadata.title() {
        xml.text_element("dc:title", title, &[]);
    }
    if let Some(subject) = metadata.subject() {
        xml.text_element("dc:subject", subject, &[]);
    }
    let authors = metadata.authors();
    if !authors.is_empty() {
        xml.text_element("dc:creator", &authors.join("; "), &[]);
    }
    if let Some(keywords) = metadata.keywords() {
        xml.text_element("cp:keywords", keywords, &[]);
    }
    if let Some(language) = metadata.language() {
        xml.text_element("dc:language", language, &[]);
    }
    xml.text_element("cp:lastModifiedBy", APPLICATION, &[]);

    let stamp = w3cdtf(now);
    xml.text_element("dcterms:created", &stamp, &[("xsi:type", "dcterms:W3CDTF")])
        .text_element("dcterms:modified", &stamp, &[("xsi:type", "dcterms:W3CDTF")])
        .close_tag("cp:coreProperties");
    xml.build()
}

pub fn app_xml(doc: &Document) -> String {
    let words = doc.plain_text().split_whitespace().count();

    let mut xml = XmlBuilder::new();
    xml.open_tag(
        "Properties",
        &[
            (
                "xmlns",
                "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
            ),
            (
                "xmlns:vt",
                "http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes",
            ),
        ],
    )
    .text_element(
        "Application",
        &format!("{} {}", APPLICATION, env!("CARGO_PKG_VERSION")),
        &[],
    )
    .text_element("Pages", &doc.page_count().max(1).to_string(), &[])
    .text_element("Words", &words.to_string(), &[])
    .close_tag("Properties");
    xml.build()
}

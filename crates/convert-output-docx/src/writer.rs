//! DOCX writer: assembles a WordprocessingML package from a Document.

use std::path::Path;

use chrono::Utc;

use convert_core::document::{Block, Document, ImageBlock};
use convert_core::error::{ConvertError, Result};
use convert_core::options::ConversionOptions;
use convert_utils::archive::ZipBuilder;
use convert_utils::mime;
use convert_utils::xml::XmlBuilder;

use crate::body::{render_document, MediaRef, PageGeometry};
use crate::props::{app_xml, core_xml};
use crate::styles::{settings_xml, styles_xml};

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_SETTINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// `rId1` and `rId2` are styles and settings; images follow.
const FIRST_MEDIA_REL: usize = 3;

/// Write a Document as a DOCX file.
pub fn write_docx(doc: &Document, output_path: &Path, options: &ConversionOptions) -> Result<()> {
    let images = collect_images(doc);
    let media = media_refs(&images);
    let geometry = PageGeometry::for_document(doc, options);
    log::debug!(
        "Page geometry {:.0}x{:.0}pt, {} media parts",
        geometry.width,
        geometry.height,
        media.len()
    );

    let document_xml = render_document(doc, &media, geometry, options);

    let mut zip = ZipBuilder::new(output_path)
        .map_err(|e| ConvertError::Docx(format!("Failed to create DOCX: {}", e)))?;

    let parts: [(&str, String); 8] = [
        ("[Content_Types].xml", content_types_xml()),
        ("_rels/.rels", package_rels_xml()),
        ("docProps/core.xml", core_xml(&doc.metadata, &Utc::now())),
        ("docProps/app.xml", app_xml(doc)),
        ("word/document.xml", document_xml),
        ("word/styles.xml", styles_xml()),
        ("word/settings.xml", settings_xml()),
        ("word/_rels/document.xml.rels", document_rels_xml(&media)),
    ];
    for (name, content) in &parts {
        zip.add_file(name, content.as_bytes())
            .map_err(|e| ConvertError::Docx(format!("Failed to write {}: {}", name, e)))?;
    }

    // JPEG and PNG are already compressed.
    for (image, media) in images.iter().zip(&media) {
        let path = format!("word/{}", media.file_name);
        zip.add_stored(&path, &image.data)
            .map_err(|e| ConvertError::Docx(format!("Failed to write {}: {}", path, e)))?;
    }

    zip.finish()
        .map_err(|e| ConvertError::Docx(format!("Failed to finalize DOCX: {}", e)))?;

    log::info!("DOCX written successfully: {}", output_path.display());
    Ok(())
}

/// Images in document order.
fn collect_images(doc: &Document) -> Vec<&ImageBlock> {
    doc.blocks()
        .filter_map(|block| match block {
            Block::Image(img) => Some(img),
            _ => None,
        })
        .collect()
}

/// Assign part names and relationship ids to `images`.
pub fn media_refs(images: &[&ImageBlock]) -> Vec<MediaRef> {
    images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            let number = i + 1;
            MediaRef {
                number,
                rel_id: format!("rId{}", i + FIRST_MEDIA_REL),
                file_name: format!(
                    "media/image{}.{}",
                    number,
                    mime::extension_from_mime(image.format.mime_type())
                ),
            }
        })
        .collect()
}

/// Media extensions are declared as defaults whether or not they occur.
fn content_types_xml() -> String {
    let mut xml = XmlBuilder::new();
    xml.open_tag(
        "Types",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/content-types",
        )],
    )
    .empty_tag(
        "Default",
        &[("Extension", "rels"), ("ContentType", mime::RELATIONSHIPS)],
    )
    .empty_tag(
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    );
    for ext in ["jpeg", "png"] {
        xml.empty_tag(
            "Default",
            &[("Extension", ext), ("ContentType", mime::mime_from_extension(ext))],
        );
    }
    for (part, content_type) in [
        ("/word/document.xml", mime::WORD_DOCUMENT),
        ("/word/styles.xml", mime::WORD_STYLES),
        ("/word/settings.xml", mime::WORD_SETTINGS),
        ("/docProps/core.xml", mime::CORE_PROPERTIES),
        ("/docProps/app.xml", mime::EXTENDED_PROPERTIES),
    ] {
        xml.empty_tag(
            "Override",
            &[("PartName", part), ("ContentType", content_type)],
        );
    }
    xml.close_tag("Types");
    xml.build()
}

fn relationships(rels: &[(String, &str, String)]) -> String {
    let mut xml = XmlBuilder::new();
    xml.open_tag(
        "Relationships",
        &[(
            "xmlns",
            "http://schemas.openxmlformats.org/package/2006/relationships",
        )],
    );
    for (id, kind, target) in rels {
        xml.empty_tag(
            "Relationship",
            &[("Id", id.as_str()), ("Type", *kind), ("Target", target.as_str())],
        );
    }
    xml.close_tag("Relationships");
    xml.build()
}

fn package_rels_xml() -> String {
    relationships(&[
        ("rId1".into(), REL_OFFICE_DOCUMENT, "word/document.xml".into()),
        ("rId2".into(), REL_CORE_PROPERTIES, "docProps/core.xml".into()),
        ("rId3".into(), REL_EXTENDED_PROPERTIES, "docProps/app.xml".into()),
    ])
}

fn document_rels_xml(media: &[MediaRef]) -> String {
    let mut rels = vec![
        ("rId1".to_string(), REL_STYLES, "styles.xml".to_string()),
        ("rId2".to_string(), REL_SETTINGS, "settings.xml".to_string()),
    ];
    rels.extend(
        media
            .iter()
            .map(|m| (m.rel_id.clone(), REL_IMAGE, m.file_name.clone())),
    );
    relationships(&rels)
}

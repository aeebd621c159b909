//! PDF extraction orchestrator.
//!
//! Content streams are interpreted page by page against the loaded
//! document; the layout analysis that follows only needs the extracted
//! spans and runs in parallel across pages.

use std::path::Path;

use log::{debug, info, warn};
use lopdf::Document as PdfDocument;
use rayon::prelude::*;

use convert_core::document::{Document, ImageBlock, Page, Table};
use convert_core::error::{ConvertError, Result};
use convert_core::options::ConversionOptions;

use crate::content::{interpret_page, page_box, PageContent, TextSpan};
use crate::headings::FontStatistics;
use crate::images::extract_image;
use crate::metadata::extract_metadata;
use crate::outline::extract_outline;
use crate::tables::detect_tables;
use crate::text_builder::{group_into_lines, PageLayout};

/// What the sequential pass collects for one page.
struct RawPage {
    number: u32,
    width: f64,
    height: f64,
    spans: Vec<TextSpan>,
    images: Vec<(f64, ImageBlock)>,
}

/// Extract text, tables and images from a PDF file into a Document.
pub fn extract_pdf(path: &Path, options: &ConversionOptions) -> Result<Document> {
    let pdf = PdfDocument::load(path)
        .map_err(|e| ConvertError::Pdf(format!("Failed to load PDF: {}", e)))?;
    if pdf.is_encrypted() {
        warn!(
            "{} is encrypted; extracted text may be incomplete",
            path.display()
        );
    }

    let mut doc = Document::new();
    doc.source_path = Some(path.to_path_buf());
    extract_metadata(&pdf, &mut doc.metadata);
    if let Some(producer) = doc.metadata.producer() {
        debug!("Produced by {}", producer);
    }
    if doc.metadata.title().is_none() {
        if let Some(stem) = path.file_stem() {
            doc.metadata.set_title(stem.to_string_lossy());
        }
    }

    let pages = pdf.get_pages();
    info!("PDF has {} pages", pages.len());

    let raw_pages: Vec<RawPage> = pages
        .iter()
        .map(|(number, page_id)| read_page(&pdf, *number, *page_id, options))
        .collect();

    let font_stats = if options.detect_headings {
        let stats = FontStatistics::from_spans(raw_pages.iter().flat_map(|p| p.spans.iter()));
        debug!(
            "Body text size {:.1}pt, heading sizes {:?}",
            stats.body_size, stats.heading_sizes
        );
        Some(stats)
    } else {
        None
    };

    let layout = PageLayout {
        font_stats: font_stats.as_ref(),
        preserve_layout: options.preserve_layout,
    };
    doc.pages = raw_pages
        .into_par_iter()
        .map(|raw| layout_page(raw, &layout, options))
        .collect();

    doc.outline = extract_outline(&pdf);

    info!(
        "Extracted {} pages, {} images, {} tables",
        doc.page_count(),
        doc.image_count(),
        doc.table_count()
    );
    Ok(doc)
}

fn read_page(
    pdf: &PdfDocument,
    number: u32,
    page_id: lopdf::ObjectId,
    options: &ConversionOptions,
) -> RawPage {
    let bbox = page_box(pdf, page_id);
    let content = interpret_page(pdf, page_id, bbox).unwrap_or_else(|e| {
        warn!("Skipping content of page {}: {}", number, e);
        PageContent::default()
    });

    let images = if options.extract_images {
        content
            .images
            .iter()
            .filter_map(|placement| {
                extract_image(pdf, placement).map(|image| (placement.top, image))
            })
            .collect()
    } else {
        Vec::new()
    };
    debug!(
        "Page {}: {} spans, {} images",
        number,
        content.spans.len(),
        images.len()
    );

    let (width, height) = bbox.oriented_size();
    RawPage {
        number,
        width,
        height,
        spans: content.spans,
        images,
    }
}

fn layout_page(raw: RawPage, layout: &PageLayout<'_>, options: &ConversionOptions) -> Page {
    let mut lines = group_into_lines(&raw.spans);

    let mut tables: Vec<(f64, Table)> = Vec::new();
    if options.extract_tables {
        let detected = detect_tables(&lines, options.min_table_rows, options.min_table_columns);
        if !detected.is_empty() {
            let mut idx = 0;
            lines.retain(|_| {
                let keep = !detected.iter().any(|t| t.lines.contains(&idx));
                idx += 1;
                keep
            });
            tables = detected.into_iter().map(|t| (t.top, t.table)).collect();
        }
    }

    let mut page = Page::new(raw.number, raw.width, raw.height);
    page.blocks = layout.build_blocks(&lines, tables, raw.images);
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::{image_xobject_stream, text_ops, TestPdf};
    use convert_core::document::Block;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Object};

    fn sample_pdf(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("sample.pdf");
        let mut pdf = TestPdf::new();
        let img = pdf.add_object(image_xobject_stream(8, 8, "DeviceRGB", vec![90; 192]));
        pdf.image_resource("Im1", img);

        let mut ops = text_ops("F2", 24, 72.0, 720.0, "Annual Summary");
        ops.extend(text_ops("F1", 12, 72.0, 680.0, "The year went well for everyone involved in the project."));
        ops.extend(text_ops("F1", 12, 72.0, 666.0, "Revenue grew and costs stayed flat across regions."));
        for (i, row) in [["Region", "Q1", "Q2"], ["North", "10", "12"], ["South", "8", "9"]]
            .iter()
            .enumerate()
        {
            let y = 600.0 - i as f64 * 14.0;
            for (j, cell) in row.iter().enumerate() {
                ops.extend(text_ops("F1", 12, 72.0 + j as f64 * 120.0, y, cell));
            }
        }
        ops.extend([
            Operation::new("q", vec![]),
            Operation::new("cm", vec![200.into(), 0.into(), 0.into(), 100.into(), 72.into(), 400.into()]),
            Operation::new("Do", vec!["Im1".into()]),
            Operation::new("Q", vec![]),
        ]);
        ops.extend(text_ops("F1", 12, 72.0, 360.0, "Closing remarks follow the chart."));
        pdf.page(ops);
        pdf.page(text_ops("F1", 12, 72.0, 700.0, "Second page text."));
        pdf.info(dictionary! { "Author" => Object::string_literal("Dana") });
        pdf.save(&path);
        path
    }

    #[test]
    fn test_extract_full_page() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_pdf(dir.path());

        let doc = extract_pdf(&path, &ConversionOptions::default()).unwrap();
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.metadata.title(), Some("sample"));
        assert_eq!(doc.metadata.authors(), vec!["Dana"]);
        assert_eq!(doc.source_path.as_deref(), Some(path.as_path()));

        let blocks = &doc.pages[0].blocks;
        match &blocks[0] {
            Block::Heading(h) => {
                assert_eq!(h.level, 1);
                assert_eq!(h.text(), "Annual Summary");
            }
            other => panic!("expected heading, got {:?}", other),
        }
        match &blocks[1] {
            Block::Paragraph(p) => assert!(p.text().starts_with("The year went well")),
            other => panic!("expected paragraph, got {:?}", other),
        }
        match &blocks[2] {
            Block::Table(t) => {
                assert_eq!(t.row_count(), 3);
                assert_eq!(t.rows[0], vec!["Region", "Q1", "Q2"]);
            }
            other => panic!("expected table, got {:?}", other),
        }
        match &blocks[3] {
            Block::Image(img) => {
                assert_eq!((img.pixel_width, img.pixel_height), (8, 8));
                assert_eq!((img.display_width, img.display_height), (200.0, 100.0));
            }
            other => panic!("expected image, got {:?}", other),
        }
        assert!(matches!(&blocks[4], Block::Paragraph(_)));
        assert_eq!(blocks.len(), 5);

        assert_eq!(doc.image_count(), 1);
        assert_eq!(doc.table_count(), 1);
        assert!(doc.plain_text().contains("Second page text."));
    }

    #[test]
    fn test_extraction_switches() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_pdf(dir.path());
        let options = ConversionOptions {
            extract_images: false,
            extract_tables: false,
            detect_headings: false,
            ..ConversionOptions::default()
        };

        let doc = extract_pdf(&path, &options).unwrap();
        assert_eq!(doc.image_count(), 0);
        assert_eq!(doc.table_count(), 0);
        assert!(!doc.blocks().any(|b| matches!(b, Block::Heading(_))));
        assert!(doc.plain_text().contains("Region"));
    }

    #[test]
    fn test_rotated_page_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.pdf");
        let mut pdf = TestPdf::new();
        pdf.page_with_box(vec![], Some([0, 0, 842, 595]));
        let (mut doc, pages) = pdf.build();
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(pages[0]) {
            page.set("Rotate", 90);
        }
        doc.save(&path).unwrap();

        let doc = extract_pdf(&path, &ConversionOptions::default()).unwrap();
        assert_eq!(doc.pages[0].width, 595.0);
        assert_eq!(doc.pages[0].height, 842.0);
        assert!(doc.pages[0].blocks.is_empty());
    }

    #[test]
    fn test_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();
        let err = extract_pdf(&path, &ConversionOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Pdf(_)));
    }
}

//! `word/document.xml`: the body text, tables and inline pictures.

use rayon::prelude::*;

use convert_core::document::{
    Alignment, Block, Document, Heading, ImageBlock, Page, Paragraph, Table, TextRun,
};
use convert_core::options::ConversionOptions;
use convert_utils::xml::XmlBuilder;

pub const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

/// Page margin on every side, in points.
pub const MARGIN_PT: f64 = 72.0;

/// US Letter in points.
const LETTER: (f64, f64) = (612.0, 792.0);

pub fn twips(points: f64) -> i64 {
    (points * 20.0).round() as i64
}

pub fn emu(points: f64) -> i64 {
    (points * 12700.0).round() as i64
}

fn half_points(points: f64) -> i64 {
    (points * 2.0).round().max(2.0) as i64
}

/// Size of the single output section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    /// First page's size when layout is preserved, US Letter otherwise.
    pub fn for_document(doc: &Document, options: &ConversionOptions) -> Self {
        let (width, height) = match doc.pages.first() {
            Some(page) if options.preserve_layout && page.width > 2.0 * MARGIN_PT && page.height > 2.0 * MARGIN_PT => {
                (page.width, page.height)
            }
            _ => LETTER,
        };
        Self { width, height }
    }

    pub fn text_width(&self) -> f64 {
        self.width - 2.0 * MARGIN_PT
    }

    pub fn text_height(&self) -> f64 {
        self.height - 2.0 * MARGIN_PT
    }
}

/// How an image is referenced from the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    /// 1-based, unique within the document.
    pub number: usize,
    pub rel_id: String,
    pub file_name: String,
}

/// Render the main document part. `media` lists the images in document
/// order, as returned by [`media_refs`](crate::writer::media_refs).
pub fn render_document(
    doc: &Document,
    media: &[MediaRef],
    geometry: PageGeometry,
    options: &ConversionOptions,
) -> String {
    // Index of each page's first image in `media`.
    let mut offsets = Vec::with_capacity(doc.pages.len());
    let mut next = 0;
    for page in &doc.pages {
        offsets.push(next);
        next += page
            .blocks
            .iter()
            .filter(|b| matches!(b, Block::Image(_)))
            .count();
    }

    let fragments: Vec<String> = doc
        .pages
        .par_iter()
        .zip(offsets.par_iter())
        .enumerate()
        .map(|(i, (page, &offset))| {
            let page_break = i > 0 && options.preserve_layout;
            render_page(page, &media[offset.min(media.len())..], geometry, page_break)
        })
        .collect();

    let mut xml = XmlBuilder::compact();
    xml.open_tag(
        "w:document",
        &[
            ("xmlns:w", NS_W),
            ("xmlns:r", NS_R),
            ("xmlns:wp", NS_WP),
            ("xmlns:a", NS_A),
            ("xmlns:pic", NS_PIC),
        ],
    )
    .open_tag("w:body", &[]);

    let mut wrote_content = false;
    for fragment in &fragments {
        if !fragment.is_empty() {
            wrote_content = true;
        }
        xml.raw(fragment);
    }
    if !wrote_content {
        xml.empty_tag("w:p", &[]);
    }

    section_properties(&mut xml, geometry);
    xml.close_tag("w:body").close_tag("w:document");
    xml.build()
}

fn render_page(page: &Page, media: &[MediaRef], geometry: PageGeometry, page_break: bool) -> String {
    let mut xml = XmlBuilder::fragment();
    if page_break {
        xml.open_tag("w:p", &[])
            .open_tag("w:r", &[])
            .empty_tag("w:br", &[("w:type", "page")])
            .close_tag("w:r")
            .close_tag("w:p");
    }

    let mut images = media.iter();
    for block in &page.blocks {
        match block {
            Block::Paragraph(p) => paragraph(&mut xml, p),
            Block::Heading(h) => heading(&mut xml, h),
            Block::Table(t) => table(&mut xml, t, geometry),
            Block::Image(img) => match images.next() {
                Some(media) => picture(&mut xml, img, media, geometry),
                None => log::warn!("Image on page {} has no media entry", page.number),
            },
        }
    }
    xml.build()
}

fn paragraph(xml: &mut XmlBuilder, p: &Paragraph) {
    xml.open_tag("w:p", &[]);

    let jc = match p.alignment {
        Alignment::Left => None,
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    };
    let indent = twips(p.indent);
    if jc.is_some() || indent > 0 {
        xml.open_tag("w:pPr", &[]);
        if indent > 0 {
            xml.empty_tag("w:ind", &[("w:left", &indent.to_string())]);
        }
        if let Some(jc) = jc {
            xml.empty_tag("w:jc", &[("w:val", jc)]);
        }
        xml.close_tag("w:pPr");
    }

    for r in &p.runs {
        run(xml, r, true);
    }
    xml.close_tag("w:p");
}

fn heading(xml: &mut XmlBuilder, h: &Heading) {
    let style = format!("Heading{}", h.level);
    xml.open_tag("w:p", &[])
        .open_tag("w:pPr", &[])
        .empty_tag("w:pStyle", &[("w:val", &style)])
        .close_tag("w:pPr");
    for r in &h.runs {
        // Size comes from the heading style.
        run(xml, r, false);
    }
    xml.close_tag("w:p");
}

fn run(xml: &mut XmlBuilder, r: &TextRun, with_size: bool) {
    if r.text.is_empty() {
        return;
    }
    xml.open_tag("w:r", &[]);
    if r.bold || r.italic || with_size {
        xml.open_tag("w:rPr", &[]);
        if r.bold {
            xml.empty_tag("w:b", &[]);
        }
        if r.italic {
            xml.empty_tag("w:i", &[]);
        }
        if with_size {
            let sz = half_points(r.font_size).to_string();
            xml.empty_tag("w:sz", &[("w:val", &sz)])
                .empty_tag("w:szCs", &[("w:val", &sz)]);
        }
        xml.close_tag("w:rPr");
    }
    xml.text_element("w:t", &r.text, &[("xml:space", "preserve")]);
    xml.close_tag("w:r");
}

fn table(xml: &mut XmlBuilder, t: &Table, geometry: PageGeometry) {
    let columns = t.column_count().max(1);
    let col_width = (twips(geometry.text_width()) / columns as i64).to_string();

    xml.open_tag("w:tbl", &[])
        .open_tag("w:tblPr", &[])
        .empty_tag("w:tblStyle", &[("w:val", "TableGrid")])
        .empty_tag("w:tblW", &[("w:w", "0"), ("w:type", "auto")])
        .empty_tag("w:tblLook", &[("w:val", "04A0"), ("w:firstRow", "1")])
        .close_tag("w:tblPr");

    xml.open_tag("w:tblGrid", &[]);
    for _ in 0..columns {
        xml.empty_tag("w:gridCol", &[("w:w", &col_width)]);
    }
    xml.close_tag("w:tblGrid");

    for (i, row) in t.rows.iter().enumerate() {
        xml.open_tag("w:tr", &[]);
        if i == 0 {
            xml.open_tag("w:trPr", &[])
                .empty_tag("w:tblHeader", &[])
                .close_tag("w:trPr");
        }
        for cell in row {
            xml.open_tag("w:tc", &[])
                .open_tag("w:tcPr", &[])
                .empty_tag("w:tcW", &[("w:w", &col_width), ("w:type", "dxa")])
                .close_tag("w:tcPr");
            // A cell must hold at least one paragraph, even when empty.
            xml.open_tag("w:p", &[]);
            if !cell.is_empty() {
                xml.open_tag("w:r", &[]);
                if i == 0 {
                    xml.open_tag("w:rPr", &[]).empty_tag("w:b", &[]).close_tag("w:rPr");
                }
                xml.text_element("w:t", cell, &[("xml:space", "preserve")])
                    .close_tag("w:r");
            }
            xml.close_tag("w:p").close_tag("w:tc");
        }
        xml.close_tag("w:tr");
    }
    xml.close_tag("w:tbl");
    // Keeps consecutive tables apart.
    xml.empty_tag("w:p", &[]);
}

/// Display size in points, shrunk to fit the text area.
pub fn fitted_size(img: &ImageBlock, geometry: PageGeometry) -> (f64, f64) {
    let (w, h) = (img.display_width.max(1.0), img.display_height.max(1.0));
    let scale = (geometry.text_width() / w)
        .min(geometry.text_height() / h)
        .min(1.0);
    (w * scale, h * scale)
}

fn picture(xml: &mut XmlBuilder, img: &ImageBlock, media: &MediaRef, geometry: PageGeometry) {
    let (w, h) = fitted_size(img, geometry);
    let cx = emu(w).to_string();
    let cy = emu(h).to_string();
    let id = media.number.to_string();
    let name = format!("Picture {}", media.number);

    xml.open_tag("w:p", &[])
        .open_tag("w:r", &[])
        .open_tag("w:drawing", &[])
        .open_tag(
            "wp:inline",
            &[("distT", "0"), ("distB", "0"), ("distL", "0"), ("distR", "0")],
        )
        .empty_tag("wp:extent", &[("cx", &cx), ("cy", &cy)])
        .empty_tag("wp:docPr", &[("id", &id), ("name", &name)])
        .open_tag("wp:cNvGraphicFramePr", &[])
        .empty_tag("a:graphicFrameLocks", &[("noChangeAspect", "1")])
        .close_tag("wp:cNvGraphicFramePr")
        .open_tag("a:graphic", &[])
        .open_tag("a:graphicData", &[("uri", NS_PIC)])
        .open_tag("pic:pic", &[])
        .open_tag("pic:nvPicPr", &[])
        .empty_tag("pic:cNvPr", &[("id", &id), ("name", &media.file_name)])
        .empty_tag("pic:cNvPicPr", &[])
        .close_tag("pic:nvPicPr")
        .open_tag("pic:blipFill", &[])
        .empty_tag("a:blip", &[("r:embed", &media.rel_id)])
        .open_tag("a:stretch", &[])
        .empty_tag("a:fillRect", &[])
        .close_tag("a:stretch")
        .close_tag("pic:blipFill")
        .open_tag("pic:spPr", &[])
        .open_tag("a:xfrm", &[])
        .empty_tag("a:off", &[("x", "0"), ("y", "0")])
        .empty_tag("a:ext", &[("cx", &cx), ("cy", &cy)])
        .close_tag("a:xfrm")
        .open_tag("a:prstGeom", &[("prst", "rect")])
        .empty_tag("a:avLst", &[])
        .close_tag("a:prstGeom")
        .close_tag("pic:spPr")
        .close_tag("pic:pic")
        .close_tag("a:graphicData")
        .close_tag("a:graphic")
        .close_tag("wp:inline")
        .close_tag("w:drawing")
        .close_tag("w:r")
        .close_tag("w:p");
}

fn section_properties(xml: &mut XmlBuilder, geometry: PageGeometry) {
    let w = twips(geometry.width).to_string();
    let h = twips(geometry.height).to_string();
    let margin = twips(MARGIN_PT).to_string();

    let mut size: Vec<(&str, &str)> = vec![("w:w", w.as_str()), ("w:h", h.as_str())];
    if geometry.width > geometry.height {
        size.push(("w:orient", "landscape"));
    }

    xml.open_tag("w:sectPr", &[])
        .empty_tag("w:pgSz", &size)
        .empty_tag(
            "w:pgMar",
            &[
                ("w:top", &margin),
                ("w:right", &margin),
                ("w:bottom", &margin),
                ("w:left", &margin),
                ("w:header", "720"),
                ("w:footer", "720"),
                ("w:gutter", "0"),
            ],
        )
        .close_tag("w:sectPr");
}

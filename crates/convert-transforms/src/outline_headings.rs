//! OutlineHeadings transform: promotes paragraphs named by the bookmark
//! outline to headings.
//!
//! Font-size statistics miss headings set in body size; a bookmark that
//! points at a page and carries the same text as a paragraph there is a
//! stronger signal.

use std::collections::HashMap;

use rayon::prelude::*;

use convert_core::document::{Block, Document, Heading};
use convert_core::error::Result;
use convert_core::options::ConversionOptions;
use convert_core::plugin::Transform;

pub struct OutlineHeadings;

impl Transform for OutlineHeadings {
    fn name(&self) -> &str {
        "OutlineHeadings"
    }

    fn should_run(&self, options: &ConversionOptions) -> bool {
        options.detect_headings
    }

    fn apply(&self, doc: &mut Document, _options: &ConversionOptions) -> Result<()> {
        if doc.outline.is_empty() {
            log::debug!("No outline, nothing to promote");
            return Ok(());
        }

        // page -> [(normalized title, level)]
        let mut targets: HashMap<u32, Vec<(String, u8)>> = HashMap::new();
        for (level, entry) in doc.outline.iter_depth_first() {
            let Some(page) = entry.page else { continue };
            let key = normalize(&entry.title);
            if key.is_empty() {
                continue;
            }
            let level = level.clamp(1, 6) as u8;
            targets.entry(page).or_default().push((key, level));
        }

        let promoted: usize = doc
            .pages
            .par_iter_mut()
            .map(|page| match targets.get(&page.number) {
                Some(titles) => promote_page(&mut page.blocks, titles),
                None => 0,
            })
            .sum();

        log::info!("Promoted {} paragraphs to headings from the outline", promoted);
        Ok(())
    }
}

/// Replace the first paragraph matching each title. Returns how many
/// paragraphs were promoted.
fn promote_page(blocks: &mut [Block], titles: &[(String, u8)]) -> usize {
    let mut used = vec![false; titles.len()];
    let mut count = 0;

    for block in blocks.iter_mut() {
        let Block::Paragraph(paragraph) = block else {
            continue;
        };
        let key = normalize(&paragraph.text());
        let Some(idx) = titles
            .iter()
            .enumerate()
            .position(|(i, (title, _))| !used[i] && *title == key)
        else {
            continue;
        };
        used[idx] = true;
        let runs = std::mem::take(&mut paragraph.runs);
        *block = Block::Heading(Heading::new(titles[idx].1, runs));
        count += 1;
    }
    count
}

/// Lowercase with whitespace runs collapsed to single spaces.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use convert_core::document::{OutlineEntry, Page, Paragraph, TextRun};

    fn paragraph(text: &str) -> Block {
        Block::Paragraph(Paragraph::new(vec![TextRun::new(text, 12.0)]))
    }

    fn document() -> Document {
        let mut doc = Document::new();
        let mut first = Page::new(1, 612.0, 792.0);
        first.blocks.push(paragraph("Introduction"));
        first.blocks.push(paragraph("Some body text that mentions the introduction."));
        let mut second = Page::new(2, 612.0, 792.0);
        second.blocks.push(paragraph("Results  and   Discussion"));
        second.blocks.push(paragraph("Methods"));
        doc.pages = vec![first, second];

        let mut chapter = OutlineEntry::new("Results and discussion", Some(2));
        chapter.add_child(OutlineEntry::new("Methods", Some(2)));
        doc.outline.add(OutlineEntry::new("Introduction", Some(1)));
        doc.outline.add(chapter);
        // Points at a page without a matching paragraph.
        doc.outline.add(OutlineEntry::new("Methods", Some(1)));
        doc
    }

    #[test]
    fn test_promotes_matching_paragraphs() {
        let mut doc = document();
        OutlineHeadings
            .apply(&mut doc, &ConversionOptions::default())
            .unwrap();

        match &doc.pages[0].blocks[0] {
            Block::Heading(h) => {
                assert_eq!(h.level, 1);
                assert_eq!(h.text(), "Introduction");
            }
            other => panic!("expected heading, got {:?}", other),
        }
        assert!(matches!(doc.pages[0].blocks[1], Block::Paragraph(_)));
        match (&doc.pages[1].blocks[0], &doc.pages[1].blocks[1]) {
            (Block::Heading(a), Block::Heading(b)) => {
                assert_eq!(a.level, 1);
                assert_eq!(b.level, 2);
            }
            other => panic!("expected two headings, got {:?}", other),
        }
    }

    #[test]
    fn test_each_title_promotes_once() {
        let mut doc = Document::new();
        let mut page = Page::new(1, 612.0, 792.0);
        page.blocks.push(paragraph("Summary"));
        page.blocks.push(paragraph("Summary"));
        doc.pages.push(page);
        doc.outline.add(OutlineEntry::new("Summary", Some(1)));

        OutlineHeadings
            .apply(&mut doc, &ConversionOptions::default())
            .unwrap();
        assert!(matches!(doc.pages[0].blocks[0], Block::Heading(_)));
        assert!(matches!(doc.pages[0].blocks[1], Block::Paragraph(_)));
    }

    #[test]
    fn test_deep_outline_levels_clamped() {
        let mut entry = OutlineEntry::new("Deepest", Some(1));
        for i in 0..7 {
            let mut parent = OutlineEntry::new(format!("Level {}", i), None);
            parent.add_child(entry);
            entry = parent;
        }
        let mut doc = Document::new();
        let mut page = Page::new(1, 612.0, 792.0);
        page.blocks.push(paragraph("deepest"));
        doc.pages.push(page);
        doc.outline.add(entry);

        OutlineHeadings
            .apply(&mut doc, &ConversionOptions::default())
            .unwrap();
        match &doc.pages[0].blocks[0] {
            Block::Heading(h) => assert_eq!(h.level, 6),
            other => panic!("expected heading, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_with_heading_detection() {
        let options = ConversionOptions {
            detect_headings: false,
            ..ConversionOptions::default()
        };
        assert!(!OutlineHeadings.should_run(&options));
    }
}

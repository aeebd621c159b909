//! Reading-order reconstruction for one page.
//!
//! Groups text spans into lines and lines into paragraphs and headings,
//! then interleaves tables and images by vertical position.

use std::cmp::Ordering;

use convert_core::document::{Alignment, Block, Heading, ImageBlock, Paragraph, Table, TextRun};

use crate::content::TextSpan;
use crate::headings::FontStatistics;

/// Used when a page has fewer than two lines to measure.
const DEFAULT_LINE_GAP: f64 = 10.0;

/// A font-size jump larger than this starts a new paragraph.
const FONT_SIZE_BREAK: f64 = 1.5;

/// Horizontal gap (in ems) between spans that reads as a space.
const SPACE_GAP_EM: f64 = 0.15;

/// A line of text: spans sharing a baseline, ordered left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub baseline: f64,
    pub spans: Vec<TextSpan>,
}

/// A horizontally contiguous piece of a line.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub x: f64,
    pub right: f64,
    pub text: String,
}

impl TextLine {
    pub fn left(&self) -> f64 {
        self.spans.iter().map(|s| s.x).fold(f64::INFINITY, f64::min)
    }

    pub fn right(&self) -> f64 {
        self.spans.iter().map(|s| s.right()).fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn top(&self) -> f64 {
        self.spans.iter().map(|s| s.top()).fold(f64::INFINITY, f64::min)
    }

    pub fn bottom(&self) -> f64 {
        self.spans.iter().map(|s| s.bottom()).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Size of the span carrying the most characters.
    pub fn font_size(&self) -> f64 {
        self.spans
            .iter()
            .max_by_key(|s| s.text.chars().count())
            .map(|s| s.font_size)
            .unwrap_or(0.0)
    }

    pub fn text(&self) -> String {
        self.runs().iter().map(|r| r.text.as_str()).collect()
    }

    /// Styled runs for the line, with adjacent same-style spans merged.
    pub fn runs(&self) -> Vec<TextRun> {
        let mut runs: Vec<TextRun> = Vec::new();
        let mut prev: Option<&TextSpan> = None;
        for span in &self.spans {
            let mut text = span.text.clone();
            if let Some(p) = prev {
                if needs_space(p, span) {
                    text.insert(0, ' ');
                }
            }
            let run = TextRun {
                text,
                font_size: span.font_size,
                bold: span.bold,
                italic: span.italic,
            };
            match runs.last_mut() {
                Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
                _ => runs.push(run),
            }
            prev = Some(span);
        }
        if let Some(first) = runs.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        if let Some(last) = runs.last_mut() {
            last.text = last.text.trim_end().to_string();
        }
        runs.retain(|r| !r.text.is_empty());
        runs
    }

    /// Split the line wherever the horizontal gap between spans is at least
    /// `min_gap` points.
    pub fn fragments(&self, min_gap: f64) -> Vec<Fragment> {
        let mut fragments: Vec<Fragment> = Vec::new();
        let mut prev: Option<&TextSpan> = None;
        for span in &self.spans {
            match (fragments.last_mut(), prev) {
                (Some(frag), Some(p)) if span.x - frag.right < min_gap => {
                    if needs_space(p, span) {
                        frag.text.push(' ');
                    }
                    frag.text.push_str(&span.text);
                    frag.right = frag.right.max(span.right());
                }
                _ => fragments.push(Fragment {
                    x: span.x,
                    right: span.right(),
                    text: span.text.clone(),
                }),
            }
            prev = Some(span);
        }
        for frag in &mut fragments {
            frag.text = frag.text.trim().to_string();
        }
        fragments.retain(|f| !f.text.is_empty());
        fragments
    }
}

fn needs_space(prev: &TextSpan, next: &TextSpan) -> bool {
    if prev.text.ends_with(char::is_whitespace) || next.text.starts_with(char::is_whitespace) {
        return false;
    }
    next.x - prev.right() > SPACE_GAP_EM * prev.font_size.max(next.font_size)
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Group spans into lines. Spans whose baselines differ by less than
/// `max(3pt, 0.3 × font size)` share a line.
pub fn group_into_lines(spans: &[TextSpan]) -> Vec<TextLine> {
    let mut sorted: Vec<&TextSpan> = spans.iter().filter(|s| !s.text.trim().is_empty()).collect();
    sorted.sort_by(|a, b| cmp_f64(a.baseline, b.baseline).then(cmp_f64(a.x, b.x)));

    let mut lines: Vec<TextLine> = Vec::new();
    for span in sorted {
        let tolerance = (0.3 * span.font_size).max(3.0);
        match lines
            .iter_mut()
            .find(|line| (line.baseline - span.baseline).abs() < tolerance)
        {
            Some(line) => line.spans.push(span.clone()),
            None => lines.push(TextLine {
                baseline: span.baseline,
                spans: vec![span.clone()],
            }),
        }
    }

    for line in &mut lines {
        line.spans.sort_by(|a, b| cmp_f64(a.x, b.x));
    }
    lines.sort_by(|a, b| cmp_f64(a.baseline, b.baseline));
    lines
}

/// Average positive gap between the bottom of one line and the top of the next.
fn compute_avg_line_gap(lines: &[TextLine]) -> f64 {
    let gaps: Vec<f64> = lines
        .windows(2)
        .map(|w| w[1].top() - w[0].bottom())
        .filter(|g| *g > 0.0)
        .collect();
    if gaps.is_empty() {
        return DEFAULT_LINE_GAP;
    }
    gaps.iter().sum::<f64>() / gaps.len() as f64
}

/// Join a line onto a paragraph's runs, undoing end-of-line hyphenation.
fn append_line(runs: &mut Vec<TextRun>, line_runs: Vec<TextRun>) {
    let next_starts_lower = line_runs
        .first()
        .and_then(|r| r.text.chars().next())
        .map(char::is_lowercase)
        .unwrap_or(false);

    if let Some(last) = runs.last_mut() {
        let mut tail = last.text.chars().rev();
        let hyphenated = tail.next() == Some('-') && tail.next().map(char::is_alphabetic).unwrap_or(false);
        if hyphenated && next_starts_lower {
            last.text.pop();
        } else {
            last.text.push(' ');
        }
    }

    for run in line_runs {
        match runs.last_mut() {
            Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
            _ => runs.push(run),
        }
    }
}

/// Horizontal extent of the page's body text.
#[derive(Debug, Clone, Copy)]
struct TextFrame {
    left: f64,
    right: f64,
}

impl TextFrame {
    fn of(lines: &[TextLine]) -> Option<Self> {
        if lines.is_empty() {
            return None;
        }
        Some(Self {
            left: lines.iter().map(TextLine::left).fold(f64::INFINITY, f64::min),
            right: lines.iter().map(TextLine::right).fold(f64::NEG_INFINITY, f64::max),
        })
    }

    fn alignment(&self, left: f64, right: f64) -> Alignment {
        let width = self.right - self.left;
        if width <= 0.0 {
            return Alignment::Left;
        }
        let left_gap = left - self.left;
        let right_gap = self.right - right;
        if left_gap > 0.05 * width && (left_gap - right_gap).abs() <= 0.1 * width {
            Alignment::Center
        } else if right_gap <= 2.0 && left_gap > 0.1 * width {
            Alignment::Right
        } else {
            Alignment::Left
        }
    }
}

/// Turns the lines, tables and images of one page into blocks.
pub struct PageLayout<'a> {
    /// Heading detection is off when `None`.
    pub font_stats: Option<&'a FontStatistics>,
    pub preserve_layout: bool,
}

enum Item {
    Line(usize),
    Table(Table),
    Image(ImageBlock),
}

impl<'a> PageLayout<'a> {
    /// `tables` and `images` carry the top coordinate they were found at.
    pub fn build_blocks(
        &self,
        lines: &[TextLine],
        tables: Vec<(f64, Table)>,
        images: Vec<(f64, ImageBlock)>,
    ) -> Vec<Block> {
        let frame = TextFrame::of(lines);
        let para_threshold = compute_avg_line_gap(lines) * 1.5;

        let mut items: Vec<(f64, Item)> = lines
            .iter()
            .enumerate()
            .map(|(i, line)| (line.top(), Item::Line(i)))
            .collect();
        items.extend(tables.into_iter().map(|(top, t)| (top, Item::Table(t))));
        items.extend(images.into_iter().map(|(top, img)| (top, Item::Image(img))));
        items.sort_by(|a, b| cmp_f64(a.0, b.0));

        let mut blocks: Vec<Block> = Vec::new();
        let mut current: Vec<&TextLine> = Vec::new();
        let mut prev_line: Option<&TextLine> = None;
        // Level of the heading block most recently emitted from a line.
        let mut open_heading: Option<u8> = None;

        for (_, item) in items {
            let idx = match item {
                Item::Line(idx) => idx,
                Item::Table(table) => {
                    self.flush(&mut current, frame, &mut blocks);
                    blocks.push(Block::Table(table));
                    prev_line = None;
                    open_heading = None;
                    continue;
                }
                Item::Image(image) => {
                    self.flush(&mut current, frame, &mut blocks);
                    blocks.push(Block::Image(image));
                    prev_line = None;
                    open_heading = None;
                    continue;
                }
            };

            let line = &lines[idx];
            let close_to_prev = prev_line
                .map(|p| line.top() - p.bottom() <= para_threshold)
                .unwrap_or(false);

            let level = self
                .font_stats
                .and_then(|stats| stats.heading_level(line.font_size(), &line.text()));
            if let Some(level) = level {
                self.flush(&mut current, frame, &mut blocks);
                match blocks.last_mut() {
                    Some(Block::Heading(h)) if open_heading == Some(level) && close_to_prev => {
                        append_line(&mut h.runs, line.runs());
                    }
                    _ => blocks.push(Block::Heading(Heading::new(level, line.runs()))),
                }
                open_heading = Some(level);
                prev_line = Some(line);
                continue;
            }
            open_heading = None;

            if let Some(prev) = current.last() {
                let size_changed = (line.font_size() - prev.font_size()).abs() > FONT_SIZE_BREAK;
                if !close_to_prev || size_changed {
                    self.flush(&mut current, frame, &mut blocks);
                }
            }
            current.push(line);
            prev_line = Some(line);
        }
        self.flush(&mut current, frame, &mut blocks);

        blocks
    }

    fn flush(&self, current: &mut Vec<&TextLine>, frame: Option<TextFrame>, blocks: &mut Vec<Block>) {
        if current.is_empty() {
            return;
        }
        let mut runs: Vec<TextRun> = Vec::new();
        for line in current.iter() {
            let line_runs = line.runs();
            if line_runs.is_empty() {
                continue;
            }
            if runs.is_empty() {
                runs = line_runs;
            } else {
                append_line(&mut runs, line_runs);
            }
        }

        if !runs.is_empty() {
            let mut paragraph = Paragraph::new(runs);
            if let (true, Some(frame)) = (self.preserve_layout, frame) {
                let left = current.iter().map(|l| l.left()).fold(f64::INFINITY, f64::min);
                let right = current.iter().map(|l| l.right()).fold(f64::NEG_INFINITY, f64::max);
                paragraph.alignment = frame.alignment(left, right);
                let indent = left - frame.left;
                if paragraph.alignment == Alignment::Left && indent > 1.0 {
                    paragraph.indent = indent;
                }
            }
            blocks.push(Block::Paragraph(paragraph));
        }
        current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convert_core::document::ImageFormat;

    /// A span whose width matches the 0.5em glyph estimate.
    fn span(text: &str, x: f64, baseline: f64, size: f64) -> TextSpan {
        let width = text.chars().count() as f64 * size * 0.5;
        TextSpan::new(text, x, baseline, size).with_width(width)
    }

    fn layout(preserve_layout: bool) -> PageLayout<'static> {
        PageLayout {
            font_stats: None,
            preserve_layout,
        }
    }

    fn paragraph_texts(blocks: &[Block]) -> Vec<String> {
        blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p.text()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_line_grouping() {
        let spans = vec![
            span("world", 110.0, 100.8, 12.0),
            span("Hello", 50.0, 100.0, 12.0),
            span("Next line", 50.0, 120.0, 12.0),
        ];
        let lines = group_into_lines(&spans);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans.len(), 2);
        assert_eq!(lines[0].text(), "Hello world");
        assert_eq!(lines[1].text(), "Next line");
    }

    #[test]
    fn test_line_tolerance_scales_with_font_size() {
        // 5pt apart: separate lines at 10pt, same line at 24pt.
        let small = group_into_lines(&[span("a", 0.0, 100.0, 10.0), span("b", 50.0, 105.0, 10.0)]);
        assert_eq!(small.len(), 2);
        let large = group_into_lines(&[span("a", 0.0, 100.0, 24.0), span("b", 50.0, 105.0, 24.0)]);
        assert_eq!(large.len(), 1);
    }

    #[test]
    fn test_adjacent_spans_joined_without_space() {
        let spans = vec![span("Hel", 50.0, 100.0, 10.0), span("lo", 65.0, 100.0, 10.0)];
        let lines = group_into_lines(&spans);
        assert_eq!(lines[0].text(), "Hello");
    }

    #[test]
    fn test_paragraph_detection() {
        let spans = vec![
            span("Line 1", 50.0, 100.0, 12.0),
            span("Line 2", 50.0, 114.0, 12.0),
            span("Line 3", 50.0, 160.0, 12.0),
            span("Line 4", 50.0, 174.0, 12.0),
        ];
        let lines = group_into_lines(&spans);
        let blocks = layout(false).build_blocks(&lines, vec![], vec![]);

        assert_eq!(paragraph_texts(&blocks), vec!["Line 1 Line 2", "Line 3 Line 4"]);
    }

    #[test]
    fn test_font_size_change_breaks_paragraph() {
        let spans = vec![
            span("Normal text", 50.0, 100.0, 12.0),
            span("Small print", 50.0, 112.0, 8.0),
        ];
        let lines = group_into_lines(&spans);
        let blocks = layout(false).build_blocks(&lines, vec![], vec![]);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_dehyphenation() {
        let spans = vec![
            span("A long conver-", 50.0, 100.0, 12.0),
            span("sation here", 50.0, 114.0, 12.0),
            span("Well-", 50.0, 128.0, 12.0),
            span("Known", 50.0, 142.0, 12.0),
        ];
        let lines = group_into_lines(&spans);
        let blocks = layout(false).build_blocks(&lines, vec![], vec![]);
        assert_eq!(
            paragraph_texts(&blocks),
            vec!["A long conversation here Well- Known"]
        );
    }

    #[test]
    fn test_headings_from_font_statistics() {
        let spans = vec![
            span("Chapter One", 50.0, 80.0, 24.0),
            span("Body text of the chapter goes here", 50.0, 110.0, 12.0),
            span("and continues on this line", 50.0, 124.0, 12.0),
        ];
        let stats = FontStatistics::from_spans(&spans);
        let lines = group_into_lines(&spans);
        let blocks = PageLayout {
            font_stats: Some(&stats),
            preserve_layout: false,
        }
        .build_blocks(&lines, vec![], vec![]);

        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::Heading(h) => {
                assert_eq!(h.level, 1);
                assert_eq!(h.text(), "Chapter One");
            }
            other => panic!("expected heading, got {:?}", other),
        }
        assert!(matches!(&blocks[1], Block::Paragraph(_)));
    }

    #[test]
    fn test_multi_line_heading_merged() {
        let spans = vec![
            span("A Very Long", 50.0, 80.0, 24.0),
            span("Title", 50.0, 108.0, 24.0),
            span("Body body body body body body", 50.0, 140.0, 12.0),
            span("body body body body body body", 50.0, 154.0, 12.0),
        ];
        let stats = FontStatistics::from_spans(&spans);
        let lines = group_into_lines(&spans);
        let blocks = PageLayout {
            font_stats: Some(&stats),
            preserve_layout: false,
        }
        .build_blocks(&lines, vec![], vec![]);

        match &blocks[0] {
            Block::Heading(h) => assert_eq!(h.text(), "A Very Long Title"),
            other => panic!("expected heading, got {:?}", other),
        }
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn test_image_and_table_interleaving() {
        let spans = vec![
            span("Before image", 50.0, 100.0, 12.0),
            span("Between", 50.0, 300.0, 12.0),
            span("After table", 50.0, 500.0, 12.0),
        ];
        let image = ImageBlock {
            data: vec![1, 2, 3],
            format: ImageFormat::Png,
            pixel_width: 10,
            pixel_height: 10,
            display_width: 100.0,
            display_height: 100.0,
        };
        let table = Table::new(vec![vec!["a".into(), "b".into()], vec!["c".into(), "d".into()]]);

        let lines = group_into_lines(&spans);
        let blocks = layout(false).build_blocks(&lines, vec![(400.0, table)], vec![(150.0, image)]);

        assert_eq!(blocks.len(), 5);
        assert!(matches!(&blocks[0], Block::Paragraph(_)));
        assert!(matches!(&blocks[1], Block::Image(_)));
        assert!(matches!(&blocks[2], Block::Paragraph(_)));
        assert!(matches!(&blocks[3], Block::Table(_)));
        assert!(matches!(&blocks[4], Block::Paragraph(_)));
    }

    #[test]
    fn test_alignment_and_indent_with_preserved_layout() {
        // Body column from 72 to 540.
        let full = "x".repeat(78);
        let spans = vec![
            span(&full, 72.0, 100.0, 12.0),
            span(&full, 72.0, 114.0, 12.0),
            span(&full, 72.0, 128.0, 12.0),
            span(&full, 72.0, 142.0, 12.0),
            span("Centered", 282.0, 200.0, 12.0),
            span("Right", 510.0, 260.0, 12.0),
            span("Indented", 108.0, 320.0, 12.0),
        ];
        let lines = group_into_lines(&spans);

        let blocks = layout(true).build_blocks(&lines, vec![], vec![]);
        let paras: Vec<&Paragraph> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(paras.len(), 4);
        assert_eq!(paras[0].alignment, Alignment::Left);
        assert_eq!(paras[0].indent, 0.0);
        assert_eq!(paras[1].alignment, Alignment::Center);
        assert_eq!(paras[2].alignment, Alignment::Right);
        assert_eq!(paras[3].alignment, Alignment::Left);
        assert!((paras[3].indent - 36.0).abs() < 0.01);

        let flat = layout(false).build_blocks(&lines, vec![], vec![]);
        for block in &flat {
            if let Block::Paragraph(p) = block {
                assert_eq!(p.alignment, Alignment::Left);
                assert_eq!(p.indent, 0.0);
            }
        }
    }

    #[test]
    fn test_fragments_split_on_wide_gaps() {
        let line = TextLine {
            baseline: 100.0,
            spans: vec![
                span("Name", 50.0, 100.0, 10.0),
                span("Qty", 200.0, 100.0, 10.0),
                span("Unit", 300.0, 100.0, 10.0),
                span("price", 322.0, 100.0, 10.0),
            ],
        };
        let frags = line.fragments(15.0);
        let texts: Vec<&str> = frags.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Name", "Qty", "Unit price"]);
        assert_eq!(frags[1].x, 200.0);
    }

    #[test]
    fn test_mixed_styles_produce_separate_runs() {
        let spans = vec![
            span("Plain", 50.0, 100.0, 12.0),
            span("bold", 85.0, 100.0, 12.0).with_font("Helvetica-Bold"),
            span("tail", 115.0, 100.0, 12.0),
        ];
        let lines = group_into_lines(&spans);
        let runs = lines[0].runs();
        assert_eq!(runs.len(), 3);
        assert!(!runs[0].bold);
        assert!(runs[1].bold);
        assert_eq!(lines[0].text(), "Plain bold tail");
    }
}

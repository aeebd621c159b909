//! Font-size statistics used to tell headings from body text.

use std::collections::HashMap;

use crate::content::TextSpan;

/// Lines longer than this (in characters) are never headings.
pub const MAX_HEADING_CHARS: usize = 200;

/// A line must be at least this many times the body size to be a heading.
const HEADING_RATIO: f64 = 1.2;

const DEFAULT_BODY_SIZE: f64 = 12.0;

/// Document-wide font-size histogram weighted by character count.
#[derive(Debug, Clone, Default)]
pub struct FontStatistics {
    /// Most common font size.
    pub body_size: f64,
    /// Distinct heading sizes, largest first.
    pub heading_sizes: Vec<f64>,
    histogram: HashMap<i64, usize>,
}

/// Sizes are bucketed to the nearest half point.
fn bucket(size: f64) -> i64 {
    (size * 2.0).round() as i64
}

impl FontStatistics {
    pub fn from_spans<'a>(spans: impl IntoIterator<Item = &'a TextSpan>) -> Self {
        let mut stats = Self::default();
        for span in spans {
            stats.add(span.font_size, span.text.chars().filter(|c| !c.is_whitespace()).count());
        }
        stats.analyze();
        stats
    }

    pub fn add(&mut self, size: f64, chars: usize) {
        if chars == 0 || size <= 0.0 {
            return;
        }
        *self.histogram.entry(bucket(size)).or_insert(0) += chars;
    }

    pub fn analyze(&mut self) {
        // Ties go to the smaller size.
        let body = self
            .histogram
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(key, _)| *key as f64 / 2.0);
        self.body_size = body.unwrap_or(DEFAULT_BODY_SIZE);

        let threshold = self.body_size * HEADING_RATIO;
        let mut sizes: Vec<f64> = self
            .histogram
            .keys()
            .map(|k| *k as f64 / 2.0)
            .filter(|s| *s >= threshold)
            .collect();
        sizes.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        self.heading_sizes = sizes;
    }

    /// Heading level (1-6) for a line of `text` set at `size`, or `None`
    /// for body text.
    pub fn heading_level(&self, size: f64, text: &str) -> Option<u8> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_HEADING_CHARS {
            return None;
        }
        let size = bucket(size) as f64 / 2.0;
        if size < self.body_size * HEADING_RATIO {
            return None;
        }
        self.heading_sizes
            .iter()
            .position(|h| size >= *h)
            .map(|idx| (idx + 1).min(6) as u8)
    }
}

//! Statistics reported after a conversion.

use std::fmt;
use std::time::Duration;

use crate::document::Document;

/// Best-effort counts describing a finished conversion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionStats {
    pub pages: usize,
    pub images: usize,
    pub tables: usize,
    pub elapsed: Duration,
}

impl ConversionStats {
    pub fn from_document(doc: &Document, elapsed: Duration) -> Self {
        Self {
            pages: doc.page_count(),
            images: doc.image_count(),
            tables: doc.table_count(),
            elapsed,
        }
    }
}

impl fmt::Display for ConversionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pages processed:  {}", self.pages)?;
        writeln!(f, "Images extracted: {}", self.images)?;
        writeln!(f, "Tables extracted: {}", self.tables)?;
        write!(
            f,
            "Processing time:  {:.2} seconds",
            self.elapsed.as_secs_f64()
        )
    }
}

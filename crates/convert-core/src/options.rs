//! Conversion options shared across the pipeline.

use serde::{Deserialize, Serialize};

use crate::document::DocumentFormat;

/// All options controlling the conversion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    // -- General --
    pub verbose: bool,

    // -- Output quality --
    pub quality: Quality,

    // -- Layout --
    /// Keep page size, page breaks, alignment and indentation of the source.
    pub preserve_layout: bool,
    pub detect_headings: bool,

    // -- Content extraction --
    pub extract_images: bool,
    pub extract_tables: bool,
    pub min_table_rows: usize,
    pub min_table_columns: usize,

    // -- Formats (CLI/extension only, not from config file) --
    #[serde(skip)]
    pub input_format: Option<DocumentFormat>,
    #[serde(skip)]
    pub output_format: Option<DocumentFormat>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            quality: Quality::High,
            preserve_layout: true,
            detect_headings: true,
            extract_images: true,
            extract_tables: true,
            min_table_rows: 2,
            min_table_columns: 2,
            input_format: None,
            output_format: None,
        }
    }
}

/// Output quality. Controls how far embedded images are downscaled and how
/// hard re-encoded JPEGs are compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
}

impl Quality {
    /// Longest allowed image edge in pixels, or `None` for no limit.
    pub fn max_image_edge(&self) -> Option<u32> {
        match self {
            Quality::Low => Some(800),
            Quality::Medium => Some(1600),
            Quality::High => None,
        }
    }

    /// JPEG quality (1-100) used when an image has to be re-encoded.
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            Quality::Low => 60,
            Quality::Medium => 80,
            Quality::High => 92,
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Quality::Low),
            "medium" => Ok(Quality::Medium),
            "high" => Ok(Quality::High),
            other => Err(format!(
                "invalid quality '{}': expected low, medium or high",
                other
            )),
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Quality::Low => "low",
            Quality::Medium => "medium",
            Quality::High => "high",
        };
        f.write_str(s)
    }
}

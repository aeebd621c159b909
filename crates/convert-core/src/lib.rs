//! Core types for the PDF → DOCX conversion pipeline: the document IR,
//! options, plugin traits and the pipeline orchestrator.

pub mod document;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod plugin;
pub mod stats;

pub use document::Document;
pub use error::{ConvertError, Result};
pub use options::ConversionOptions;
pub use stats::ConversionStats;

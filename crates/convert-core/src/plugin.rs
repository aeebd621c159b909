//! Plugin traits for input, output, and transform plugins.

use std::path::Path;

use crate::document::{Document, DocumentFormat};
use crate::error::Result;
use crate::options::ConversionOptions;

/// Progress reporter callback type.
pub type ProgressReporter = Box<dyn Fn(f64, &str) + Send + Sync>;

/// Input format plugin: reads a file into a Document.
pub trait InputPlugin: Send + Sync {
    /// Human-readable name of this plugin.
    fn name(&self) -> &str;

    /// File formats this plugin handles.
    fn supported_formats(&self) -> &[DocumentFormat];

    /// Read an input file into a Document.
    fn convert(&self, input_path: &Path, options: &ConversionOptions) -> Result<Document>;

    /// Called after the document has been read to allow format-specific
    /// clean-up.
    fn postprocess(&self, _doc: &mut Document, _options: &ConversionOptions) -> Result<()> {
        Ok(())
    }
}

/// Output format plugin: writes a Document to a target file.
pub trait OutputPlugin: Send + Sync {
    /// Human-readable name of this plugin.
    fn name(&self) -> &str;

    /// The output format this plugin produces.
    fn output_format(&self) -> DocumentFormat;

    /// Write a Document in the target format.
    fn convert(&self, doc: &Document, output_path: &Path, options: &ConversionOptions)
        -> Result<()>;
}

/// A transform that mutates the Document IR.
/// Transforms run between input and output in a fixed order.
pub trait Transform: Send + Sync {
    /// Human-readable name of this transform.
    fn name(&self) -> &str;

    /// Apply this transform to the document.
    fn apply(&self, doc: &mut Document, options: &ConversionOptions) -> Result<()>;

    /// Whether this transform should run given the current options.
    /// Default: always run.
    fn should_run(&self, _options: &ConversionOptions) -> bool {
        true
    }
}

//! DOCX output plugin: serializes a Document to an Office Open XML
//! word-processing package.

mod body;
mod props;
mod styles;
mod writer;

use std::path::Path;

use convert_core::document::{Document, DocumentFormat};
use convert_core::error::Result;
use convert_core::options::ConversionOptions;
use convert_core::plugin::OutputPlugin;

pub struct DocxOutputPlugin;

impl OutputPlugin for DocxOutputPlugin {
    fn name(&self) -> &str {
        "DOCX Output"
    }

    fn output_format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn convert(&self, doc: &Document, output_path: &Path, options: &ConversionOptions) -> Result<()> {
        log::info!("Writing DOCX: {}", output_path.display());
        writer::write_docx(doc, output_path, options)
    }
}

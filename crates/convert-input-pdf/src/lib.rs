//! PDF input plugin: reads text, tables, images, metadata and bookmarks
//! from a PDF file into the document model.

mod content;
mod extract;
mod headings;
mod images;
mod info;
mod metadata;
mod outline;
mod tables;
mod text_builder;

#[cfg(test)]
mod test_pdf;

use std::path::Path;

use convert_core::document::{Document, DocumentFormat};
use convert_core::error::{ConvertError, Result};
use convert_core::options::ConversionOptions;
use convert_core::plugin::InputPlugin;
use convert_utils::fs::validate_file;

pub use info::{get_pdf_info, is_pdf_readable, PdfInfo};

pub struct PdfInputPlugin;

impl InputPlugin for PdfInputPlugin {
    fn name(&self) -> &str {
        "PDF Input"
    }

    fn supported_formats(&self) -> &[DocumentFormat] {
        &[DocumentFormat::Pdf]
    }

    fn convert(&self, input_path: &Path, options: &ConversionOptions) -> Result<Document> {
        validate_file(input_path, ".pdf").map_err(|e| ConvertError::InvalidInput(e.to_string()))?;
        log::info!("Reading PDF: {}", input_path.display());
        extract::extract_pdf(input_path, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::{text_ops, TestPdf};

    #[test]
    fn test_plugin_reads_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.pdf");
        let mut pdf = TestPdf::new();
        pdf.page(text_ops("F1", 12, 72.0, 700.0, "Hello plugin"));
        pdf.save(&path);

        let plugin = PdfInputPlugin;
        assert_eq!(plugin.supported_formats(), &[DocumentFormat::Pdf]);
        let doc = plugin.convert(&path, &ConversionOptions::default()).unwrap();
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.plain_text().trim(), "Hello plugin");
    }

    #[test]
    fn test_plugin_rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "text").unwrap();

        let err = PdfInputPlugin
            .convert(&path, &ConversionOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidInput(_)));

        let missing = PdfInputPlugin
            .convert(&dir.path().join("missing.pdf"), &ConversionOptions::default())
            .unwrap_err();
        assert!(matches!(missing, ConvertError::InvalidInput(_)));
    }
}

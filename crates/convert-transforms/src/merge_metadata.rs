//! MergeMetadata transform: fills in metadata the output package requires.

use convert_core::document::Document;
use convert_core::error::Result;
use convert_core::options::ConversionOptions;
use convert_core::plugin::Transform;

/// Ensures the document has a title and a language.
pub struct MergeMetadata;

impl Transform for MergeMetadata {
    fn name(&self) -> &str {
        "MergeMetadata"
    }

    fn apply(&self, doc: &mut Document, _options: &ConversionOptions) -> Result<()> {
        if doc.metadata.title().is_none() {
            doc.metadata.set_title("Untitled");
        }

        if !doc.metadata.contains("language") {
            doc.metadata.set("language", "en");
        }

        log::info!("Metadata merged: title={:?}", doc.metadata.title());
        Ok(())
    }
}

//! Document transforms: applied between PDF extraction and DOCX output.

pub mod image_rescale;
pub mod merge_metadata;
pub mod outline_headings;

use convert_core::plugin::Transform;

/// Return the standard transform chain in execution order.
///
/// Conditional transforms use `should_run()` to skip when not needed.
/// Order:
///  1. MergeMetadata   (always)
///  2. OutlineHeadings (conditional: detect_headings)
///  3. ImageRescale    (conditional: extract_images)
pub fn standard_transforms() -> Vec<Box<dyn Transform>> {
    vec![
        Box::new(merge_metadata::MergeMetadata),
        Box::new(outline_headings::OutlineHeadings),
        Box::new(image_rescale::ImageRescale),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use convert_core::options::ConversionOptions;

    #[test]
    fn test_standard_order() {
        let names: Vec<String> = standard_transforms()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["MergeMetadata", "OutlineHeadings", "ImageRescale"]);
    }

    #[test]
    fn test_conditional_transforms_skip() {
        let options = ConversionOptions {
            detect_headings: false,
            extract_images: false,
            ..ConversionOptions::default()
        };
        let running: Vec<String> = standard_transforms()
            .iter()
            .filter(|t| t.should_run(&options))
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(running, vec!["MergeMetadata"]);
    }
}

//! The `convert`, `batch` and `info` subcommands.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use convert_core::document::DocumentFormat;
use convert_core::options::ConversionOptions;
use convert_core::pipeline::{Pipeline, PipelineBuilder};
use convert_core::stats::ConversionStats;
use convert_input_pdf::{get_pdf_info, PdfInputPlugin};
use convert_output_docx::DocxOutputPlugin;
use convert_utils::fs::{
    create_output_directory, generate_output_filename, get_file_size, get_pdf_files,
    sanitize_filename, validate_file,
};

/// PDF input, standard transforms, DOCX output. Progress goes to the log.
pub fn build_pipeline() -> Result<Pipeline> {
    PipelineBuilder::new()
        .input(Box::new(PdfInputPlugin))
        .output(Box::new(DocxOutputPlugin))
        .transforms(convert_transforms::standard_transforms())
        .progress_reporter(Box::new(|frac, msg| {
            if frac < 1.0 {
                log::info!("[{:3.0}%] {}", frac * 100.0, msg);
            } else {
                log::info!("Done!");
            }
        }))
        .build()
        .context("Failed to assemble conversion pipeline")
}

/// Convert one validated PDF to `output`.
pub fn convert_file(input: &Path, output: &Path, options: &ConversionOptions) -> Result<ConversionStats> {
    let mut options = options.clone();
    options.input_format = Some(DocumentFormat::Pdf);
    options.output_format = Some(DocumentFormat::Docx);

    let pipeline = build_pipeline()?;
    pipeline
        .run(input, output, &options)
        .with_context(|| format!("Failed to convert {}", input.display()))
}

pub fn run_convert(input: &Path, output: Option<&Path>, options: &ConversionOptions) -> Result<()> {
    validate_file(input, ".pdf").context("Invalid PDF file")?;
    let output = generate_output_filename(input, output);
    create_output_directory(&output)
        .with_context(|| format!("Cannot create directory for {}", output.display()))?;

    println!("Input file:  {}", display_name(input));
    println!("File size:   {}", get_file_size(input));
    println!("Output file: {}", display_name(&output));
    println!("Quality:     {}", options.quality);

    let stats = convert_file(input, &output, options)?;

    println!("Conversion successful: {}", output.display());
    if options.verbose {
        println!();
        println!("{}", stats);
    }
    Ok(())
}

/// Per-file outcome counts of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Output path for `input` inside `output_dir`.
pub fn batch_output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = sanitize_filename(&stem);
    if name.is_empty() {
        name = "output".to_string();
    }
    output_dir.join(format!("{}.docx", name))
}

/// Convert every PDF directly inside `input_dir`. A failing file is
/// counted and the batch moves on.
pub fn run_batch(input_dir: &Path, output_dir: &Path, options: &ConversionOptions) -> Result<BatchSummary> {
    if !input_dir.is_dir() {
        bail!("Not a directory: {}", input_dir.display());
    }
    let files = get_pdf_files(input_dir)
        .with_context(|| format!("Cannot read directory {}", input_dir.display()))?;

    let mut summary = BatchSummary {
        total: files.len(),
        ..BatchSummary::default()
    };
    if files.is_empty() {
        log::warn!("No PDF files found in {}", input_dir.display());
        return Ok(summary);
    }

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Cannot create {}", output_dir.display()))?;
    println!("Found {} PDF files", files.len());
    println!("Output directory: {}", output_dir.display());

    for (i, file) in files.iter().enumerate() {
        println!("[{}/{}] Processing: {}", i + 1, files.len(), display_name(file));
        let output = batch_output_path(file, output_dir);
        match convert_file(file, &output, options) {
            Ok(stats) => {
                summary.successful += 1;
                println!("  Success");
                if options.verbose {
                    println!("{}", stats);
                }
            }
            Err(e) => {
                summary.failed += 1;
                println!("  Error: {:#}", e);
                log::debug!("Batch item {} failed: {:?}", file.display(), e);
            }
        }
    }

    println!();
    println!("Batch conversion summary:");
    println!("  Total files: {}", summary.total);
    println!("  Successful:  {}", summary.successful);
    println!("  Failed:      {}", summary.failed);
    Ok(summary)
}

pub fn run_info(input: &Path, json: bool) -> Result<()> {
    if !input.is_file() {
        bail!("File not found: {}", input.display());
    }
    let info = get_pdf_info(input);
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("File:      {}", display_name(input));
    println!("Size:      {}", info.size);
    println!("Pages:     {}", info.pages);
    println!("Title:     {}", info.title);
    println!("Author:    {}", info.author);
    if let Some(producer) = &info.producer {
        println!("Producer:  {}", producer);
    }
    println!("Has text:  {}", yes_no(info.has_text));
    println!("Has images: {}", yes_no(info.has_images));
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_output_path_sanitizes_stem() {
        let out = batch_output_path(Path::new("/in/report: final?.pdf"), Path::new("/out"));
        assert_eq!(out, PathBuf::from("/out/report_ final_.docx"));
        let out = batch_output_path(Path::new("/in/plain.PDF"), Path::new("/out"));
        assert_eq!(out, PathBuf::from("/out/plain.docx"));
    }

    #[test]
    fn test_batch_on_empty_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let summary = run_batch(input.path(), output.path(), &ConversionOptions::default()).unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[test]
    fn test_batch_counts_failures() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::write(input.path().join("a.pdf"), b"not a pdf").unwrap();
        std::fs::write(input.path().join("b.pdf"), b"also not a pdf").unwrap();
        std::fs::write(input.path().join("notes.txt"), b"ignored").unwrap();

        let summary = run_batch(input.path(), output.path(), &ConversionOptions::default()).unwrap();
        assert_eq!(
            summary,
            BatchSummary {
                total: 2,
                successful: 0,
                failed: 2
            }
        );
    }

    #[test]
    fn test_batch_rejects_file_as_input_dir() {
        let input = tempfile::tempdir().unwrap();
        let file = input.path().join("x.pdf");
        std::fs::write(&file, b"x").unwrap();
        assert!(run_batch(&file, input.path(), &ConversionOptions::default()).is_err());
    }

    #[test]
    fn test_convert_rejects_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("doc.txt");
        std::fs::write(&input, b"text").unwrap();
        let err = run_convert(&input, None, &ConversionOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("extension"));
    }
}

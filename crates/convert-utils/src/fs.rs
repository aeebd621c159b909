//! Filesystem helpers used by the command-line front end.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Longest file name (in characters) produced by [`sanitize_filename`].
pub const MAX_FILENAME_CHARS: usize = 200;

const FORBIDDEN_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

#[derive(Error, Debug)]
pub enum FsError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    #[error("File must have {expected} extension: {path}")]
    WrongExtension { path: PathBuf, expected: String },
}

/// Check that `path` is an existing regular file whose name ends with
/// `extension` (case-insensitive, e.g. `".pdf"`).
pub fn validate_file(path: &Path, extension: &str) -> Result<(), FsError> {
    if !path.exists() {
        return Err(FsError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(FsError::NotAFile(path.to_path_buf()));
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !name.ends_with(&extension.to_lowercase()) {
        return Err(FsError::WrongExtension {
            path: path.to_path_buf(),
            expected: extension.to_string(),
        });
    }
    Ok(())
}

/// Render a byte count with binary unit steps, e.g. `2.5 MB`.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

/// Human-readable size of the file at `path`, or `"Unknown"`.
pub fn get_file_size(path: &Path) -> String {
    match std::fs::metadata(path) {
        Ok(meta) => format_size(meta.len()),
        Err(e) => {
            log::debug!("Cannot stat {}: {}", path.display(), e);
            "Unknown".to_string()
        }
    }
}

/// Make `name` safe to use as a file name on common filesystems.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if FORBIDDEN_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    replaced.trim().chars().take(MAX_FILENAME_CHARS).collect()
}

/// The output path for converting `input`: `output` when given, otherwise
/// a `.docx` file next to the input with the same stem.
pub fn generate_output_filename(input: &Path, output: Option<&Path>) -> PathBuf {
    if let Some(output) = output {
        return output.to_path_buf();
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let dir = input.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!("{stem}.docx"))
}

/// Create the parent directory of `output_file` if it is missing.
/// Returns whether a directory was created.
pub fn create_output_directory(output_file: &Path) -> io::Result<bool> {
    match output_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            std::fs::create_dir_all(parent)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// All `.pdf` files directly inside `dir`, sorted by path.
pub fn get_pdf_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

//! Markdown export of the assembled documents
//!
//! The summary index and the full document are written as plain markdown
//! files in the shape of `llms.txt` and `llms-full.txt`.

use crate::output::assembler::{AssemblyError, OutputDocument};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the summary and full documents to the given paths
///
/// Either path may be omitted. Parent directories are created as needed.
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - The files that were written
/// * `Err(AssemblyError)` - Failed to write a file
pub fn export_documents(
    document: &OutputDocument,
    item_name: &str,
    summary_path: Option<&Path>,
    full_path: Option<&Path>,
) -> Result<Vec<PathBuf>, AssemblyError> {
    let mut written = Vec::new();

    if let Some(path) = summary_path {
        write_markdown(path, &format_summary_file(item_name, &document.summary))?;
        written.push(path.to_path_buf());
    }

    if let Some(path) = full_path {
        write_markdown(path, &format_full_file(item_name, &document.full))?;
        written.push(path.to_path_buf());
    }

    Ok(written)
}

/// Formats the summary index as an `llms.txt` style file
pub fn format_summary_file(item_name: &str, summary: &str) -> String {
    // A rewritten summary may already carry its own heading
    if summary.trim_start().starts_with("# ") {
        return format!("{}\n", summary.trim_end());
    }
    format!("# {}\n\n{}\n", item_name, summary.trim_end())
}

/// Formats the full document as an `llms-full.txt` style file
pub fn format_full_file(item_name: &str, full: &str) -> String {
    if full.is_empty() {
        return format!("<!-- {}: no classified pages -->\n", item_name);
    }
    format!("{}\n", full.trim_end())
}

fn write_markdown(path: &Path, contents: &str) -> Result<(), AssemblyError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    tracing::info!("Wrote {} ({} bytes)", path.display(), contents.len());

    Ok(())
}

//! Write run outputs: the text report, the SVG chart, and the optional JSON export.
//!
//! All writers create missing parent directories on demand. A run's outputs
//! are staged next to their targets and only renamed into place once every
//! one of them has been written, so a failed run leaves no partial results.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::ReportFile;
use crate::error::AppError;

/// One file of a staged write.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: String,
    /// Short description used in log lines and error messages.
    pub what: &'static str,
}

/// Write a text file (report or pre-rendered SVG).
pub fn write_text(path: &Path, contents: &str, what: &str) -> Result<(), AppError> {
    ensure_parent(path)?;
    write_file(path, contents, what)?;
    info!(path = %path.display(), "{what} saved");
    Ok(())
}

fn write_file(path: &Path, contents: &str, what: &str) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create {what} '{}': {e}", path.display())))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| AppError::new(2, format!("Failed to write {what} '{}': {e}", path.display())))
}

/// Write every file or none of them.
///
/// Each file is first written to a hidden sibling (`.<name>.tmp`); the staged
/// files are then renamed over their targets. On any failure the staged files
/// and any targets already renamed in this call are removed.
pub fn write_all(files: &[OutputFile]) -> Result<(), AppError> {
    let mut staged: Vec<(PathBuf, &OutputFile)> = Vec::with_capacity(files.len());
    for file in files {
        let tmp = staging_path(&file.path);
        let result = ensure_parent(&file.path).and_then(|()| write_file(&tmp, &file.contents, file.what));
        if let Err(err) = result {
            remove_all(staged.iter().map(|(tmp, _)| tmp.as_path()).chain(std::iter::once(tmp.as_path())));
            return Err(err);
        }
        staged.push((tmp, file));
    }

    for (i, (tmp, file)) in staged.iter().enumerate() {
        if let Err(e) = std::fs::rename(tmp, &file.path) {
            let renamed = staged[..i].iter().map(|(_, f)| f.path.as_path());
            let pending = staged[i..].iter().map(|(tmp, _)| tmp.as_path());
            remove_all(renamed.chain(pending));
            return Err(AppError::new(
                2,
                format!("Failed to write {} '{}': {e}", file.what, file.path.display()),
            ));
        }
        info!(path = %file.path.display(), "{} saved", file.what);
    }
    Ok(())
}

/// Serialize the JSON export.
pub fn report_json(report: &ReportFile) -> Result<String, AppError> {
    serde_json::to_string_pretty(report).map_err(|e| AppError::new(2, format!("Failed to write JSON export: {e}")))
}

/// Read a JSON export back (used by tests and downstream tooling).
pub fn read_report_json(path: &Path) -> Result<ReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open JSON export '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid JSON export: {e}")))
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn remove_all<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        if path.is_file() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "could not clean up");
            }
        }
    }
}

fn ensure_parent(path: &Path) -> Result<(), AppError> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    if !dir.exists() {
        create_dir_all(dir)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", dir.display())))?;
        info!(dir = %dir.display(), "Created directory");
    }
    Ok(())
}

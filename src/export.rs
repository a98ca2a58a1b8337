//! Write rendered exports to disk.
//!
//! The backend renders the bytes; this module only places them in the
//! configured output directory as `{filename}.{format}`.

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};

use crate::session::ExportedFile;

/// Writes `file` into `dir`, creating the directory if needed.
///
/// The file name must be a single path component; anything that would
/// land outside `dir` is rejected. An existing file with the same name is
/// overwritten. Returns the full path written.
pub fn write_export(dir: &Path, file: &ExportedFile) -> Result<PathBuf> {
    let mut components = Path::new(&file.file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => anyhow::bail!(
            "export file name must not contain a path: '{}'",
            file.file_name
        ),
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export directory {}", dir.display()))?;
    let path = dir.join(&file.file_name);
    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = file.bytes.len(), "export written");
    Ok(path)
}

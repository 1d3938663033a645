//! Chapter archiving
//!
//! A completed chapter directory is compressed into a single zip archive in
//! the series directory; the source directory is removed only after the
//! archive is fully written. On failure the partial archive is deleted and
//! the directory is left intact so a later run can recover it.

use crate::error::{ArchiveError, Error, Result};
use crate::transport::unique_path;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Compress `chapter_dir` into `<dest_dir>/<archive_stem>.zip`
///
/// Name collisions are avoided with a `(n)` suffix before the extension.
/// Files are added in sorted order at the archive root. Returns the path of
/// the written archive.
///
/// # Errors
/// Returns [`ArchiveError`] on any write failure; the chapter directory is
/// never removed unless the archive was written completely. A failure to
/// remove the directory *after* a complete write is logged and swallowed:
/// the archive exists and the chapter counts as done.
pub fn archive_chapter(
    chapter_dir: &Path,
    archive_stem: &str,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let zip_path = unique_path(&dest_dir.join(format!("{}.zip", archive_stem)))?;

    if let Err(e) = write_archive(chapter_dir, &zip_path) {
        // Leave the chapter directory alone; only the partial zip goes.
        let _ = std::fs::remove_file(&zip_path);
        return Err(e);
    }

    if let Err(e) = std::fs::remove_dir_all(chapter_dir) {
        tracing::warn!(
            chapter_dir = %chapter_dir.display(),
            error = %e,
            "archive written but the source directory could not be removed"
        );
    }
    tracing::info!(
        chapter_dir = %chapter_dir.display(),
        archive = %zip_path.display(),
        "chapter archived"
    );
    Ok(zip_path)
}

fn write_archive(chapter_dir: &Path, zip_path: &Path) -> Result<()> {
    let wrap = |reason: String| {
        Error::Archive(ArchiveError::WriteFailed {
            archive: zip_path.to_path_buf(),
            reason,
        })
    };

    let mut entries: Vec<PathBuf> = std::fs::read_dir(chapter_dir)
        .map_err(|e| wrap(format!("failed to read {}: {}", chapter_dir.display(), e)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    entries.sort();

    let file = std::fs::File::create(zip_path)
        .map_err(|e| wrap(format!("failed to create archive: {}", e)))?;
    let mut writer = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &entries {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| wrap(format!("unrepresentable filename in {}", path.display())))?;
        writer
            .start_file(name, options)
            .map_err(|e| wrap(format!("failed to start entry {}: {}", name, e)))?;
        let mut src = std::fs::File::open(path)
            .map_err(|e| wrap(format!("failed to open {}: {}", path.display(), e)))?;
        std::io::copy(&mut src, &mut writer)
            .map_err(|e| wrap(format!("failed to compress {}: {}", name, e)))?;
    }

    let mut file = writer
        .finish()
        .map_err(|e| wrap(format!("failed to finish archive: {}", e)))?;
    file.flush()
        .map_err(|e| wrap(format!("failed to flush archive: {}", e)))?;
    Ok(())
}

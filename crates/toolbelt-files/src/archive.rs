//! Archive: compress a folder into a timestamped `.zip`.
//!
//! The archive is named `<folder>_<YYYYMMDD_HHMMSS>.zip` and entries are
//! stored relative to the folder, so extracting recreates its contents rather
//! than the folder itself. The zip is written to a temporary file in the
//! output directory and renamed into place once complete.

use chrono::{DateTime, Local, NaiveDateTime};
use std::fs::{self, File};
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const ARCHIVE_EXTENSION: &str = "zip";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// What to archive and where to put it.
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub source: PathBuf,
    pub output_dir: PathBuf,
}

/// Outcome of a successful archive run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub path: PathBuf,
    /// Size of the archive on disk.
    pub bytes: u64,
    /// Regular files stored.
    pub files: usize,
    /// Entries that could not be read and were left out.
    pub skipped: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("source folder '{}' does not exist", .0.display())]
    SourceMissing(PathBuf),
    #[error("source '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot create output directory '{}': {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write archive '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode archive '{}': {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}

/// `<folder name>_<timestamp>.zip` for `source` at `now`.
pub fn archive_file_name(source: &Path, now: NaiveDateTime) -> String {
    format!(
        "{}_{}.{ARCHIVE_EXTENSION}",
        folder_name(source),
        now.format(TIMESTAMP_FORMAT)
    )
}

/// `source.file_name()`, resolving `.`/`..` through the filesystem first.
fn folder_name(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            fs::canonicalize(source)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "archive".to_string())
}

/// Compress `opts.source` into `opts.output_dir`, creating the directory if
/// needed. Unreadable entries are logged and skipped. On failure nothing is
/// left in `output_dir`.
pub fn create_archive(
    opts: &ArchiveOptions,
    now: DateTime<Local>,
) -> Result<ArchiveReport, ArchiveError> {
    let source = &opts.source;
    if !source.exists() {
        return Err(ArchiveError::SourceMissing(source.clone()));
    }
    if !source.is_dir() {
        return Err(ArchiveError::NotADirectory(source.clone()));
    }

    fs::create_dir_all(&opts.output_dir).map_err(|e| ArchiveError::OutputDir {
        path: opts.output_dir.clone(),
        source: e,
    })?;

    let path = opts
        .output_dir
        .join(archive_file_name(source, now.naive_local()));
    let write_err = |e| ArchiveError::Write {
        path: path.clone(),
        source: e,
    };
    let zip_err = |e| ArchiveError::Zip {
        path: path.clone(),
        source: e,
    };

    // Dropping the temp file on any early return deletes it.
    let partial = NamedTempFile::new_in(&opts.output_dir).map_err(write_err)?;
    // The archive may live inside the folder being archived.
    let self_path = fs::canonicalize(partial.path()).ok();

    let mut zip = ZipWriter::new(partial);
    let (files, skipped) = write_entries(&mut zip, source, self_path.as_deref()).map_err(zip_err)?;
    let partial = zip.finish().map_err(zip_err)?;
    partial
        .persist(&path)
        .map_err(|e| write_err(e.error))?;

    let bytes = fs::metadata(&path).map_err(write_err)?.len();
    tracing::info!(
        source = %source.display(),
        archive = %path.display(),
        bytes,
        files,
        "folder archived"
    );

    Ok(ArchiveReport {
        path,
        bytes,
        files,
        skipped,
    })
}

/// Add every entry below `source` to `zip`, skipping `exclude`. Returns the
/// number of files stored and entries skipped.
fn write_entries<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    source: &Path,
    exclude: Option<&Path>,
) -> Result<(usize, usize), ZipError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0usize;
    let mut skipped = 0usize;

    for entry in WalkDir::new(source).min_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        if exclude.is_some() && fs::canonicalize(entry.path()).ok().as_deref() == exclude {
            continue;
        }
        let name = entry_name(rel);

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
            continue;
        }

        let mut file = match File::open(entry.path()) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(entry = %entry.path().display(), error = %e, "skipping entry");
                skipped += 1;
                continue;
            }
        };
        let large = file.metadata().map(|m| m.len() >= u64::from(u32::MAX)).unwrap_or(false);
        zip.start_file(name, options.large_file(large))?;
        std::io::copy(&mut file, zip)?;
        files += 1;
        tracing::debug!(file = %rel.display(), "added");
    }

    Ok((files, skipped))
}

/// Zip entry names always use `/`.
fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

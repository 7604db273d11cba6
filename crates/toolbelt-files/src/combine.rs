//! Combine: concatenate selected source files into one text dump.
//!
//! Sources are processed in a fixed order: recursive folders, flat folders,
//! then individual files. Every file is included at most once (by canonical
//! path), each under a `<comment> File: <path>` banner and followed by an
//! 80-column `=` rule. An optional tree of the recursive folders leads the
//! output.
//!
//! Missing inputs and unreadable files are logged and skipped; only writing
//! the final output can fail the run.

use crate::prefix::comment_prefix;
use crate::tree::render_tree;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use toolbelt_core::config::CombineConfig;
use walkdir::WalkDir;

const PROGRESS_EVERY: usize = 25;

fn rule() -> String {
    "=".repeat(80)
}

/// Counters for a finished combine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombineReport {
    /// Files written into the output.
    pub files: usize,
    /// Files that could not be read, plus missing folders and files.
    pub skipped: usize,
    /// Size of the combined text in bytes.
    pub bytes: usize,
    pub output: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum CombineError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Build the combined text and write it to `cfg.output_file`.
pub fn combine(cfg: &CombineConfig) -> Result<CombineReport, CombineError> {
    let (text, mut report) = render(cfg);

    let write_err = |source| CombineError::Write {
        path: cfg.output_file.clone(),
        source,
    };
    if let Some(parent) = cfg.output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(&cfg.output_file, &text).map_err(write_err)?;

    tracing::info!(
        files = report.files,
        skipped = report.skipped,
        output = %cfg.output_file.display(),
        "combined {} files", report.files
    );
    report.output = cfg.output_file.clone();
    Ok(report)
}

/// Build the combined text without writing it anywhere.
pub fn render(cfg: &CombineConfig) -> (String, CombineReport) {
    let mut combiner = Combiner::new(cfg);

    if cfg.include_file_structure && !cfg.recursive_folders.is_empty() {
        combiner.structure_header();
    }
    for folder in &cfg.recursive_folders {
        combiner.recursive(folder);
    }
    for folder in &cfg.flat_folders {
        combiner.flat(folder);
    }
    for file in &cfg.include_files {
        combiner.single(file);
    }

    let report = CombineReport {
        files: combiner.files,
        skipped: combiner.skipped,
        bytes: combiner.out.len(),
        output: cfg.output_file.clone(),
    };
    (combiner.out, report)
}

/// Decode UTF-8, dropping invalid byte sequences instead of replacing them.
pub fn decode_lossy_dropping(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

// ---------------------------------------------------------------------------
// Combiner
// ---------------------------------------------------------------------------

struct Combiner<'a> {
    cfg: &'a CombineConfig,
    out: String,
    seen: HashSet<PathBuf>,
    files: usize,
    skipped: usize,
}

impl<'a> Combiner<'a> {
    fn new(cfg: &'a CombineConfig) -> Self {
        // A previous output sitting inside a scanned folder must not be
        // folded into the next one.
        let seen = fs::canonicalize(&cfg.output_file).into_iter().collect();
        Self {
            cfg,
            out: String::new(),
            seen,
            files: 0,
            skipped: 0,
        }
    }

    fn structure_header(&mut self) {
        tracing::debug!("generating file structure");
        self.out.push_str(&format!("{}\nPROJECT FILE STRUCTURE\n{}\n\n", rule(), rule()));

        for folder in &self.cfg.recursive_folders {
            if !folder.exists() {
                continue;
            }
            let name = folder
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| folder.display().to_string());
            self.out
                .push_str(&format!("Root: {name} ({})\n", folder.display()));
            self.out.push_str(&render_tree(folder, self.cfg));
            self.out.push('\n');
        }

        self.out.push_str(&format!("\n{}\n\n", rule()));
    }

    fn recursive(&mut self, folder: &Path) {
        if !folder.exists() {
            tracing::warn!(folder = %folder.display(), "folder not found");
            self.skipped += 1;
            return;
        }
        tracing::info!(folder = %folder.display(), "scanning");

        let base = folder.parent().unwrap_or(Path::new(""));
        let cfg = self.cfg;

        // Files before subdirectories at every level, then by name.
        let walker = WalkDir::new(folder)
            .sort_by(|a, b| {
                a.file_type()
                    .is_dir()
                    .cmp(&b.file_type().is_dir())
                    .then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(e.file_type().is_dir() && cfg.is_excluded(&e.file_name().to_string_lossy()))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "cannot walk entry");
                    self.skipped += 1;
                    continue;
                }
            };
            let path = entry.path();
            // `is_file` follows symlinks, so linked files are included.
            if entry.file_type().is_dir() || !path.is_file() {
                continue;
            }
            if !cfg.accepts_extension(path) {
                continue;
            }
            let display = path
                .strip_prefix(base)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| path.display().to_string());
            self.include(path, &display, false);
        }
    }

    fn flat(&mut self, folder: &Path) {
        if !folder.exists() {
            tracing::warn!(folder = %folder.display(), "folder not found");
            self.skipped += 1;
            return;
        }
        tracing::info!(folder = %folder.display(), "scanning (non-recursive)");

        let mut files: Vec<PathBuf> = match fs::read_dir(folder) {
            Ok(entries) => entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect(),
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "cannot list folder");
                self.skipped += 1;
                return;
            }
        };
        files.sort();

        for path in files {
            if !self.cfg.accepts_extension(&path) {
                continue;
            }
            let display = absolute_display(&path);
            self.include(&path, &display, false);
        }
    }

    fn single(&mut self, file: &Path) {
        if !file.is_file() {
            tracing::warn!(file = %file.display(), "file not found");
            self.skipped += 1;
            return;
        }
        if !self.cfg.accepts_extension(file) {
            return;
        }
        tracing::info!(file = %file.display(), "adding");
        let display = absolute_display(file);
        self.include(file, &display, true);
    }

    /// Append one file unless it was already included.
    fn include(&mut self, path: &Path, display: &str, note_duplicate: bool) {
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if self.seen.contains(&canonical) {
            if note_duplicate {
                tracing::info!(file = %path.display(), "skipping duplicate file");
            }
            return;
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "could not read file");
                self.skipped += 1;
                return;
            }
        };
        let text = decode_lossy_dropping(&bytes);
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        self.out
            .push_str(&format!("{} File: {display}\n", comment_prefix(ext)));
        self.out.push_str(&text);
        if !text.ends_with('\n') {
            self.out.push('\n');
        }
        self.out.push_str(&format!("\n{}\n\n", rule()));

        self.seen.insert(canonical);
        self.files += 1;
        if self.files % PROGRESS_EVERY == 0 {
            tracing::info!(files = self.files, "processed {} files", self.files);
        }
    }
}

fn absolute_display(path: &Path) -> String {
    fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

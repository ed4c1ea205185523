//! Site scanning.
//!
//! Stage 1 of the build. Checks that every name in the site folder is
//! usable on a web server, then lists the page sources and decides which of
//! them need converting.
//!
//! ## Sources
//!
//! ```text
//! page_sources/
//! ├── index.txt          # light markup (or markdown, per config)
//! ├── about.mdml         # always markdown
//! ├── raw.html           # copied into the page untouched
//! ├── news.txt           # the news listing, maintained by the build
//! └── news/
//!     └── 20240301-spring-fair.txt
//! ```
//!
//! Only the top level and `news/` are read; other subfolders of
//! `page_sources/` are left alone.
//!
//! ## Classification
//!
//! - **New**: no page with the same stem exists in the matching output folder
//! - **Changed**: a page exists and the ledger says the source is stale
//! - **Unchanged**: everything else
//!
//! ## Name rules
//!
//! Files must have an extension and no spaces; folders must have neither.
//! Every offender is collected before failing so one run reports them all.
//! Hidden entries (leading `.`) are skipped.

use crate::config::SiteConfig;
use crate::ledger::{Ledger, LedgerError};
use crate::types::{NEWS_DIR, SiteLayout, SourceKind, in_news_dir, stem};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

/// Extensions a page output can carry.
const PAGE_EXTENSIONS: [&str; 3] = ["html", "php", "htm"];

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot walk site folder: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("'{0}' folder not found in the site")]
    MissingFolder(String),
    #[error("{0}")]
    BadNames(NameProblems),
    #[error("Source file {path} is {size} bytes, too large for publication (limit {limit})")]
    Oversize { path: String, size: u64, limit: u64 },
    #[error("ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for ScanError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Oversize { path, size, limit } => ScanError::Oversize { path, size, limit },
            other => ScanError::Ledger(other),
        }
    }
}

/// Offending names found by [`check_names`], site-relative.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NameProblems {
    pub files_with_spaces: Vec<String>,
    pub files_without_extension: Vec<String>,
    pub folders_with_spaces: Vec<String>,
    pub folders_with_extension: Vec<String>,
}

impl NameProblems {
    pub fn is_empty(&self) -> bool {
        self.files_with_spaces.is_empty()
            && self.files_without_extension.is_empty()
            && self.folders_with_spaces.is_empty()
            && self.folders_with_extension.is_empty()
    }
}

impl fmt::Display for NameProblems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = [
            ("files have spaces in their names", &self.files_with_spaces),
            (
                "files have no extension like '.txt', '.html' or '.jpg'",
                &self.files_without_extension,
            ),
            ("folders have spaces in their names", &self.folders_with_spaces),
            ("folders have file extensions", &self.folders_with_extension),
        ];
        let mut first = true;
        for (what, paths) in groups {
            if paths.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "some {what}:")?;
            for path in paths {
                writeln!(f, "    {path}")?;
            }
        }
        Ok(())
    }
}

/// Build state of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceState {
    New,
    Changed,
    Unchanged,
}

/// One discovered page source.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedSource {
    /// Site-relative source path.
    pub path: String,
    /// Site-relative output path.
    pub output: String,
    #[serde(skip)]
    pub kind: SourceKind,
    pub state: SourceState,
    pub is_news: bool,
}

/// Scan result, sources sorted by path.
#[derive(Debug, Default, Serialize)]
pub struct ScanReport {
    pub sources: Vec<ScannedSource>,
}

impl ScanReport {
    pub fn count(&self, state: SourceState) -> usize {
        self.sources.iter().filter(|s| s.state == state).count()
    }

    /// Sources that are new or changed.
    pub fn pending(&self) -> impl Iterator<Item = &ScannedSource> {
        self.sources.iter().filter(|s| s.state != SourceState::Unchanged)
    }
}

/// Check every name below the site root.
pub fn check_names(root: &Path) -> Result<(), ScanError> {
    let mut problems = NameProblems::default();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        let rel = relative(root, entry.path());
        let has_extension = extension_of(&name).is_some();
        if entry.file_type().is_dir() {
            if name.contains(' ') {
                problems.folders_with_spaces.push(rel.clone());
            }
            if has_extension {
                problems.folders_with_extension.push(rel);
            }
        } else {
            if name.contains(' ') {
                problems.files_with_spaces.push(rel.clone());
            }
            if !has_extension {
                problems.files_without_extension.push(rel);
            }
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(ScanError::BadNames(problems))
    }
}

/// Scan the site's sources and classify them against the ledger.
pub fn scan(layout: &SiteLayout, config: &SiteConfig, ledger: &Ledger) -> Result<ScanReport, ScanError> {
    for dir in [layout.sources_dir(), layout.html_dir()] {
        if !dir.is_dir() {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Err(ScanError::MissingFolder(name));
        }
    }
    check_names(&layout.root)?;

    let mut sources = Vec::new();
    let news_dir = layout.sources_dir().join(NEWS_DIR);
    let mut dirs = vec![layout.sources_dir()];
    if news_dir.is_dir() {
        dirs.push(news_dir);
    }
    for dir in dirs {
        for path in collect_files(&dir)? {
            let Some(rel) = layout.relative(&path) else {
                continue;
            };
            let Some(kind) = SourceKind::from_path(&rel) else {
                continue;
            };
            let size = fs::metadata(&path)?.len();
            if let Some(limit) = config.size_limit()
                && size > limit
            {
                return Err(ScanError::Oversize { path: rel, size, limit });
            }
            let output = layout.output_for(&rel, &config.html.page_extension);
            let state = if !has_page_counterpart(layout, &output) {
                SourceState::New
            } else if ledger.is_stale(&rel)? {
                SourceState::Changed
            } else {
                SourceState::Unchanged
            };
            log::debug!("{rel}: {state:?}");
            sources.push(ScannedSource {
                is_news: in_news_dir(&rel),
                path: rel,
                output,
                kind,
                state,
            });
        }
    }
    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(ScanReport { sources })
}

/// Whether a page with the output's stem already exists in its folder.
fn has_page_counterpart(layout: &SiteLayout, output: &str) -> bool {
    let dir = match output.rsplit_once('/') {
        Some((dir, _)) => dir,
        None => return false,
    };
    let name = stem(output);
    PAGE_EXTENSIONS
        .iter()
        .any(|ext| layout.path(&format!("{dir}/{name}.{ext}")).is_file())
}

/// Regular files directly inside `dir`, sorted.
fn collect_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, ScanError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Extension of a file name, ignoring a leading dot.
fn extension_of(name: &str) -> Option<&str> {
    let trimmed = name.trim_start_matches('.');
    match trimmed.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

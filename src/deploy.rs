//! Uploading the built site.
//!
//! Stage 3. Everything below `public_html/` whose ledger record says
//! `NOTUP` is copied to the remote through a [`Transfer`], then flipped to
//! `UP`. Remote paths are the path below `public_html/`, under
//! `deploy.remote_root`:
//!
//! ```text
//! public_html/news/post.html  →  <remote_root>/news/post.html
//! ```
//!
//! Extra folders can be pushed whole with an [`UploadScope`], for resources
//! the ledger never tracks (stylesheets, fonts, site images).
//!
//! The first failed upload stops the batch. Uploads confirmed before it are
//! still marked in the ledger, and the error carries their list.

use crate::ledger::{Ledger, LedgerError};
use crate::types::{HTML_DIR, SiteLayout};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote is not connected")]
    NotConnected,
    #[error("remote target not found: {0}")]
    TargetMissing(PathBuf),
    #[error("refusing remote path {0:?}")]
    BadPath(String),
}

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("no deploy target: set deploy.target in config.toml or pass --target")]
    NoTarget,
    #[error("cannot connect to remote: {0}")]
    Connect(TransferError),
    #[error("upload of {path} failed after {} confirmed uploads: {source}", .confirmed.len())]
    Interrupted {
        path: String,
        source: TransferError,
        confirmed: Vec<String>,
    },
    #[error("cannot list upload folder: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// A remote file store.
///
/// Remote paths are `/`-separated and relative to the remote root.
pub trait Transfer {
    fn connect(&mut self) -> Result<(), TransferError>;
    fn make_dir(&mut self, remote: &str) -> Result<(), TransferError>;
    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransferError>;
    fn delete(&mut self, remote: &str) -> Result<(), TransferError>;
    fn disconnect(&mut self) -> Result<(), TransferError>;
}

/// Mirrors uploads into a local directory, e.g. a mounted web root.
#[derive(Debug)]
pub struct DirectoryTransfer {
    target: PathBuf,
    connected: bool,
}

impl DirectoryTransfer {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            connected: false,
        }
    }

    fn resolve(&self, remote: &str) -> Result<PathBuf, TransferError> {
        if !self.connected {
            return Err(TransferError::NotConnected);
        }
        let mut path = self.target.clone();
        for part in remote.split('/').filter(|p| !p.is_empty()) {
            if part == ".." || part == "." || part.contains('\\') {
                return Err(TransferError::BadPath(remote.to_string()));
            }
            path.push(part);
        }
        Ok(path)
    }
}

impl Transfer for DirectoryTransfer {
    fn connect(&mut self) -> Result<(), TransferError> {
        if !self.target.is_dir() {
            return Err(TransferError::TargetMissing(self.target.clone()));
        }
        self.connected = true;
        Ok(())
    }

    fn make_dir(&mut self, remote: &str) -> Result<(), TransferError> {
        fs::create_dir_all(self.resolve(remote)?)?;
        Ok(())
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), TransferError> {
        fs::copy(local, self.resolve(remote)?)?;
        Ok(())
    }

    fn delete(&mut self, remote: &str) -> Result<(), TransferError> {
        fs::remove_file(self.resolve(remote)?)?;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransferError> {
        self.connected = false;
        Ok(())
    }
}

/// Folder pushed whole on top of the pending uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadScope {
    /// Everything in `public_html/`.
    All,
    /// `public_html/res/`.
    Res,
    Css,
    Js,
    Font,
    Img,
}

impl UploadScope {
    /// Site-relative folder covered by the scope.
    pub fn folder(self) -> String {
        match self {
            Self::All => HTML_DIR.to_string(),
            Self::Res => format!("{HTML_DIR}/res"),
            other => format!("{HTML_DIR}/res/{other}"),
        }
    }
}

impl fmt::Display for UploadScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::Res => "res",
            Self::Css => "css",
            Self::Js => "js",
            Self::Font => "font",
            Self::Img => "img",
        };
        f.write_str(name)
    }
}

impl FromStr for UploadScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "res" => Ok(Self::Res),
            "css" => Ok(Self::Css),
            "js" => Ok(Self::Js),
            "font" => Ok(Self::Font),
            "img" => Ok(Self::Img),
            other => Err(format!(
                "unknown upload scope {other:?}: expected all, res, css, js, font or img"
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub scope: Option<UploadScope>,
    /// Folder on the remote that maps to `public_html/`.
    pub remote_root: String,
    /// Delete remote copies of outputs whose files are gone.
    pub prune: bool,
}

/// What a deploy did.
#[derive(Debug, Default, Serialize)]
pub struct DeployReport {
    /// Site-relative paths uploaded.
    pub uploaded: Vec<String>,
    /// Remote paths deleted.
    pub deleted: Vec<String>,
    /// Ledger records dropped because their file is gone.
    pub purged: Vec<String>,
}

/// Remote path of a site-relative output.
pub fn remote_path(rel: &str, remote_root: &str) -> String {
    let below = rel
        .strip_prefix(HTML_DIR)
        .map(|r| r.trim_start_matches('/'))
        .unwrap_or(rel);
    let root = remote_root.trim_matches('/');
    if root.is_empty() {
        below.to_string()
    } else {
        format!("{root}/{below}")
    }
}

/// Upload pending outputs and mark them in the ledger.
pub fn deploy(
    transfer: &mut impl Transfer,
    layout: &SiteLayout,
    ledger: &mut Ledger,
    options: &DeployOptions,
) -> Result<DeployReport, DeployError> {
    let pending = ledger.pending_uploads();
    let mut report = DeployReport {
        purged: pending.purged.iter().map(|r| r.path.clone()).collect(),
        ..DeployReport::default()
    };

    let mut paths: BTreeSet<String> = pending.paths.into_iter().collect();
    if let Some(scope) = options.scope {
        paths.extend(scope_files(layout, scope)?);
    }
    let to_delete: Vec<String> = if options.prune {
        pending
            .purged
            .iter()
            .filter(|r| r.upload.is_some())
            .map(|r| remote_path(&r.path, &options.remote_root))
            .collect()
    } else {
        Vec::new()
    };
    if paths.is_empty() && to_delete.is_empty() {
        log::info!("nothing to upload");
        return Ok(report);
    }

    transfer.connect().map_err(DeployError::Connect)?;
    let mut made_dirs = HashSet::new();
    for path in &paths {
        let remote = remote_path(path, &options.remote_root);
        if let Err(e) = upload_one(transfer, &layout.path(path), &remote, &mut made_dirs) {
            if let Err(close) = transfer.disconnect() {
                log::warn!("disconnect after failed upload: {close}");
            }
            mark_confirmed(ledger, &report.uploaded)?;
            return Err(DeployError::Interrupted {
                path: path.clone(),
                source: e,
                confirmed: report.uploaded,
            });
        }
        log::info!("uploaded {path} → {remote}");
        report.uploaded.push(path.clone());
    }

    for remote in to_delete {
        match transfer.delete(&remote) {
            Ok(()) => {
                log::info!("deleted remote {remote}");
                report.deleted.push(remote);
            }
            Err(e) => log::warn!("could not delete remote {remote}: {e}"),
        }
    }
    if let Err(e) = transfer.disconnect() {
        log::warn!("disconnect: {e}");
    }

    mark_confirmed(ledger, &report.uploaded)?;
    Ok(report)
}

fn upload_one(
    transfer: &mut impl Transfer,
    local: &Path,
    remote: &str,
    made_dirs: &mut HashSet<String>,
) -> Result<(), TransferError> {
    let mut dir = String::new();
    if let Some((parent, _)) = remote.rsplit_once('/') {
        for part in parent.split('/') {
            if !dir.is_empty() {
                dir.push('/');
            }
            dir.push_str(part);
            if made_dirs.insert(dir.clone()) {
                transfer.make_dir(&dir)?;
            }
        }
    }
    transfer.upload(local, remote)
}

/// Flip tracked outputs to uploaded. Scope files without an upload record
/// are left alone.
fn mark_confirmed(ledger: &mut Ledger, uploaded: &[String]) -> Result<(), LedgerError> {
    let tracked: Vec<String> = uploaded
        .iter()
        .filter(|p| ledger.get(p).is_some_and(|r| r.upload.is_some()))
        .cloned()
        .collect();
    ledger.mark_uploaded(&tracked)
}

/// Site-relative files below a scope's folder, skipping hidden entries.
fn scope_files(layout: &SiteLayout, scope: UploadScope) -> Result<Vec<String>, DeployError> {
    let dir = layout.path(&scope.folder());
    if !dir.is_dir() {
        log::warn!("upload scope {scope}: {} does not exist", scope.folder());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(&dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file()
            && let Some(rel) = layout.relative(entry.path())
        {
            files.push(rel);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::UploadState;
    use crate::test_helpers::{site_with, write};
    use chrono::NaiveDateTime;
    use tempfile::TempDir;

    fn now() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-03-01_10-00-00", crate::ledger::STAMP_FORMAT).unwrap()
    }

    /// Records calls; fails the `fail_at`-th upload (1-based).
    #[derive(Default)]
    struct RecordingTransfer {
        calls: Vec<String>,
        uploads: usize,
        fail_at: Option<usize>,
    }

    impl Transfer for RecordingTransfer {
        fn connect(&mut self) -> Result<(), TransferError> {
            self.calls.push("connect".into());
            Ok(())
        }
        fn make_dir(&mut self, remote: &str) -> Result<(), TransferError> {
            self.calls.push(format!("mkdir {remote}"));
            Ok(())
        }
        fn upload(&mut self, _local: &Path, remote: &str) -> Result<(), TransferError> {
            self.uploads += 1;
            if self.fail_at == Some(self.uploads) {
                return Err(TransferError::NotConnected);
            }
            self.calls.push(format!("put {remote}"));
            Ok(())
        }
        fn delete(&mut self, remote: &str) -> Result<(), TransferError> {
            self.calls.push(format!("rm {remote}"));
            Ok(())
        }
        fn disconnect(&mut self) -> Result<(), TransferError> {
            self.calls.push("disconnect".into());
            Ok(())
        }
    }

    fn built_site() -> (TempDir, Ledger) {
        let tmp = site_with(&[
            ("page_sources/index.txt", "x"),
            ("public_html/index.html", "<p>x</p>"),
            ("public_html/news/a.html", "<p>a</p>"),
            ("public_html/news/b.html", "<p>b</p>"),
            ("public_html/res/css/site.css", "body {}"),
        ]);
        let mut ledger = Ledger::new("s", tmp.path());
        ledger
            .record_conversion(
                &[
                    "page_sources/index.txt".into(),
                    "public_html/index.html".into(),
                    "public_html/news/a.html".into(),
                    "public_html/news/b.html".into(),
                ],
                now(),
                false,
            )
            .unwrap();
        (tmp, ledger)
    }

    fn state(ledger: &Ledger, path: &str) -> Option<UploadState> {
        ledger.get(path).and_then(|r| r.upload)
    }

    #[test]
    fn remote_paths_drop_html_root() {
        assert_eq!(remote_path("public_html/news/a.html", ""), "news/a.html");
        assert_eq!(remote_path("public_html/index.html", "/www/"), "www/index.html");
    }

    #[test]
    fn scope_parses_and_maps_to_folders() {
        assert_eq!("CSS".parse::<UploadScope>().unwrap(), UploadScope::Css);
        assert_eq!(UploadScope::Css.folder(), "public_html/res/css");
        assert_eq!(UploadScope::All.folder(), "public_html");
        assert_eq!(UploadScope::Res.folder(), "public_html/res");
        assert!("fonts".parse::<UploadScope>().is_err());
    }

    #[test]
    fn pending_outputs_uploaded_and_marked() {
        let (tmp, mut ledger) = built_site();
        let layout = SiteLayout::new(tmp.path());
        let mut transfer = RecordingTransfer::default();

        let report = deploy(&mut transfer, &layout, &mut ledger, &DeployOptions::default()).unwrap();

        assert_eq!(report.uploaded.len(), 3);
        assert_eq!(
            transfer.calls,
            vec![
                "connect",
                "put index.html",
                "mkdir news",
                "put news/a.html",
                "put news/b.html",
                "disconnect"
            ]
        );
        assert_eq!(state(&ledger, "public_html/news/a.html"), Some(UploadState::Uploaded));
        assert_eq!(ledger.summary().pending, 0);

        // Nothing left the second time round.
        let mut again = RecordingTransfer::default();
        let report = deploy(&mut again, &layout, &mut ledger, &DeployOptions::default()).unwrap();
        assert!(report.uploaded.is_empty());
        assert!(again.calls.is_empty());
    }

    #[test]
    fn failure_keeps_confirmed_uploads() {
        let (tmp, mut ledger) = built_site();
        let layout = SiteLayout::new(tmp.path());
        let mut transfer = RecordingTransfer {
            fail_at: Some(2),
            ..RecordingTransfer::default()
        };

        let err = deploy(&mut transfer, &layout, &mut ledger, &DeployOptions::default()).unwrap_err();

        let DeployError::Interrupted { path, confirmed, .. } = err else {
            panic!("expected Interrupted, got {err:?}");
        };
        assert_eq!(path, "public_html/news/a.html");
        assert_eq!(confirmed, vec!["public_html/index.html"]);
        assert_eq!(state(&ledger, "public_html/index.html"), Some(UploadState::Uploaded));
        assert_eq!(state(&ledger, "public_html/news/a.html"), Some(UploadState::NotUploaded));
        assert_eq!(state(&ledger, "public_html/news/b.html"), Some(UploadState::NotUploaded));
        assert_eq!(transfer.calls.last().map(String::as_str), Some("disconnect"));
    }

    #[test]
    fn scope_adds_untracked_files() {
        let (tmp, mut ledger) = built_site();
        let layout = SiteLayout::new(tmp.path());
        let mut transfer = RecordingTransfer::default();
        let options = DeployOptions {
            scope: Some(UploadScope::Css),
            ..DeployOptions::default()
        };

        let report = deploy(&mut transfer, &layout, &mut ledger, &options).unwrap();

        assert!(report.uploaded.contains(&"public_html/res/css/site.css".to_string()));
        assert!(transfer.calls.contains(&"mkdir res/css".to_string()));
        assert!(ledger.get("public_html/res/css/site.css").is_none());
    }

    #[test]
    fn prune_deletes_vanished_outputs() {
        let (tmp, mut ledger) = built_site();
        let layout = SiteLayout::new(tmp.path());
        deploy(&mut RecordingTransfer::default(), &layout, &mut ledger, &DeployOptions::default())
            .unwrap();
        fs::remove_file(tmp.path().join("public_html/news/b.html")).unwrap();

        let mut transfer = RecordingTransfer::default();
        let options = DeployOptions {
            prune: true,
            remote_root: "www".into(),
            ..DeployOptions::default()
        };
        let report = deploy(&mut transfer, &layout, &mut ledger, &options).unwrap();

        assert_eq!(report.purged, vec!["public_html/news/b.html"]);
        assert_eq!(report.deleted, vec!["www/news/b.html"]);
        assert!(ledger.get("public_html/news/b.html").is_none());
    }

    #[test]
    fn directory_transfer_mirrors_files() {
        let (tmp, mut ledger) = built_site();
        let remote = TempDir::new().unwrap();
        let layout = SiteLayout::new(tmp.path());
        let mut transfer = DirectoryTransfer::new(remote.path());
        let options = DeployOptions {
            remote_root: "site".into(),
            ..DeployOptions::default()
        };

        deploy(&mut transfer, &layout, &mut ledger, &options).unwrap();

        let copied = fs::read_to_string(remote.path().join("site/news/a.html")).unwrap();
        assert_eq!(copied, "<p>a</p>");

        write(tmp.path(), "public_html/news/a.html", "<p>a2</p>");
        ledger
            .record_conversion(&["public_html/news/a.html".into()], now(), false)
            .unwrap();
        deploy(&mut transfer, &layout, &mut ledger, &options).unwrap();
        let copied = fs::read_to_string(remote.path().join("site/news/a.html")).unwrap();
        assert_eq!(copied, "<p>a2</p>");
    }

    #[test]
    fn directory_transfer_rejects_escaping_paths() {
        let remote = TempDir::new().unwrap();
        let mut transfer = DirectoryTransfer::new(remote.path());
        transfer.connect().unwrap();
        let err = transfer.make_dir("../outside").unwrap_err();
        assert!(matches!(err, TransferError::BadPath(_)));
    }

    #[test]
    fn missing_target_fails_to_connect() {
        let (tmp, mut ledger) = built_site();
        let layout = SiteLayout::new(tmp.path());
        let mut transfer = DirectoryTransfer::new(tmp.path().join("nowhere"));
        let err = deploy(&mut transfer, &layout, &mut ledger, &DeployOptions::default()).unwrap_err();
        assert!(matches!(err, DeployError::Connect(TransferError::TargetMissing(_))));
        assert_eq!(ledger.summary().pending, 3);
    }
}

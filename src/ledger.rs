//! Change-tracking ledger.
//!
//! One flat text file at `private/ledger.txt` remembers every source and
//! output the build has seen, so unchanged sources are not reconverted and
//! unchanged outputs are not uploaded again.
//!
//! ## Format
//!
//! ```text
//! mysite
//! page_sources/index.txt<TAB>2024-03-01_10-22-05<TAB>812<TAB>9f86d08…
//! public_html/index.html<TAB>2024-03-01_10-22-05<TAB>2304<TAB>e3b0c44…<TAB>NOTUP
//! ```
//!
//! The first line is the site identifier (the site folder name). Every other
//! non-empty line is one record: site-relative path, timestamp, size in
//! bytes, SHA-256 of the contents, and for files that get uploaded the
//! upload state `UP` or `NOTUP`. An empty fifth field is read as "not an
//! upload record".
//!
//! ## Lifecycle
//!
//! ```text
//! unknown ──record──▶ NOTUP ──upload──▶ UP ──edit + record──▶ NOTUP ──▶ …
//!                                        └──file deleted──▶ purged
//! ```
//!
//! The path is the key: recording a path removes its old record and appends
//! the new one, so there is never more than one record per path. A lookup
//! that expects a record and finds none means the file was edited by hand
//! or truncated; that is reported as corruption and never papered over.
//!
//! Staleness is decided by size first and content hash second. Timestamps
//! are informational, except for news posts, where the first recorded date
//! is the publication date and survives later edits.

use crate::naming;
use crate::types::{HTML_DIR, SOURCES_DIR, SiteLayout, in_news_dir};
use chrono::{NaiveDate, NaiveDateTime};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Timestamp layout inside the ledger.
pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("ledger is corrupt: {0}. Fix or delete private/ledger.txt by hand")]
    Corrupt(String),
    #[error("{path} is {size} bytes, over the {limit}-byte limit")]
    Oversize { path: String, size: u64, limit: u64 },
}

/// Upload state of an output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    NotUploaded,
    Uploaded,
}

impl UploadState {
    fn as_str(self) -> &'static str {
        match self {
            UploadState::NotUploaded => "NOTUP",
            UploadState::Uploaded => "UP",
        }
    }
}

/// One tracked file.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub path: String,
    pub stamp: NaiveDateTime,
    pub size: u64,
    pub hash: String,
    /// `None` for sources, which are never uploaded themselves.
    pub upload: Option<UploadState>,
}

impl Record {
    fn parse(line: &str) -> Result<Self, LedgerError> {
        let fields: Vec<&str> = line.split('\t').collect();
        if !(4..=5).contains(&fields.len()) {
            return Err(LedgerError::Corrupt(format!("malformed record {line:?}")));
        }
        let bad = |what: &str| LedgerError::Corrupt(format!("bad {what} in record {line:?}"));
        let path = fields[0];
        if path.is_empty() {
            return Err(bad("path"));
        }
        let stamp =
            NaiveDateTime::parse_from_str(fields[1], STAMP_FORMAT).map_err(|_| bad("timestamp"))?;
        let size = fields[2].parse::<u64>().map_err(|_| bad("size"))?;
        let upload = match fields.get(4).copied() {
            None | Some("") => None,
            Some("NOTUP") => Some(UploadState::NotUploaded),
            Some("UP") => Some(UploadState::Uploaded),
            Some(_) => return Err(bad("upload state")),
        };
        Ok(Record {
            path: path.to_string(),
            stamp,
            size,
            hash: fields[3].to_string(),
            upload,
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.path,
            self.stamp.format(STAMP_FORMAT),
            self.size,
            self.hash
        )?;
        if let Some(state) = self.upload {
            write!(f, "\t{}", state.as_str())?;
        }
        Ok(())
    }
}

/// Result of [`Ledger::pending_uploads`].
#[derive(Debug, Default, PartialEq)]
pub struct PendingUploads {
    /// Outputs not uploaded since they last changed.
    pub paths: Vec<String>,
    /// Records dropped because their file is gone.
    pub purged: Vec<Record>,
}

/// Record counts for status display.
#[derive(Debug, Default, PartialEq)]
pub struct LedgerSummary {
    pub sources: usize,
    pub outputs: usize,
    pub pending: usize,
}

impl fmt::Display for LedgerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sources, {} outputs ({} not uploaded)",
            self.sources, self.outputs, self.pending
        )
    }
}

/// The in-memory ledger. Read once, mutated, written back whole.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub site_id: String,
    root: PathBuf,
    records: Vec<Record>,
    size_limit: Option<u64>,
}

impl Ledger {
    /// An empty ledger for a site with no history.
    pub fn new(site_id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            site_id: site_id.into(),
            root: root.into(),
            records: Vec::new(),
            size_limit: None,
        }
    }

    /// Reject tracked files larger than `limit` bytes.
    pub fn with_size_limit(mut self, limit: Option<u64>) -> Self {
        self.size_limit = limit;
        self
    }

    /// Load the site's ledger, or start an empty one when there is none yet.
    pub fn load(layout: &SiteLayout) -> Result<Self, LedgerError> {
        let path = layout.ledger_file();
        if !path.exists() {
            log::info!("no ledger at {}, starting fresh", path.display());
            return Ok(Self::new(layout.site_id(), &layout.root));
        }
        let text = fs::read_to_string(&path)?;
        Self::parse(&text, &layout.site_id(), &layout.root)
    }

    /// Parse ledger text. The first line must be `site_id`.
    pub fn parse(text: &str, site_id: &str, root: &Path) -> Result<Self, LedgerError> {
        let mut lines = text.lines();
        let first = lines.next().unwrap_or_default().trim_end();
        if first != site_id {
            return Err(LedgerError::Corrupt(format!(
                "first line is {first:?}, expected site identifier {site_id:?}"
            )));
        }
        let mut ledger = Self::new(site_id, root);
        let mut seen = HashSet::new();
        for line in lines.filter(|l| !l.trim().is_empty()) {
            let record = Record::parse(line.trim_end_matches('\r'))?;
            if !seen.insert(record.path.clone()) {
                return Err(LedgerError::Corrupt(format!(
                    "more than one record for {}",
                    record.path
                )));
            }
            ledger.records.push(record);
        }
        Ok(ledger)
    }

    /// The ledger file text.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.site_id);
        for record in &self.records {
            out.push_str(&record.to_string());
            out.push('\n');
        }
        out
    }

    /// Write the whole ledger back.
    pub fn save(&self, layout: &SiteLayout) -> Result<(), LedgerError> {
        let path = layout.ledger_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.render())?;
        log::debug!("saved {} ledger records", self.records.len());
        Ok(())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, path: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.path == path)
    }

    /// Recorded date of a path, if any.
    pub fn date_of(&self, path: &str) -> Option<NaiveDateTime> {
        self.get(path).map(|r| r.stamp)
    }

    /// Current size and content hash of a tracked file.
    pub fn fingerprint(&self, path: &str) -> Result<(u64, String), LedgerError> {
        let full = self.root.join(path);
        let size = fs::metadata(&full)?.len();
        if let Some(limit) = self.size_limit
            && size > limit
        {
            return Err(LedgerError::Oversize {
                path: path.to_string(),
                size,
                limit,
            });
        }
        Ok((size, hash_file(&full)?))
    }

    /// Whether `path` needs converting (or uploading) again: it has no
    /// record, or its size or hash differ from the record.
    pub fn is_stale(&self, path: &str) -> Result<bool, LedgerError> {
        let Some(record) = self.get(path) else {
            return Ok(true);
        };
        let full = self.root.join(path);
        if !full.exists() {
            return Ok(true);
        }
        if fs::metadata(&full)?.len() != record.size {
            return Ok(true);
        }
        Ok(hash_file(&full)? != record.hash)
    }

    /// Record the current state of freshly converted sources and outputs.
    ///
    /// Paths below `public_html/` become upload records in state `NOTUP`.
    /// A news source that already has a record keeps its date. With
    /// `filename_dates`, a news source named `YYYYMMDD…` is dated from its
    /// name instead.
    pub fn record_conversion(
        &mut self,
        paths: &[String],
        now: NaiveDateTime,
        filename_dates: bool,
    ) -> Result<(), LedgerError> {
        for path in paths {
            let (size, hash) = self.fingerprint(path)?;
            let stamp = self.stamp_for(path, now, filename_dates);
            let upload = is_output(path).then_some(UploadState::NotUploaded);
            self.replace(Record {
                path: path.clone(),
                stamp,
                size,
                hash,
                upload,
            });
        }
        Ok(())
    }

    /// Record uploadable assets (such as news images) that changed.
    /// Returns the paths that were (re)recorded.
    pub fn record_assets(
        &mut self,
        paths: &[String],
        now: NaiveDateTime,
    ) -> Result<Vec<String>, LedgerError> {
        let mut changed = Vec::new();
        for path in paths {
            if !self.is_stale(path)? {
                continue;
            }
            let (size, hash) = self.fingerprint(path)?;
            self.replace(Record {
                path: path.clone(),
                stamp: now,
                size,
                hash,
                upload: Some(UploadState::NotUploaded),
            });
            changed.push(path.clone());
        }
        Ok(changed)
    }

    fn stamp_for(&self, path: &str, now: NaiveDateTime, filename_dates: bool) -> NaiveDateTime {
        if !is_news_source(path) {
            return now;
        }
        if filename_dates
            && let Some(date) = naming::date_from_path(path)
        {
            return midnight(date);
        }
        self.date_of(path).unwrap_or(now)
    }

    fn replace(&mut self, record: Record) {
        self.records.retain(|r| r.path != record.path);
        self.records.push(record);
    }

    /// Outputs waiting for upload. Records whose file has vanished are
    /// purged first and handed back so their remote copies can be removed.
    pub fn pending_uploads(&mut self) -> PendingUploads {
        let root = self.root.clone();
        let (kept, purged): (Vec<Record>, Vec<Record>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| root.join(&r.path).exists());
        self.records = kept;
        for record in &purged {
            log::info!("purged ledger record for missing {}", record.path);
        }
        let paths = self
            .records
            .iter()
            .filter(|r| r.upload == Some(UploadState::NotUploaded))
            .map(|r| r.path.clone())
            .collect();
        PendingUploads { paths, purged }
    }

    /// Flip records to `UP` after a confirmed transfer.
    pub fn mark_uploaded(&mut self, paths: &[String]) -> Result<(), LedgerError> {
        for path in paths {
            let record = self
                .records
                .iter_mut()
                .find(|r| &r.path == path)
                .ok_or_else(|| LedgerError::Corrupt(format!("no record for uploaded {path}")))?;
            if record.upload.is_none() {
                return Err(LedgerError::Corrupt(format!(
                    "{path} was uploaded but is recorded as a source"
                )));
            }
            record.upload = Some(UploadState::Uploaded);
        }
        Ok(())
    }

    /// Force every recorded page source to look changed on the next scan.
    pub fn mark_all_changed(&mut self) -> usize {
        let mut count = 0;
        for record in &mut self.records {
            if record.upload.is_none() && record.path.starts_with(SOURCES_DIR) {
                record.size = 0;
                count += 1;
            }
        }
        count
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary::default();
        for record in &self.records {
            match record.upload {
                None => summary.sources += 1,
                Some(state) => {
                    summary.outputs += 1;
                    if state == UploadState::NotUploaded {
                        summary.pending += 1;
                    }
                }
            }
        }
        summary
    }
}

/// Whether a site-relative path is build output (uploaded verbatim).
pub fn is_output(path: &str) -> bool {
    path.starts_with(HTML_DIR) && path[HTML_DIR.len()..].starts_with('/')
}

/// Whether a site-relative path is a news post source.
pub fn is_news_source(path: &str) -> bool {
    !is_output(path) && in_news_dir(path)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap_or_default()
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, STAMP_FORMAT).unwrap()
    }

    fn site() -> (TempDir, Ledger) {
        let tmp = TempDir::new().unwrap();
        let ledger = Ledger::new("mysite", tmp.path());
        (tmp, ledger)
    }

    fn write(tmp: &TempDir, rel: &str, content: &str) {
        let path = tmp.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    // =========================================================================
    // Format
    // =========================================================================

    #[test]
    fn parse_and_render_records() {
        let text = "mysite\n\
                    page_sources/a.txt\t2024-03-01_10-22-05\t12\tabc\n\
                    public_html/a.html\t2024-03-01_10-22-05\t40\tdef\tNOTUP\n";
        let ledger = Ledger::parse(text, "mysite", Path::new("/x")).unwrap();
        assert_eq!(ledger.records().len(), 2);
        assert_eq!(ledger.get("page_sources/a.txt").unwrap().upload, None);
        assert_eq!(
            ledger.get("public_html/a.html").unwrap().upload,
            Some(UploadState::NotUploaded)
        );
        assert_eq!(ledger.render(), text);
    }

    #[test]
    fn empty_fifth_field_is_a_source_record() {
        let text = "s\nnews/post1.txt\t2020-01-01_00-00-00\t120\tabc\t\n";
        let ledger = Ledger::parse(text, "s", Path::new("/x")).unwrap();
        let record = ledger.get("news/post1.txt").unwrap();
        assert_eq!(record.upload, None);
        assert_eq!(record.size, 120);
        assert_eq!(record.stamp, at("2020-01-01_00-00-00"));
    }

    #[test]
    fn wrong_site_id_is_corrupt() {
        let err = Ledger::parse("other\n", "mysite", Path::new("/x")).unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt(_)));
    }

    #[test]
    fn malformed_records_are_corrupt() {
        for bad in [
            "s\nonly\ttwo\n",
            "s\na\tnot-a-date\t1\th\n",
            "s\na\t2020-01-01_00-00-00\tbig\th\n",
            "s\na\t2020-01-01_00-00-00\t1\th\tMAYBE\n",
        ] {
            assert!(
                matches!(Ledger::parse(bad, "s", Path::new("/x")), Err(LedgerError::Corrupt(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn duplicate_paths_are_corrupt() {
        let text = "s\na\t2020-01-01_00-00-00\t1\th\na\t2020-01-02_00-00-00\t1\th\n";
        assert!(matches!(
            Ledger::parse(text, "s", Path::new("/x")),
            Err(LedgerError::Corrupt(_))
        ));
    }

    #[test]
    fn load_missing_ledger_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let layout = SiteLayout::new(tmp.path().join("mysite"));
        let ledger = Ledger::load(&layout).unwrap();
        assert_eq!(ledger.site_id, "mysite");
        assert!(ledger.records().is_empty());
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let layout = SiteLayout::new(tmp.path().join("mysite"));
        write(&tmp, "mysite/page_sources/a.txt", "hello");
        let mut ledger = Ledger::load(&layout).unwrap();
        ledger
            .record_conversion(&["page_sources/a.txt".into()], at("2024-01-01_00-00-00"), false)
            .unwrap();
        ledger.save(&layout).unwrap();

        let reloaded = Ledger::load(&layout).unwrap();
        assert_eq!(reloaded.records(), ledger.records());
    }

    // =========================================================================
    // Staleness
    // =========================================================================

    #[test]
    fn changed_hash_is_stale() {
        let tmp = TempDir::new().unwrap();
        write(&tmp, "news/post1.txt", "def");
        let text = "s\nnews/post1.txt\t2020-01-01_00-00-00\t120\tabc\t\n";
        let ledger = Ledger::parse(text, "s", tmp.path()).unwrap();
        assert!(ledger.is_stale("news/post1.txt").unwrap());
    }

    #[test]
    fn same_size_different_content_is_stale() {
        let (tmp, mut ledger) = site();
        write(&tmp, "a.txt", "aaa");
        ledger
            .record_conversion(&["a.txt".into()], at("2024-01-01_00-00-00"), false)
            .unwrap();
        write(&tmp, "a.txt", "bbb");
        assert!(ledger.is_stale("a.txt").unwrap());
    }

    #[test]
    fn unknown_path_is_stale() {
        let (_tmp, ledger) = site();
        assert!(ledger.is_stale("nothing.txt").unwrap());
    }

    #[test]
    fn recorded_path_is_fresh() {
        let (tmp, mut ledger) = site();
        write(&tmp, "page_sources/a.txt", "hello");
        let paths = vec!["page_sources/a.txt".to_string()];
        ledger
            .record_conversion(&paths, at("2024-01-01_00-00-00"), false)
            .unwrap();
        assert!(!ledger.is_stale("page_sources/a.txt").unwrap());
        // Recording again is idempotent.
        ledger
            .record_conversion(&paths, at("2024-01-02_00-00-00"), false)
            .unwrap();
        assert_eq!(ledger.records().len(), 1);
        assert!(!ledger.is_stale("page_sources/a.txt").unwrap());
    }

    #[test]
    fn oversize_file_rejected() {
        let (tmp, ledger) = site();
        let mut ledger = ledger.with_size_limit(Some(4));
        write(&tmp, "big.txt", "12345");
        let err = ledger
            .record_conversion(&["big.txt".into()], at("2024-01-01_00-00-00"), false)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Oversize { size: 5, limit: 4, .. }));
    }

    // =========================================================================
    // Recording
    // =========================================================================

    #[test]
    fn outputs_start_not_uploaded() {
        let (tmp, mut ledger) = site();
        write(&tmp, "page_sources/a.txt", "x");
        write(&tmp, "public_html/a.html", "<p>x</p>");
        ledger
            .record_conversion(
                &["page_sources/a.txt".into(), "public_html/a.html".into()],
                at("2024-01-01_00-00-00"),
                false,
            )
            .unwrap();
        assert_eq!(ledger.get("page_sources/a.txt").unwrap().upload, None);
        assert_eq!(
            ledger.get("public_html/a.html").unwrap().upload,
            Some(UploadState::NotUploaded)
        );
    }

    #[test]
    fn replaced_record_moves_to_the_end() {
        let (tmp, mut ledger) = site();
        write(&tmp, "a.txt", "1");
        write(&tmp, "b.txt", "2");
        let now = at("2024-01-01_00-00-00");
        ledger
            .record_conversion(&["a.txt".into(), "b.txt".into()], now, false)
            .unwrap();
        write(&tmp, "a.txt", "11");
        ledger.record_conversion(&["a.txt".into()], now, false).unwrap();
        let order: Vec<&str> = ledger.records().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(order, vec!["b.txt", "a.txt"]);
    }

    #[test]
    fn news_date_survives_edits() {
        let (tmp, mut ledger) = site();
        let post = "page_sources/news/post.txt".to_string();
        write(&tmp, &post, "first");
        let first = at("2020-05-05_12-00-00");
        ledger.record_conversion(&[post.clone()], first, false).unwrap();

        write(&tmp, &post, "edited");
        ledger
            .record_conversion(&[post.clone()], at("2024-01-01_00-00-00"), false)
            .unwrap();
        assert_eq!(ledger.date_of(&post), Some(first));
        assert!(!ledger.is_stale(&post).unwrap());
    }

    #[test]
    fn non_news_date_is_refreshed() {
        let (tmp, mut ledger) = site();
        let page = "page_sources/about.txt".to_string();
        write(&tmp, &page, "x");
        ledger
            .record_conversion(&[page.clone()], at("2020-05-05_12-00-00"), false)
            .unwrap();
        let later = at("2024-01-01_00-00-00");
        ledger.record_conversion(&[page.clone()], later, false).unwrap();
        assert_eq!(ledger.date_of(&page), Some(later));
    }

    #[test]
    fn filename_date_overrides_recorded_date() {
        let (tmp, mut ledger) = site();
        let post = "page_sources/news/20190704-party.txt".to_string();
        write(&tmp, &post, "x");
        ledger
            .record_conversion(&[post.clone()], at("2024-01-01_00-00-00"), true)
            .unwrap();
        assert_eq!(ledger.date_of(&post), Some(at("2019-07-04_00-00-00")));
    }

    #[test]
    fn assets_recorded_only_when_changed() {
        let (tmp, mut ledger) = site();
        let img = "public_html/news/images/a.jpg".to_string();
        write(&tmp, &img, "jpeg");
        let now = at("2024-01-01_00-00-00");
        assert_eq!(ledger.record_assets(&[img.clone()], now).unwrap(), vec![img.clone()]);
        ledger.mark_uploaded(&[img.clone()]).unwrap();
        assert!(ledger.record_assets(&[img.clone()], now).unwrap().is_empty());
        assert_eq!(ledger.get(&img).unwrap().upload, Some(UploadState::Uploaded));
    }

    // =========================================================================
    // Uploads
    // =========================================================================

    #[test]
    fn pending_uploads_and_purge() {
        let (tmp, mut ledger) = site();
        write(&tmp, "public_html/a.html", "a");
        write(&tmp, "public_html/b.html", "b");
        let now = at("2024-01-01_00-00-00");
        ledger
            .record_conversion(&["public_html/a.html".into(), "public_html/b.html".into()], now, false)
            .unwrap();
        ledger.mark_uploaded(&["public_html/a.html".into()]).unwrap();
        fs::remove_file(tmp.path().join("public_html/a.html")).unwrap();

        let pending = ledger.pending_uploads();
        assert_eq!(pending.paths, vec!["public_html/b.html".to_string()]);
        assert_eq!(pending.purged.len(), 1);
        assert_eq!(pending.purged[0].path, "public_html/a.html");
        assert!(ledger.get("public_html/a.html").is_none());
    }

    #[test]
    fn mark_uploaded_without_record_is_corrupt() {
        let (_tmp, mut ledger) = site();
        let err = ledger.mark_uploaded(&["public_html/x.html".into()]).unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt(_)));
    }

    #[test]
    fn reedit_returns_to_not_uploaded() {
        let (tmp, mut ledger) = site();
        let out = "public_html/a.html".to_string();
        write(&tmp, &out, "v1");
        let now = at("2024-01-01_00-00-00");
        ledger.record_conversion(&[out.clone()], now, false).unwrap();
        ledger.mark_uploaded(&[out.clone()]).unwrap();
        write(&tmp, &out, "v2");
        ledger.record_conversion(&[out.clone()], now, false).unwrap();
        assert_eq!(ledger.get(&out).unwrap().upload, Some(UploadState::NotUploaded));
    }

    #[test]
    fn mark_all_changed_resets_sources() {
        let (tmp, mut ledger) = site();
        write(&tmp, "page_sources/a.txt", "x");
        write(&tmp, "public_html/a.html", "y");
        ledger
            .record_conversion(
                &["page_sources/a.txt".into(), "public_html/a.html".into()],
                at("2024-01-01_00-00-00"),
                false,
            )
            .unwrap();
        assert_eq!(ledger.mark_all_changed(), 1);
        assert!(ledger.is_stale("page_sources/a.txt").unwrap());
        assert!(!ledger.is_stale("public_html/a.html").unwrap());
    }

    #[test]
    fn summary_display() {
        let summary = LedgerSummary {
            sources: 3,
            outputs: 4,
            pending: 1,
        };
        assert_eq!(summary.to_string(), "3 sources, 4 outputs (1 not uploaded)");
    }

    #[test]
    fn output_and_news_classification() {
        assert!(is_output("public_html/a.html"));
        assert!(!is_output("public_htmlx/a.html"));
        assert!(is_news_source("page_sources/news/a.txt"));
        assert!(!is_news_source("public_html/news/a.html"));
    }
}

//! Client navigation data, `public_html/res/js/news.js`.
//!
//! The script opens with generated variables and a sentinel line; anything
//! after the sentinel is hand-written and preserved across rebuilds:
//!
//! ```text
//!
//! var news_prev_link_text = "&lt; Older";
//! var news_next_link_text = "Newer &gt;";
//! var news_files_list = ["newest.html","older.html","oldest.html"];
//!
//! //==DO_NOT_EDIT_THIS_LINE
//! ...hand-written code...
//! ```
//!
//! The file list is rebuilt from the ledger every time, never patched.

use super::NewsError;
use crate::config::NewsConfig;
use crate::ledger::{Ledger, is_news_source, is_output};
use crate::types::{SiteLayout, SourceKind, in_news_dir, stem};
use std::fs;

pub const SENTINEL: &str = "//==DO_NOT_EDIT_THIS_LINE";

/// Hand-written part shipped with the crate, used when a site has no script yet.
const BUNDLED_SCRIPT: &str = include_str!("../../static/news.js");

/// Output file names of all recorded news posts, newest first.
///
/// A post's date is the record date of its source; its file name is the
/// recorded news output with the same stem.
pub fn news_files(ledger: &Ledger) -> Vec<String> {
    let mut dated: Vec<(chrono::NaiveDateTime, String)> = ledger
        .records()
        .iter()
        .filter(|r| is_news_source(&r.path))
        .filter(|r| {
            matches!(
                SourceKind::from_path(&r.path),
                Some(SourceKind::LightMarkup | SourceKind::Markdown)
            )
        })
        .filter_map(|source| {
            let name = stem(&source.path);
            ledger
                .records()
                .iter()
                .find(|o| is_output(&o.path) && in_news_dir(&o.path) && stem(&o.path) == name)
                .map(|o| {
                    let file = o.path.rsplit('/').next().unwrap_or(&o.path);
                    (source.stamp, file.to_string())
                })
        })
        .collect();
    dated.sort();
    dated.into_iter().rev().map(|(_, file)| file).collect()
}

/// The part of an existing script after the sentinel line.
pub fn hand_written(existing: &str) -> Option<&str> {
    existing.split_once(SENTINEL).map(|(_, rest)| rest)
}

/// Full script text.
pub fn render_script(files: &[String], config: &NewsConfig, tail: &str) -> Result<String, NewsError> {
    Ok(format!(
        "\nvar news_prev_link_text = {};\nvar news_next_link_text = {};\nvar news_files_list = {};\n\n{SENTINEL}{tail}",
        serde_json::to_string(&config.prev_link)?,
        serde_json::to_string(&config.next_link)?,
        serde_json::to_string(files)?,
    ))
}

/// Rewrite the site's navigation script from the ledger. Returns its
/// site-relative path, or `None` when there are no recorded posts.
pub fn rebuild(layout: &SiteLayout, ledger: &Ledger, config: &NewsConfig) -> Result<Option<String>, NewsError> {
    let files = news_files(ledger);
    if files.is_empty() {
        return Ok(None);
    }
    let rel = layout.nav_script();
    let path = layout.path(&rel);
    let existing = if path.exists() {
        Some(fs::read_to_string(&path)?)
    } else {
        None
    };
    let tail = existing
        .as_deref()
        .and_then(hand_written)
        .or_else(|| hand_written(BUNDLED_SCRIPT))
        .unwrap_or_default();
    let script = render_script(&files, config, tail)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, script)?;
    log::info!("navigation script lists {} posts", files.len());
    Ok(Some(rel))
}

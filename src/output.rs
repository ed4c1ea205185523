//! CLI output formatting for all stages.
//!
//! # Titles First
//!
//! Pages are shown by title and position first, with file paths as
//! indented context lines, so the output reads as a content inventory.
//!
//! # Output Format
//!
//! ## Status
//!
//! ```text
//! Sources
//! 001 new      page_sources/news/fair.txt
//!     Output: public_html/news/fair.html
//! 002 changed  page_sources/index.txt
//!     Output: public_html/index.html
//!
//! 2 to convert, 3 unchanged
//! Ledger: 5 sources, 6 outputs (1 not uploaded)
//! ```
//!
//! ## Build
//!
//! ```text
//! Pages
//! 001 Home → public_html/index.html
//!     Source: page_sources/index.txt
//! 002 Spring fair → public_html/news/fair.html (news)
//!     Source: page_sources/news/fair.txt
//!
//! News
//!     Listing: page_sources/news.txt
//!     Thumbnail: public_html/news/images/thumbs/fair.jpg
//!     Navigation: public_html/res/js/news.js
//!
//! Converted 2 pages (1 news post), 3 unchanged
//! ```
//!
//! ## Deploy
//!
//! ```text
//! Uploaded
//! 001 public_html/index.html
//! 002 public_html/news/fair.html
//!
//! Uploaded 2 files
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function returning the lines and a `print_*`
//! wrapper that writes them to stdout. Only the wrappers touch I/O.

use crate::deploy::DeployReport;
use crate::generate::BuildReport;
use crate::ledger::LedgerSummary;
use crate::news::unescape_html;
use crate::scan::{ScanReport, SourceState};

// ============================================================================
// Line helpers
// ============================================================================

/// `7` → `007`.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Format a page line: titled pages show the title, untitled ones the
/// source file name in parens.
///
/// ```text
/// 001 Spring fair       // titled
/// 001 (raw.htm)         // untitled
/// ```
/// Titles are shown unescaped; untitled pages show their file name.
fn page_line(index: usize, title: Option<&str>, source: &str) -> String {
    match title {
        Some(t) if !t.trim().is_empty() => format!("{} {}", format_index(index), unescape_html(t)),
        _ => {
            let file = source.rsplit('/').next().unwrap_or(source);
            format!("{} ({})", format_index(index), file)
        }
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Status
// ============================================================================

pub fn format_scan_output(report: &ScanReport, ledger: &LedgerSummary) -> Vec<String> {
    let mut lines = Vec::new();
    let pending: Vec<_> = report.pending().collect();
    if !pending.is_empty() {
        lines.push("Sources".to_string());
        for (i, source) in pending.iter().enumerate() {
            let state = match source.state {
                SourceState::New => "new",
                SourceState::Changed => "changed",
                SourceState::Unchanged => "unchanged",
            };
            lines.push(format!("{} {:<8} {}", format_index(i + 1), state, source.path));
            lines.push(format!("{}Output: {}", indent(1), source.output));
        }
        lines.push(String::new());
    }
    lines.push(format!(
        "{} to convert, {} unchanged",
        pending.len(),
        report.count(SourceState::Unchanged)
    ));
    lines.push(format!("Ledger: {ledger}"));
    lines
}

pub fn print_scan_output(report: &ScanReport, ledger: &LedgerSummary) {
    for line in format_scan_output(report, ledger) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.pages.is_empty() {
        lines.push("Pages".to_string());
        for (i, page) in report.pages.iter().enumerate() {
            let tag = if page.is_news { " (news)" } else { "" };
            lines.push(format!(
                "{} → {}{tag}",
                page_line(i + 1, page.title.as_deref(), &page.source),
                page.output
            ));
            lines.push(format!("{}Source: {}", indent(1), page.source));
        }
        lines.push(String::new());
    }

    if !report.skipped.is_empty() {
        lines.push("Skipped".to_string());
        for (path, reason) in &report.skipped {
            lines.push(format!("{}{path}: {reason}", indent(1)));
        }
        lines.push(String::new());
    }

    let news_lines: Vec<String> = report
        .listing_updated
        .then(|| "Listing: page_sources/news.txt".to_string())
        .into_iter()
        .chain(report.thumbnails.iter().map(|t| format!("Thumbnail: {t}")))
        .chain(report.nav_script.iter().map(|n| format!("Navigation: {n}")))
        .collect();
    if !news_lines.is_empty() {
        lines.push("News".to_string());
        lines.extend(news_lines.into_iter().map(|l| format!("{}{l}", indent(1))));
        lines.push(String::new());
    }

    let posts = report.pages.iter().filter(|p| p.is_news).count();
    let mut summary = format!("Converted {}", plural(report.pages.len(), "page", "pages"));
    if posts > 0 {
        summary.push_str(&format!(" ({})", plural(posts, "news post", "news posts")));
    }
    summary.push_str(&format!(", {} unchanged", report.unchanged));
    lines.push(summary);
    lines
}

pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Deploy
// ============================================================================

pub fn format_deploy_output(report: &DeployReport) -> Vec<String> {
    let mut lines = Vec::new();

    if !report.uploaded.is_empty() {
        lines.push("Uploaded".to_string());
        for (i, path) in report.uploaded.iter().enumerate() {
            lines.push(format!("{} {path}", format_index(i + 1)));
        }
        lines.push(String::new());
    }
    if !report.deleted.is_empty() {
        lines.push("Deleted from remote".to_string());
        for path in &report.deleted {
            lines.push(format!("{}{path}", indent(1)));
        }
        lines.push(String::new());
    }
    if !report.purged.is_empty() {
        lines.push("Forgotten (file gone)".to_string());
        for path in &report.purged {
            lines.push(format!("{}{path}", indent(1)));
        }
        lines.push(String::new());
    }

    if report.uploaded.is_empty() {
        lines.push("Nothing to upload".to_string());
    } else {
        lines.push(format!("Uploaded {}", plural(report.uploaded.len(), "file", "files")));
    }
    lines
}

pub fn print_deploy_output(report: &DeployReport) {
    for line in format_deploy_output(report) {
        println!("{}", line);
    }
}

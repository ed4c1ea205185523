//! Filename parsing for the optional `YYYYMMDD` date prefix.
//!
//! News post sources may carry their publication date in the filename, as a
//! leading eight-digit token followed by a separator:
//!
//! - `20200115-first-post.txt` → 2020-01-15, "first post"
//! - `20200115_first_post.txt` → 2020-01-15, "first post"
//! - `20200115.txt` → 2020-01-15, no name
//! - `first-post.txt` → no date, "first post"
//!
//! The date is only used when `news.filename_dates` is enabled. Otherwise
//! the ledger's recorded date is authoritative.

use chrono::NaiveDate;

/// Result of parsing a filename stem like `20200115-first-post`.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedName {
    /// Date from the leading token, if it is a real calendar date.
    pub date: Option<NaiveDate>,
    /// Raw name part after the date token and its separator.
    /// For undated stems this is the full input.
    pub name: String,
    /// Display title: name with dashes and underscores converted to spaces.
    pub display_title: String,
}

/// Parse a filename stem carrying an optional leading date token.
///
/// Eight digits followed by a ninth digit are not a date token, nor are
/// digits that do not form a valid calendar date (`20201340`).
pub fn parse_dated_name(stem: &str) -> DatedName {
    if let Some((date, rest)) = split_date_token(stem) {
        let name = rest.trim_start_matches(['-', '_', ' ', '.']);
        return DatedName {
            date: Some(date),
            name: name.to_string(),
            display_title: display_title(name),
        };
    }
    DatedName {
        date: None,
        name: stem.to_string(),
        display_title: display_title(stem),
    }
}

/// Date of a file path's stem, if it carries a date token.
pub fn date_from_path(path: &str) -> Option<NaiveDate> {
    parse_dated_name(crate::types::stem(path)).date
}

fn split_date_token(stem: &str) -> Option<(NaiveDate, &str)> {
    let token = stem.get(..8)?;
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let rest = &stem[8..];
    if rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::parse_from_str(token, "%Y%m%d").ok()?;
    Some((date, rest))
}

fn display_title(name: &str) -> String {
    name.replace(['-', '_'], " ")
}

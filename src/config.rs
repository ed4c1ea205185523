//! Site settings from `config/config.toml`.
//!
//! Handles loading and validating `config/config.toml`. Every key is
//! optional: stock defaults are overridden by whatever the site sets.
//!
//! ## Configuration Options
//!
//! ```toml
//! # Every key is optional; the values shown are the defaults
//!
//! [html]
//! head = "..."                  # Head snippet; needs <title></title> to receive titles
//! tail = "..."                  # Tail snippet closing the page
//! title_mode = "website-page"   # website-page | website | page
//! title_separator = " - "       # Between website name and page title
//! website_name = "Quire"
//! page_title = "Untitled"       # Fallback for pages without a title
//! page_extension = ".html"      # .html | .php | .htm
//! tag_ids = false               # Number structural tags with id="idN"
//!
//! [markup]
//! default = "qlm"               # Engine for .txt sources: qlm | markdown
//! markdown_titling = true       # Guess a title from markdown's first line
//! script_links = false          # [label fn(args)] becomes a js_call span
//!
//! [news]
//! list_items = 50               # Entries kept in the listing
//! list_title = "Latest News"
//! blurb_length = 300            # Characters of first paragraph
//! more_phrase = "More..."
//! link_position = "end"         # Back-link to the listing: start | end
//! link_prefix = ""
//! date_format = "%A, %d %B %Y"  # strftime format for post date stamps
//! prev_link = "&lt; Older"
//! next_link = "Newer &gt;"
//! filename_dates = false        # Date posts from a leading YYYYMMDD token
//! thumbnails = true             # Listing thumbnail from the lead image
//! thumbnail_fit = "square"      # square | longest-side
//! thumbnail_size = 160
//! thumbnail_quality = 80
//!
//! [deploy]
//! target = "/mnt/www"           # Upload mirror root (optional)
//! remote_root = ""              # Prefix below the target
//! prune = false                 # Delete remote copies of vanished outputs
//!
//! [limits]
//! file_size_limit = true        # Reject tracked files over 1 100 000 bytes
//! debug_errors = false          # Print full error structure on failure
//! ```
//!
//! A misspelt key is an error, not a silently ignored line.

use crate::imaging::Fit;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Largest tracked file accepted when `limits.file_size_limit` is on.
pub const FILE_SIZE_LIMIT: u64 = 1_100_000;

const PAGE_EXTENSIONS: [&str; 3] = [".html", ".php", ".htm"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config/config.toml`.
///
/// Passed by reference into every stage; nothing mutates it after load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Page head/tail snippets and titling.
    pub html: HtmlConfig,
    /// Conversion engine selection and options.
    pub markup: MarkupConfig,
    /// News listing, blurbs, dates and navigation labels.
    pub news: NewsConfig,
    /// Upload destination.
    pub deploy: DeployConfig,
    /// Size limit and error reporting.
    pub limits: LimitsConfig,
}

impl SiteConfig {
    /// Reject values that parse but make no sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.html.title_separator.trim().chars().count() > 3 {
            return Err(ConfigError::Validation(
                "html.title_separator must be at most 3 characters besides spaces".into(),
            ));
        }
        if !PAGE_EXTENSIONS.contains(&self.html.page_extension.as_str()) {
            return Err(ConfigError::Validation(format!(
                "html.page_extension must be one of {}",
                PAGE_EXTENSIONS.join(", ")
            )));
        }
        if self.news.list_items == 0 {
            return Err(ConfigError::Validation(
                "news.list_items must be at least 1".into(),
            ));
        }
        if self.news.blurb_length == 0 {
            return Err(ConfigError::Validation(
                "news.blurb_length must be at least 1".into(),
            ));
        }
        for (key, value) in [
            ("news.list_title", &self.news.list_title),
            ("news.more_phrase", &self.news.more_phrase),
            ("news.prev_link", &self.news.prev_link),
            ("news.next_link", &self.news.next_link),
            ("news.date_format", &self.news.date_format),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if !date_format_is_valid(&self.news.date_format) {
            return Err(ConfigError::Validation(format!(
                "news.date_format '{}' is not a valid strftime format",
                self.news.date_format
            )));
        }
        if self.news.thumbnail_size == 0 {
            return Err(ConfigError::Validation(
                "news.thumbnail_size must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.news.thumbnail_quality) {
            return Err(ConfigError::Validation(
                "news.thumbnail_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// Size limit applied to tracked files, if enabled.
    pub fn size_limit(&self) -> Option<u64> {
        self.limits.file_size_limit.then_some(FILE_SIZE_LIMIT)
    }
}

fn date_format_is_valid(format: &str) -> bool {
    use chrono::format::{Item, StrftimeItems};
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// How the `<title>` element is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TitleMode {
    /// `website name + separator + page title`.
    #[default]
    WebsitePage,
    /// Website name only.
    Website,
    /// Page title only.
    Page,
}

/// Page head/tail snippets and titling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HtmlConfig {
    pub head: String,
    pub tail: String,
    pub title_mode: TitleMode,
    pub title_separator: String,
    pub website_name: String,
    /// Used for pages that carry no title of their own.
    pub page_title: String,
    pub page_extension: String,
    /// Number structural tags with sequential `id="idN"` attributes.
    pub tag_ids: bool,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            head: DEFAULT_HEAD.to_string(),
            tail: DEFAULT_TAIL.to_string(),
            title_mode: TitleMode::default(),
            title_separator: " - ".to_string(),
            website_name: "Quire".to_string(),
            page_title: "Untitled".to_string(),
            page_extension: ".html".to_string(),
            tag_ids: false,
        }
    }
}

const DEFAULT_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title></title>
</head>
<body>
<div class="page">
"#;

const DEFAULT_TAIL: &str = r#"</div>
<script src="/res/js/news.js"></script>
</body>
</html>
"#;

/// Which engine converts `.txt` sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    #[default]
    Qlm,
    Markdown,
}

/// Conversion engine selection and options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupConfig {
    pub default: MarkupKind,
    /// Guess a page title from the first line of markdown sources.
    pub markdown_titling: bool,
    /// Render `[label name(args)]` as a script call trigger instead of a link.
    pub script_links: bool,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            default: MarkupKind::Qlm,
            markdown_titling: true,
            script_links: false,
        }
    }
}

/// Where the back-link to the news listing goes in a news post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPosition {
    Start,
    #[default]
    End,
}

/// News listing, blurbs, dates and navigation labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewsConfig {
    /// Entries kept in the listing document.
    pub list_items: usize,
    pub list_title: String,
    /// Character budget of a listing blurb.
    pub blurb_length: usize,
    pub more_phrase: String,
    pub link_position: LinkPosition,
    pub link_prefix: String,
    /// chrono strftime format of the date stamp on a post.
    pub date_format: String,
    pub prev_link: String,
    pub next_link: String,
    /// Date posts from a leading `YYYYMMDD` filename token.
    pub filename_dates: bool,
    /// Generate a listing thumbnail from a post's lead image.
    pub thumbnails: bool,
    /// Square crop, or shrink keeping the aspect ratio.
    pub thumbnail_fit: Fit,
    pub thumbnail_size: u32,
    pub thumbnail_quality: u32,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            list_items: 50,
            list_title: "Latest News".to_string(),
            blurb_length: 300,
            more_phrase: "More...".to_string(),
            link_position: LinkPosition::End,
            link_prefix: String::new(),
            date_format: "%A, %d %B %Y".to_string(),
            prev_link: "&lt; Older".to_string(),
            next_link: "Newer &gt;".to_string(),
            filename_dates: false,
            thumbnails: true,
            thumbnail_fit: Fit::Square,
            thumbnail_size: 160,
            thumbnail_quality: 80,
        }
    }
}

/// Upload destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// Root of the mirrored remote. Required for uploads unless given on the
    /// command line.
    pub target: Option<PathBuf>,
    /// Folder below the target that maps to `public_html/`.
    pub remote_root: String,
    /// Delete remote copies of outputs whose ledger records were purged.
    pub prune: bool,
}

/// Size limit and error reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    pub file_size_limit: bool,
    pub debug_errors: bool,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            file_size_limit: true,
            debug_errors: false,
        }
    }
}

// =============================================================================
// Config loading and validation
// =============================================================================

/// Location of the config file inside a site directory.
pub fn config_path(site_dir: &Path) -> PathBuf {
    site_dir.join("config").join("config.toml")
}

/// Load `config/config.toml` as a raw TOML value.
///
/// `None` when the site has no config file.
pub fn load_raw_config(site_dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = config_path(site_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Deserialize and validate an optional raw config.
pub fn resolve_config(raw: Option<toml::Value>) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = match raw {
        Some(value) => value.try_into()?,
        None => SiteConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Load config from `config/config.toml` in the given site directory.
///
/// Missing keys take stock defaults, unknown keys are rejected, and the
/// result is validated.
pub fn load_config(site_dir: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(load_raw_config(site_dir)?)
}

/// The documented default `config.toml` printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Quire Configuration
# ===================
# Place this file at config/config.toml inside the site directory.
# All settings are optional; remove or comment out any you don't need.

# ---------------------------------------------------------------------------
# Page assembly
# ---------------------------------------------------------------------------
[html]
# Head snippet placed before every converted page. The page title is
# written into its <title></title> element.
head = """
<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title></title>
</head>
<body>
<div class="page">
"""
# Tail snippet placed after every converted page.
tail = """
</div>
<script src="/res/js/news.js"></script>
</body>
</html>
"""
# website-page: "Website - Page", website: "Website", page: "Page"
title_mode = "website-page"
title_separator = " - "
website_name = "Quire"
# Title for pages that don't start with a title line.
page_title = "Untitled"
# One of .html, .php, .htm
page_extension = ".html"
# Add sequential id="idN" attributes to structural tags.
tag_ids = false

# ---------------------------------------------------------------------------
# Conversion
# ---------------------------------------------------------------------------
[markup]
# Engine for .txt sources: "qlm" (light markup) or "markdown".
# .mdml sources are always markdown.
default = "qlm"
# Use the first line of a markdown source as the page title.
markdown_titling = true
# Render [label name(args)] as a script call instead of a link.
script_links = false

# ---------------------------------------------------------------------------
# News
# ---------------------------------------------------------------------------
[news]
list_items = 50
list_title = "Latest News"
blurb_length = 300
more_phrase = "More..."
# Back-link to the listing in each post: "start" or "end".
link_position = "end"
link_prefix = ""
date_format = "%A, %d %B %Y"
prev_link = "&lt; Older"
next_link = "Newer &gt;"
# Date posts from a leading YYYYMMDD token in the filename.
filename_dates = false
thumbnails = true
# "square" crops to the middle, "longest-side" keeps the whole picture.
thumbnail_fit = "square"
thumbnail_size = 160
thumbnail_quality = 80

# ---------------------------------------------------------------------------
# Upload
# ---------------------------------------------------------------------------
[deploy]
# target = "/mnt/www"
remote_root = ""
prune = false

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
file_size_limit = true
debug_errors = false
"##
}

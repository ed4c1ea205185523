//! News posts: descriptors, the listing document and the navigation script.
//!
//! A news post is any source directly inside `page_sources/news/`. Nothing
//! about a post is stored on its own; the descriptor is derived every time
//! from the source text, the converted title and the ledger:
//!
//! - **date**: the ledger's record date, else a `YYYYMMDD` filename token
//!   when `news.filename_dates` is on, else today. The recorded date never
//!   changes once written, so editing a post does not re-date it.
//! - **blurb**: see [`blurb`].
//! - **lead image**: the first image reference in the source, used for the
//!   listing thumbnail.

pub mod listing;
pub mod nav;

pub use listing::Listing;

use crate::config::NewsConfig;
use crate::ledger::{Ledger, LedgerError};
use crate::markup::{LinkKind, split_reference};
use crate::naming;
use crate::types::{HTML_DIR, NEWS_DIR, stem};
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::io;
use std::sync::LazyLock;
use thiserror::Error;

/// Blurbs shorter than this are most likely not prose.
const MIN_BLURB_CHARS: usize = 20;

static BRACKET_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[+ *([^\[\]]+?) *\]+").unwrap());
static CODE_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^code(-\w+)?:").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Error, Debug)]
pub enum NewsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("cannot encode navigation data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the listing needs to know about one post.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsPost {
    /// Site-relative source path.
    pub source: String,
    /// Output path relative to `public_html/`, e.g. `news/post.html`.
    pub href: String,
    pub date: NaiveDate,
    /// Plain title text as written in the source.
    pub title: String,
    pub blurb: String,
    /// Site-relative path of the lead image, when it is a local file.
    pub lead_image: Option<String>,
    /// Thumbnail path relative to `public_html/`, once generated.
    pub thumbnail: Option<String>,
}

impl NewsPost {
    /// Derive a post descriptor.
    ///
    /// `output` is the site-relative output path, `title` the converted
    /// page title (HTML-escaped) if the source has one.
    pub fn derive(
        source: &str,
        output: &str,
        text: &str,
        title: Option<&str>,
        ledger: &Ledger,
        config: &NewsConfig,
        today: NaiveDate,
    ) -> Self {
        let href = output
            .strip_prefix(HTML_DIR)
            .map(|r| r.trim_start_matches('/'))
            .unwrap_or(output)
            .to_string();
        let title = match title {
            Some(t) if !t.trim().is_empty() => unescape_html(t),
            _ => naming::parse_dated_name(stem(source)).display_title,
        };
        NewsPost {
            source: source.to_string(),
            href,
            date: post_date(source, ledger, config.filename_dates, today),
            title,
            blurb: blurb(text, config.blurb_length),
            lead_image: lead_image(text),
            thumbnail: None,
        }
    }

    /// Site-relative path where this post's listing thumbnail goes.
    pub fn thumbnail_target(&self) -> String {
        format!("{HTML_DIR}/{NEWS_DIR}/images/thumbs/{}.jpg", stem(&self.source))
    }
}

/// Publication date: ledger record, then filename token, then `today`.
pub fn post_date(source: &str, ledger: &Ledger, filename_dates: bool, today: NaiveDate) -> NaiveDate {
    if let Some(stamp) = ledger.date_of(source) {
        return stamp.date();
    }
    if filename_dates && let Some(date) = naming::date_from_path(source) {
        return date;
    }
    today
}

/// Undo [`crate::markup::escape_html`] for text going back into a source.
pub fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Paragraphs of raw source text.
fn paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Whether a paragraph is nothing but bracket references.
fn is_reference_only(text: &str) -> bool {
    BRACKET_GROUP.replace_all(text, "").trim().is_empty()
}

/// Listing blurb for a post.
///
/// The first paragraph that is prose: titles and headings (indented
/// one-liners), directives, code blocks and paragraphs made only of links
/// or images are skipped. Image and video references are dropped from the
/// chosen paragraph, links are reduced to their text, whitespace is
/// collapsed. Anything under 20 characters is treated as not prose and
/// yields an empty blurb; anything over `max_chars` is cut at the last word
/// boundary that fits and gets a trailing `...`.
pub fn blurb(text: &str, max_chars: usize) -> String {
    let text = text.replace('\t', "    ");
    let chosen = paragraphs(&text).into_iter().find(|lines| {
        let first = lines[0];
        let heading = lines.len() == 1 && first.starts_with("  ");
        let body = lines.join("\n");
        let trimmed = body.trim_start();
        !heading
            && !trimmed.starts_with('@')
            && !CODE_HEADER.is_match(trimmed)
            && !is_reference_only(trimmed)
    });
    let Some(lines) = chosen else {
        return String::new();
    };
    let joined = lines.join(" ");
    let unlinked = BRACKET_GROUP.replace_all(&joined, |caps: &Captures| {
        let reference = split_reference(&caps[1]);
        match reference.kind {
            LinkKind::Image | LinkKind::Video => String::new(),
            LinkKind::Link if reference.text == reference.url => String::new(),
            LinkKind::Link => reference.text,
        }
    });
    let prose = SPACES.replace_all(unlinked.trim(), " ").into_owned();
    let prose = prose.replace('[', "(").replace(']', ")");

    if prose.chars().count() < MIN_BLURB_CHARS {
        return String::new();
    }
    truncate_words(&prose, max_chars)
}

fn truncate_words(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let kept = match cut.rsplit_once(char::is_whitespace) {
        Some((head, _)) if !head.trim().is_empty() => head.trim_end(),
        _ => cut.as_str(),
    };
    format!("{kept}...")
}

/// Site-relative path of the first local image referenced in a post.
///
/// Posts are written as if they lived at the site root; page assembly
/// prefixes their relative targets with `../`. So `news/images/a.jpg`,
/// `../news/images/a.jpg` and `/news/images/a.jpg` all name
/// `public_html/news/images/a.jpg`. Remote images are ignored.
pub fn lead_image(text: &str) -> Option<String> {
    let url = BRACKET_GROUP
        .captures_iter(text)
        .map(|caps| split_reference(&caps[1]))
        .find(|r| r.kind == LinkKind::Image)?
        .url;
    if url.contains("://") || url.starts_with("www.") {
        return None;
    }
    let rel = url.strip_prefix("../").unwrap_or(url.as_str());
    resolve(HTML_DIR, rel.trim_start_matches('/'))
}

/// Join a relative reference onto a base folder, folding `.` and `..`.
/// Returns `None` when the reference climbs out of `public_html/`.
fn resolve(base: &str, rel: &str) -> Option<String> {
    let mut parts: Vec<&str> = base.split('/').collect();
    for segment in rel.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.len() <= 1 {
                    return None;
                }
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use std::path::Path;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // =========================================================================
    // Dates
    // =========================================================================

    #[test]
    fn recorded_date_wins() {
        let text = "s\npage_sources/news/20190101-a.txt\t2020-02-02_10-00-00\t1\th\n";
        let ledger = Ledger::parse(text, "s", Path::new("/x")).unwrap();
        let date = post_date("page_sources/news/20190101-a.txt", &ledger, true, day(2024, 1, 1));
        assert_eq!(date, day(2020, 2, 2));
    }

    #[test]
    fn filename_date_then_today() {
        let ledger = Ledger::new("s", "/x");
        let today = day(2024, 1, 1);
        assert_eq!(post_date("news/20190101-a.txt", &ledger, true, today), day(2019, 1, 1));
        assert_eq!(post_date("news/20190101-a.txt", &ledger, false, today), today);
    }

    #[test]
    fn date_stable_across_edits() {
        let tmp = tempfile::TempDir::new().unwrap();
        let post = "page_sources/news/p.txt".to_string();
        std::fs::create_dir_all(tmp.path().join("page_sources/news")).unwrap();
        std::fs::write(tmp.path().join(&post), "v1").unwrap();
        let mut ledger = Ledger::new("s", tmp.path());
        let first = NaiveDateTime::parse_from_str("2020-03-03_08-00-00", "%Y-%m-%d_%H-%M-%S").unwrap();
        ledger.record_conversion(&[post.clone()], first, false).unwrap();

        std::fs::write(tmp.path().join(&post), "v2").unwrap();
        let now = NaiveDateTime::parse_from_str("2024-06-01_08-00-00", "%Y-%m-%d_%H-%M-%S").unwrap();
        ledger.record_conversion(&[post.clone()], now, false).unwrap();
        assert_eq!(post_date(&post, &ledger, false, now.date()), day(2020, 3, 3));
    }

    // =========================================================================
    // Blurbs
    // =========================================================================

    #[test]
    fn blurb_skips_title_images_and_directives() {
        let text = "  Big Day\n\n[Boat boat.jpg]\n\n@import: \"menu.txt\"\n\nWe went sailing and it was [great fun fun.html] for all.\n\nMore.";
        assert_eq!(blurb(text, 300), "We went sailing and it was great fun for all.");
    }

    #[test]
    fn blurb_drops_bare_urls_and_images() {
        let text = "Visit [www.example.com] with [a pic p.png] friends today and tomorrow";
        assert_eq!(blurb(text, 300), "Visit with friends today and tomorrow");
    }

    #[test]
    fn short_blurb_is_empty() {
        assert_eq!(blurb("  Title\n\nToo short.", 300), "");
    }

    #[test]
    fn long_blurb_cut_at_word() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        assert_eq!(blurb(text, 20), "alpha beta gamma...");
    }

    #[test]
    fn blurb_skips_code() {
        let text = "code:\nlet x = 1;\n\nThe real first paragraph of this post.";
        assert_eq!(blurb(text, 300), "The real first paragraph of this post.");
    }

    #[test]
    fn blurb_joins_lines() {
        let text = "First line of text\nsecond line of text";
        assert_eq!(blurb(text, 300), "First line of text second line of text");
    }

    // =========================================================================
    // Lead images and descriptors
    // =========================================================================

    #[test]
    fn lead_image_resolution() {
        assert_eq!(
            lead_image("x [Boat news/images/boat.jpg] y").as_deref(),
            Some("public_html/news/images/boat.jpg")
        );
        assert_eq!(
            lead_image("[../news/images/boat.jpg]").as_deref(),
            Some("public_html/news/images/boat.jpg")
        );
        assert_eq!(
            lead_image("[res/img/./a.png]").as_deref(),
            Some("public_html/res/img/a.png")
        );
        assert_eq!(lead_image("[/pics/a.gif]").as_deref(), Some("public_html/pics/a.gif"));
        assert_eq!(lead_image("[http://x.com/a.jpg]"), None);
        assert_eq!(lead_image("[../../etc/a.jpg]"), None);
        assert_eq!(lead_image("[just a.html]"), None);
    }

    #[test]
    fn derive_descriptor() {
        let ledger = Ledger::new("s", "/x");
        let post = NewsPost::derive(
            "page_sources/news/party.txt",
            "public_html/news/party.html",
            "  Fish &amp; chips\n\nWe ate fish and chips on the beach all day.",
            Some("Fish &amp;amp; chips"),
            &ledger,
            &NewsConfig::default(),
            day(2024, 5, 1),
        );
        assert_eq!(post.href, "news/party.html");
        assert_eq!(post.title, "Fish &amp; chips");
        assert_eq!(post.date, day(2024, 5, 1));
        assert_eq!(post.blurb, "We ate fish and chips on the beach all day.");
        assert_eq!(post.thumbnail_target(), "public_html/news/images/thumbs/party.jpg");
    }

    #[test]
    fn untitled_post_named_from_file() {
        let ledger = Ledger::new("s", "/x");
        let post = NewsPost::derive(
            "page_sources/news/20200101-new-year.txt",
            "public_html/news/20200101-new-year.html",
            "Happy new year to everyone out there!",
            None,
            &ledger,
            &NewsConfig::default(),
            day(2024, 5, 1),
        );
        assert_eq!(post.title, "new year");
    }
}

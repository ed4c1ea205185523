//! The news listing source, `page_sources/news.txt`.
//!
//! The listing is itself a light markup page. Its first paragraph is the
//! listing title, followed by one heading/blurb paragraph pair per post:
//!
//! ```text
//!    Latest News
//!
//!    _2024-Mar-01_ [Spring fair news/spring-fair.html]
//!
//! [news/images/thumbs/spring-fair.jpg][news/spring-fair.html] Stalls, music and ... [More... news/spring-fair.html]
//! ```
//!
//! New posts go right below the title. A post that is already listed is
//! replaced in place, so the listing stays in insertion order and is never
//! re-sorted. Entries beyond `news.list_items` fall off the end.

use super::NewsPost;
use crate::config::NewsConfig;
use std::fs;
use std::io;
use std::path::Path;

/// One listed post: its heading paragraph and blurb paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub heading: String,
    pub blurb: String,
}

impl ListingEntry {
    /// Entry text for a post.
    pub fn for_post(post: &NewsPost, more_phrase: &str) -> Self {
        let title = post.title.replace('[', "(").replace(']', ")");
        let heading = format!("   _{}_ [{} {}]", post.date.format("%Y-%b-%d"), title, post.href);
        let mut blurb = String::new();
        if let Some(thumb) = &post.thumbnail {
            blurb.push_str(&format!("[{thumb}][{}] ", post.href));
        }
        if !post.blurb.is_empty() {
            blurb.push_str(&post.blurb);
            blurb.push(' ');
        }
        blurb.push_str(&format!("[{more_phrase} {}]", post.href));
        ListingEntry { heading, blurb }
    }

    /// Whether this entry links to `href`.
    fn links_to(&self, href: &str) -> bool {
        self.heading.contains(&format!(" {href}]"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub title: String,
    pub entries: Vec<ListingEntry>,
}

impl Listing {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            entries: Vec::new(),
        }
    }

    /// Parse listing text. The title is always replaced by `title`.
    pub fn parse(text: &str, title: &str) -> Self {
        let text = text.replace("\r\n", "\n");
        let mut chunks = text
            .split("\n\n")
            .map(|c| {
                c.lines()
                    .map(str::trim_end)
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim_matches('\n')
                    .to_string()
            })
            .filter(|c| !c.trim().is_empty());
        // The first paragraph is the old title.
        chunks.next();
        let chunks: Vec<String> = chunks.collect();

        let mut listing = Self::new(title);
        for pair in chunks.chunks(2) {
            match pair {
                [heading, blurb] => listing.entries.push(ListingEntry {
                    heading: heading.clone(),
                    blurb: blurb.clone(),
                }),
                [heading] => {
                    log::warn!("news listing entry without a blurb: {heading}");
                    listing.entries.push(ListingEntry {
                        heading: heading.clone(),
                        blurb: String::new(),
                    });
                }
                _ => {}
            }
        }
        listing
    }

    /// Read the listing file, or start an empty listing.
    pub fn load(path: &Path, title: &str) -> io::Result<Self> {
        if !path.exists() {
            return Ok(Self::new(title));
        }
        Ok(Self::parse(&fs::read_to_string(path)?, title))
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())
    }

    /// Insert a post below the title, or replace its existing entry.
    pub fn upsert(&mut self, post: &NewsPost, config: &NewsConfig) {
        let entry = ListingEntry::for_post(post, &config.more_phrase);
        match self.entries.iter().position(|e| e.links_to(&post.href)) {
            Some(i) => self.entries[i] = entry,
            None => self.entries.insert(0, entry),
        }
        self.cap(config.list_items);
    }

    /// Drop the oldest entries beyond `max`.
    pub fn cap(&mut self, max: usize) {
        while self.entries.len() > max {
            if let Some(dropped) = self.entries.pop() {
                log::debug!("dropped from news listing: {}", dropped.heading.trim());
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("   {}\n\n", self.title);
        for entry in &self.entries {
            out.push_str(&entry.heading);
            out.push_str("\n\n");
            if !entry.blurb.is_empty() {
                out.push_str(&entry.blurb);
                out.push_str("\n\n");
            }
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        out
    }
}

//! Page assembly: a converted document becomes a complete HTML page.
//!
//! Steps, in order:
//!
//! 1. write the page title into the head snippet's `<title></title>`
//! 2. `head + body + tail`
//! 3. news posts: date stamp after the opening `user_content` div
//! 4. resolve `@import: "file"` directives from `config/import/`
//! 5. run `@python: "name"` directives through the plugin registry
//! 6. news posts: prefix relative `href`/`src` values with `../`
//! 7. number structural tags with `id="idN"` when `html.tag_ids` is on
//! 8. put back entities escaped one time too many
//!
//! Imports and plugins see the page after the date stamp, and the link
//! prefixing sees their output, so imported snippets can be written as if
//! every page lived at the site root.

use crate::config::{SiteConfig, TitleMode};
use crate::markup::{Rendered, restore_entities};
use crate::plugins::{PluginContext, PluginError, PluginRegistry};
use crate::types::SiteLayout;
use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::fs;
use std::io;
use std::sync::LazyLock;
use thiserror::Error;

/// Nesting limit for imports that import other files.
const MAX_IMPORT_DEPTH: usize = 16;

static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<title>.*?</title>").unwrap());
static USER_CONTENT_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<div class="user_content[^">]*">"#).unwrap());
static IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@import:\s+['"]([^'"\n]*)['"]\n*"#).unwrap());
static PLUGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"@python:\s+['"]([^'"\n]*)['"]\n*"#).unwrap());
static LINK_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(href|src)="([^"]*)""#).unwrap());
static STRUCTURAL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(div|p|h[1-6]|img|iframe|dl|dt|dd|ol|ul|li)(\s[^>]*?)?(\s*/?)>").unwrap()
});

/// Targets that must not get the `../` prefix.
const ROOTED_PREFIXES: [&str; 9] = [
    "../", "/", "#", "http:", "https:", "file:", "ftp:", "javascript:", "mailto:",
];

#[derive(Error, Debug)]
pub enum PageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("import file not found: config/import/{0}")]
    MissingImport(String),
    #[error("imports nested more than {MAX_IMPORT_DEPTH} levels deep at {0}")]
    ImportTooDeep(String),
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// Per-page values threaded through assembly.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub layout: &'a SiteLayout,
    pub config: &'a SiteConfig,
    /// Site-relative source path.
    pub source: &'a str,
    /// Site-relative output path.
    pub output: &'a str,
    pub base_name: &'a str,
    /// Publication date, for news posts.
    pub news_date: Option<NaiveDate>,
}

impl PageContext<'_> {
    fn is_news(&self) -> bool {
        self.news_date.is_some()
    }
}

/// Assemble a full page around a converted document.
pub fn assemble(
    rendered: &Rendered,
    ctx: &PageContext,
    plugins: &PluginRegistry,
) -> Result<String, PageError> {
    let config = ctx.config;
    let title = rendered
        .title
        .clone()
        .unwrap_or_else(|| config.html.page_title.clone());
    let head = with_title(&config.html.head, &page_title(config, &title));

    let mut html = format!("{head}{}{}", rendered.html, config.html.tail);
    if let Some(date) = ctx.news_date {
        html = date_stamp(&html, &date.format(&config.news.date_format).to_string());
    }
    html = resolve_imports(&html, ctx, 0)?;
    html = run_plugins(html, ctx, plugins)?;
    if ctx.is_news() {
        html = prefix_relative_links(&html);
    }
    if config.html.tag_ids {
        html = number_tags(&html);
    }
    Ok(restore_entities(&html))
}

/// Title text for `<title>` per the configured mode.
pub fn page_title(config: &SiteConfig, title: &str) -> String {
    let site = &config.html.website_name;
    match config.html.title_mode {
        TitleMode::WebsitePage if title.is_empty() => site.clone(),
        TitleMode::WebsitePage => format!("{site}{}{title}", config.html.title_separator),
        TitleMode::Website => site.clone(),
        TitleMode::Page => title.to_string(),
    }
}

/// The head snippet with its title element set to `title`.
pub fn with_title(head: &str, title: &str) -> String {
    TITLE
        .replace(head, |_: &Captures| format!("<title>{title}</title>"))
        .into_owned()
}

/// Insert the news date stamp after the opening `user_content` div.
pub fn date_stamp(html: &str, date: &str) -> String {
    USER_CONTENT_OPEN
        .replace(html, |caps: &Captures| {
            format!("{}\n<p class=\"news_date_stamp\">\n{date}\n</p>", &caps[0])
        })
        .into_owned()
}

/// Whether an import file name applies to this page: `prefix__name.ext`
/// (or plain `name.ext`) where `name` is the page's base name, `all`, or
/// `newspost` for news posts.
fn import_selected(file: &str, ctx: &PageContext) -> bool {
    let name = file.split_once("__").map(|(_, n)| n).unwrap_or(file);
    let name = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };
    name == ctx.base_name || name == "all" || (name == "newspost" && ctx.is_news())
}

/// Imported file text without its leading `#` comment lines.
fn strip_leading_comments(text: &str) -> &str {
    let mut rest = text;
    while rest.starts_with('#') {
        rest = match rest.split_once('\n') {
            Some((_, tail)) => tail,
            None => "",
        };
    }
    rest.trim_start_matches('\n')
}

/// Replace every `@import:` directive with the selected file's contents;
/// directives for other pages are dropped.
pub fn resolve_imports(html: &str, ctx: &PageContext, depth: usize) -> Result<String, PageError> {
    if !html.contains("@import:") {
        return Ok(html.to_string());
    }
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for caps in IMPORT.captures_iter(html) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&html[last..m.start()]);
        last = m.end();

        let file = &caps[1];
        if file.is_empty() || !import_selected(file, ctx) {
            log::debug!("import {file:?} not for {}, dropped", ctx.source);
            continue;
        }
        if depth >= MAX_IMPORT_DEPTH {
            return Err(PageError::ImportTooDeep(file.to_string()));
        }
        let path = ctx.layout.import_dir().join(file);
        if !path.exists() {
            return Err(PageError::MissingImport(file.to_string()));
        }
        let text = fs::read_to_string(&path)?;
        out.push_str(&resolve_imports(strip_leading_comments(&text), ctx, depth + 1)?);
    }
    out.push_str(&html[last..]);
    Ok(out)
}

/// Remove each `@python:` directive and run the named plugin at its place.
fn run_plugins(mut html: String, ctx: &PageContext, plugins: &PluginRegistry) -> Result<String, PageError> {
    let plugin_ctx = PluginContext {
        config: ctx.config,
        source: ctx.source,
        output: ctx.output,
        base_name: ctx.base_name,
        is_news: ctx.is_news(),
    };
    while let Some(caps) = PLUGIN.captures(&html) {
        let Some(m) = caps.get(0) else { break };
        let (start, end) = (m.start(), m.end());
        let name = caps[1].to_string();
        html.replace_range(start..end, "");
        if !name.is_empty() {
            html = plugins.invoke(&name, &html, start, &plugin_ctx)?;
        }
    }
    Ok(html)
}

/// Prefix relative `href`/`src` targets with `../` for pages one folder down.
pub fn prefix_relative_links(html: &str) -> String {
    LINK_ATTR
        .replace_all(html, |caps: &Captures| {
            let target = &caps[2];
            if target.is_empty() || ROOTED_PREFIXES.iter().any(|p| target.starts_with(p)) {
                caps[0].to_string()
            } else {
                format!("{}=\"../{target}\"", &caps[1])
            }
        })
        .into_owned()
}

/// Add sequential `id="idN"` attributes to structural tags.
pub fn number_tags(html: &str) -> String {
    let mut count = 0;
    STRUCTURAL_TAG
        .replace_all(html, |caps: &Captures| {
            count += 1;
            let attrs = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            format!("<{}{attrs} id=\"id{count}\"{}>", &caps[1], &caps[3])
        })
        .into_owned()
}

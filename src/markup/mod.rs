//! Source-to-HTML conversion.
//!
//! [`convert`] is the entry point for one source document. Light markup
//! goes through a tokenize-then-structure pipeline:
//!
//! ```text
//! text ──normalize──▶ escaped text ──lex──▶ tokens + code table
//!      ──tidy/lists──▶ tokens ──structure──▶ Document ──blocks──▶ HTML body
//!      ──wrap──▶ <div class="user_content …"> … </div>
//! ```
//!
//! Markdown sources are handed to `pulldown-cmark` as a whole, and
//! passthrough sources are returned unchanged.
//!
//! Nothing here touches the filesystem. All state (block counters, the
//! code table) lives for one call only.

mod blocks;
mod inline;
mod lexer;
mod links;
mod normalize;
mod structure;

pub use inline::{StyleMode, strip_styling};
pub use links::{LinkKind, Reference, link_kind, split_reference};
pub use normalize::{escape_html, restore_entities};

use crate::config::{LinkPosition, MarkupKind, SiteConfig};
use crate::types::{SourceDocument, SourceKind};
use blocks::BlockRenderer;
use inline::InlineRenderer;
use maud::{PreEscaped, html};
use pulldown_cmark::{Parser, html as md_html};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MARKDOWN_TITLE_CHARS: usize = 80;

static MARKDOWN_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#*\s*(\S[^\n]*)").unwrap());

/// Input errors. Each one aborts the whole run.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("unsafe or empty link target: {0:?}")]
    BadUrl(String),
    #[error("image link chain with more than two groups: {0}")]
    ImageLinkChain(String),
    #[error("script link with forbidden characters: {0}")]
    ScriptCall(String),
}

/// Which converter produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    LightMarkup,
    Markdown,
    Passthrough,
}

/// A converted document, before page assembly.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub html: String,
    /// Plain page title, HTML-escaped. `None` when the source has none.
    pub title: Option<String>,
    pub is_news: bool,
    pub engine: Engine,
}

/// Pick the engine for a source.
pub fn engine_for(kind: SourceKind, config: &SiteConfig) -> Engine {
    match kind {
        SourceKind::Passthrough => Engine::Passthrough,
        SourceKind::Markdown => Engine::Markdown,
        SourceKind::LightMarkup => match config.markup.default {
            MarkupKind::Qlm => Engine::LightMarkup,
            MarkupKind::Markdown => Engine::Markdown,
        },
    }
}

/// Convert one source document.
pub fn convert(doc: &SourceDocument, config: &SiteConfig) -> Result<Rendered, ConvertError> {
    convert_as(doc, config, engine_for(doc.kind, config))
}

/// Convert with a fixed engine, ignoring the configured default.
pub fn convert_as(
    doc: &SourceDocument,
    config: &SiteConfig,
    engine: Engine,
) -> Result<Rendered, ConvertError> {
    let (html, title) = match engine {
        Engine::Passthrough => (doc.text.clone(), None),
        Engine::Markdown => convert_markdown(doc, config),
        Engine::LightMarkup => convert_light_markup(doc, config)?,
    };
    log::debug!("converted {} ({engine:?})", doc.path);
    Ok(Rendered {
        html,
        title,
        is_news: doc.is_news(),
        engine,
    })
}

/// Run the light markup pipeline. Returns the wrapped body and the title.
pub fn convert_light_markup(
    doc: &SourceDocument,
    config: &SiteConfig,
) -> Result<(String, Option<String>), ConvertError> {
    let text = normalize::expand_tabs(&doc.text);
    let text = normalize::pad_document(&text);
    let text = normalize::escape_html(&text);

    let lexed = lexer::lex(&text);
    let tokens = normalize::tidy_lines(lexed.tokens);
    normalize::check_image_chains(&tokens)?;
    let tokens = normalize::normalize_lists(tokens);
    let tokens = normalize::collapse_blank_lines(tokens);
    let document = structure::structure(tokens);

    let renderer = BlockRenderer::new(InlineRenderer::new(config.markup.script_links), &lexed.code);
    let body = renderer.render_document(&document)?;
    let html = wrap_user_content(doc, &body, config);

    let title = document
        .title
        .map(|t| normalize::restore_entities(&plain_title(&t.text)));
    Ok((normalize::restore_entities(&html), title))
}

/// Title text with link brackets and emphasis removed.
fn plain_title(text: &str) -> String {
    let unlinked = strip_links(text);
    strip_styling(unlinked.trim())
}

/// `[text url]` becomes `text`, a bare `[url]` disappears.
pub fn strip_links(text: &str) -> String {
    static TEXT_AND_TARGET: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\[\]]+?) +[^\s\[\]]+\]").unwrap());
    static TARGET_ONLY: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[[^\s\[\]]+\]").unwrap());
    let text = TEXT_AND_TARGET.replace_all(text, "$1");
    TARGET_ONLY.replace_all(&text, "").into_owned()
}

fn convert_markdown(doc: &SourceDocument, config: &SiteConfig) -> (String, Option<String>) {
    let mut body = String::new();
    md_html::push_html(&mut body, Parser::new(&doc.text));

    let title = if config.markup.markdown_titling {
        doc.text
            .lines()
            .find(|l| !l.trim().is_empty())
            .and_then(|line| MARKDOWN_TITLE.captures(line.trim()))
            .map(|caps| {
                let guess: String = caps[1].trim().chars().take(MARKDOWN_TITLE_CHARS).collect();
                normalize::restore_entities(&normalize::escape_html(guess.trim_end()))
            })
    } else {
        None
    };
    (wrap_user_content(doc, &body, config), title)
}

/// Class-safe base name: letters, digits, `-` and `_` only.
fn wrapper_class(doc: &SourceDocument) -> Option<&str> {
    let name = doc.base_name();
    let safe = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    safe.then_some(name)
}

/// Link from a news post back to the listing page.
fn news_links(config: &SiteConfig) -> String {
    let href = format!("../news{}", config.html.page_extension);
    let label = format!("{}{}", config.news.link_prefix, config.news.list_title);
    let mut out = html! {
        div.news_links {
            "\n"
            span.listing_link { a href=(href) { (PreEscaped(label)) } }
            "\n"
        }
    }
    .into_string();
    out.push('\n');
    out
}

/// Wrap a body in the `user_content` container, adding the listing link to
/// news posts.
fn wrap_user_content(doc: &SourceDocument, body: &str, config: &SiteConfig) -> String {
    let class = match wrapper_class(doc) {
        Some(name) => format!("user_content {name}"),
        None => "user_content".to_string(),
    };
    let links = if doc.is_news() {
        news_links(config)
    } else {
        String::new()
    };
    let (before, after) = match config.news.link_position {
        LinkPosition::Start => (links.as_str(), ""),
        LinkPosition::End => ("", links.as_str()),
    };
    format!("<div class=\"{class}\">\n{before}{body}{after}</div>\n")
}

//! Text cleanup passes run before structuring.
//!
//! Each pass is a pure function. [`super::convert_light_markup`] composes
//! them in this fixed order:
//!
//! | # | Pass | Works on |
//! |---|------|----------|
//! | 1 | [`expand_tabs`] | raw text |
//! | 2 | [`pad_document`] | raw text |
//! | 3 | [`escape_html`] | raw text |
//! | 4 | lexing, code bodies move to a side table | escaped text |
//! | 5 | [`tidy_lines`]: quoted targets, trailing spaces, bracket spacing, duplicate brackets | text lines |
//! | 6 | [`check_image_chains`] | text lines |
//! | 7 | [`normalize_lists`] | tokens |
//! | 8 | [`collapse_blank_lines`] | tokens |
//! | 9 | [`restore_entities`] | final HTML |
//!
//! Reordering changes output: nothing may rewrite text before lexing has
//! set code bodies aside, brackets must be tidy before chains are checked,
//! and list runs must be joined before blank lines collapse.

use super::ConvertError;
use super::lexer::Token;
use super::links;
use regex::Regex;
use std::sync::LazyLock;

static DOUBLE_QUOTED_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[[^\[\]\n]*?)&quot;([^\s\[\]]+?)&quot;( *\])").unwrap());
static SINGLE_QUOTED_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\[[^\[\]\n]*?)&#x27;([^\s\[\]]+?)&#x27;( *\])").unwrap());
static ESCAPED_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&amp;([A-Za-z0-9#]{2,6};)").unwrap());
static OPEN_BRACKET_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[ +").unwrap());
static CLOSE_BRACKET_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +\]").unwrap());
static OPEN_BRACKET_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[+").unwrap());
static CLOSE_BRACKET_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\]\]+").unwrap());
static BRACKET_CHAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\[[^\[\]]+\]){3,}").unwrap());
static BULLET_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *\* +\S").unwrap());
static NUMBERED_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^ *\d+\.? +\S").unwrap());
static BULLET_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\* +").unwrap());
static NUMBERED_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+\.?) +").unwrap());

/// Tabs become four spaces.
pub fn expand_tabs(text: &str) -> String {
    text.replace('\t', "    ")
}

/// Two line breaks at both ends, so the first and last paragraphs are
/// delimited like every other one.
pub fn pad_document(text: &str) -> String {
    format!("\n\n{text}\n\n")
}

/// Drop quotes around the target of a bracketed link: `[Home "index.html"]`
/// becomes `[Home index.html]`. Works on escaped text, so the quotes are
/// `&quot;` and `&#x27;` by now. Quotes left anywhere else in a link target
/// are rejected when the link is rendered.
pub fn unquote_link_targets(text: &str) -> String {
    let text = DOUBLE_QUOTED_TARGET.replace_all(text, "$1$2$3");
    SINGLE_QUOTED_TARGET.replace_all(&text, "$1$2$3").into_owned()
}

/// Escape `& < > " '`.
///
/// Ampersands that start a character entity are put back by
/// [`restore_entities`] once rendering is done.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Undo escaping of entities that were already in the source:
/// `&amp;copy;` → `&copy;`, `&amp;#169;` → `&#169;`.
pub fn restore_entities(html: &str) -> String {
    ESCAPED_ENTITY.replace_all(html, "&$1").into_owned()
}

/// Strip trailing spaces, tighten `[ text url ]` to `[text url]`, and
/// collapse `[[`/`]]` runs. Lines left empty become blank tokens.
pub fn tidy_lines(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .map(|token| match token {
            Token::Line(line) => {
                let line = tidy_line(&line);
                if line.is_empty() {
                    Token::Blank
                } else {
                    Token::Line(line)
                }
            }
            other => other,
        })
        .collect()
}

fn tidy_line(line: &str) -> String {
    let line = unquote_link_targets(line);
    let line = line.trim_end_matches(' ');
    let line = OPEN_BRACKET_SPACES.replace_all(line, "[");
    let line = CLOSE_BRACKET_SPACES.replace_all(&line, "]");
    let line = OPEN_BRACKET_RUN.replace_all(&line, "[");
    CLOSE_BRACKET_RUN.replace_all(&line, "]").into_owned()
}

/// Reject any `[image][target][...]` chain of more than two groups.
pub fn check_image_chains(tokens: &[Token]) -> Result<(), ConvertError> {
    for token in tokens {
        let Token::Line(line) = token else { continue };
        for chain in BRACKET_CHAIN.find_iter(line) {
            let first = chain
                .as_str()
                .trim_start_matches('[')
                .split(']')
                .next()
                .unwrap_or_default();
            if links::split_reference(first).kind == links::LinkKind::Image {
                return Err(ConvertError::ImageLinkChain(chain.as_str().to_string()));
            }
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Bullet,
    Numbered,
}

fn item_kind(line: &str) -> Option<ItemKind> {
    if BULLET_ITEM.is_match(line) {
        Some(ItemKind::Bullet)
    } else if NUMBERED_ITEM.is_match(line) {
        Some(ItemKind::Numbered)
    } else {
        None
    }
}

fn tidy_item(line: &str, kind: ItemKind) -> String {
    let line = line.trim_start_matches(' ');
    match kind {
        ItemKind::Bullet => BULLET_MARKER.replace(line, "* ").into_owned(),
        ItemKind::Numbered => NUMBERED_MARKER.replace(line, "$1 ").into_owned(),
    }
}

/// Join list runs.
///
/// A run is two or more items of the same kind separated only by blank
/// lines. Its items lose their indentation and extra spaces after the
/// marker, the blank lines between them are removed, and a blank line is
/// inserted before the run when it directly follows text.
pub fn normalize_lists(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() + 4);
    let mut i = 0;
    while i < tokens.len() {
        let kind = match &tokens[i] {
            Token::Line(line) => item_kind(line),
            _ => None,
        };
        let Some(kind) = kind else {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        };

        // Indices of the run's items, skipping blank separators.
        let mut items = vec![i];
        let mut j = i + 1;
        loop {
            let mut k = j;
            while matches!(tokens.get(k), Some(Token::Blank)) {
                k += 1;
            }
            match tokens.get(k) {
                Some(Token::Line(line)) if item_kind(line) == Some(kind) => {
                    items.push(k);
                    j = k + 1;
                }
                _ => break,
            }
        }

        if items.len() < 2 {
            out.push(tokens[i].clone());
            i += 1;
            continue;
        }

        if matches!(out.last(), Some(Token::Line(_))) {
            out.push(Token::Blank);
        }
        for &idx in &items {
            if let Token::Line(line) = &tokens[idx] {
                out.push(Token::Line(tidy_item(line, kind)));
            }
        }
        i = j;
    }
    out
}

/// Runs of blank lines become a single blank line.
pub fn collapse_blank_lines(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token == Token::Blank && out.last() == Some(&Token::Blank) {
            continue;
        }
        out.push(token);
    }
    out
}

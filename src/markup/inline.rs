//! Inline markup: bracket links and `*` `_` `` ` `` emphasis.
//!
//! Emphasis runs must sit after whitespace (or the start of the fragment)
//! and before a non-word character (or the end). Longer delimiter runs are
//! replaced before shorter ones:
//!
//! | Delimiters | Result |
//! |------------|--------|
//! | three of `*_\`` | bold italic code |
//! | two of `*_` | bold italic |
//! | two of `_\`` | italic code |
//! | two of `*\`` | bold code |
//! | `*` | bold |
//! | `_` | italic |
//! | `` ` `` | code |
//!
//! The regex engine has no look-around, so the surrounding characters are
//! captured and written back, and each rule is repeated until the text
//! stops changing: a captured trailing space can hide the leading space of
//! the next run.

use super::ConvertError;
use super::links;
use regex::{Captures, Regex};
use std::sync::LazyLock;

const BOLD_ITALIC: &str = r#"<span style="font-weight:bold;font-style:italic">"#;
const BOLD: &str = r#"<span style="font-weight:bold">"#;
const ITALIC: &str = r#"<span style="font-style:italic">"#;

struct Rule {
    pattern: Regex,
    open: String,
    close: &'static str,
}

fn rule(pattern: &str, open: String, close: &'static str) -> Rule {
    Rule {
        pattern: Regex::new(pattern).unwrap(),
        open,
        close,
    }
}

/// Emphasis inside running text.
static TEXT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(
            r"(^|\s)[*_`]{3}([^ ][^*`]*?)[*_`]{3}(\W|$)",
            format!("{BOLD_ITALIC}<code>"),
            "</code></span>",
        ),
        rule(
            r"(^|\s)[_*]{2}([^ ][^*]*?)[_*]{2}(\W|$)",
            BOLD_ITALIC.to_string(),
            "</span>",
        ),
        rule(
            r"(^|\s)[_`]{2}([^ ][^`]*?)[_`]{2}(\W|$)",
            format!("{ITALIC}<code>"),
            "</code></span>",
        ),
        rule(
            r"(^|\s)[*`]{2}([^ ][^*`]*?)[*`]{2}(\W|$)",
            format!("{BOLD}<code>"),
            "</code></span>",
        ),
        rule(r"(^|\s)\*([^ ][^*]*)\*(\W|$)", BOLD.to_string(), "</span>"),
        rule(r"(^|\s)_([^ ].*?)_(\W|$)", ITALIC.to_string(), "</span>"),
        rule(r"(^|\s)`([^ ][^`]*)`(\W|$)", "<code>".to_string(), "</code>"),
    ]
});

/// Emphasis wrapping the whole text of a link.
static LINK_TEXT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(
            r"^()[*_`]{3}([^<]+?)[*_`]{3}()$",
            format!("{BOLD_ITALIC}<code>"),
            "</code></span>",
        ),
        rule(
            r"^()[*_]{2}([^<]+?)[*_]{2}()$",
            BOLD_ITALIC.to_string(),
            "</span>",
        ),
        rule(
            r"^()[_`]{2}([^<]+?)[_`]{2}()$",
            format!("{ITALIC}<code>"),
            "</code></span>",
        ),
        rule(
            r"^()[*`]{2}([^<]+?)[*`]{2}()$",
            format!("{BOLD}<code>"),
            "</code></span>",
        ),
        rule(r"^()\*([^<]+?)\*()$", BOLD.to_string(), "</span>"),
        rule(r"^()_([^<]+?)_()$", ITALIC.to_string(), "</span>"),
        rule(r"^()`([^<]+?)`()$", "<code>".to_string(), "</code>"),
    ]
});

/// `[text target]` (groups 1 and 2) or a bare `[target]` (group 3).
static BRACKET_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?:([^\[\]]+?) +([^\s\[\]]+?)|([^\s\[\]]+))\]").unwrap()
});
static SCRIPT_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\((.*)\)$").unwrap());

/// Whether emphasis becomes markup or is simply removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleMode {
    Render,
    /// For attribute values such as `alt`, which cannot hold markup.
    Strip,
}

fn apply(rules: &[Rule], text: &str, mode: StyleMode) -> String {
    let mut text = text.to_string();
    for rule in rules {
        loop {
            let next = rule
                .pattern
                .replace_all(&text, |caps: &Captures| match mode {
                    StyleMode::Render => {
                        format!("{}{}{}{}{}", &caps[1], rule.open, &caps[2], rule.close, &caps[3])
                    }
                    StyleMode::Strip => format!("{}{}{}", &caps[1], &caps[2], &caps[3]),
                })
                .into_owned();
            if next == text {
                break;
            }
            text = next;
        }
    }
    text
}

/// Apply emphasis rules to running text.
pub fn style_text(text: &str, mode: StyleMode) -> String {
    apply(&TEXT_RULES, text, mode)
}

/// Apply emphasis to link text: first a run wrapping the whole text, then
/// runs inside it.
pub fn style_link_text(text: &str, mode: StyleMode) -> String {
    let styled = apply(&LINK_TEXT_RULES, text, mode);
    style_text(&styled, mode)
}

/// Text with all emphasis delimiters removed, for `alt` attributes.
pub fn strip_styling(text: &str) -> String {
    style_link_text(text, StyleMode::Strip)
}

/// Renders inline markup in one text fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineRenderer {
    /// `[label name(args)]` becomes a script call trigger.
    pub script_links: bool,
}

impl InlineRenderer {
    pub fn new(script_links: bool) -> Self {
        Self { script_links }
    }

    /// Links become anchors; emphasis is applied to the text between them
    /// only, never across or inside finished anchor markup.
    pub fn render(&self, text: &str) -> Result<String, ConvertError> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in BRACKET_LINK.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            out.push_str(&style_text(&text[last..m.start()], StyleMode::Render));
            let anchor = match caps.get(3) {
                Some(target) => self.link(target.as_str(), target.as_str())?,
                None => self.link(&caps[1], &caps[2])?,
            };
            out.push_str(&anchor);
            last = m.end();
        }
        out.push_str(&style_text(&text[last..], StyleMode::Render));
        Ok(out)
    }

    /// One anchor, or a script call span when enabled and the target is
    /// a call expression.
    pub fn link(&self, text: &str, target: &str) -> Result<String, ConvertError> {
        if self.script_links
            && let Some(call) = script_call(target)?
        {
            let label = if text == target { call.name.as_str() } else { text };
            return Ok(format!(
                r#"<span class="js_call" onclick="{}">{}</span>"#,
                call.expression,
                style_link_text(label, StyleMode::Render)
            ));
        }
        let url = links::clean_url(target);
        links::validate_url(&url)?;
        Ok(format!(
            r#"<a href="{url}">{}</a>"#,
            style_link_text(text, StyleMode::Render)
        ))
    }
}

#[derive(Debug, PartialEq)]
struct ScriptCall {
    name: String,
    expression: String,
}

/// Parse `name(args)`. Arguments may only hold letters, digits and
/// `_-'.;()`; anything else inside a call is an input error.
fn script_call(target: &str) -> Result<Option<ScriptCall>, ConvertError> {
    let target = target.replace("&#x27;", "'");
    let Some(caps) = SCRIPT_CALL.captures(&target) else {
        return Ok(None);
    };
    let allowed = |c: char| c.is_ascii_alphanumeric() || "_-'.;()".contains(c);
    if !caps[2].chars().all(allowed) {
        return Err(ConvertError::ScriptCall(target.clone()));
    }
    Ok(Some(ScriptCall {
        name: caps[1].to_string(),
        expression: target.clone(),
    }))
}

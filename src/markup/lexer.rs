//! Line lexer.
//!
//! Splits escaped text into blank lines, text lines and code blocks. A code
//! block starts a paragraph with `code:` or `code-<lang>:` and runs to the
//! next empty line. Its body goes into a side table and the token keeps
//! only the index, so none of the later passes can touch it.

use regex::Regex;
use std::sync::LazyLock;

static CODE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^code(-\w+)?:(.*)$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Blank,
    /// One text line, indentation preserved.
    Line(String),
    /// A protected code block. `body` indexes [`Lexed::code`].
    Code { lang: Option<String>, body: usize },
}

#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    /// Code bodies, escaped but otherwise verbatim.
    pub code: Vec<String>,
}

pub fn lex(text: &str) -> Lexed {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut lexed = Lexed::default();
    let mut at_paragraph_start = true;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            lexed.tokens.push(if line.is_empty() {
                Token::Blank
            } else {
                Token::Line(line.to_string())
            });
            at_paragraph_start = true;
            i += 1;
            continue;
        }

        if at_paragraph_start && let Some((lang, body, end)) = code_block(&lines, i) {
            lexed.code.push(body);
            lexed.tokens.push(Token::Code {
                lang,
                body: lexed.code.len() - 1,
            });
            i = end;
            continue;
        }

        lexed.tokens.push(Token::Line(line.to_string()));
        at_paragraph_start = false;
        i += 1;
    }
    lexed
}

/// Recognise a code block starting at `start`. Returns the language tag,
/// the body, and the index of the first line after the block.
fn code_block(lines: &[&str], start: usize) -> Option<(Option<String>, String, usize)> {
    let caps = CODE_HEADER.captures(lines[start])?;
    let lang = caps
        .get(1)
        .map(|m| m.as_str().trim_start_matches('-').to_lowercase());
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    // One separating space after the colon belongs to the header.
    let first = rest.strip_prefix(' ').unwrap_or(rest);

    let mut body: Vec<&str> = Vec::new();
    if !first.is_empty() {
        body.push(first);
    }
    let mut end = start + 1;
    while end < lines.len() && !lines[end].is_empty() {
        body.push(lines[end]);
        end += 1;
    }
    if body.iter().all(|l| l.trim().is_empty()) {
        return None;
    }
    Some((lang, body.join("\n"), end))
}

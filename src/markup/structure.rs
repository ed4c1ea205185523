//! Document structure: title, headings, and the sections between them.
//!
//! Works on the normalized token stream. Paragraphs are runs of non-blank
//! tokens. A one-line paragraph indented by two or more spaces is a
//! heading, and the first paragraph is the page title instead when it is
//! also at most 80 characters long.

use super::lexer::Token;

const TITLE_MAX_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub text: String,
    /// A bracketed title (`  [Secret]`) names the page but is not shown.
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paragraph {
    /// Lines with their indentation removed.
    Text(Vec<String>),
    Code { lang: Option<String>, body: usize },
}

impl Paragraph {
    pub fn text(&self) -> Option<String> {
        match self {
            Paragraph::Text(lines) => Some(lines.join("\n")),
            Paragraph::Code { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Heading(String),
    Section(Vec<Paragraph>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub title: Option<Title>,
    pub parts: Vec<Part>,
}

/// Raw paragraphs before indentation is stripped.
enum RawParagraph {
    Lines(Vec<String>),
    Code { lang: Option<String>, body: usize },
}

fn paragraphs(tokens: Vec<Token>) -> Vec<RawParagraph> {
    let mut out = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for token in tokens {
        match token {
            Token::Blank => {
                if !current.is_empty() {
                    out.push(RawParagraph::Lines(std::mem::take(&mut current)));
                }
            }
            Token::Line(line) => current.push(line),
            Token::Code { lang, body } => {
                if !current.is_empty() {
                    out.push(RawParagraph::Lines(std::mem::take(&mut current)));
                }
                out.push(RawParagraph::Code { lang, body });
            }
        }
    }
    if !current.is_empty() {
        out.push(RawParagraph::Lines(current));
    }
    out
}

/// The heading text of a one-line paragraph indented by at least two spaces.
fn indented_line(lines: &[String]) -> Option<&str> {
    let [line] = lines else { return None };
    let content = line.trim_start_matches(' ');
    let indent = line.len() - content.len();
    (indent >= 2 && !content.is_empty() && !content.starts_with(char::is_whitespace))
        .then_some(content)
}

fn title_from(text: &str) -> Title {
    match text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        Some(inner) => Title {
            text: inner.to_string(),
            visible: false,
        },
        None => Title {
            text: text.to_string(),
            visible: true,
        },
    }
}

pub fn structure(tokens: Vec<Token>) -> Document {
    let mut raw = paragraphs(tokens).into_iter().peekable();
    let mut doc = Document::default();

    if let Some(RawParagraph::Lines(lines)) = raw.peek()
        && let Some(text) = indented_line(lines)
        && text.chars().count() <= TITLE_MAX_CHARS
    {
        doc.title = Some(title_from(text));
        raw.next();
    }

    for paragraph in raw {
        let paragraph = match paragraph {
            RawParagraph::Lines(lines) => {
                if let Some(heading) = indented_line(&lines) {
                    doc.parts.push(Part::Heading(heading.to_string()));
                    continue;
                }
                Paragraph::Text(
                    lines
                        .iter()
                        .map(|l| l.trim_start_matches(' ').to_string())
                        .collect(),
                )
            }
            RawParagraph::Code { lang, body } => Paragraph::Code { lang, body },
        };
        match doc.parts.last_mut() {
            Some(Part::Section(section)) => section.push(paragraph),
            _ => doc.parts.push(Part::Section(vec![paragraph])),
        }
    }
    doc
}

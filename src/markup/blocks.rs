//! Block classification and HTML templates.
//!
//! Every paragraph of a section is classified, first match wins:
//!
//! 1. a lone reference: link, image (optionally chained to a click target), video
//! 2. an `@import:` or `@python:` directive, passed through for page assembly
//! 3. two or more `* ` lines: unordered list
//! 4. two or more `1. ` / `1 ` lines: ordered list
//! 5. a code block
//! 6. `Term: text` or `Term phrase:` + next line: definition
//! 7. an image followed by text on the same line: image float
//! 8. anything else: paragraph
//!
//! Each block carries a 1-based ordinal within its family and section, an
//! `odd`/`even` class from that ordinal, and the section ordinal. Ordinals
//! restart with every section.

use super::ConvertError;
use super::inline::{InlineRenderer, strip_styling};
use super::links::{self, ImageFloat, LinkBlock, Reference};
use super::structure::{Document, Paragraph, Part, Title};
use maud::{Markup, PreEscaped, html};
use regex::Regex;
use std::sync::LazyLock;

static BULLET_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\* +(.+)$").unwrap());
static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.? +(.+)$").unwrap());
static DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\w+:\s*\S|\S[^:\n]*:\n *\S)").unwrap());
static URL_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+://").unwrap());
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@(import|python):\s*(?:&quot;|&#x27;)?([^\s&]+?)(?:&quot;|&#x27;)?\s*$").unwrap()
});

pub fn parity(n: usize) -> &'static str {
    if n % 2 == 1 { "odd" } else { "even" }
}

/// Per-section block counters.
#[derive(Debug, Default)]
struct Counters {
    /// Paragraphs, link paragraphs and image-float paragraphs.
    paragraphs: usize,
    lists: usize,
    images: usize,
    videos: usize,
    code: usize,
    definitions: usize,
    floats: usize,
}

#[derive(Debug)]
enum Block {
    Link(LinkBlock),
    Directive { kind: String, name: String },
    UnorderedList(Vec<String>),
    OrderedList(Vec<String>),
    Code { lang: Option<String>, body: usize },
    Definition { term: String, body: String },
    Float(ImageFloat),
    Paragraph(String),
}

fn classify(paragraph: &Paragraph) -> Result<Block, ConvertError> {
    let text = match paragraph {
        Paragraph::Code { lang, body } => {
            return Ok(Block::Code {
                lang: lang.clone(),
                body: *body,
            });
        }
        Paragraph::Text(lines) => lines.join("\n"),
    };

    if let Some(link) = links::parse_link_block(&text)? {
        return Ok(Block::Link(link));
    }
    if text.starts_with("@import:") || text.starts_with("@python:") {
        if let Some(caps) = DIRECTIVE.captures(&text) {
            return Ok(Block::Directive {
                kind: caps[1].to_string(),
                name: caps[2].to_string(),
            });
        }
        log::warn!("malformed directive left as text: {text}");
        return Ok(Block::Paragraph(text));
    }
    let bullets = list_items(&BULLET_LINE, &text);
    if bullets.len() > 1 {
        return Ok(Block::UnorderedList(bullets));
    }
    let numbered = list_items(&NUMBERED_LINE, &text);
    if numbered.len() > 1 {
        return Ok(Block::OrderedList(numbered));
    }
    if DEFINITION.is_match(&text) && !URL_START.is_match(&text) || is_phrase_definition(&text) {
        let (term, rest) = text.split_once(':').unwrap_or((text.as_str(), ""));
        let body = rest
            .strip_prefix(|c: char| c.is_whitespace())
            .unwrap_or(rest);
        return Ok(Block::Definition {
            term: term.to_string(),
            body: body.to_string(),
        });
    }
    if let Some(float) = links::parse_image_float(&text)? {
        return Ok(Block::Float(float));
    }
    Ok(Block::Paragraph(text))
}

/// `A phrase:` on a line of its own, with the text on the next line.
fn is_phrase_definition(text: &str) -> bool {
    DEFINITION.is_match(text)
        && text
            .split_once('\n')
            .is_some_and(|(first, _)| first.ends_with(':') && first.matches(':').count() == 1)
}

/// Items of a list paragraph. Lines that are not items continue the
/// previous one; a paragraph that does not open with an item has none.
fn list_items(pattern: &Regex, text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for line in text.lines() {
        match pattern.captures(line) {
            Some(caps) => items.push(caps[1].to_string()),
            None => match items.last_mut() {
                Some(item) => {
                    item.push('\n');
                    item.push_str(line);
                }
                None => return Vec::new(),
            },
        }
    }
    items
}

/// CSS class for a definition list: the lowercased term, or `definition`
/// when the term is not a single word.
fn definition_class(term: &str) -> String {
    let lower = term.to_lowercase();
    if !lower.is_empty()
        && lower
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        lower
    } else {
        "definition".to_string()
    }
}

/// Renders one document's blocks. Holds nothing that outlives the document.
pub struct BlockRenderer<'a> {
    inline: InlineRenderer,
    code: &'a [String],
}

impl<'a> BlockRenderer<'a> {
    pub fn new(inline: InlineRenderer, code: &'a [String]) -> Self {
        Self { inline, code }
    }

    /// Title, headings and sections joined in document order.
    pub fn render_document(&self, doc: &Document) -> Result<String, ConvertError> {
        let mut out: Vec<String> = Vec::new();
        if let Some(title) = &doc.title
            && title.visible
        {
            out.push(self.title(title)?.into_string());
        }

        let mut section = 0;
        let mut parts = doc.parts.iter().peekable();
        while let Some(part) = parts.next() {
            match part {
                Part::Heading(text) => {
                    section += 1;
                    let heading = self.heading(text, section)?;
                    let body = match parts.peek() {
                        Some(Part::Section(paragraphs)) => {
                            parts.next();
                            self.section(paragraphs, section)?
                        }
                        _ => None,
                    };
                    out.push(match body {
                        Some(body) => html! {
                            div class=(format!("headed_section {} section_{section}", parity(section))) {
                                "\n" (heading) "\n" (body) "\n"
                            }
                        }
                        .into_string(),
                        None => heading.into_string(),
                    });
                }
                Part::Section(paragraphs) => {
                    if let Some(body) = self.section(paragraphs, section)? {
                        out.push(body.into_string());
                    }
                }
            }
        }

        let mut html = out.join("\n");
        html.push('\n');
        Ok(html)
    }

    fn title(&self, title: &Title) -> Result<Markup, ConvertError> {
        let text = self.inline.render(&title.text)?;
        Ok(html! { h1.title { "\n" (PreEscaped(text)) "\n" } })
    }

    fn heading(&self, text: &str, section: usize) -> Result<Markup, ConvertError> {
        let text = self.inline.render(text)?;
        Ok(html! {
            h2 class=(format!("heading {} heading_{section}", parity(section))) {
                "\n" (PreEscaped(text)) "\n"
            }
        })
    }

    /// A section wrapper, or `None` when no block rendered anything.
    fn section(&self, paragraphs: &[Paragraph], section: usize) -> Result<Option<Markup>, ConvertError> {
        let mut counters = Counters::default();
        let mut blocks: Vec<String> = Vec::new();
        for paragraph in paragraphs {
            let block = classify(paragraph)?;
            let rendered = self.block(block, &mut counters, section)?;
            if !rendered.is_empty() {
                blocks.push(rendered);
            }
        }
        if blocks.is_empty() {
            return Ok(None);
        }
        let body = blocks.join("\n");
        Ok(Some(html! {
            div class=(format!("section {} section_{section}", parity(section))) {
                "\n" (PreEscaped(body)) "\n"
            }
        }))
    }

    fn block(&self, block: Block, n: &mut Counters, s: usize) -> Result<String, ConvertError> {
        let markup = match block {
            Block::Link(LinkBlock::Link(reference)) => {
                n.paragraphs += 1;
                let anchor = self.inline.link(&reference.text, &reference.url)?;
                html! {
                    p class=(format!("p_{} link_p {} section_{s}", n.paragraphs, parity(n.paragraphs))) {
                        "\n" (PreEscaped(anchor)) "\n"
                    }
                }
            }
            Block::Link(LinkBlock::Image { image, target }) => {
                n.images += 1;
                let class = match target {
                    Some(_) => format!("imgblock link_img imgblock_{} {} section_{s}", n.images, parity(n.images)),
                    None => format!("imgblock imgblock_{} {} section_{s}", n.images, parity(n.images)),
                };
                self.image(&class, &image, target.as_deref())?
            }
            Block::Link(LinkBlock::Video(reference)) => {
                n.videos += 1;
                let url = links::clean_url(&reference.url);
                html! {
                    div class=(format!("ytvideo vidblock_{} {} section_{s}", n.videos, parity(n.videos))) {
                        "\n"
                        iframe src=(PreEscaped(url)) frameborder="0" allowfullscreen="allowfullscreen" { " " }
                        "\n"
                    }
                }
            }
            Block::Directive { kind, name } => {
                return Ok(format!("@{kind}: \"{name}\""));
            }
            Block::UnorderedList(items) => {
                n.lists += 1;
                let items = self.list_items(&items)?;
                html! {
                    ul class=(format!("list_{} {} section_{s}", n.lists, parity(n.lists))) {
                        "\n" (items)
                    }
                }
            }
            Block::OrderedList(items) => {
                n.lists += 1;
                let items = self.list_items(&items)?;
                html! {
                    ol class=(format!("list_{} {} section_{s}", n.lists, parity(n.lists))) {
                        "\n" (items)
                    }
                }
            }
            Block::Code { lang, body } => {
                n.code += 1;
                let lang_class = lang.map(|l| format!(" code-{l}")).unwrap_or_default();
                let body = self.code.get(body).map(String::as_str).unwrap_or_default();
                html! {
                    div class=(format!("code{lang_class} codeblock_{} {} section_{s}", n.code, parity(n.code))) {
                        "\n" pre.code { (PreEscaped(body)) } "\n"
                    }
                }
            }
            Block::Definition { term, body } => {
                n.definitions += 1;
                let class = format!(
                    "{} dlblock dlblock_{} {} section_{s}",
                    definition_class(&term),
                    n.definitions,
                    parity(n.definitions)
                );
                let term = self.inline.render(&term)?;
                let body = self.inline.render(&body)?;
                html! {
                    dl class=(class) {
                        "\n"
                        dt { "\n" (PreEscaped(term)) "\n" } "\n"
                        dd { "\n" (PreEscaped(body)) "\n" } "\n"
                    }
                }
            }
            Block::Float(float) => {
                n.floats += 1;
                n.paragraphs += 1;
                // The zig-zag starts on the side given by the section's parity.
                let side = parity(n.floats + s);
                let class = match float.target {
                    Some(_) => format!("imgfloat link_img imgfloat_{} {side} section_{s}", n.floats),
                    None => format!("imgfloat imgfloat_{} {side} section_{s}", n.floats),
                };
                let image = self.image(&class, &float.image, float.target.as_deref())?;
                let body = self.inline.render(&float.body)?;
                html! {
                    (image) "\n"
                    p class=(format!("p_{} img_p {} section_{s}", n.paragraphs, parity(n.paragraphs))) {
                        "\n" (PreEscaped(body)) "\n"
                    }
                }
            }
            Block::Paragraph(text) => {
                n.paragraphs += 1;
                let text = self.inline.render(&text)?;
                html! {
                    p class=(format!("p_{} {} section_{s}", n.paragraphs, parity(n.paragraphs))) {
                        "\n" (PreEscaped(text)) "\n"
                    }
                }
            }
        };
        Ok(markup.into_string())
    }

    fn list_items(&self, items: &[String]) -> Result<Markup, ConvertError> {
        let rendered = items
            .iter()
            .map(|item| self.inline.render(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(html! {
            @for (i, item) in rendered.iter().enumerate() {
                li class=(format!("li_{} {}", i + 1, parity(i + 1))) {
                    "\n" (PreEscaped(item)) "\n"
                }
                "\n"
            }
        })
    }

    /// Image div shared by image blocks and floats.
    fn image(&self, class: &str, image: &Reference, target: Option<&str>) -> Result<Markup, ConvertError> {
        let src = links::clean_url(&image.url);
        let alt = strip_styling(&image.text);
        let caption = if image.text.is_empty() {
            None
        } else {
            Some(self.inline.render(&image.text)?)
        };
        let img = html! { img src=(PreEscaped(&src)) alt=(PreEscaped(&alt)); };
        Ok(html! {
            div class=(class) {
                "\n"
                @if let Some(target) = target {
                    a href=(PreEscaped(links::clean_url(target))) { "\n" (img) "\n" } "\n"
                } @else {
                    (img) "\n"
                }
                @if let Some(caption) = caption {
                    p.imgcaption { "\n" (PreEscaped(caption)) "\n" } "\n"
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::structure::Paragraph;

    fn para(text: &str) -> Paragraph {
        Paragraph::Text(text.lines().map(str::to_string).collect())
    }

    fn render_section(paragraphs: &[Paragraph]) -> String {
        let renderer = BlockRenderer::new(InlineRenderer::default(), &[]);
        renderer
            .section(paragraphs, 0)
            .unwrap()
            .map(Markup::into_string)
            .unwrap_or_default()
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn classify_precedence() {
        assert!(matches!(classify(&para("[Home index.html]")).unwrap(), Block::Link(_)));
        assert!(matches!(
            classify(&para("@import: &quot;menu.txt&quot;")).unwrap(),
            Block::Directive { ref kind, ref name } if kind == "import" && name == "menu.txt"
        ));
        assert!(matches!(classify(&para("* a\n* b")).unwrap(), Block::UnorderedList(_)));
        assert!(matches!(classify(&para("1. a\n2. b")).unwrap(), Block::OrderedList(_)));
        assert!(matches!(classify(&para("Note: mind the gap")).unwrap(), Block::Definition { .. }));
        assert!(matches!(classify(&para("[boat.jpg] We sailed.")).unwrap(), Block::Float(_)));
        assert!(matches!(classify(&para("Just words.")).unwrap(), Block::Paragraph(_)));
    }

    #[test]
    fn single_star_line_is_a_paragraph() {
        assert!(matches!(classify(&para("* only one")).unwrap(), Block::Paragraph(_)));
    }

    #[test]
    fn url_at_start_is_not_a_definition() {
        assert!(matches!(
            classify(&para("http://example.com is nice")).unwrap(),
            Block::Paragraph(_)
        ));
    }

    #[test]
    fn definition_body_may_hold_a_url() {
        match classify(&para("Note: see http://example.com for details")).unwrap() {
            Block::Definition { term, body } => {
                assert_eq!(term, "Note");
                assert_eq!(body, "see http://example.com for details");
            }
            other => panic!("expected definition, got {other:?}"),
        }
    }

    #[test]
    fn malformed_directive_stays_visible() {
        assert!(matches!(
            classify(&para("@import: menu.txt and more")).unwrap(),
            Block::Paragraph(ref text) if text == "@import: menu.txt and more"
        ));
        let html = render_section(&[para("@python: a b")]);
        assert!(html.contains("<p class=\"p_1 odd section_0\">\n@python: a b\n</p>"));
    }

    #[test]
    fn phrase_definition_on_two_lines() {
        match classify(&para("Opening hours:\n  Daily 9 to 5")).unwrap() {
            Block::Definition { term, body } => {
                assert_eq!(term, "Opening hours");
                assert_eq!(body, "  Daily 9 to 5");
            }
            other => panic!("expected definition, got {other:?}"),
        }
    }

    #[test]
    fn definition_class_names() {
        assert_eq!(definition_class("Note"), "note");
        assert_eq!(definition_class("Opening hours"), "definition");
        assert_eq!(definition_class("a&amp;b"), "definition");
    }

    // =========================================================================
    // Templates
    // =========================================================================

    #[test]
    fn paragraph_counters_and_parity() {
        let html = render_section(&[para("one"), para("two")]);
        assert!(html.starts_with("<div class=\"section even section_0\">\n"));
        assert!(html.contains("<p class=\"p_1 odd section_0\">\none\n</p>"));
        assert!(html.contains("<p class=\"p_2 even section_0\">\ntwo\n</p>"));
    }

    #[test]
    fn link_paragraph_shares_paragraph_counter() {
        let html = render_section(&[para("text"), para("[Home index.html]")]);
        assert!(html.contains(
            "<p class=\"p_2 link_p even section_0\">\n<a href=\"index.html\">Home</a>\n</p>"
        ));
    }

    #[test]
    fn chained_image_renders_anchor_around_img() {
        let html = render_section(&[para("[Logo logo.jpg][http://example.com]")]);
        assert!(html.contains("<div class=\"imgblock link_img imgblock_1 odd section_0\">"));
        assert!(html.contains(
            "<a href=\"http://example.com\">\n<img src=\"logo.jpg\" alt=\"Logo\">\n</a>"
        ));
        assert!(html.contains("<p class=\"imgcaption\">\nLogo\n</p>"));
    }

    #[test]
    fn image_alt_has_styling_stripped() {
        let html = render_section(&[para("[A *bold* move pic.png]")]);
        assert!(html.contains("alt=\"A bold move\""));
        assert!(html.contains("<span style=\"font-weight:bold\">bold</span>"));
    }

    #[test]
    fn image_ordinals_are_sequential() {
        let html = render_section(&[para("[a.jpg]"), para("text"), para("[b.png]"), para("[c.gif]")]);
        assert!(html.contains("imgblock imgblock_1 odd"));
        assert!(html.contains("imgblock imgblock_2 even"));
        assert!(html.contains("imgblock imgblock_3 odd"));
        assert!(html.contains("p_1 odd"));
    }

    #[test]
    fn video_block() {
        let html = render_section(&[para("[https://www.youtube.com/embed/abc]")]);
        assert!(html.contains("<div class=\"ytvideo vidblock_1 odd section_0\">"));
        assert!(html.contains(
            "<iframe src=\"https://www.youtube.com/embed/abc\" frameborder=\"0\" allowfullscreen=\"allowfullscreen\"> </iframe>"
        ));
    }

    #[test]
    fn unordered_list_items() {
        let html = render_section(&[para("* *one*\n* two")]);
        assert!(html.contains("<ul class=\"list_1 odd section_0\">\n<li class=\"li_1 odd\">"));
        assert!(html.contains("<span style=\"font-weight:bold\">one</span>"));
        assert!(html.contains("<li class=\"li_2 even\">\ntwo\n</li>\n</ul>"));
    }

    #[test]
    fn lists_share_a_counter() {
        let html = render_section(&[para("* a\n* b"), para("1. c\n2. d")]);
        assert!(html.contains("<ul class=\"list_1 odd"));
        assert!(html.contains("<ol class=\"list_2 even"));
    }

    #[test]
    fn code_block_uses_side_table() {
        let code = vec!["fn main() {}".to_string()];
        let renderer = BlockRenderer::new(InlineRenderer::default(), &code);
        let html = renderer
            .section(
                &[Paragraph::Code {
                    lang: Some("rust".into()),
                    body: 0,
                }],
                2,
            )
            .unwrap()
            .unwrap()
            .into_string();
        assert!(html.contains("<div class=\"code code-rust codeblock_1 odd section_2\">"));
        assert!(html.contains("<pre class=\"code\">fn main() {}</pre>"));
    }

    #[test]
    fn definition_template() {
        let html = render_section(&[para("Note: bring water")]);
        assert!(html.contains(
            "<dl class=\"note dlblock dlblock_1 odd section_0\">\n<dt>\nNote\n</dt>\n<dd>\nbring water\n</dd>\n</dl>"
        ));
    }

    #[test]
    fn float_emits_image_then_paragraph() {
        let html = render_section(&[para("[Boat boat.png] We sailed.")]);
        let img = html.find("imgfloat imgfloat_1").unwrap();
        let p = html.find("p_1 img_p odd section_0").unwrap();
        assert!(img < p);
        assert!(html.contains("imgfloat imgfloat_1 odd section_0"));
    }

    #[test]
    fn directive_passes_through() {
        let html = render_section(&[para("@python: &quot;page_style_link&quot;")]);
        assert!(html.contains("@python: \"page_style_link\""));
    }
}

//! Bracket reference parsing: `[text url]`, `[url]`, and the chained
//! `[image][click-target]` form.

use super::ConvertError;

const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".png", ".gif", ".svg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Link,
    Image,
    Video,
}

/// Classify a reference target.
pub fn link_kind(url: &str) -> LinkKind {
    let lower = url.to_lowercase();
    if lower.contains("youtube") || lower.contains("youtu.be") {
        LinkKind::Video
    } else if IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        LinkKind::Image
    } else {
        LinkKind::Link
    }
}

/// Reject targets that could break out of an attribute value.
///
/// The text is already escaped, so quotes and angle brackets show up as
/// entities here.
pub fn validate_url(url: &str) -> Result<(), ConvertError> {
    const FORBIDDEN: [&str; 8] = ["\"", "'", "<", ">", "&quot;", "&#x27;", "&lt;", "&gt;"];
    if url.is_empty() || FORBIDDEN.iter().any(|f| url.contains(f)) {
        return Err(ConvertError::BadUrl(url.to_string()));
    }
    Ok(())
}

/// Target with emphasis delimiters wrapped around it removed, and a bare
/// `www.` host given a scheme.
pub fn clean_url(url: &str) -> String {
    let mut url = url;
    for _ in 0..3 {
        let mut chars = url.chars();
        match (chars.next(), chars.next_back()) {
            (Some(a), Some(b)) if a == b && matches!(a, '*' | '_' | '`') && url.len() > 2 => {
                url = &url[1..url.len() - 1];
            }
            _ => break,
        }
    }
    if url.starts_with("www.") {
        format!("http://{url}")
    } else {
        url.to_string()
    }
}

/// Contents of one bracket group, split into text and target.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub text: String,
    pub url: String,
    pub kind: LinkKind,
}

/// Split the inside of `[...]`. The target is the last whitespace-separated
/// word. A lone word is its own link text, except for images and videos,
/// which get no caption.
pub fn split_reference(inner: &str) -> Reference {
    let inner = inner.trim();
    match inner.rsplit_once(char::is_whitespace) {
        Some((text, url)) => Reference {
            text: text.trim_end().to_string(),
            url: url.to_string(),
            kind: link_kind(url),
        },
        None => {
            let kind = link_kind(inner);
            Reference {
                text: if kind == LinkKind::Link {
                    inner.to_string()
                } else {
                    String::new()
                },
                url: inner.to_string(),
                kind,
            }
        }
    }
}

/// Leading bracket groups of `text` and whatever follows them.
///
/// Groups must be adjacent (`[a][b]`) and must not nest.
fn leading_groups(text: &str) -> (Vec<&str>, &str) {
    let mut groups = Vec::new();
    let mut rest = text;
    while let Some(after) = rest.strip_prefix('[') {
        let Some(close) = after.find(']') else { break };
        let inner = &after[..close];
        if inner.contains('[') || inner.trim().is_empty() {
            break;
        }
        groups.push(inner);
        rest = &after[close + 1..];
    }
    (groups, rest)
}

/// A paragraph that is nothing but a reference.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkBlock {
    Link(Reference),
    Image {
        image: Reference,
        target: Option<String>,
    },
    Video(Reference),
}

/// Recognise a paragraph made of a single reference, or of an image
/// reference chained to a click target.
pub fn parse_link_block(paragraph: &str) -> Result<Option<LinkBlock>, ConvertError> {
    let (groups, rest) = leading_groups(paragraph);
    if !rest.is_empty() {
        return Ok(None);
    }
    match groups.as_slice() {
        [single] => {
            let reference = split_reference(single);
            validate_url(&reference.url)?;
            Ok(Some(match reference.kind {
                LinkKind::Link => LinkBlock::Link(reference),
                LinkKind::Video => LinkBlock::Video(reference),
                LinkKind::Image => LinkBlock::Image {
                    image: reference,
                    target: None,
                },
            }))
        }
        [image, target] => {
            let image = split_reference(image);
            if image.kind != LinkKind::Image {
                return Ok(None);
            }
            let target = target.trim();
            validate_url(&image.url)?;
            validate_url(target)?;
            Ok(Some(LinkBlock::Image {
                image,
                target: Some(target.to_string()),
            }))
        }
        _ => Ok(None),
    }
}

/// An image at the start of a paragraph, with text following it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFloat {
    pub image: Reference,
    pub target: Option<String>,
    pub body: String,
}

/// Recognise `[caption pic.jpg] Body text...` or
/// `[pic.jpg][target] Body text...`.
pub fn parse_image_float(paragraph: &str) -> Result<Option<ImageFloat>, ConvertError> {
    let (groups, rest) = leading_groups(paragraph);
    let (image, target) = match groups.as_slice() {
        [image] => (*image, None),
        [image, target] => (*image, Some(target.trim())),
        _ => return Ok(None),
    };
    let image = split_reference(image);
    if image.kind != LinkKind::Image {
        return Ok(None);
    }
    let body = rest.trim_start_matches(' ');
    let first_line = body.lines().next().unwrap_or_default();
    if first_line.chars().count() < 2 || first_line.starts_with(char::is_whitespace) {
        return Ok(None);
    }
    validate_url(&image.url)?;
    if let Some(target) = target {
        validate_url(target)?;
    }
    Ok(Some(ImageFloat {
        image,
        target: target.map(str::to_string),
        body: body.trim().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_by_target() {
        assert_eq!(link_kind("pic.JPG"), LinkKind::Image);
        assert_eq!(link_kind("https://youtu.be/abc"), LinkKind::Video);
        assert_eq!(link_kind("https://www.youtube.com/embed/x.png"), LinkKind::Video);
        assert_eq!(link_kind("index.html"), LinkKind::Link);
    }

    #[test]
    fn split_text_and_target() {
        let r = split_reference("Our club house.html");
        assert_eq!(r.text, "Our club");
        assert_eq!(r.url, "house.html");
    }

    #[test]
    fn lone_link_is_its_own_text() {
        let r = split_reference("http://example.com");
        assert_eq!(r.text, "http://example.com");
        let img = split_reference("logo.png");
        assert_eq!(img.text, "");
        assert_eq!(img.kind, LinkKind::Image);
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("a.html").is_ok());
        assert!(validate_url("a&quot;onclick=x").is_err());
        assert!(validate_url("it&#x27;s.html").is_err());
        assert!(validate_url("&lt;script&gt;").is_err());
        assert!(validate_url("").is_err());
    }

    #[test]
    fn clean_url_strips_emphasis_and_adds_scheme() {
        assert_eq!(clean_url("*page.html*"), "page.html");
        assert_eq!(clean_url("_`x.html`_"), "x.html");
        assert_eq!(clean_url("www.example.com"), "http://www.example.com");
        assert_eq!(clean_url("my_page_x.html"), "my_page_x.html");
    }

    // =========================================================================
    // Link blocks
    // =========================================================================

    #[test]
    fn single_link_block() {
        let block = parse_link_block("[Home index.html]").unwrap();
        assert!(matches!(block, Some(LinkBlock::Link(ref r)) if r.url == "index.html"));
    }

    #[test]
    fn chained_image_block() {
        let block = parse_link_block("[Logo logo.jpg][http://example.com]").unwrap();
        match block {
            Some(LinkBlock::Image { image, target }) => {
                assert_eq!(image.url, "logo.jpg");
                assert_eq!(image.text, "Logo");
                assert_eq!(target.as_deref(), Some("http://example.com"));
            }
            other => panic!("expected image block, got {other:?}"),
        }
    }

    #[test]
    fn chain_not_starting_with_image_is_not_a_block() {
        assert_eq!(parse_link_block("[a.html][b.html]").unwrap(), None);
    }

    #[test]
    fn text_after_reference_is_not_a_block() {
        assert_eq!(parse_link_block("[a.html] and more").unwrap(), None);
    }

    #[test]
    fn quoted_target_in_block_is_fatal() {
        let err = parse_link_block("[Bad a&quot;b.html]").unwrap_err();
        assert!(matches!(err, ConvertError::BadUrl(_)));
    }

    // =========================================================================
    // Image floats
    // =========================================================================

    #[test]
    fn float_with_caption_and_body() {
        let float = parse_image_float("[Boat boat.png] We sailed\nall day.")
            .unwrap()
            .unwrap();
        assert_eq!(float.image.url, "boat.png");
        assert_eq!(float.image.text, "Boat");
        assert_eq!(float.target, None);
        assert_eq!(float.body, "We sailed\nall day.");
    }

    #[test]
    fn float_with_click_target() {
        let float = parse_image_float("[boat.png][big/boat.png] Text")
            .unwrap()
            .unwrap();
        assert_eq!(float.target.as_deref(), Some("big/boat.png"));
        assert_eq!(float.body, "Text");
    }

    #[test]
    fn float_needs_an_image_and_text() {
        assert_eq!(parse_image_float("[a.html] Text").unwrap(), None);
        assert_eq!(parse_image_float("[a.jpg]").unwrap(), None);
        assert_eq!(parse_image_float("[a.jpg] x").unwrap(), None);
    }
}

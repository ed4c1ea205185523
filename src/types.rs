//! Shared types used across the build and deploy stages.
//!
//! Every path handed between stages is relative to the site directory and
//! uses `/` separators, which is also how the ledger stores them.

use std::path::{Path, PathBuf};

/// Folder name reserved for news posts, both under the sources and the output.
pub const NEWS_DIR: &str = "news";

/// Source folder, relative to the site directory.
pub const SOURCES_DIR: &str = "page_sources";

/// Output folder, relative to the site directory. Everything below it is
/// uploaded verbatim.
pub const HTML_DIR: &str = "public_html";

/// Well-known locations inside one site directory.
///
/// ```text
/// <site>/
/// ├── config/config.toml
/// ├── config/import/
/// ├── page_sources/
/// │   ├── news.txt
/// │   └── news/
/// ├── public_html/
/// │   ├── news/images/thumbs/
/// │   └── res/js/news.js
/// └── private/ledger.txt
/// ```
#[derive(Debug, Clone)]
pub struct SiteLayout {
    pub root: PathBuf,
}

impl SiteLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Site identifier written as the first ledger line: the folder name.
    pub fn site_id(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "site".to_string())
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.join("config")
    }

    pub fn import_dir(&self) -> PathBuf {
        self.config_dir().join("import")
    }

    pub fn sources_dir(&self) -> PathBuf {
        self.root.join(SOURCES_DIR)
    }

    pub fn html_dir(&self) -> PathBuf {
        self.root.join(HTML_DIR)
    }

    pub fn ledger_file(&self) -> PathBuf {
        self.root.join("private").join("ledger.txt")
    }

    /// Relative path of the news listing source.
    pub fn listing_source(&self) -> String {
        format!("{SOURCES_DIR}/{NEWS_DIR}.txt")
    }

    /// Relative path of the client navigation script.
    pub fn nav_script(&self) -> String {
        format!("{HTML_DIR}/res/js/news.js")
    }

    /// Relative path of the news image folder.
    pub fn news_images(&self) -> String {
        format!("{HTML_DIR}/{NEWS_DIR}/images")
    }

    /// Resolve a site-relative path.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Site-relative, `/`-separated form of an absolute path below the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Output path for a source path: `page_sources/x/y.txt` becomes
    /// `public_html/x/y<ext>`. Passthrough sources keep their extension.
    pub fn output_for(&self, source: &str, page_extension: &str) -> String {
        let rel = source
            .strip_prefix(SOURCES_DIR)
            .map(|r| r.trim_start_matches('/'))
            .unwrap_or(source);
        let kind = SourceKind::from_path(rel);
        match (kind, rel.rfind('.')) {
            (Some(SourceKind::Passthrough), _) | (None, _) => format!("{HTML_DIR}/{rel}"),
            (Some(_), Some(dot)) => format!("{HTML_DIR}/{}{page_extension}", &rel[..dot]),
            (Some(_), None) => format!("{HTML_DIR}/{rel}{page_extension}"),
        }
    }
}

/// Whether a relative path sits directly in a `news` folder.
pub fn in_news_dir(rel: &str) -> bool {
    let mut parts = rel.rsplit('/');
    parts.next();
    parts.next() == Some(NEWS_DIR)
}

/// File stem of a relative path.
pub fn stem(rel: &str) -> &str {
    let file = rel.rsplit('/').next().unwrap_or(rel);
    match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    }
}

/// How a source file is turned into a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.txt`: light markup, unless markdown is the configured default.
    LightMarkup,
    /// `.mdml`: always markdown.
    Markdown,
    /// `.html`, `.php`, `.htm`: copied into the page untouched.
    Passthrough,
}

impl SourceKind {
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase())?;
        match ext.as_str() {
            "txt" => Some(Self::LightMarkup),
            "mdml" => Some(Self::Markdown),
            "html" | "php" | "htm" => Some(Self::Passthrough),
            _ => None,
        }
    }
}

/// One source file read into memory.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Site-relative path.
    pub path: String,
    pub text: String,
    pub kind: SourceKind,
}

impl SourceDocument {
    pub fn new(path: impl Into<String>, text: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
            kind,
        }
    }

    pub fn is_news(&self) -> bool {
        in_news_dir(&self.path)
    }

    /// Base name without extension, used as the content wrapper class.
    pub fn base_name(&self) -> &str {
        stem(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_by_extension() {
        assert_eq!(SourceKind::from_path("a/b.txt"), Some(SourceKind::LightMarkup));
        assert_eq!(SourceKind::from_path("b.mdml"), Some(SourceKind::Markdown));
        assert_eq!(SourceKind::from_path("b.PHP"), Some(SourceKind::Passthrough));
        assert_eq!(SourceKind::from_path("b.css"), None);
        assert_eq!(SourceKind::from_path("noext"), None);
    }

    #[test]
    fn news_detection_uses_direct_parent() {
        assert!(in_news_dir("page_sources/news/post.txt"));
        assert!(in_news_dir("news/post1.txt"));
        assert!(!in_news_dir("page_sources/news.txt"));
        assert!(!in_news_dir("page_sources/news/images/a.jpg/x"));
    }

    #[test]
    fn output_path_swaps_extension() {
        let layout = SiteLayout::new("/tmp/site");
        assert_eq!(
            layout.output_for("page_sources/news/post.txt", ".html"),
            "public_html/news/post.html"
        );
        assert_eq!(
            layout.output_for("page_sources/about.mdml", ".php"),
            "public_html/about.php"
        );
        assert_eq!(
            layout.output_for("page_sources/raw.htm", ".html"),
            "public_html/raw.htm"
        );
    }

    #[test]
    fn relative_path_uses_forward_slashes() {
        let layout = SiteLayout::new("/tmp/site");
        let abs = layout.root.join("page_sources").join("news").join("a.txt");
        assert_eq!(
            layout.relative(&abs).as_deref(),
            Some("page_sources/news/a.txt")
        );
    }

    #[test]
    fn site_id_is_folder_name() {
        assert_eq!(SiteLayout::new("/srv/sites/blog").site_id(), "blog");
    }

    #[test]
    fn base_name_strips_directory_and_extension() {
        let doc = SourceDocument::new("page_sources/news/hello.txt", "", SourceKind::LightMarkup);
        assert_eq!(doc.base_name(), "hello");
        assert!(doc.is_news());
    }
}

//! Page plugins invoked by `@python: "name"` directives.
//!
//! A plugin receives the assembled page HTML with the directive already
//! removed, the byte index where the directive stood, and a read-only
//! [`PluginContext`]. It returns the new HTML. Plugins are registered by
//! name in a [`PluginRegistry`] at startup; a directive naming anything
//! else is an error.
//!
//! The directive keeps its historical `@python:` spelling so existing
//! sites and snippets keep working.

use crate::config::SiteConfig;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("no page plugin named {0:?} is registered")]
    Unknown(String),
    #[error("plugin {name} failed: {message}")]
    Failed { name: String, message: String },
}

/// What a plugin may know about the page being assembled.
#[derive(Debug, Clone, Copy)]
pub struct PluginContext<'a> {
    pub config: &'a SiteConfig,
    /// Site-relative source path.
    pub source: &'a str,
    /// Site-relative output path.
    pub output: &'a str,
    pub base_name: &'a str,
    pub is_news: bool,
}

pub trait PagePlugin {
    fn render(&self, html: &str, index: usize, ctx: &PluginContext) -> Result<String, PluginError>;
}

/// Name → plugin lookup.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Box<dyn PagePlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the plugins that ship with the crate.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("stylesheet_links", StylesheetLinks::default());
        // Name used by older sites for the same job.
        registry.register("page_style_link", StylesheetLinks::default());
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, plugin: impl PagePlugin + 'static) {
        self.plugins.insert(name.into(), Box::new(plugin));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Run plugin `name` on `html`.
    pub fn invoke(
        &self,
        name: &str,
        html: &str,
        index: usize,
        ctx: &PluginContext,
    ) -> Result<String, PluginError> {
        let plugin = self
            .plugins
            .get(name)
            .ok_or_else(|| PluginError::Unknown(name.to_string()))?;
        log::debug!("running plugin {name} on {}", ctx.source);
        plugin.render(html, index, ctx)
    }
}

/// Inserts `<link rel="stylesheet">` tags for pages listed in its table.
///
/// Keys are source base names; `newspost` matches every news post. News
/// posts live one folder down and get `../res/css/`.
pub struct StylesheetLinks {
    sheets: BTreeMap<String, Vec<String>>,
}

impl StylesheetLinks {
    pub fn new(sheets: BTreeMap<String, Vec<String>>) -> Self {
        Self { sheets }
    }
}

impl Default for StylesheetLinks {
    fn default() -> Self {
        let mut sheets = BTreeMap::new();
        sheets.insert("news".to_string(), vec!["quire_newslist.css".to_string()]);
        sheets.insert("newspost".to_string(), vec!["quire_newspost.css".to_string()]);
        Self::new(sheets)
    }
}

impl PagePlugin for StylesheetLinks {
    fn render(&self, html: &str, index: usize, ctx: &PluginContext) -> Result<String, PluginError> {
        let (key, prefix) = if ctx.is_news {
            ("newspost", "../res/css/")
        } else {
            (ctx.base_name, "res/css/")
        };
        let Some(sheets) = self.sheets.get(key) else {
            return Ok(html.to_string());
        };
        if !html.is_char_boundary(index) {
            return Err(PluginError::Failed {
                name: "stylesheet_links".to_string(),
                message: format!("insertion point {index} is not inside the page"),
            });
        }
        let links: String = sheets
            .iter()
            .map(|s| format!("<link rel=\"stylesheet\" href=\"{prefix}{s}\">\n"))
            .collect();
        Ok(format!("{}{links}{}", &html[..index], &html[index..]))
    }
}

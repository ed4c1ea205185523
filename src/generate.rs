//! The conversion batch.
//!
//! Stage 2 of the build. Takes the [`ScanReport`], converts every new or
//! changed source into a page, keeps the news listing and navigation script
//! current, and records what it did in the ledger.
//!
//! ## Order
//!
//! ```text
//! 1. ordinary pages                 by path
//! 2. news posts already in ledger   by recorded date, oldest first
//! 3. news posts never seen before   by path
//! 4. page_sources/news.txt          when any post changed
//! ```
//!
//! Listing entries are inserted at the top, so converting older posts first
//! leaves the newest on top.
//!
//! ## Failure
//!
//! Conversion errors are fatal. Pages already written stay on disk but the
//! ledger is only touched after the whole batch succeeds, so the next run
//! sees them as changed again. Thumbnail failures are not fatal: the post is
//! listed without one.

use crate::config::SiteConfig;
use crate::imaging::{self, ImageBackend, RustBackend, ThumbnailConfig};
use crate::ledger::{Ledger, LedgerError};
use crate::markup::{self, ConvertError, Engine};
use crate::news::{self, Listing, NewsError, NewsPost};
use crate::page::{self, PageContext, PageError};
use crate::plugins::PluginRegistry;
use crate::scan::{self, ScanError, ScannedSource};
use crate::types::{HTML_DIR, NEWS_DIR, SiteLayout, SourceDocument, SourceKind};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("{path}: {source}")]
    Convert { path: String, source: ConvertError },
    #[error("{path}: {source}")]
    Page { path: String, source: PageError },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    News(#[from] NewsError),
}

/// Knobs for one build.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Reconvert every source, changed or not.
    pub convert_all: bool,
    /// Timestamp for new ledger records; its date is "today" for new posts.
    pub now: NaiveDateTime,
}

/// One converted page.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltPage {
    pub source: String,
    pub output: String,
    pub title: Option<String>,
    pub is_news: bool,
    #[serde(skip)]
    pub engine: Engine,
}

/// What a build did.
#[derive(Debug, Default, Serialize)]
pub struct BuildReport {
    pub pages: Vec<BuiltPage>,
    pub unchanged: usize,
    /// Sources left alone, with the reason.
    pub skipped: Vec<(String, String)>,
    /// Site-relative thumbnails written.
    pub thumbnails: Vec<String>,
    pub listing_updated: bool,
    pub nav_script: Option<String>,
    /// Uploadable assets recorded as changed.
    pub assets: Vec<String>,
}

/// Build the site with the production image backend and built-in plugins.
pub fn build(
    layout: &SiteLayout,
    config: &SiteConfig,
    ledger: &mut Ledger,
    options: BuildOptions,
) -> Result<BuildReport, GenerateError> {
    let backend = RustBackend::new();
    let plugins = PluginRegistry::with_builtins();
    build_with_backend(&backend, &plugins, layout, config, ledger, options)
}

/// Build the site using a specific backend and plugin set (allows testing with mocks).
pub fn build_with_backend(
    backend: &impl ImageBackend,
    plugins: &PluginRegistry,
    layout: &SiteLayout,
    config: &SiteConfig,
    ledger: &mut Ledger,
    options: BuildOptions,
) -> Result<BuildReport, GenerateError> {
    if options.convert_all {
        let count = ledger.mark_all_changed();
        log::info!("forcing reconversion of {count} recorded sources");
    }
    let news_sources = layout.sources_dir().join(NEWS_DIR);
    if news_sources.is_dir() {
        fs::create_dir_all(layout.path(&layout.news_images()))?;
    }

    let report = scan::scan(layout, config, ledger)?;
    let mut batch = Batch {
        backend,
        plugins,
        layout,
        config,
        ledger,
        now: options.now,
        recorded: Vec::new(),
        report: BuildReport {
            unchanged: report.count(scan::SourceState::Unchanged),
            ..BuildReport::default()
        },
    };

    let listing_path = layout.listing_source();
    let mut listing_pending = false;
    let mut pages = Vec::new();
    let mut old_news = Vec::new();
    let mut new_news = Vec::new();
    for source in report.pending() {
        if source.path == listing_path {
            listing_pending = true;
        } else if !source.is_news {
            pages.push(source);
        } else if let Some(date) = batch.ledger.date_of(&source.path) {
            old_news.push((date, source));
        } else {
            new_news.push(source);
        }
    }
    old_news.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.path.cmp(&b.1.path)));

    for source in pages {
        batch.convert_page(source)?;
    }

    let mut listing = Listing::load(&layout.path(&listing_path), &config.news.list_title)?;
    let mut news_changed = false;
    for source in old_news.into_iter().map(|(_, s)| s).chain(new_news) {
        if let Some(post) = batch.convert_post(source)? {
            listing.upsert(&post, &config.news);
            news_changed = true;
        }
    }

    if news_changed {
        listing.save(&layout.path(&listing_path))?;
        batch.report.listing_updated = true;
        log::info!("news listing now has {} entries", listing.entries.len());
    }
    if news_changed || listing_pending {
        batch.convert_listing(&listing_path)?;
    }

    batch.finish(news_changed)
}

/// State of one running batch.
struct Batch<'a, B: ImageBackend> {
    backend: &'a B,
    plugins: &'a PluginRegistry,
    layout: &'a SiteLayout,
    config: &'a SiteConfig,
    ledger: &'a mut Ledger,
    now: NaiveDateTime,
    /// Sources and outputs to record once everything succeeded.
    recorded: Vec<String>,
    report: BuildReport,
}

impl<B: ImageBackend> Batch<'_, B> {
    fn today(&self) -> NaiveDate {
        self.now.date()
    }

    fn read(&self, source: &ScannedSource) -> Result<SourceDocument, GenerateError> {
        let text = fs::read_to_string(self.layout.path(&source.path))?;
        Ok(SourceDocument::new(&source.path, text, source.kind))
    }

    fn convert_page(&mut self, source: &ScannedSource) -> Result<(), GenerateError> {
        let doc = self.read(source)?;
        let rendered = markup::convert(&doc, self.config).map_err(|e| GenerateError::Convert {
            path: source.path.clone(),
            source: e,
        })?;
        self.write_page(&doc, &source.output, &rendered, None)
    }

    /// Convert a news post. Returns its descriptor, or `None` when skipped.
    fn convert_post(&mut self, source: &ScannedSource) -> Result<Option<NewsPost>, GenerateError> {
        let doc = self.read(source)?;
        if markup::engine_for(doc.kind, self.config) == Engine::Markdown {
            log::warn!("{}: markdown news posts are not supported, skipped", source.path);
            self.report
                .skipped
                .push((source.path.clone(), "markdown news post".to_string()));
            return Ok(None);
        }
        let rendered = markup::convert(&doc, self.config).map_err(|e| GenerateError::Convert {
            path: source.path.clone(),
            source: e,
        })?;
        let date = news::post_date(
            &source.path,
            self.ledger,
            self.config.news.filename_dates,
            self.today(),
        );
        self.write_page(&doc, &source.output, &rendered, Some(date))?;

        let mut post = NewsPost::derive(
            &source.path,
            &source.output,
            &doc.text,
            rendered.title.as_deref(),
            self.ledger,
            &self.config.news,
            self.today(),
        );
        if self.config.news.thumbnails {
            post.thumbnail = self.thumbnail(&post);
        }
        Ok(Some(post))
    }

    /// Thumbnail for a post's lead image, relative to `public_html/`.
    fn thumbnail(&mut self, post: &NewsPost) -> Option<String> {
        let lead = post.lead_image.as_deref()?;
        let source = self.layout.path(lead);
        if !source.is_file() {
            log::warn!("{}: lead image {lead} not found, no thumbnail", post.source);
            return None;
        }
        if !imaging::is_supported(&source) {
            log::debug!("{}: lead image {lead} is not a raster image", post.source);
            return None;
        }
        let target = post.thumbnail_target();
        let config = ThumbnailConfig::for_listing(&self.config.news);
        match imaging::create_thumbnail(self.backend, &source, &self.layout.path(&target), &config) {
            Ok(dims) => {
                log::debug!("thumbnail for {lead} ({}x{})", dims.width, dims.height);
                self.report.thumbnails.push(target.clone());
                Some(below_html_root(&target))
            }
            Err(e) => {
                log::warn!("{}: no thumbnail from {lead}: {e}", post.source);
                None
            }
        }
    }

    fn convert_listing(&mut self, path: &str) -> Result<(), GenerateError> {
        let text = fs::read_to_string(self.layout.path(path))?;
        let doc = SourceDocument::new(path, text, SourceKind::LightMarkup);
        let rendered = markup::convert_as(&doc, self.config, Engine::LightMarkup).map_err(|e| {
            GenerateError::Convert {
                path: path.to_string(),
                source: e,
            }
        })?;
        let output = self.layout.output_for(path, &self.config.html.page_extension);
        self.write_page(&doc, &output, &rendered, None)
    }

    fn write_page(
        &mut self,
        doc: &SourceDocument,
        output: &str,
        rendered: &markup::Rendered,
        news_date: Option<NaiveDate>,
    ) -> Result<(), GenerateError> {
        let ctx = PageContext {
            layout: self.layout,
            config: self.config,
            source: &doc.path,
            output,
            base_name: doc.base_name(),
            news_date,
        };
        let html = page::assemble(rendered, &ctx, self.plugins).map_err(|e| GenerateError::Page {
            path: doc.path.clone(),
            source: e,
        })?;
        let target = self.layout.path(output);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, html)?;
        log::info!("{} → {output}", doc.path);

        self.recorded.push(doc.path.clone());
        self.recorded.push(output.to_string());
        self.report.pages.push(BuiltPage {
            source: doc.path.clone(),
            output: output.to_string(),
            title: rendered.title.clone(),
            is_news: news_date.is_some(),
            engine: rendered.engine,
        });
        Ok(())
    }

    /// Record everything and rebuild the navigation script.
    fn finish(self, news_changed: bool) -> Result<BuildReport, GenerateError> {
        let Batch {
            layout,
            config,
            ledger,
            now,
            recorded,
            mut report,
            ..
        } = self;
        ledger.record_conversion(&recorded, now, config.news.filename_dates)?;

        let images = collect_files(&layout.path(&layout.news_images()), layout)?;
        report.assets = ledger.record_assets(&images, now)?;

        if news_changed && let Some(script) = news::nav::rebuild(layout, ledger, &config.news)? {
            ledger.record_conversion(std::slice::from_ref(&script), now, false)?;
            report.nav_script = Some(script);
        }
        Ok(report)
    }
}

/// Path relative to `public_html/`.
fn below_html_root(rel: &str) -> String {
    rel.strip_prefix(HTML_DIR)
        .map(|r| r.trim_start_matches('/'))
        .unwrap_or(rel)
        .to_string()
}

/// Site-relative paths of all files below `dir`, sorted.
fn collect_files(dir: &Path, layout: &SiteLayout) -> Result<Vec<String>, GenerateError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| GenerateError::Scan(ScanError::Walk(e)))?;
        if entry.file_type().is_file()
            && !entry.file_name().to_string_lossy().starts_with('.')
            && let Some(rel) = layout.relative(entry.path())
        {
            files.push(rel);
        }
    }
    Ok(files)
}

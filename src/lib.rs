//! # Quire
//!
//! A plain-text to HTML website generator. Pages are written in a light
//! plain-text markup and converted to HTML; a ledger remembers what was
//! converted and uploaded, so each run only touches what changed; posts in
//! `page_sources/news/` are gathered into a news listing with a blurb and
//! thumbnail each.
//!
//! # Architecture: Three-Stage Pipeline
//!
//! ```text
//! 1. Scan      page_sources/  →  ScanReport     (what is new or changed)
//! 2. Generate  ScanReport     →  public_html/   (pages, listing, nav script)
//! 3. Deploy    ledger         →  remote         (changed outputs only)
//! ```
//!
//! The ledger (`private/ledger.txt`) ties the stages together. Generate
//! records every source and output it writes; deploy flips output records
//! to uploaded once the transfer is confirmed.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: name checks, source discovery, new/changed/unchanged classification |
//! | [`generate`] | Stage 2: converts sources, maintains the news listing, records the ledger |
//! | [`deploy`] | Stage 3: uploads pending outputs through a [`deploy::Transfer`] |
//! | [`markup`] | The light markup engine, plus markdown and passthrough |
//! | [`page`] | Wraps converted bodies into pages: title, imports, plugins, link fixes |
//! | [`plugins`] | Named page plugins behind `@python: "name"` directives |
//! | [`news`] | News post descriptors, blurbs, the listing and the navigation script |
//! | [`ledger`] | Change tracking and upload state |
//! | [`config`] | `config/config.toml` loading and validation |
//! | [`types`] | Site layout and source types shared by all stages |
//! | [`naming`] | `YYYYMMDD-name` file name parsing for news dates and titles |
//! | [`imaging`] | Listing thumbnails, pure Rust |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Regex Passes Over Text
//!
//! The light markup engine rewrites text in ordered passes: normalize,
//! lex into line tokens, structure into sections, then render blocks with
//! maud. Inline styling runs per text fragment, never over finished HTML,
//! so attributes and code blocks are left alone.
//!
//! ## Size And Hash, Not Timestamps
//!
//! A source is stale when its size or SHA-256 differs from the ledger.
//! File times are unreliable across copies and checkouts; contents are not.
//! The only timestamp that matters is a news post's first recorded date,
//! which is its publication date.
//!
//! ## The Listing Is A Source
//!
//! `page_sources/news.txt` is an ordinary light markup page that the build
//! edits and then converts like any other. A site owner can reword or
//! reorder it by hand and the next build keeps those edits.

pub mod config;
pub mod deploy;
pub mod generate;
pub mod imaging;
pub mod ledger;
pub mod markup;
pub mod naming;
pub mod news;
pub mod output;
pub mod page;
pub mod plugins;
pub mod scan;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

//! Headless browser engine for the JavaScript-rendered match pages.
//!
//! The scraping engine never talks to Chromium directly: it goes through
//! the [`PageSource`] trait, which [`MatchPage`] implements on top of
//! chromiumoxide. One browser process serves the whole service; each
//! worker owns its own page.

#![warn(clippy::all)]

pub mod engine;
pub mod error;
pub mod page;

pub use engine::{BrowserEngine, MatchPage};
pub use error::{BrowserError, Result};
pub use page::PageSource;

//! Browser automation engine for JavaScript-heavy sites.
//!
//! Drives a single reusable page: navigation, element waits, file-input
//! filling, text extraction and scripted scrolling for lazy lists.

pub mod actions;
pub mod engine;
pub mod error;

pub use actions::{force_render, BrowserActions, ScrollTarget};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};

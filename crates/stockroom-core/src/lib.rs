//! Stockroom Core - Foundation crate for the Stockroom ingestion pipeline.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other Stockroom crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`DepositId`, `RemoteId`, `Stage`)
//!
//! # Example
//!
//! ```rust
//! use stockroom_core::{AppConfig, DepositId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.ingest.keyword_cap, 50);
//!
//! let id = DepositId::new("123456789")?;
//! assert_eq!(id.as_str(), "123456789");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserConfig, GalleryConfig, IngestConfig, SourceConfig};
pub use error::{ConfigError, ConfigResult, Result, StockroomError};
pub use types::{DepositId, RemoteId, Stage};

//! Stockroom Gallery - client for the remote gallery web service.
//!
//! The service exposes a single method-dispatch endpoint. Every response is a
//! JSON envelope whose `stat` field is `ok` (with a `result`) or `fail`
//! (with an error code and message).
//!
//! # Example
//!
//! ```rust,ignore
//! use stockroom_gallery::GalleryClient;
//!
//! let client = GalleryClient::new(&config.gallery, api_key)?;
//! let session = client.session_status().await?;
//! client.delete_images(&ids, &session.pwg_token).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod error;
mod response;

pub use client::{GalleryClient, ImageInfo, NewImage, SessionStatus};
pub use error::{GalleryError, Result};

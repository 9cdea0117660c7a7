//! Publishing enriched assets to the gallery.

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use stockroom_core::RemoteId;
use stockroom_gallery::{GalleryClient, NewImage};

/// Everything needed to create an asset in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub path: PathBuf,
    pub title: String,
    pub author: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Creates assets remotely and returns their new identifier.
#[async_trait]
pub trait AssetPublisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<RemoteId>;
}

/// Description stored alongside the image.
#[must_use]
pub fn compose_description(alt_text: &str, source_url: &str, author: &str, publisher: &str) -> String {
    format!(
        "\nAlt Text: {alt_text}\nSource URL: {source_url}\nPublisher: {publisher}\nAttribution: {author}/{publisher}\n"
    )
}

/// Publishes through `pwg.images.addSimple` into a fixed album.
#[derive(Debug, Clone)]
pub struct GalleryPublisher {
    client: GalleryClient,
    category: u32,
}

impl GalleryPublisher {
    #[must_use]
    pub fn new(client: GalleryClient, category: u32) -> Self {
        Self { client, category }
    }

    #[must_use]
    pub fn client(&self) -> &GalleryClient {
        &self.client
    }
}

#[async_trait]
impl AssetPublisher for GalleryPublisher {
    async fn publish(&self, request: &PublishRequest) -> Result<RemoteId> {
        let image = NewImage {
            path: request.path.clone(),
            category: self.category,
            name: request.title.clone(),
            author: request.author.clone(),
            comment: request.description.clone(),
            tags: request.tags.clone(),
        };
        let id = self.client.add_simple(&image).await?;
        tracing::debug!("Published {} as {}", request.path.display(), id);
        Ok(id)
    }
}

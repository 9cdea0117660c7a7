//! Gallery web service client.
//!
//! Every call is a single POST to one endpoint with the API method named in
//! the form body and the API key carried in a request header.

use crate::error::{GalleryError, Result};
use crate::response::{decode, remote_id, scalar_to_string};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stockroom_core::{GalleryConfig, RemoteId};

/// Session state reported by `pwg.session.getStatus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// User the API key belongs to
    pub username: String,
    /// Role of that user
    pub status: String,
    /// Token required by destructive methods
    pub pwg_token: String,
}

/// An image to create with `pwg.images.addSimple`.
#[derive(Debug, Clone)]
pub struct NewImage {
    /// Local file uploaded as the image payload
    pub path: PathBuf,
    /// Album to file the image under
    pub category: u32,
    /// Image title
    pub name: String,
    /// Author credit
    pub author: String,
    /// Free-text description
    pub comment: String,
    /// Tags, sent comma-joined
    pub tags: Vec<String>,
}

/// Subset of `pwg.images.getInfo` used by audits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    /// Gallery identifier
    pub id: RemoteId,
    /// Title
    pub name: Option<String>,
    /// Description
    pub comment: Option<String>,
    /// Author credit
    pub author: Option<String>,
    /// Stored file name
    pub file: Option<String>,
}

/// Stateless request/response wrapper around the gallery API.
#[derive(Debug, Clone)]
pub struct GalleryClient {
    client: Client,
    endpoint: String,
}

impl GalleryClient {
    /// Create a client for the configured endpoint.
    ///
    /// # Errors
    /// Returns error if the header name or key are not valid HTTP header text,
    /// or the HTTP client cannot be created.
    pub fn new(config: &GalleryConfig, api_key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(config.api_key_header.as_bytes())
            .map_err(|e| GalleryError::InvalidConfig(format!("api key header: {e}")))?;
        let mut header_value = HeaderValue::from_str(api_key)
            .map_err(|e| GalleryError::InvalidConfig(format!("api key: {e}")))?;
        header_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header_name, header_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GalleryError::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Invoke an API method with plain form parameters.
    pub async fn call(&self, method: &str, params: &[(&str, String)]) -> Result<Value> {
        let mut form: Vec<(&str, String)> = Vec::with_capacity(params.len() + 1);
        form.push(("method", method.to_string()));
        form.extend(params.iter().cloned());

        tracing::debug!("Gallery call {}", method);
        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode(method, status, &body)
    }

    async fn call_multipart(&self, method: &str, form: Form) -> Result<Value> {
        tracing::debug!("Gallery multipart call {}", method);
        let form = form.text("method", method.to_string());
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        decode(method, status, &body)
    }

    /// Fetch the session status, including the token destructive calls need.
    pub async fn session_status(&self) -> Result<SessionStatus> {
        let result = self.call("pwg.session.getStatus", &[]).await?;
        let field = |name: &str| result.get(name).map(scalar_to_string).unwrap_or_default();

        let status = SessionStatus {
            username: field("username"),
            status: field("status"),
            pwg_token: field("pwg_token"),
        };
        if status.pwg_token.is_empty() {
            return Err(GalleryError::InvalidResponse(
                "missing pwg_token in session status".to_string(),
            ));
        }
        Ok(status)
    }

    /// Create an image from a local file and return its gallery identifier.
    pub async fn add_simple(&self, image: &NewImage) -> Result<RemoteId> {
        let bytes = tokio::fs::read(&image.path).await?;
        let file_name = image
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(&image.path))
            .map_err(|e| GalleryError::InvalidConfig(format!("mime type: {e}")))?;

        let form = Form::new()
            .text("category", image.category.to_string())
            .text("name", image.name.clone())
            .text("author", image.author.clone())
            .text("comment", image.comment.clone())
            .text("tags", image.tags.join(","))
            .part("image", part);

        let result = self.call_multipart("pwg.images.addSimple", form).await?;
        remote_id(result.get("image_id"), "image_id")
    }

    /// Read title, description and author of one image.
    pub async fn image_info(&self, id: &RemoteId) -> Result<ImageInfo> {
        let result = self
            .call("pwg.images.getInfo", &[("image_id", id.to_string())])
            .await?;
        let text = |name: &str| {
            result
                .get(name)
                .filter(|v| !v.is_null())
                .map(scalar_to_string)
        };

        Ok(ImageInfo {
            id: remote_id(result.get("id"), "id")?,
            name: text("name"),
            comment: text("comment"),
            author: text("author"),
            file: text("file"),
        })
    }

    /// Delete images by identifier. Requires a token from [`Self::session_status`].
    pub async fn delete_images(&self, ids: &[RemoteId], pwg_token: &str) -> Result<()> {
        let joined = ids
            .iter()
            .map(RemoteId::as_str)
            .collect::<Vec<_>>()
            .join(";");

        self.call(
            "pwg.images.delete",
            &[("image_id", joined), ("pwg_token", pwg_token.to_string())],
        )
        .await?;
        Ok(())
    }
}

/// Content type for an upload, from its extension.
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif" | "tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image reference resolution
//!
//! Both pipeline stages receive an opaque [`ImageRef`] and resolve it through
//! an [`ImageFetcher`] into a decoded [`LoadedImage`].

use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::debug;

use super::image_utils::{decode_image_bytes, ImageError, LoadedImage, MAX_IMAGE_SIZE};

/// Default timeout for downloading a photo
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Opaque reference to the photo under analysis
#[derive(Clone, PartialEq)]
pub enum ImageRef {
    /// Remote photo, downloaded on demand
    Url(String),
    /// Photo bytes already in memory (e.g., a multipart upload)
    Bytes(bytes::Bytes),
}

impl ImageRef {
    pub fn url(url: impl Into<String>) -> Self {
        ImageRef::Url(url.into())
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Url(url) => f.debug_tuple("Url").field(url).finish(),
            ImageRef::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageRef::Url(url) => f.write_str(url),
            ImageRef::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

/// Resolves an [`ImageRef`] to decoded pixels
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, image: &ImageRef) -> Result<LoadedImage, ImageError>;
}

/// Fetcher that downloads URLs over HTTP(S)
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<bytes::Bytes, ImageError> {
        let parsed = validate_image_url(url)?;

        debug!("Downloading image from {}", parsed);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ImageError::FetchFailed(e.to_string()))?;

        let declared = response.content_length().map(|len| len as usize);
        if let Some(len) = declared {
            if len > MAX_IMAGE_SIZE {
                return Err(ImageError::TooLarge(len, MAX_IMAGE_SIZE));
            }
        }

        // Content-Length is optional (chunked bodies), so the cap is enforced
        // on the bytes actually received
        let mut body = BytesMut::with_capacity(declared.unwrap_or(0));
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ImageError::FetchFailed(e.to_string()))?;
            let received = body.len() + chunk.len();
            if received > MAX_IMAGE_SIZE {
                debug!("Aborting download from {}: body exceeds {} bytes", url, MAX_IMAGE_SIZE);
                return Err(ImageError::TooLarge(received, MAX_IMAGE_SIZE));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image: &ImageRef) -> Result<LoadedImage, ImageError> {
        let bytes = match image {
            ImageRef::Url(url) => self.download(url).await?,
            ImageRef::Bytes(bytes) => bytes.clone(),
        };
        decode_image_bytes(bytes)
    }
}

/// Accept only absolute http(s) URLs
pub fn validate_image_url(raw: &str) -> Result<url::Url, ImageError> {
    let parsed = url::Url::parse(raw).map_err(|e| ImageError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ImageError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

//! Two-step image download from the Mapillary Graph API
//!
//! Each fetch is a metadata-by-id lookup that resolves the thumbnail URL,
//! followed by an unauthenticated download of the image bytes. The two
//! requests are strictly sequential for a given id.

use std::time::Duration;

use image::DynamicImage;
use reqwest::Client;
use tracing::debug;

use crate::config::StreetScoutConfig;
use crate::error::{Result, StreetScoutError};
use crate::models::ImageRecord;

/// Thumbnail resolution variants exposed by the Graph API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageResolution {
    Thumb256,
    Thumb1024,
    Thumb2048,
    Original,
}

impl ImageResolution {
    /// Graph API field carrying the thumbnail URL for this resolution
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            ImageResolution::Thumb256 => "thumb_256_url",
            ImageResolution::Thumb1024 => "thumb_1024_url",
            ImageResolution::Thumb2048 => "thumb_2048_url",
            ImageResolution::Original => "thumb_original_url",
        }
    }

    /// Parse a configuration name like `original` or `1024`
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "256" | "thumb_256" => Some(Self::Thumb256),
            "1024" | "thumb_1024" => Some(Self::Thumb1024),
            "2048" | "thumb_2048" => Some(Self::Thumb2048),
            "original" | "thumb_original" => Some(Self::Original),
            _ => None,
        }
    }
}

/// Client downloading one image per identifier
pub struct ImageFetcher {
    client: Client,
    token: String,
    base_url: String,
    resolution: ImageResolution,
}

impl ImageFetcher {
    /// Create a new fetcher from configuration
    pub fn new(config: &StreetScoutConfig) -> Result<Self> {
        let token = config.api.require_token()?.to_string();

        let resolution = ImageResolution::from_name(&config.fetch.resolution).ok_or_else(|| {
            StreetScoutError::Config(format!(
                "Unknown image resolution '{}'",
                config.fetch.resolution
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds.into()))
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(|e| StreetScoutError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            base_url: config.api.base_url.clone(),
            resolution,
        })
    }

    /// Fetch metadata and image bytes for one identifier.
    ///
    /// The metadata lookup always completes before the byte download
    /// starts; a failure in either step fails the fetch.
    pub async fn fetch(&self, id: &str) -> Result<ImageRecord> {
        let details = self.fetch_details(id).await?;

        let image_url = details.thumb_url(self.resolution).ok_or_else(|| {
            StreetScoutError::Parse(format!(
                "Image {id} has no {} field",
                self.resolution.field_name()
            ))
        })?;

        let image = self.fetch_image(&image_url).await?;

        Ok(ImageRecord {
            id: details.id,
            url: image_url,
            image,
            captured_at_ms: details.captured_at,
            geometry: details.geometry,
        })
    }

    async fn fetch_details(&self, id: &str) -> Result<response::ImageDetails> {
        let url = format!(
            "{}/{}?fields=id,{},captured_at,geometry",
            self.base_url,
            id,
            self.resolution.field_name()
        );
        debug!("Image metadata request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("OAuth {}", self.token))
            .send()
            .await
            .map_err(|e| {
                StreetScoutError::Network(format!("Metadata request for image {id} failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => StreetScoutError::Authentication(
                    "Invalid or missing Mapillary access token".to_string(),
                ),
                429 => StreetScoutError::RateLimit(
                    "Mapillary API rate limit exceeded".to_string(),
                ),
                _ => StreetScoutError::Api(format!(
                    "Mapillary API error {status} for image {id}: {body}"
                )),
            });
        }

        response.json().await.map_err(|e| {
            StreetScoutError::Parse(format!("Failed to parse metadata for image {id}: {e}"))
        })
    }

    /// Download and decode the image bytes. Thumbnail URLs are pre-signed,
    /// so no auth header is sent.
    async fn fetch_image(&self, url: &str) -> Result<DynamicImage> {
        let response = self.client.get(url).send().await.map_err(|e| {
            StreetScoutError::Network(format!("Image download failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreetScoutError::Api(format!(
                "Image download failed with status {status}"
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            StreetScoutError::Network(format!("Failed to read image bytes: {e}"))
        })?;

        image::load_from_memory(&bytes)
            .map_err(|e| StreetScoutError::Decode(format!("Failed to decode image: {e}")))
    }
}

/// Graph API metadata-by-id response structures
mod response {
    use serde::Deserialize;

    use super::ImageResolution;
    use crate::models::Geometry;

    #[derive(Debug, Deserialize)]
    pub struct ImageDetails {
        pub id: String,
        pub thumb_256_url: Option<String>,
        pub thumb_1024_url: Option<String>,
        pub thumb_2048_url: Option<String>,
        pub thumb_original_url: Option<String>,
        pub captured_at: Option<i64>,
        pub geometry: Geometry,
    }

    impl ImageDetails {
        /// Thumbnail URL for the requested resolution, when present
        pub fn thumb_url(&self, resolution: ImageResolution) -> Option<String> {
            match resolution {
                ImageResolution::Thumb256 => self.thumb_256_url.clone(),
                ImageResolution::Thumb1024 => self.thumb_1024_url.clone(),
                ImageResolution::Thumb2048 => self.thumb_2048_url.clone(),
                ImageResolution::Original => self.thumb_original_url.clone(),
            }
        }
    }
}

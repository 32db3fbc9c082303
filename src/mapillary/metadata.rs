//! Identifier search against the Mapillary Graph API

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::StreetScoutConfig;
use crate::error::{Result, StreetScoutError};
use crate::models::BoundingBox;

/// Client for the Graph API image-search endpoint
pub struct MetadataClient {
    client: Client,
    token: String,
    base_url: String,
}

impl MetadataClient {
    /// Create a new client from configuration
    pub fn new(config: &StreetScoutConfig) -> Result<Self> {
        let token = config.api.require_token()?.to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds.into()))
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(|e| StreetScoutError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            base_url: config.api.base_url.clone(),
        })
    }

    /// Search for image ids inside a bounding box.
    ///
    /// Returns at most `maximum` ids when given. A response with zero hits
    /// or without a parseable id list yields an empty list, not an error.
    pub async fn search_ids(
        &self,
        region: &BoundingBox,
        maximum: Option<usize>,
    ) -> Result<Vec<String>> {
        let url = self.search_url(region);
        debug!("Image search request URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("OAuth {}", self.token))
            .send()
            .await
            .map_err(|e| {
                StreetScoutError::Network(format!("Image search request failed: {e}"))
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
                _ => StreetScoutError::Api(format!("Mapillary API error {status}: {body}")),
            });
        }

        let body = response.text().await.map_err(|e| {
            StreetScoutError::Network(format!("Failed to read image search response: {e}"))
        })?;

        let ids = parse_image_ids(&body, maximum);
        info!("Found {} image ids in bbox {}", ids.len(), region.to_query());
        Ok(ids)
    }

    fn search_url(&self, region: &BoundingBox) -> String {
        format!(
            "{}/images?fields=id&bbox={}",
            self.base_url,
            region.to_query()
        )
    }
}

/// Extract ids from a search response body, truncated to `maximum`.
///
/// Anything that does not parse as a search response counts as zero hits.
fn parse_image_ids(body: &str, maximum: Option<usize>) -> Vec<String> {
    let response: response::ImageSearchResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Unparseable image search response, treating as empty: {}", e);
            return Vec::new();
        }
    };

    let mut ids: Vec<String> = response.data.into_iter().map(|entry| entry.id).collect();
    if let Some(maximum) = maximum {
        ids.truncate(maximum);
    }
    ids
}

/// Graph API search response structures
mod response {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ImageSearchResponse {
        #[serde(default)]
        pub data: Vec<ImageEntry>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ImageEntry {
        pub id: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> MetadataClient {
        let mut config = StreetScoutConfig::default();
        config.api.token = Some("test-token".to_string());
        MetadataClient::new(&config).expect("client should build")
    }

    #[test]
    fn test_client_requires_token() {
        let config = StreetScoutConfig::default();
        assert!(matches!(
            MetadataClient::new(&config),
            Err(StreetScoutError::Config(_))
        ));
    }

    #[test]
    fn test_search_url_contains_bbox() {
        let client = test_client();
        let region = BoundingBox::from_edges(4.0, 51.0, 5.0, 52.0);
        assert_eq!(
            client.search_url(&region),
            "https://graph.mapillary.com/images?fields=id&bbox=4,51,5,52"
        );
    }

    #[test]
    fn test_parse_image_ids() {
        let body = r#"{"data":[{"id":"100"},{"id":"200"},{"id":"300"}]}"#;
        assert_eq!(parse_image_ids(body, None), vec!["100", "200", "300"]);
    }

    #[test]
    fn test_parse_image_ids_respects_maximum() {
        let body = r#"{"data":[{"id":"100"},{"id":"200"},{"id":"300"}]}"#;
        assert_eq!(parse_image_ids(body, Some(2)), vec!["100", "200"]);
        assert_eq!(parse_image_ids(body, Some(10)).len(), 3);
        assert!(parse_image_ids(body, Some(0)).is_empty());
    }

    #[test]
    fn test_zero_hits_is_empty_not_an_error() {
        assert!(parse_image_ids(r#"{"data":[]}"#, None).is_empty());
        assert!(parse_image_ids(r"{}", None).is_empty());
    }

    #[test]
    fn test_malformed_body_is_empty_not_an_error() {
        assert!(parse_image_ids("", None).is_empty());
        assert!(parse_image_ids("<html>502</html>", None).is_empty());
        assert!(parse_image_ids(r#"{"data":"oops"}"#, None).is_empty());
    }
}

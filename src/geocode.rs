//! Reverse geocoding of image positions into addresses
//!
//! Resolution goes through the `AddressResolver` trait so callers inject
//! the provider (or a test double) instead of reaching for process-wide
//! state. `NominatimResolver` is the bundled OpenStreetMap implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::StreetScoutConfig;
use crate::error::{Result, StreetScoutError};
use crate::models::Location;

/// Turns a location into a free-text address
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve a location to a human-readable address
    async fn reverse_geocode(&self, location: &Location) -> Result<String>;
}

/// OpenStreetMap Nominatim reverse-geocoding client
pub struct NominatimResolver {
    client: Client,
    base_url: String,
}

impl NominatimResolver {
    /// Create a resolver from configuration
    pub fn new(config: &StreetScoutConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.geocoding.timeout_seconds.into()))
            .user_agent(config.api.user_agent.clone())
            .build()
            .map_err(|e| StreetScoutError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.geocoding.base_url.clone(),
        })
    }
}

#[async_trait]
impl AddressResolver for NominatimResolver {
    async fn reverse_geocode(&self, location: &Location) -> Result<String> {
        let url = format!(
            "{}/reverse?format=jsonv2&lat={}&lon={}",
            self.base_url,
            location.latitude_degrees(),
            location.longitude_degrees()
        );
        debug!("Reverse geocoding request URL: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            StreetScoutError::Network(format!("Reverse geocoding request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreetScoutError::Api(format!("Nominatim error {status}")));
        }

        let parsed: response::ReverseGeocodeResponse = response.json().await.map_err(|e| {
            StreetScoutError::Parse(format!("Failed to parse reverse geocoding response: {e}"))
        })?;

        Ok(parsed.display_name)
    }
}

/// Nominatim response structures
mod response {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct ReverseGeocodeResponse {
        pub display_name: String,
    }
}

//! Pelias reverse geocoder client for self-hosted instances.
//!
//! Pelias exposes a `/v1/reverse` endpoint that returns a `GeoJSON`
//! `FeatureCollection` ordered by distance. Since the instance is
//! self-hosted there are no external rate limits; the caller controls
//! concurrency via `concurrent_requests` in the service TOML
//! configuration.
//!
//! See <https://github.com/pelias/documentation/blob/master/reverse.md>

use std::time::Duration;

use async_trait::async_trait;
use geo_profile_models::Coordinate;

use crate::{GeocodeError, ReverseGeocoder, build_client, classify};

/// Client for a Pelias instance.
#[derive(Debug, Clone)]
pub struct PeliasClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PeliasClient {
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: build_client(concat!("geo_profile/", env!("CARGO_PKG_VERSION")), timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl ReverseGeocoder for PeliasClient {
    fn name(&self) -> &str {
        "pelias"
    }

    async fn reverse(&self, at: Coordinate) -> Result<Option<String>, GeocodeError> {
        let url = format!("{}/v1/reverse", self.base_url);
        let lat = at.latitude.to_string();
        let lon = at.longitude.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("point.lat", lat.as_str()),
                ("point.lon", lon.as_str()),
                ("size", "1"),
            ])
            .send()
            .await
            .map_err(|e| classify(e, self.timeout))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(GeocodeError::Status(resp.status().as_u16()));
        }

        let body: serde_json::Value = resp.json().await.map_err(|e| classify(e, self.timeout))?;
        parse_response(&body)
    }
}

/// Parses a Pelias `GeoJSON` `FeatureCollection` response.
fn parse_response(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    let features = body
        .get("features")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Pelias response missing 'features' array".to_string(),
        })?;

    let Some(first) = features.first() else {
        return Ok(None);
    };

    let label = first
        .pointer("/properties/label")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Feature missing properties.label".to_string(),
        })?;

    Ok(Some(label.to_string()))
}

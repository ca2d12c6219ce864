//! Nominatim / OpenStreetMap reverse geocoder client.
//!
//! Nominatim has strict rate limits: **1 request per second** maximum on
//! the public instance, and every request must carry an identifying
//! `User-Agent`.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use std::time::Duration;

use async_trait::async_trait;
use geo_profile_models::Coordinate;

use crate::{GeocodeError, ReverseGeocoder, build_client, classify};

/// Client for the Nominatim `/reverse` endpoint.
///
/// The caller is responsible for rate limiting (see `rate_limit_ms` in
/// the service TOML configuration).
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl NominatimClient {
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: build_client(user_agent, timeout)?,
            base_url: base_url.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimClient {
    fn name(&self) -> &str {
        "nominatim"
    }

    async fn reverse(&self, at: Coordinate) -> Result<Option<String>, GeocodeError> {
        let lat = at.latitude.to_string();
        let lon = at.longitude.to_string();

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "jsonv2"),
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

/// Parses a Nominatim reverse response.
///
/// An `error` member (e.g. `"Unable to geocode"`) means no address.
fn parse_response(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    let object = body.as_object().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an object".to_string(),
    })?;

    if let Some(error) = object.get("error") {
        log::debug!("Nominatim: no address ({error})");
        return Ok(None);
    }

    let display_name = object
        .get("display_name")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing display_name in Nominatim response".to_string(),
        })?;

    Ok(Some(display_name.to_string()))
}

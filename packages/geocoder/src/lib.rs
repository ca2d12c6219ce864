#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse geocoding for density peaks.
//!
//! Turns peak coordinates into display addresses through an external
//! service configured via TOML files in `services/`:
//!
//! 1. **Nominatim / OpenStreetMap** (priority 1): public, one request per
//!    second, sequential dispatch.
//! 2. **Pelias** (priority 2, disabled by default): self-hosted, bounded
//!    concurrent requests.
//!
//! [`resolver::GeocodeResolver`] isolates failures per peak: a timeout or
//! HTTP error for one peak becomes an [`Address::Error`] entry and never
//! aborts the rest of the batch.
//!
//! [`Address::Error`]: geo_profile_models::Address::Error

pub mod nominatim;
pub mod pelias;
pub mod resolver;
pub mod service_registry;

use std::time::Duration;

use async_trait::async_trait;
use geo_profile_models::Coordinate;
use thiserror::Error;

pub use resolver::{GeocodeResolver, ResolverConfig};

/// Errors from a single reverse-geocoding request.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Non-success HTTP status other than 429.
    #[error("Service returned HTTP {0}")]
    Status(u16),

    /// No response within the request timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// A service that maps a coordinate to a display address.
///
/// `Ok(None)` means the service answered but knows no address there.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Short provider identifier used in log messages.
    fn name(&self) -> &str;

    /// Looks up the address closest to `at`.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] on network, status or parse failures.
    async fn reverse(&self, at: Coordinate) -> Result<Option<String>, GeocodeError>;
}

/// Builds the shared HTTP client for a provider.
///
/// # Errors
///
/// Returns [`GeocodeError::Http`] if the TLS backend cannot be initialized.
pub fn build_client(
    user_agent: &str,
    timeout: Duration,
) -> Result<reqwest::Client, GeocodeError> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?)
}

/// Maps a `reqwest` error, surfacing client-side timeouts as
/// [`GeocodeError::Timeout`].
fn classify(e: reqwest::Error, timeout: Duration) -> GeocodeError {
    if e.is_timeout() {
        GeocodeError::Timeout(timeout)
    } else {
        GeocodeError::Http(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nominatim::NominatimClient;

    /// Accepts connections on a loopback port and never answers.
    async fn silent_server() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}/reverse")
    }

    #[tokio::test]
    async fn client_timeout_is_reported_as_timeout() {
        let timeout = Duration::from_millis(50);
        let client = NominatimClient::new(&silent_server().await, "test", timeout).unwrap();

        let err = client
            .reverse(Coordinate::new(-23.55, -46.63))
            .await
            .unwrap_err();

        assert!(matches!(err, GeocodeError::Timeout(t) if t == timeout), "{err:?}");
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn refused_connection_is_an_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = NominatimClient::new(
            &format!("http://{addr}/reverse"),
            "test",
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client
            .reverse(Coordinate::new(-23.55, -46.63))
            .await
            .unwrap_err();

        assert!(matches!(err, GeocodeError::Http(_)), "{err:?}");
    }
}

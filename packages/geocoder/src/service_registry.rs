//! Compile-time registry of reverse-geocoding service configurations.
//!
//! Each provider is defined in a TOML file under `services/`. The
//! registry embeds these at compile time and exposes them via
//! [`all_services`], [`enabled_services`] and [`find_service`].

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::nominatim::NominatimClient;
use crate::pelias::PeliasClient;
use crate::{GeocodeError, ResolverConfig, ReverseGeocoder};

/// One reverse-geocoding provider as declared in `services/<id>.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    pub id: String,
    pub name: String,
    /// Disabled services can still be picked explicitly by id.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Lower sorts first in [`enabled_services`].
    pub priority: u32,
    pub provider: ProviderConfig,
}

/// Endpoint and dispatch settings, selected by the `type` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Public `OpenStreetMap` Nominatim, `/reverse` with `format=jsonv2`.
    Nominatim {
        base_url: String,
        /// Pause between consecutive lookups; the public instance allows one
        /// request per second.
        #[serde(default = "nominatim_pause_ms")]
        rate_limit_ms: u64,
        #[serde(default = "lookup_timeout_secs")]
        timeout_secs: u64,
        /// Sent verbatim; the usage policy rejects anonymous clients.
        user_agent: String,
    },
    /// Self-hosted Pelias, `/v1/reverse`.
    Pelias {
        base_url: String,
        /// Lookups in flight at once.
        #[serde(default = "pelias_in_flight")]
        concurrent_requests: usize,
        #[serde(default = "lookup_timeout_secs")]
        timeout_secs: u64,
    },
}

const fn enabled_by_default() -> bool {
    true
}

const fn nominatim_pause_ms() -> u64 {
    1000
}

const fn lookup_timeout_secs() -> u64 {
    10
}

const fn pelias_in_flight() -> usize {
    4
}

/// Runtime overrides applied on top of the embedded configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceOverrides {
    /// Replaces the configured endpoint.
    pub base_url: Option<String>,
    /// Replaces the configured `User-Agent` (Nominatim only).
    pub user_agent: Option<String>,
}

impl GeocodingService {
    /// Returns the provider's endpoint regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::Nominatim { base_url, .. } | ProviderConfig::Pelias { base_url, .. } => {
                base_url
            }
        }
    }

    /// Dispatch settings for [`crate::GeocodeResolver`].
    ///
    /// Nominatim is dispatched sequentially with its rate-limit delay;
    /// Pelias fans out with bounded concurrency and no delay.
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        match &self.provider {
            ProviderConfig::Nominatim {
                rate_limit_ms,
                timeout_secs,
                ..
            } => ResolverConfig {
                timeout: Duration::from_secs(*timeout_secs),
                rate_limit: Duration::from_millis(*rate_limit_ms),
                concurrency: 1,
            },
            ProviderConfig::Pelias {
                concurrent_requests,
                timeout_secs,
                ..
            } => ResolverConfig {
                timeout: Duration::from_secs(*timeout_secs),
                rate_limit: Duration::ZERO,
                concurrency: (*concurrent_requests).max(1),
            },
        }
    }

    /// Builds the client for this service.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn build_geocoder(
        &self,
        overrides: &ServiceOverrides,
    ) -> Result<Arc<dyn ReverseGeocoder>, GeocodeError> {
        let base_url = overrides.base_url.as_deref().unwrap_or_else(|| self.base_url());
        Ok(match &self.provider {
            ProviderConfig::Nominatim {
                timeout_secs,
                user_agent,
                ..
            } => Arc::new(NominatimClient::new(
                base_url,
                overrides.user_agent.as_deref().unwrap_or(user_agent),
                Duration::from_secs(*timeout_secs),
            )?),
            ProviderConfig::Pelias { timeout_secs, .. } => Arc::new(PeliasClient::new(
                base_url,
                Duration::from_secs(*timeout_secs),
            )?),
        })
    }
}

/// `(id, toml)` pairs baked into the binary.
const EMBEDDED: [(&str, &str); 2] = [
    ("nominatim", include_str!("../services/nominatim.toml")),
    ("pelias", include_str!("../services/pelias.toml")),
];

/// Every declared service in declaration order, enabled or not.
///
/// # Panics
///
/// If an embedded TOML file does not deserialize. The files are part of
/// the source tree, so this fails every test run rather than in the field.
#[must_use]
pub fn all_services() -> Vec<GeocodingService> {
    EMBEDDED
        .iter()
        .map(|(id, source)| {
            toml::de::from_str(source)
                .unwrap_or_else(|e| panic!("services/{id}.toml is invalid: {e}"))
        })
        .collect()
}

/// Enabled services, lowest `priority` first.
#[must_use]
pub fn enabled_services() -> Vec<GeocodingService> {
    let mut enabled: Vec<_> = all_services().into_iter().filter(|s| s.enabled).collect();
    enabled.sort_by_key(|s| s.priority);
    enabled
}

/// Looks up a service by id, enabled or not.
#[must_use]
pub fn find_service(id: &str) -> Option<GeocodingService> {
    all_services().into_iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_files_match_their_ids() {
        let services = all_services();
        assert_eq!(services.len(), EMBEDDED.len());
        for (svc, (id, _)) in services.iter().zip(EMBEDDED) {
            assert_eq!(svc.id, id);
            assert!(!svc.name.is_empty());
            assert!(svc.base_url().starts_with("http"), "{}", svc.base_url());
        }
    }

    #[test]
    fn only_nominatim_is_enabled_out_of_the_box() {
        let ids: Vec<String> = enabled_services().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["nominatim".to_string()]);
    }

    #[test]
    fn nominatim_is_sequential_with_ten_second_timeout() {
        let config = find_service("nominatim").unwrap().resolver_config();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.rate_limit, Duration::from_millis(1000));
    }

    #[test]
    fn pelias_fans_out_without_delay() {
        let config = find_service("pelias").unwrap().resolver_config();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.rate_limit, Duration::ZERO);
    }

    #[test]
    fn omitted_settings_take_defaults() {
        let svc: GeocodingService = toml::de::from_str(
            r#"
            id = "osm-mirror"
            name = "Mirror"
            priority = 3

            [provider]
            type = "nominatim"
            base_url = "http://mirror.local/reverse"
            user_agent = "test"
            "#,
        )
        .unwrap();
        assert!(svc.enabled);
        assert_eq!(svc.resolver_config(), ResolverConfig::default());
    }

    #[test]
    fn builds_clients_for_every_service() {
        let overrides = ServiceOverrides {
            base_url: Some("http://127.0.0.1:9".to_string()),
            user_agent: None,
        };
        for svc in &all_services() {
            let geocoder = svc.build_geocoder(&overrides).unwrap();
            assert_eq!(geocoder.name(), svc.id);
        }
    }

    #[test]
    fn unknown_service_is_none() {
        assert!(find_service("census").is_none());
    }
}

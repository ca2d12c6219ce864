//! Result of resolving one peak to a street address.

use serde::{Deserialize, Serialize};

/// Outcome of a reverse-geocoding attempt for a single peak.
///
/// Addresses are index-aligned with the peak list they were resolved
/// from. A failed lookup never aborts the batch; it is recorded here
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Address {
    /// The service returned a display-ready address.
    Found(String),
    /// The service answered but had no address for the coordinate.
    NotFound,
    /// The lookup failed (timeout, network, HTTP status, bad response).
    Error(String),
    /// No geocoder was configured for this run.
    Skipped,
}

impl Address {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The resolved address text, if any.
    #[must_use]
    pub fn as_found(&self) -> Option<&str> {
        match self {
            Self::Found(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(s) => f.write_str(s),
            Self::NotFound => f.write_str("Address not found"),
            Self::Error(reason) => write!(f, "Geocoding error: {reason}"),
            Self::Skipped => f.write_str("Geocoding disabled"),
        }
    }
}

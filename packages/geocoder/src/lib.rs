#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding adapter for the property snapshot lookup.
//!
//! Converts a free-text street address into a latitude/longitude pair and
//! an accuracy classification. Providers implement the [`Geocoder`] trait;
//! the only production provider is the Google Maps Geocoding API
//! ([`google`]), configured via the TOML files in `services/` and loaded
//! through the [`service_registry`].
//!
//! [`geocode_address`] wraps a provider call into a [`GeocodeResult`] that
//! never fails: provider errors become a displayable accuracy string with
//! no coordinates.

pub mod google;
pub mod service_registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// How precisely the provider located the address.
///
/// Mirrors the Google `location_type` values.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    /// Precise street address.
    Rooftop,
    /// Interpolated between two precise points (e.g., intersections).
    RangeInterpolated,
    /// Geometric center of a result such as a polyline or region.
    GeometricCenter,
    /// Approximate location.
    Approximate,
}

/// A geocoding result with coordinates and metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Location precision as reported by the provider (e.g., `ROOFTOP`).
    pub location_type: Option<String>,
    /// County name (`administrative_area_level_2`), if present.
    pub county: Option<String>,
    /// The canonical address returned by the geocoder.
    pub formatted_address: Option<String>,
}

/// Accuracy classification of a [`GeocodeResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeAccuracy {
    /// The address was located with the given precision.
    Located(LocationType),
    /// The address was located with a precision value this crate does not
    /// know; carries the provider's value verbatim.
    Other(String),
    /// The address was located but the provider reported no precision.
    Unclassified,
    /// The provider returned no results.
    NoResult,
    /// The provider call failed; carries the error description.
    Failed(String),
}

impl std::fmt::Display for GeocodeAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Located(location_type) => write!(f, "{location_type}"),
            Self::Other(raw) => f.write_str(raw),
            Self::Unclassified => f.write_str("UNKNOWN"),
            Self::NoResult => f.write_str("NO RESULT"),
            Self::Failed(message) => write!(f, "Geocoder raised Exception: {message}"),
        }
    }
}

/// Outcome of geocoding one address query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    /// Accuracy classification.
    pub accuracy: GeocodeAccuracy,
    /// Latitude, absent when nothing was located.
    pub latitude: Option<f64>,
    /// Longitude, absent when nothing was located.
    pub longitude: Option<f64>,
    /// County name, when the provider reported one.
    pub county: Option<String>,
    /// Canonical address, when the provider reported one.
    pub formatted_address: Option<String>,
}

impl GeocodeResult {
    /// A result with no coordinates.
    #[must_use]
    pub const fn unlocated(accuracy: GeocodeAccuracy) -> Self {
        Self {
            accuracy,
            latitude: None,
            longitude: None,
            county: None,
            formatted_address: None,
        }
    }

    /// Returns `(lat, lon)` when both coordinates are present.
    #[must_use]
    pub const fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// Returns `true` if the provider call failed.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.accuracy, GeocodeAccuracy::Failed(_))
    }
}

impl From<Option<&str>> for GeocodeAccuracy {
    fn from(location_type: Option<&str>) -> Self {
        match location_type {
            None => Self::Unclassified,
            Some(raw) => raw
                .parse()
                .map_or_else(|_| Self::Other(raw.to_string()), Self::Located),
        }
    }
}

impl From<GeocodedAddress> for GeocodeResult {
    fn from(addr: GeocodedAddress) -> Self {
        Self {
            accuracy: addr.location_type.as_deref().into(),
            latitude: Some(addr.latitude),
            longitude: Some(addr.longitude),
            county: addr.county,
            formatted_address: addr.formatted_address,
        }
    }
}

/// Errors from geocoding operations.
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

    /// Query quota exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The provider rejected the request.
    #[error("{status}: {}", .message.as_deref().unwrap_or("no error message"))]
    Api {
        /// Provider status code (e.g., `REQUEST_DENIED`).
        status: String,
        /// Provider error message, if any.
        message: Option<String>,
    },
}

/// A geocoding provider.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Returns a unique identifier for this provider (e.g., `"google"`).
    fn id(&self) -> &str;

    /// Geocodes a free-text address, returning the best match.
    ///
    /// Returns `Ok(None)` when the provider has no result for the address.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the provider
    /// rejects it.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// Geocodes `address`, folding every outcome into a [`GeocodeResult`].
///
/// An empty provider result becomes [`GeocodeAccuracy::NoResult`]; a
/// provider error becomes [`GeocodeAccuracy::Failed`]. Neither carries
/// coordinates.
pub async fn geocode_address(geocoder: &dyn Geocoder, address: &str) -> GeocodeResult {
    match geocoder.geocode(address).await {
        Ok(Some(found)) => found.into(),
        Ok(None) => GeocodeResult::unlocated(GeocodeAccuracy::NoResult),
        Err(e) => {
            log::warn!("Geocoder '{}' failed for {address:?}: {e}", geocoder.id());
            GeocodeResult::unlocated(GeocodeAccuracy::Failed(e.to_string()))
        }
    }
}

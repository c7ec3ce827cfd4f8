//! Google Maps Geocoding API client.
//!
//! Sends the free-text address to the JSON endpoint and keeps only the
//! first result. Requires an API key; the quota is billed per request, so
//! callers are expected to memoize results.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use std::time::Duration;

use async_trait::async_trait;

use crate::service_registry::{GeocodingService, ProviderConfig};
use crate::{GeocodeError, GeocodedAddress, Geocoder, LocationType};

/// Address component type holding the county name.
const COUNTY_COMPONENT: &str = "administrative_area_level_2";

/// Geocoder backed by the Google Maps Geocoding API.
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: reqwest::Client,
    base_url: String,
    region: Option<String>,
    api_key: String,
}

impl GoogleGeocoder {
    /// Builds a client from a registered service definition.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the HTTP client cannot be built.
    pub fn from_service(
        service: &GeocodingService,
        api_key: impl Into<String>,
    ) -> Result<Self, GeocodeError> {
        let ProviderConfig::Google {
            base_url,
            region,
            timeout_secs,
        } = &service.provider;

        let client = reqwest::Client::builder()
            .user_agent("property-snapshot/0.1")
            .timeout(Duration::from_secs(*timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.clone(),
            region: region.clone(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    fn id(&self) -> &str {
        "google"
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        geocode_single(
            &self.client,
            &self.base_url,
            &self.api_key,
            self.region.as_deref(),
            address,
        )
        .await
    }
}

/// Geocodes a single free-text address.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request fails, the response cannot
/// be parsed, or the API reports an error status.
pub async fn geocode_single(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    region: Option<&str>,
    address: &str,
) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let mut req = client
        .get(base_url)
        .query(&[("address", address), ("key", api_key)]);

    if let Some(region) = region {
        req = req.query(&[("region", region)]);
    }

    let resp = req.send().await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body)
}

/// Parses the Geocoding API JSON response.
///
/// `ZERO_RESULTS` is an empty result, not an error. Every other non-`OK`
/// status is reported as [`GeocodeError::Api`].
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let status = body["status"].as_str().ok_or_else(|| GeocodeError::Parse {
        message: "Missing status in geocoding response".to_string(),
    })?;

    match status {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(GeocodeError::RateLimited),
        other => {
            return Err(GeocodeError::Api {
                status: other.to_string(),
                message: body["error_message"].as_str().map(String::from),
            });
        }
    }

    let Some(first) = body["results"].as_array().and_then(|r| r.first()) else {
        return Ok(None);
    };

    let geometry = &first["geometry"];
    let lat = geometry["location"]["lat"]
        .as_f64()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in geocoding response".to_string(),
        })?;
    let lng = geometry["location"]["lng"]
        .as_f64()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lng in geocoding response".to_string(),
        })?;

    let location_type = geometry["location_type"].as_str().map(String::from);
    if let Some(raw) = location_type
        .as_deref()
        .filter(|raw| raw.parse::<LocationType>().is_err())
    {
        log::warn!("Unrecognized location_type {raw:?} in geocoding response");
    }

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lng,
        location_type,
        county: extract_county(&first["address_components"]),
        formatted_address: first["formatted_address"].as_str().map(String::from),
    }))
}

/// Returns the `long_name` of the first county-level address component.
fn extract_county(components: &serde_json::Value) -> Option<String> {
    components.as_array()?.iter().find_map(|c| {
        let is_county = c["types"]
            .as_array()
            .is_some_and(|types| types.iter().any(|t| t.as_str() == Some(COUNTY_COMPONENT)));
        if is_county {
            c["long_name"].as_str().map(String::from)
        } else {
            None
        }
    })
}

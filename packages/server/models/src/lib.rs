#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the property snapshot server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the database row types to allow independent evolution of the API
//! contract.

use chrono::NaiveDate;
use property_snapshot_database_models::{DateRange, EvictionCase, PropertyRecord};
use serde::{Deserialize, Serialize};

/// A `property_snapshot` row as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPropertyRecord {
    /// Appraisal district property identifier.
    pub property_id: String,
    /// Assessor parcel identifier.
    pub parcel_id: Option<String>,
    /// Site address.
    pub parcel_address: Option<String>,
    /// Owner name.
    pub owner_name: Option<String>,
    /// Owner mailing address.
    pub owner_address: Option<String>,
    /// "Doing business as" name.
    pub dba_name: Option<String>,
    /// CARES Act covered-property flag.
    pub cares_act: Option<String>,
    /// CARES Act dataset identifier.
    pub cares_act_id: Option<String>,
    /// National Housing Preservation Database flag.
    pub nhpd: Option<String>,
    /// National Housing Preservation Database identifier.
    pub nhpd_id: Option<String>,
    /// Housing choice voucher indicator.
    pub housing_choice_vouchers: Option<String>,
}

impl From<PropertyRecord> for ApiPropertyRecord {
    fn from(row: PropertyRecord) -> Self {
        Self {
            property_id: row.property_id,
            parcel_id: row.parcel_id,
            parcel_address: row.parcel_address,
            owner_name: row.owner_name,
            owner_address: row.owner_address,
            dba_name: row.dba_name,
            cares_act: row.cares_act,
            cares_act_id: row.cares_act_id,
            nhpd: row.nhpd,
            nhpd_id: row.nhpd_id,
            housing_choice_vouchers: row.housing_choice_vouchers,
        }
    }
}

/// An eviction case as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvictionCase {
    /// Court case number.
    pub case_number: String,
    /// Filing date (`YYYY-MM-DD`).
    pub date_filed: NaiveDate,
    /// Property the case is linked to.
    pub property_id: String,
}

impl From<EvictionCase> for ApiEvictionCase {
    fn from(case: EvictionCase) -> Self {
        Self {
            case_number: case.case_number,
            date_filed: case.date_filed,
            property_id: case.property_id,
        }
    }
}

/// Geocoder output for the queried address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGeocode {
    /// Accuracy label (`ROOFTOP`, `NO RESULT`, ...).
    pub accuracy: String,
    /// Latitude, if located.
    pub latitude: Option<f64>,
    /// Longitude, if located.
    pub longitude: Option<f64>,
    /// County name, if reported.
    pub county: Option<String>,
    /// Canonical address, if reported.
    pub formatted_address: Option<String>,
}

/// Snapshot data for one matched property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProperty {
    /// Matched property identifier.
    pub property_id: String,
    /// Snapshot rows; empty when there is no data for this property.
    pub records: Vec<ApiPropertyRecord>,
    /// Properties sharing an owner address with this one.
    pub related: Vec<ApiPropertyRecord>,
}

/// Inclusive eviction filing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDateRange {
    /// First date included.
    pub from: NaiveDate,
    /// Last date included.
    pub to: NaiveDate,
}

impl From<DateRange> for ApiDateRange {
    fn from(range: DateRange) -> Self {
        Self {
            from: range.start,
            to: range.end,
        }
    }
}

/// Response from the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLookupReport {
    /// The address as queried.
    pub address: String,
    /// `empty_address`, `not_geocoded`, `no_parcel` or `found`.
    pub outcome: String,
    /// Geocoder output, absent for a blank address.
    pub geocode: Option<ApiGeocode>,
    /// `true` when the point fell within more than one parcel.
    pub ambiguous: bool,
    /// Matched properties in ascending id order.
    pub properties: Vec<ApiProperty>,
    /// Eviction filing window applied.
    pub eviction_range: ApiDateRange,
    /// Evictions at the matched properties.
    pub evictions: Vec<ApiEvictionCase>,
    /// Distinct ids of related-owner properties.
    pub related_property_ids: Vec<String>,
    /// Evictions at related-owner properties.
    pub related_evictions: Vec<ApiEvictionCase>,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Parcel resolver in use (`memory` or `database`).
    pub resolver: String,
}

/// Query parameters for the lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQueryParams {
    /// Free-text street address.
    pub address: Option<String>,
    /// Start of the eviction window (`YYYY-MM-DD`).
    pub from: Option<NaiveDate>,
    /// End of the eviction window (`YYYY-MM-DD`).
    pub to: Option<NaiveDate>,
}

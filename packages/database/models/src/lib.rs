#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types and query parameter definitions.
//!
//! These types represent the shapes of data as retrieved from the
//! `property_snapshot` store and the evictions store. They are distinct
//! from the API response types in `property_snapshot_server_models`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Earliest filing date covered by the evictions dataset.
///
/// Used as the default lower bound of an eviction [`DateRange`].
pub const EVICTIONS_COVERAGE_START: (i32, u32, u32) = (2014, 1, 1);

/// A property row from the `property_snapshot` table.
///
/// Every attribute other than the property identifier is optional; the
/// snapshot is assembled from several assessor and subsidy datasets and
/// any of them may be missing for a given parcel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Appraisal district property identifier.
    pub property_id: String,
    /// Assessor parcel identifier, when distinct from the property id.
    pub parcel_id: Option<String>,
    /// Site address of the parcel.
    pub parcel_address: Option<String>,
    /// Owner name (`owner_sep_2022`).
    pub owner_name: Option<String>,
    /// Owner mailing address.
    pub owner_address: Option<String>,
    /// "Doing business as" name (`dba_sep_2022`).
    pub dba_name: Option<String>,
    /// CARES Act covered-property flag (`cares_act_july_2022`).
    pub cares_act: Option<String>,
    /// CARES Act dataset identifier.
    pub cares_act_id: Option<String>,
    /// National Housing Preservation Database flag (`nhpd_july_2022`).
    pub nhpd: Option<String>,
    /// National Housing Preservation Database identifier.
    pub nhpd_id: Option<String>,
    /// Housing choice voucher indicator.
    pub housing_choice_vouchers: Option<String>,
}

/// An eviction case linked to a property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EvictionCase {
    /// Date the case was filed.
    pub date_filed: NaiveDate,
    /// Court case number.
    pub case_number: String,
    /// Property the case was spatially joined to.
    pub property_id: String,
}

/// [`EVICTIONS_COVERAGE_START`] as a date.
#[must_use]
pub fn evictions_coverage_start() -> NaiveDate {
    let (y, m, d) = EVICTIONS_COVERAGE_START;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

/// An inclusive range of filing dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateRange {
    /// First date included.
    pub start: NaiveDate,
    /// Last date included.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new inclusive date range.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Returns `true` if `date` falls within the range (both ends
    /// inclusive).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let range = DateRange::new(date(2014, 1, 1), date(2014, 12, 31));
        assert!(range.contains(date(2014, 1, 1)));
        assert!(range.contains(date(2014, 3, 15)));
        assert!(range.contains(date(2014, 12, 31)));
        assert!(!range.contains(date(2013, 1, 2)));
        assert!(!range.contains(date(2015, 1, 1)));
    }

    #[test]
    fn coverage_starts_in_2014() {
        assert_eq!(evictions_coverage_start(), date(2014, 1, 1));
    }
}

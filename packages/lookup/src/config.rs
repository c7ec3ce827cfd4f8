//! Process configuration.
//!
//! Read once at startup from the environment and passed by reference to
//! whatever needs it; nothing below this module reads environment
//! variables.

use std::path::PathBuf;

use chrono::NaiveDate;
use property_snapshot_database::paths;
use property_snapshot_database_models::evictions_coverage_start;
use property_snapshot_spatial::load::ParcelColumns;
use strum_macros::{AsRefStr, Display, EnumString};

/// Default download location of the county parcel export.
pub const DEFAULT_PARCELS_URL: &str =
    "https://drive.google.com/uc?id=1ifjaYmsKYha_vr2DxsDN58swHU7lF_k9&confirm=t";

/// Default geocoding service id (see the geocoder's service registry).
pub const DEFAULT_GEOCODER_SERVICE: &str = "google";

/// How coordinates are resolved to parcels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResolverStrategy {
    /// Point-in-polygon against the parcel dataset loaded into memory.
    Memory,
    /// `ST_Covers` query against the snapshot database.
    Database,
}

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing required environment variable {name}")]
    Missing {
        /// Variable name.
        name: &'static str,
    },

    /// A variable is set to an unusable value.
    #[error("Invalid value {value:?} for {name}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Configuration for a [`crate::SnapshotService`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Geocoding API key (`GMAPS_API_KEY`).
    pub gmaps_api_key: String,
    /// Geocoding service id (`GEOCODER_SERVICE`, default `google`).
    pub geocoder_service: String,
    /// Snapshot store URL (`SNAPSHOT_DATABASE_URL`).
    pub snapshot_database_url: String,
    /// Evictions store URL (`EVICTIONS_DATABASE_URL`).
    pub evictions_database_url: String,
    /// Parcel resolution strategy (`PARCEL_RESOLVER`, default `memory`).
    pub resolver: ResolverStrategy,
    /// Where to download the parcel dataset from (`PARCELS_URL`).
    pub parcels_url: Option<String>,
    /// Local path of the parcel dataset (`PARCELS_PATH`).
    pub parcels_path: PathBuf,
    /// Source column names in the parcel dataset (`PARCELS_PARCEL_ID_COLUMN`,
    /// `PARCELS_PROPERTY_ID_COLUMN`, `PARCELS_GEOMETRY_COLUMN`).
    pub parcel_columns: ParcelColumns,
    /// Default lower bound of the eviction window
    /// (`EVICTIONS_START_DATE`, `YYYY-MM-DD`, default 2014-01-01).
    pub evictions_start: NaiveDate,
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `get`, which maps a variable name to
    /// its value. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a
    /// value cannot be parsed.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing { name });

        let resolver = match get("PARCEL_RESOLVER") {
            None => ResolverStrategy::Memory,
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid {
                    name: "PARCEL_RESOLVER",
                    value,
                })?,
        };

        let parcels_path = get("PARCELS_PATH").map_or_else(paths::parcels_cache_path, PathBuf::from);

        // An explicit local path means the file is provided out of band; only
        // fall back to the public export when using the default cache path.
        let parcels_url = get("PARCELS_URL").or_else(|| {
            get("PARCELS_PATH")
                .is_none()
                .then(|| DEFAULT_PARCELS_URL.to_string())
        });

        let defaults = ParcelColumns::default();
        let parcel_columns = ParcelColumns {
            parcel_id: get("PARCELS_PARCEL_ID_COLUMN").unwrap_or(defaults.parcel_id),
            property_id: get("PARCELS_PROPERTY_ID_COLUMN").unwrap_or(defaults.property_id),
            geometry: get("PARCELS_GEOMETRY_COLUMN").unwrap_or(defaults.geometry),
        };

        let evictions_start = match get("EVICTIONS_START_DATE") {
            Some(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                ConfigError::Invalid {
                    name: "EVICTIONS_START_DATE",
                    value,
                }
            })?,
            None => evictions_coverage_start(),
        };

        Ok(Self {
            gmaps_api_key: require("GMAPS_API_KEY")?,
            geocoder_service: get("GEOCODER_SERVICE")
                .unwrap_or_else(|| DEFAULT_GEOCODER_SERVICE.to_string()),
            snapshot_database_url: require("SNAPSHOT_DATABASE_URL")?,
            evictions_database_url: require("EVICTIONS_DATABASE_URL")?,
            resolver,
            parcels_url,
            parcels_path,
            parcel_columns,
            evictions_start,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("GMAPS_API_KEY", "key"),
        ("SNAPSHOT_DATABASE_URL", "postgres://u:p@localhost/snapshot"),
        ("EVICTIONS_DATABASE_URL", "postgres://u:p@localhost/evictions"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = config(REQUIRED).unwrap();
        assert_eq!(cfg.resolver, ResolverStrategy::Memory);
        assert_eq!(cfg.geocoder_service, "google");
        assert_eq!(cfg.parcels_url.as_deref(), Some(DEFAULT_PARCELS_URL));
        assert_eq!(cfg.parcels_path, paths::parcels_cache_path());
        assert_eq!(cfg.parcel_columns, ParcelColumns::default());
        assert_eq!(
            cfg.evictions_start,
            NaiveDate::from_ymd_opt(2014, 1, 1).unwrap()
        );
    }

    #[test]
    fn parses_evictions_start_date() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("EVICTIONS_START_DATE", "2018-06-01"));
        assert_eq!(
            config(&vars).unwrap().evictions_start,
            NaiveDate::from_ymd_opt(2018, 6, 1).unwrap()
        );

        let mut vars = REQUIRED.to_vec();
        vars.push(("EVICTIONS_START_DATE", "06/01/2018"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Invalid {
                name: "EVICTIONS_START_DATE",
                ..
            })
        ));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let err = config(&REQUIRED[1..]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                name: "GMAPS_API_KEY"
            }
        ));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut vars = REQUIRED.to_vec();
        vars[2] = ("EVICTIONS_DATABASE_URL", "  ");
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Missing {
                name: "EVICTIONS_DATABASE_URL"
            })
        ));
    }

    #[test]
    fn parses_resolver_strategy() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PARCEL_RESOLVER", "Database"));
        assert_eq!(config(&vars).unwrap().resolver, ResolverStrategy::Database);

        let mut vars = REQUIRED.to_vec();
        vars.push(("PARCEL_RESOLVER", "quadtree"));
        assert!(matches!(
            config(&vars),
            Err(ConfigError::Invalid {
                name: "PARCEL_RESOLVER",
                ..
            })
        ));
    }

    #[test]
    fn local_parcels_path_disables_default_download() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("PARCELS_PATH", "/srv/parcels.geojson"));
        vars.push(("PARCELS_PROPERTY_ID_COLUMN", "prop_id"));
        let cfg = config(&vars).unwrap();
        assert_eq!(cfg.parcels_path, PathBuf::from("/srv/parcels.geojson"));
        assert_eq!(cfg.parcels_url, None);
        assert_eq!(cfg.parcel_columns.property_id, "prop_id");
        assert_eq!(cfg.parcel_columns.parcel_id, "PID_10");
    }
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address lookup pipeline.
//!
//! Turns a free-text street address into a [`LookupReport`]:
//!
//! 1. geocode the address to coordinates and an accuracy class,
//! 2. resolve the coordinates to covering parcel(s),
//! 3. fetch each matched property's snapshot rows,
//! 4. find other properties sharing an owner address,
//! 5. fetch eviction cases for matched and related properties.
//!
//! Each stage short-circuits with a distinct [`LookupOutcome`] and every
//! stage is memoized for the life of the [`SnapshotService`].

pub mod config;
pub mod memo;
pub mod resolver;
pub mod store;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use property_snapshot_database::{DbError, db};
use property_snapshot_database_models::{
    DateRange, EvictionCase, PropertyRecord, evictions_coverage_start,
};
use property_snapshot_geocoder::google::GoogleGeocoder;
use property_snapshot_geocoder::{
    GeocodeError, GeocodeResult, Geocoder, geocode_address, service_registry,
};
use property_snapshot_spatial::{SpatialError, download, load};
use strum_macros::{AsRefStr, Display};
use switchy_database::Database;

use crate::config::{Config, ConfigError, ResolverStrategy};
use crate::memo::Memo;
use crate::resolver::{CachedResolver, DatabaseResolver, InMemoryResolver, ParcelResolver};
use crate::store::SnapshotStore;

/// Errors that abort a lookup or prevent the service from starting.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// A store query or connection failed.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The parcel dataset could not be obtained or loaded.
    #[error(transparent)]
    Spatial(#[from] SpatialError),

    /// The geocoder could not be constructed.
    #[error(transparent)]
    Geocoder(#[from] GeocodeError),

    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A blocking load task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// How far a lookup got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LookupOutcome {
    /// The address was blank; nothing was called.
    EmptyAddress,
    /// The geocoder produced no coordinates.
    NotGeocoded,
    /// No parcel covers the geocoded point.
    NoParcel,
    /// At least one parcel matched.
    Found,
}

/// Snapshot data for one matched property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySnapshot {
    /// Matched property identifier.
    pub property_id: String,
    /// Snapshot rows for this property; empty when the snapshot has no
    /// data for it.
    pub records: Vec<PropertyRecord>,
    /// Other properties sharing an owner address with any of `records`.
    pub related: Vec<PropertyRecord>,
}

impl PropertySnapshot {
    /// Distinct owner addresses across this property's rows, in order of
    /// first appearance.
    #[must_use]
    pub fn owner_addresses(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.records
            .iter()
            .filter_map(|r| r.owner_address.as_deref())
            .filter(|a| !a.trim().is_empty())
            .filter(|a| seen.insert(*a))
            .collect()
    }
}

/// Everything a presentation layer needs to render one lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupReport {
    /// The address as queried (trimmed).
    pub address: String,
    /// Eviction filing window applied.
    pub range: DateRange,
    /// How far the pipeline got.
    pub outcome: LookupOutcome,
    /// Geocoder output; `None` only for [`LookupOutcome::EmptyAddress`].
    pub geocode: Option<GeocodeResult>,
    /// One entry per matched property id, ascending.
    pub properties: Vec<PropertySnapshot>,
    /// Eviction cases filed against the matched properties.
    pub evictions: Vec<EvictionCase>,
    /// Eviction cases filed against related-owner properties.
    pub related_evictions: Vec<EvictionCase>,
}

impl LookupReport {
    const fn empty(address: String, range: DateRange, outcome: LookupOutcome) -> Self {
        Self {
            address,
            range,
            outcome,
            geocode: None,
            properties: Vec::new(),
            evictions: Vec::new(),
            related_evictions: Vec::new(),
        }
    }

    /// Matched property identifiers.
    #[must_use]
    pub fn property_ids(&self) -> Vec<&str> {
        self.properties
            .iter()
            .map(|p| p.property_id.as_str())
            .collect()
    }

    /// `true` when the point fell within more than one parcel.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.properties.len() > 1
    }

    /// Distinct related-owner property ids, excluding matched ids.
    #[must_use]
    pub fn related_property_ids(&self) -> Vec<String> {
        let matched: BTreeSet<&str> = self.property_ids().into_iter().collect();
        self.properties
            .iter()
            .flat_map(|p| p.related.iter())
            .map(|r| r.property_id.as_str())
            .filter(|id| !matched.contains(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(String::from)
            .collect()
    }
}

/// Memoizes geocoder calls by exact address text.
///
/// Every outcome is cached, including provider failures, and entries never
/// expire.
pub struct CachedGeocoder {
    inner: Box<dyn Geocoder>,
    cache: Memo<String, GeocodeResult>,
}

impl CachedGeocoder {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn Geocoder>) -> Self {
        Self {
            inner,
            cache: Memo::new(),
        }
    }

    /// Geocodes `address` through the cache.
    pub async fn geocode(&self, address: &str) -> GeocodeResult {
        if let Some(hit) = self.cache.get(address) {
            log::debug!("Geocode cache hit for {address:?}");
            return hit;
        }

        let result = geocode_address(self.inner.as_ref(), address).await;
        self.cache.insert(address.to_string(), result)
    }
}

/// The lookup pipeline with its collaborators and caches.
///
/// Constructed once per process and shared across requests.
pub struct SnapshotService {
    geocoder: CachedGeocoder,
    resolver: CachedResolver,
    store: SnapshotStore,
    evictions_start: NaiveDate,
}

impl SnapshotService {
    /// Assembles a service from already-built collaborators.
    #[must_use]
    pub fn new(
        geocoder: Box<dyn Geocoder>,
        resolver: Box<dyn ParcelResolver>,
        snapshot_db: Arc<dyn Database>,
        evictions_db: Arc<dyn Database>,
    ) -> Self {
        Self {
            geocoder: CachedGeocoder::new(geocoder),
            resolver: CachedResolver::new(resolver),
            store: SnapshotStore::new(snapshot_db, evictions_db),
            evictions_start: evictions_coverage_start(),
        }
    }

    /// Overrides the default lower bound of the eviction window.
    #[must_use]
    pub fn with_evictions_start(mut self, start: NaiveDate) -> Self {
        self.evictions_start = start;
        self
    }

    /// The eviction window used when a lookup names none: the configured
    /// start date through today.
    #[must_use]
    pub fn default_range(&self) -> DateRange {
        DateRange::new(self.evictions_start, chrono::Local::now().date_naive())
    }

    /// Builds an eviction window from optional bounds, filling missing ends
    /// from [`Self::default_range`]. Returns `None` when `from` is after
    /// `to`.
    #[must_use]
    pub fn range_between(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Option<DateRange> {
        let default = self.default_range();
        let range = DateRange::new(from.unwrap_or(default.start), to.unwrap_or(default.end));
        (range.start <= range.end).then_some(range)
    }

    /// Name of the parcel resolver in use.
    #[must_use]
    pub fn resolver_name(&self) -> &str {
        self.resolver.name()
    }

    /// Connects both stores, builds the geocoder and the configured
    /// parcel resolver.
    ///
    /// With [`ResolverStrategy::Memory`] the parcel dataset is downloaded
    /// if not cached locally and loaded into an in-memory index before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if a store cannot be reached, the geocoding
    /// service is unknown, or the parcel dataset cannot be loaded.
    pub async fn from_config(config: &Config) -> Result<Self, LookupError> {
        let service = service_registry::find_service(&config.geocoder_service).ok_or_else(|| {
            ConfigError::Invalid {
                name: "GEOCODER_SERVICE",
                value: config.geocoder_service.clone(),
            }
        })?;
        let geocoder = GoogleGeocoder::from_service(&service, config.gmaps_api_key.clone())?;

        log::info!("Connecting to snapshot database...");
        let snapshot_db: Arc<dyn Database> =
            Arc::from(db::connect(&config.snapshot_database_url).await?);

        log::info!("Connecting to evictions database...");
        let evictions_db: Arc<dyn Database> =
            Arc::from(db::connect(&config.evictions_database_url).await?);

        let resolver: Box<dyn ParcelResolver> = match config.resolver {
            ResolverStrategy::Memory => {
                let path =
                    download::ensure_local(config.parcels_url.as_deref(), &config.parcels_path)
                        .await?;
                let columns = config.parcel_columns.clone();
                let index =
                    tokio::task::spawn_blocking(move || load::load_index(&path, &columns))
                        .await??;
                Box::new(InMemoryResolver::new(Arc::new(index)))
            }
            ResolverStrategy::Database => Box::new(DatabaseResolver::new(Arc::clone(&snapshot_db))),
        };

        log::info!("Using {} parcel resolver", config.resolver);

        Ok(Self::new(
            Box::new(geocoder),
            resolver,
            snapshot_db,
            evictions_db,
        )
        .with_evictions_start(config.evictions_start))
    }

    /// Runs the lookup pipeline for `address`.
    ///
    /// `range` bounds eviction filing dates (inclusive) and defaults to
    /// the configured start date through today.
    ///
    /// Geocoder failures are reported through the outcome, not as errors.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if a store query fails.
    pub async fn lookup(
        &self,
        address: &str,
        range: Option<DateRange>,
    ) -> Result<LookupReport, LookupError> {
        let range = range.unwrap_or_else(|| self.default_range());
        let address = address.trim();

        if address.is_empty() {
            return Ok(LookupReport::empty(
                String::new(),
                range,
                LookupOutcome::EmptyAddress,
            ));
        }

        let geocode = self.geocoder.geocode(address).await;
        log::info!("Geocoded {address:?}: {}", geocode.accuracy);

        let Some((lat, lon)) = geocode.coordinates() else {
            let mut report =
                LookupReport::empty(address.to_string(), range, LookupOutcome::NotGeocoded);
            report.geocode = Some(geocode);
            return Ok(report);
        };

        let mut report = LookupReport::empty(address.to_string(), range, LookupOutcome::NoParcel);
        report.geocode = Some(geocode);

        let Some(property_ids) = self.resolver.resolve(lat, lon).await? else {
            log::info!("No parcel covers ({lat}, {lon})");
            return Ok(report);
        };

        if property_ids.len() > 1 {
            log::info!(
                "({lat}, {lon}) falls within {} parcels: {}",
                property_ids.len(),
                property_ids.join(", ")
            );
        }

        report.outcome = LookupOutcome::Found;
        for property_id in &property_ids {
            report.properties.push(self.snapshot(property_id).await?);
        }

        report.evictions = self.store.get_evictions(&property_ids, range).await?;

        let related_ids = report.related_property_ids();
        report.related_evictions = self.store.get_evictions(&related_ids, range).await?;

        Ok(report)
    }

    async fn snapshot(&self, property_id: &str) -> Result<PropertySnapshot, LookupError> {
        let records = self.store.get_property(property_id).await?;
        if records.is_empty() {
            log::info!("No snapshot data for property {property_id}");
        }

        let mut snapshot = PropertySnapshot {
            property_id: property_id.to_string(),
            records,
            related: Vec::new(),
        };

        let owner_addresses: Vec<String> = snapshot
            .owner_addresses()
            .into_iter()
            .map(String::from)
            .collect();

        for owner_address in owner_addresses {
            for record in self
                .store
                .find_by_owner_address(&owner_address, property_id)
                .await?
            {
                if !snapshot.related.contains(&record) {
                    snapshot.related.push(record);
                }
            }
        }

        Ok(snapshot)
    }
}

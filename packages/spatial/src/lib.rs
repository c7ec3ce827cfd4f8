#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index for parcel resolution.
//!
//! Loads county-assessor parcel polygons once per process, builds an
//! R-tree over their bounding boxes, and answers "which parcels cover this
//! point" queries. Parcels may overlap, and a point on a shared edge lies
//! in both neighbours, so lookups return every covering parcel rather than
//! picking one.

pub mod download;
pub mod load;

use geo::{BoundingRect, Intersects, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};

/// Errors from loading or downloading the parcel dataset.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// `DuckDB` error while reading a `GeoParquet` file.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error reading a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Download of the remote dataset failed.
    #[error("Download error: {0}")]
    Download(#[from] download::DownloadError),

    /// The dataset could not be parsed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// Neither a local file nor a download URL is available.
    #[error("Parcel dataset not found at {path} and no download URL configured")]
    MissingSource {
        /// Local path that was checked.
        path: String,
    },
}

/// A parcel polygon with its identifiers, ready to be indexed.
#[derive(Debug, Clone)]
pub struct Parcel {
    /// Assessor parcel identifier.
    pub parcel_id: String,
    /// Appraisal district property identifier.
    pub property_id: String,
    /// Parcel footprint (WGS84).
    pub polygon: MultiPolygon<f64>,
}

/// Identifiers of a parcel that covers a queried point.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParcelMatch {
    /// Appraisal district property identifier.
    pub property_id: String,
    /// Assessor parcel identifier.
    pub parcel_id: String,
}

/// A parcel polygon stored in the R-tree.
struct ParcelEntry {
    parcel_id: String,
    property_id: String,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for ParcelEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over the parcel dataset.
///
/// Constructed once and shared across requests.
pub struct ParcelIndex {
    parcels: RTree<ParcelEntry>,
}

impl ParcelIndex {
    /// Builds the index from parcel polygons.
    #[must_use]
    pub fn new(parcels: impl IntoIterator<Item = Parcel>) -> Self {
        let entries: Vec<ParcelEntry> = parcels
            .into_iter()
            .map(|p| ParcelEntry {
                envelope: compute_envelope(&p.polygon),
                parcel_id: p.parcel_id,
                property_id: p.property_id,
                polygon: p.polygon,
            })
            .collect();

        Self {
            parcels: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed parcels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parcels.size()
    }

    /// Returns `true` if no parcels are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parcels.size() == 0
    }

    /// Returns every parcel whose polygon covers the point (interior or
    /// boundary), sorted by property id then parcel id.
    #[must_use]
    pub fn lookup(&self, lng: f64, lat: f64) -> Vec<ParcelMatch> {
        let point = geo::Point::new(lng, lat);
        let query_env = AABB::from_point([lng, lat]);

        let mut matches: Vec<ParcelMatch> = self
            .parcels
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.intersects(&point))
            .map(|entry| ParcelMatch {
                property_id: entry.property_id.clone(),
                parcel_id: entry.parcel_id.clone(),
            })
            .collect();

        matches.sort();
        matches
    }

    /// Returns the distinct property identifiers covering the point.
    #[must_use]
    pub fn property_ids_at(&self, lng: f64, lat: f64) -> Vec<String> {
        let mut ids: Vec<String> = self
            .lookup(lng, lat)
            .into_iter()
            .map(|m| m.property_id)
            .collect();
        ids.dedup();
        ids
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

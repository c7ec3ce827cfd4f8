//! Coordinate-to-parcel resolution.
//!
//! A point resolves to the identifiers of every parcel that covers it. A
//! point on a boundary shared by two parcels lies in both, and overlapping
//! parcels (condo overlays) are all returned; callers treat more than one
//! identifier as an ambiguous match rather than picking one.

use std::sync::Arc;

use async_trait::async_trait;
use property_snapshot_database::queries;
use property_snapshot_spatial::ParcelIndex;
use switchy_database::Database;

use crate::LookupError;
use crate::memo::Memo;

/// Resolves a coordinate to covering parcel identifiers.
#[async_trait]
pub trait ParcelResolver: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Returns the property identifiers of every parcel covering
    /// (`lat`, `lon`), in ascending order, or `None` when no parcel does.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the backing store fails.
    async fn resolve(&self, lat: f64, lon: f64) -> Result<Option<Vec<String>>, LookupError>;
}

/// An empty match means no parcel covers the point.
fn covering(ids: Vec<String>) -> Option<Vec<String>> {
    (!ids.is_empty()).then_some(ids)
}

/// Resolves against the parcel dataset held in memory.
pub struct InMemoryResolver {
    index: Arc<ParcelIndex>,
}

impl InMemoryResolver {
    /// Wraps a loaded parcel index.
    #[must_use]
    pub const fn new(index: Arc<ParcelIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl ParcelResolver for InMemoryResolver {
    fn name(&self) -> &str {
        "memory"
    }

    async fn resolve(&self, lat: f64, lon: f64) -> Result<Option<Vec<String>>, LookupError> {
        Ok(covering(self.index.property_ids_at(lon, lat)))
    }
}

/// Resolves with a spatial query against the snapshot store.
pub struct DatabaseResolver {
    db: Arc<dyn Database>,
}

impl DatabaseResolver {
    /// Uses `db`, which must hold `property_snapshot` with a geometry
    /// column.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ParcelResolver for DatabaseResolver {
    fn name(&self) -> &str {
        "database"
    }

    async fn resolve(&self, lat: f64, lon: f64) -> Result<Option<Vec<String>>, LookupError> {
        let ids = queries::find_property_ids_covering(self.db.as_ref(), lon, lat).await?;
        Ok(covering(ids))
    }
}

/// Memoizes another resolver by exact coordinate.
pub struct CachedResolver {
    inner: Box<dyn ParcelResolver>,
    cache: Memo<(u64, u64), Option<Vec<String>>>,
}

impl CachedResolver {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Box<dyn ParcelResolver>) -> Self {
        Self {
            inner,
            cache: Memo::new(),
        }
    }

    /// Name of the wrapped resolver.
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Resolves through the cache. Coordinates are keyed by their exact
    /// bit patterns.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if the wrapped resolver fails; failures are
    /// not cached.
    pub async fn resolve(&self, lat: f64, lon: f64) -> Result<Option<Vec<String>>, LookupError> {
        self.cache
            .get_or_try_insert_with((lat.to_bits(), lon.to_bits()), || {
                log::debug!("Resolving ({lat}, {lon}) with {} resolver", self.inner.name());
                self.inner.resolve(lat, lon)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geo::{LineString, MultiPolygon, Polygon};
    use property_snapshot_spatial::Parcel;

    use super::*;

    fn square(pid: &str, x0: f64, y0: f64, x1: f64, y1: f64) -> Parcel {
        Parcel {
            parcel_id: format!("P{pid}"),
            property_id: pid.to_string(),
            polygon: MultiPolygon(vec![Polygon::new(
                LineString::from(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)]),
                vec![],
            )]),
        }
    }

    fn resolver() -> InMemoryResolver {
        InMemoryResolver::new(Arc::new(ParcelIndex::new(vec![
            square("100", -97.75, 30.26, -97.74, 30.27),
            square("200", -97.74, 30.26, -97.73, 30.27),
        ])))
    }

    struct Counting {
        inner: InMemoryResolver,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ParcelResolver for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn resolve(&self, lat: f64, lon: f64) -> Result<Option<Vec<String>>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resolve(lat, lon).await
        }
    }

    #[test]
    fn no_covering_ids_is_none() {
        assert_eq!(covering(Vec::new()), None);
        assert_eq!(
            covering(vec!["100".to_string(), "200".to_string()]),
            Some(vec!["100".to_string(), "200".to_string()])
        );
    }

    #[tokio::test]
    async fn interior_point_resolves_to_one_parcel() {
        let ids = resolver().resolve(30.265, -97.745).await.unwrap();
        assert_eq!(ids, Some(vec!["100".to_string()]));
    }

    #[tokio::test]
    async fn shared_edge_resolves_to_both_parcels() {
        let ids = resolver().resolve(30.265, -97.74).await.unwrap();
        assert_eq!(ids, Some(vec!["100".to_string(), "200".to_string()]));
    }

    #[tokio::test]
    async fn point_outside_dataset_is_none() {
        // Washington, DC
        let ids = resolver().resolve(38.8977, -77.0365).await.unwrap();
        assert_eq!(ids, None);
    }

    #[tokio::test]
    async fn cached_resolver_queries_once_per_coordinate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cached = CachedResolver::new(Box::new(Counting {
            inner: resolver(),
            calls: calls.clone(),
        }));

        for _ in 0..3 {
            let ids = cached.resolve(30.265, -97.745).await.unwrap();
            assert_eq!(ids, Some(vec!["100".to_string()]));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(cached.resolve(38.8977, -77.0365).await.unwrap(), None);
        assert_eq!(cached.resolve(38.8977, -77.0365).await.unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cached.name(), "counting");
    }
}

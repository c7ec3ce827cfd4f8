//! Memoized access to the snapshot and evictions stores.

use std::sync::Arc;

use property_snapshot_database::{DbError, queries};
use property_snapshot_database_models::{DateRange, EvictionCase, PropertyRecord};
use switchy_database::Database;

use crate::memo::Memo;

/// Read-only handles to both stores plus per-query caches.
pub struct SnapshotStore {
    snapshot_db: Arc<dyn Database>,
    evictions_db: Arc<dyn Database>,
    properties: Memo<String, Vec<PropertyRecord>>,
    owners: Memo<(String, String), Vec<PropertyRecord>>,
    evictions: Memo<(Vec<String>, DateRange), Vec<EvictionCase>>,
}

impl SnapshotStore {
    /// Wraps already-connected store handles.
    #[must_use]
    pub fn new(snapshot_db: Arc<dyn Database>, evictions_db: Arc<dyn Database>) -> Self {
        Self {
            snapshot_db,
            evictions_db,
            properties: Memo::new(),
            owners: Memo::new(),
            evictions: Memo::new(),
        }
    }

    /// Snapshot rows for `property_id`; empty when the snapshot has no
    /// data for it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_property(&self, property_id: &str) -> Result<Vec<PropertyRecord>, DbError> {
        self.properties
            .get_or_try_insert_with(property_id.to_string(), || {
                queries::get_property(self.snapshot_db.as_ref(), property_id)
            })
            .await
    }

    /// Other properties whose owner address equals `owner_address`
    /// exactly.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn find_by_owner_address(
        &self,
        owner_address: &str,
        exclude_property_id: &str,
    ) -> Result<Vec<PropertyRecord>, DbError> {
        self.owners
            .get_or_try_insert_with(
                (owner_address.to_string(), exclude_property_id.to_string()),
                || {
                    queries::find_by_owner_address(
                        self.snapshot_db.as_ref(),
                        owner_address,
                        exclude_property_id,
                    )
                },
            )
            .await
    }

    /// Eviction cases for any of `property_ids` filed within `range`.
    ///
    /// The cache key is the sorted, de-duplicated id set, so argument
    /// order does not matter.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails.
    pub async fn get_evictions(
        &self,
        property_ids: &[String],
        range: DateRange,
    ) -> Result<Vec<EvictionCase>, DbError> {
        let mut ids = property_ids.to_vec();
        ids.sort();
        ids.dedup();

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let key = (ids.clone(), range);
        self.evictions
            .get_or_try_insert_with(key, || async move {
                queries::get_evictions(self.evictions_db.as_ref(), &ids, &range).await
            })
            .await
    }
}

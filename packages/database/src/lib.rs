#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database connections and queries for the property snapshot.
//!
//! Two `PostgreSQL` stores back the lookup: the *snapshot* store holding
//! the `property_snapshot` table (with a `PostGIS` geometry column) and
//! the *evictions* store holding `spatial_joined_data` and
//! `case_detail`. Both are read-only from this crate's perspective.
//!
//! All queries go through `switchy_database` with bound parameters via
//! `query_raw_params()`.

pub mod db;
pub mod paths;
pub mod queries;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Database query error.
    #[error("Database error: {0}")]
    Database(#[from] switchy_database::DatabaseError),

    /// Connection could not be established.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of what went wrong.
        message: String,
    },

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

//! Parcel dataset readers.
//!
//! Two on-disk formats are supported:
//!
//! - **`GeoParquet`** (`.parquet`), read through an in-memory `DuckDB`
//!   connection with the `spatial` extension, which converts the geometry
//!   column to `GeoJSON` text.
//! - **`GeoJSON`** (`.geojson` / `.json`), a `FeatureCollection` whose
//!   features carry the identifier columns as properties.
//!
//! Source column names are configurable; the assessor export uses
//! `PID_10` for the parcel id and `PROP_ID` for the property id.

use std::path::Path;

use geo::MultiPolygon;
use geojson::GeoJson;

use crate::{Parcel, ParcelIndex, SpatialError};

/// Names of the source columns holding parcel identifiers and geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelColumns {
    /// Column renamed to `parcel_id`.
    pub parcel_id: String,
    /// Column renamed to `property_id`.
    pub property_id: String,
    /// Geometry column (`GeoParquet` only).
    pub geometry: String,
}

impl Default for ParcelColumns {
    fn default() -> Self {
        Self {
            parcel_id: "PID_10".to_string(),
            property_id: "PROP_ID".to_string(),
            geometry: "geometry".to_string(),
        }
    }
}

/// Loads the parcel dataset at `path`, choosing the reader by file
/// extension, and builds the spatial index.
///
/// # Errors
///
/// Returns [`SpatialError`] if the file cannot be read or parsed.
pub fn load_index(path: &Path, columns: &ParcelColumns) -> Result<ParcelIndex, SpatialError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parcels = match extension.as_deref() {
        Some("geojson" | "json") => {
            let text = std::fs::read_to_string(path)?;
            parse_geojson_parcels(&text, columns)?
        }
        _ => read_geoparquet(path, columns)?,
    };

    log::info!(
        "Loaded {} parcels from {} into spatial index",
        parcels.len(),
        path.display()
    );

    Ok(ParcelIndex::new(parcels))
}

/// Reads parcels from a `GeoParquet` file via `DuckDB`.
///
/// # Errors
///
/// Returns [`SpatialError`] if `DuckDB` fails to read the file.
pub fn read_geoparquet(path: &Path, columns: &ParcelColumns) -> Result<Vec<Parcel>, SpatialError> {
    let conn = duckdb::Connection::open_in_memory()?;
    conn.execute_batch("INSTALL spatial; LOAD spatial;")?;

    let query = format!(
        "SELECT CAST({pid} AS VARCHAR), CAST({prop} AS VARCHAR), \
         CAST(ST_AsGeoJSON({geom}) AS VARCHAR) \
         FROM read_parquet({file})",
        pid = quote_ident(&columns.parcel_id),
        prop = quote_ident(&columns.property_id),
        geom = quote_ident(&columns.geometry),
        file = quote_literal(&path.to_string_lossy()),
    );

    let mut stmt = conn.prepare(&query)?;
    let mut rows = stmt.query([])?;
    let mut parcels = Vec::new();

    while let Some(row) = rows.next()? {
        let parcel_id: Option<String> = row.get(0)?;
        let property_id: Option<String> = row.get(1)?;
        let geojson_str: Option<String> = row.get(2)?;

        let (Some(parcel_id), Some(property_id), Some(geojson_str)) =
            (parcel_id, property_id, geojson_str)
        else {
            continue;
        };

        let Some(polygon) = parse_geojson_to_multipolygon(&geojson_str) else {
            log::warn!("Failed to parse geometry for parcel {parcel_id}");
            continue;
        };

        parcels.push(Parcel {
            parcel_id,
            property_id,
            polygon,
        });
    }

    Ok(parcels)
}

/// Parses parcels from a `GeoJSON` `FeatureCollection`.
///
/// Features without a polygonal geometry or without a property id are
/// skipped. Identifier properties may be strings or numbers.
///
/// # Errors
///
/// Returns [`SpatialError::Parse`] if the text is not a
/// `FeatureCollection`.
pub fn parse_geojson_parcels(
    text: &str,
    columns: &ParcelColumns,
) -> Result<Vec<Parcel>, SpatialError> {
    let geojson: GeoJson = text.parse().map_err(|e| SpatialError::Parse {
        message: format!("Invalid GeoJSON: {e}"),
    })?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(SpatialError::Parse {
            message: "Parcel GeoJSON must be a FeatureCollection".to_string(),
        });
    };

    let mut parcels = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let Some(property_id) = feature
            .property(&columns.property_id)
            .and_then(json_to_id)
        else {
            continue;
        };
        let parcel_id = feature
            .property(&columns.parcel_id)
            .and_then(json_to_id)
            .unwrap_or_default();

        let Some(polygon) = feature.geometry.and_then(geometry_to_multipolygon) else {
            log::warn!("Skipping parcel {property_id}: missing or non-polygon geometry");
            continue;
        };

        parcels.push(Parcel {
            parcel_id,
            property_id,
            polygon,
        });
    }

    Ok(parcels)
}

/// Renders an identifier property as a string.
fn json_to_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a `GeoJSON` geometry string into a [`MultiPolygon`].
fn parse_geojson_to_multipolygon(geojson_str: &str) -> Option<MultiPolygon<f64>> {
    let geojson: GeoJson = geojson_str.parse().ok()?;
    if let GeoJson::Geometry(geom) = geojson {
        geometry_to_multipolygon(geom)
    } else {
        None
    }
}

/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn geometry_to_multipolygon(geom: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geom.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

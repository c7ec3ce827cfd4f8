//! Query functions for the snapshot and evictions stores.
//!
//! Every user-supplied value (property ids, owner addresses, coordinates)
//! is passed as a bound parameter. Identifier columns are cast to text so
//! the same queries work whether the stores keep ids as integers or
//! strings.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use moosicbox_json_utils::database::ToValue as _;
use property_snapshot_database_models::{DateRange, EvictionCase, PropertyRecord};
use switchy_database::{Database, DatabaseValue, Row};

use crate::DbError;

/// Textual format of `case_detail.date_filed`.
pub const DATE_FILED_FORMAT: &str = "%m/%d/%Y";

/// Column list shared by every `property_snapshot` query.
const PROPERTY_COLUMNS: &str = "CAST(property_id AS TEXT) AS property_id,
    CAST(parcel_id AS TEXT) AS parcel_id,
    CAST(parcel_address AS TEXT) AS parcel_address,
    CAST(owner_sep_2022 AS TEXT) AS owner_sep_2022,
    CAST(owner_address AS TEXT) AS owner_address,
    CAST(dba_sep_2022 AS TEXT) AS dba_sep_2022,
    CAST(cares_act_july_2022 AS TEXT) AS cares_act_july_2022,
    CAST(cares_act_id AS TEXT) AS cares_act_id,
    CAST(nhpd_july_2022 AS TEXT) AS nhpd_july_2022,
    CAST(nhpd_id AS TEXT) AS nhpd_id,
    CAST(housing_choice_vouchers AS TEXT) AS housing_choice_vouchers";

/// Fetches the snapshot rows for a property identifier.
///
/// Returns every matching row; rows sharing an id are not merged. An
/// empty result means the snapshot has no data for this property.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_property(
    db: &dyn Database,
    property_id: &str,
) -> Result<Vec<PropertyRecord>, DbError> {
    let sql = format!(
        "SELECT {PROPERTY_COLUMNS}
         FROM property_snapshot
         WHERE CAST(property_id AS TEXT) = $1"
    );

    let rows = db
        .query_raw_params(&sql, &[DatabaseValue::String(property_id.to_string())])
        .await?;

    rows.iter().map(property_from_row).collect()
}

/// Fetches every property whose owner address is byte-identical to
/// `owner_address`, excluding `exclude_property_id`.
///
/// No normalization is applied: case, whitespace and abbreviation
/// differences produce no match.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_by_owner_address(
    db: &dyn Database,
    owner_address: &str,
    exclude_property_id: &str,
) -> Result<Vec<PropertyRecord>, DbError> {
    let sql = format!(
        "SELECT {PROPERTY_COLUMNS}
         FROM property_snapshot
         WHERE owner_address = $1
           AND CAST(property_id AS TEXT) <> $2
         ORDER BY CAST(property_id AS TEXT)"
    );

    let rows = db
        .query_raw_params(
            &sql,
            &[
                DatabaseValue::String(owner_address.to_string()),
                DatabaseValue::String(exclude_property_id.to_string()),
            ],
        )
        .await?;

    rows.iter().map(property_from_row).collect()
}

/// Finds the property identifiers whose parcel geometry covers a point.
///
/// `ST_Covers` includes the polygon boundary, so a point on an edge shared
/// by two parcels returns both.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn find_property_ids_covering(
    db: &dyn Database,
    lon: f64,
    lat: f64,
) -> Result<Vec<String>, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT DISTINCT CAST(property_id AS TEXT) AS property_id
             FROM property_snapshot
             WHERE ST_Covers(geometry, ST_SetSRID(ST_MakePoint($1, $2), 4326))
             ORDER BY 1",
            &[DatabaseValue::Real64(lon), DatabaseValue::Real64(lat)],
        )
        .await?;

    property_ids_from_rows(&rows)
}

/// Reads the text `property_id` column of each row, keeping row order.
///
/// # Errors
///
/// Returns [`DbError::Conversion`] if a row has no text `property_id`.
pub fn property_ids_from_rows(rows: &[Row]) -> Result<Vec<String>, DbError> {
    rows.iter()
        .map(|row| {
            row.to_value("property_id").map_err(|e| DbError::Conversion {
                message: format!("Failed to parse property_id: {e}"),
            })
        })
        .collect()
}

/// Fetches the eviction cases filed against any of `property_ids` within
/// `range` (inclusive).
///
/// Filing dates are stored as `MM/DD/YYYY` text, so the date filter runs
/// here after parsing rather than in SQL. Rows whose date cannot be parsed
/// are skipped. Results are ordered by filing date, then case number.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn get_evictions(
    db: &dyn Database,
    property_ids: &[String],
    range: &DateRange,
) -> Result<Vec<EvictionCase>, DbError> {
    if property_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders: String = (1..=property_ids.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "SELECT CAST(s.case_number AS TEXT) AS case_number,
                CAST(s.property_id AS TEXT) AS property_id,
                CAST(c.date_filed AS TEXT) AS date_filed
         FROM spatial_joined_data s
         JOIN case_detail c ON c.case_number = s.case_number
         WHERE CAST(s.property_id AS TEXT) IN ({placeholders})"
    );

    let params: Vec<DatabaseValue> = property_ids
        .iter()
        .map(|id| DatabaseValue::String(id.clone()))
        .collect();

    let rows = db.query_raw_params(&sql, &params).await?;

    let mut cases = BTreeSet::new();
    for row in &rows {
        let case_number: String = row.to_value("case_number").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse case_number: {e}"),
        })?;
        let property_id: String = row.to_value("property_id").map_err(|e| DbError::Conversion {
            message: format!("Failed to parse property_id: {e}"),
        })?;
        let date_filed: Option<String> = row.to_value("date_filed").unwrap_or(None);

        let Some(date_filed) = date_filed.as_deref().and_then(parse_date_filed) else {
            log::warn!("Skipping eviction case {case_number}: unparseable date_filed {date_filed:?}");
            continue;
        };

        if range.contains(date_filed) {
            cases.insert(EvictionCase {
                date_filed,
                case_number,
                property_id,
            });
        }
    }

    Ok(cases.into_iter().collect())
}

/// Parses a `MM/DD/YYYY` filing date.
#[must_use]
pub fn parse_date_filed(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FILED_FORMAT).ok()
}

fn property_from_row(row: &Row) -> Result<PropertyRecord, DbError> {
    let property_id: String = row.to_value("property_id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse property_id: {e}"),
    })?;

    Ok(PropertyRecord {
        property_id,
        parcel_id: row.to_value("parcel_id").unwrap_or(None),
        parcel_address: row.to_value("parcel_address").unwrap_or(None),
        owner_name: row.to_value("owner_sep_2022").unwrap_or(None),
        owner_address: row.to_value("owner_address").unwrap_or(None),
        dba_name: row.to_value("dba_sep_2022").unwrap_or(None),
        cares_act: row.to_value("cares_act_july_2022").unwrap_or(None),
        cares_act_id: row.to_value("cares_act_id").unwrap_or(None),
        nhpd: row.to_value("nhpd_july_2022").unwrap_or(None),
        nhpd_id: row.to_value("nhpd_id").unwrap_or(None),
        housing_choice_vouchers: row.to_value("housing_choice_vouchers").unwrap_or(None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchy_database_connection::init_sqlite_rusqlite;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn snapshot_db() -> Box<dyn Database> {
        let db = init_sqlite_rusqlite(None).unwrap();
        db.exec_raw(
            "CREATE TABLE property_snapshot (
                property_id TEXT,
                parcel_id TEXT,
                parcel_address TEXT,
                owner_sep_2022 TEXT,
                owner_address TEXT,
                dba_sep_2022 TEXT,
                cares_act_july_2022 TEXT,
                cares_act_id TEXT,
                nhpd_july_2022 TEXT,
                nhpd_id TEXT,
                housing_choice_vouchers TEXT
            )",
        )
        .await
        .unwrap();

        for (pid, owner, owner_address) in [
            ("100", "ACME HOLDINGS LLC", "PO BOX 1, AUSTIN TX 78701"),
            ("200", "ACME HOLDINGS LLC", "PO BOX 1, AUSTIN TX 78701"),
            ("300", "ACME HOLDINGS", "po box 1, austin tx 78701"),
            ("400", "SOMEONE ELSE", "12 ELM ST, AUSTIN TX 78702"),
        ] {
            db.exec_raw_params(
                "INSERT INTO property_snapshot (property_id, parcel_id, parcel_address,
                    owner_sep_2022, owner_address)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    DatabaseValue::String(pid.to_string()),
                    DatabaseValue::String(format!("P{pid}")),
                    DatabaseValue::String(format!("{pid} MAIN ST")),
                    DatabaseValue::String(owner.to_string()),
                    DatabaseValue::String(owner_address.to_string()),
                ],
            )
            .await
            .unwrap();
        }

        db
    }

    async fn evictions_db() -> Box<dyn Database> {
        let db = init_sqlite_rusqlite(None).unwrap();
        db.exec_raw("CREATE TABLE spatial_joined_data (property_id TEXT, case_number TEXT)")
            .await
            .unwrap();
        db.exec_raw("CREATE TABLE case_detail (case_number TEXT, date_filed TEXT)")
            .await
            .unwrap();

        for (pid, case, filed) in [
            ("100", "J1-CV-14-000001", "03/15/2014"),
            ("100", "J1-CV-13-000002", "01/02/2013"),
            ("100", "J1-CV-14-000003", "12/31/2014"),
            ("100", "J1-CV-14-000004", "not a date"),
            ("200", "J1-CV-14-000005", "06/01/2014"),
            ("400", "J1-CV-14-000006", "07/04/2014"),
        ] {
            db.exec_raw_params(
                "INSERT INTO spatial_joined_data (property_id, case_number) VALUES ($1, $2)",
                &[
                    DatabaseValue::String(pid.to_string()),
                    DatabaseValue::String(case.to_string()),
                ],
            )
            .await
            .unwrap();
            db.exec_raw_params(
                "INSERT INTO case_detail (case_number, date_filed) VALUES ($1, $2)",
                &[
                    DatabaseValue::String(case.to_string()),
                    DatabaseValue::String(filed.to_string()),
                ],
            )
            .await
            .unwrap();
        }

        db
    }

    #[tokio::test]
    async fn get_property_returns_matching_row() {
        let db = snapshot_db().await;
        let rows = get_property(db.as_ref(), "100").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].property_id, "100");
        assert_eq!(rows[0].parcel_id.as_deref(), Some("P100"));
        assert_eq!(rows[0].owner_name.as_deref(), Some("ACME HOLDINGS LLC"));
        assert_eq!(rows[0].dba_name, None);
    }

    #[tokio::test]
    async fn get_property_unknown_id_is_empty() {
        let db = snapshot_db().await;
        assert!(get_property(db.as_ref(), "999").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_property_treats_input_as_data() {
        let db = snapshot_db().await;
        let rows = get_property(db.as_ref(), "100' OR '1'='1").await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn owner_address_match_includes_peer_and_excludes_self() {
        let db = snapshot_db().await;
        let rows = find_by_owner_address(db.as_ref(), "PO BOX 1, AUSTIN TX 78701", "100")
            .await
            .unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.property_id.as_str()).collect();
        assert_eq!(ids, vec!["200"]);
    }

    #[tokio::test]
    async fn owner_address_match_is_exact() {
        let db = snapshot_db().await;
        let rows = find_by_owner_address(db.as_ref(), "PO BOX 1, AUSTIN TX 78701", "200")
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.property_id != "300"));
        assert!(rows.iter().any(|r| r.property_id == "100"));
    }

    #[tokio::test]
    async fn evictions_filtered_by_inclusive_range() {
        let db = evictions_db().await;
        let range = DateRange::new(date(2014, 1, 1), date(2014, 12, 31));
        let cases = get_evictions(db.as_ref(), &["100".to_string()], &range)
            .await
            .unwrap();
        let numbers: Vec<&str> = cases.iter().map(|c| c.case_number.as_str()).collect();
        assert_eq!(numbers, vec!["J1-CV-14-000001", "J1-CV-14-000003"]);
        assert_eq!(cases[0].date_filed, date(2014, 3, 15));
    }

    #[tokio::test]
    async fn evictions_for_multiple_properties() {
        let db = evictions_db().await;
        let range = DateRange::new(date(2014, 1, 1), date(2014, 12, 31));
        let cases = get_evictions(db.as_ref(), &["100".to_string(), "200".to_string()], &range)
            .await
            .unwrap();
        assert_eq!(cases.len(), 3);
        assert!(cases.iter().any(|c| c.property_id == "200"));
        assert!(cases.iter().all(|c| c.property_id != "400"));
    }

    #[tokio::test]
    async fn evictions_empty_ids_is_empty() {
        let db = evictions_db().await;
        let range = DateRange::new(date(2014, 1, 1), date(2014, 12, 31));
        assert!(get_evictions(db.as_ref(), &[], &range).await.unwrap().is_empty());
    }

    #[test]
    fn parses_date_filed() {
        assert_eq!(parse_date_filed("03/15/2014"), Some(date(2014, 3, 15)));
        assert_eq!(parse_date_filed(" 01/02/2013 "), Some(date(2013, 1, 2)));
        assert_eq!(parse_date_filed("2014-03-15"), None);
        assert_eq!(parse_date_filed(""), None);
    }

    #[tokio::test]
    async fn covering_ids_are_read_as_text_in_order() {
        let db = snapshot_db().await;
        let rows = db
            .query_raw_params(
                "SELECT DISTINCT CAST(property_id AS TEXT) AS property_id
                 FROM property_snapshot
                 WHERE owner_sep_2022 = $1
                 ORDER BY 1",
                &[DatabaseValue::String("ACME HOLDINGS LLC".to_string())],
            )
            .await
            .unwrap();

        assert_eq!(property_ids_from_rows(&rows).unwrap(), vec!["100", "200"]);
        assert!(property_ids_from_rows(&[]).unwrap().is_empty());
    }
}

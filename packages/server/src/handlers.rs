//! HTTP handler functions for the property snapshot API.

use actix_web::{HttpResponse, web};
use property_snapshot_lookup::{LookupReport, PropertySnapshot};
use property_snapshot_server_models::{
    ApiEvictionCase, ApiGeocode, ApiHealth, ApiLookupReport, ApiProperty, ApiPropertyRecord,
    LookupQueryParams,
};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        resolver: state.service.resolver_name().to_string(),
    })
}

/// `GET /api/lookup`
///
/// Runs the lookup pipeline for `address`. `from`/`to` bound the eviction
/// window; either may be omitted.
pub async fn lookup(
    state: web::Data<AppState>,
    params: web::Query<LookupQueryParams>,
) -> HttpResponse {
    let params = params.into_inner();

    let Some(range) = state.service.range_between(params.from, params.to) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "`from` must not be after `to`"
        }));
    };

    let address = params.address.unwrap_or_default();

    match state.service.lookup(&address, Some(range)).await {
        Ok(report) => HttpResponse::Ok().json(api_report(report)),
        Err(e) => {
            log::error!("Failed to look up {address:?}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to look up address"
            }))
        }
    }
}

fn api_report(report: LookupReport) -> ApiLookupReport {
    let ambiguous = report.is_ambiguous();
    let related_property_ids = report.related_property_ids();

    ApiLookupReport {
        address: report.address,
        outcome: report.outcome.to_string(),
        geocode: report.geocode.map(|g| ApiGeocode {
            accuracy: g.accuracy.to_string(),
            latitude: g.latitude,
            longitude: g.longitude,
            county: g.county,
            formatted_address: g.formatted_address,
        }),
        ambiguous,
        properties: report.properties.into_iter().map(api_property).collect(),
        eviction_range: report.range.into(),
        evictions: report
            .evictions
            .into_iter()
            .map(ApiEvictionCase::from)
            .collect(),
        related_property_ids,
        related_evictions: report
            .related_evictions
            .into_iter()
            .map(ApiEvictionCase::from)
            .collect(),
    }
}

fn api_property(property: PropertySnapshot) -> ApiProperty {
    ApiProperty {
        property_id: property.property_id,
        records: property
            .records
            .into_iter()
            .map(ApiPropertyRecord::from)
            .collect(),
        related: property
            .related
            .into_iter()
            .map(ApiPropertyRecord::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use geo::{LineString, MultiPolygon, Polygon};
    use property_snapshot_geocoder::{GeocodeError, GeocodedAddress, Geocoder};
    use property_snapshot_lookup::SnapshotService;
    use property_snapshot_lookup::resolver::InMemoryResolver;
    use property_snapshot_spatial::{Parcel, ParcelIndex};
    use switchy_database::{Database, DatabaseValue};
    use switchy_database_connection::init_sqlite_rusqlite;

    use super::*;

    struct OneAddress;

    #[async_trait]
    impl Geocoder for OneAddress {
        fn id(&self) -> &str {
            "one-address"
        }

        async fn geocode(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
            Ok((address == "100 Congress Ave").then_some(GeocodedAddress {
                latitude: 0.5,
                longitude: 0.5,
                location_type: Some("ROOFTOP".to_string()),
                county: Some("Travis County".to_string()),
                formatted_address: None,
            }))
        }
    }

    async fn state() -> web::Data<AppState> {
        let snapshot = init_sqlite_rusqlite(None).unwrap();
        snapshot
            .exec_raw(
                "CREATE TABLE property_snapshot (
                    property_id TEXT, parcel_id TEXT, parcel_address TEXT,
                    owner_sep_2022 TEXT, owner_address TEXT, dba_sep_2022 TEXT,
                    cares_act_july_2022 TEXT, cares_act_id TEXT, nhpd_july_2022 TEXT,
                    nhpd_id TEXT, housing_choice_vouchers TEXT
                )",
            )
            .await
            .unwrap();
        snapshot
            .exec_raw_params(
                "INSERT INTO property_snapshot (property_id, owner_address) VALUES ($1, $2)",
                &[
                    DatabaseValue::String("100".to_string()),
                    DatabaseValue::String("PO BOX 1".to_string()),
                ],
            )
            .await
            .unwrap();

        let evictions = init_sqlite_rusqlite(None).unwrap();
        evictions
            .exec_raw("CREATE TABLE spatial_joined_data (property_id TEXT, case_number TEXT)")
            .await
            .unwrap();
        evictions
            .exec_raw("CREATE TABLE case_detail (case_number TEXT, date_filed TEXT)")
            .await
            .unwrap();
        evictions
            .exec_raw("INSERT INTO spatial_joined_data VALUES ('100', 'J1-CV-15-000001')")
            .await
            .unwrap();
        evictions
            .exec_raw("INSERT INTO case_detail VALUES ('J1-CV-15-000001', '05/20/2015')")
            .await
            .unwrap();

        let index = ParcelIndex::new(vec![Parcel {
            parcel_id: "P100".to_string(),
            property_id: "100".to_string(),
            polygon: MultiPolygon(vec![Polygon::new(
                LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]),
                vec![],
            )]),
        }]);

        let snapshot: Arc<dyn Database> = Arc::from(snapshot);
        let evictions: Arc<dyn Database> = Arc::from(evictions);

        web::Data::new(AppState {
            service: SnapshotService::new(
                Box::new(OneAddress),
                Box::new(InMemoryResolver::new(Arc::new(index))),
                snapshot,
                evictions,
            ),
        })
    }

    fn query(
        address: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> web::Query<LookupQueryParams> {
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        web::Query(LookupQueryParams {
            address: Some(address.to_string()),
            from: from.map(date),
            to: to.map(date),
        })
    }

    async fn body_json(resp: HttpResponse) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_resolver() {
        let resp = health(state().await).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["healthy"], true);
        assert_eq!(json["resolver"], "memory");
    }

    #[tokio::test]
    async fn lookup_returns_found_report() {
        let resp = lookup(state().await, query("100 Congress Ave", None, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["outcome"], "found");
        assert_eq!(json["ambiguous"], false);
        assert_eq!(json["geocode"]["accuracy"], "ROOFTOP");
        assert_eq!(json["geocode"]["county"], "Travis County");
        assert_eq!(json["properties"][0]["propertyId"], "100");
        assert_eq!(json["properties"][0]["records"][0]["ownerAddress"], "PO BOX 1");
        assert_eq!(json["evictions"][0]["caseNumber"], "J1-CV-15-000001");
        assert_eq!(json["evictions"][0]["dateFiled"], "2015-05-20");
        assert_eq!(json["evictionRange"]["from"], "2014-01-01");
    }

    #[tokio::test]
    async fn lookup_applies_date_window() {
        let resp = lookup(
            state().await,
            query("100 Congress Ave", Some("2016-01-01"), Some("2016-12-31")),
        )
        .await;
        let json = body_json(resp).await;
        assert_eq!(json["evictions"], serde_json::json!([]));
        assert_eq!(json["evictionRange"]["to"], "2016-12-31");
    }

    #[tokio::test]
    async fn lookup_rejects_inverted_window() {
        let resp = lookup(
            state().await,
            query("100 Congress Ave", Some("2020-01-01"), Some("2019-01-01")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_address_is_not_geocoded() {
        let resp = lookup(state().await, query("nowhere", None, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["outcome"], "not_geocoded");
        assert_eq!(json["geocode"]["accuracy"], "NO RESULT");
        assert_eq!(json["properties"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn blank_address_has_no_geocode() {
        let resp = lookup(state().await, query("  ", None, None)).await;
        let json = body_json(resp).await;
        assert_eq!(json["outcome"], "empty_address");
        assert!(json["geocode"].is_null());
    }
}

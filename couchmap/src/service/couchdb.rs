//! CouchDB view-backed data service.
//!
//! Points live in a CouchDB database exposing two views:
//!
//! - a spatial view (`_spatial/nodes` by default) answering bounding-box
//!   queries, either with the matching rows or, with `count=true`, with
//!   `{"count": n}`
//! - a map/reduce view (`_view/nodes_coarse` by default) keyed by
//!   `[zoom, x, y]` whose reduce counts points, queried with `group=true`
//!   and a POSTed `{"keys": [...]}` body

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CoarseCountRow, DataService, PointRow, ServiceError};
use crate::config::ServiceConfig;
use crate::coord::{GeoBBox, TileCoord};

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Debug, Serialize)]
struct KeysRequest {
    keys: Vec<[u32; 3]>,
}

#[derive(Debug, Deserialize)]
struct GroupedRow {
    key: (u8, u32, u32),
    value: u64,
}

#[derive(Debug, Deserialize)]
struct GroupedResponse {
    rows: Vec<GroupedRow>,
}

#[derive(Debug, Deserialize)]
struct RowsResponse {
    rows: Vec<serde_json::Value>,
}

/// [`DataService`] over HTTP against CouchDB views.
#[derive(Debug, Clone)]
pub struct CouchDbService {
    client: Client,
    spatial_url: String,
    coarse_url: String,
}

impl CouchDbService {
    /// Creates a service for the configured database and views.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            spatial_url: join_url(&config.base_url, &config.nodes_spatial),
            coarse_url: join_url(&config.base_url, &config.nodes_coarse),
        })
    }

    pub fn spatial_url(&self) -> &str {
        &self.spatial_url
    }

    pub fn coarse_url(&self) -> &str {
        &self.coarse_url
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        url: &str,
    ) -> Result<T, ServiceError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl DataService for CouchDbService {
    fn probe_count(&self, bbox: GeoBBox) -> BoxFuture<'_, Result<u64, ServiceError>> {
        async move {
            let request = self
                .client
                .get(&self.spatial_url)
                .query(&[("bbox", bbox.to_bbox_string().as_str()), ("count", "true")]);
            let response: CountResponse = self.send_json(request, &self.spatial_url).await?;
            debug!(bbox = %bbox, count = response.count, "Probe answered");
            Ok(response.count)
        }
        .boxed()
    }

    fn grouped_count(
        &self,
        tiles: Vec<TileCoord>,
    ) -> BoxFuture<'_, Result<Vec<CoarseCountRow>, ServiceError>> {
        async move {
            let body = serde_json::to_vec(&keys_request(&tiles))?;
            let request = self
                .client
                .post(&self.coarse_url)
                .query(&[("group", "true")])
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
            let response: GroupedResponse = self.send_json(request, &self.coarse_url).await?;
            Ok(into_count_rows(response))
        }
        .boxed()
    }

    fn fetch_points(&self, bbox: GeoBBox) -> BoxFuture<'_, Result<Vec<PointRow>, ServiceError>> {
        async move {
            let request = self
                .client
                .get(&self.spatial_url)
                .query(&[("bbox", bbox.to_bbox_string())]);
            let response: RowsResponse = self.send_json(request, &self.spatial_url).await?;
            Ok(response.rows.into_iter().map(PointRow).collect())
        }
        .boxed()
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn keys_request(tiles: &[TileCoord]) -> KeysRequest {
    KeysRequest {
        keys: tiles.iter().map(TileCoord::key).collect(),
    }
}

fn into_count_rows(response: GroupedResponse) -> Vec<CoarseCountRow> {
    response
        .rows
        .into_iter()
        .map(|row| {
            let (zoom, x, y) = row.key;
            CoarseCountRow::new(TileCoord::new(zoom, x, y), row.value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_normalizes_slashes() {
        assert_eq!(
            join_url("http://localhost:5984/nodes/", "/_spatial/nodes"),
            "http://localhost:5984/nodes/_spatial/nodes"
        );
        assert_eq!(
            join_url("http://localhost:5984/nodes", "_view/nodes_coarse"),
            "http://localhost:5984/nodes/_view/nodes_coarse"
        );
    }

    #[test]
    fn test_keys_request_body() {
        let tiles = vec![TileCoord::new(12, 1205, 1539), TileCoord::new(12, 1206, 1539)];
        let body = serde_json::to_string(&keys_request(&tiles)).unwrap();
        assert_eq!(body, r#"{"keys":[[12,1205,1539],[12,1206,1539]]}"#);
    }

    #[test]
    fn test_parse_count_response() {
        let response: CountResponse = serde_json::from_str(r#"{"count": 500}"#).unwrap();
        assert_eq!(response.count, 500);
    }

    #[test]
    fn test_parse_grouped_response() {
        let json = r#"{"rows":[{"key":[12,1205,1539],"value":42},{"key":[12,1206,1539],"value":7}]}"#;
        let response: GroupedResponse = serde_json::from_str(json).unwrap();
        let rows = into_count_rows(response);

        assert_eq!(
            rows,
            vec![
                CoarseCountRow::new(TileCoord::new(12, 1205, 1539), 42),
                CoarseCountRow::new(TileCoord::new(12, 1206, 1539), 7),
            ]
        );
    }

    #[test]
    fn test_grouped_response_with_bad_key_is_decode_error() {
        let json = r#"{"rows":[{"key":"12/1205/1539","value":42}]}"#;
        let err: ServiceError = serde_json::from_str::<GroupedResponse>(json)
            .unwrap_err()
            .into();
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[test]
    fn test_parse_rows_response_keeps_rows_opaque() {
        let json = r#"{"rows":[{"id":"n1","geometry":{"type":"Point","coordinates":[-73.9,40.7]}}]}"#;
        let response: RowsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.rows.len(), 1);
        assert_eq!(response.rows[0]["id"], "n1");
    }

    #[test]
    fn test_service_urls_from_config() {
        let config = ServiceConfig {
            base_url: "http://db.example:5984/nodes".to_string(),
            ..ServiceConfig::default()
        };
        let service = CouchDbService::new(&config).unwrap();
        assert_eq!(
            service.spatial_url(),
            "http://db.example:5984/nodes/_spatial/nodes"
        );
        assert_eq!(
            service.coarse_url(),
            "http://db.example:5984/nodes/_view/nodes_coarse"
        );
    }
}

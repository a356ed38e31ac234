//! Data service contract.
//!
//! The engine talks to the backing point store only through [`DataService`].
//! Three queries are needed:
//!
//! - **probe**: how many points fall inside a bounding box
//! - **grouped count**: per-tile point counts for a list of tiles
//! - **exact fetch**: the raw point rows inside a bounding box
//!
//! [`CouchDbService`] implements the contract over CouchDB spatial and
//! map/reduce views. Tests substitute in-memory implementations.

mod couchdb;

pub use couchdb::CouchDbService;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::coord::{GeoBBox, TileCoord};

/// Errors a data-service request can end with.
///
/// Everything except [`ServiceError::Cancelled`] is a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body was not what the view returns.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request was superseded by a newer viewport change.
    #[error("Request cancelled")]
    Cancelled,
}

impl ServiceError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ServiceError::Cancelled)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        ServiceError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Decode(e.to_string())
    }
}

/// One bucket of a grouped-count response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoarseCountRow {
    pub tile: TileCoord,
    pub count: u64,
}

impl CoarseCountRow {
    pub fn new(tile: TileCoord, count: u64) -> Self {
        Self { tile, count }
    }
}

/// A raw point row, handed untouched to the point-rendering collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRow(pub serde_json::Value);

impl PointRow {
    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Asynchronous access to the point store.
///
/// Futures own their arguments so they can be driven on a spawned task.
pub trait DataService: Send + Sync {
    /// Count the points inside `bbox`.
    fn probe_count(&self, bbox: GeoBBox) -> BoxFuture<'_, Result<u64, ServiceError>>;

    /// Count points per tile. Tiles without points are omitted from the result.
    fn grouped_count(
        &self,
        tiles: Vec<TileCoord>,
    ) -> BoxFuture<'_, Result<Vec<CoarseCountRow>, ServiceError>>;

    /// Fetch every point row inside `bbox`.
    fn fetch_points(&self, bbox: GeoBBox) -> BoxFuture<'_, Result<Vec<PointRow>, ServiceError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::Status {
            status: 404,
            url: "http://localhost:5984/db/_view/nodes_coarse".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 404 from http://localhost:5984/db/_view/nodes_coarse"
        );
        assert_eq!(ServiceError::Cancelled.to_string(), "Request cancelled");
    }

    #[test]
    fn test_only_cancelled_is_cancelled() {
        assert!(ServiceError::Cancelled.is_cancelled());
        assert!(!ServiceError::Http("reset".into()).is_cancelled());
        assert!(!ServiceError::Decode("eof".into()).is_cancelled());
    }

    #[test]
    fn test_from_serde_error_is_decode() {
        let err: ServiceError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, ServiceError::Decode(_)));
    }
}

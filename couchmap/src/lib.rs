//! CouchMap - aggregated point overlays for slippy maps
//!
//! Shows large point datasets stored behind CouchDB views on a web-style
//! map. For each viewport the engine first asks how many points are visible,
//! then either draws one count marker per slippy-map tile or fetches the
//! individual points.
//!
//! - [`coord`]: tile math and the bounding-box tiler
//! - [`request`]: in-flight request tracking and cancellation
//! - [`service`]: the data-service contract and its CouchDB implementation
//! - [`map`]: map widget and marker sink contracts
//! - [`engine`]: the probe, resolve and exact-fetch cycle
//! - [`layers`]: layer toggles driving engine activation
//! - [`controller`]: the event loop tying them together

pub mod config;
pub mod controller;
pub mod coord;
pub mod engine;
pub mod layers;
pub mod logging;
pub mod map;
pub mod request;
pub mod service;

pub use controller::CouchMap;

//! `couchmap view`: run one viewport cycle against the configured database.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use couchmap::coord::GeoBBox;
use couchmap::layers::Layer;
use couchmap::map::{HeadlessMap, RecordingSink, Viewport};
use couchmap::service::CouchDbService;
use couchmap::CouchMap;
use tracing::info;

use super::load_config;
use crate::error::CliError;

pub struct ViewArgs {
    pub bbox: GeoBBox,
    pub zoom: u8,
    pub max_zoom: u8,
    pub config: Option<PathBuf>,
    pub layers: Vec<Layer>,
    pub threshold: Option<u64>,
    pub granularity: Option<u8>,
}

pub fn run(args: ViewArgs) -> Result<(), CliError> {
    let file = load_config(args.config.as_deref())?;

    let mut engine_config = file.engine;
    if let Some(threshold) = args.threshold {
        engine_config = engine_config.with_coarse_threshold(threshold);
    }
    if let Some(granularity) = args.granularity {
        engine_config = engine_config.with_coarse_granularity(granularity);
    }
    engine_config.validate()?;

    let service = CouchDbService::new(&file.service)?;
    info!(
        spatial = service.spatial_url(),
        coarse = service.coarse_url(),
        "Using CouchDB views"
    );

    // A probe and a bulk request, each bounded by the HTTP timeout.
    let seconds = file.service.timeout_secs.saturating_mul(2).max(1);

    let viewport = Viewport::new(args.bbox, args.zoom, args.max_zoom);
    let layers = if args.layers.is_empty() {
        vec![Layer::Nodes]
    } else {
        args.layers
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async move {
        let (map, _events) = HeadlessMap::new(viewport);
        let mut controller =
            CouchMap::new(engine_config, Arc::new(service), map, RecordingSink::new())?;

        for layer in layers {
            controller.set_layer(layer, true);
        }

        tokio::time::timeout(Duration::from_secs(seconds), controller.settle())
            .await
            .map_err(|_| CliError::Timeout { seconds })?;

        print_sink(controller.sink());
        Ok::<(), CliError>(())
    })
}

fn print_sink(sink: &RecordingSink) {
    if !sink.coarse().is_empty() {
        for marker in sink.coarse() {
            println!(
                "{:.6} {:.6} {}",
                marker.position.lat,
                marker.position.lng,
                marker.label()
            );
        }
        info!(markers = sink.coarse().len(), "Coarse markers rendered");
    } else if !sink.points().is_empty() {
        for row in sink.points() {
            println!("{}", row.value());
        }
        info!(points = sink.points().len(), "Points rendered");
    } else {
        eprintln!("Nothing to show for this viewport (failed requests are logged).");
    }
}

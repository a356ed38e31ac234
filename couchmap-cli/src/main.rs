//! CouchMap CLI - Command-line interface
//!
//! Thin front end over the couchmap library: tile listings, one-shot
//! viewport queries against CouchDB and config file setup.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use couchmap::coord::{GeoBBox, MAX_ZOOM};
use couchmap::layers::Layer;
use couchmap::logging::{default_log_file, init_logging, init_stderr, LoggingGuard};

use commands::view::ViewArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "couchmap")]
#[command(about = "Aggregated map overlays from CouchDB spatial views", long_about = None)]
#[command(version)]
struct Cli {
    /// Also write logs to couchmap.log in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tiles covering a bounding box
    Tiles {
        /// Bounding box as south,west,north,east
        #[arg(long, allow_hyphen_values = true)]
        bbox: GeoBBox,

        /// Tile zoom level
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=MAX_ZOOM as i64))]
        zoom: u8,
    },

    /// Query the data service for a viewport and print what would be drawn
    View {
        /// Bounding box as south,west,north,east
        #[arg(long, allow_hyphen_values = true)]
        bbox: GeoBBox,

        /// Map zoom level
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=MAX_ZOOM as i64))]
        zoom: u8,

        /// Highest zoom the map can show
        #[arg(long, default_value_t = 18)]
        max_zoom: u8,

        /// Config file (defaults to the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Layer to enable, repeatable (nodes or links; default nodes)
        #[arg(long = "layer")]
        layers: Vec<Layer>,

        /// Override the coarse threshold from the config file
        #[arg(long)]
        threshold: Option<u64>,

        /// Override the coarse granularity from the config file
        #[arg(long)]
        granularity: Option<u8>,
    },

    /// Write a config file with default settings
    InitConfig {
        /// Where to write it (defaults to the user config directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let _guard = match setup_logging(cli.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => e.exit(),
    };

    let result = match cli.command {
        Commands::Tiles { bbox, zoom } => commands::tiles::run(&bbox, zoom),
        Commands::View {
            bbox,
            zoom,
            max_zoom,
            config,
            layers,
            threshold,
            granularity,
        } => commands::view::run(ViewArgs {
            bbox,
            zoom,
            max_zoom,
            config,
            layers,
            threshold,
            granularity,
        }),
        Commands::InitConfig { config, force } => commands::init::run(config.as_deref(), force),
    };

    if let Err(e) = result {
        e.exit();
    }
}

fn setup_logging(log_dir: Option<&std::path::Path>) -> Result<Option<LoggingGuard>, CliError> {
    match log_dir {
        Some(dir) => init_logging(dir, default_log_file())
            .map(Some)
            .map_err(|e| CliError::LoggingInit(e.to_string())),
        None => {
            init_stderr();
            Ok(None)
        }
    }
}

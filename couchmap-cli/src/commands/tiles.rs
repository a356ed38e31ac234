//! `couchmap tiles`: print the tiles covering a bounding box.

use couchmap::coord::{tile_count_in_bbox, tiles_in_bbox, GeoBBox};

use crate::error::CliError;

/// Longest listing the command will print.
pub const MAX_LISTED_TILES: u64 = 1_000_000;

pub fn run(bbox: &GeoBBox, zoom: u8) -> Result<(), CliError> {
    let count = tile_count_in_bbox(bbox, zoom);
    if count > MAX_LISTED_TILES {
        return Err(CliError::TooManyTiles {
            count,
            limit: MAX_LISTED_TILES,
        });
    }

    for tile in tiles_in_bbox(bbox, zoom) {
        println!("{}", tile);
    }
    Ok(())
}

//! CSV map loader.
//!
//! # CSV format
//!
//! One row per tile.  Positions absent from the file are treated as walls.
//!
//! ```csv
//! row,col,kind
//! 0,0,floor
//! 0,1,spawn
//! 0,2,delivery
//! 1,0,wall
//! ```
//!
//! **`kind`** field:
//!
//! | Value      | Tile                   |
//! |------------|------------------------|
//! | `wall`     | not walkable           |
//! | `floor`    | walkable               |
//! | `spawn`    | walkable, parcels spawn|
//! | `delivery` | walkable, delivery zone|

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use pd_core::{Position, Tile};

use crate::{GridMap, GridMapBuilder, SpatialError};

#[derive(Deserialize)]
struct TileRecord {
    row:  i32,
    col:  i32,
    kind: String,
}

/// Load a [`GridMap`] from a CSV file.
pub fn load_map_csv(path: &Path) -> Result<GridMap, SpatialError> {
    let file = std::fs::File::open(path)?;
    load_map_reader(file)
}

/// Like [`load_map_csv`] but accepts any `Read` source.
pub fn load_map_reader<R: Read>(reader: R) -> Result<GridMap, SpatialError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut builder = GridMapBuilder::new();

    for result in csv_reader.deserialize::<TileRecord>() {
        let rec = result.map_err(|e| SpatialError::Parse(e.to_string()))?;
        builder.add_tile(parse_tile(Position::new(rec.row, rec.col), &rec.kind)?);
    }

    let map = builder.build();
    log::debug!(
        "loaded map: {} tiles, {} delivery, {} spawn",
        map.tile_count(),
        map.delivery_positions().len(),
        map.spawn_positions().len()
    );
    Ok(map)
}

fn parse_tile(pos: Position, kind: &str) -> Result<Tile, SpatialError> {
    match kind.trim() {
        "wall" => Ok(Tile::wall(pos)),
        "floor" => Ok(Tile::floor(pos)),
        "spawn" => Ok(Tile::spawn(pos)),
        "delivery" => Ok(Tile::delivery(pos)),
        other => Err(SpatialError::Parse(format!(
            "invalid tile kind {other:?} at {pos}: expected wall, floor, spawn, or delivery"
        ))),
    }
}

//! Grid map representation and builder.
//!
//! # Data layout
//!
//! Tiles are stored once in a `Vec<Tile>` with a `Position → index` hash
//! map for O(1) lookup.  Delivery and spawn positions are cached in sorted
//! vectors since the planner and the exploration heuristic iterate them on
//! every query.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) holds every walkable tile.  The belief set uses
//! it to find the tiles inside a Gaussian kernel's radius without scanning
//! the whole map.

use std::fmt;

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use rustc_hash::FxHashMap;

use pd_core::{Position, Tile};

use crate::{SpatialError, SpatialResult};

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone)]
struct TileEntry {
    point:    [f64; 2], // [row, col]
    position: Position,
}

impl RTreeObject for TileEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for TileEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dr = self.point[0] - point[0];
        let dc = self.point[1] - point[1];
        dr * dr + dc * dc
    }
}

// ── GridMap ───────────────────────────────────────────────────────────────────

/// Immutable set of map tiles.  Construct with [`GridMapBuilder`] or
/// [`GridMap::from_ascii`].
pub struct GridMap {
    tiles:       Vec<Tile>,
    index:       FxHashMap<Position, usize>,
    delivery:    Vec<Position>,
    spawn:       Vec<Position>,
    spatial_idx: RTree<TileEntry>,
}

// The R-tree holds nothing the tile list doesn't, so it is left out.
impl fmt::Debug for GridMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridMap")
            .field("height", &self.height())
            .field("width", &self.width())
            .field("tiles", &self.tiles.len())
            .field("delivery", &self.delivery)
            .field("spawn", &self.spawn)
            .finish_non_exhaustive()
    }
}

impl GridMap {
    /// Parse a map drawn as text, one line per row:
    ///
    /// | Char | Tile                  |
    /// |------|-----------------------|
    /// | `#`  | wall                  |
    /// | `.`  | floor                 |
    /// | `D`  | delivery              |
    /// | `S`  | spawn                 |
    ///
    /// Leading/trailing blank lines and per-line indentation are ignored so
    /// maps can be written inline in tests.
    pub fn from_ascii(text: &str) -> SpatialResult<GridMap> {
        let mut builder = GridMapBuilder::new();
        let rows = text
            .lines()
            .map(str::trim)
            .skip_while(|l| l.is_empty())
            .collect::<Vec<_>>();
        let rows = match rows.iter().rposition(|l| !l.is_empty()) {
            Some(last) => &rows[..=last],
            None => &rows[..0],
        };
        for (r, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                let pos = Position::new(r as i32, c as i32);
                let tile = match ch {
                    '#' => Tile::wall(pos),
                    '.' => Tile::floor(pos),
                    'D' => Tile::delivery(pos),
                    'S' => Tile::spawn(pos),
                    other => {
                        return Err(SpatialError::Parse(format!(
                            "unexpected map character {other:?} at {pos}"
                        )));
                    }
                };
                builder.add_tile(tile);
            }
        }
        Ok(builder.build())
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of rows spanned by the map (max row + 1, min row assumed 0).
    pub fn height(&self) -> usize {
        self.tiles.iter().map(|t| t.position.row + 1).max().unwrap_or(0).max(0) as usize
    }

    /// Number of columns spanned by the map.
    pub fn width(&self) -> usize {
        self.tiles.iter().map(|t| t.position.col + 1).max().unwrap_or(0).max(0) as usize
    }

    // ── Lookup ────────────────────────────────────────────────────────────

    #[inline]
    pub fn tile(&self, pos: Position) -> Option<&Tile> {
        self.index.get(&pos).map(|&i| &self.tiles[i])
    }

    #[inline]
    pub fn is_crossable(&self, pos: Position) -> bool {
        self.tile(pos).is_some_and(|t| t.crossable)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Walkable tiles, in map order.
    pub fn crossable(&self) -> impl Iterator<Item = &Tile> + '_ {
        self.tiles.iter().filter(|t| t.crossable)
    }

    /// Sorted walkable delivery positions.
    pub fn delivery_positions(&self) -> &[Position] {
        &self.delivery
    }

    /// Sorted walkable spawn positions.
    pub fn spawn_positions(&self) -> &[Position] {
        &self.spawn
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Walkable tiles whose euclidean distance to `center` is ≤ `radius`.
    pub fn tiles_within(&self, center: Position, radius: f64) -> impl Iterator<Item = Position> + '_ {
        let point = [center.row as f64, center.col as f64];
        self.spatial_idx
            .locate_within_distance(point, radius * radius)
            .map(|e| e.position)
    }
}

// ── GridMapBuilder ────────────────────────────────────────────────────────────

/// Construct a [`GridMap`] incrementally, then call [`build`](Self::build).
///
/// Adding a tile twice keeps the later one.
///
/// # Example
///
/// ```
/// use pd_core::{Position, Tile};
/// use pd_spatial::GridMapBuilder;
///
/// let mut b = GridMapBuilder::new();
/// b.add_tile(Tile::floor(Position::new(0, 0)));
/// b.add_tile(Tile::delivery(Position::new(0, 1)));
/// let map = b.build();
/// assert_eq!(map.tile_count(), 2);
/// assert_eq!(map.delivery_positions(), &[Position::new(0, 1)]);
/// ```
#[derive(Default)]
pub struct GridMapBuilder {
    tiles: Vec<Tile>,
}

impl GridMapBuilder {
    pub fn new() -> Self {
        Self { tiles: Vec::new() }
    }

    pub fn with_capacity(tiles: usize) -> Self {
        Self { tiles: Vec::with_capacity(tiles) }
    }

    pub fn add_tile(&mut self, tile: Tile) -> &mut Self {
        self.tiles.push(tile);
        self
    }

    /// Convenience: a horizontal run of floor tiles on `row` from column
    /// `from` to `to` inclusive.
    pub fn add_floor_run(&mut self, row: i32, from: i32, to: i32) -> &mut Self {
        for col in from..=to {
            self.tiles.push(Tile::floor(Position::new(row, col)));
        }
        self
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Consume the builder and produce a [`GridMap`].
    pub fn build(self) -> GridMap {
        let mut index: FxHashMap<Position, usize> = FxHashMap::default();
        let mut tiles: Vec<Tile> = Vec::with_capacity(self.tiles.len());
        for tile in self.tiles {
            match index.get(&tile.position) {
                Some(&i) => tiles[i] = tile,
                None => {
                    index.insert(tile.position, tiles.len());
                    tiles.push(tile);
                }
            }
        }

        let mut delivery: Vec<Position> = tiles
            .iter()
            .filter(|t| t.crossable && t.delivery)
            .map(|t| t.position)
            .collect();
        delivery.sort_unstable();

        let mut spawn: Vec<Position> = tiles
            .iter()
            .filter(|t| t.crossable && t.spawn)
            .map(|t| t.position)
            .collect();
        spawn.sort_unstable();

        let entries: Vec<TileEntry> = tiles
            .iter()
            .filter(|t| t.crossable)
            .map(|t| TileEntry {
                point:    [t.position.row as f64, t.position.col as f64],
                position: t.position,
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        GridMap { tiles, index, delivery, spawn, spatial_idx }
    }
}

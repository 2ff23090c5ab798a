//! Static distance engine.
//!
//! # Layout
//!
//! Walkable tiles get a dense global index (`node`).  Each node records its
//! connected component and its local index inside that component.  Every
//! component owns a row-major `n × n` distance matrix, so
//! `distance(a, b)` is two hash lookups plus one array read, and positions
//! in different components are unreachable by construction.
//!
//! # Build
//!
//! Components are found with BFS, then their matrices are computed in
//! parallel on a dedicated Rayon pool sized to the component count (capped
//! by `AgentConfig::num_threads`).  `build` blocks until every component is
//! done; planning never starts against a partial table.

use std::collections::VecDeque;

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use pd_core::{AgentConfig, Direction, Position};

use crate::{GridMap, SpatialError, SpatialResult, router, seidel};

/// One connected component's distance table.
struct Component {
    n:     usize,
    /// Row-major, indexed by local node index.
    dist:  Vec<u32>,
}

/// All-pairs shortest distances over the walkable grid, plus the queries the
/// planner and control loop build on.
pub struct DistanceEngine {
    map:        GridMap,
    node_of:    FxHashMap<Position, u32>,
    positions:  Vec<Position>,
    component:  Vec<u32>,
    local:      Vec<u32>,
    neighbors:  Vec<Vec<Position>>,
    components: Vec<Component>,
}

impl DistanceEngine {
    /// Build the engine.  Fails with [`SpatialError::NoDeliveryTile`] when the
    /// map has no walkable delivery tile.
    pub fn build(map: GridMap, config: &AgentConfig) -> SpatialResult<DistanceEngine> {
        if map.delivery_positions().is_empty() {
            return Err(SpatialError::NoDeliveryTile);
        }

        // ── Dense node indexing ───────────────────────────────────────────
        let mut positions: Vec<Position> = map.crossable().map(|t| t.position).collect();
        positions.sort_unstable();
        let node_of: FxHashMap<Position, u32> = positions
            .iter()
            .enumerate()
            .map(|(i, &p)| (p, i as u32))
            .collect();

        let neighbors: Vec<Vec<Position>> = positions
            .iter()
            .map(|p| {
                p.neighbors()
                    .into_iter()
                    .filter(|n| node_of.contains_key(n))
                    .collect()
            })
            .collect();

        // ── Connected components (BFS) ────────────────────────────────────
        let node_count = positions.len();
        let mut component = vec![u32::MAX; node_count];
        let mut local = vec![0u32; node_count];
        let mut members: Vec<Vec<u32>> = Vec::new();

        for seed in 0..node_count {
            if component[seed] != u32::MAX {
                continue;
            }
            let cid = members.len() as u32;
            let mut nodes = Vec::new();
            let mut queue = VecDeque::from([seed as u32]);
            component[seed] = cid;
            while let Some(node) = queue.pop_front() {
                local[node as usize] = nodes.len() as u32;
                nodes.push(node);
                for n in &neighbors[node as usize] {
                    let next = node_of[n];
                    if component[next as usize] == u32::MAX {
                        component[next as usize] = cid;
                        queue.push_back(next);
                    }
                }
            }
            members.push(nodes);
        }

        // ── Per-component adjacency over local indices ────────────────────
        let local_adjacency: Vec<Vec<Vec<u32>>> = members
            .iter()
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|&node| {
                        neighbors[node as usize]
                            .iter()
                            .map(|n| local[node_of[n] as usize])
                            .collect()
                    })
                    .collect()
            })
            .collect();

        // ── Parallel all-pairs shortest paths ─────────────────────────────
        let workers = config
            .num_threads
            .unwrap_or(members.len())
            .min(members.len())
            .max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("apsp-{i}"))
            .build()
            .map_err(|e| SpatialError::ThreadPool(e.to_string()))?;

        let tables: Vec<Vec<u32>> = pool.install(|| {
            local_adjacency
                .par_iter()
                .map(|adj| seidel::all_pairs(adj))
                .collect::<SpatialResult<Vec<_>>>()
        })?;

        let components: Vec<Component> = members
            .iter()
            .zip(tables)
            .map(|(nodes, dist)| Component { n: nodes.len(), dist })
            .collect();

        log::debug!(
            "distance engine: {} walkable tiles, {} components, {} workers",
            node_count,
            components.len(),
            workers
        );

        Ok(DistanceEngine { map, node_of, positions, component, local, neighbors, components })
    }

    // ── Map access ────────────────────────────────────────────────────────

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    /// Walkable positions in sorted order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Dense index of a walkable position, stable for the engine's lifetime.
    #[inline]
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        self.node_of.get(&pos).map(|&i| i as usize)
    }

    #[inline]
    pub fn is_crossable(&self, pos: Position) -> bool {
        self.node_of.contains_key(&pos)
    }

    pub fn delivery_positions(&self) -> &[Position] {
        self.map.delivery_positions()
    }

    pub fn spawn_positions(&self) -> &[Position] {
        self.map.spawn_positions()
    }

    // ── Distance queries ──────────────────────────────────────────────────

    /// Walkable tiles one step from `pos`.  Empty for a non-walkable `pos`.
    pub fn adjacent(&self, pos: Position) -> &[Position] {
        match self.node_of.get(&pos) {
            Some(&i) => &self.neighbors[i as usize],
            None => &[],
        }
    }

    /// Shortest walking distance.
    pub fn distance(&self, a: Position, b: Position) -> SpatialResult<u32> {
        let ia = *self.node_of.get(&a).ok_or(SpatialError::UnknownPosition(a))? as usize;
        let ib = *self.node_of.get(&b).ok_or(SpatialError::UnknownPosition(b))? as usize;
        self.lookup(ia, ib)
            .ok_or(SpatialError::Unreachable { from: a, to: b })
    }

    /// Like [`distance`](Self::distance) but `None` instead of an error.
    #[inline]
    pub fn distance_if_possible(&self, a: Position, b: Position) -> Option<u32> {
        let ia = *self.node_of.get(&a)? as usize;
        let ib = *self.node_of.get(&b)? as usize;
        self.lookup(ia, ib)
    }

    #[inline]
    fn lookup(&self, ia: usize, ib: usize) -> Option<u32> {
        let cid = self.component[ia];
        if cid != self.component[ib] {
            return None;
        }
        let c = &self.components[cid as usize];
        Some(c.dist[self.local[ia] as usize * c.n + self.local[ib] as usize])
    }

    /// Neighbors of `from` that lie on some shortest route to `to`.  More
    /// than one result means equally short alternatives.  Empty when
    /// `from == to` or `to` is unreachable.
    pub fn next_positions(&self, from: Position, to: Position) -> Vec<Position> {
        let Some(d) = self.distance_if_possible(from, to) else {
            return Vec::new();
        };
        if d == 0 {
            return Vec::new();
        }
        self.adjacent(from)
            .iter()
            .copied()
            .filter(|&n| self.distance_if_possible(n, to) == Some(d - 1))
            .collect()
    }

    /// Reachable delivery tile nearest to `pos` (ties broken by position).
    pub fn closest_delivery(&self, pos: Position) -> SpatialResult<Position> {
        self.closest_delivery_with_distance(pos)
            .map(|(p, _)| p)
            .ok_or(SpatialError::NoReachableDelivery(pos))
    }

    /// Nearest reachable delivery tile and its distance, if any.
    pub fn closest_delivery_with_distance(&self, pos: Position) -> Option<(Position, u32)> {
        self.map
            .delivery_positions()
            .iter()
            .filter_map(|&d| self.distance_if_possible(pos, d).map(|dist| (d, dist)))
            .min_by_key(|&(d, dist)| (dist, d))
    }

    // ── Route topology ────────────────────────────────────────────────────

    /// Tiles every shortest route between `start` and `end` is forced through.
    ///
    /// Walks from `start` toward `end` while the next hop is unique, then
    /// from `end` toward `start` until a branch or the first walk's tiles.
    /// Endpoints are excluded, so the result on a corridor is the same
    /// whichever end is passed first.
    pub fn bottleneck(&self, start: Position, end: Position) -> FxHashSet<Position> {
        let mut forced = FxHashSet::default();
        if self.distance_if_possible(start, end).is_none() {
            return forced;
        }

        let mut cur = start;
        while let [next] = self.next_positions(cur, end)[..] {
            if next == end {
                break;
            }
            forced.insert(next);
            cur = next;
        }

        let mut cur = end;
        while let [next] = self.next_positions(cur, start)[..] {
            if next == start || forced.contains(&next) {
                break;
            }
            forced.insert(next);
            cur = next;
        }
        forced
    }

    /// A* from `start` to `end` that never steps on `avoid`.  The static
    /// distance is the heuristic.  `None` when every route is blocked.
    pub fn recompute_path(
        &self,
        start: Position,
        end:   Position,
        avoid: &FxHashSet<Position>,
    ) -> Option<Vec<Direction>> {
        router::astar(self, start, end, avoid)
    }
}

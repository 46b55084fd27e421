//! Cell canonicalization and the lazily filled cache table.

use std::collections::{BTreeMap, HashMap};

use geocoin_core::{
    luck, Cell, CellBounds, CellId, LatLng, CACHE_COIN_SCALE, MAX_NEIGHBORHOOD_SIZE,
};

use crate::{cache::Cache, GameConfig};

/// Owns every canonical cell touched so far and every materialized cache.
///
/// Cells are recorded in first-touch order and never removed. Caches are
/// created the first time a qualifying cell is queried and live as long as
/// the board.
#[derive(Clone, Debug)]
pub struct Board {
    tile_width: f64,
    visibility_radius: u32,
    cache_spawn_probability: f64,
    known_cells: Vec<Cell>,
    cell_ids: HashMap<Cell, CellId>,
    caches: BTreeMap<Cell, Cache>,
}

impl Board {
    /// Creates an empty board with the provided fixed parameters.
    ///
    /// Radii above [`MAX_NEIGHBORHOOD_SIZE`] are clamped.
    #[must_use]
    pub fn new(tile_width: f64, visibility_radius: u32, cache_spawn_probability: f64) -> Self {
        if visibility_radius > MAX_NEIGHBORHOOD_SIZE {
            log::warn!(
                "clamping visibility radius {visibility_radius} to {MAX_NEIGHBORHOOD_SIZE}"
            );
        }
        Self {
            tile_width,
            visibility_radius: visibility_radius.min(MAX_NEIGHBORHOOD_SIZE),
            cache_spawn_probability,
            known_cells: Vec::new(),
            cell_ids: HashMap::new(),
            caches: BTreeMap::new(),
        }
    }

    /// Creates an empty board from gameplay configuration.
    #[must_use]
    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.tile_degrees,
            config.neighborhood_size,
            config.cache_spawn_probability,
        )
    }

    /// Width of a single cell in degrees.
    #[must_use]
    pub const fn tile_width(&self) -> f64 {
        self.tile_width
    }

    /// Chebyshev radius used by [`Board::cells_near`].
    #[must_use]
    pub const fn visibility_radius(&self) -> u32 {
        self.visibility_radius
    }

    /// Luck threshold below which a cell hosts a cache.
    #[must_use]
    pub const fn cache_spawn_probability(&self) -> f64 {
        self.cache_spawn_probability
    }

    /// Returns the canonical cell for `(i, j)`, recording it on first use.
    pub fn cell_for(&mut self, i: i32, j: i32) -> Cell {
        let cell = Cell::new(i, j);
        let _ = self.canonicalize(cell);
        cell
    }

    /// Returns the canonical cell containing `point`.
    pub fn cell_for_point(&mut self, point: LatLng) -> Cell {
        let cell = self.cell_at(point);
        self.cell_for(cell.i(), cell.j())
    }

    /// Computes the cell containing `point` without recording it.
    ///
    /// Points outside the addressable grid are clamped to its edge; use
    /// [`Board::locate`] to detect them.
    #[must_use]
    pub fn cell_at(&self, point: LatLng) -> Cell {
        self.locate(point).unwrap_or_else(|| {
            log::warn!(
                "clamping point ({}, {}) outside the addressable grid",
                point.lat,
                point.lng
            );
            let limit = self.index_limit();
            Cell::new(
                clamped_index(point.lat, self.tile_width, limit),
                clamped_index(point.lng, self.tile_width, limit),
            )
        })
    }

    /// Cell containing `point`, or `None` when the point is not finite or
    /// lies so far out that its neighbourhood would leave the `i32` range.
    #[must_use]
    pub fn locate(&self, point: LatLng) -> Option<Cell> {
        let limit = self.index_limit();
        let i = grid_index(point.lat, self.tile_width, limit)?;
        let j = grid_index(point.lng, self.tile_width, limit)?;
        Some(Cell::new(i, j))
    }

    fn index_limit(&self) -> f64 {
        f64::from(i32::MAX) - f64::from(self.visibility_radius)
    }

    /// Lists every cell within the visibility radius of `point`, row-major.
    pub fn cells_near(&mut self, point: LatLng) -> Vec<Cell> {
        let origin = self.cell_for_point(point);
        let radius = i32::try_from(self.visibility_radius).unwrap_or(i32::MAX);

        let mut cells = Vec::new();
        for di in -radius..=radius {
            for dj in -radius..=radius {
                let neighbour = origin.offset(di, dj);
                cells.push(self.cell_for(neighbour.i(), neighbour.j()));
            }
        }
        cells
    }

    /// Rectangle covered by `cell`.
    #[must_use]
    pub fn cell_bounds(&self, cell: Cell) -> CellBounds {
        let width = self.tile_width;
        CellBounds {
            south: f64::from(cell.i()) * width,
            west: f64::from(cell.j()) * width,
            north: (f64::from(cell.i()) + 1.0) * width,
            east: (f64::from(cell.j()) + 1.0) * width,
        }
    }

    /// Centre point of `cell`.
    #[must_use]
    pub fn cell_center(&self, cell: Cell) -> LatLng {
        LatLng::new(
            (f64::from(cell.i()) + 0.5) * self.tile_width,
            (f64::from(cell.j()) + 0.5) * self.tile_width,
        )
    }

    /// Arena identity of `cell`, if it has been canonicalized.
    #[must_use]
    pub fn cell_id(&self, cell: Cell) -> Option<CellId> {
        self.cell_ids.get(&cell).copied()
    }

    /// Every canonical cell in first-touch order.
    #[must_use]
    pub fn known_cells(&self) -> &[Cell] {
        &self.known_cells
    }

    /// Luck drawn for `cell`; drives both qualification and cache size.
    #[must_use]
    pub fn spawn_probability(&self, cell: Cell) -> f64 {
        luck(&cell.to_string())
    }

    /// Reports whether `cell` hosts a cache.
    #[must_use]
    pub fn qualifies(&self, cell: Cell) -> bool {
        self.spawn_probability(cell) < self.cache_spawn_probability
    }

    /// Number of coins a freshly materialized cache on `cell` starts with.
    ///
    /// Reuses the qualification draw rather than drawing again.
    #[must_use]
    pub fn initial_coin_count(&self, cell: Cell) -> u32 {
        (self.spawn_probability(cell) * CACHE_COIN_SCALE).floor() as u32
    }

    /// Returns the live cache on `cell`, materializing it on first access.
    ///
    /// Non-qualifying cells never host a cache.
    pub fn cache_for(&mut self, cell: Cell) -> Option<&mut Cache> {
        if !self.qualifies(cell) {
            return None;
        }

        let _ = self.canonicalize(cell);
        if !self.caches.contains_key(&cell) {
            let count = self.initial_coin_count(cell);
            log::debug!("materializing cache at {cell} with {count} coins");
            let _ = self.caches.insert(cell, Cache::spawn(cell, count));
        }
        self.caches.get_mut(&cell)
    }

    /// Read-only view of an already materialized cache.
    #[must_use]
    pub fn peek_cache(&self, cell: Cell) -> Option<&Cache> {
        self.caches.get(&cell)
    }

    /// Applies `mutation` to the cache on `cell` in place.
    ///
    /// Returns `None` when the cell does not qualify.
    pub fn mutate_cache<R>(
        &mut self,
        cell: Cell,
        mutation: impl FnOnce(&mut Cache) -> R,
    ) -> Option<R> {
        self.cache_for(cell).map(mutation)
    }

    /// Replaces the stored cache on `cell`.
    ///
    /// Ignored when the cell does not qualify or the cache belongs to a
    /// different cell.
    pub fn set_cache(&mut self, cell: Cell, cache: Cache) {
        if !self.qualifies(cell) {
            log::warn!("ignoring cache stored on non-qualifying cell {cell}");
            return;
        }
        if cache.location() != cell {
            log::warn!(
                "ignoring cache located at {} stored on cell {cell}",
                cache.location()
            );
            return;
        }

        let _ = self.canonicalize(cell);
        let _ = self.caches.insert(cell, cache);
    }

    /// Materialized caches in row-major cell order.
    pub fn caches(&self) -> impl Iterator<Item = &Cache> {
        self.caches.values()
    }

    pub(crate) fn canonicalize(&mut self, cell: Cell) -> CellId {
        if let Some(id) = self.cell_ids.get(&cell) {
            return *id;
        }

        let id = CellId::new(u32::try_from(self.known_cells.len()).unwrap_or(u32::MAX));
        self.known_cells.push(cell);
        let _ = self.cell_ids.insert(cell, id);
        id
    }

    pub(crate) fn insert_cache(&mut self, cache: Cache) {
        let _ = self.canonicalize(cache.location());
        let _ = self.caches.insert(cache.location(), cache);
    }
}

fn grid_index(coordinate: f64, tile_width: f64, limit: f64) -> Option<i32> {
    let index = (coordinate / tile_width).floor();
    (index.is_finite() && index.abs() <= limit).then(|| index as i32)
}

fn clamped_index(coordinate: f64, tile_width: f64, limit: f64) -> i32 {
    let index = (coordinate / tile_width).floor();
    if index.is_nan() {
        0
    } else {
        index.clamp(-limit, limit) as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocoin_core::{Coin, CACHE_SPAWN_PROBABILITY, NEIGHBORHOOD_SIZE, TILE_DEGREES};

    fn board() -> Board {
        Board::new(TILE_DEGREES, NEIGHBORHOOD_SIZE, CACHE_SPAWN_PROBABILITY)
    }

    #[test]
    fn cell_for_returns_stable_identity() {
        let mut board = board();
        let first = board.cell_for(4, -2);
        let second = board.cell_for(4, -2);

        assert_eq!(first, second);
        assert_eq!(board.cell_id(first), Some(CellId::new(0)));
        assert_eq!(board.cell_id(second), board.cell_id(first));
        assert_eq!(board.known_cells(), &[Cell::new(4, -2)]);
    }

    #[test]
    fn cell_for_point_floors_toward_negative_infinity() {
        let mut board = Board::new(1.0, 1, CACHE_SPAWN_PROBABILITY);

        assert_eq!(board.cell_for_point(LatLng::new(0.5, 1.99)), Cell::new(0, 1));
        assert_eq!(board.cell_for_point(LatLng::new(-0.5, -1.0)), Cell::new(-1, -1));
        assert_eq!(board.cell_for_point(LatLng::new(-0.0, 3.0)), Cell::new(0, 3));
    }

    #[test]
    fn cell_at_does_not_record_cells() {
        let board = board();
        let _ = board.cell_at(LatLng::new(0.00035, -0.00012));
        assert!(board.known_cells().is_empty());
    }

    #[test]
    fn cells_near_is_row_major_and_canonical() {
        let mut board = Board::new(1.0, 1, CACHE_SPAWN_PROBABILITY);
        let cells = board.cells_near(LatLng::new(0.5, 0.5));

        let expected: Vec<Cell> = (-1..=1)
            .flat_map(|i| (-1..=1).map(move |j| Cell::new(i, j)))
            .collect();
        assert_eq!(cells, expected);
        assert_eq!(board.known_cells().len(), 9);
        assert_eq!(board.known_cells()[0], Cell::new(0, 0));

        let again = board.cells_near(LatLng::new(0.5, 0.5));
        assert_eq!(again, cells);
        assert_eq!(board.known_cells().len(), 9);
    }

    #[test]
    fn cells_near_covers_full_neighbourhood() {
        let mut board = board();
        let cells = board.cells_near(LatLng::new(0.0, 0.0));
        assert_eq!(cells.len(), 17 * 17);
        assert!(cells
            .iter()
            .all(|cell| cell.chebyshev_distance(Cell::new(0, 0)) <= NEIGHBORHOOD_SIZE));
    }

    #[test]
    fn far_points_are_outside_the_grid() {
        let board = board();
        assert_eq!(board.locate(LatLng::new(0.00015, -0.00015)), Some(Cell::new(1, -2)));
        assert_eq!(board.locate(LatLng::new(1e6, 0.0)), None);
        assert_eq!(board.locate(LatLng::new(f64::NAN, 0.0)), None);

        let limit = i32::MAX - NEIGHBORHOOD_SIZE as i32;
        assert_eq!(board.cell_at(LatLng::new(1e6, 0.0)), Cell::new(limit, 0));
        assert_eq!(board.cell_at(LatLng::new(-1e6, 0.0)), Cell::new(-limit, 0));
    }

    #[test]
    fn neighbourhood_at_grid_edge_has_distinct_cells() {
        let mut board = Board::new(1.0, 1, CACHE_SPAWN_PROBABILITY);
        let edge = f64::from(i32::MAX - 1);
        let cells = board.cells_near(LatLng::new(edge + 0.5, 0.5));

        let mut unique = cells.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 9);
    }

    #[test]
    fn oversized_radius_is_clamped() {
        let board = Board::new(TILE_DEGREES, u32::MAX, CACHE_SPAWN_PROBABILITY);
        assert_eq!(board.visibility_radius(), MAX_NEIGHBORHOOD_SIZE);
    }

    #[test]
    fn bounds_and_center_follow_tile_width() {
        let board = Board::new(0.5, 1, CACHE_SPAWN_PROBABILITY);
        let cell = Cell::new(-2, 3);

        let bounds = board.cell_bounds(cell);
        assert_eq!(bounds.south, -1.0);
        assert_eq!(bounds.north, -0.5);
        assert_eq!(bounds.west, 1.5);
        assert_eq!(bounds.east, 2.0);

        let center = board.cell_center(cell);
        assert_eq!(center, LatLng::new(-0.75, 1.75));
        assert!(bounds.contains(center));
    }

    #[test]
    fn spawn_probability_is_luck_of_cell_key() {
        let board = board();
        let cell = Cell::new(3, 3);
        assert_eq!(board.spawn_probability(cell), luck("3:3"));
        assert_eq!(board.spawn_probability(cell), board.spawn_probability(cell));
    }

    #[test]
    fn non_qualifying_cell_never_hosts_a_cache() {
        let mut board = board();
        let cell = Cell::new(3, 3);
        let _ = board.cache_for(Cell::new(-6, -5));

        for _ in 0..3 {
            assert!(board.cache_for(cell).is_none());
        }
        assert!(board.peek_cache(cell).is_none());
    }

    #[test]
    fn origin_cell_does_not_qualify() {
        let mut board = board();
        assert!(!board.qualifies(Cell::new(0, 0)));
        assert!(board.cache_for(Cell::new(0, 0)).is_none());
    }

    #[test]
    fn qualifying_cache_size_matches_luck_draw() {
        let mut board = board();
        let cell = Cell::new(-6, -5);

        let cache = board.cache_for(cell).expect("cell qualifies");
        assert_eq!(cache.len(), 9);
        assert_eq!(cache.len() as u32, board.initial_coin_count(cell));
    }

    #[test]
    fn qualifying_cell_may_start_empty() {
        let mut board = board();
        let cache = board.cache_for(Cell::new(-1, -1)).expect("cell qualifies");
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_state_is_memoized_between_queries() {
        let mut board = board();
        let cell = Cell::new(-6, -5);

        let coin = board
            .cache_for(cell)
            .and_then(Cache::withdraw)
            .expect("coin available");
        assert_eq!(coin, Coin::new(cell, 8));

        assert_eq!(board.cache_for(cell).map(|cache| cache.len()), Some(8));
        assert_eq!(board.known_cells(), &[cell]);
    }

    #[test]
    fn mutate_cache_writes_through() {
        let mut board = board();
        let cell = Cell::new(2, -7);
        let foreign = Coin::new(Cell::new(-7, 0), 6);

        let len = board.mutate_cache(cell, |cache| {
            cache.deposit(foreign);
            cache.len()
        });

        assert_eq!(len, Some(10));
        assert_eq!(board.peek_cache(cell).map(Cache::len), Some(10));
        assert_eq!(board.mutate_cache(Cell::new(3, 3), |cache| cache.len()), None);
    }

    #[test]
    fn set_cache_replaces_stored_value() {
        let mut board = board();
        let cell = Cell::new(-7, 0);

        let mut copy = board.cache_for(cell).cloned().expect("cell qualifies");
        let _ = copy.withdraw();
        board.set_cache(cell, copy.clone());

        assert_eq!(board.peek_cache(cell), Some(&copy));
    }

    #[test]
    fn set_cache_ignores_non_qualifying_or_mismatched_cells() {
        let mut board = board();
        let cache = board.cache_for(Cell::new(-7, 0)).cloned().expect("cell qualifies");

        board.set_cache(Cell::new(3, 3), cache.clone());
        board.set_cache(Cell::new(2, -7), cache);

        assert!(board.peek_cache(Cell::new(3, 3)).is_none());
        assert!(board.peek_cache(Cell::new(2, -7)).is_none());
    }

    #[test]
    fn caches_iterate_in_cell_order() {
        let mut board = board();
        for cell in [Cell::new(2, -7), Cell::new(-7, 0), Cell::new(-6, -5)] {
            let _ = board.cache_for(cell);
        }

        let order: Vec<Cell> = board.caches().map(Cache::location).collect();
        assert_eq!(order, vec![Cell::new(-7, 0), Cell::new(-6, -5), Cell::new(2, -7)]);
    }
}

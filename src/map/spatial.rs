use std::collections::HashMap;

use crate::geo::Bounds;

/// Spatial hash grid over lon/lat cells.
/// Items are stored once; cells hold indices into the item list.
pub struct SpatialGrid<T> {
    cells: HashMap<(i32, i32), Vec<usize>>,
    items: Vec<T>,
    /// Cell size in degrees
    cell_size: f64,
}

impl<T> SpatialGrid<T> {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            items: Vec::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Insert an item at a geographic position, returning its index
    pub fn insert(&mut self, lon: f64, lat: f64, item: T) -> usize {
        let idx = self.items.len();
        self.items.push(item);

        let cell = self.to_cell(lon, lat);
        self.cells.entry(cell).or_default().push(idx);
        idx
    }

    /// Indices of items in every cell touched by a square of `radius_degrees`
    /// around a point. Callers filter by exact distance.
    pub fn query_radius(&self, lon: f64, lat: f64, radius_degrees: f64) -> Vec<usize> {
        self.query_bbox(&Bounds::new(
            lon - radius_degrees,
            lat - radius_degrees,
            lon + radius_degrees,
            lat + radius_degrees,
        ))
    }

    /// Indices of items in every cell overlapping the box
    pub fn query_bbox(&self, bounds: &Bounds) -> Vec<usize> {
        let min_cell = self.to_cell(bounds.min_lon, bounds.min_lat);
        let max_cell = self.to_cell(bounds.max_lon, bounds.max_lat);

        let mut results = Vec::new();

        // Wide boxes visit fewer cells by walking the occupied ones instead
        let span = (max_cell.0 - min_cell.0 + 1) as i64 * (max_cell.1 - min_cell.1 + 1) as i64;
        if span > self.cells.len() as i64 {
            for (&(x, y), indices) in &self.cells {
                if x >= min_cell.0 && x <= max_cell.0 && y >= min_cell.1 && y <= max_cell.1 {
                    results.extend_from_slice(indices);
                }
            }
            return results;
        }

        for y in min_cell.1..=max_cell.1 {
            for x in min_cell.0..=max_cell.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }

        results
    }

    #[inline(always)]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    #[inline(always)]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every item
    pub fn clear(&mut self) {
        self.cells.clear();
        self.items.clear();
    }
}

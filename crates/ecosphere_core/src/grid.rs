//! The world grid: uniform buckets sized near the max interaction radius.
//!
//! Each cell carries both the environment (biome, soil nutrients, water,
//! temperature) and the occupancy lists used for neighbor queries. The
//! occupancy lists are kept in sync with the world's authoritative entity
//! and plant collections; `move_entity` is O(1) and a no-op when the source
//! and destination buckets coincide.

use ecosphere_data::{BankedSeed, EntityId, PlantId, Position};
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Biome {
    #[default]
    Plains,
    Forest,
    Desert,
    Wetland,
    Water,
    Mountain,
    Tundra,
}

impl Biome {
    /// Velocity damping multiplier applied on top of base friction.
    #[must_use]
    pub fn friction_multiplier(self) -> f64 {
        match self {
            Biome::Plains => 1.0,
            Biome::Forest => 1.4,
            Biome::Desert => 1.1,
            Biome::Wetland => 1.8,
            Biome::Water => 2.2,
            Biome::Mountain => 1.5,
            Biome::Tundra => 1.2,
        }
    }

    /// Signal attenuation factor in [0, 1]; dense biomes muffle signals.
    #[must_use]
    pub fn signal_attenuation(self) -> f32 {
        match self {
            Biome::Plains => 1.0,
            Biome::Forest => 0.7,
            Biome::Desert => 0.9,
            Biome::Wetland => 0.8,
            Biome::Water => 0.6,
            Biome::Mountain => 0.5,
            Biome::Tundra => 0.9,
        }
    }

    #[must_use]
    pub fn base_temperature(self) -> f32 {
        match self {
            Biome::Plains => 18.0,
            Biome::Forest => 15.0,
            Biome::Desert => 32.0,
            Biome::Wetland => 16.0,
            Biome::Water => 12.0,
            Biome::Mountain => 4.0,
            Biome::Tundra => -6.0,
        }
    }

    #[must_use]
    pub fn base_water(self) -> f32 {
        match self {
            Biome::Plains => 0.4,
            Biome::Forest => 0.6,
            Biome::Desert => 0.05,
            Biome::Wetland => 0.9,
            Biome::Water => 1.0,
            Biome::Mountain => 0.3,
            Biome::Tundra => 0.35,
        }
    }

    #[must_use]
    pub fn is_aquatic(self) -> bool {
        matches!(self, Biome::Water | Biome::Wetland)
    }
}

/// Soil nutrient stocks per cell. All values non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SoilNutrients {
    pub nitrogen: f32,
    pub phosphorus: f32,
    pub potassium: f32,
}

impl SoilNutrients {
    #[must_use]
    pub fn total(&self) -> f32 {
        self.nitrogen + self.phosphorus + self.potassium
    }

    /// Deposit nutrients in fixed proportion (decay, fertilization).
    pub fn deposit(&mut self, amount: f32) {
        let share = amount.max(0.0) / 3.0;
        self.nitrogen += share;
        self.phosphorus += share;
        self.potassium += share;
    }

    /// Withdraw up to the requested amounts; returns what was actually taken.
    pub fn withdraw(&mut self, n: f32, p: f32, k: f32) -> SoilNutrients {
        let taken = SoilNutrients {
            nitrogen: n.min(self.nitrogen).max(0.0),
            phosphorus: p.min(self.phosphorus).max(0.0),
            potassium: k.min(self.potassium).max(0.0),
        };
        self.nitrogen -= taken.nitrogen;
        self.phosphorus -= taken.phosphorus;
        self.potassium -= taken.potassium;
        taken
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub biome: Biome,
    pub soil: SoilNutrients,
    pub water: f32,
    pub compaction: f32,
    pub organic_matter: f32,
    pub temperature: f32,
    pub oxygen: f32,
    pub entities: Vec<EntityId>,
    pub plants: Vec<PlantId>,
    pub seed_bank: Vec<BankedSeed>,
}

impl Cell {
    fn new(biome: Biome) -> Self {
        Self {
            biome,
            soil: SoilNutrients {
                nitrogen: 1.0,
                phosphorus: 0.8,
                potassium: 0.6,
            },
            water: biome.base_water(),
            compaction: 0.2,
            organic_matter: 0.5,
            temperature: biome.base_temperature(),
            oxygen: 0.21,
            entities: Vec::new(),
            plants: Vec::new(),
            seed_bank: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldGrid {
    pub width: u16,
    pub height: u16,
    pub cell_size: f64,
    pub cols: usize,
    pub rows: usize,
    pub cells: Vec<Cell>,
}

impl WorldGrid {
    /// Build the grid with a seeded Perlin biome layout.
    #[must_use]
    pub fn generate(width: u16, height: u16, cell_size: f64, seed: u64) -> Self {
        let cols = (f64::from(width) / cell_size).ceil() as usize;
        let rows = (f64::from(height) / cell_size).ceil() as usize;
        let elevation = Perlin::new(seed as u32);
        let moisture = Perlin::new(seed.wrapping_add(1) as u32);

        let mut cells = Vec::with_capacity(cols * rows);
        for cy in 0..rows {
            for cx in 0..cols {
                let nx = cx as f64 * 0.13;
                let ny = cy as f64 * 0.13;
                let e = elevation.get([nx, ny]);
                let m = moisture.get([nx + 100.0, ny + 100.0]);
                let lat = cy as f64 / rows.max(1) as f64;
                let biome = classify_biome(e, m, lat);
                cells.push(Cell::new(biome));
            }
        }

        Self {
            width,
            height,
            cell_size,
            cols,
            rows,
            cells,
        }
    }

    /// Integer cell coordinates for a position, clamped to world bounds.
    #[inline]
    #[must_use]
    pub fn cell_of(&self, pos: &Position) -> (usize, usize) {
        let cx = (pos.x / self.cell_size).floor() as i64;
        let cy = (pos.y / self.cell_size).floor() as i64;
        (
            cx.clamp(0, self.cols as i64 - 1) as usize,
            cy.clamp(0, self.rows as i64 - 1) as usize,
        )
    }

    #[inline]
    #[must_use]
    pub fn cell_index(&self, cx: usize, cy: usize) -> usize {
        cy * self.cols + cx
    }

    /// World-space center of a cell.
    #[inline]
    #[must_use]
    pub fn cell_center(&self, cx: usize, cy: usize) -> Position {
        Position::new(
            (cx as f64 + 0.5) * self.cell_size,
            (cy as f64 + 0.5) * self.cell_size,
        )
    }

    #[inline]
    #[must_use]
    pub fn cell(&self, cx: usize, cy: usize) -> &Cell {
        &self.cells[self.cell_index(cx, cy)]
    }

    #[inline]
    pub fn cell_mut(&mut self, cx: usize, cy: usize) -> &mut Cell {
        let idx = self.cell_index(cx, cy);
        &mut self.cells[idx]
    }

    #[inline]
    #[must_use]
    pub fn cell_at(&self, pos: &Position) -> &Cell {
        let (cx, cy) = self.cell_of(pos);
        self.cell(cx, cy)
    }

    #[inline]
    pub fn cell_at_mut(&mut self, pos: &Position) -> &mut Cell {
        let (cx, cy) = self.cell_of(pos);
        self.cell_mut(cx, cy)
    }

    pub fn insert_entity(&mut self, id: EntityId, pos: &Position) {
        self.cell_at_mut(pos).entities.push(id);
    }

    pub fn remove_entity(&mut self, id: EntityId, pos: &Position) {
        let cell = self.cell_at_mut(pos);
        cell.entities.retain(|e| *e != id);
    }

    /// O(1) bucket-list update; no-op when old and new map to the same cell.
    pub fn move_entity(&mut self, id: EntityId, old_pos: &Position, new_pos: &Position) {
        let old_cell = self.cell_of(old_pos);
        let new_cell = self.cell_of(new_pos);
        if old_cell == new_cell {
            return;
        }
        self.cell_mut(old_cell.0, old_cell.1).entities.retain(|e| *e != id);
        self.cell_mut(new_cell.0, new_cell.1).entities.push(id);
    }

    pub fn insert_plant(&mut self, id: PlantId, pos: &Position) {
        self.cell_at_mut(pos).plants.push(id);
    }

    pub fn remove_plant(&mut self, id: PlantId, pos: &Position) {
        let cell = self.cell_at_mut(pos);
        cell.plants.retain(|p| *p != id);
    }

    fn bucket_range(&self, pos: &Position, radius: f64) -> (usize, usize, usize, usize) {
        let min_cx = ((pos.x - radius) / self.cell_size).floor() as i64;
        let max_cx = ((pos.x + radius) / self.cell_size).floor() as i64;
        let min_cy = ((pos.y - radius) / self.cell_size).floor() as i64;
        let max_cy = ((pos.y + radius) / self.cell_size).floor() as i64;
        (
            min_cx.clamp(0, self.cols as i64 - 1) as usize,
            max_cx.clamp(0, self.cols as i64 - 1) as usize,
            min_cy.clamp(0, self.rows as i64 - 1) as usize,
            max_cy.clamp(0, self.rows as i64 - 1) as usize,
        )
    }

    /// Entity ids within `radius` of `pos`, exact-distance filtered through
    /// `pos_of` and sorted by id for deterministic iteration.
    #[must_use]
    pub fn entities_within<F>(&self, pos: &Position, radius: f64, pos_of: F) -> Vec<EntityId>
    where
        F: Fn(EntityId) -> Option<Position>,
    {
        let (min_cx, max_cx, min_cy, max_cy) = self.bucket_range(pos, radius);
        let r_sq = radius * radius;
        let mut out = Vec::new();
        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                for &id in &self.cell(cx, cy).entities {
                    if let Some(p) = pos_of(id) {
                        if p.distance_sq(pos) <= r_sq {
                            out.push(id);
                        }
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Plant ids within `radius` of `pos`, exact-distance filtered and
    /// sorted by id.
    #[must_use]
    pub fn plants_within<F>(&self, pos: &Position, radius: f64, pos_of: F) -> Vec<PlantId>
    where
        F: Fn(PlantId) -> Option<Position>,
    {
        let (min_cx, max_cx, min_cy, max_cy) = self.bucket_range(pos, radius);
        let r_sq = radius * radius;
        let mut out = Vec::new();
        for cy in min_cy..=max_cy {
            for cx in min_cx..=max_cx {
                for &id in &self.cell(cx, cy).plants {
                    if let Some(p) = pos_of(id) {
                        if p.distance_sq(pos) <= r_sq {
                            out.push(id);
                        }
                    }
                }
            }
        }
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Clamp a position into the world's half-open bounds.
    #[must_use]
    pub fn clamp_position(&self, pos: Position) -> Position {
        Position {
            x: pos.x.clamp(0.0, f64::from(self.width) - 1e-6),
            y: pos.y.clamp(0.0, f64::from(self.height) - 1e-6),
        }
    }

    #[must_use]
    pub fn contains(&self, pos: &Position) -> bool {
        pos.x >= 0.0
            && pos.y >= 0.0
            && pos.x < f64::from(self.width)
            && pos.y < f64::from(self.height)
    }
}

fn classify_biome(elevation: f64, moisture: f64, latitude: f64) -> Biome {
    if elevation < -0.45 {
        return Biome::Water;
    }
    if elevation > 0.55 {
        return Biome::Mountain;
    }
    if latitude > 0.85 {
        return Biome::Tundra;
    }
    if moisture > 0.45 {
        return Biome::Wetland;
    }
    if moisture < -0.45 {
        return Biome::Desert;
    }
    if elevation > 0.15 {
        return Biome::Forest;
    }
    Biome::Plains
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> WorldGrid {
        WorldGrid::generate(40, 40, 4.0, 7)
    }

    #[test]
    fn generation_is_deterministic() {
        let a = grid();
        let b = grid();
        let biomes_a: Vec<Biome> = a.cells.iter().map(|c| c.biome).collect();
        let biomes_b: Vec<Biome> = b.cells.iter().map(|c| c.biome).collect();
        assert_eq!(biomes_a, biomes_b);
    }

    #[test]
    fn cell_of_clamps_out_of_bounds() {
        let g = grid();
        let below = g.cell_of(&Position::new(-5.0, -5.0));
        let above = g.cell_of(&Position::new(1e9, 1e9));
        assert_eq!(below, (0, 0));
        assert_eq!(above, (g.cols - 1, g.rows - 1));
    }

    #[test]
    fn move_entity_same_cell_is_noop() {
        let mut g = grid();
        let id = EntityId(9);
        let a = Position::new(1.0, 1.0);
        let b = Position::new(2.0, 2.0);
        g.insert_entity(id, &a);
        g.move_entity(id, &a, &b);
        assert_eq!(g.cell_at(&a).entities, vec![id]);
    }

    #[test]
    fn move_entity_relocates_across_cells() {
        let mut g = grid();
        let id = EntityId(9);
        let a = Position::new(1.0, 1.0);
        let b = Position::new(20.0, 20.0);
        g.insert_entity(id, &a);
        g.move_entity(id, &a, &b);
        assert!(g.cell_at(&a).entities.is_empty());
        assert_eq!(g.cell_at(&b).entities, vec![id]);
    }

    #[test]
    fn neighbors_exact_distance_and_sorted() {
        let mut g = grid();
        let near = EntityId(2);
        let far = EntityId(1);
        let edge = EntityId(3);
        let positions = [
            (near, Position::new(10.0, 10.0)),
            (far, Position::new(30.0, 30.0)),
            (edge, Position::new(13.0, 10.0)),
        ];
        for (id, pos) in &positions {
            g.insert_entity(*id, pos);
        }
        let pos_of = |id: EntityId| positions.iter().find(|(e, _)| *e == id).map(|(_, p)| *p);

        let found = g.entities_within(&Position::new(10.0, 10.0), 4.0, pos_of);
        assert_eq!(found, vec![near, edge]);

        let tight = g.entities_within(&Position::new(10.0, 10.0), 2.0, pos_of);
        assert_eq!(tight, vec![near]);
    }

    #[test]
    fn soil_withdraw_never_goes_negative() {
        let mut soil = SoilNutrients {
            nitrogen: 0.2,
            phosphorus: 0.1,
            potassium: 0.0,
        };
        let taken = soil.withdraw(1.0, 1.0, 1.0);
        assert!((taken.nitrogen - 0.2).abs() < 1e-6);
        assert!(soil.nitrogen.abs() < 1e-6);
        assert!(soil.potassium.abs() < 1e-6);
    }
}

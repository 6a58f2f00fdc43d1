//! End-of-tick invariant checks. A failure here is the only fatal error
//! class in the engine: the run aborts after a severity-fatal event.

use super::World;
use std::collections::HashSet;

impl World {
    /// Verify the core invariants; returns a description of the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        self.check_unique_ids()?;
        self.check_spatial_consistency()?;
        self.check_value_bounds()?;
        self.check_network_integrity()?;
        self.check_timers()?;
        Ok(())
    }

    fn check_unique_ids(&self) -> Result<(), String> {
        let mut seen = HashSet::with_capacity(self.entities.len());
        for e in &self.entities {
            if !seen.insert(e.identity.id) {
                return Err(format!("duplicate entity id {:?}", e.identity.id));
            }
            if e.identity.id.0 >= self.next_entity_id {
                return Err(format!(
                    "entity id {:?} at or above the allocation cursor {}",
                    e.identity.id, self.next_entity_id
                ));
            }
        }
        let mut plant_seen = HashSet::with_capacity(self.plants.len());
        for p in &self.plants {
            if !plant_seen.insert(p.id) {
                return Err(format!("duplicate plant id {:?}", p.id));
            }
        }
        Ok(())
    }

    fn check_spatial_consistency(&self) -> Result<(), String> {
        // Every live entity appears exactly once, in the cell its position
        // maps to.
        for e in &self.entities {
            let (cx, cy) = self.grid.cell_of(&e.position);
            let listed = self
                .grid
                .cell(cx, cy)
                .entities
                .iter()
                .filter(|id| **id == e.identity.id)
                .count();
            if listed != 1 {
                return Err(format!(
                    "entity {:?} listed {} times in its cell ({}, {})",
                    e.identity.id, listed, cx, cy
                ));
            }
        }
        let total_listed: usize = self.grid.cells.iter().map(|c| c.entities.len()).sum();
        if total_listed != self.entities.len() {
            return Err(format!(
                "grid lists {} entities, world owns {}",
                total_listed,
                self.entities.len()
            ));
        }

        for p in &self.plants {
            let (cx, cy) = self.grid.cell_of(&p.position);
            let listed = self
                .grid
                .cell(cx, cy)
                .plants
                .iter()
                .filter(|id| **id == p.id)
                .count();
            if listed != 1 {
                return Err(format!(
                    "plant {:?} listed {} times in its cell ({}, {})",
                    p.id, listed, cx, cy
                ));
            }
        }
        Ok(())
    }

    fn check_value_bounds(&self) -> Result<(), String> {
        for e in &self.entities {
            let m = &e.metabolism;
            if !(m.energy.is_finite() && m.energy >= 0.0) {
                return Err(format!("entity {:?} energy {} invalid", e.identity.id, m.energy));
            }
            if !e.traits.is_finite() || !e.traits.in_bounds() {
                return Err(format!("entity {:?} traits out of bounds", e.identity.id));
            }
            if !(e.position.x.is_finite() && e.position.y.is_finite()) {
                return Err(format!("entity {:?} position not finite", e.identity.id));
            }
        }
        for p in &self.plants {
            if !(p.energy.is_finite() && p.energy >= 0.0 && p.size >= 0.0) {
                return Err(format!("plant {:?} energy/size invalid", p.id));
            }
        }
        for g in &self.grains {
            if !(g.viability.is_finite() && g.viability >= 0.0) {
                return Err(format!("grain {:?} viability invalid", g.id));
            }
        }
        for cell in &self.grid.cells {
            let soil = &cell.soil;
            if soil.nitrogen < -1e-6 || soil.phosphorus < -1e-6 || soil.potassium < -1e-6 {
                return Err("soil nutrients negative".to_string());
            }
        }
        Ok(())
    }

    fn check_network_integrity(&self) -> Result<(), String> {
        for (a, b, _) in self.network.links() {
            let a_alive = self.plant(a).is_some_and(|p| p.alive);
            let b_alive = self.plant(b).is_some_and(|p| p.alive);
            if !a_alive || !b_alive {
                return Err(format!("network link {:?}-{:?} has a dead endpoint", a, b));
            }
            if !self.network.has_link(b, a) {
                return Err(format!("network link {:?}-{:?} is not symmetric", a, b));
            }
        }
        Ok(())
    }

    fn check_timers(&self) -> Result<(), String> {
        for egg in &self.eggs {
            if egg.timer > egg.hatch_period {
                return Err(format!("egg {} timer past its threshold", egg.id));
            }
        }
        for item in &self.decay_items {
            if item.timer > item.decay_period {
                return Err("decay item timer past its threshold".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SimConfig;
    use crate::world::World;

    #[test]
    fn fresh_world_passes_checks() {
        let mut config = SimConfig::default();
        config.world.initial_entities = 10;
        config.world.initial_plants = 10;
        let world = World::new_seeded(config).unwrap();
        assert!(world.check_invariants().is_ok());
    }

    #[test]
    fn corrupted_energy_is_caught() {
        let mut config = SimConfig::default();
        config.world.initial_entities = 2;
        let mut world = World::new_seeded(config).unwrap();
        world.entities[0].metabolism.energy = f64::NAN;
        assert!(world.check_invariants().is_err());
    }

    #[test]
    fn grid_desync_is_caught() {
        let mut config = SimConfig::default();
        config.world.initial_entities = 2;
        let mut world = World::new_seeded(config).unwrap();
        let pos = world.entities[0].position;
        let id = world.entities[0].identity.id;
        world.grid.remove_entity(id, &pos);
        assert!(world.check_invariants().is_err());
    }
}

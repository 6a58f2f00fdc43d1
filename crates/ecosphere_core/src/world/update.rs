//! The master tick: fifteen phases in fixed order. No phase observes
//! mutations made by a later phase within the same tick; parallel regions
//! write only disjoint per-element slots and hand aggregates back to the
//! driver thread for in-order application.

use super::World;
use crate::brain::{self, SensoryInputs};
use crate::clock::TimeOfDay;
use crate::dispersal;
use crate::error::SimError;
use crate::events::event;
use crate::flora::{self, ReproductionAction};
use crate::grid::Biome;
use crate::mycorrhiza::PlantView;
use crate::physics::{self, Body};
use crate::reproduction;
use crate::rng::StreamTag;
use crate::signals::{Signal, SignalKind};
use crate::society::{castes, hive, warfare};
use crate::species::{Member, Realm};
use crate::pressure::WorldIndicators;
use ecosphere_data::{
    CasteStatus, ChemicalSignalKind, Classification, Colony, DeathCause, Dna, Egg, Entity,
    EntityId, EventCategory, EventPayload, Formation, GrainKind, HiveMind, PlantId, PoolKind,
    Position, ReproStatus, ReproductionMode, Severity, SpeciesId, TraitId,
};
use rand::Rng;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

impl World {
    /// Advance the simulation one tick.
    ///
    /// Subsystem errors are contained per phase and logged as
    /// severity-error events; only core-invariant violations return `Err`.
    pub fn step(&mut self) -> Result<(), SimError> {
        // Phase 1: clock and season advance.
        self.clock.advance();
        let tick = self.clock.tick;
        let span = tracing::debug_span!("tick", tick);
        let _guard = span.enter();

        self.contained("pressures", Self::phase_pressures);
        self.contained("entities", Self::phase_entity_update);
        self.contained("plants", Self::phase_plant_update);
        self.contained("dispersal", Self::phase_wind_and_grains);
        self.contained("physics", Self::phase_physics);
        self.contained("signals", Self::phase_communication);
        self.contained("society", Self::phase_civilization);
        self.contained("emergence", Self::phase_emergent_behavior);
        self.contained("reproduction", Self::phase_reproduction);
        self.contained("speciation", Self::phase_population);
        self.contained("neural", Self::phase_neural_decisions);
        self.contained("warfare", Self::phase_warfare);
        self.contained("decay", Self::phase_boundary_and_decay);
        self.contained("statistics", Self::phase_statistics);

        if self.config.world.check_invariants {
            if let Err(violation) = self.check_invariants() {
                self.events.publish(event(
                    tick,
                    EventCategory::System,
                    Severity::Fatal,
                    EventPayload::InvariantViolation {
                        message: violation.clone(),
                    },
                ));
                return Err(SimError::Invariant(violation));
            }
        }
        Ok(())
    }

    fn contained(&mut self, phase: &'static str, f: fn(&mut Self) -> anyhow::Result<()>) {
        if let Err(e) = f(self) {
            tracing::warn!(phase, error = %e, "subsystem error contained");
            self.events.publish(event(
                self.clock.tick,
                EventCategory::System,
                Severity::Error,
                EventPayload::SubsystemError {
                    phase: phase.to_string(),
                    message: e.to_string(),
                },
            ));
        }
    }

    // ------------------------------------------------------------------
    // Phase 2: environmental pressures.
    // ------------------------------------------------------------------
    fn phase_pressures(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let mut rng = self.rng.stream(tick, StreamTag::Pressure);

        for kind in self.pressures.retire(tick) {
            self.events.publish(event(
                tick,
                EventCategory::System,
                Severity::Info,
                EventPayload::PressureEnded {
                    kind: kind.name().to_string(),
                },
            ));
        }

        let indicators = WorldIndicators {
            population: self.live_entity_count(),
            plant_count: self.live_plant_count(),
            species_richness: self.species.active_count(Realm::Fauna),
            civilization_structures: self.colonies.iter().map(|c| c.territory.len()).sum(),
        };
        if let Some(pressure) = self.pressures.maybe_activate(
            &indicators,
            &self.config.pressure,
            self.config.world.width,
            self.config.world.height,
            tick,
            &mut rng,
        ) {
            tracing::info!(kind = pressure.kind.name(), severity = pressure.severity, "pressure activated");
            self.events.publish(event(
                tick,
                EventCategory::System,
                Severity::Warning,
                EventPayload::PressureStarted {
                    kind: pressure.kind.name().to_string(),
                    severity: pressure.severity,
                },
            ));
        }

        // Apply cell-level effects: temperature tracks biome + season +
        // pressure shift; water relaxes toward the biome baseline; soil
        // depletion is withdrawn evenly.
        let season_offset = self.clock.season().temperature_offset();
        for cy in 0..self.grid.rows {
            for cx in 0..self.grid.cols {
                let center = self.grid.cell_center(cx, cy);
                let mut shift = 0.0f32;
                let mut depletion = 0.0f32;
                let mut water_loss = 0.0f32;
                for p in self.pressures.active.iter().filter(|p| p.affects(&center)) {
                    let effects = p.effects();
                    shift += effects.temperature_shift;
                    depletion += effects.soil_depletion;
                    water_loss += effects.water_loss;
                }
                let cell = self.grid.cell_mut(cx, cy);
                cell.temperature = cell.biome.base_temperature() + season_offset + shift;
                cell.water =
                    (cell.water + (cell.biome.base_water() - cell.water) * 0.05 - water_loss)
                        .clamp(0.0, 1.0);
                if depletion > 0.0 {
                    cell.soil.withdraw(depletion, depletion, depletion);
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 3: per-entity update (parallel propose, serial apply).
    // ------------------------------------------------------------------
    fn phase_entity_update(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let night = self.clock.time_of_day() == TimeOfDay::Night;

        // Pass A: read-only context per entity.
        struct EntityCtx {
            flee: (f64, f64),
            pressure_drain: f64,
            movement_penalty: f64,
            stress: f64,
        }

        let grid = &self.grid;
        let signals = &self.signals;
        let pressures = &self.pressures;
        let contexts: Vec<Option<EntityCtx>> = self
            .entities
            .par_iter()
            .map(|e| {
                if !e.metabolism.alive {
                    return None;
                }
                let biome = grid.cell_at(&e.position).biome;

                let mut flee = (0.0, 0.0);
                for (kind, strength, origin) in
                    signals.heard_by(e.identity.id, &e.position, biome, tick)
                {
                    match kind {
                        SignalKind::Alert | SignalKind::Distress => {
                            let dx = e.position.x - origin.x;
                            let dy = e.position.y - origin.y;
                            let d = (dx * dx + dy * dy).sqrt().max(1e-6);
                            let pull = f64::from(strength) * 0.3;
                            flee.0 += dx / d * pull;
                            flee.1 += dy / d * pull;
                        }
                        SignalKind::FoodFound => {
                            let dx = origin.x - e.position.x;
                            let dy = origin.y - e.position.y;
                            let d = (dx * dx + dy * dy).sqrt().max(1e-6);
                            let pull = f64::from(strength) * 0.1;
                            flee.0 += dx / d * pull;
                            flee.1 += dy / d * pull;
                        }
                        _ => {}
                    }
                }

                let mut drain = 0.0;
                let mut penalty = 0.0;
                for p in pressures.active.iter().filter(|p| p.affects(&e.position)) {
                    let effects = p.effects();
                    drain += effects.energy_drain;
                    penalty += effects.movement_penalty;
                }

                Some(EntityCtx {
                    flee,
                    pressure_drain: drain,
                    movement_penalty: penalty.min(0.9),
                    stress: biome_stress(biome, e),
                })
            })
            .collect();

        // Pass B: disjoint per-entity writes.
        let deaths: Vec<Option<(EntityId, u64, DeathCause, Position)>> = self
            .entities
            .par_iter_mut()
            .zip(contexts.par_iter())
            .map(|(e, ctx)| {
                let Some(ctx) = ctx else { return None };

                e.metabolism.age += 1;

                let traits = &e.traits;
                let size = f64::from(traits.get(TraitId::Size));
                let endurance = f64::from(traits.get(TraitId::Endurance));
                let efficiency = f64::from(traits.get(TraitId::EnergyEfficiency));
                let activity = e.velocity.magnitude();

                let mut cost = 0.35 + 0.2 * (size + 1.0);
                cost *= 1.0 - 0.12 * endurance;
                cost *= 1.0 - 0.15 * efficiency;
                cost += 0.2 * activity;
                if night {
                    cost *= 0.9; // biorhythm: resting metabolism
                }
                cost += ctx.stress;
                cost += ctx.pressure_drain;

                e.velocity.vx = e.velocity.vx * (1.0 - ctx.movement_penalty) + ctx.flee.0;
                e.velocity.vy = e.velocity.vy * (1.0 - ctx.movement_penalty) + ctx.flee.1;

                e.metabolism.energy =
                    (e.metabolism.energy - cost).clamp(0.0, e.metabolism.energy_cap);

                if e.metabolism.energy <= 0.0 {
                    e.metabolism.alive = false;
                    e.metabolism.died_tick = Some(tick);
                    return Some((
                        e.identity.id,
                        e.metabolism.age,
                        DeathCause::Starvation,
                        e.position,
                    ));
                }
                if e.metabolism.age > e.metabolism.max_age {
                    e.metabolism.alive = false;
                    e.metabolism.died_tick = Some(tick);
                    return Some((
                        e.identity.id,
                        e.metabolism.age,
                        DeathCause::OldAge,
                        e.position,
                    ));
                }
                None
            })
            .collect();

        for death in deaths.into_iter().flatten() {
            let (id, age, cause, position) = death;
            let mut ev = event(
                tick,
                EventCategory::Entity,
                Severity::Info,
                EventPayload::Death { id, age, cause },
            );
            ev.position = Some(position);
            self.events.publish(ev);
        }

        self.phase_feeding()?;
        Ok(())
    }

    /// Serial feeding pass: molecular metabolism resolved against plants,
    /// prey, and soil in entity-id order.
    fn phase_feeding(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let mut kills: Vec<(EntityId, EntityId)> = Vec::new(); // (predator, prey)

        for i in 0..self.entities.len() {
            if !self.entities[i].metabolism.alive {
                continue;
            }
            let classification = self.entities[i].classification;
            let position = self.entities[i].position;
            let hungry = self.entities[i].metabolism.energy
                < self.entities[i].metabolism.energy_cap * 0.9;
            if !hungry {
                continue;
            }

            match classification {
                Classification::Herbivore | Classification::Omnivore => {
                    let plants = &self.plants;
                    let plant_index = &self.plant_index;
                    let targets = self.grid.plants_within(&position, 1.5, |pid| {
                        plant_index.get(&pid).map(|&idx| plants[idx].position)
                    });
                    if let Some(&target) = targets.first() {
                        let bite = {
                            let plant = &mut self.plants[self.plant_index[&target]];
                            if !plant.alive {
                                0.0
                            } else {
                                let bite = plant.energy.min(4.0);
                                plant.energy -= bite;
                                if plant.energy <= 0.0 && plant.size < 0.2 {
                                    plant.alive = false;
                                }
                                bite
                            }
                        };
                        let eater = &mut self.entities[i];
                        let gain = bite
                            * (0.6 + 0.2 * f64::from(eater.traits.get(TraitId::EnergyEfficiency)));
                        eater.metabolism.energy =
                            (eater.metabolism.energy + gain).min(eater.metabolism.energy_cap);
                    }
                }
                Classification::Carnivore => {
                    let entities = &self.entities;
                    let entity_index = &self.entity_index;
                    let nearby = self.grid.entities_within(&position, 1.2, |eid| {
                        entity_index.get(&eid).map(|&idx| entities[idx].position)
                    });
                    let me = &self.entities[i];
                    let my_size = me.traits.get(TraitId::Size);
                    let prey = nearby.into_iter().find(|&eid| {
                        entity_index.get(&eid).is_some_and(|&idx| {
                            let other = &entities[idx];
                            other.identity.id != me.identity.id
                                && other.metabolism.alive
                                && other.identity.species != me.identity.species
                                && other.traits.get(TraitId::Size) < my_size
                        })
                    });
                    if let Some(prey_id) = prey {
                        kills.push((self.entities[i].identity.id, prey_id));
                    }
                }
                Classification::Decomposer | Classification::Microbe => {
                    let cell = self.grid.cell_at_mut(&position);
                    let meal = cell.organic_matter.min(0.4);
                    cell.organic_matter -= meal;
                    let eater = &mut self.entities[i];
                    eater.metabolism.energy = (eater.metabolism.energy + f64::from(meal) * 8.0)
                        .min(eater.metabolism.energy_cap);
                }
            }
        }

        for (predator_id, prey_id) in kills {
            let Some(prey_idx) = self.entity_index.get(&prey_id).copied() else {
                continue;
            };
            if !self.entities[prey_idx].metabolism.alive {
                continue;
            }
            let prey_energy = self.entities[prey_idx].metabolism.energy;
            let prey_defense = self.entities[prey_idx].traits.get(TraitId::Defense);
            let Some(pred_idx) = self.entity_index.get(&predator_id).copied() else {
                continue;
            };
            let attack = self.entities[pred_idx].traits.get(TraitId::Aggression)
                + self.entities[pred_idx].traits.get(TraitId::Size);
            if attack <= prey_defense {
                continue;
            }

            let prey = &mut self.entities[prey_idx];
            prey.metabolism.alive = false;
            prey.metabolism.died_tick = Some(tick);
            let prey_age = prey.metabolism.age;
            let prey_pos = prey.position;

            let predator = &mut self.entities[pred_idx];
            predator.metabolism.energy = (predator.metabolism.energy + prey_energy * 0.5)
                .min(predator.metabolism.energy_cap);

            let mut ev = event(
                tick,
                EventCategory::Entity,
                Severity::Info,
                EventPayload::Death {
                    id: prey_id,
                    age: prey_age,
                    cause: DeathCause::Predation,
                },
            );
            ev.position = Some(prey_pos);
            self.events.publish(ev);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 4: plant update, network, pollination service.
    // ------------------------------------------------------------------
    fn phase_plant_update(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let season = self.clock.season();
        let mut rng = self.rng.stream(tick, StreamTag::Flora);

        // Growth (serial: plants contend for shared cell soil).
        for i in 0..self.plants.len() {
            if !self.plants[i].alive {
                continue;
            }
            let plant = &mut self.plants[i];
            let cell = self.grid.cell_at_mut(&plant.position);
            flora::grow(plant, cell, season, &self.config.flora);
        }

        // Network maintenance.
        let views: Vec<PlantView> = self
            .plants
            .iter()
            .map(|p| PlantView {
                id: p.id,
                kind: p.kind,
                energy: p.energy,
                energy_cap: f64::from(flora::profile(p.kind).reproduction_threshold) * 2.0,
                alive: p.alive,
            })
            .collect();

        if tick % self.config.flora.link_interval == 0 {
            let grid = &self.grid;
            let plants = &self.plants;
            let plant_index = &self.plant_index;
            let radius = self.config.flora.link_radius;
            self.network.form_links(
                &views,
                |pid| {
                    let Some(&idx) = plant_index.get(&pid) else {
                        return Vec::new();
                    };
                    grid.plants_within(&plants[idx].position, radius, |other| {
                        plant_index.get(&other).map(|&i| plants[i].position)
                    })
                },
                &self.config.flora,
                tick,
            );
        }
        self.network.update_links(&views);

        for transfer in self.network.share_resources(&views, &self.config.flora) {
            if let Some(donor) = self.plant_mut(transfer.from) {
                donor.energy -= transfer.amount;
            }
            if let Some(recipient) = self.plant_mut(transfer.to) {
                recipient.energy += transfer.amount;
            }
        }

        // Chemical signalling: stressed plants warn, flush ones announce.
        for i in 0..self.plants.len() {
            let plant = &self.plants[i];
            if !plant.alive {
                continue;
            }
            let threshold = flora::profile(plant.kind).reproduction_threshold;
            if plant.energy < threshold * 0.1 {
                self.network
                    .emit_signal(plant.id, ChemicalSignalKind::NutrientNeeded, tick);
            } else if plant.energy > threshold {
                self.network
                    .emit_signal(plant.id, ChemicalSignalKind::NutrientAvailable, tick);
            }
        }
        let heard = self.network.propagate_signals(&self.config.flora);
        let mut hearers: Vec<&PlantId> = heard.keys().collect();
        hearers.sort_unstable();
        for plant_id in hearers {
            let Some(&idx) = self.plant_index.get(plant_id) else {
                continue;
            };
            let plant = &mut self.plants[idx];
            if !plant.alive {
                continue;
            }
            for signal in &heard[plant_id] {
                match signal.kind {
                    // A neighbor's surplus primes growth.
                    ChemicalSignalKind::NutrientAvailable => {
                        plant.energy += 0.2 * f64::from(signal.strength);
                    }
                    // Warned plants defer reproduction a little.
                    ChemicalSignalKind::Threat => {
                        plant.reproduction_timer = plant.reproduction_timer.saturating_add(1);
                    }
                    _ => {}
                }
            }
        }

        // Reproduction: pollen into the grain pool, buds locally.
        let mut actions: Vec<(PlantId, ReproductionAction)> = Vec::new();
        for plant in self.plants.iter().filter(|p| p.alive) {
            let roll: f32 = rng.gen();
            if let Some(action) = flora::reproduction_action(plant, season, roll) {
                actions.push((plant.id, action));
            }
        }

        let mut grain_rejections = 0usize;
        for (plant_id, action) in actions {
            let Some(idx) = self.plant_index.get(&plant_id).copied() else {
                continue;
            };
            let profile = flora::profile(self.plants[idx].kind);
            match action {
                ReproductionAction::ReleasePollen | ReproductionAction::ReleaseSeed => {
                    if self.grains.len() >= self.config.wind.max_grains {
                        grain_rejections += 1;
                        continue;
                    }
                    let id = self.alloc_grain_id();
                    let plant = &mut self.plants[idx];
                    let mut grain = if action == ReproductionAction::ReleasePollen {
                        dispersal::release_pollen(plant, id, tick, &mut rng)
                    } else {
                        dispersal::release_seed(plant, id, tick, &mut rng)
                    };
                    // A pollinated parent's next seed carries the mixed
                    // genetics, not a pure clone.
                    if action == ReproductionAction::ReleaseSeed {
                        if let Some(pollen) = plant.pending_pollen.take() {
                            grain.genetics = reproduction::offspring_dna(
                                &plant.dna,
                                &pollen,
                                &self.config.genetics,
                                &self.pressures.mutation_bias_at(
                                    &plant.position,
                                    self.config.genetics.pressure_bias_cap,
                                ),
                                &mut rng,
                            );
                        }
                    }
                    plant.energy -= profile.reproduction_threshold * 0.3;
                    plant.reproduction_timer = profile.reproduction_cooldown;
                    self.grains.push(grain);
                }
                ReproductionAction::Bud => {
                    let parent = &mut self.plants[idx];
                    parent.energy -= profile.reproduction_threshold * 0.5;
                    parent.reproduction_timer = profile.reproduction_cooldown;
                    let kind = parent.kind;
                    let species = parent.species;
                    let offset_angle: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
                    let position = Position::new(
                        parent.position.x + offset_angle.cos() * 1.5,
                        parent.position.y + offset_angle.sin() * 1.5,
                    );
                    // Pollinated parents mix the deposited genetics in.
                    let dna = match parent.pending_pollen.take() {
                        Some(pollen) => {
                            reproduction::offspring_dna(
                                &parent.dna,
                                &pollen,
                                &self.config.genetics,
                                &self.pressures.mutation_bias_at(
                                    &position,
                                    self.config.genetics.pressure_bias_cap,
                                ),
                                &mut rng,
                            )
                        }
                        None => reproduction::clone_dna(
                            &parent.dna,
                            &self.config.genetics,
                            &self.pressures
                                .mutation_bias_at(&position, self.config.genetics.pressure_bias_cap),
                            &mut rng,
                        ),
                    };
                    self.spawn_plant(kind, dna, position, species);
                }
            }
        }

        // One warning per tick regardless of how many releases bounced.
        if grain_rejections > 0 {
            self.events.publish(event(
                tick,
                EventCategory::System,
                Severity::Warning,
                EventPayload::PoolEviction {
                    pool: PoolKind::Grains,
                    dropped: grain_rejections,
                },
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 5: wind field, grain transport, seed banks.
    // ------------------------------------------------------------------
    fn phase_wind_and_grains(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let mut wind_rng = self.rng.stream(tick, StreamTag::Wind);
        let season_mult = self.clock.season().wind_multiplier();
        self.wind.step(
            tick,
            season_mult,
            &self.config.wind,
            self.config.world.width,
            self.config.world.height,
            &mut wind_rng,
        );

        // Parallel transport: each grain has its own derived stream.
        let wind = &self.wind;
        let grid = &self.grid;
        let entities = &self.entities;
        let entity_index = &self.entity_index;
        let config = &self.config.wind;
        let hub = self.rng;
        self.grains.par_iter_mut().for_each(|grain| {
            let mut rng = hub.element_stream(tick, StreamTag::Dispersal, grain.id.0);
            let sample = wind.sample(&grain.position);
            let aquatic = grid.cell_at(&grain.position).biome.is_aquatic();
            let carrier_nearby = matches!(
                grain.kind,
                GrainKind::Seed(ecosphere_data::SeedMechanism::Animal)
            ) && !grid
                .entities_within(&grain.position, 1.5, |eid| {
                    entity_index.get(&eid).map(|&i| entities[i].position)
                })
                .is_empty();
            dispersal::transport(grain, sample, aquatic, carrier_nearby, config, &mut rng);
        });

        // Serial resolution in id order: deposit, settle, expire.
        let mut rng = self.rng.stream(tick, StreamTag::Dispersal);
        let mut remaining = Vec::with_capacity(self.grains.len());
        let mut bank_overflow = 0usize;
        for mut grain in std::mem::take(&mut self.grains) {
            if grain.viability <= 0.0 || !self.grid.contains(&grain.position) {
                continue;
            }

            if matches!(grain.kind, GrainKind::Pollen) {
                let plants = &self.plants;
                let plant_index = &self.plant_index;
                let candidates =
                    self.grid
                        .plants_within(&grain.position, dispersal::DEPOSIT_RADIUS, |pid| {
                            plant_index.get(&pid).map(|&i| plants[i].position)
                        });
                let target = candidates.into_iter().find(|pid| {
                    plant_index
                        .get(pid)
                        .is_some_and(|&i| dispersal::pollinates(&grain, &plants[i]))
                });
                if let Some(target_id) = target {
                    let source_plant = grain.source_plant;
                    let genetics = grain.genetics.clone();
                    let plant = &mut self.plants[self.plant_index[&target_id]];
                    plant.pending_pollen = Some(Box::new(genetics));
                    let mut ev = event(
                        tick,
                        EventCategory::Entity,
                        Severity::Info,
                        EventPayload::CrossPollination {
                            source_plant,
                            target_plant: target_id,
                        },
                    );
                    ev.position = Some(plant.position);
                    self.events.publish(ev);
                    continue;
                }
            } else if dispersal::should_settle(&grain, tick, &mut rng) {
                let capacity = self.config.flora.seed_bank_capacity;
                let cell = self.grid.cell_at_mut(&grain.position);
                if !dispersal::bank_seed(cell, &grain, capacity, tick) {
                    bank_overflow += 1;
                }
                continue;
            }

            grain.dormant = false;
            remaining.push(grain);
        }
        self.grains = remaining;

        if bank_overflow > 0 {
            self.events.publish(event(
                tick,
                EventCategory::System,
                Severity::Warning,
                EventPayload::PoolEviction {
                    pool: PoolKind::SeedBank,
                    dropped: bank_overflow,
                },
            ));
        }

        // Germination: at most one seed per cell per tick.
        let light = self.clock.light_level();
        let mut germinations: Vec<(usize, usize)> = Vec::new(); // (cell index, seed index)
        for idx in 0..self.grid.cells.len() {
            let cell = &self.grid.cells[idx];
            if let Some(seed_idx) = cell
                .seed_bank
                .iter()
                .position(|s| dispersal::can_germinate(s, cell, light))
            {
                germinations.push((idx, seed_idx));
            }
        }
        for (cell_idx, seed_idx) in germinations {
            let seed = self.grid.cells[cell_idx].seed_bank.remove(seed_idx);
            let cx = cell_idx % self.grid.cols;
            let cy = cell_idx / self.grid.cols;
            let center = self.grid.cell_center(cx, cy);
            let position = Position::new(
                center.x + rng.gen_range(-1.0..1.0),
                center.y + rng.gen_range(-1.0..1.0),
            );
            if let Some(plant_id) =
                self.spawn_plant(seed.source_type, seed.genetics, position, seed.species)
            {
                let mut ev = event(
                    tick,
                    EventCategory::Entity,
                    Severity::Info,
                    EventPayload::Germination { plant: plant_id },
                );
                ev.position = Some(position);
                self.events.publish(ev);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 6: physics integration and collision resolution.
    // ------------------------------------------------------------------
    fn phase_physics(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let base_friction = self.config.physics.base_friction;
        let max_speed = self.config.physics.max_speed;
        let width = f64::from(self.config.world.width);
        let height = f64::from(self.config.world.height);

        let old_positions: Vec<(EntityId, Position, bool)> = self
            .entities
            .iter()
            .map(|e| (e.identity.id, e.position, e.metabolism.alive))
            .collect();

        // Parallel integration; the grid is read-only here.
        let grid = &self.grid;
        self.entities.par_iter_mut().for_each(|e| {
            if !e.metabolism.alive {
                return;
            }
            let friction =
                (base_friction * grid.cell_at(&e.position).biome.friction_multiplier()).min(0.95);
            physics::integrate(&mut e.position, &mut e.velocity, friction, max_speed, 1.0);

            // Wall bounce.
            if e.position.x < 0.0 || e.position.x >= width {
                e.velocity.vx = -e.velocity.vx * 0.5;
            }
            if e.position.y < 0.0 || e.position.y >= height {
                e.velocity.vy = -e.velocity.vy * 0.5;
            }
            e.position.x = e.position.x.clamp(0.0, width - 1e-6);
            e.position.y = e.position.y.clamp(0.0, height - 1e-6);
        });

        // Serial grid sync.
        for (id, old_pos, alive) in &old_positions {
            if !alive {
                continue;
            }
            if let Some(e) = self.entity(*id) {
                let new_pos = e.position;
                self.grid.move_entity(*id, old_pos, &new_pos);
            }
        }

        // Collision detection and resolution on live bodies, in id order.
        let mut bodies: Vec<Body> = self
            .entities
            .iter()
            .filter(|e| e.metabolism.alive)
            .map(|e| Body {
                id: e.identity.id,
                position: e.position,
                velocity: e.velocity,
                radius: e.radius(),
                mass: e.mass(),
            })
            .collect();

        let records = physics::resolve_collisions(
            &mut bodies,
            self.config.world.cell_size,
            self.config.physics.restitution,
        );

        for body in &bodies {
            if let Some(&idx) = self.entity_index.get(&body.id) {
                let old_pos = self.entities[idx].position;
                let e = &mut self.entities[idx];
                e.position = Position::new(
                    body.position.x.clamp(0.0, width - 1e-6),
                    body.position.y.clamp(0.0, height - 1e-6),
                );
                e.velocity = body.velocity;
                let new_pos = e.position;
                self.grid.move_entity(body.id, &old_pos, &new_pos);
            }
        }

        for record in records {
            let mut ev = event(
                tick,
                EventCategory::Physics,
                Severity::Info,
                EventPayload::Collision {
                    a: record.a,
                    b: record.b,
                    overlap: record.overlap,
                },
            );
            ev.position = Some(record.midpoint);
            self.events.publish(ev);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 7: communication.
    // ------------------------------------------------------------------
    fn phase_communication(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let mut rng = self.rng.stream(tick, StreamTag::Signals);
        let duration = self.config.signals.default_duration;

        let mut to_emit: Vec<Signal> = Vec::new();
        for e in self.entities.iter().filter(|e| e.metabolism.alive) {
            let traits = &e.traits;
            let energy_ratio = e.metabolism.energy / e.metabolism.energy_cap;
            let range = 6.0 + 4.0 * f64::from(traits.get(TraitId::Vision) + 1.0);

            let kind = if energy_ratio < 0.15 {
                Some(SignalKind::Distress)
            } else if traits.get(TraitId::Territorial) > 0.6 && rng.gen_bool(0.05) {
                Some(SignalKind::Territorial)
            } else if traits.get(TraitId::Aggression) > 0.7 && rng.gen_bool(0.03) {
                Some(SignalKind::Aggression)
            } else if matches!(e.reproduction, ReproStatus::Ready)
                && energy_ratio > 0.7
                && rng.gen_bool(0.05)
            {
                Some(SignalKind::MatingCall)
            } else if energy_ratio > 0.85 && rng.gen_bool(0.02) {
                Some(SignalKind::FoodFound)
            } else {
                None
            };

            if let Some(kind) = kind {
                to_emit.push(Signal {
                    kind,
                    origin: e.identity.id,
                    position: e.position,
                    strength: 1.0,
                    range,
                    emitted_tick: tick,
                    duration,
                });
            }
        }

        // Predator alarm: prey that can see a bigger aggressive neighbor
        // raises an alert.
        let entities = &self.entities;
        let entity_index = &self.entity_index;
        for e in entities.iter().filter(|e| e.metabolism.alive) {
            let vision_range = 3.0 + 3.0 * f64::from(e.traits.get(TraitId::Vision) + 1.0);
            let threats = self.grid.entities_within(&e.position, vision_range, |eid| {
                entity_index.get(&eid).map(|&i| entities[i].position)
            });
            let threatened = threats.iter().any(|tid| {
                entity_index.get(tid).is_some_and(|&i| {
                    let other = &entities[i];
                    other.metabolism.alive
                        && other.identity.id != e.identity.id
                        && other.classification == Classification::Carnivore
                        && other.traits.get(TraitId::Size) > e.traits.get(TraitId::Size)
                })
            });
            if threatened && e.classification != Classification::Carnivore {
                to_emit.push(Signal {
                    kind: SignalKind::Alert,
                    origin: e.identity.id,
                    position: e.position,
                    strength: 1.0,
                    range: 8.0,
                    emitted_tick: tick,
                    duration,
                });
            }
        }

        let mut evicted = 0;
        for signal in to_emit {
            evicted += self.signals.emit(signal, self.config.signals.max_signals);
        }
        if evicted > 0 {
            self.events.publish(event(
                tick,
                EventCategory::System,
                Severity::Warning,
                EventPayload::PoolEviction {
                    pool: PoolKind::Signals,
                    dropped: evicted,
                },
            ));
        }
        self.signals.retire(tick);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 8: civilization, castes, hive minds.
    // ------------------------------------------------------------------
    fn phase_civilization(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        self.try_form_colonies()?;
        self.maintain_colonies(tick)?;
        Ok(())
    }

    fn try_form_colonies(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        if self.colonies.len() >= self.config.colony.max_colonies {
            return Ok(());
        }

        // Candidates: eligible founders not already in a colony, id order.
        let candidates: Vec<(EntityId, Position)> = self
            .entities
            .iter()
            .filter(|e| {
                e.metabolism.alive
                    && castes::eligible_founder(&e.traits, e.caste.is_some(), &self.config.colony)
            })
            .map(|e| (e.identity.id, e.position))
            .collect();

        let mut claimed: HashSet<EntityId> = HashSet::new();
        let radius = self.config.colony.formation_radius;

        for &(seed_id, seed_pos) in &candidates {
            if claimed.contains(&seed_id) {
                continue;
            }
            let group: Vec<EntityId> = candidates
                .iter()
                .filter(|(id, pos)| !claimed.contains(id) && pos.distance_to(&seed_pos) <= radius)
                .map(|(id, _)| *id)
                .collect();
            if group.len() < self.config.colony.min_members {
                continue;
            }

            // Elect the queen, then order members queen-first for caste
            // assignment.
            let queen = group
                .iter()
                .copied()
                .max_by(|a, b| {
                    let ta = castes::queen_score(&self.entities[self.entity_index[a]].traits);
                    let tb = castes::queen_score(&self.entities[self.entity_index[b]].traits);
                    ta.total_cmp(&tb).then(b.cmp(a))
                })
                .expect("group is non-empty");

            let mut ordered: Vec<(EntityId, ecosphere_data::TraitVector)> = Vec::new();
            ordered.push((queen, self.entities[self.entity_index[&queen]].traits));
            for id in group.iter().filter(|id| **id != queen) {
                ordered.push((*id, self.entities[self.entity_index[id]].traits));
            }

            let roles = castes::assign_castes(&ordered, &self.config.colony);
            let colony_id = self.alloc_colony_id();
            let nest = seed_pos;

            let mut caste_counts = [0u32; 8];
            for (entity_id, role) in &roles {
                caste_counts[role.index()] += 1;
                let idx = self.entity_index[entity_id];
                let entity = &mut self.entities[idx];
                entity.caste = Some(CasteStatus {
                    colony: colony_id,
                    role: *role,
                    assigned_tick: tick,
                });
                for (trait_id, delta) in castes::trait_modifiers(*role) {
                    entity.traits.adjust(*trait_id, *delta);
                }
                claimed.insert(*entity_id);
            }

            let members: Vec<EntityId> = roles.iter().map(|(id, _)| *id).collect();
            self.colonies.push(Colony {
                id: colony_id,
                queens: vec![queen],
                members: members.clone(),
                caste_counts,
                nest,
                territory: Vec::new(),
                fitness: 0.0,
                stockpile: 0.0,
                hive: Some(HiveMind::default()),
                formation: Formation::Foraging,
                founded_tick: tick,
            });

            let mut ev = event(
                tick,
                EventCategory::System,
                Severity::Info,
                EventPayload::ColonyFounded {
                    colony: colony_id,
                    queen,
                    member_count: members.len(),
                },
            );
            ev.position = Some(nest);
            self.events.publish(ev);
            tracing::info!(colony = colony_id.0, members = members.len(), "colony founded");

            if self.colonies.len() >= self.config.colony.max_colonies {
                break;
            }
        }
        Ok(())
    }

    fn maintain_colonies(&mut self, tick: u64) -> anyhow::Result<()> {
        let memory_decay = self.config.colony.memory_decay;
        let min_members = self.config.colony.min_members;
        let mut disbanded: Vec<usize> = Vec::new();

        for c_idx in 0..self.colonies.len() {
            // Drop dead members and recompute caste counts.
            let entity_index = &self.entity_index;
            let entities = &self.entities;
            let colony = &mut self.colonies[c_idx];
            colony.members.retain(|id| {
                entity_index
                    .get(id)
                    .is_some_and(|&i| entities[i].metabolism.alive)
            });
            colony.queens.retain(|id| colony.members.contains(id));
            let mut counts = [0u32; 8];
            for id in &colony.members {
                if let Some(&i) = entity_index.get(id) {
                    if let Some(caste) = &entities[i].caste {
                        counts[caste.role.index()] += 1;
                    }
                }
            }
            colony.caste_counts = counts;

            if colony.members.len() < min_members || colony.queens.is_empty() {
                disbanded.push(c_idx);
                continue;
            }

            // Worker tithe feeds the stockpile.
            let mut tithe = 0.0;
            for id in &colony.members {
                if let Some(&i) = entity_index.get(id) {
                    let e = &entities[i];
                    if e.caste.is_some_and(|c| {
                        matches!(
                            c.role,
                            ecosphere_data::CasteRole::Worker | ecosphere_data::CasteRole::Builder
                        )
                    }) {
                        tithe += e.metabolism.energy * 0.01;
                    }
                }
            }
            colony.stockpile += tithe;

            // Territory: a disc of cells around the nest, radius scaling
            // with colony size.
            if tick % self.config.colony.conflict_interval == 0 {
                let cell_radius = ((colony.members.len() as f64).sqrt() as i64 + 1).max(1);
                let (ncx, ncy) = self.grid.cell_of(&colony.nest);
                let mut territory = Vec::new();
                for dy in -cell_radius..=cell_radius {
                    for dx in -cell_radius..=cell_radius {
                        let cx = ncx as i64 + dx;
                        let cy = ncy as i64 + dy;
                        if cx >= 0
                            && cy >= 0
                            && (cx as usize) < self.grid.cols
                            && (cy as usize) < self.grid.rows
                            && dx * dx + dy * dy <= cell_radius * cell_radius
                        {
                            territory.push((cx as u16, cy as u16));
                        }
                    }
                }
                colony.territory = territory;
            }

            // Hive memory: scouts feed sightings, everything decays.
            let scout_sightings: Vec<Position> = colony
                .members
                .iter()
                .filter_map(|id| entity_index.get(id).map(|&i| &entities[i]))
                .filter(|e| {
                    e.caste
                        .is_some_and(|c| c.role == ecosphere_data::CasteRole::Scout)
                })
                .map(|e| e.position)
                .collect();

            let at_war = self
                .conflicts
                .iter()
                .any(|c| c.attacker == colony.id || c.defender == colony.id);
            let stockpile_low = colony.stockpile < 50.0;

            if let Some(hive_mind) = &mut colony.hive {
                hive::decay(hive_mind, memory_decay);
                for pos in &scout_sightings {
                    let plants = &self.plants;
                    let plant_index = &self.plant_index;
                    let found = self.grid.plants_within(pos, 5.0, |pid| {
                        plant_index.get(&pid).map(|&i| plants[i].position)
                    });
                    if found.len() >= 3 {
                        hive::remember_food(hive_mind, *pos, tick);
                    }
                }

                let food_known = hive::best_food(hive_mind).is_some();
                let threatened = hive::near_threat(hive_mind, &colony.nest, 10.0);

                // Weighted vote between the situational default and each
                // caste's inclination.
                let mut votes: Vec<(f32, Formation)> = vec![(
                    1.0,
                    hive::formation_for_purpose(threatened, at_war, food_known, stockpile_low),
                )];
                for id in &colony.members {
                    if let Some(&i) = entity_index.get(id) {
                        let e = &entities[i];
                        let weight = e.traits.get(TraitId::Intelligence).max(0.0);
                        let preference = match e.caste.map(|c| c.role) {
                            Some(ecosphere_data::CasteRole::Soldier) => Formation::Defensive,
                            Some(ecosphere_data::CasteRole::Scout) => Formation::Migration,
                            _ => Formation::Foraging,
                        };
                        votes.push((weight, preference));
                    }
                }
                colony.formation = hive::group_decision(&votes);
            }
        }

        // Colony fitness: mean member fitness plus a territory bonus.
        let fitness_updates: Vec<(usize, f64)> = self
            .colonies
            .iter()
            .enumerate()
            .map(|(i, colony)| {
                let sum: f64 = colony
                    .members
                    .iter()
                    .filter_map(|id| self.entity_fitness(*id))
                    .sum();
                let mean = sum / colony.members.len().max(1) as f64;
                (i, mean + colony.territory.len() as f64 * 0.05)
            })
            .collect();
        for (i, fitness) in fitness_updates {
            self.colonies[i].fitness = fitness;
        }

        // Coordinated movement nudges, applied after colony state settles.
        let mut nudges: Vec<(EntityId, f64, f64)> = Vec::new();
        for colony in &self.colonies {
            for (slot, id) in colony.members.iter().enumerate() {
                if let Some(&i) = self.entity_index.get(id) {
                    let e = &self.entities[i];
                    let offset = hive::formation_offset(colony.formation, slot);
                    let target =
                        Position::new(colony.nest.x + offset.0, colony.nest.y + offset.1);
                    let dx = target.x - e.position.x;
                    let dy = target.y - e.position.y;
                    let d = (dx * dx + dy * dy).sqrt();
                    if d > 2.0 {
                        nudges.push((*id, dx / d * 0.05, dy / d * 0.05));
                    }
                }
            }
        }
        for (id, dvx, dvy) in nudges {
            if let Some(e) = self.entity_mut(id) {
                e.velocity.vx += dvx;
                e.velocity.vy += dvy;
            }
        }

        // Disband in reverse index order so removals stay valid.
        for c_idx in disbanded.into_iter().rev() {
            let colony = self.colonies.remove(c_idx);
            for id in &colony.members {
                if let Some(e) = self.entity_mut(*id) {
                    e.caste = None;
                }
            }
            self.diplomacy.remove_colony(colony.id);
            self.conflicts
                .retain(|c| c.attacker != colony.id && c.defender != colony.id);
            self.events.publish(event(
                tick,
                EventCategory::System,
                Severity::Info,
                EventPayload::ColonyDisbanded { colony: colony.id },
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 9: emergent-behavior discovery.
    // ------------------------------------------------------------------
    fn phase_emergent_behavior(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        if tick % 50 != 0 {
            return Ok(());
        }

        // Herding: a significant moving cohort sharing one heading.
        let moving: Vec<&Entity> = self
            .entities
            .iter()
            .filter(|e| e.metabolism.alive && e.velocity.magnitude() > 0.2)
            .collect();
        if moving.len() >= 10 {
            let (mut sx, mut sy) = (0.0f64, 0.0f64);
            for e in &moving {
                let m = e.velocity.magnitude();
                sx += e.velocity.vx / m;
                sy += e.velocity.vy / m;
            }
            let alignment = (sx * sx + sy * sy).sqrt() / moving.len() as f64;
            if alignment > 0.6 {
                self.events.publish(event(
                    tick,
                    EventCategory::Statistical,
                    Severity::Info,
                    EventPayload::EmergentBehavior {
                        name: "herding".to_string(),
                        participants: moving.len(),
                    },
                ));
            }
        }

        // Foraging trails: sustained food signalling along a shared path.
        let food_signals = self
            .signals
            .signals
            .iter()
            .filter(|s| s.kind == SignalKind::FoodFound)
            .count();
        if food_signals >= 8 {
            self.events.publish(event(
                tick,
                EventCategory::Statistical,
                Severity::Info,
                EventPayload::EmergentBehavior {
                    name: "foraging-trail".to_string(),
                    participants: food_signals,
                },
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 10: reproduction.
    // ------------------------------------------------------------------
    fn phase_reproduction(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let season = self.clock.season();
        let mut rng = self.rng.stream(tick, StreamTag::Reproduction);
        let repro_config = self.config.reproduction.clone();
        let genetics_config = self.config.genetics.clone();

        // Planned outcomes, applied after the scan so the scan sees a
        // consistent population.
        enum Plan {
            Direct {
                a: EntityId,
                b: EntityId,
                dna: Dna,
            },
            Egg {
                parent: EntityId,
                dna: Dna,
            },
            StartGestation {
                mother: EntityId,
                father: EntityId,
            },
            Bud {
                parent: EntityId,
                dna: Dna,
            },
            Fission {
                parent: EntityId,
                dna_a: Dna,
                dna_b: Dna,
            },
        }

        let mut plans: Vec<Plan> = Vec::new();
        let mut paired: HashSet<EntityId> = HashSet::new();

        for i in 0..self.entities.len() {
            let e = &self.entities[i];
            if !e.metabolism.alive || paired.contains(&e.identity.id) {
                continue;
            }
            if !reproduction::eligible(e, &repro_config, season) {
                continue;
            }
            // Caste multiplier scales effective readiness.
            let caste_mult = e
                .caste
                .map_or(1.0, |c| castes::reproductive_multiplier(c.role));
            if caste_mult < 1.0 && rng.gen::<f64>() > caste_mult {
                continue;
            }

            let mode = reproduction::mode_of(e);
            let bias = self
                .pressures
                .mutation_bias_at(&e.position, genetics_config.pressure_bias_cap);
            let rate_mult = self.pressures.mutation_rate_multiplier(&e.position);
            let mut biased_config = genetics_config.clone();
            biased_config.mutation_rate =
                (biased_config.mutation_rate * rate_mult).clamp(0.0, 1.0);

            match mode {
                ReproductionMode::Budding => {
                    if e.metabolism.energy >= repro_config.budding_cost {
                        let dna = reproduction::clone_dna(&e.dna, &biased_config, &bias, &mut rng);
                        paired.insert(e.identity.id);
                        plans.push(Plan::Bud {
                            parent: e.identity.id,
                            dna,
                        });
                    }
                }
                ReproductionMode::Fission => {
                    let dna_a = reproduction::clone_dna(&e.dna, &biased_config, &bias, &mut rng);
                    let dna_b = reproduction::clone_dna(&e.dna, &biased_config, &bias, &mut rng);
                    paired.insert(e.identity.id);
                    plans.push(Plan::Fission {
                        parent: e.identity.id,
                        dna_a,
                        dna_b,
                    });
                }
                ReproductionMode::Direct | ReproductionMode::Egg | ReproductionMode::LiveBirth => {
                    // Mate search within vision range, nearest first.
                    let search = 4.0 + 4.0 * f64::from(e.traits.get(TraitId::Vision) + 1.0);
                    let entities = &self.entities;
                    let entity_index = &self.entity_index;
                    let nearby = self.grid.entities_within(&e.position, search, |eid| {
                        entity_index.get(&eid).map(|&i| entities[i].position)
                    });
                    let partner = nearby.into_iter().find(|pid| {
                        *pid != e.identity.id
                            && !paired.contains(pid)
                            && entity_index.get(pid).is_some_and(|&i| {
                                let other = &entities[i];
                                other.classification == e.classification
                                    && reproduction::eligible(other, &repro_config, season)
                            })
                    });
                    let Some(partner_id) = partner else { continue };
                    let partner_idx = self.entity_index[&partner_id];
                    if !reproduction::compatible(
                        e,
                        &self.entities[partner_idx],
                        &repro_config,
                        &mut rng,
                    ) {
                        continue;
                    }

                    paired.insert(e.identity.id);
                    paired.insert(partner_id);
                    match mode {
                        ReproductionMode::Direct => {
                            let dna = reproduction::offspring_dna(
                                &e.dna,
                                &self.entities[partner_idx].dna,
                                &biased_config,
                                &bias,
                                &mut rng,
                            );
                            plans.push(Plan::Direct {
                                a: e.identity.id,
                                b: partner_id,
                                dna,
                            });
                        }
                        ReproductionMode::Egg => {
                            let dna = reproduction::offspring_dna(
                                &e.dna,
                                &self.entities[partner_idx].dna,
                                &biased_config,
                                &bias,
                                &mut rng,
                            );
                            plans.push(Plan::Egg {
                                parent: e.identity.id,
                                dna,
                            });
                        }
                        ReproductionMode::LiveBirth => {
                            plans.push(Plan::StartGestation {
                                mother: e.identity.id,
                                father: partner_id,
                            });
                        }
                        _ => unreachable!("partner modes only"),
                    }
                }
            }
        }

        for plan in plans {
            match plan {
                Plan::Direct { a, b, dna } => {
                    let (pos, species, classification, generation, share) = {
                        let parent = &self.entities[self.entity_index[&a]];
                        (
                            parent.position,
                            parent.identity.species,
                            parent.classification,
                            parent.identity.generation + 1,
                            parent.metabolism.energy * repro_config.offspring_energy_fraction,
                        )
                    };
                    self.charge_parents(&[a, b], share, tick);
                    self.birth(dna, pos, species, classification, generation, Some(a), Some(b), share);
                }
                Plan::Egg { parent, dna } => {
                    let (pos, species, generation, share) = {
                        let p = &self.entities[self.entity_index[&parent]];
                        (
                            p.position,
                            p.identity.species,
                            p.identity.generation + 1,
                            p.metabolism.energy * repro_config.offspring_energy_fraction,
                        )
                    };
                    self.charge_parents(&[parent], share, tick);
                    let id = self.next_egg_id;
                    self.next_egg_id += 1;
                    self.eggs.push(Egg {
                        id,
                        parent,
                        species,
                        position: pos,
                        dna,
                        generation,
                        timer: 0,
                        hatch_period: repro_config.egg_hatch_period,
                        energy_share: share,
                    });
                }
                Plan::StartGestation { mother, father } => {
                    let father_dna = self.entities[self.entity_index[&father]].dna.clone();
                    let brood = reproduction::brood_size(&mut rng);
                    let mother_ref = &mut self.entities[self.entity_index[&mother]];
                    mother_ref.reproduction = ReproStatus::Gestating {
                        timer: 0,
                        gestation_period: repro_config.gestation_period,
                        brood,
                        partner_dna: Box::new(father_dna),
                        partner: father,
                    };
                    if let Some(f) = self.entity_mut(father) {
                        f.reproduction = ReproStatus::Cooldown {
                            until_tick: tick + repro_config.cooldown_ticks,
                        };
                    }
                }
                Plan::Bud { parent, dna } => {
                    let (pos, species, classification, generation) = {
                        let p = &self.entities[self.entity_index[&parent]];
                        (
                            p.position,
                            p.identity.species,
                            p.classification,
                            p.identity.generation + 1,
                        )
                    };
                    let share = repro_config.budding_cost * 0.5;
                    self.charge_parents(&[parent], repro_config.budding_cost, tick);
                    self.birth(
                        dna,
                        pos,
                        species,
                        classification,
                        generation,
                        Some(parent),
                        None,
                        share,
                    );
                }
                Plan::Fission { parent, dna_a, dna_b } => {
                    let (pos, species, classification, generation, energy) = {
                        let p = &self.entities[self.entity_index[&parent]];
                        (
                            p.position,
                            p.identity.species,
                            p.classification,
                            p.identity.generation + 1,
                            p.metabolism.energy,
                        )
                    };
                    {
                        let p = &mut self.entities[self.entity_index[&parent]];
                        p.metabolism.alive = false;
                        p.metabolism.died_tick = Some(tick);
                    }
                    self.events.publish(event(
                        tick,
                        EventCategory::Entity,
                        Severity::Info,
                        EventPayload::Death {
                            id: parent,
                            age: self.entities[self.entity_index[&parent]].metabolism.age,
                            cause: DeathCause::Fission,
                        },
                    ));
                    let half = energy * 0.5;
                    self.birth(
                        dna_a,
                        Position::new(pos.x - 0.5, pos.y),
                        species,
                        classification,
                        generation,
                        Some(parent),
                        None,
                        half,
                    );
                    self.birth(
                        dna_b,
                        Position::new(pos.x + 0.5, pos.y),
                        species,
                        classification,
                        generation,
                        Some(parent),
                        None,
                        half,
                    );
                }
            }
        }

        // Advance egg timers; hatch at the threshold.
        let mut hatched: Vec<Egg> = Vec::new();
        let mut remaining_eggs = Vec::with_capacity(self.eggs.len());
        for mut egg in std::mem::take(&mut self.eggs) {
            egg.timer += 1;
            if egg.timer >= egg.hatch_period {
                hatched.push(egg);
            } else {
                remaining_eggs.push(egg);
            }
        }
        self.eggs = remaining_eggs;
        for egg in hatched {
            let classification = self
                .entity(egg.parent)
                .map_or(Classification::Herbivore, |p| p.classification);
            self.birth(
                egg.dna,
                egg.position,
                egg.species,
                classification,
                egg.generation,
                Some(egg.parent),
                None,
                egg.energy_share,
            );
        }

        // Advance gestation; deliver at term.
        let mut deliveries: Vec<(EntityId, u8, Box<Dna>)> = Vec::new();
        for e in self.entities.iter_mut().filter(|e| e.metabolism.alive) {
            if let ReproStatus::Gestating {
                timer,
                gestation_period,
                brood,
                partner_dna,
                ..
            } = &mut e.reproduction
            {
                *timer += 1;
                if *timer >= *gestation_period {
                    deliveries.push((e.identity.id, *brood, partner_dna.clone()));
                }
            }
        }
        for (mother_id, brood, father_dna) in deliveries {
            let (pos, species, classification, generation, cap) = {
                let m = &self.entities[self.entity_index[&mother_id]];
                (
                    m.position,
                    m.identity.species,
                    m.classification,
                    m.identity.generation + 1,
                    m.metabolism.energy_cap,
                )
            };
            let mother_dna = self.entities[self.entity_index[&mother_id]].dna.clone();
            let bias = self
                .pressures
                .mutation_bias_at(&pos, genetics_config.pressure_bias_cap);
            let per_child = cap * repro_config.offspring_energy_fraction * 0.5;
            // Parent energy cost scales with brood size.
            let birth_cost = per_child * f64::from(brood);
            {
                let m = &mut self.entities[self.entity_index[&mother_id]];
                m.metabolism.energy = (m.metabolism.energy - birth_cost).max(1.0);
                m.reproduction = ReproStatus::Cooldown {
                    until_tick: tick + repro_config.cooldown_ticks,
                };
            }
            for _ in 0..brood {
                let dna = reproduction::offspring_dna(
                    &mother_dna,
                    &father_dna,
                    &genetics_config,
                    &bias,
                    &mut rng,
                );
                self.birth(
                    dna,
                    pos,
                    species,
                    classification,
                    generation,
                    Some(mother_id),
                    None,
                    per_child,
                );
            }
        }

        // Cooldowns expire back to Ready.
        for e in self.entities.iter_mut() {
            if let ReproStatus::Cooldown { until_tick } = e.reproduction {
                if tick >= until_tick {
                    e.reproduction = ReproStatus::Ready;
                }
            }
        }
        Ok(())
    }

    fn charge_parents(&mut self, parents: &[EntityId], total_cost: f64, tick: u64) {
        let share = total_cost / parents.len() as f64;
        let cooldown = self.config.reproduction.cooldown_ticks;
        for id in parents {
            if let Some(e) = self.entity_mut(*id) {
                e.metabolism.energy = (e.metabolism.energy - share).max(1.0);
                e.reproduction = ReproStatus::Cooldown {
                    until_tick: tick + cooldown,
                };
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn birth(
        &mut self,
        dna: Dna,
        position: Position,
        species: SpeciesId,
        classification: Classification,
        generation: u32,
        parent_a: Option<EntityId>,
        parent_b: Option<EntityId>,
        energy: f64,
    ) {
        let tick = self.clock.tick;
        let inherit = self.config.neural.inherit_weights;
        let parent_brain = if inherit {
            parent_a
                .and_then(|id| self.entity(id))
                .and_then(|p| p.brain.clone())
        } else {
            None
        };

        if let Some(id) = self.spawn_entity(
            dna,
            position,
            species,
            classification,
            generation,
            parent_a,
            parent_b,
            energy.max(10.0),
        ) {
            for parent in [parent_a, parent_b].into_iter().flatten() {
                if let Some(p) = self.entity_mut(parent) {
                    p.metabolism.offspring += 1;
                }
            }
            if let Some(parent_brain) = parent_brain {
                let mut rng = self.rng.element_stream(tick, StreamTag::Neural, id.0);
                let child_brain = brain::inherit(&parent_brain, &self.config.neural, &mut rng);
                if let Some(e) = self.entity_mut(id) {
                    e.brain = Some(Box::new(child_brain));
                }
            }
            let mut ev = event(
                tick,
                EventCategory::Entity,
                Severity::Info,
                EventPayload::Birth {
                    id,
                    parent_a,
                    parent_b,
                    generation,
                },
            );
            ev.position = Some(position);
            self.events.publish(ev);
        }
    }

    // ------------------------------------------------------------------
    // Phase 11: population management and speciation.
    // ------------------------------------------------------------------
    fn phase_population(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;

        // Census every tick; reassignment on the speciation cadence.
        let mut counts: HashMap<SpeciesId, usize> = HashMap::new();
        for e in self.entities.iter().filter(|e| e.metabolism.alive) {
            *counts.entry(e.identity.species).or_insert(0) += 1;
        }
        for p in self.plants.iter().filter(|p| p.alive) {
            *counts.entry(p.species).or_insert(0) += 1;
        }
        let extinct =
            self.species
                .update_counts(&counts, self.config.speciation.extinction_ticks, tick);
        for species in extinct {
            tracing::info!(species = species.0, "species extinct");
            self.events.publish(event(
                tick,
                EventCategory::System,
                Severity::Warning,
                EventPayload::Extinction {
                    species,
                    last_population_tick: tick,
                },
            ));
        }

        if tick % self.config.speciation.interval != 0 {
            return Ok(());
        }

        for realm in [Realm::Fauna, Realm::Flora] {
            let mut members: Vec<Member<'_>> = Vec::new();
            match realm {
                Realm::Fauna => {
                    for e in self.entities.iter_mut().filter(|e| e.metabolism.alive) {
                        let Entity {
                            traits, identity, ..
                        } = e;
                        members.push(Member {
                            traits: &*traits,
                            species: &mut identity.species,
                        });
                    }
                }
                Realm::Flora => {
                    for p in self.plants.iter_mut().filter(|p| p.alive) {
                        members.push(Member {
                            traits: &p.traits,
                            species: &mut p.species,
                        });
                    }
                }
            }
            let outcome =
                self.species
                    .reassign(realm, &mut members, &self.config.speciation, tick);
            drop(members);
            for (species, parent, member_count) in outcome.founded {
                tracing::info!(species = species.0, members = member_count, "speciation");
                self.events.publish(event(
                    tick,
                    EventCategory::System,
                    Severity::Info,
                    EventPayload::Speciation {
                        species,
                        parent,
                        member_count,
                    },
                ));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 12: neural decisions.
    // ------------------------------------------------------------------
    fn phase_neural_decisions(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        let neural_config = self.config.neural.clone();
        let threshold = neural_config.intelligence_threshold;

        // Pass A: read-only sensing.
        let grid = &self.grid;
        let entities = &self.entities;
        let entity_index = &self.entity_index;
        let plants = &self.plants;
        let plant_index = &self.plant_index;
        let signals = &self.signals;

        let inputs: Vec<Option<SensoryInputs>> = self
            .entities
            .par_iter()
            .map(|e| {
                if !e.metabolism.alive || e.traits.get(TraitId::Intelligence) <= threshold {
                    return None;
                }
                let vision_range = 3.0 + 4.0 * f64::from(e.traits.get(TraitId::Vision) + 1.0);
                let neighbors = grid.entities_within(&e.position, vision_range, |eid| {
                    entity_index.get(&eid).map(|&i| entities[i].position)
                });
                let mut same_species = 0usize;
                let mut predators = 0usize;
                for nid in &neighbors {
                    if *nid == e.identity.id {
                        continue;
                    }
                    if let Some(&i) = entity_index.get(nid) {
                        let other = &entities[i];
                        if !other.metabolism.alive {
                            continue;
                        }
                        if other.identity.species == e.identity.species {
                            same_species += 1;
                        }
                        if other.classification == Classification::Carnivore
                            && other.traits.get(TraitId::Size) > e.traits.get(TraitId::Size)
                        {
                            predators += 1;
                        }
                    }
                }

                let food_nearby = grid
                    .plants_within(&e.position, vision_range, |pid| {
                        plant_index.get(&pid).map(|&i| plants[i].position)
                    })
                    .len();

                let biome = grid.cell_at(&e.position).biome;
                let heard_threat = signals
                    .heard_by(e.identity.id, &e.position, biome, tick)
                    .iter()
                    .filter(|(kind, ..)| matches!(kind, SignalKind::Alert | SignalKind::Distress))
                    .map(|(_, s, _)| *s)
                    .fold(0.0f32, f32::max);

                Some(SensoryInputs {
                    vision: ((neighbors.len() as f32) / 8.0).min(1.0),
                    energy: (e.metabolism.energy / e.metabolism.energy_cap) as f32 * 2.0 - 1.0,
                    threat: (predators as f32 * 0.5 + heard_threat).min(1.0),
                    food: ((food_nearby as f32) / 6.0).min(1.0),
                    social: ((same_species as f32) / 8.0).min(1.0),
                })
            })
            .collect();

        // Pass B: disjoint per-entity decide/learn/apply.
        let hub = self.rng;
        self.entities
            .par_iter_mut()
            .zip(inputs.par_iter())
            .for_each(|(e, sensed)| {
                let Some(sensed) = sensed else {
                    // Networks die with the intelligence that carried them.
                    if e.brain.is_some()
                        && (!e.metabolism.alive
                            || e.traits.get(TraitId::Intelligence) <= threshold)
                    {
                        e.brain = None;
                    }
                    return;
                };

                if e.brain.is_none() {
                    let mut rng =
                        hub.element_stream(tick, StreamTag::Neural, e.identity.id.0);
                    e.brain = Some(Box::new(brain::instantiate(
                        e.traits.get(TraitId::Intelligence),
                        &neural_config,
                        &mut rng,
                    )));
                }
                let age = e.metabolism.age;
                let brain_ref = e.brain.as_mut().expect("instantiated above");

                // Learn from the previous decision's outcome before acting:
                // energy gained and threat avoided read straight off the
                // cached inputs.
                if brain_ref.decisions > 0 {
                    let prev_energy = brain_ref.last_inputs[1];
                    let prev_threat = brain_ref.last_inputs[2];
                    let reward = ((sensed.energy - prev_energy) * 2.0
                        + (prev_threat - sensed.threat)
                        + sensed.food * 0.1)
                        .clamp(-1.0, 1.0);
                    let eta = brain::learning_rate(age, &neural_config);
                    brain::learn(brain_ref, reward, eta);
                }

                let decision = brain::decide(brain_ref, sensed.as_array());
                let speed_scale =
                    0.3 + 0.3 * f64::from(e.traits.get(TraitId::Speed) + 1.0);
                e.velocity.vx +=
                    f64::from(decision.move_x) * speed_scale * f64::from(decision.intensity);
                e.velocity.vy +=
                    f64::from(decision.move_y) * speed_scale * f64::from(decision.intensity);
            });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 13: colony warfare.
    // ------------------------------------------------------------------
    fn phase_warfare(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        if tick % self.config.colony.conflict_interval != 0 || self.colonies.len() < 2 {
            return Ok(());
        }
        let mut rng = self.rng.stream(tick, StreamTag::Warfare);

        // Border pressure between every colony pair.
        let territories: Vec<(ecosphere_data::ColonyId, HashSet<(u16, u16)>)> = self
            .colonies
            .iter()
            .map(|c| (c.id, c.territory.iter().copied().collect()))
            .collect();
        for i in 0..territories.len() {
            for j in (i + 1)..territories.len() {
                let overlap = territories[i].1.intersection(&territories[j].1).count();
                self.diplomacy.apply_border_pressure(
                    territories[i].0,
                    territories[j].0,
                    overlap,
                    self.config.colony.border_overlap_threshold,
                );
            }
        }

        // Declarations.
        for i in 0..territories.len() {
            for j in (i + 1)..territories.len() {
                let (a, b) = (territories[i].0, territories[j].0);
                if self
                    .conflicts
                    .iter()
                    .any(|c| (c.attacker == a && c.defender == b) || (c.attacker == b && c.defender == a))
                {
                    continue;
                }
                let diplomacy = self.diplomacy.get(a, b);
                let stockpile_low = self
                    .colonies
                    .iter()
                    .find(|c| c.id == a)
                    .is_some_and(|c| c.stockpile < 50.0);
                if let Some(kind) = warfare::maybe_declare(&diplomacy, stockpile_low, &mut rng) {
                    self.conflicts.push(ecosphere_data::Conflict {
                        attacker: a,
                        defender: b,
                        kind,
                        declared_tick: tick,
                        intensity: diplomacy.trust,
                    });
                    self.events.publish(event(
                        tick,
                        EventCategory::System,
                        Severity::Warning,
                        EventPayload::ConflictDeclared {
                            attacker: a,
                            defender: b,
                            kind,
                        },
                    ));
                    tracing::info!(attacker = a.0, defender = b.0, ?kind, "conflict declared");
                }
            }
        }

        // Battle resolution.
        let conflicts = std::mem::take(&mut self.conflicts);
        let mut continuing = Vec::new();
        for conflict in conflicts {
            let Some(attacker_idx) = self.colonies.iter().position(|c| c.id == conflict.attacker)
            else {
                continue;
            };
            let Some(defender_idx) = self.colonies.iter().position(|c| c.id == conflict.defender)
            else {
                continue;
            };

            fn soldier_stats(world: &World, colony_idx: usize) -> (f64, Vec<EntityId>) {
                let colony = &world.colonies[colony_idx];
                let mut strength = 0.0;
                let mut soldiers = Vec::new();
                for id in &colony.members {
                    if let Some(&i) = world.entity_index.get(id) {
                        let e = &world.entities[i];
                        if e.metabolism.alive
                            && e.caste
                                .is_some_and(|c| c.role == ecosphere_data::CasteRole::Soldier)
                        {
                            strength += f64::from(
                                e.traits.get(TraitId::Aggression)
                                    + e.traits.get(TraitId::Defense)
                                    + e.traits.get(TraitId::Size)
                                    + 3.0,
                            );
                            soldiers.push(*id);
                        }
                    }
                }
                (strength, soldiers)
            }

            let (attack_strength, attacker_soldiers) = soldier_stats(self, attacker_idx);
            let (defense_strength, defender_soldiers) = soldier_stats(self, defender_idx);
            let territory_bonus = self.colonies[defender_idx].territory.len() as f64 * 0.1;

            let outcome = warfare::resolve_battle(
                conflict.kind,
                attack_strength,
                defense_strength,
                territory_bonus,
                attacker_soldiers.len() as u32,
                defender_soldiers.len() as u32,
                &mut rng,
            );

            // Casualties fall on the weakest soldiers first.
            fn fall(world: &mut World, ids: &[EntityId], losses: u32, tick: u64) {
                let mut by_energy: Vec<EntityId> = ids.to_vec();
                by_energy.sort_by(|a, b| {
                    let ea = world.entities[world.entity_index[a]].metabolism.energy;
                    let eb = world.entities[world.entity_index[b]].metabolism.energy;
                    ea.total_cmp(&eb).then(a.cmp(b))
                });
                for id in by_energy.into_iter().take(losses as usize) {
                    let idx = world.entity_index[&id];
                    let e = &mut world.entities[idx];
                    e.metabolism.alive = false;
                    e.metabolism.died_tick = Some(tick);
                    let age = e.metabolism.age;
                    let pos = e.position;
                    let mut ev = event(
                        tick,
                        EventCategory::Entity,
                        Severity::Info,
                        EventPayload::Death {
                            id,
                            age,
                            cause: DeathCause::Battle,
                        },
                    );
                    ev.position = Some(pos);
                    world.events.publish(ev);
                }
            }
            fall(self, &attacker_soldiers, outcome.attacker_losses, tick);
            fall(self, &defender_soldiers, outcome.defender_losses, tick);

            // Decisive outcomes transfer border territory to the winner.
            let mut transferred = 0u32;
            if outcome.decisive {
                let (winner_idx, loser_idx) = if outcome.attacker_wins {
                    (attacker_idx, defender_idx)
                } else {
                    (defender_idx, attacker_idx)
                };
                let take = (self.colonies[loser_idx].territory.len() / 4).min(8);
                let cells: Vec<(u16, u16)> = self.colonies[loser_idx]
                    .territory
                    .drain(..take)
                    .collect();
                transferred = cells.len() as u32;
                self.colonies[winner_idx].territory.extend(cells);
            }

            self.events.publish(event(
                tick,
                EventCategory::System,
                Severity::Warning,
                EventPayload::BattleResolved {
                    attacker: conflict.attacker,
                    defender: conflict.defender,
                    attacker_losses: outcome.attacker_losses,
                    defender_losses: outcome.defender_losses,
                    territory_transferred: transferred,
                },
            ));

            // Skirmishes and raids end after one round; wars grind on while
            // both sides still field soldiers.
            let war_continues = matches!(
                conflict.kind,
                ecosphere_data::ConflictKind::ResourceWar | ecosphere_data::ConflictKind::TotalWar
            ) && outcome.attacker_losses < attacker_soldiers.len() as u32
                && outcome.defender_losses < defender_soldiers.len() as u32
                && !outcome.decisive;
            if war_continues {
                continuing.push(conflict);
            }
        }
        self.conflicts = continuing;

        // Alliance formation and trade.
        for i in 0..territories.len() {
            for j in (i + 1)..territories.len() {
                let (a, b) = (territories[i].0, territories[j].0);
                let diplomacy = self.diplomacy.get(a, b);
                if diplomacy.relation != ecosphere_data::Relation::Allied {
                    continue;
                }
                let (Some(ai), Some(bi)) = (
                    self.colonies.iter().position(|c| c.id == a),
                    self.colonies.iter().position(|c| c.id == b),
                ) else {
                    continue;
                };
                let (from_idx, to_idx) =
                    if self.colonies[ai].stockpile >= self.colonies[bi].stockpile {
                        (ai, bi)
                    } else {
                        (bi, ai)
                    };
                let surplus =
                    self.colonies[from_idx].stockpile - self.colonies[to_idx].stockpile;
                let distance = self.colonies[from_idx]
                    .nest
                    .distance_to(&self.colonies[to_idx].nest);
                let amount = warfare::trade_amount(
                    surplus,
                    diplomacy.trust,
                    distance,
                    self.config.colony.trade_efficiency,
                );
                if amount > 1.0 {
                    self.colonies[from_idx].stockpile -= amount;
                    self.colonies[to_idx].stockpile += amount;
                    self.events.publish(event(
                        tick,
                        EventCategory::System,
                        Severity::Info,
                        EventPayload::TradeExecuted {
                            from: self.colonies[from_idx].id,
                            to: self.colonies[to_idx].id,
                            amount,
                        },
                    ));
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 14: biome-boundary effects and decay processing.
    // ------------------------------------------------------------------
    fn phase_boundary_and_decay(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;

        // Corpses that survived one full tick become decay items and the
        // entity record is retired (its id is never reused).
        let mut to_remove: Vec<EntityId> = Vec::new();
        for e in &self.entities {
            if !e.metabolism.alive && e.metabolism.died_tick.is_some_and(|t| t < tick) {
                to_remove.push(e.identity.id);
            }
        }
        for id in &to_remove {
            let idx = self.entity_index[id];
            let item =
                reproduction::corpse_decay_item(&self.entities[idx], &self.config.reproduction);
            let position = self.entities[idx].position;
            self.decay_items.push(item);
            self.grid.remove_entity(*id, &position);
        }
        if !to_remove.is_empty() {
            let removal: HashSet<EntityId> = to_remove.iter().copied().collect();
            self.entities.retain(|e| !removal.contains(&e.identity.id));
            self.removed_entities += removal.len() as u64;
            self.rebuild_entity_index();
        }

        // Dead plants leave the grid and network.
        let dead_plants: Vec<(PlantId, Position)> = self
            .plants
            .iter()
            .filter(|p| !p.alive)
            .map(|p| (p.id, p.position))
            .collect();
        if !dead_plants.is_empty() {
            for (id, position) in &dead_plants {
                self.grid.remove_plant(*id, position);
                self.network.remove_plant(*id);
                // Plant matter composts where it stood.
                let size = self
                    .plant_index
                    .get(id)
                    .map(|&i| self.plants[i].size)
                    .unwrap_or(0.0);
                let cell = self.grid.cell_at_mut(position);
                cell.organic_matter += size * 0.5;
            }
            let removal: HashSet<PlantId> = dead_plants.iter().map(|(id, _)| *id).collect();
            self.plants.retain(|p| !removal.contains(&p.id));
            self.rebuild_plant_index();
        }

        // Decay items drip nutrients into their cells; fungal decomposers
        // accelerate the process.
        let mut finished: Vec<usize> = Vec::new();
        for i in 0..self.decay_items.len() {
            let position = self.decay_items[i].position;
            let plants = &self.plants;
            let plant_index = &self.plant_index;
            let fungal_present = self
                .grid
                .plants_within(&position, 2.0, |pid| {
                    plant_index.get(&pid).map(|&idx| plants[idx].position)
                })
                .iter()
                .any(|pid| {
                    plant_index
                        .get(pid)
                        .is_some_and(|&idx| plants[idx].kind.is_fungal())
                });
            let item = &mut self.decay_items[i];
            let cell = self.grid.cell_at_mut(&position);
            reproduction::decay_step(item, cell, fungal_present);
            if reproduction::decay_finished(item) {
                finished.push(i);
            }
        }
        for i in finished.into_iter().rev() {
            let item = self.decay_items.remove(i);
            let mut ev = event(
                tick,
                EventCategory::Entity,
                Severity::Info,
                EventPayload::CorpseDecayed {
                    id: item.source,
                    nutrients_released: item.nutrients_remaining.max(0.0),
                },
            );
            ev.position = Some(item.position);
            self.events.publish(ev);
        }

        // Biome-boundary diffusion: water evens out between neighboring
        // cells every few ticks.
        if tick % 10 == 0 {
            let cols = self.grid.cols;
            let rows = self.grid.rows;
            let water: Vec<f32> = self.grid.cells.iter().map(|c| c.water).collect();
            for cy in 0..rows {
                for cx in 0..cols {
                    let idx = cy * cols + cx;
                    let mut total = 0.0;
                    let mut n = 0;
                    for (dx, dy) in [(-1i64, 0i64), (1, 0), (0, -1), (0, 1)] {
                        let nx = cx as i64 + dx;
                        let ny = cy as i64 + dy;
                        if nx >= 0 && ny >= 0 && (nx as usize) < cols && (ny as usize) < rows {
                            total += water[ny as usize * cols + nx as usize];
                            n += 1;
                        }
                    }
                    if n > 0 {
                        let mean = total / n as f32;
                        let cell = &mut self.grid.cells[idx];
                        cell.water = (cell.water + (mean - cell.water) * 0.1).clamp(0.0, 1.0);
                    }
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase 15: statistics, retention, snapshot publication.
    // ------------------------------------------------------------------
    fn phase_statistics(&mut self) -> anyhow::Result<()> {
        let tick = self.clock.tick;
        if tick % self.config.monitor.interval == 0 {
            let mut counts: HashMap<SpeciesId, usize> = HashMap::new();
            for e in self.entities.iter().filter(|e| e.metabolism.alive) {
                *counts.entry(e.identity.species).or_insert(0) += 1;
            }
            for p in self.plants.iter().filter(|p| p.alive) {
                *counts.entry(p.species).or_insert(0) += 1;
            }
            let mut populations: Vec<usize> = counts.values().copied().collect();
            populations.sort_unstable();

            let connectivity = self.network.connectivity(self.live_plant_count());
            let sample =
                self.monitor
                    .sample(&populations, connectivity, &self.config.monitor, tick);
            self.events.publish(event(
                tick,
                EventCategory::Statistical,
                Severity::Info,
                EventPayload::MonitorSample {
                    shannon: sample.shannon,
                    simpson: sample.simpson,
                    richness: sample.richness,
                    connectivity: sample.connectivity,
                    health_score: sample.health_score,
                },
            ));
        }

        self.events.prune(&self.config.events, tick);
        Ok(())
    }
}

/// Stress from the mismatch between an entity's adaptation traits and its
/// current cell's biome.
pub(crate) fn biome_stress(biome: Biome, e: &Entity) -> f64 {
    let traits = &e.traits;
    let mismatch = match biome {
        Biome::Water => 1.0 - f64::from(traits.get(TraitId::Aquatic)),
        Biome::Wetland => 0.4 * (1.0 - f64::from(traits.get(TraitId::Aquatic))),
        Biome::Mountain => 0.8 * (1.0 - f64::from(traits.get(TraitId::Altitude))),
        Biome::Tundra => 0.7 * (1.0 - f64::from(traits.get(TraitId::Endurance))),
        Biome::Desert => 0.6 * (1.0 - f64::from(traits.get(TraitId::Adaptability))),
        Biome::Forest | Biome::Plains => 0.0,
    };
    (mismatch * 0.3).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;

    fn small_world(seed: u64) -> World {
        let mut config = SimConfig::default();
        config.world.width = 40;
        config.world.height = 40;
        config.world.seed = seed;
        config.world.initial_entities = 12;
        config.world.initial_plants = 20;
        World::new_seeded(config).unwrap()
    }

    #[test]
    fn step_advances_the_clock() {
        let mut world = small_world(1);
        assert_eq!(world.clock.tick, 0);
        world.step().unwrap();
        assert_eq!(world.clock.tick, 1);
    }

    #[test]
    fn hundred_ticks_hold_invariants() {
        let mut world = small_world(2);
        for _ in 0..100 {
            world.step().unwrap();
        }
    }

    #[test]
    fn zero_population_world_steps_cleanly() {
        let mut config = SimConfig::default();
        config.world.initial_entities = 0;
        config.world.initial_plants = 0;
        let mut world = World::new_seeded(config).unwrap();
        for _ in 0..30 {
            world.step().unwrap();
        }
        assert_eq!(world.live_entity_count(), 0);
    }

    #[test]
    fn single_entity_world_steps_cleanly() {
        let mut config = SimConfig::default();
        config.world.initial_entities = 1;
        config.world.initial_plants = 5;
        let mut world = World::new_seeded(config).unwrap();
        for _ in 0..30 {
            world.step().unwrap();
        }
    }

    #[test]
    fn corpse_lingers_one_tick_then_decays() {
        let mut world = small_world(3);
        let victim = world.entities[0].identity.id;
        world.entities[0].metabolism.energy = 0.5;
        // Starve it on the next step.
        world.entities[0].metabolism.energy_cap = 1.0;

        let mut died_at = None;
        for _ in 0..50 {
            world.step().unwrap();
            if died_at.is_none() {
                if let Some(e) = world.entity(victim) {
                    if !e.metabolism.alive {
                        died_at = Some(world.clock.tick);
                    }
                }
            } else {
                break;
            }
        }
        let died_at = died_at.expect("entity should starve");
        // Corpse still present on its death tick, gone afterward.
        world.step().unwrap();
        assert!(world.clock.tick > died_at);
        assert!(world.entity(victim).is_none());
        assert!(world.removed_entities > 0);
    }
}

//! The wind field: a coarse 2D advection field blending a slowly drifting
//! prevailing direction, a seasonal multiplier, smooth-noise turbulence, and
//! storm overlays. Grain transport samples the field bilinearly.

use crate::config::WindConfig;
use ecosphere_data::Position;
use noise::{NoiseFn, Perlin};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A circular or spiral perturbation attached to an active weather event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Storm {
    pub center: Position,
    pub radius: f64,
    pub intensity: f64,
    /// Spiral storms add a tangential component; plain ones push outward.
    pub spiral: bool,
    pub remaining: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindField {
    pub cols: usize,
    pub rows: usize,
    pub cell_size: f64,
    /// Per-cell wind vector, row-major.
    pub vectors: Vec<(f64, f64)>,
    pub prevailing_angle: f64,
    pub storms: Vec<Storm>,
    noise_seed: u32,
}

impl WindField {
    #[must_use]
    pub fn new(width: u16, height: u16, cell_size: f64, seed: u64) -> Self {
        let cols = (f64::from(width) / cell_size).ceil() as usize;
        let rows = (f64::from(height) / cell_size).ceil() as usize;
        Self {
            cols,
            rows,
            cell_size,
            vectors: vec![(0.0, 0.0); cols * rows],
            prevailing_angle: 0.0,
            storms: Vec::new(),
            noise_seed: seed.wrapping_add(0x77) as u32,
        }
    }

    /// Advance the field one tick.
    pub fn step<R: Rng>(
        &mut self,
        tick: u64,
        season_multiplier: f64,
        config: &WindConfig,
        world_width: u16,
        world_height: u16,
        rng: &mut R,
    ) {
        // Prevailing direction random-walks slowly.
        self.prevailing_angle +=
            crate::genetics::gaussian(rng) as f64 * config.prevailing_drift;

        // Storm lifecycle.
        self.storms.retain_mut(|s| {
            s.remaining = s.remaining.saturating_sub(1);
            s.remaining > 0
        });
        if rng.gen_bool(config.storm_chance.clamp(0.0, 1.0)) {
            self.storms.push(Storm {
                center: Position::new(
                    rng.gen_range(0.0..f64::from(world_width)),
                    rng.gen_range(0.0..f64::from(world_height)),
                ),
                radius: rng.gen_range(5.0..20.0),
                intensity: rng.gen_range(0.5..2.0),
                spiral: rng.gen_bool(0.5),
                remaining: config.storm_duration,
            });
        }

        let speed = config.prevailing_speed * season_multiplier;
        let base = (
            self.prevailing_angle.cos() * speed,
            self.prevailing_angle.sin() * speed,
        );
        let turbulence = Perlin::new(self.noise_seed);
        let t = tick as f64 * 0.01;

        for cy in 0..self.rows {
            for cx in 0..self.cols {
                let x = (cx as f64 + 0.5) * self.cell_size;
                let y = (cy as f64 + 0.5) * self.cell_size;
                let nx = x * config.turbulence_scale;
                let ny = y * config.turbulence_scale;
                let tx = turbulence.get([nx, ny, t]) * config.turbulence_strength;
                let ty = turbulence.get([nx + 31.7, ny + 47.3, t]) * config.turbulence_strength;

                let mut vx = base.0 + tx;
                let mut vy = base.1 + ty;

                for storm in &self.storms {
                    let dx = x - storm.center.x;
                    let dy = y - storm.center.y;
                    let dist = (dx * dx + dy * dy).sqrt();
                    if dist >= storm.radius || dist < 1e-9 {
                        continue;
                    }
                    let falloff = 1.0 - dist / storm.radius;
                    let scale = storm.intensity * falloff / dist;
                    if storm.spiral {
                        // Tangential (counter-clockwise) component.
                        vx += -dy * scale;
                        vy += dx * scale;
                    } else {
                        vx += dx * scale;
                        vy += dy * scale;
                    }
                }

                self.vectors[cy * self.cols + cx] = (vx, vy);
            }
        }
    }

    /// Bilinear sample of the field at a world position.
    #[must_use]
    pub fn sample(&self, pos: &Position) -> (f64, f64) {
        let fx = (pos.x / self.cell_size - 0.5).max(0.0);
        let fy = (pos.y / self.cell_size - 0.5).max(0.0);
        let x0 = (fx.floor() as usize).min(self.cols - 1);
        let y0 = (fy.floor() as usize).min(self.rows - 1);
        let x1 = (x0 + 1).min(self.cols - 1);
        let y1 = (y0 + 1).min(self.rows - 1);
        let tx = (fx - x0 as f64).clamp(0.0, 1.0);
        let ty = (fy - y0 as f64).clamp(0.0, 1.0);

        let v00 = self.vectors[y0 * self.cols + x0];
        let v10 = self.vectors[y0 * self.cols + x1];
        let v01 = self.vectors[y1 * self.cols + x0];
        let v11 = self.vectors[y1 * self.cols + x1];

        let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;
        let vx = lerp(lerp(v00.0, v10.0, tx), lerp(v01.0, v11.0, tx), ty);
        let vy = lerp(lerp(v00.1, v10.1, tx), lerp(v01.1, v11.1, tx), ty);
        (vx, vy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn calm_config() -> WindConfig {
        WindConfig {
            prevailing_speed: 1.0,
            prevailing_drift: 0.0,
            turbulence_strength: 0.0,
            storm_chance: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn step_is_deterministic_for_a_seed() {
        let config = WindConfig::default();
        let mut a = WindField::new(40, 40, 4.0, 9);
        let mut b = WindField::new(40, 40, 4.0, 9);
        let mut rng_a = ChaCha8Rng::seed_from_u64(1);
        let mut rng_b = ChaCha8Rng::seed_from_u64(1);
        for tick in 0..5 {
            a.step(tick, 1.0, &config, 40, 40, &mut rng_a);
            b.step(tick, 1.0, &config, 40, 40, &mut rng_b);
        }
        assert_eq!(a.vectors, b.vectors);
    }

    #[test]
    fn calm_field_follows_prevailing_direction() {
        let config = calm_config();
        let mut field = WindField::new(40, 40, 4.0, 9);
        field.prevailing_angle = 0.0; // pointing +x
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        field.step(0, 1.0, &config, 40, 40, &mut rng);

        let (vx, vy) = field.sample(&Position::new(20.0, 20.0));
        assert!((vx - 1.0).abs() < 1e-9);
        assert!(vy.abs() < 1e-9);
    }

    #[test]
    fn seasonal_multiplier_scales_magnitude() {
        let config = calm_config();
        let mut field = WindField::new(40, 40, 4.0, 9);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        field.step(0, 0.5, &config, 40, 40, &mut rng);
        let (vx, _) = field.sample(&Position::new(20.0, 20.0));
        assert!((vx - 0.5).abs() < 1e-9);
    }

    #[test]
    fn storms_perturb_and_expire() {
        let config = calm_config();
        let mut field = WindField::new(40, 40, 4.0, 9);
        field.storms.push(Storm {
            center: Position::new(20.0, 20.0),
            radius: 10.0,
            intensity: 2.0,
            spiral: false,
            remaining: 2,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        field.step(0, 1.0, &config, 40, 40, &mut rng);
        let (vx, _) = field.sample(&Position::new(26.0, 20.0));
        // Outward push adds to the +x prevailing wind east of center.
        assert!(vx > 1.0);

        field.step(1, 1.0, &config, 40, 40, &mut rng);
        assert!(field.storms.is_empty());
    }
}

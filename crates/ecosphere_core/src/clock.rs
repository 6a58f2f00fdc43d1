//! Simulation time: tick counter mapped to hours, days, seasons and years
//! by fixed ratios, plus the named seasonal scalars consumed by the plant,
//! dispersal and reproduction phases.

use serde::{Deserialize, Serialize};

pub const TICKS_PER_HOUR: u64 = 4;
pub const HOURS_PER_DAY: u64 = 24;
pub const DAYS_PER_SEASON: u64 = 30;
pub const SEASONS_PER_YEAR: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    #[must_use]
    pub fn next(&self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }

    /// Multiplier on plant growth and reproduction readiness.
    #[must_use]
    pub fn growth_multiplier(&self) -> f64 {
        match self {
            Season::Spring => 1.5,
            Season::Summer => 1.0,
            Season::Autumn => 0.8,
            Season::Winter => 0.3,
        }
    }

    /// Multiplier on the prevailing wind magnitude.
    #[must_use]
    pub fn wind_multiplier(&self) -> f64 {
        match self {
            Season::Spring => 1.2,
            Season::Summer => 0.8,
            Season::Autumn => 1.4,
            Season::Winter => 1.0,
        }
    }

    /// Multiplier on mating eligibility energy thresholds.
    #[must_use]
    pub fn breeding_multiplier(&self) -> f64 {
        match self {
            Season::Spring => 0.8,
            Season::Summer => 1.0,
            Season::Autumn => 1.1,
            Season::Winter => 1.5,
        }
    }

    /// Ambient temperature offset in degrees.
    #[must_use]
    pub fn temperature_offset(&self) -> f32 {
        match self {
            Season::Spring => 2.0,
            Season::Summer => 8.0,
            Season::Autumn => 0.0,
            Season::Winter => -8.0,
        }
    }

    fn smooth_step(t: f64) -> f64 {
        t * t * (3.0 - 2.0 * t)
    }

    /// Growth multiplier smoothly interpolated toward the next season.
    #[must_use]
    pub fn growth_multiplier_smooth(&self, progress: f64) -> f64 {
        let t = Self::smooth_step(progress.clamp(0.0, 1.0));
        let from = self.growth_multiplier();
        let to = self.next().growth_multiplier();
        from + (to - from) * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeOfDay {
    Day,
    Night,
}

/// Deterministic simulation clock, advanced exactly once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SimClock {
    pub tick: u64,
}

impl SimClock {
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    #[must_use]
    pub fn hour(&self) -> u64 {
        (self.tick / TICKS_PER_HOUR) % HOURS_PER_DAY
    }

    #[must_use]
    pub fn day(&self) -> u64 {
        self.tick / (TICKS_PER_HOUR * HOURS_PER_DAY)
    }

    #[must_use]
    pub fn season(&self) -> Season {
        let season_idx = (self.day() / DAYS_PER_SEASON) % SEASONS_PER_YEAR;
        match season_idx {
            0 => Season::Spring,
            1 => Season::Summer,
            2 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Fractional progress through the current season in [0, 1).
    #[must_use]
    pub fn season_progress(&self) -> f64 {
        let ticks_per_season = TICKS_PER_HOUR * HOURS_PER_DAY * DAYS_PER_SEASON;
        (self.tick % ticks_per_season) as f64 / ticks_per_season as f64
    }

    #[must_use]
    pub fn year(&self) -> u64 {
        self.day() / (DAYS_PER_SEASON * SEASONS_PER_YEAR)
    }

    #[must_use]
    pub fn time_of_day(&self) -> TimeOfDay {
        let h = self.hour();
        if (6..18).contains(&h) {
            TimeOfDay::Day
        } else {
            TimeOfDay::Night
        }
    }

    /// Ambient light level in [0, 1]; peaks at noon.
    #[must_use]
    pub fn light_level(&self) -> f32 {
        let h = self.hour() as f32;
        let phase = ((h - 12.0) / 12.0 * std::f32::consts::PI).cos();
        ((phase + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_cycle_in_order() {
        let mut clock = SimClock::default();
        assert_eq!(clock.season(), Season::Spring);
        clock.tick = TICKS_PER_HOUR * HOURS_PER_DAY * DAYS_PER_SEASON;
        assert_eq!(clock.season(), Season::Summer);
        clock.tick *= 4;
        assert_eq!(clock.season(), Season::Spring);
        assert_eq!(clock.year(), 1);
    }

    #[test]
    fn hour_and_day_derive_from_tick() {
        let mut clock = SimClock::default();
        clock.tick = TICKS_PER_HOUR * 25;
        assert_eq!(clock.hour(), 1);
        assert_eq!(clock.day(), 1);
    }

    #[test]
    fn light_peaks_at_noon() {
        let mut clock = SimClock::default();
        clock.tick = 12 * TICKS_PER_HOUR;
        let noon = clock.light_level();
        clock.tick = 0;
        let midnight = clock.light_level();
        assert!(noon > 0.9);
        assert!(midnight < 0.1);
    }

    #[test]
    fn smooth_growth_interpolates_between_seasons() {
        let spring = Season::Spring;
        let at_start = spring.growth_multiplier_smooth(0.0);
        let at_end = spring.growth_multiplier_smooth(1.0);
        assert!((at_start - spring.growth_multiplier()).abs() < 1e-9);
        assert!((at_end - Season::Summer.growth_multiplier()).abs() < 1e-9);
    }
}

use std::{collections::VecDeque, f64::consts::PI};

use serde::Serialize;
use tracing::{debug, warn};

use crate::settings::EcologySettings;

const LOG_CAPACITY: usize = 10;
const HOURS_PER_DAY: u32 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EcologyStatus {
    Critical,
    Stressed,
    FrequentHarvest,
    Stable,
}

impl EcologyStatus {
    pub fn message(self) -> &'static str {
        match self {
            EcologyStatus::Critical => "Critical ecosystem damage! Stop harvesting immediately.",
            EcologyStatus::Stressed => "Ecosystem stressed. Reduce harvesting frequency.",
            EcologyStatus::FrequentHarvest => {
                "Frequent harvesting detected. Consider moving to new location."
            }
            EcologyStatus::Stable => "Ecosystem stable. Sustainable harvesting possible.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EcologyLogEntry {
    pub hour: u64,
    pub time_of_day: u32,
    pub message: String,
}

/// Hour-by-hour ecosystem of a single harvesting site.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EcologyState {
    pub temperature: f64,
    pub radiation: f64,
    pub flora_density: f64,
    pub fauna_activity: f64,
    pub world_health: f64,
    pub time_of_day: u32,
    pub harvest_count: u32,
    pub total_hours: u64,
    log: VecDeque<EcologyLogEntry>,
}

impl Default for EcologyState {
    fn default() -> Self {
        Self {
            temperature: 20.0,
            radiation: 30.0,
            flora_density: 75.0,
            fauna_activity: 50.0,
            world_health: 100.0,
            time_of_day: 12,
            harvest_count: 0,
            total_hours: 0,
            log: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }
}

impl EcologyState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newest entry first.
    pub fn log(&self) -> impl Iterator<Item = &EcologyLogEntry> {
        self.log.iter()
    }

    fn record(&mut self, message: impl Into<String>) {
        let entry = EcologyLogEntry {
            hour: self.total_hours,
            time_of_day: self.time_of_day,
            message: message.into(),
        };
        debug!(hour = entry.hour, message = %entry.message, "ecology");
        self.log.push_front(entry);
        self.log.truncate(LOG_CAPACITY);
    }

    /// Advances one hour. Silent ticks skip the log entry.
    pub fn tick(&mut self, settings: &EcologySettings, silent: bool) {
        self.time_of_day = (self.time_of_day + 1) % HOURS_PER_DAY;
        self.total_hours += 1;

        let phase = f64::from(self.time_of_day) / f64::from(HOURS_PER_DAY) * PI * 2.0;
        self.temperature = 20.0 + phase.sin() * 15.0;

        if self.time_of_day >= 18 || self.time_of_day <= 6 {
            self.fauna_activity = (self.fauna_activity + 5.0).min(100.0);
        } else {
            self.fauna_activity = (self.fauna_activity - 3.0).max(20.0);
        }

        let flora_regen = if self.world_health > 50.0 {
            settings.flora_regen_rate
        } else {
            settings.flora_regen_rate * 0.5
        };
        if self.flora_density < 100.0 {
            self.flora_density = (self.flora_density + flora_regen).min(100.0);
            self.world_health = (self.world_health + settings.health_regen_rate).min(100.0);
        }

        if self.harvest_count > 0 && self.time_of_day == 0 {
            self.harvest_count -= 1;
        }

        if !silent {
            let message = format!(
                "Time advanced to {}:00. Temperature: {:.1}°C",
                self.time_of_day, self.temperature
            );
            self.record(message);
        }
    }

    pub fn advance_day(&mut self, settings: &EcologySettings) {
        for _ in 0..HOURS_PER_DAY {
            self.tick(settings, true);
        }
        self.record("Full day cycle completed. Ecosystem recovered significantly.");
    }

    pub fn harvest(&mut self, settings: &EcologySettings) {
        self.harvest_count += 1;
        self.flora_density = (self.flora_density - settings.flora_loss_per_harvest).max(0.0);
        self.world_health = (self.world_health - settings.health_loss_per_harvest).max(0.0);

        if self.harvest_count > settings.frequent_harvest_warning {
            self.fauna_activity =
                (self.fauna_activity - settings.fauna_loss_per_harvest * 2.0).max(0.0);
            warn!(harvests = self.harvest_count, "overharvesting, fauna migrating away");
            self.record("Overharvesting detected! Fauna migrating away.");
        } else if self.harvest_count > settings.stress_harvest_count() {
            warn!(harvests = self.harvest_count, "ecosystem stress increasing");
            self.record("Ecosystem stress increasing. Consider waiting for recovery.");
        } else {
            let message = format!("Resource harvested. Flora density: {:.0}%", self.flora_density);
            self.record(message);
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
        self.record("Ecosystem reset to default state.");
    }

    pub fn status(&self, settings: &EcologySettings) -> EcologyStatus {
        if self.world_health < settings.critical_threshold {
            EcologyStatus::Critical
        } else if self.world_health < settings.stressed_threshold {
            EcologyStatus::Stressed
        } else if self.harvest_count > settings.stress_harvest_count() {
            EcologyStatus::FrequentHarvest
        } else {
            EcologyStatus::Stable
        }
    }

    pub fn fauna_level(&self) -> ActivityLevel {
        if self.fauna_activity < 30.0 {
            ActivityLevel::Low
        } else if self.fauna_activity < 70.0 {
            ActivityLevel::Medium
        } else {
            ActivityLevel::High
        }
    }

    pub fn radiation_level(&self) -> ActivityLevel {
        if self.radiation < 50.0 {
            ActivityLevel::Low
        } else {
            ActivityLevel::High
        }
    }

    /// Hours until world health is back at 100. `None` when health does not
    /// regenerate.
    pub fn recovery_hours(&self, settings: &EcologySettings) -> Option<u32> {
        let deficit = 100.0 - self.world_health;
        if deficit <= 0.0 {
            return Some(0);
        }
        if settings.health_regen_rate <= 0.0 {
            return None;
        }
        Some((deficit / settings.health_regen_rate).ceil() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_wraps_time_and_follows_temperature_curve() {
        let settings = EcologySettings::default();
        let mut eco = EcologyState::new();
        eco.tick(&settings, false);
        assert_eq!(eco.time_of_day, 13);
        assert_eq!(eco.total_hours, 1);
        let expected = 20.0 + (13.0 / 24.0 * PI * 2.0).sin() * 15.0;
        assert!((eco.temperature - expected).abs() < 1e-9);
        // midday: fauna settles
        assert_eq!(eco.fauna_activity, 47.0);
        assert_eq!(eco.flora_density, 77.0);
        assert_eq!(eco.log().count(), 1);

        for _ in 0..11 {
            eco.tick(&settings, true);
        }
        assert_eq!(eco.time_of_day, 0);
        assert_eq!(eco.log().count(), 1);
    }

    #[test]
    fn fauna_floor_and_cap() {
        let settings = EcologySettings::default();
        let mut eco = EcologyState::new();
        eco.fauna_activity = 21.0;
        eco.tick(&settings, true);
        assert_eq!(eco.fauna_activity, 20.0);

        eco.time_of_day = 17;
        eco.fauna_activity = 98.0;
        eco.tick(&settings, true);
        assert_eq!(eco.fauna_activity, 100.0);
    }

    #[test]
    fn low_health_halves_flora_regen() {
        let settings = EcologySettings::default();
        let mut eco = EcologyState::new();
        eco.world_health = 50.0;
        eco.flora_density = 10.0;
        eco.tick(&settings, true);
        assert_eq!(eco.flora_density, 11.0);
        assert_eq!(eco.world_health, 51.0);
    }

    #[test]
    fn harvest_thresholds_escalate() {
        let settings = EcologySettings::default();
        let mut eco = EcologyState::new();
        for _ in 0..3 {
            eco.harvest(&settings);
        }
        assert_eq!(eco.status(&settings), EcologyStatus::Stable);
        assert!(eco.log().next().unwrap().message.starts_with("Resource harvested"));

        eco.harvest(&settings);
        assert!(eco.log().next().unwrap().message.starts_with("Ecosystem stress"));
        assert_eq!(eco.status(&settings), EcologyStatus::FrequentHarvest);

        eco.harvest(&settings);
        let fauna = eco.fauna_activity;
        eco.harvest(&settings);
        assert!(eco.log().next().unwrap().message.starts_with("Overharvesting"));
        assert_eq!(eco.fauna_activity, fauna - 10.0);
        assert_eq!(eco.flora_density, 75.0 - 6.0 * 8.0);
        assert_eq!(eco.world_health, 100.0 - 6.0 * 3.0);
    }

    #[test]
    fn harvest_count_decays_at_midnight() {
        let settings = EcologySettings::default();
        let mut eco = EcologyState::new();
        eco.harvest(&settings);
        eco.harvest(&settings);
        eco.advance_day(&settings);
        assert_eq!(eco.harvest_count, 1);
        assert_eq!(eco.time_of_day, 12);
        assert!(eco.log().next().unwrap().message.starts_with("Full day"));
    }

    #[test]
    fn status_and_recovery_follow_health() {
        let settings = EcologySettings::default();
        let mut eco = EcologyState::new();
        eco.world_health = 25.0;
        assert_eq!(eco.status(&settings), EcologyStatus::Critical);
        assert_eq!(eco.recovery_hours(&settings), Some(75));
        eco.world_health = 55.5;
        assert_eq!(eco.status(&settings), EcologyStatus::Stressed);
        assert_eq!(eco.recovery_hours(&settings), Some(45));
        assert_eq!(eco.fauna_level(), ActivityLevel::Medium);
    }

    #[test]
    fn log_keeps_ten_newest() {
        let settings = EcologySettings::default();
        let mut eco = EcologyState::new();
        for _ in 0..15 {
            eco.tick(&settings, false);
        }
        let hours: Vec<u64> = eco.log().map(|e| e.hour).collect();
        assert_eq!(hours.len(), 10);
        assert_eq!(hours[0], 15);
        assert_eq!(hours[9], 6);
        eco.reset();
        assert_eq!(eco.log().count(), 1);
        assert_eq!(eco.flora_density, 75.0);
    }
}

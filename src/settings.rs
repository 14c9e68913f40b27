//! Tunable numbers for every generator, plus their on-disk store.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    error::LabError,
    material::Rarity,
    reward::RewardRarity,
    systems::Density,
};

/// File name used when no explicit settings path is given.
pub const SETTINGS_FILE: &str = "explorationSettings.json";

fn default_first_discoverer_multiplier() -> f64 {
    2.0
}

fn default_diminishing_returns_rate() -> f64 {
    5.0
}

fn default_rep_floor() -> f64 {
    10.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub stat_pools: StatPools,
    #[serde(default)]
    pub drop_rates: DropRates,
    #[serde(default)]
    pub rep_values: RepValues,
    #[serde(default = "default_first_discoverer_multiplier")]
    pub first_discoverer_multiplier: f64,
    /// Percent of the base value lost per prior discovery.
    #[serde(default = "default_diminishing_returns_rate")]
    pub diminishing_returns_rate: f64,
    /// Lowest reward multiplier, in percent.
    #[serde(default = "default_rep_floor")]
    pub rep_floor: f64,
    #[serde(default)]
    pub ecology: EcologySettings,
    #[serde(default)]
    pub mystery_budget: MysteryBudgetSettings,
    #[serde(default)]
    pub mutation: MutationSettings,
    #[serde(default)]
    pub loop_targets: LoopTargets,
    #[serde(default)]
    pub metrics_targets: MetricsTargets,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stat_pools: StatPools::default(),
            drop_rates: DropRates::default(),
            rep_values: RepValues::default(),
            first_discoverer_multiplier: default_first_discoverer_multiplier(),
            diminishing_returns_rate: default_diminishing_returns_rate(),
            rep_floor: default_rep_floor(),
            ecology: EcologySettings::default(),
            mystery_budget: MysteryBudgetSettings::default(),
            mutation: MutationSettings::default(),
            loop_targets: LoopTargets::default(),
            metrics_targets: MetricsTargets::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatPools {
    pub common: u32,
    pub uncommon: u32,
    pub rare: u32,
    pub epic: u32,
    pub legendary: u32,
}

impl StatPools {
    pub fn get(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Uncommon => self.uncommon,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
        }
    }
}

impl Default for StatPools {
    fn default() -> Self {
        Self {
            common: 300,
            uncommon: 450,
            rare: 600,
            epic: 800,
            legendary: 1000,
        }
    }
}

/// Percent chance per tier. Legendary takes whatever is left of 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropRates {
    pub common: f64,
    pub uncommon: f64,
    pub rare: f64,
    pub epic: f64,
}

impl DropRates {
    pub fn legendary(&self) -> f64 {
        (100.0 - self.common - self.uncommon - self.rare - self.epic).max(0.0)
    }

    /// Maps a percentage roll in `[0, 100)` onto a tier.
    pub fn rarity_for(&self, roll: f64) -> Rarity {
        let mut threshold = self.common;
        if roll < threshold {
            return Rarity::Common;
        }
        threshold += self.uncommon;
        if roll < threshold {
            return Rarity::Uncommon;
        }
        threshold += self.rare;
        if roll < threshold {
            return Rarity::Rare;
        }
        threshold += self.epic;
        if roll < threshold {
            return Rarity::Epic;
        }
        Rarity::Legendary
    }
}

impl Default for DropRates {
    fn default() -> Self {
        Self {
            common: 60.0,
            uncommon: 25.0,
            rare: 10.0,
            epic: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepValues {
    pub common: u32,
    pub uncommon: u32,
    pub rare: u32,
    pub epic: u32,
    pub legendary: u32,
    pub unique: u32,
}

impl RepValues {
    pub fn for_material(&self, rarity: Rarity) -> u32 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Uncommon => self.uncommon,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
        }
    }

    pub fn for_reward(&self, rarity: RewardRarity) -> u32 {
        match rarity {
            RewardRarity::Common => self.common,
            RewardRarity::Uncommon => self.uncommon,
            RewardRarity::Rare => self.rare,
            RewardRarity::Unique => self.unique,
        }
    }
}

impl Default for RepValues {
    fn default() -> Self {
        Self {
            common: 20,
            uncommon: 50,
            rare: 100,
            epic: 150,
            legendary: 250,
            unique: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EcologySettings {
    pub flora_regen_rate: f64,
    pub health_regen_rate: f64,
    pub flora_loss_per_harvest: f64,
    pub fauna_loss_per_harvest: f64,
    pub health_loss_per_harvest: f64,
    pub critical_threshold: f64,
    pub stressed_threshold: f64,
    pub frequent_harvest_warning: u32,
}

impl EcologySettings {
    /// Harvest count above which the ecosystem reports stress.
    pub fn stress_harvest_count(&self) -> u32 {
        (self.frequent_harvest_warning as f64 * 0.6).floor() as u32
    }
}

impl Default for EcologySettings {
    fn default() -> Self {
        Self {
            flora_regen_rate: 2.0,
            health_regen_rate: 1.0,
            flora_loss_per_harvest: 8.0,
            fauna_loss_per_harvest: 5.0,
            health_loss_per_harvest: 3.0,
            critical_threshold: 30.0,
            stressed_threshold: 60.0,
            frequent_harvest_warning: 5,
        }
    }
}

/// Inclusive `[min, max]` counts per point class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DensityRanges {
    pub landmarks: [u32; 2],
    pub micro_points: [u32; 2],
    pub secrets: [u32; 2],
}

/// Missing densities, or missing ranges inside one, keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PartialMysteryBudget")]
pub struct MysteryBudgetSettings {
    pub sparse: DensityRanges,
    pub normal: DensityRanges,
    pub dense: DensityRanges,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartialRanges {
    landmarks: Option<[u32; 2]>,
    micro_points: Option<[u32; 2]>,
    secrets: Option<[u32; 2]>,
}

impl PartialRanges {
    fn over(self, base: DensityRanges) -> DensityRanges {
        DensityRanges {
            landmarks: self.landmarks.unwrap_or(base.landmarks),
            micro_points: self.micro_points.unwrap_or(base.micro_points),
            secrets: self.secrets.unwrap_or(base.secrets),
        }
    }
}

#[derive(Deserialize)]
struct PartialMysteryBudget {
    sparse: Option<PartialRanges>,
    normal: Option<PartialRanges>,
    dense: Option<PartialRanges>,
}

impl From<PartialMysteryBudget> for MysteryBudgetSettings {
    fn from(partial: PartialMysteryBudget) -> Self {
        let defaults = Self::default();
        let merge = |ranges: Option<PartialRanges>, base: DensityRanges| match ranges {
            Some(ranges) => ranges.over(base),
            None => base,
        };
        Self {
            sparse: merge(partial.sparse, defaults.sparse),
            normal: merge(partial.normal, defaults.normal),
            dense: merge(partial.dense, defaults.dense),
        }
    }
}

impl MysteryBudgetSettings {
    pub fn for_density(&self, density: Density) -> &DensityRanges {
        match density {
            Density::Sparse => &self.sparse,
            Density::Normal => &self.normal,
            Density::Dense => &self.dense,
        }
    }
}

impl Default for MysteryBudgetSettings {
    fn default() -> Self {
        Self {
            sparse: DensityRanges {
                landmarks: [1, 2],
                micro_points: [8, 12],
                secrets: [2, 3],
            },
            normal: DensityRanges {
                landmarks: [2, 3],
                micro_points: [15, 25],
                secrets: [3, 5],
            },
            dense: DensityRanges {
                landmarks: [3, 5],
                micro_points: [30, 40],
                secrets: [5, 8],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MutationSettings {
    pub min_boost: u32,
    pub max_boost: u32,
    /// When false a material can only evolve once.
    pub allow_multiple: bool,
}

impl Default for MutationSettings {
    fn default() -> Self {
        Self {
            min_boost: 10,
            max_boost: 25,
            allow_multiple: true,
        }
    }
}

/// Loop length targets in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoopTargets {
    pub micro_min: u64,
    pub micro_max: u64,
    pub macro_min: u64,
    pub macro_max: u64,
}

impl Default for LoopTargets {
    fn default() -> Self {
        Self {
            micro_min: 5,
            micro_max: 8,
            macro_min: 60,
            macro_max: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetricsTargets {
    pub curiosity: f64,
    /// Minutes between souvenirs.
    pub souvenir_time: f64,
    pub predictive: f64,
    pub parity_tolerance: f64,
}

impl Default for MetricsTargets {
    fn default() -> Self {
        Self {
            curiosity: 25.0,
            souvenir_time: 15.0,
            predictive: 60.0,
            parity_tolerance: 12.0,
        }
    }
}

impl Settings {
    /// Applies one edit addressed by a dotted key such as `statPools.rare`
    /// or `mysteryBudget.dense.secrets.max`. The raw value is parsed to the
    /// type of the existing entry. Nothing changes unless the edited
    /// settings validate.
    pub fn apply(&mut self, key: &str, raw: &str) -> Result<(), LabError> {
        let mut document = serde_json::to_value(&*self)
            .map_err(|err| LabError::InvalidSetting(err.to_string()))?;
        let slot = locate(&mut document, key)?;
        *slot = coerce(slot, raw, key)?;
        let updated: Settings = serde_json::from_value(document)
            .map_err(|err| LabError::InvalidSetting(format!("{key}: {err}")))?;
        updated.validate()?;
        debug!(key, value = raw, "setting changed");
        *self = updated;
        Ok(())
    }

    /// Reads one entry by dotted key.
    pub fn get(&self, key: &str) -> Result<Value, LabError> {
        let mut document = serde_json::to_value(self)
            .map_err(|err| LabError::InvalidSetting(err.to_string()))?;
        locate(&mut document, key).map(|value| value.clone())
    }

    pub fn validate(&self) -> Result<(), LabError> {
        let rates = [
            ("dropRates.common", self.drop_rates.common),
            ("dropRates.uncommon", self.drop_rates.uncommon),
            ("dropRates.rare", self.drop_rates.rare),
            ("dropRates.epic", self.drop_rates.epic),
        ];
        for (key, rate) in rates {
            if !rate.is_finite() || rate < 0.0 {
                return Err(LabError::InvalidSetting(format!(
                    "{key} must be a non-negative percentage"
                )));
            }
        }
        let total: f64 = rates.iter().map(|(_, rate)| rate).sum();
        if total > 100.0 {
            return Err(LabError::InvalidSetting(format!(
                "drop rates add up to {total}%, above 100%"
            )));
        }
        if !(0.0..=100.0).contains(&self.rep_floor) {
            return Err(LabError::InvalidSetting(
                "repFloor must be between 0 and 100".into(),
            ));
        }
        if !self.diminishing_returns_rate.is_finite() || self.diminishing_returns_rate < 0.0 {
            return Err(LabError::InvalidSetting(
                "diminishingReturnsRate must be non-negative".into(),
            ));
        }
        if !self.first_discoverer_multiplier.is_finite() || self.first_discoverer_multiplier <= 0.0
        {
            return Err(LabError::InvalidSetting(
                "firstDiscovererMultiplier must be positive".into(),
            ));
        }
        if self.mutation.min_boost > self.mutation.max_boost {
            return Err(LabError::InvalidSetting(
                "mutation.minBoost exceeds mutation.maxBoost".into(),
            ));
        }
        let ecology = [
            self.ecology.flora_regen_rate,
            self.ecology.health_regen_rate,
            self.ecology.flora_loss_per_harvest,
            self.ecology.fauna_loss_per_harvest,
            self.ecology.health_loss_per_harvest,
        ];
        if ecology.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(LabError::InvalidSetting(
                "ecology rates must be non-negative".into(),
            ));
        }
        if self.ecology.critical_threshold > self.ecology.stressed_threshold {
            return Err(LabError::InvalidSetting(
                "ecology.criticalThreshold exceeds ecology.stressedThreshold".into(),
            ));
        }
        for (name, ranges) in [
            ("sparse", &self.mystery_budget.sparse),
            ("normal", &self.mystery_budget.normal),
            ("dense", &self.mystery_budget.dense),
        ] {
            for (class, [min, max]) in [
                ("landmarks", ranges.landmarks),
                ("microPoints", ranges.micro_points),
                ("secrets", ranges.secrets),
            ] {
                if min > max {
                    return Err(LabError::InvalidSetting(format!(
                        "mysteryBudget.{name}.{class} has min {min} above max {max}"
                    )));
                }
            }
        }
        if self.loop_targets.micro_min > self.loop_targets.micro_max
            || self.loop_targets.macro_min > self.loop_targets.macro_max
        {
            return Err(LabError::InvalidSetting(
                "loop target minimum exceeds its maximum".into(),
            ));
        }
        Ok(())
    }
}

fn locate<'a>(document: &'a mut Value, key: &str) -> Result<&'a mut Value, LabError> {
    let unknown = || LabError::InvalidSetting(format!("unknown setting '{key}'"));
    let mut current = document;
    for segment in key.split('.') {
        current = match current {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => {
                let index = match segment {
                    "min" => 0,
                    "max" => 1,
                    other => other.parse::<usize>().map_err(|_| unknown())?,
                };
                items.get_mut(index)
            }
            _ => None,
        }
        .ok_or_else(unknown)?;
    }
    if current.is_object() || current.is_array() {
        return Err(LabError::InvalidSetting(format!(
            "'{key}' is a group, not a single setting"
        )));
    }
    Ok(current)
}

fn coerce(existing: &Value, raw: &str, key: &str) -> Result<Value, LabError> {
    let raw = raw.trim();
    let invalid = |expected: &str| {
        LabError::InvalidSetting(format!("{key} expects {expected}, got '{raw}'"))
    };
    match existing {
        Value::Bool(_) => match raw.to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "off" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
        Value::Number(number) if number.is_f64() => raw
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Value::from)
            .ok_or_else(|| invalid("a number")),
        Value::Number(_) => raw
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid("a whole number")),
        _ => Err(invalid("a scalar")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

fn parse_settings(text: &str, format: Format) -> Result<Settings> {
    let settings = match format {
        Format::Json => serde_json::from_str(text)?,
        Format::Yaml => serde_yaml::from_str(text)?,
    };
    Ok(settings)
}

fn render_settings(settings: &Settings, format: Format) -> Result<String> {
    let text = match format {
        Format::Json => serde_json::to_string_pretty(settings)?,
        Format::Yaml => serde_yaml::to_string(settings)?,
    };
    Ok(text)
}

/// The single persisted settings document.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SETTINGS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Settings> {
        Self::import(&self.path)
    }

    /// Missing or unreadable stores fall back to defaults.
    pub fn load_or_default(&self) -> Settings {
        if !self.path.exists() {
            return Settings::default();
        }
        match self.load() {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %self.path.display(), error = %format!("{err:#}"), "ignoring saved settings");
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        Self::export(settings, &self.path)
    }

    /// Reads and validates a settings document. The caller's settings stay
    /// untouched when this fails.
    pub fn import(path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let settings = parse_settings(&text, Format::of(path))
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;
        settings
            .validate()
            .with_context(|| format!("Rejected settings file {}", path.display()))?;
        info!(path = %path.display(), "settings imported");
        Ok(settings)
    }

    pub fn export(settings: &Settings, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let text = render_settings(settings, Format::of(path))?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;
        Ok(())
    }
}

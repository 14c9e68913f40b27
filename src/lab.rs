//! Session state for the exploration lab.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    catalog::Catalog,
    error::{LabError, LabResult},
    evolution::evolve,
    export::MetricsExport,
    generator::MaterialGenerator,
    inventory::Inventory,
    material::{Biome, Material, MaterialId, MaterialType, Mutation, RarityOverride},
    research::{analyze, available_stats, calculate_research, AvailableStats, MaterialAnalysis, ResearchReport},
    reward::{generate_reward, Reward, RewardLog, RewardRarity},
    rng::{Roll, RngManager},
    settings::Settings,
    systems::{
        generate_mystery_budget, Density, DecodeVerb, EcologyState, ExcavateVerb, LoopPhase,
        LoopReport, LoopTimer, Metrics, MetricsReport, MysteryBudget, SampleVerb, ShadowVerb,
        TraceVerb, VerbKind, VerbOutcome, VerbProgress,
    },
};

/// Owns every subsystem of one session. Each subsystem draws from its own
/// named RNG stream so a seed reproduces the whole session.
pub struct Lab {
    catalog: Catalog,
    settings: Settings,
    rng: RngManager,
    generator: MaterialGenerator,
    inventory: Inventory,
    rewards: RewardLog,
    ecology: EcologyState,
    metrics: Metrics,
    loop_timer: LoopTimer,
    mystery: Option<MysteryBudget>,
}

impl Lab {
    pub fn new(catalog: Catalog, settings: Settings, rng: RngManager) -> Self {
        Self {
            catalog,
            settings,
            rng,
            generator: MaterialGenerator::new(),
            inventory: Inventory::new(),
            rewards: RewardLog::new(),
            ecology: EcologyState::new(),
            metrics: Metrics::new(),
            loop_timer: LoopTimer::new(),
            mystery: None,
        }
    }

    pub fn with_seed(catalog: Catalog, settings: Settings, seed: u64) -> Self {
        Self::new(catalog, settings, RngManager::new(seed))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn rewards(&self) -> &RewardLog {
        &self.rewards
    }

    pub fn ecology(&self) -> &EcologyState {
        &self.ecology
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn loop_timer(&self) -> &LoopTimer {
        &self.loop_timer
    }

    pub fn mystery(&self) -> Option<&MysteryBudget> {
        self.mystery.as_ref()
    }

    /// Generates one material, stores it and selects it.
    pub fn generate_material(
        &mut self,
        kind: MaterialType,
        biome: Biome,
        rarity: RarityOverride,
    ) -> &Material {
        let material = self.generator.generate(
            &self.catalog,
            &self.settings,
            kind,
            biome,
            rarity,
            Utc::now(),
            &mut self.rng.stream("materials"),
        );
        self.inventory.push_selected(material)
    }

    /// Appends `count` random materials and returns them. The selection is
    /// left alone.
    pub fn generate_batch(&mut self, count: usize) -> &[Material] {
        let start = self.inventory.len();
        let batch = self.generator.generate_batch(
            &self.catalog,
            &self.settings,
            count,
            Utc::now(),
            &mut self.rng.stream("materials"),
        );
        self.inventory.extend(batch);
        info!(count, total = self.inventory.len(), "batch generated");
        &self.inventory.materials()[start..]
    }

    pub fn select(&mut self, id: MaterialId) -> LabResult<&Material> {
        self.inventory.select(id)
    }

    pub fn evolve_selected(&mut self) -> LabResult<Mutation> {
        let material = self.inventory.selected_mut()?;
        evolve(
            material,
            &self.catalog,
            &self.settings,
            Utc::now(),
            &mut self.rng.stream("evolution"),
        )
    }

    pub fn analyze_selected(&self) -> LabResult<MaterialAnalysis> {
        let material = self.inventory.selected()?;
        Ok(analyze(material, &self.catalog))
    }

    pub fn available_stats(&self) -> AvailableStats {
        available_stats(&self.catalog, self.inventory.materials())
    }

    pub fn research(&self) -> ResearchReport {
        calculate_research(&self.catalog, self.inventory.materials())
    }

    pub fn generate_reward(&mut self, rarity: RewardRarity, global_count: u32) -> &Reward {
        let reward = generate_reward(
            rarity,
            global_count,
            &self.settings,
            Utc::now(),
            &mut self.rng.stream("rewards"),
        );
        self.rewards.record(reward)
    }

    pub fn advance_hour(&mut self) {
        self.ecology.tick(&self.settings.ecology, false);
    }

    pub fn advance_day(&mut self) {
        self.ecology.advance_day(&self.settings.ecology);
    }

    pub fn harvest(&mut self) {
        self.ecology.harvest(&self.settings.ecology);
    }

    pub fn reset_ecology(&mut self) {
        self.ecology.reset();
    }

    pub fn generate_mystery_budget(&mut self, biome: Biome, density: Density) -> &mut MysteryBudget {
        let budget = generate_mystery_budget(
            &self.settings,
            biome,
            density,
            Utc::now(),
            &mut self.rng.stream("mystery"),
        );
        self.mystery.insert(budget)
    }

    /// Plays one round of a verb to completion on the "verbs" stream.
    /// Decode uses `answer` when given, otherwise the shown pattern's own
    /// answer; a wrong answer is an error.
    pub fn play_verb(&mut self, kind: VerbKind, answer: Option<&str>) -> LabResult<VerbOutcome> {
        let mut rng = self.rng.stream("verbs");
        let outcome = match kind {
            VerbKind::Trace => {
                let mut verb = TraceVerb::new();
                verb.start(&mut rng)?;
                verb.triangulate()?;
                verb.reveal()?
            }
            VerbKind::Sample => {
                let mut verb = SampleVerb::new();
                verb.start()?;
                let target = rng.roll_index(verb.remaining());
                verb.sample(target, &mut rng)?
            }
            VerbKind::Decode => {
                let mut verb = DecodeVerb::new(&mut rng);
                let pattern = verb.pattern();
                let answer = answer.unwrap_or(pattern.answer);
                verb.submit(answer, &mut rng)?.ok_or_else(|| {
                    LabError::InvalidArgument(format!(
                        "'{answer}' does not decode {}",
                        pattern.glyphs
                    ))
                })?
            }
            VerbKind::Shadow => {
                let mut verb = ShadowVerb::new();
                verb.start()?;
                loop {
                    if let VerbProgress::Done(outcome) = verb.advance(&mut rng)? {
                        break outcome;
                    }
                }
            }
            VerbKind::Excavate => {
                let mut verb = ExcavateVerb::new();
                verb.start()?;
                loop {
                    if let VerbProgress::Done(outcome) = verb.dig(&mut rng)? {
                        break outcome;
                    }
                }
            }
        };
        info!(verb = %kind, discovery = %outcome.discovery, rep = outcome.rep_gain, "verb complete");
        Ok(outcome)
    }

    pub fn start_loop_phase(&mut self, phase: LoopPhase, at: DateTime<Utc>) -> LabResult<()> {
        self.loop_timer.start_phase(phase, at)
    }

    /// Completing the last phase also feeds the loop time into the metrics.
    pub fn complete_loop_phase(&mut self, at: DateTime<Utc>) -> LabResult<Option<LoopReport>> {
        let report = self
            .loop_timer
            .complete_phase(at, &self.settings.loop_targets)?;
        if let Some(report) = &report {
            self.metrics.record_loop(report, at);
        }
        Ok(report)
    }

    pub fn record_curiosity(&mut self) -> f64 {
        self.metrics
            .record_curiosity(Utc::now(), &mut self.rng.stream("metrics"))
    }

    pub fn record_souvenir(&mut self) -> u32 {
        self.metrics.record_souvenir(Utc::now())
    }

    pub fn record_prediction(&mut self) -> bool {
        self.metrics
            .record_prediction(Utc::now(), &mut self.rng.stream("metrics"))
    }

    pub fn metrics_report(&self) -> MetricsReport {
        self.metrics.report(&self.settings)
    }

    /// Clears the metrics and the reward log.
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
        self.rewards.clear();
    }

    pub fn metrics_export(&self, now: DateTime<Utc>) -> MetricsExport<'_> {
        MetricsExport {
            metrics: &self.metrics,
            rewards: self.rewards.rewards(),
            ecology: &self.ecology,
            loop_timers: self.loop_timer.timings(),
            timestamp: now,
        }
    }

    pub fn apply_setting(&mut self, key: &str, value: &str) -> LabResult<()> {
        self.settings.apply(key, value)
    }

    /// Swaps in a whole settings document. Invalid settings are rejected
    /// and the current ones kept.
    pub fn replace_settings(&mut self, settings: Settings) -> LabResult<()> {
        settings.validate()?;
        self.settings = settings;
        info!("settings replaced");
        Ok(())
    }

    /// Bulk reset of the inventory and the reward log.
    pub fn reset(&mut self) {
        self.inventory.clear();
        self.rewards.clear();
        info!("inventory and rewards cleared");
    }
}

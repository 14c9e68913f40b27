use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{rng::Roll, settings::Settings, systems::LoopReport};

const CURIOSITY_STEP: f64 = 15.0;
const PREDICTION_HIT_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    Curiosity,
    Souvenir,
    Predictive,
    LoopTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub metric: MetricKind,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Predictions {
    pub total: u32,
    pub correct: u32,
}

impl Predictions {
    /// Percent of correct predictions, `None` before the first one.
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| f64::from(self.correct) * 100.0 / f64::from(self.total))
    }
}

/// Play-test metrics gathered during a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub curiosity: f64,
    /// Seconds taken by the last completed loop.
    pub loop_time: u64,
    pub souvenirs: u32,
    pub predictions: Predictions,
    pub history: Vec<MetricSample>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn sample(&mut self, metric: MetricKind, value: f64, now: DateTime<Utc>) {
        self.history.push(MetricSample {
            timestamp: now,
            metric,
            value,
        });
    }

    pub fn record_curiosity<R: Roll>(&mut self, now: DateTime<Utc>, rng: &mut R) -> f64 {
        self.curiosity = (self.curiosity + rng.roll() * CURIOSITY_STEP).min(100.0);
        self.sample(MetricKind::Curiosity, self.curiosity, now);
        self.curiosity
    }

    pub fn record_souvenir(&mut self, now: DateTime<Utc>) -> u32 {
        self.souvenirs += 1;
        self.sample(MetricKind::Souvenir, f64::from(self.souvenirs), now);
        self.souvenirs
    }

    /// Counts one prediction, correct when the draw lands above 0.4.
    pub fn record_prediction<R: Roll>(&mut self, now: DateTime<Utc>, rng: &mut R) -> bool {
        self.predictions.total += 1;
        let correct = rng.roll() > PREDICTION_HIT_THRESHOLD;
        if correct {
            self.predictions.correct += 1;
        }
        let rate = self.predictions.success_rate().unwrap_or(0.0);
        self.sample(MetricKind::Predictive, rate, now);
        correct
    }

    pub fn record_loop(&mut self, report: &LoopReport, now: DateTime<Utc>) {
        self.loop_time = report.total_seconds;
        self.sample(MetricKind::LoopTime, report.total_seconds as f64, now);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self, settings: &Settings) -> MetricsReport {
        let targets = &settings.metrics_targets;
        let loops = &settings.loop_targets;
        let predictive_rate = self.predictions.success_rate();
        let loop_minutes = self.loop_time as f64 / 60.0;
        let completed_loop = self.loop_time > 0;

        MetricsReport {
            curiosity: self.curiosity,
            curiosity_target: targets.curiosity,
            curiosity_met: self.curiosity >= targets.curiosity,
            souvenirs: self.souvenirs,
            souvenir_interval_minutes: targets.souvenir_time,
            predictive_rate,
            predictive_target: targets.predictive,
            predictive_met: predictive_rate.is_some_and(|rate| rate >= targets.predictive),
            predictive_parity: predictive_rate
                .is_some_and(|rate| (rate - targets.predictive).abs() <= targets.parity_tolerance),
            loop_time_seconds: self.loop_time,
            loop_within_micro: completed_loop
                && loop_minutes >= loops.micro_min as f64
                && loop_minutes <= loops.micro_max as f64,
            loop_within_macro: completed_loop
                && loop_minutes >= loops.macro_min as f64
                && loop_minutes <= loops.macro_max as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub curiosity: f64,
    pub curiosity_target: f64,
    pub curiosity_met: bool,
    pub souvenirs: u32,
    pub souvenir_interval_minutes: f64,
    pub predictive_rate: Option<f64>,
    pub predictive_target: f64,
    pub predictive_met: bool,
    /// Success rate within the parity tolerance of the target.
    pub predictive_parity: bool,
    pub loop_time_seconds: u64,
    pub loop_within_micro: bool,
    pub loop_within_macro: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rng::SequenceRoll, systems::LoopTimings};

    #[test]
    fn curiosity_is_capped() {
        let mut metrics = Metrics::new();
        let mut rng = SequenceRoll::constant(0.999_999_999);
        for _ in 0..10 {
            metrics.record_curiosity(Utc::now(), &mut rng);
        }
        assert_eq!(metrics.curiosity, 100.0);
        assert_eq!(metrics.history.len(), 10);
    }

    #[test]
    fn predictions_split_at_threshold() {
        let mut metrics = Metrics::new();
        let mut rng = SequenceRoll::new(vec![0.9, 0.4, 0.41, 0.1, 0.8]);
        let hits: Vec<bool> = (0..5)
            .map(|_| metrics.record_prediction(Utc::now(), &mut rng))
            .collect();
        assert_eq!(hits, vec![true, false, true, false, true]);
        assert_eq!(metrics.predictions.success_rate(), Some(60.0));

        let report = metrics.report(&Settings::default());
        assert!(report.predictive_met);
        assert!(report.predictive_parity);
    }

    #[test]
    fn report_without_data_meets_nothing() {
        let report = Metrics::new().report(&Settings::default());
        assert_eq!(report.predictive_rate, None);
        assert!(!report.predictive_parity);
        assert!(!report.curiosity_met);
        assert!(!report.loop_within_micro);
    }

    #[test]
    fn loop_report_feeds_loop_time() {
        let mut metrics = Metrics::new();
        let report = LoopReport {
            total_seconds: 420,
            breakdown: LoopTimings::default(),
            target_seconds: (300, 480),
            optimal: true,
        };
        metrics.record_loop(&report, Utc::now());
        metrics.record_souvenir(Utc::now());
        let summary = metrics.report(&Settings::default());
        assert!(summary.loop_within_micro);
        assert!(!summary.loop_within_macro);
        assert_eq!(summary.souvenirs, 1);

        metrics.reset();
        assert_eq!(metrics, Metrics::new());
    }
}

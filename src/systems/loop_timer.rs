use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::{error::LabError, settings::LoopTargets};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopPhase {
    Detect,
    Approach,
    Interact,
    Reward,
    Record,
}

impl LoopPhase {
    pub const ALL: [LoopPhase; 5] = [
        LoopPhase::Detect,
        LoopPhase::Approach,
        LoopPhase::Interact,
        LoopPhase::Reward,
        LoopPhase::Record,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoopPhase::Detect => "detect",
            LoopPhase::Approach => "approach",
            LoopPhase::Interact => "interact",
            LoopPhase::Reward => "reward",
            LoopPhase::Record => "record",
        }
    }

    fn next(self) -> Option<LoopPhase> {
        match self {
            LoopPhase::Detect => Some(LoopPhase::Approach),
            LoopPhase::Approach => Some(LoopPhase::Interact),
            LoopPhase::Interact => Some(LoopPhase::Reward),
            LoopPhase::Reward => Some(LoopPhase::Record),
            LoopPhase::Record => None,
        }
    }
}

impl fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole seconds spent in each phase of the current loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct LoopTimings {
    pub detect: u64,
    pub approach: u64,
    pub interact: u64,
    pub reward: u64,
    pub record: u64,
}

impl LoopTimings {
    pub fn get(&self, phase: LoopPhase) -> u64 {
        match phase {
            LoopPhase::Detect => self.detect,
            LoopPhase::Approach => self.approach,
            LoopPhase::Interact => self.interact,
            LoopPhase::Reward => self.reward,
            LoopPhase::Record => self.record,
        }
    }

    fn set(&mut self, phase: LoopPhase, seconds: u64) {
        let slot = match phase {
            LoopPhase::Detect => &mut self.detect,
            LoopPhase::Approach => &mut self.approach,
            LoopPhase::Interact => &mut self.interact,
            LoopPhase::Reward => &mut self.reward,
            LoopPhase::Record => &mut self.record,
        };
        *slot = seconds;
    }

    pub fn total(&self) -> u64 {
        LoopPhase::ALL.iter().map(|phase| self.get(*phase)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopReport {
    pub total_seconds: u64,
    pub breakdown: LoopTimings,
    pub target_seconds: (u64, u64),
    pub optimal: bool,
}

impl LoopReport {
    pub fn formatted_total(&self) -> String {
        format!("{}:{:02}", self.total_seconds / 60, self.total_seconds % 60)
    }
}

/// Detect, approach, interact, reward, record, in that order. Only the
/// current phase can be started; completing `record` closes the loop.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopTimer {
    current: LoopPhase,
    #[serde(skip)]
    started_at: Option<DateTime<Utc>>,
    timings: LoopTimings,
}

impl LoopTimer {
    pub fn new() -> Self {
        Self {
            current: LoopPhase::Detect,
            started_at: None,
            timings: LoopTimings::default(),
        }
    }

    pub fn current_phase(&self) -> LoopPhase {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn timings(&self) -> &LoopTimings {
        &self.timings
    }

    pub fn start_phase(&mut self, phase: LoopPhase, at: DateTime<Utc>) -> Result<(), LabError> {
        let current = self.current_phase();
        if phase != current {
            return Err(LabError::UnsupportedOperation(format!(
                "cannot start {phase}, the loop is waiting on {current}"
            )));
        }
        if self.is_running() {
            return Err(LabError::UnsupportedOperation(format!("{phase} is already running")));
        }
        self.started_at = Some(at);
        Ok(())
    }

    /// Stops the running phase. Returns the loop report once `record`
    /// completes, after which the timer is back at `detect`.
    pub fn complete_phase(
        &mut self,
        at: DateTime<Utc>,
        targets: &LoopTargets,
    ) -> Result<Option<LoopReport>, LabError> {
        let started = self
            .started_at
            .take()
            .ok_or_else(|| LabError::UnsupportedOperation("no phase is running".into()))?;
        let phase = self.current_phase();
        let elapsed = (at - started).num_seconds().max(0) as u64;
        self.timings.set(phase, elapsed);

        match phase.next() {
            Some(next) => {
                self.current = next;
                Ok(None)
            }
            None => {
                let report = self.finish(targets);
                *self = Self::new();
                Ok(Some(report))
            }
        }
    }

    fn finish(&self, targets: &LoopTargets) -> LoopReport {
        let total_seconds = self.timings.total();
        let target_seconds = (targets.micro_min * 60, targets.micro_max * 60);
        let optimal = (target_seconds.0..=target_seconds.1).contains(&total_seconds);
        info!(total_seconds, optimal, "exploration loop complete");
        LoopReport {
            total_seconds,
            breakdown: self.timings,
            target_seconds,
            optimal,
        }
    }
}

impl Default for LoopTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    fn run_loop(timer: &mut LoopTimer, lengths: [i64; 5]) -> Option<LoopReport> {
        let targets = LoopTargets::default();
        let mut clock = 0;
        let mut report = None;
        for (phase, length) in LoopPhase::ALL.into_iter().zip(lengths) {
            timer.start_phase(phase, t(clock)).unwrap();
            clock += length;
            report = timer.complete_phase(t(clock), &targets).unwrap();
        }
        report
    }

    #[test]
    fn phases_must_run_in_order() {
        let mut timer = LoopTimer::new();
        assert!(timer.start_phase(LoopPhase::Interact, t(0)).is_err());
        assert!(timer.complete_phase(t(5), &LoopTargets::default()).is_err());
        assert!(!timer.is_running());
        timer.start_phase(LoopPhase::Detect, t(0)).unwrap();
        assert!(timer.is_running());
        assert!(timer.start_phase(LoopPhase::Detect, t(1)).is_err());
        timer.complete_phase(t(30), &LoopTargets::default()).unwrap();
        assert!(!timer.is_running());
        assert_eq!(timer.current_phase(), LoopPhase::Approach);
        assert_eq!(timer.timings().detect, 30);
    }

    #[test]
    fn six_minute_loop_is_optimal() {
        let mut timer = LoopTimer::new();
        let report = run_loop(&mut timer, [60, 90, 120, 30, 60]).unwrap();
        assert_eq!(report.total_seconds, 360);
        assert_eq!(report.formatted_total(), "6:00");
        assert_eq!(report.breakdown.interact, 120);
        assert!(report.optimal);
        assert_eq!(timer.current_phase(), LoopPhase::Detect);
        assert_eq!(timer.timings().total(), 0);
    }

    #[test]
    fn short_loop_is_flagged() {
        let mut timer = LoopTimer::new();
        let report = run_loop(&mut timer, [10, 10, 10, 10, 10]).unwrap();
        assert!(!report.optimal);
        assert_eq!(report.target_seconds, (300, 480));
    }
}

//! Exploration verb mini-games.
//!
//! Each verb walks Idle -> Running -> Revealing -> Complete through explicit
//! calls, so a caller decides how long any stage lasts.

use std::{fmt, str::FromStr};

use serde::Serialize;

use crate::{error::LabError, rng::Roll};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbPhase {
    #[default]
    Idle,
    Running,
    Revealing,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbKind {
    Trace,
    Sample,
    Decode,
    Shadow,
    Excavate,
}

impl VerbKind {
    pub const ALL: [VerbKind; 5] = [
        VerbKind::Trace,
        VerbKind::Sample,
        VerbKind::Decode,
        VerbKind::Shadow,
        VerbKind::Excavate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VerbKind::Trace => "trace",
            VerbKind::Sample => "sample",
            VerbKind::Decode => "decode",
            VerbKind::Shadow => "shadow",
            VerbKind::Excavate => "excavate",
        }
    }
}

impl fmt::Display for VerbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerbKind {
    type Err = LabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        VerbKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| LabError::InvalidArgument(format!("unknown verb '{value}'")))
    }
}

/// What a finished verb hands back. `quality` is the verb's percentage
/// readout: trace accuracy, sample purity or artifact condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerbOutcome {
    pub verb: VerbKind,
    pub discovery: String,
    pub quality: Option<f64>,
    pub rep_gain: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum VerbProgress<T> {
    Continuing(T),
    Done(VerbOutcome),
}

fn expect_phase(kind: VerbKind, actual: VerbPhase, allowed: &[VerbPhase]) -> Result<(), LabError> {
    if allowed.contains(&actual) {
        Ok(())
    } else {
        Err(LabError::UnsupportedOperation(format!(
            "{kind} cannot do that while {actual:?}"
        )))
    }
}

fn roll_rep<R: Roll>(rng: &mut R, span: f64, min: f64) -> u32 {
    (rng.roll() * span + min).floor() as u32
}

const FIELD_WIDTH: f64 = 400.0;
const FIELD_HEIGHT: f64 = 300.0;
const SIGNAL_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Signal {
    pub x: f64,
    pub y: f64,
    pub strength: f64,
}

/// Triangulate a deposit from three signals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceVerb {
    phase: VerbPhase,
    signals: Vec<Signal>,
    player: (f64, f64),
    outcome: Option<VerbOutcome>,
}

impl TraceVerb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> VerbPhase {
        self.phase
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn start<R: Roll>(&mut self, rng: &mut R) -> Result<&[Signal], LabError> {
        expect_phase(VerbKind::Trace, self.phase, &[VerbPhase::Idle, VerbPhase::Complete])?;
        self.signals = (0..SIGNAL_COUNT)
            .map(|_| Signal {
                x: rng.roll() * FIELD_WIDTH,
                y: rng.roll() * FIELD_HEIGHT,
                strength: rng.roll_between(50.0, 100.0),
            })
            .collect();
        self.player = (FIELD_WIDTH / 2.0, FIELD_HEIGHT / 2.0);
        self.outcome = None;
        self.phase = VerbPhase::Running;
        Ok(&self.signals)
    }

    /// Scores the player's distance to the signal centroid.
    pub fn triangulate(&mut self) -> Result<f64, LabError> {
        expect_phase(VerbKind::Trace, self.phase, &[VerbPhase::Running])?;
        let count = self.signals.len().max(1) as f64;
        let (sum_x, sum_y) = self
            .signals
            .iter()
            .fold((0.0, 0.0), |(x, y), s| (x + s.x, y + s.y));
        let (cx, cy) = (sum_x / count, sum_y / count);
        let distance = ((cx - self.player.0).powi(2) + (cy - self.player.1).powi(2)).sqrt();
        let accuracy = (100.0 - distance / FIELD_WIDTH * 100.0).max(0.0);
        self.outcome = Some(VerbOutcome {
            verb: VerbKind::Trace,
            discovery: "Catalyst Deposit".into(),
            quality: Some(accuracy),
            rep_gain: accuracy.floor() as u32,
        });
        self.phase = VerbPhase::Revealing;
        Ok(accuracy)
    }

    pub fn reveal(&mut self) -> Result<VerbOutcome, LabError> {
        expect_phase(VerbKind::Trace, self.phase, &[VerbPhase::Revealing])?;
        let outcome = self
            .outcome
            .clone()
            .ok_or_else(|| LabError::UnsupportedOperation("trace has nothing to reveal".into()))?;
        self.phase = VerbPhase::Complete;
        Ok(outcome)
    }
}

const SAMPLE_TARGETS: usize = 6;
const SAMPLE_KINDS: [&str; 6] = ["Enzyme", "Mineral", "Organic", "Crystal", "Gas", "Fluid"];

/// Six targets, each sampleable once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SampleVerb {
    phase: VerbPhase,
    sampled: [bool; SAMPLE_TARGETS],
}

impl SampleVerb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> VerbPhase {
        self.phase
    }

    pub fn remaining(&self) -> usize {
        self.sampled.iter().filter(|taken| !**taken).count()
    }

    pub fn start(&mut self) -> Result<(), LabError> {
        expect_phase(VerbKind::Sample, self.phase, &[VerbPhase::Idle, VerbPhase::Complete])?;
        self.sampled = [false; SAMPLE_TARGETS];
        self.phase = VerbPhase::Running;
        Ok(())
    }

    pub fn sample<R: Roll>(&mut self, target: usize, rng: &mut R) -> Result<VerbOutcome, LabError> {
        expect_phase(VerbKind::Sample, self.phase, &[VerbPhase::Running])?;
        let slot = self.sampled.get_mut(target).ok_or_else(|| {
            LabError::InvalidArgument(format!("sample target {target} is out of range"))
        })?;
        if *slot {
            return Err(LabError::UnsupportedOperation(format!(
                "target {target} was already sampled"
            )));
        }
        *slot = true;

        let kind = SAMPLE_KINDS[rng.roll_index(SAMPLE_KINDS.len())];
        let purity = rng.roll_between(60.0, 100.0);
        let rep_gain = roll_rep(rng, 30.0, 20.0);
        if self.remaining() == 0 {
            self.phase = VerbPhase::Complete;
        }
        Ok(VerbOutcome {
            verb: VerbKind::Sample,
            discovery: kind.to_string(),
            quality: Some(purity),
            rep_gain,
        })
    }
}

pub struct DecodePattern {
    pub glyphs: &'static str,
    pub answer: &'static str,
    pub reward: &'static str,
}

pub static DECODE_PATTERNS: [DecodePattern; 4] = [
    DecodePattern {
        glyphs: "⬡ ⬢ ⬡ ⬢ ⬡",
        answer: "hexagon",
        reward: "Propulsion Blueprint Shard",
    },
    DecodePattern {
        glyphs: "△ ▽ △ ▽ △",
        answer: "triangle",
        reward: "Energy Blueprint Shard",
    },
    DecodePattern {
        glyphs: "◯ ◉ ◯ ◉ ◯",
        answer: "circle",
        reward: "Shield Blueprint Shard",
    },
    DecodePattern {
        glyphs: "101010",
        answer: "binary",
        reward: "Data Core Fragment",
    },
];

/// Name the pattern to unlock its blueprint.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeVerb {
    phase: VerbPhase,
    pattern: usize,
}

impl DecodeVerb {
    pub fn new<R: Roll>(rng: &mut R) -> Self {
        Self {
            phase: VerbPhase::Running,
            pattern: rng.roll_index(DECODE_PATTERNS.len()),
        }
    }

    pub fn phase(&self) -> VerbPhase {
        self.phase
    }

    pub fn pattern(&self) -> &'static DecodePattern {
        &DECODE_PATTERNS[self.pattern]
    }

    /// A wrong answer returns `None` and changes nothing. A right one moves
    /// to Revealing until `next_pattern` queues another.
    pub fn submit<R: Roll>(
        &mut self,
        answer: &str,
        rng: &mut R,
    ) -> Result<Option<VerbOutcome>, LabError> {
        expect_phase(VerbKind::Decode, self.phase, &[VerbPhase::Running])?;
        let pattern = self.pattern();
        if answer.trim().to_lowercase() != pattern.answer {
            return Ok(None);
        }
        self.phase = VerbPhase::Revealing;
        Ok(Some(VerbOutcome {
            verb: VerbKind::Decode,
            discovery: pattern.reward.to_string(),
            quality: None,
            rep_gain: roll_rep(rng, 50.0, 50.0),
        }))
    }

    pub fn next_pattern<R: Roll>(&mut self, rng: &mut R) -> Result<&'static DecodePattern, LabError> {
        expect_phase(VerbKind::Decode, self.phase, &[VerbPhase::Revealing])?;
        self.pattern = rng.roll_index(DECODE_PATTERNS.len());
        self.phase = VerbPhase::Running;
        Ok(self.pattern())
    }
}

pub const SHADOW_PATH: [(f64, f64); 5] = [
    (10.0, 10.0),
    (50.0, 80.0),
    (150.0, 60.0),
    (200.0, 120.0),
    (350.0, 100.0),
];

/// Follow a creature along its migration path.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShadowVerb {
    phase: VerbPhase,
    step: usize,
}

impl ShadowVerb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> VerbPhase {
        self.phase
    }

    pub fn start(&mut self) -> Result<(), LabError> {
        expect_phase(VerbKind::Shadow, self.phase, &[VerbPhase::Idle, VerbPhase::Complete])?;
        self.step = 0;
        self.phase = VerbPhase::Running;
        Ok(())
    }

    /// Moves to the next waypoint; the call after the last waypoint
    /// records the behaviour pattern.
    pub fn advance<R: Roll>(&mut self, rng: &mut R) -> Result<VerbProgress<(f64, f64)>, LabError> {
        expect_phase(VerbKind::Shadow, self.phase, &[VerbPhase::Running, VerbPhase::Revealing])?;
        if let Some(waypoint) = SHADOW_PATH.get(self.step) {
            self.step += 1;
            if self.step == SHADOW_PATH.len() {
                self.phase = VerbPhase::Revealing;
            }
            return Ok(VerbProgress::Continuing(*waypoint));
        }
        self.phase = VerbPhase::Complete;
        Ok(VerbProgress::Done(VerbOutcome {
            verb: VerbKind::Shadow,
            discovery: "Migratory Luminite".into(),
            quality: None,
            rep_gain: roll_rep(rng, 40.0, 30.0),
        }))
    }
}

const DIG_STEP: u32 = 10;
const EXCAVATION_FINDS: [&str; 4] = [
    "Ancient Relic",
    "Precursor Data Cube",
    "Crystalline Artifact",
    "Quantum Fragment",
];

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExcavateVerb {
    phase: VerbPhase,
    progress: u32,
}

impl ExcavateVerb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> VerbPhase {
        self.phase
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn start(&mut self) -> Result<(), LabError> {
        expect_phase(VerbKind::Excavate, self.phase, &[VerbPhase::Idle, VerbPhase::Complete])?;
        self.progress = 0;
        self.phase = VerbPhase::Running;
        Ok(())
    }

    pub fn dig<R: Roll>(&mut self, rng: &mut R) -> Result<VerbProgress<u32>, LabError> {
        expect_phase(VerbKind::Excavate, self.phase, &[VerbPhase::Running])?;
        self.progress = (self.progress + DIG_STEP).min(100);
        if self.progress < 100 {
            return Ok(VerbProgress::Continuing(self.progress));
        }
        self.phase = VerbPhase::Complete;
        let find = EXCAVATION_FINDS[rng.roll_index(EXCAVATION_FINDS.len())];
        let condition = rng.roll_between(70.0, 100.0);
        Ok(VerbProgress::Done(VerbOutcome {
            verb: VerbKind::Excavate,
            discovery: find.to_string(),
            quality: Some(condition),
            rep_gain: roll_rep(rng, 60.0, 40.0),
        }))
    }
}

//! Random draws for every generator in the lab.
//!
//! Subsystems pull from named ChaCha8 streams so that one seed reproduces a
//! whole session. Domain code only ever sees the [`Roll`] trait, which lets
//! tests swap in a [`SequenceRoll`] with hand-picked draws.

use std::collections::HashMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub struct RngManager {
    master: ChaCha8Rng,
    streams: HashMap<String, ChaCha8Rng>,
}

impl RngManager {
    pub fn new(seed: u64) -> Self {
        Self {
            master: ChaCha8Rng::seed_from_u64(seed),
            streams: HashMap::new(),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            master: ChaCha8Rng::from_entropy(),
            streams: HashMap::new(),
        }
    }

    pub fn stream(&mut self, name: &str) -> SystemRng<'_> {
        let entry = self.streams.entry(name.to_string()).or_insert_with(|| {
            let mut seed_bytes = [0u8; 8];
            self.master.fill_bytes(&mut seed_bytes);
            ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed_bytes))
        });
        SystemRng { inner: entry }
    }
}

pub struct SystemRng<'a> {
    inner: &'a mut ChaCha8Rng,
}

impl<'a> RngCore for SystemRng<'a> {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Source of uniform draws in `[0, 1)`.
pub trait Roll {
    fn roll(&mut self) -> f64;

    /// `floor(roll * len)`, kept inside the slice bounds.
    fn roll_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let index = (self.roll() * len as f64).floor() as usize;
        index.min(len - 1)
    }

    fn roll_between(&mut self, min: f64, max: f64) -> f64 {
        min + self.roll() * (max - min)
    }

    /// Uniform integer in `min..=max`.
    fn roll_inclusive(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f64;
        min + ((self.roll() * span).floor() as u32).min(max - min)
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            let index = self.roll_index(items.len());
            items.get(index)
        }
    }
}

impl<R: RngCore> Roll for R {
    fn roll(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct SequenceRoll {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRoll {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let values = values
            .into()
            .into_iter()
            .map(|value| value.clamp(0.0, 0.999_999_999))
            .collect();
        Self { values, cursor: 0 }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl Roll for SequenceRoll {
    fn roll(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

//! Discovery rewards with first-discoverer bonuses and diminishing returns.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::LabError, rng::Roll, settings::Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardRarity {
    Common,
    Uncommon,
    Rare,
    Unique,
}

impl RewardRarity {
    pub const ALL: [RewardRarity; 4] = [
        RewardRarity::Common,
        RewardRarity::Uncommon,
        RewardRarity::Rare,
        RewardRarity::Unique,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RewardRarity::Common => "common",
            RewardRarity::Uncommon => "uncommon",
            RewardRarity::Rare => "rare",
            RewardRarity::Unique => "unique",
        }
    }

    pub fn reward_types(self) -> &'static [&'static str] {
        match self {
            RewardRarity::Common => &["Blueprint Shard", "Catalyst Sample", "Data Fragment"],
            RewardRarity::Uncommon => &["Refined Catalyst", "Complete Blueprint", "Specimen Card"],
            RewardRarity::Rare => &["Artifact", "Advanced Blueprint", "Data Core"],
            RewardRarity::Unique => &["Ancient Relic", "Legendary Blueprint", "Precursor Artifact"],
        }
    }
}

impl fmt::Display for RewardRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardRarity {
    type Err = LabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        RewardRarity::ALL
            .into_iter()
            .find(|rarity| rarity.as_str() == value)
            .ok_or_else(|| LabError::InvalidArgument(format!("unknown reward rarity '{value}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(rename = "type")]
    pub kind: String,
    pub rarity: RewardRarity,
    pub rep_gain: u32,
    pub global_count: u32,
    pub is_first_discoverer: bool,
    #[serde(rename = "baseREP")]
    pub base_rep: u32,
    pub multiplier: f64,
    pub timestamp: DateTime<Utc>,
}

/// `max(repFloor / 100, 1 - count * diminishingReturnsRate / 100)`.
pub fn diminishing_multiplier(settings: &Settings, global_count: u32) -> f64 {
    let floor = settings.rep_floor / 100.0;
    let decay = 1.0 - f64::from(global_count) * settings.diminishing_returns_rate / 100.0;
    decay.max(floor)
}

/// Builds a reward for a discovery already made `global_count` times.
/// One draw picks the reward type.
pub fn generate_reward<R: Roll>(
    rarity: RewardRarity,
    global_count: u32,
    settings: &Settings,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Reward {
    let kind = rng
        .pick(rarity.reward_types())
        .copied()
        .unwrap_or_default()
        .to_string();
    let base_rep = settings.rep_values.for_reward(rarity);
    let is_first_discoverer = global_count == 0;
    let first_bonus = if is_first_discoverer {
        settings.first_discoverer_multiplier
    } else {
        1.0
    };
    let multiplier = diminishing_multiplier(settings, global_count);
    let rep_gain = (f64::from(base_rep) * first_bonus * multiplier).floor() as u32;

    Reward {
        kind,
        rarity,
        rep_gain,
        global_count,
        is_first_discoverer,
        base_rep,
        multiplier,
        timestamp: now,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardStats {
    pub counts: BTreeMap<RewardRarity, usize>,
    pub total_rep: u64,
    pub average_rep: u64,
}

/// Append-only record of generated rewards.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewardLog {
    rewards: Vec<Reward>,
}

impl RewardLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, reward: Reward) -> &Reward {
        self.rewards.push(reward);
        &self.rewards[self.rewards.len() - 1]
    }

    pub fn rewards(&self) -> &[Reward] {
        &self.rewards
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn clear(&mut self) {
        self.rewards.clear();
    }

    pub fn stats(&self) -> RewardStats {
        let mut counts: BTreeMap<RewardRarity, usize> =
            RewardRarity::ALL.into_iter().map(|rarity| (rarity, 0)).collect();
        let mut total_rep = 0u64;
        for reward in &self.rewards {
            *counts.entry(reward.rarity).or_default() += 1;
            total_rep += u64::from(reward.rep_gain);
        }
        let average_rep = if self.rewards.is_empty() {
            0
        } else {
            total_rep / self.rewards.len() as u64
        };
        RewardStats {
            counts,
            total_rep,
            average_rep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SequenceRoll;

    #[test]
    fn first_discovery_doubles_base() {
        let settings = Settings::default();
        let reward = generate_reward(
            RewardRarity::Rare,
            0,
            &settings,
            Utc::now(),
            &mut SequenceRoll::constant(0.0),
        );
        assert_eq!(reward.kind, "Artifact");
        assert_eq!(reward.rep_gain, 200);
        assert!(reward.is_first_discoverer);
        assert_eq!(reward.multiplier, 1.0);
    }

    #[test]
    fn diminishing_returns_bottom_out_at_floor() {
        let settings = Settings::default();
        assert!((diminishing_multiplier(&settings, 4) - 0.8).abs() < 1e-9);
        assert_eq!(diminishing_multiplier(&settings, 50), 0.1);
        let reward = generate_reward(
            RewardRarity::Unique,
            1000,
            &settings,
            Utc::now(),
            &mut SequenceRoll::constant(0.9),
        );
        assert_eq!(reward.kind, "Precursor Artifact");
        assert_eq!(reward.rep_gain, 25);
    }

    #[test]
    fn serializes_with_document_keys() {
        let reward = generate_reward(
            RewardRarity::Common,
            3,
            &Settings::default(),
            Utc::now(),
            &mut SequenceRoll::constant(0.5),
        );
        let json = serde_json::to_value(&reward).unwrap();
        assert_eq!(json["type"], "Catalyst Sample");
        assert_eq!(json["baseREP"], 20);
        assert_eq!(json["isFirstDiscoverer"], false);
        assert_eq!(json["globalCount"], 3);
    }

    #[test]
    fn log_stats_floor_the_average() {
        let settings = Settings::default();
        let mut log = RewardLog::new();
        assert_eq!(log.stats().average_rep, 0);
        let mut rng = SequenceRoll::constant(0.1);
        for (rarity, count) in [(RewardRarity::Common, 0), (RewardRarity::Uncommon, 1)] {
            log.record(generate_reward(rarity, count, &settings, Utc::now(), &mut rng));
        }
        // 40 + floor(50 * 0.95) = 87
        let stats = log.stats();
        assert_eq!(stats.total_rep, 87);
        assert_eq!(stats.average_rep, 43);
        assert_eq!(stats.counts[&RewardRarity::Uncommon], 1);
        assert_eq!(stats.counts[&RewardRarity::Unique], 0);
        log.clear();
        assert!(log.is_empty());
    }
}

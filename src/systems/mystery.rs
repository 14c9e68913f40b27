//! Mystery budget maps: how many landmarks, micro points of interest and
//! hidden secrets a stretch of terrain holds.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{error::LabError, material::Biome, rng::Roll, settings::Settings};

pub const MAP_WIDTH: f64 = 600.0;
pub const MAP_HEIGHT: f64 = 400.0;
const LANDMARK_MARGIN: f64 = 50.0;
const REVEAL_RADIUS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Sparse,
    #[default]
    Normal,
    Dense,
}

impl Density {
    pub fn as_str(self) -> &'static str {
        match self {
            Density::Sparse => "sparse",
            Density::Normal => "normal",
            Density::Dense => "dense",
        }
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Density {
    type Err = LabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sparse" => Ok(Density::Sparse),
            "normal" => Ok(Density::Normal),
            "dense" => Ok(Density::Dense),
            other => Err(LabError::InvalidArgument(format!("unknown density '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    High,
    Medium,
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed: Option<bool>,
}

impl MapPoint {
    fn distance_to(&self, x: f64, y: f64) -> f64 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed.unwrap_or(true)
    }
}

struct PointTable {
    landmarks: &'static [&'static str],
    micro_points: &'static [&'static str],
    secrets: &'static [&'static str],
}

const VOLCANIC: PointTable = PointTable {
    landmarks: &["Lava Peak", "Caldera", "Geothermal Vent", "Obsidian Tower"],
    micro_points: &["Sulfur Crystal", "Thermal Glow", "Magma Pool", "Ash Formation"],
    secrets: &["Ancient Lava Tube", "Cooling Chamber", "Mineral Vein"],
};

fn point_table(biome: Biome) -> &'static PointTable {
    const ARCTIC: PointTable = PointTable {
        landmarks: &["Ice Spire", "Glacier", "Frozen Waterfall", "Snow Monument"],
        micro_points: &["Ice Crystal", "Frozen Nest", "Aurora Glow", "Snow Formation"],
        secrets: &["Ice Cave", "Buried Structure", "Frozen Artifact"],
    };
    const FOREST: PointTable = PointTable {
        landmarks: &["Ancient Tree", "Canopy Tower", "Stone Circle", "Overgrown Ruins"],
        micro_points: &["Bioluminescent Fungus", "Nest", "Rare Flower", "Crystal Formation"],
        secrets: &["Hidden Grove", "Underground Root System", "Treehouse Ruins"],
    };
    const DESERT: PointTable = PointTable {
        landmarks: &["Rock Formation", "Sand Dune Peak", "Stone Arch", "Oasis"],
        micro_points: &["Desert Glass", "Fossil", "Cactus Bloom", "Wind Pattern"],
        secrets: &["Buried Temple", "Underground Spring", "Ancient Caravan"],
    };
    const OCEAN: PointTable = PointTable {
        landmarks: &["Coral Tower", "Underwater Volcano", "Trench", "Reef Monument"],
        micro_points: &["Bioluminescent Algae", "Shell Formation", "Thermal Vent", "Rare Coral"],
        secrets: &["Sunken Ship", "Cave System", "Abyssal Creature"],
    };
    const CAVE: PointTable = PointTable {
        landmarks: &["Stalactite Formation", "Underground Lake", "Crystal Chamber", "Chasm"],
        micro_points: &["Glowing Mineral", "Fossil", "Mushroom Colony", "Echo Chamber"],
        secrets: &["Hidden Passage", "Buried Treasure", "Ancient Drawing"],
    };
    const ASTEROID: PointTable = PointTable {
        landmarks: &["Core Fragment", "Impact Crater", "Metal Deposit", "Gravity Anomaly"],
        micro_points: &["Rare Element", "Space Crystal", "Metallic Formation", "Void Pocket"],
        secrets: &["Alien Structure", "Ancient Tech", "Unstable Core"],
    };

    match biome {
        Biome::Arctic => &ARCTIC,
        Biome::Forest => &FOREST,
        Biome::Desert => &DESERT,
        Biome::Ocean => &OCEAN,
        Biome::Cave => &CAVE,
        Biome::Asteroid => &ASTEROID,
        // no dedicated tables for these
        Biome::Volcanic | Biome::Space | Biome::Radioactive => &VOLCANIC,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MysteryBudget {
    pub biome: Biome,
    pub density: Density,
    pub landmarks: Vec<MapPoint>,
    pub micro_points: Vec<MapPoint>,
    pub occluded_secrets: Vec<MapPoint>,
    pub total_area: f64,
    pub generated_at: DateTime<Utc>,
}

/// Lays out a fresh map. Counts come from the density's configured ranges;
/// each point draws x, y, then its kind.
pub fn generate_mystery_budget<R: Roll>(
    settings: &Settings,
    biome: Biome,
    density: Density,
    now: DateTime<Utc>,
    rng: &mut R,
) -> MysteryBudget {
    let ranges = settings.mystery_budget.for_density(density);
    let table = point_table(biome);

    let landmark_count = rng.roll_inclusive(ranges.landmarks[0], ranges.landmarks[1]);
    let landmarks = (0..landmark_count)
        .map(|_| {
            let x = LANDMARK_MARGIN + rng.roll() * (MAP_WIDTH - 2.0 * LANDMARK_MARGIN);
            let y = LANDMARK_MARGIN + rng.roll() * (MAP_HEIGHT - 2.0 * LANDMARK_MARGIN);
            place(x, y, table.landmarks, Visibility::High, None, rng)
        })
        .collect();

    let micro_count = rng.roll_inclusive(ranges.micro_points[0], ranges.micro_points[1]);
    let micro_points = (0..micro_count)
        .map(|_| {
            let (x, y) = anywhere(rng);
            place(x, y, table.micro_points, Visibility::Medium, None, rng)
        })
        .collect();

    let secret_count = rng.roll_inclusive(ranges.secrets[0], ranges.secrets[1]);
    let occluded_secrets = (0..secret_count)
        .map(|_| {
            let (x, y) = anywhere(rng);
            place(x, y, table.secrets, Visibility::Hidden, Some(false), rng)
        })
        .collect();

    debug!(
        %biome,
        %density,
        landmarks = landmark_count,
        micro_points = micro_count,
        secrets = secret_count,
        "mystery budget generated"
    );

    MysteryBudget {
        biome,
        density,
        landmarks,
        micro_points,
        occluded_secrets,
        total_area: MAP_WIDTH * MAP_HEIGHT,
        generated_at: now,
    }
}

fn anywhere<R: Roll>(rng: &mut R) -> (f64, f64) {
    let x = rng.roll() * MAP_WIDTH;
    let y = rng.roll() * MAP_HEIGHT;
    (x, y)
}

fn place<R: Roll>(
    x: f64,
    y: f64,
    kinds: &[&str],
    visibility: Visibility,
    revealed: Option<bool>,
    rng: &mut R,
) -> MapPoint {
    MapPoint {
        x,
        y,
        kind: rng.pick(kinds).copied().unwrap_or_default().to_string(),
        visibility,
        revealed,
    }
}

impl MysteryBudget {
    pub fn reveal_all(&mut self) -> usize {
        let mut revealed = 0;
        for secret in &mut self.occluded_secrets {
            if secret.revealed == Some(false) {
                secret.revealed = Some(true);
                revealed += 1;
            }
        }
        revealed
    }

    /// Reveals hidden secrets within reach of a scan at `(x, y)`.
    pub fn reveal_at(&mut self, x: f64, y: f64) -> Vec<MapPoint> {
        let mut found = Vec::new();
        for secret in &mut self.occluded_secrets {
            if secret.revealed == Some(false) && secret.distance_to(x, y) < REVEAL_RADIUS {
                secret.revealed = Some(true);
                found.push(secret.clone());
            }
        }
        found
    }

    pub fn revealed_count(&self) -> usize {
        self.occluded_secrets.iter().filter(|s| s.is_revealed()).count()
    }

    pub fn hidden_count(&self) -> usize {
        self.occluded_secrets.len() - self.revealed_count()
    }

    /// Secrets per ten minutes of travel.
    pub fn mystery_quota(&self) -> f64 {
        self.occluded_secrets.len() as f64 / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SequenceRoll;

    #[test]
    fn counts_follow_configured_ranges() {
        let settings = Settings::default();
        let low = generate_mystery_budget(
            &settings,
            Biome::Forest,
            Density::Dense,
            Utc::now(),
            &mut SequenceRoll::constant(0.0),
        );
        assert_eq!(low.landmarks.len(), 3);
        assert_eq!(low.micro_points.len(), 30);
        assert_eq!(low.occluded_secrets.len(), 5);
        assert_eq!(low.landmarks[0].kind, "Ancient Tree");
        assert_eq!(low.landmarks[0].x, 50.0);

        let high = generate_mystery_budget(
            &settings,
            Biome::Forest,
            Density::Sparse,
            Utc::now(),
            &mut SequenceRoll::constant(0.999_999),
        );
        assert_eq!(high.landmarks.len(), 2);
        assert_eq!(high.micro_points.len(), 12);
        assert_eq!(high.occluded_secrets.len(), 3);
        assert!(high.landmarks.iter().all(|l| l.x < 550.0 && l.y < 350.0));
    }

    #[test]
    fn unknown_biomes_fall_back_to_volcanic() {
        let budget = generate_mystery_budget(
            &Settings::default(),
            Biome::Space,
            Density::Normal,
            Utc::now(),
            &mut SequenceRoll::constant(0.0),
        );
        assert_eq!(budget.landmarks[0].kind, "Lava Peak");
        assert_eq!(budget.occluded_secrets[0].kind, "Ancient Lava Tube");
        assert_eq!(budget.total_area, 240_000.0);
    }

    #[test]
    fn reveal_at_only_reaches_nearby_secrets() {
        let mut budget = generate_mystery_budget(
            &Settings::default(),
            Biome::Cave,
            Density::Normal,
            Utc::now(),
            &mut SequenceRoll::new(vec![0.5, 0.25, 0.75]),
        );
        let hidden = budget.hidden_count();
        assert!(hidden >= 3);
        let (x, y) = (budget.occluded_secrets[0].x, budget.occluded_secrets[0].y);

        assert!(budget.reveal_at(-1000.0, -1000.0).is_empty());
        let found = budget.reveal_at(x + 5.0, y);
        assert!(!found.is_empty());
        assert!(found.iter().all(|s| s.is_revealed()));
        assert_eq!(budget.hidden_count(), hidden - found.len());
        assert!(budget.reveal_at(x + 5.0, y).is_empty());

        budget.reveal_all();
        assert_eq!(budget.hidden_count(), 0);
        assert_eq!(budget.revealed_count(), budget.occluded_secrets.len());
    }

    #[test]
    fn export_shape_uses_camel_case() {
        let budget = generate_mystery_budget(
            &Settings::default(),
            Biome::Ocean,
            Density::Sparse,
            Utc::now(),
            &mut SequenceRoll::constant(0.4),
        );
        let json = serde_json::to_value(&budget).unwrap();
        assert!(json["occludedSecrets"][0]["revealed"] == false);
        assert!(json["landmarks"][0].get("revealed").is_none());
        assert_eq!(json["density"], "sparse");
        assert_eq!(budget.mystery_quota(), budget.occluded_secrets.len() as f64 / 10.0);
    }
}

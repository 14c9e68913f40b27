//! Procedural materials and the vocabularies they are built from.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::LabError, settings::RepValues};

pub type MaterialId = u64;

/// Subfield scores for one field, keyed by subfield name.
pub type FieldStats = BTreeMap<String, u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Plant,
    Animal,
    Mineral,
    Crystal,
    Gas,
    Artifact,
    Microorganism,
    Compound,
}

impl MaterialType {
    pub const ALL: [MaterialType; 8] = [
        MaterialType::Plant,
        MaterialType::Animal,
        MaterialType::Mineral,
        MaterialType::Crystal,
        MaterialType::Gas,
        MaterialType::Artifact,
        MaterialType::Microorganism,
        MaterialType::Compound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MaterialType::Plant => "plant",
            MaterialType::Animal => "animal",
            MaterialType::Mineral => "mineral",
            MaterialType::Crystal => "crystal",
            MaterialType::Gas => "gas",
            MaterialType::Artifact => "artifact",
            MaterialType::Microorganism => "microorganism",
            MaterialType::Compound => "compound",
        }
    }

    /// Only living things can evolve.
    pub fn is_living(self) -> bool {
        matches!(
            self,
            MaterialType::Plant | MaterialType::Animal | MaterialType::Microorganism
        )
    }

    /// Fields that receive the heavier allocation weight for this type.
    pub fn primary_fields(self) -> &'static [&'static str] {
        match self {
            MaterialType::Plant => &["biology", "ecology", "chemistry"],
            MaterialType::Animal => &["biology", "ecology", "medicine"],
            MaterialType::Mineral => &["geology", "chemistry", "physics"],
            MaterialType::Crystal => &["physics", "engineering", "geology"],
            MaterialType::Gas => &["chemistry", "physics", "astronomy"],
            MaterialType::Artifact => &["engineering", "astronomy", "physics"],
            MaterialType::Microorganism => &["biology", "medicine", "chemistry"],
            MaterialType::Compound => &["chemistry", "medicine", "engineering"],
        }
    }

    pub fn name_suffixes(self) -> &'static [&'static str] {
        match self {
            MaterialType::Plant => &["flora", "moss", "fern", "bloom", "vine", "weed"],
            MaterialType::Animal => &[
                "beast",
                "creature",
                "fauna",
                "organism",
                "serpent",
                "leviathan",
            ],
            MaterialType::Mineral => &["ite", "ore", "stone", "deposit", "vein", "nodule"],
            MaterialType::Crystal => &["shard", "prism", "geode", "lattice", "matrix", "formation"],
            MaterialType::Gas => &["ogen", "on", "ane", "ene", "vapor", "mist"],
            MaterialType::Artifact => &[
                "relic",
                "artifact",
                "construct",
                "remnant",
                "monolith",
                "cache",
            ],
            MaterialType::Microorganism => &[
                "bacteria", "microbe", "spore", "colony", "culture", "strain",
            ],
            MaterialType::Compound => &[
                "compound", "mixture", "solution", "catalyst", "reagent", "polymer",
            ],
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaterialType {
    type Err = LabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        MaterialType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| LabError::InvalidArgument(format!("unknown material type '{value}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Biome {
    Volcanic,
    Arctic,
    Forest,
    Desert,
    Ocean,
    Cave,
    Asteroid,
    Space,
    Radioactive,
}

impl Biome {
    pub const ALL: [Biome; 9] = [
        Biome::Volcanic,
        Biome::Arctic,
        Biome::Forest,
        Biome::Desert,
        Biome::Ocean,
        Biome::Cave,
        Biome::Asteroid,
        Biome::Space,
        Biome::Radioactive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Biome::Volcanic => "volcanic",
            Biome::Arctic => "arctic",
            Biome::Forest => "forest",
            Biome::Desert => "desert",
            Biome::Ocean => "ocean",
            Biome::Cave => "cave",
            Biome::Asteroid => "asteroid",
            Biome::Space => "space",
            Biome::Radioactive => "radioactive",
        }
    }

    pub fn name_prefixes(self) -> &'static [&'static str] {
        match self {
            Biome::Volcanic => &["Pyro", "Magma", "Inferno", "Volcanic", "Lava", "Thermal"],
            Biome::Arctic => &["Cryo", "Frost", "Glacial", "Arctic", "Ice", "Frozen"],
            Biome::Forest => &["Bio", "Chloro", "Sylvan", "Flora", "Verdant", "Arboreal"],
            Biome::Desert => &["Arid", "Dune", "Solar", "Desert", "Silic", "Xeric"],
            Biome::Ocean => &["Aqua", "Hydro", "Marine", "Oceanic", "Tidal", "Pelagic"],
            Biome::Cave => &["Umbra", "Shadow", "Cavern", "Subterran", "Depth", "Spelean"],
            Biome::Asteroid => &["Astro", "Cosmo", "Stellar", "Meteor", "Orbital", "Lithic"],
            Biome::Space => &["Void", "Nebula", "Cosmic", "Astral", "Quantum", "Ethereal"],
            Biome::Radioactive => &["Radio", "Quantum", "Atomic", "Isotopic", "Nuclear", "Plutonic"],
        }
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Biome {
    type Err = LabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        Biome::ALL
            .into_iter()
            .find(|biome| biome.as_str() == value)
            .ok_or_else(|| LabError::InvalidArgument(format!("unknown biome '{value}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub const ALL: [Rarity; 5] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::Epic,
        Rarity::Legendary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Epic => "epic",
            Rarity::Legendary => "legendary",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rarity {
    type Err = LabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        Rarity::ALL
            .into_iter()
            .find(|rarity| rarity.as_str() == value)
            .ok_or_else(|| LabError::InvalidArgument(format!("unknown rarity '{value}'")))
    }
}

/// Either roll the rarity from the drop table or force one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RarityOverride {
    #[default]
    Random,
    Fixed(Rarity),
}

impl FromStr for RarityOverride {
    type Err = LabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().eq_ignore_ascii_case("random") {
            Ok(RarityOverride::Random)
        } else {
            value.parse().map(RarityOverride::Fixed)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    pub field: String,
    pub subfield: String,
    pub boost: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MaterialType,
    pub biome: Biome,
    pub rarity: Rarity,
    stats: BTreeMap<String, FieldStats>,
    field_totals: BTreeMap<String, u32>,
    rep_value: u32,
    pub discovered: DateTime<Utc>,
    pub evolved: bool,
    pub mutations: Vec<Mutation>,
}

impl Material {
    /// Builds a material and derives its field totals and REP value.
    /// Subfield values above 100 are clamped.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MaterialId,
        name: impl Into<String>,
        kind: MaterialType,
        biome: Biome,
        rarity: Rarity,
        stats: BTreeMap<String, FieldStats>,
        rep_values: &RepValues,
        discovered: DateTime<Utc>,
    ) -> Self {
        let mut material = Self {
            id,
            name: name.into(),
            kind,
            biome,
            rarity,
            stats,
            field_totals: BTreeMap::new(),
            rep_value: 0,
            discovered,
            evolved: false,
            mutations: Vec::new(),
        };
        for subfields in material.stats.values_mut() {
            for value in subfields.values_mut() {
                *value = (*value).min(100);
            }
        }
        material.recompute(rep_values);
        material
    }

    pub fn stats(&self) -> &BTreeMap<String, FieldStats> {
        &self.stats
    }

    pub fn stat(&self, field: &str, subfield: &str) -> Option<u32> {
        self.stats.get(field).and_then(|s| s.get(subfield)).copied()
    }

    pub fn field_totals(&self) -> &BTreeMap<String, u32> {
        &self.field_totals
    }

    pub fn field_total(&self, field: &str) -> u32 {
        self.field_totals.get(field).copied().unwrap_or(0)
    }

    pub fn total_stats(&self) -> u32 {
        self.field_totals.values().sum()
    }

    pub fn rep_value(&self) -> u32 {
        self.rep_value
    }

    /// Adds `boost` to one subfield, capped at 100, then recomputes every
    /// derived value. Returns the new subfield value.
    pub(crate) fn boost_stat(
        &mut self,
        field: &str,
        subfield: &str,
        boost: u32,
        rep_values: &RepValues,
    ) -> u32 {
        let slot = self
            .stats
            .entry(field.to_string())
            .or_default()
            .entry(subfield.to_string())
            .or_insert(0);
        *slot = slot.saturating_add(boost).min(100);
        let updated = *slot;
        self.recompute(rep_values);
        updated
    }

    fn recompute(&mut self, rep_values: &RepValues) {
        self.field_totals = self
            .stats
            .iter()
            .map(|(field, subfields)| (field.clone(), subfields.values().sum()))
            .collect();
        self.rep_value = rep_value(rep_values.for_material(self.rarity), self.total_stats());
    }
}

/// `floor(base * (1 + total / 1000))`, in integer arithmetic.
pub fn rep_value(base: u32, total_stats: u32) -> u32 {
    let scaled = u64::from(base) * (1000 + u64::from(total_stats)) / 1000;
    u32::try_from(scaled).unwrap_or(u32::MAX)
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(entries: &[(&str, &[(&str, u32)])]) -> BTreeMap<String, FieldStats> {
        entries
            .iter()
            .map(|(field, subs)| {
                (
                    field.to_string(),
                    subs.iter().map(|(s, v)| (s.to_string(), *v)).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn parses_known_names_and_rejects_unknown() {
        assert_eq!("Plant".parse::<MaterialType>().unwrap(), MaterialType::Plant);
        assert_eq!(" ocean ".parse::<Biome>().unwrap(), Biome::Ocean);
        assert!(matches!(
            "lava-lamp".parse::<MaterialType>(),
            Err(LabError::InvalidArgument(_))
        ));
        assert!(matches!("moon".parse::<Biome>(), Err(LabError::InvalidArgument(_))));
        assert_eq!("random".parse::<RarityOverride>().unwrap(), RarityOverride::Random);
        assert_eq!(
            "epic".parse::<RarityOverride>().unwrap(),
            RarityOverride::Fixed(Rarity::Epic)
        );
    }

    #[test]
    fn totals_and_rep_are_derived() {
        let material = Material::new(
            1,
            "VoidShard",
            MaterialType::Crystal,
            Biome::Space,
            Rarity::Rare,
            stats(&[("physics", &[("Optics", 50), ("Thermodynamics", 150)])]),
            &RepValues::default(),
            Utc::now(),
        );
        assert_eq!(material.stat("physics", "Thermodynamics"), Some(100));
        assert_eq!(material.field_total("physics"), 150);
        // 100 * (1 + 150/1000)
        assert_eq!(material.rep_value(), 115);
    }

    #[test]
    fn rep_value_floors_exact_products() {
        assert_eq!(rep_value(100, 150), 115);
        assert_eq!(rep_value(150, 70), 160);
        assert_eq!(rep_value(50, 290), 64);
        assert_eq!(rep_value(250, 1000), 500);
        assert_eq!(rep_value(20, 0), 20);
    }

    #[test]
    fn capitalize_handles_empty_and_ascii() {
        assert_eq!(capitalize("moss"), "Moss");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn serializes_with_type_key() {
        let material = Material::new(
            7,
            "BioMoss",
            MaterialType::Plant,
            Biome::Forest,
            Rarity::Common,
            BTreeMap::new(),
            &RepValues::default(),
            Utc::now(),
        );
        let json = serde_json::to_value(&material).unwrap();
        assert_eq!(json["type"], "plant");
        assert_eq!(json["repValue"], 20);
        assert!(json.get("fieldTotals").is_some());
    }
}

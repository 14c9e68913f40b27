use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    catalog::Catalog,
    material::{capitalize, Biome, FieldStats, Material, MaterialId, MaterialType, Rarity, RarityOverride},
    rng::Roll,
    settings::{DropRates, Settings},
};

const PRIMARY_WEIGHT: f64 = 1.5;
const SECONDARY_WEIGHT: f64 = 0.5;
const SUBFIELD_CAP: u32 = 100;

/// Hands out sequential material ids and builds materials from the catalog.
#[derive(Debug, Clone)]
pub struct MaterialGenerator {
    next_id: MaterialId,
}

impl MaterialGenerator {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn starting_at(next_id: MaterialId) -> Self {
        Self { next_id }
    }

    pub fn next_id(&self) -> MaterialId {
        self.next_id
    }

    fn allocate(&mut self) -> MaterialId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Draw order: name prefix, name suffix, rarity (only when not fixed),
    /// one draw per field except the last, three draws per field.
    #[allow(clippy::too_many_arguments)]
    pub fn generate<R: Roll>(
        &mut self,
        catalog: &Catalog,
        settings: &Settings,
        kind: MaterialType,
        biome: Biome,
        rarity: RarityOverride,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Material {
        let name = generate_name(kind, biome, rng);
        let rarity = match rarity {
            RarityOverride::Fixed(rarity) => rarity,
            RarityOverride::Random => roll_rarity(&settings.drop_rates, rng),
        };
        let pool = settings.stat_pools.get(rarity);
        let stats = distribute_stats(catalog, kind, pool, rng);
        let id = self.allocate();
        let material = Material::new(
            id,
            name,
            kind,
            biome,
            rarity,
            stats,
            &settings.rep_values,
            now,
        );
        debug!(
            id,
            name = %material.name,
            rarity = %material.rarity,
            rep = material.rep_value(),
            "material generated"
        );
        material
    }

    /// `count` materials of uniformly random type and biome with rolled
    /// rarity.
    pub fn generate_batch<R: Roll>(
        &mut self,
        catalog: &Catalog,
        settings: &Settings,
        count: usize,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Vec<Material> {
        (0..count)
            .map(|_| {
                let kind = MaterialType::ALL[rng.roll_index(MaterialType::ALL.len())];
                let biome = Biome::ALL[rng.roll_index(Biome::ALL.len())];
                self.generate(
                    catalog,
                    settings,
                    kind,
                    biome,
                    RarityOverride::Random,
                    now,
                    rng,
                )
            })
            .collect()
    }
}

impl Default for MaterialGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn generate_name<R: Roll>(kind: MaterialType, biome: Biome, rng: &mut R) -> String {
    let prefix = rng.pick(biome.name_prefixes()).copied().unwrap_or_default();
    let suffix = rng.pick(kind.name_suffixes()).copied().unwrap_or_default();
    format!("{prefix}{}", capitalize(suffix))
}

pub fn roll_rarity<R: Roll>(rates: &DropRates, rng: &mut R) -> Rarity {
    rates.rarity_for(rng.roll() * 100.0)
}

/// Splits `pool` across the catalog fields, then each field's share across
/// its four subfields. The last field takes whatever the others left and
/// the last subfield takes its field's remainder, capped at 100.
pub fn distribute_stats<R: Roll>(
    catalog: &Catalog,
    kind: MaterialType,
    pool: u32,
    rng: &mut R,
) -> BTreeMap<String, FieldStats> {
    let primaries = kind.primary_fields();
    let fields = catalog.fields();

    let mut remaining = pool;
    let mut shares = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        if index + 1 == fields.len() {
            shares.push(remaining);
            break;
        }
        let weight = if primaries.contains(&field.id.as_str()) {
            PRIMARY_WEIGHT
        } else {
            SECONDARY_WEIGHT
        };
        let allocation = ((rng.roll() * 80.0 + 20.0) * weight).floor() as u32;
        let share = allocation.min(remaining);
        remaining -= share;
        shares.push(share);
    }

    fields
        .iter()
        .zip(shares)
        .map(|(field, share)| {
            let mut field_pool = share;
            let mut subfields = FieldStats::new();
            for (index, subfield) in field.subfields.iter().enumerate() {
                let value = if index + 1 == field.subfields.len() {
                    field_pool.min(SUBFIELD_CAP)
                } else {
                    let value = (rng.roll() * field_pool.min(SUBFIELD_CAP) as f64).floor() as u32;
                    field_pool -= value;
                    value
                };
                subfields.insert(subfield.clone(), value);
            }
            (field.id.clone(), subfields)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{catalog::ScientificField, rng::SequenceRoll};

    fn two_field_catalog() -> Catalog {
        Catalog::new(
            vec![
                ScientificField::new("biology", "Biology", "#0f0", ["a", "b", "c", "d"]),
                ScientificField::new("geology", "Geology", "#888", ["e", "f", "g", "h"]),
            ],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn name_joins_prefix_and_capitalised_suffix() {
        let mut rng = SequenceRoll::new(vec![0.0, 0.0]);
        assert_eq!(generate_name(MaterialType::Plant, Biome::Volcanic, &mut rng), "PyroFlora");
    }

    #[test]
    fn primary_field_gets_heavier_weight() {
        // biology: floor((0.5*80+20)*1.5) = 90, geology takes the rest
        let mut rng = SequenceRoll::new(vec![0.5, 0.0]);
        let stats = distribute_stats(&two_field_catalog(), MaterialType::Plant, 300, &mut rng);
        let biology: u32 = stats["biology"].values().sum();
        let geology: u32 = stats["geology"].values().sum();
        assert_eq!(biology, 90);
        assert_eq!(stats["biology"]["b"], 45);
        // geology share is 210: 50 + 0 + 50, last subfield capped at 100
        assert_eq!(stats["geology"]["h"], 100);
        assert_eq!(geology, 200);
    }

    #[test]
    fn secondary_field_allocation_is_capped_by_pool() {
        // mineral has no primary biology: floor((0.999..*80+20)*0.5) = 49
        let mut rng = SequenceRoll::constant(0.999_999);
        let stats = distribute_stats(&two_field_catalog(), MaterialType::Mineral, 30, &mut rng);
        let biology: u32 = stats["biology"].values().sum();
        let geology: u32 = stats["geology"].values().sum();
        assert_eq!(biology, 30);
        assert_eq!(geology, 0);
    }

    #[test]
    fn fixed_rarity_skips_the_rarity_draw() {
        let catalog = two_field_catalog();
        let settings = Settings::default();
        let mut generator = MaterialGenerator::new();
        let mut rng = SequenceRoll::constant(0.0);
        let material = generator.generate(
            &catalog,
            &settings,
            MaterialType::Gas,
            Biome::Ocean,
            RarityOverride::Fixed(Rarity::Legendary),
            Utc::now(),
            &mut rng,
        );
        assert_eq!(material.rarity, Rarity::Legendary);
        // prefix, suffix, one field draw, three subfield draws for each field
        assert_eq!(rng.draws(), 2 + 1 + 3 * 2);
        assert_eq!(material.id, 1);
        assert_eq!(generator.next_id(), 2);
    }

    #[test]
    fn rarity_roll_scales_to_percent() {
        let rates = DropRates::default();
        assert_eq!(roll_rarity(&rates, &mut SequenceRoll::constant(0.5)), Rarity::Common);
        assert_eq!(roll_rarity(&rates, &mut SequenceRoll::constant(0.9)), Rarity::Rare);
        assert_eq!(roll_rarity(&rates, &mut SequenceRoll::constant(0.99)), Rarity::Legendary);
    }

    #[test]
    fn batch_allocates_distinct_ids() {
        let catalog = Catalog::builtin().unwrap();
        let mut generator = MaterialGenerator::starting_at(40);
        let mut rng = SequenceRoll::new(vec![0.3, 0.7, 0.1, 0.95, 0.42]);
        let batch = generator.generate_batch(&catalog, &Settings::default(), 10, Utc::now(), &mut rng);
        let ids: Vec<MaterialId> = batch.iter().map(|m| m.id).collect();
        assert_eq!(ids, (40..50).collect::<Vec<_>>());
    }
}

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use exploration_lab::{
    evolution::evolve,
    generator::MaterialGenerator,
    material::rep_value,
    Biome, Catalog, LabError, Material, MaterialType, RarityOverride, Settings,
};

fn assert_totals_consistent(material: &Material) {
    for (field, subfields) in material.stats() {
        let sum: u32 = subfields.values().sum();
        assert_eq!(material.field_total(field), sum, "{} {field}", material.name);
        assert!(sum <= 400);
        assert!(subfields.values().all(|value| *value <= 100));
    }
}

#[test]
fn seeded_sweep_keeps_totals_and_bounds() {
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    for seed in 0..16 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut generator = MaterialGenerator::new();
        for kind in MaterialType::ALL {
            for biome in Biome::ALL {
                let material = generator.generate(
                    &catalog,
                    &settings,
                    kind,
                    biome,
                    RarityOverride::Random,
                    Utc::now(),
                    &mut rng,
                );
                assert_totals_consistent(&material);
                assert!(material.total_stats() <= settings.stat_pools.get(material.rarity));
                assert_eq!(material.stats().len(), catalog.fields().len());
                assert_eq!(
                    material.rep_value(),
                    rep_value(
                        settings.rep_values.for_material(material.rarity),
                        material.total_stats()
                    )
                );
            }
        }
        assert_eq!(generator.next_id(), 1 + (MaterialType::ALL.len() * Biome::ALL.len()) as u64);
    }
}

#[test]
fn evolution_keeps_totals_consistent() {
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut generator = MaterialGenerator::new();
    for kind in [MaterialType::Plant, MaterialType::Animal, MaterialType::Microorganism] {
        let mut material = generator.generate(
            &catalog,
            &settings,
            kind,
            Biome::Forest,
            RarityOverride::Random,
            Utc::now(),
            &mut rng,
        );
        for round in 1..=12 {
            let before = material.rep_value();
            let mutation = evolve(&mut material, &catalog, &settings, Utc::now(), &mut rng).unwrap();
            assert!((10..25).contains(&mutation.boost));
            assert_eq!(material.mutations.len(), round);
            assert!(material.evolved);
            assert!(material.rep_value() >= before);
            assert_totals_consistent(&material);
        }
    }
}

#[test]
fn mineral_cannot_evolve() {
    let catalog = Catalog::builtin().unwrap();
    let settings = Settings::default();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut material = MaterialGenerator::new().generate(
        &catalog,
        &settings,
        MaterialType::Mineral,
        Biome::Cave,
        RarityOverride::Random,
        Utc::now(),
        &mut rng,
    );
    let snapshot = material.clone();
    let result = evolve(&mut material, &catalog, &settings, Utc::now(), &mut rng);
    assert!(matches!(result, Err(LabError::UnsupportedOperation(_))));
    assert_eq!(material, snapshot);
}

#[test]
fn rep_value_is_monotone_in_total_stats() {
    for base in [20, 50, 100, 150, 250] {
        let mut previous = 0;
        for total in 0..=3200 {
            let value = rep_value(base, total);
            assert!(value >= previous);
            previous = value;
        }
        assert_eq!(rep_value(base, 0), base);
    }
}

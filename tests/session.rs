use chrono::{Duration, TimeZone, Utc};

use exploration_lab::{
    export::ExportWriter,
    reward::RewardRarity,
    systems::{Density, LoopPhase, VerbKind},
    Biome, Catalog, Lab, LabError, MaterialType, Rarity, RarityOverride, Settings,
};

fn lab(seed: u64) -> Lab {
    Lab::with_seed(Catalog::builtin().unwrap(), Settings::default(), seed)
}

#[test]
fn same_seed_replays_the_same_session() {
    let mut first = lab(99);
    let mut second = lab(99);
    first.generate_batch(5);
    second.generate_batch(5);
    let names = |lab: &Lab| -> Vec<String> {
        lab.inventory().iter().map(|m| m.name.clone()).collect()
    };
    assert_eq!(names(&first), names(&second));
    assert_eq!(
        first.generate_reward(RewardRarity::Rare, 2).kind,
        second.generate_reward(RewardRarity::Rare, 2).kind
    );
}

#[test]
fn generated_material_becomes_the_selection() {
    let mut lab = lab(5);
    assert!(matches!(lab.analyze_selected(), Err(LabError::NoSelection)));
    assert!(matches!(lab.evolve_selected(), Err(LabError::NoSelection)));

    let id = lab
        .generate_material(
            MaterialType::Crystal,
            Biome::Arctic,
            RarityOverride::Fixed(Rarity::Legendary),
        )
        .id;
    let analysis = lab.analyze_selected().unwrap();
    assert_eq!(analysis.material_id, id);
    assert!(analysis.first_discoverer_bonus);
    assert!(analysis.strongest_fields.len() <= 5);
}

#[test]
fn evolving_a_mineral_changes_nothing() {
    let mut lab = lab(8);
    lab.generate_material(MaterialType::Mineral, Biome::Cave, RarityOverride::Random);
    let before = lab.inventory().materials().to_vec();
    assert!(matches!(
        lab.evolve_selected(),
        Err(LabError::UnsupportedOperation(_))
    ));
    assert_eq!(lab.inventory().materials(), before.as_slice());
}

#[test]
fn single_mutation_mode_blocks_a_second_evolution() {
    let mut lab = lab(13);
    lab.apply_setting("mutation.allowMultiple", "false").unwrap();
    lab.generate_material(MaterialType::Animal, Biome::Forest, RarityOverride::Random);
    lab.evolve_selected().unwrap();
    let evolved = lab.inventory().selected().unwrap().clone();
    assert!(lab.evolve_selected().is_err());
    assert_eq!(lab.inventory().selected().unwrap(), &evolved);
}

#[test]
fn selecting_an_unknown_id_keeps_the_selection() {
    let mut lab = lab(2);
    lab.generate_batch(3);
    assert!(matches!(lab.select(42), Err(LabError::UnknownMaterial(42))));
    assert_eq!(lab.inventory().selected_id(), None);
    assert_eq!(lab.select(2).unwrap().id, 2);
}

#[test]
fn reset_clears_inventory_and_rewards() {
    let mut lab = lab(4);
    lab.generate_batch(4);
    lab.generate_reward(RewardRarity::Common, 0);
    lab.reset();
    assert!(lab.inventory().is_empty());
    assert!(lab.rewards().is_empty());
    assert_eq!(lab.research().material_count, 0);
}

#[test]
fn mystery_counts_follow_the_density_ranges() {
    let mut lab = lab(21);
    for density in [Density::Sparse, Density::Normal, Density::Dense] {
        let ranges = lab.settings().mystery_budget.for_density(density).clone();
        let budget = lab.generate_mystery_budget(Biome::Desert, density);
        let within = |count: usize, [min, max]: [u32; 2]| (min as usize..=max as usize).contains(&count);
        assert!(within(budget.landmarks.len(), ranges.landmarks));
        assert!(within(budget.micro_points.len(), ranges.micro_points));
        assert!(within(budget.occluded_secrets.len(), ranges.secrets));
        assert_eq!(budget.hidden_count(), budget.occluded_secrets.len());
        budget.reveal_all();
        assert_eq!(budget.hidden_count(), 0);
    }
}

#[test]
fn completed_loop_feeds_the_metrics_export() {
    let dir = tempfile::tempdir().unwrap();
    let mut lab = lab(17);
    let mut at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let mut report = None;
    for phase in LoopPhase::ALL {
        lab.start_loop_phase(phase, at).unwrap();
        at += Duration::seconds(75);
        report = lab.complete_loop_phase(at).unwrap();
    }
    let report = report.unwrap();
    assert_eq!(report.total_seconds, 375);
    assert!(report.optimal);
    assert_eq!(lab.metrics().loop_time, 375);
    assert_eq!(lab.loop_timer().current_phase(), LoopPhase::Detect);

    lab.record_souvenir();
    lab.generate_reward(RewardRarity::Unique, 0);
    let writer = ExportWriter::new(dir.path().join("exports")).unwrap();
    let path = writer.write_metrics(&lab.metrics_export(at)).unwrap();
    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(document["metrics"]["souvenirs"], 1);
    assert_eq!(document["metrics"]["loopTime"], 375);
    assert_eq!(document["rewards"][0]["rarity"], "unique");
    assert!(document["ecology"].is_object());

    lab.reset_metrics();
    assert_eq!(lab.metrics().souvenirs, 0);
    assert!(lab.rewards().is_empty());
}

#[test]
fn ecology_recovers_after_heavy_harvesting() {
    let mut lab = lab(1);
    for _ in 0..7 {
        lab.harvest();
    }
    let stressed = lab.ecology().world_health;
    assert_eq!(stressed, 100.0 - 7.0 * 3.0);
    lab.advance_day();
    assert!(lab.ecology().world_health > stressed);
    assert_eq!(lab.ecology().harvest_count, 6);
    lab.reset_ecology();
    assert_eq!(lab.ecology().world_health, 100.0);
}

#[test]
fn recorded_metrics_reach_the_report() {
    let mut lab = lab(23);
    let report = lab.metrics_report();
    assert_eq!(report.predictive_rate, None);
    assert!(!report.curiosity_met);

    let mut curiosity = 0.0;
    for _ in 0..40 {
        let next = lab.record_curiosity();
        assert!(next >= curiosity && next <= 100.0);
        curiosity = next;
    }
    let hits = (0..20).filter(|_| lab.record_prediction()).count();
    lab.record_souvenir();
    lab.record_souvenir();

    let report = lab.metrics_report();
    assert_eq!(report.curiosity, curiosity);
    assert_eq!(report.souvenirs, 2);
    assert_eq!(lab.metrics().predictions.total, 20);
    assert_eq!(lab.metrics().predictions.correct as usize, hits);
    assert_eq!(report.predictive_rate, Some(hits as f64 * 100.0 / 20.0));
    assert_eq!(lab.metrics().history.len(), 40 + 20 + 2);
}

#[test]
fn every_verb_plays_to_an_outcome() {
    let mut lab = lab(31);
    for kind in VerbKind::ALL {
        let outcome = lab.play_verb(kind, None).unwrap();
        assert_eq!(outcome.verb, kind);
        assert!(!outcome.discovery.is_empty());
    }
    let shadow = lab.play_verb(VerbKind::Shadow, None).unwrap();
    assert_eq!(shadow.discovery, "Migratory Luminite");
    assert!((30..70).contains(&shadow.rep_gain));
}

#[test]
fn wrong_decode_answer_is_rejected() {
    let mut lab = lab(31);
    assert!(matches!(
        lab.play_verb(VerbKind::Decode, Some("not a glyph")),
        Err(LabError::InvalidArgument(_))
    ));
    assert!(lab.play_verb(VerbKind::Decode, None).is_ok());
}

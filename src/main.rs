use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use exploration_lab::{
    export::ExportWriter,
    inventory::InventoryFilter,
    reward::RewardRarity,
    rng::RngManager,
    settings::SETTINGS_FILE,
    systems::{Density, VerbKind},
    Biome, Catalog, CatalogLoader, Lab, MaterialType, RarityOverride, Settings, SettingsStore,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Exploration lab material and discovery toolkit")]
struct Cli {
    /// Catalog JSON file (uses the built-in catalog when omitted)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Settings file to load and persist
    #[arg(long, global = true, default_value = SETTINGS_FILE)]
    settings: PathBuf,

    /// Seed for every random stream (entropy when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate one material
    Generate {
        #[arg(long = "type")]
        kind: MaterialType,
        #[arg(long)]
        biome: Biome,
        #[arg(long, default_value = "random")]
        rarity: RarityOverride,
        /// Evolve the new material this many times
        #[arg(long, default_value_t = 0)]
        evolve: u32,
        /// Print the material analysis alongside the material
        #[arg(long)]
        analyze: bool,
    },
    /// Generate random materials and optionally report research progress
    Batch {
        #[arg(long, default_value_t = 10)]
        count: usize,
        #[arg(long)]
        research: bool,
        /// all, rare, or a material type
        #[arg(long, default_value = "all")]
        filter: InventoryFilter,
    },
    /// Generate a discovery reward
    Reward {
        #[arg(long)]
        rarity: RewardRarity,
        /// Times this discovery was already made
        #[arg(long, default_value_t = 0)]
        count: u32,
    },
    /// Run the ecology simulator
    Ecology {
        #[arg(long, default_value_t = 0)]
        hours: u32,
        #[arg(long, default_value_t = 0)]
        harvests: u32,
    },
    /// Generate a mystery budget map
    Mystery {
        #[arg(long)]
        biome: Biome,
        #[arg(long, default_value = "normal")]
        density: Density,
        #[arg(long)]
        reveal: bool,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Play one round of an exploration verb
    Verb {
        #[arg(long)]
        kind: VerbKind,
        /// Answer for the decode verb
        #[arg(long)]
        answer: Option<String>,
    },
    /// Record play-test metrics and print the dashboard report
    Metrics {
        #[arg(long, default_value_t = 0)]
        curiosity: u32,
        #[arg(long, default_value_t = 0)]
        predictions: u32,
        #[arg(long, default_value_t = 0)]
        souvenirs: u32,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Inspect or change the persisted settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    Set { key: String, value: String },
    Reset,
    Import { file: PathBuf },
    Export { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = SettingsStore::new(&cli.settings);
    match cli.command {
        Command::Settings { action } => run_settings(&store, action),
        command => {
            let catalog = match &cli.data {
                Some(path) => CatalogLoader::new(".").load(path)?,
                None => Catalog::builtin().context("Failed to parse built-in catalog")?,
            };
            let rng = match cli.seed {
                Some(seed) => RngManager::new(seed),
                None => RngManager::from_entropy(),
            };
            run_lab(Lab::new(catalog, store.load_or_default(), rng), command)
        }
    }
}

fn run_lab(mut lab: Lab, command: Command) -> Result<()> {
    match command {
        Command::Generate {
            kind,
            biome,
            rarity,
            evolve,
            analyze,
        } => {
            lab.generate_material(kind, biome, rarity);
            for _ in 0..evolve {
                lab.evolve_selected()?;
            }
            let material = lab.inventory().selected()?;
            if analyze {
                print_json(&json!({
                    "material": material,
                    "analysis": lab.analyze_selected()?,
                }))?;
            } else {
                print_json(material)?;
            }
        }
        Command::Batch {
            count,
            research,
            filter,
        } => {
            lab.generate_batch(count);
            if research {
                print_json(&lab.research())?;
            } else {
                print_json(&lab.inventory().filtered(filter).collect::<Vec<_>>())?;
            }
        }
        Command::Reward { rarity, count } => {
            print_json(lab.generate_reward(rarity, count))?;
        }
        Command::Ecology { hours, harvests } => {
            for _ in 0..harvests {
                lab.harvest();
            }
            for _ in 0..hours {
                lab.advance_hour();
            }
            let ecology = lab.ecology();
            let settings = &lab.settings().ecology;
            print_json(&json!({
                "state": ecology,
                "status": ecology.status(settings).message(),
                "faunaActivity": ecology.fauna_level(),
                "radiationActivity": ecology.radiation_level(),
                "recoveryHours": ecology.recovery_hours(settings),
                "log": ecology.log().collect::<Vec<_>>(),
            }))?;
        }
        Command::Mystery {
            biome,
            density,
            reveal,
            export,
        } => {
            let budget = lab.generate_mystery_budget(biome, density);
            if reveal {
                budget.reveal_all();
            }
            match export {
                Some(dir) => {
                    let path = ExportWriter::new(dir)?.write_mystery_budget(budget)?;
                    println!("{}", path.display());
                }
                None => print_json(&*budget)?,
            }
        }
        Command::Verb { kind, answer } => {
            print_json(&lab.play_verb(kind, answer.as_deref())?)?;
        }
        Command::Metrics {
            curiosity,
            predictions,
            souvenirs,
            export,
        } => {
            for _ in 0..curiosity {
                lab.record_curiosity();
            }
            for _ in 0..predictions {
                lab.record_prediction();
            }
            for _ in 0..souvenirs {
                lab.record_souvenir();
            }
            print_json(&lab.metrics_report())?;
            if let Some(dir) = export {
                let path = ExportWriter::new(dir)?.write_metrics(&lab.metrics_export(Utc::now()))?;
                println!("{}", path.display());
            }
        }
        // handled before the lab is built
        Command::Settings { .. } => {}
    }
    Ok(())
}

fn run_settings(store: &SettingsStore, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => print_json(&store.load_or_default()),
        SettingsAction::Set { key, value } => {
            let mut settings = store.load_or_default();
            settings.apply(&key, &value)?;
            store.save(&settings)?;
            let value = settings.get(&key)?;
            print_json(&json!({ "key": key, "value": value }))
        }
        SettingsAction::Reset => {
            store.save(&Settings::default())?;
            println!("settings reset to defaults at {}", store.path().display());
            Ok(())
        }
        SettingsAction::Import { file } => {
            let settings = SettingsStore::import(&file)?;
            store.save(&settings)?;
            println!("imported {} into {}", file.display(), store.path().display());
            Ok(())
        }
        SettingsAction::Export { file } => {
            SettingsStore::export(&store.load_or_default(), &file)?;
            println!("exported settings to {}", file.display());
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

pub mod catalog;
pub mod error;
pub mod evolution;
pub mod export;
pub mod generator;
pub mod inventory;
pub mod lab;
pub mod material;
pub mod research;
pub mod reward;
pub mod rng;
pub mod settings;
pub mod systems;

pub use catalog::{Catalog, CatalogLoader};
pub use error::{LabError, LabResult};
pub use lab::Lab;
pub use material::{Biome, Material, MaterialType, Rarity, RarityOverride};
pub use settings::{Settings, SettingsStore};

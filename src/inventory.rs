use std::{fmt, str::FromStr};

use crate::{
    error::LabError,
    material::{Material, MaterialId, MaterialType, Rarity},
};

/// View filters over the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InventoryFilter {
    #[default]
    All,
    Type(MaterialType),
    /// Rare, epic and legendary.
    Rare,
}

impl InventoryFilter {
    pub fn matches(self, material: &Material) -> bool {
        match self {
            InventoryFilter::All => true,
            InventoryFilter::Type(kind) => material.kind == kind,
            InventoryFilter::Rare => material.rarity >= Rarity::Rare,
        }
    }
}

impl fmt::Display for InventoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryFilter::All => f.write_str("all"),
            InventoryFilter::Type(kind) => write!(f, "{kind}"),
            InventoryFilter::Rare => f.write_str("rare"),
        }
    }
}

impl FromStr for InventoryFilter {
    type Err = LabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(InventoryFilter::All),
            "rare" => Ok(InventoryFilter::Rare),
            other => other.parse().map(InventoryFilter::Type),
        }
    }
}

/// Materials in discovery order plus the current selection. Materials are
/// never removed one at a time; `clear` is the only way out.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    materials: Vec<Material>,
    selected: Option<MaterialId>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, material: Material) {
        self.materials.push(material);
    }

    /// Stores a material and makes it the current selection.
    pub fn push_selected(&mut self, material: Material) -> &Material {
        self.selected = Some(material.id);
        self.materials.push(material);
        &self.materials[self.materials.len() - 1]
    }

    pub fn extend(&mut self, materials: impl IntoIterator<Item = Material>) {
        self.materials.extend(materials);
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn filtered(&self, filter: InventoryFilter) -> impl Iterator<Item = &Material> {
        self.materials.iter().filter(move |m| filter.matches(m))
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    pub fn select(&mut self, id: MaterialId) -> Result<&Material, LabError> {
        let material = self
            .materials
            .iter()
            .find(|m| m.id == id)
            .ok_or(LabError::UnknownMaterial(id))?;
        self.selected = Some(id);
        Ok(material)
    }

    pub fn selected_id(&self) -> Option<MaterialId> {
        self.selected
    }

    pub fn selected(&self) -> Result<&Material, LabError> {
        let id = self.selected.ok_or(LabError::NoSelection)?;
        self.get(id).ok_or(LabError::UnknownMaterial(id))
    }

    pub fn selected_mut(&mut self) -> Result<&mut Material, LabError> {
        let id = self.selected.ok_or(LabError::NoSelection)?;
        self.materials
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(LabError::UnknownMaterial(id))
    }

    pub fn total_rep(&self) -> u64 {
        self.materials.iter().map(|m| u64::from(m.rep_value())).sum()
    }

    pub fn clear(&mut self) {
        self.materials.clear();
        self.selected = None;
    }
}

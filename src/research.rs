//! Research evaluation over the inventory.
//!
//! Everything here is a pure function of the catalog and a slice of
//! materials, so results are recomputed on demand rather than cached.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    catalog::{Catalog, Technology},
    material::{Material, MaterialId, MaterialType, Rarity},
};

/// Summed field totals keyed by field id.
pub type AvailableStats = BTreeMap<String, u64>;

/// Sums every material's field totals. Every catalog field is present,
/// zero when nothing contributes to it.
pub fn available_stats(catalog: &Catalog, materials: &[Material]) -> AvailableStats {
    let mut totals: AvailableStats = catalog.field_ids().map(|id| (id.to_string(), 0)).collect();
    for material in materials {
        for (field, total) in material.field_totals() {
            *totals.entry(field.clone()).or_default() += u64::from(*total);
        }
    }
    totals
}

/// Highest value of a subfield name across every field of every material.
/// Subfields that share a name under different fields count as one.
pub fn highest_subfield_value(materials: &[Material], subfield: &str) -> u32 {
    materials
        .iter()
        .flat_map(|material| material.stats().values())
        .filter_map(|subfields| subfields.get(subfield).copied())
        .max()
        .unwrap_or(0)
}

pub fn is_unlocked(tech: &Technology, available: &AvailableStats, materials: &[Material]) -> bool {
    let fields_met = tech
        .requirements
        .iter()
        .all(|(field, required)| available.get(field).copied().unwrap_or(0) >= u64::from(*required));
    fields_met
        && tech
            .subfield_reqs
            .iter()
            .all(|(subfield, required)| highest_subfield_value(materials, subfield) >= *required)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedTech {
    pub branch: String,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchReport {
    pub material_count: usize,
    pub total_rep: u64,
    pub available: AvailableStats,
    pub unlocked: Vec<UnlockedTech>,
}

impl ResearchReport {
    pub fn unlocked_names(&self) -> Vec<&str> {
        self.unlocked.iter().map(|tech| tech.name.as_str()).collect()
    }
}

/// Evaluates every technology in catalog order against the materials.
pub fn calculate_research(catalog: &Catalog, materials: &[Material]) -> ResearchReport {
    let available = available_stats(catalog, materials);
    let unlocked = catalog
        .technologies()
        .filter(|(_, tech)| is_unlocked(tech, &available, materials))
        .map(|(branch, tech)| UnlockedTech {
            branch: branch.id.clone(),
            id: tech.id.clone(),
            name: tech.name.clone(),
        })
        .collect();
    ResearchReport {
        material_count: materials.len(),
        total_rep: materials.iter().map(|m| u64::from(m.rep_value())).sum(),
        available,
        unlocked,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubfieldScore {
    pub field: String,
    pub subfield: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialAnalysis {
    pub material_id: MaterialId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MaterialType,
    pub rarity: Rarity,
    pub strongest_fields: Vec<(String, u32)>,
    pub top_subfields: Vec<SubfieldScore>,
    /// Technologies whose field requirements this material meets alone.
    pub applicable: Vec<String>,
    pub rep_value: u32,
    pub first_discoverer_bonus: bool,
}

const TOP_N: usize = 5;

pub fn analyze(material: &Material, catalog: &Catalog) -> MaterialAnalysis {
    let mut strongest_fields: Vec<(String, u32)> = catalog
        .field_ids()
        .map(|id| (id.to_string(), material.field_total(id)))
        .collect();
    strongest_fields.sort_by(|a, b| b.1.cmp(&a.1));
    strongest_fields.truncate(TOP_N);

    let mut top_subfields: Vec<SubfieldScore> = catalog
        .fields()
        .iter()
        .flat_map(|field| {
            field.subfields.iter().filter_map(move |subfield| {
                material.stat(&field.id, subfield).map(|value| SubfieldScore {
                    field: field.id.clone(),
                    subfield: subfield.clone(),
                    value,
                })
            })
        })
        .collect();
    top_subfields.sort_by(|a, b| b.value.cmp(&a.value));
    top_subfields.truncate(TOP_N);

    let applicable = catalog
        .technologies()
        .filter(|(_, tech)| {
            tech.requirements
                .iter()
                .all(|(field, required)| material.field_total(field) >= *required)
        })
        .map(|(_, tech)| tech.name.clone())
        .collect();

    MaterialAnalysis {
        material_id: material.id,
        name: material.name.clone(),
        kind: material.kind,
        rarity: material.rarity,
        strongest_fields,
        top_subfields,
        applicable,
        rep_value: material.rep_value(),
        first_discoverer_bonus: material.rarity >= Rarity::Epic,
    }
}

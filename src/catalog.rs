//! Static scientific field and tech tree data.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};
use tracing::{info, warn};

use crate::{error::LabError, rng::Roll};

const BUILTIN_DATA: &str = include_str!("../data/data.json");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScientificField {
    pub id: String,
    pub name: String,
    pub color: String,
    pub subfields: [String; 4],
}

impl ScientificField {
    pub fn new(id: &str, name: &str, color: &str, subfields: [&str; 4]) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            color: color.to_string(),
            subfields: subfields.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Technology {
    pub id: String,
    pub name: String,
    pub requirements: BTreeMap<String, u32>,
    pub subfield_reqs: BTreeMap<String, u32>,
}

impl Technology {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            requirements: BTreeMap::new(),
            subfield_reqs: BTreeMap::new(),
        }
    }

    pub fn require(mut self, field: &str, amount: u32) -> Self {
        self.requirements.insert(field.to_string(), amount);
        self
    }

    pub fn require_subfield(mut self, subfield: &str, amount: u32) -> Self {
        self.subfield_reqs.insert(subfield.to_string(), amount);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechBranch {
    pub id: String,
    pub name: String,
    pub techs: Vec<Technology>,
}

impl TechBranch {
    pub fn new(id: &str, name: &str, techs: Vec<Technology>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            techs,
        }
    }
}

/// Fields and branches in document order. The order of `fields` matters:
/// the stat distribution hands the leftover pool to the last field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    fields: Vec<ScientificField>,
    branches: Vec<TechBranch>,
}

impl Catalog {
    pub fn new(fields: Vec<ScientificField>, branches: Vec<TechBranch>) -> Result<Self, LabError> {
        if fields.is_empty() {
            return Err(LabError::Catalog(
                "catalog must define at least one scientific field".into(),
            ));
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.id.as_str()) {
                return Err(LabError::Catalog(format!(
                    "scientific field '{}' defined more than once",
                    field.id
                )));
            }
        }
        let catalog = Self { fields, branches };
        catalog.report_suspicious_entries();
        Ok(catalog)
    }

    pub fn from_json(text: &str) -> Result<Self, LabError> {
        let raw: RawCatalog =
            serde_json::from_str(text).map_err(|err| LabError::Catalog(err.to_string()))?;
        raw.into_catalog()
    }

    /// The default data set shipped with the crate.
    pub fn builtin() -> Result<Self, LabError> {
        Self::from_json(BUILTIN_DATA)
    }

    pub fn fields(&self) -> &[ScientificField] {
        &self.fields
    }

    pub fn field(&self, id: &str) -> Option<&ScientificField> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// Uniform choice over the fields in catalog order.
    pub fn pick_field<R: Roll>(&self, rng: &mut R) -> Option<&ScientificField> {
        rng.pick(&self.fields)
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.id.as_str())
    }

    pub fn branches(&self) -> &[TechBranch] {
        &self.branches
    }

    /// Every technology paired with the branch that holds it.
    pub fn technologies(&self) -> impl Iterator<Item = (&TechBranch, &Technology)> {
        self.branches
            .iter()
            .flat_map(|branch| branch.techs.iter().map(move |tech| (branch, tech)))
    }

    /// Subfield names that appear under more than one field. Research
    /// lookups by subfield name treat such entries as one pool.
    pub fn shared_subfields(&self) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for field in &self.fields {
            for subfield in &field.subfields {
                *counts.entry(subfield.as_str()).or_default() += 1;
            }
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn report_suspicious_entries(&self) {
        for name in self.shared_subfields() {
            warn!(subfield = %name, "subfield name shared by several fields; research treats it as one pool");
        }
        for (branch, tech) in self.technologies() {
            for field in tech.requirements.keys() {
                if self.field(field).is_none() {
                    warn!(branch = %branch.id, tech = %tech.id, field = %field, "technology requires an unknown field and can never unlock");
                }
            }
        }
    }
}

pub struct CatalogLoader {
    base_dir: PathBuf,
}

impl CatalogLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Catalog> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read data file {}", path.display()))?;
        let catalog = Catalog::from_json(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(
            path = %path.display(),
            fields = catalog.fields().len(),
            branches = catalog.branches().len(),
            "catalog loaded"
        );
        Ok(catalog)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalog {
    #[serde(deserialize_with = "ordered_entries")]
    scientific_fields: Vec<(String, RawField)>,
    #[serde(deserialize_with = "ordered_entries")]
    tech_tree: Vec<(String, RawBranch)>,
}

#[derive(Deserialize)]
struct RawField {
    name: String,
    #[serde(default)]
    color: String,
    subfields: [String; 4],
}

#[derive(Deserialize)]
struct RawBranch {
    name: String,
    #[serde(deserialize_with = "ordered_entries")]
    techs: Vec<(String, RawTechnology)>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTechnology {
    name: String,
    #[serde(default)]
    requirements: BTreeMap<String, u32>,
    #[serde(default)]
    subfield_reqs: Option<BTreeMap<String, u32>>,
}

impl RawCatalog {
    fn into_catalog(self) -> Result<Catalog, LabError> {
        let fields = self
            .scientific_fields
            .into_iter()
            .map(|(id, raw)| ScientificField {
                id,
                name: raw.name,
                color: raw.color,
                subfields: raw.subfields,
            })
            .collect();
        let branches = self
            .tech_tree
            .into_iter()
            .map(|(id, raw)| TechBranch {
                id,
                name: raw.name,
                techs: raw
                    .techs
                    .into_iter()
                    .map(|(id, tech)| Technology {
                        id,
                        name: tech.name,
                        requirements: tech.requirements,
                        subfield_reqs: tech.subfield_reqs.unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();
        Catalog::new(fields, branches)
    }
}

/// Reads a JSON object into `(key, value)` pairs without losing key order.
fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct OrderedVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object keyed by id")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries: Vec<(String, T)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, T>()? {
                if entries.iter().any(|(existing, _)| *existing == key) {
                    return Err(serde::de::Error::custom(format!("duplicate key '{key}'")));
                }
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(PhantomData))
}

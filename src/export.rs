//! Write-only JSON documents of the current lab state.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::{
    reward::Reward,
    systems::{EcologyState, LoopTimings, Metrics, MysteryBudget},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsExport<'a> {
    pub metrics: &'a Metrics,
    pub rewards: &'a [Reward],
    pub ecology: &'a EcologyState,
    pub loop_timers: &'a LoopTimings,
    pub timestamp: DateTime<Utc>,
}

pub struct ExportWriter {
    output_dir: PathBuf,
}

impl ExportWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create export directory {}", output_dir.display()))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn write<T: Serialize>(&self, file_name: &str, document: &T) -> Result<PathBuf> {
        let path = self.output_dir.join(file_name);
        let json = serde_json::to_string_pretty(document)
            .with_context(|| format!("Failed to serialize {file_name}"))?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "export written");
        Ok(path)
    }

    pub fn write_metrics(&self, export: &MetricsExport<'_>) -> Result<PathBuf> {
        let name = format!("exploration-metrics-{}.json", export.timestamp.timestamp_millis());
        self.write(&name, export)
    }

    pub fn write_mystery_budget(&self, budget: &MysteryBudget) -> Result<PathBuf> {
        let name = format!(
            "mystery-budget-{}-{}.json",
            budget.biome,
            budget.generated_at.timestamp_millis()
        );
        self.write(&name, budget)
    }
}

// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved per training run:
//   model_epoch_{e}.mpk  — weights after epoch e
//   latest_epoch.json    — number of the last saved epoch
//   train_config.json    — the run configuration
//
// Loading is by checkpoint NAME ("model_epoch_5", or the
// special name "latest" which follows latest_epoch.json), or by
// an explicit file path for feature extraction. A missing
// checkpoint file is a hard error up front, with a message
// saying which file was expected — much friendlier than letting
// the recorder fail mid-load.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::{Path, PathBuf}};

use anyhow::{ensure, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::RelationNetwork;

/// File suffix the CompactRecorder appends to checkpoint stems.
const RECORD_EXT: &str = "mpk";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager; the directory is created
    /// if it doesn't exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Save model weights for a given epoch and move the
    /// latest-epoch pointer.
    pub fn save_model<B: AutodiffBackend>(
        &self,
        model: &RelationNetwork<B>,
        epoch: usize,
    ) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| "Failed to write latest_epoch.json")?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load weights by checkpoint name within the managed
    /// directory. The name "latest" resolves through the
    /// latest-epoch pointer.
    pub fn load_named<B: Backend>(
        &self,
        model:  RelationNetwork<B>,
        name:   &str,
        device: &B::Device,
    ) -> Result<RelationNetwork<B>> {
        let name = if name == "latest" {
            format!("model_epoch_{}", self.latest_epoch()?)
        } else {
            name.to_string()
        };
        load_checkpoint(model, &self.dir.join(name), device)
    }

    /// Save the run configuration for traceability.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    /// Read latest_epoch.json and return the epoch number.
    fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let s = fs::read_to_string(&path)
            .with_context(|| "Cannot find 'latest_epoch.json'. Have you run 'train' first?")?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

/// Load weights from an explicit checkpoint path stem (without
/// the .mpk extension). Missing files fail up front with the
/// expected filename.
pub fn load_checkpoint<B: Backend>(
    model:  RelationNetwork<B>,
    stem:   &Path,
    device: &B::Device,
) -> Result<RelationNetwork<B>> {
    let file = stem.with_extension(RECORD_EXT);
    ensure!(
        file.exists(),
        "Checkpoint file not found: '{}'. Have you trained the model first?",
        file.display()
    );

    tracing::info!("Loading checkpoint '{}'", file.display());
    let record = CompactRecorder::new()
        .load(stem.to_path_buf(), device)
        .with_context(|| format!("Cannot load checkpoint '{}'", stem.display()))?;

    Ok(model.load_record(record))
}

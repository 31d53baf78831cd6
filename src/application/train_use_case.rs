// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load hyperparameters       (Layer 6 - infra)
//   Step 2: Build / load dictionaries  (Layer 6 - infra)
//   Step 3: Build train/val datasets   (Layer 4 - data)
//   Step 4: Save run config            (Layer 6 - infra)
//   Step 5: Run training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::data::dataset::{ClevrDataset, Split};
use crate::infra::{
    checkpoint::CheckpointManager,
    dictionary_store::DictionaryStore,
    hyperparams::load_hyperparams,
};
use crate::ml::trainer::run_training;

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Serialisable so the run can
// be reconstructed from the checkpoint directory later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub clevr_dir:      PathBuf,
    pub checkpoint_dir: PathBuf,
    pub config_path:    PathBuf,
    pub model_variant:  String,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub cpu:            bool,
    pub seed:           u64,
    pub log_interval:   usize,
    pub resume:         Option<String>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            clevr_dir:      PathBuf::from("."),
            checkpoint_dir: PathBuf::from("checkpoints"),
            config_path:    PathBuf::from("config.json"),
            model_variant:  "original".to_string(),
            batch_size:     64,
            epochs:         200,
            lr:             2.5e-4,
            cpu:            false,
            seed:           1,
            log_interval:   10,
            resume:         None,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Hyperparameters for the chosen model variant ──────────────
        let hyp = load_hyperparams(&cfg.config_path, &cfg.model_variant)?;

        // ── Step 2: Build / load dictionaries over the training split ─────────
        // Cached next to the question files so train and extract
        // runs always agree on the id assignment.
        let dictionaries = DictionaryStore::new(&cfg.clevr_dir).load_or_build()?;
        tracing::info!(
            "Dictionaries ready: {} question words, {} answers",
            dictionaries.questions.len(),
            dictionaries.answers.len(),
        );

        // ── Step 3: Datasets for both splits ──────────────────────────────────
        // Question JSON goes through its binary cache; images are
        // decoded lazily inside the dataloader workers.
        tracing::info!("Initialising CLEVR dataset from '{}'", cfg.clevr_dir.display());
        let train_dataset = ClevrDataset::for_split(&cfg.clevr_dir, Split::Train, &dictionaries)?;
        let val_dataset   = ClevrDataset::for_split(&cfg.clevr_dir, Split::Val, &dictionaries)?;

        // ── Step 4: Save run config for traceability ──────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;

        // ── Step 5: Run training loop (Layer 5) ───────────────────────────────
        tracing::info!("Training ({} epochs) is starting...", cfg.epochs);
        run_training(
            cfg,
            &hyp,
            dictionaries.questions.len(),
            dictionaries.answers.len(),
            train_dataset,
            val_dataset,
            ckpt_manager,
        )?;

        Ok(())
    }
}

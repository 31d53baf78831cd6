// ============================================================
// Layer 2 — ExtractUseCase
// ============================================================
// Orchestrates feature extraction from a trained checkpoint:
//
//   Step 1: Load hyperparameters       (Layer 6 - infra)
//   Step 2: Build / load dictionaries  (Layer 6 - infra)
//   Step 3: Rebuild model + weights    (Layer 5/6)
//   Step 4: Val-image dataset          (Layer 4 - data)
//   Step 5: Run extraction loop        (Layer 5 - ml)
//
// The model is rebuilt on the plain (non-autodiff) backend —
// extraction never needs gradients.

use std::path::PathBuf;

use anyhow::{ensure, Result};

use crate::data::dataset::ClevrImageDataset;
use crate::infra::{
    checkpoint::load_checkpoint,
    dictionary_store::DictionaryStore,
    hyperparams::load_hyperparams,
};
use crate::ml::{
    extractor::run_extraction,
    model::{RelationNetConfig, RelationNetwork},
    trainer::select_device,
};

type ExtractBackend = burn::backend::Wgpu;

// ─── Extraction Configuration ────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Checkpoint path without the .mpk extension,
    /// e.g. checkpoints/model_epoch_20
    pub checkpoint:         PathBuf,
    pub clevr_dir:          PathBuf,
    pub config_path:        PathBuf,
    pub model_variant:      String,
    pub batch_size:         usize,
    pub cpu:                bool,
    /// Overrides the config file's question injection position
    pub question_injection: Option<usize>,
    /// g layer index to extract from; g_layers.len() means the
    /// input of f_fc1
    pub extraction_layer:   usize,
    pub features_dir:       PathBuf,
}

// ─── ExtractUseCase ───────────────────────────────────────────────────────────
pub struct ExtractUseCase {
    config: ExtractConfig,
}

impl ExtractUseCase {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: Hyperparameters, with optional CLI override ───────────────
        let mut hyp = load_hyperparams(&cfg.config_path, &cfg.model_variant)?;
        if let Some(position) = cfg.question_injection {
            hyp.question_injection_position = position;
            hyp.validate()?;
        }
        ensure!(
            cfg.extraction_layer <= hyp.g_layers.len(),
            "extraction layer {} out of range (valid: 0..={} where {} is f_fc1)",
            cfg.extraction_layer,
            hyp.g_layers.len(),
            hyp.g_layers.len(),
        );

        // ── Step 2: Dictionaries (only the sizes matter here) ─────────────────
        let dictionaries = DictionaryStore::new(&cfg.clevr_dir).load_or_build()?;

        // ── Step 3: Rebuild the model and load the checkpoint ─────────────────
        let device = select_device(cfg.cpu);
        let model_cfg = RelationNetConfig::new(
            dictionaries.questions.len(),
            dictionaries.answers.len(),
            hyp.wordemb_dim,
            hyp.lstm_hidden,
            hyp.g_layers.clone(),
            hyp.f_fc1,
            hyp.f_fc2,
            hyp.dropout,
            hyp.question_injection_position,
        );
        let model: RelationNetwork<ExtractBackend> = model_cfg.init(&device);
        let model = load_checkpoint(model, &cfg.checkpoint, &device)?;
        tracing::info!("Model loaded from checkpoint");

        // ── Step 4: Images-only dataset over the val split ────────────────────
        let dataset = ClevrImageDataset::new(&cfg.clevr_dir.join("images").join("val"))?;

        // ── Step 5: Run the extraction loop (Layer 5) ─────────────────────────
        run_extraction(cfg, &hyp, model, dataset, device)
    }
}

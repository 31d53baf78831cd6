// ============================================================
// Layer 6 — Model Hyperparameters
// ============================================================
// Architecture hyperparameters live in a JSON config file keyed
// by model variant, so a checkpoint can be rebuilt for
// extraction by naming the variant it was trained as:
//
//   {"hyperparams": {"original": {...}, "original-fp": {...}}}
//
// CLI flags can override the question injection position on top
// of the file's value.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};

/// Architecture hyperparameters for one model variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelHyperparams {
    /// Word embedding dimension for question tokens
    pub wordemb_dim: usize,

    /// LSTM hidden size — the question embedding width
    pub lstm_hidden: usize,

    /// Output sizes of the g layers, in order
    pub g_layers: Vec<usize>,

    /// Output sizes of the first two f layers
    pub f_fc1: usize,
    pub f_fc2: usize,

    /// Dropout probability before f_fc3
    pub dropout: f64,

    /// g layer index at which the question embedding is
    /// concatenated onto every object pair (0 = DeepMind's
    /// original placement)
    pub question_injection_position: usize,
}

impl ModelHyperparams {
    /// Injection must land on an existing g layer.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.g_layers.is_empty(), "g_layers must not be empty");
        ensure!(
            self.question_injection_position < self.g_layers.len(),
            "question_injection_position {} out of range (model has {} g layers)",
            self.question_injection_position,
            self.g_layers.len(),
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    hyperparams: HashMap<String, ModelHyperparams>,
}

/// Load the hyperparameters for `variant` from `path`.
pub fn load_hyperparams(path: &Path, variant: &str) -> Result<ModelHyperparams> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Cannot read hyperparameter config '{}'", path.display()))?;
    let mut file: ConfigFile = serde_json::from_str(&raw)
        .with_context(|| format!("Malformed hyperparameter config '{}'", path.display()))?;

    let hyp = file
        .hyperparams
        .remove(variant)
        .ok_or_else(|| {
            anyhow!(
                "Model variant '{}' not found in '{}' (available: {})",
                variant,
                path.display(),
                file.hyperparams.keys().cloned().collect::<Vec<_>>().join(", "),
            )
        })?;
    hyp.validate()?;

    tracing::info!("Loaded hyperparameters for model variant '{}': {:?}", variant, hyp);
    Ok(hyp)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "hyperparams": {
            "original": {
                "wordemb_dim": 32,
                "lstm_hidden": 128,
                "g_layers": [256, 256, 256, 256],
                "f_fc1": 256,
                "f_fc2": 256,
                "dropout": 0.5,
                "question_injection_position": 0
            }
        }
    }"#;

    fn temp_config(name: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir()
            .join(format!("clevr_rn_hyp_{}_{}.json", name, std::process::id()));
        fs::write(&path, SAMPLE).unwrap();
        path
    }

    #[test]
    fn test_loads_named_variant() {
        let path = temp_config("load");
        let hyp = load_hyperparams(&path, "original").unwrap();
        assert_eq!(hyp.lstm_hidden, 128);
        assert_eq!(hyp.g_layers.len(), 4);
    }

    #[test]
    fn test_unknown_variant_is_an_error() {
        let path = temp_config("unknown");
        let err = load_hyperparams(&path, "does-not-exist").unwrap_err();
        assert!(err.to_string().contains("original"));
    }

    #[test]
    fn test_injection_out_of_range_rejected() {
        let hyp = ModelHyperparams {
            wordemb_dim: 32,
            lstm_hidden: 128,
            g_layers: vec![256, 256],
            f_fc1: 256,
            f_fc2: 256,
            dropout: 0.5,
            question_injection_position: 2,
        };
        assert!(hyp.validate().is_err());
    }
}

// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `extract`, and all
// their configurable flags. clap's derive macros generate the
// help text, error messages, and type conversions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::extract_use_case::ExtractConfig;
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the Relational Network on the CLEVR dataset
    Train(TrainArgs),

    /// Extract layer features from a trained checkpoint
    Extract(ExtractArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Base directory of the CLEVR dataset
    /// (expects questions/ and images/{train,val}/ inside)
    #[arg(long, default_value = ".")]
    pub clevr_dir: String,

    /// Directory for model checkpoints and the metrics CSV
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Hyperparameter configuration file
    #[arg(long, default_value = "config.json")]
    pub config: String,

    /// Model variant to look up in the configuration file
    #[arg(long, default_value = "original")]
    pub model: String,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 200)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 2.5e-4)]
    pub lr: f64,

    /// Run on the CPU fallback adapter instead of the GPU
    #[arg(long, default_value_t = false)]
    pub cpu: bool,

    /// Random seed for the backend and batch shuffling
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// How many batches to wait between training loss logs
    /// (minimum 1)
    #[arg(long, default_value_t = 10)]
    pub log_interval: usize,

    /// Resume from a stored checkpoint by name
    /// (e.g. "model_epoch_20", or "latest")
    #[arg(long)]
    pub resume: Option<String>,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 — the
/// application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            clevr_dir:      PathBuf::from(a.clevr_dir),
            checkpoint_dir: PathBuf::from(a.checkpoint_dir),
            config_path:    PathBuf::from(a.config),
            model_variant:  a.model,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            cpu:            a.cpu,
            seed:           a.seed,
            log_interval:   a.log_interval.max(1),
            resume:         a.resume,
        }
    }
}

/// All arguments for the `extract` command.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Checkpoint to extract from, without the .mpk extension
    /// (e.g. checkpoints/model_epoch_20)
    #[arg(long)]
    pub checkpoint: String,

    /// Base directory of the CLEVR dataset
    #[arg(long, default_value = ".")]
    pub clevr_dir: String,

    /// Hyperparameter configuration file
    #[arg(long, default_value = "config.json")]
    pub config: String,

    /// Model variant the checkpoint was trained as
    #[arg(long, default_value = "original")]
    pub model: String,

    /// Images per forward pass
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Run on the CPU fallback adapter instead of the GPU
    #[arg(long, default_value_t = false)]
    pub cpu: bool,

    /// Override the configuration file's question injection
    /// position (0 inserts at the first g layer)
    #[arg(long)]
    pub question_injection: Option<usize>,

    /// g layer whose input is extracted; one past the last
    /// g layer means the input of f_fc1
    #[arg(long, default_value_t = 2)]
    pub extraction_layer: usize,

    /// Directory for the feature dump files
    #[arg(long, default_value = "features")]
    pub features_dir: String,
}

impl From<ExtractArgs> for ExtractConfig {
    fn from(a: ExtractArgs) -> Self {
        ExtractConfig {
            checkpoint:         PathBuf::from(a.checkpoint),
            clevr_dir:          PathBuf::from(a.clevr_dir),
            config_path:        PathBuf::from(a.config),
            model_variant:      a.model,
            batch_size:         a.batch_size,
            cpu:                a.cpu,
            question_injection: a.question_injection,
            extraction_layer:   a.extraction_layer,
            features_dir:       PathBuf::from(a.features_dir),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn train_args(argv: &[&str]) -> TrainArgs {
        let mut full = vec!["clevr-rn", "train"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Train(args) => args,
            _ => panic!("expected the train subcommand"),
        }
    }

    #[test]
    fn test_zero_log_interval_clamped_to_one() {
        let cfg: TrainConfig = train_args(&["--log-interval", "0"]).into();
        assert_eq!(cfg.log_interval, 1);
    }

    #[test]
    fn test_log_interval_default_kept() {
        let cfg: TrainConfig = train_args(&[]).into();
        assert_eq!(cfg.log_interval, 10);
    }
}

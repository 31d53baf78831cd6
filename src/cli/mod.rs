// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — trains the Relational Network on CLEVR
//   2. `extract` — dumps intermediate features from a checkpoint
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ExtractArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "clevr-rn",
    version = "0.1.0",
    about = "Train a Relational Network on CLEVR, then extract layer features."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use
    /// case. The CLI layer only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => Self::run_train(args),
            Commands::Extract(args) => Self::run_extract(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on CLEVR data in: {}", args.clevr_dir);

        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training complete. Checkpoints saved.");
        Ok(())
    }

    fn run_extract(args: ExtractArgs) -> Result<()> {
        use crate::application::extract_use_case::ExtractUseCase;

        let use_case = ExtractUseCase::new(args.into());
        use_case.execute()?;

        println!("Feature extraction complete.");
        Ok(())
    }
}

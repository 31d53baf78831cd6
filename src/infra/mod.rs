// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence concerns used by several layers:
//
//   checkpoint.rs       — Saving and loading model weights with
//                         Burn's CompactRecorder, keyed by
//                         epoch, plus the run config JSON.
//
//   dictionary_store.rs — Builds the question/answer
//                         dictionaries over the training split
//                         and caches them as JSON next to the
//                         question files, so every run uses the
//                         same id assignment.
//
//   hyperparams.rs      — Per-model-variant hyperparameters
//                         loaded from a JSON config file.
//
//   metrics.rs          — Per-epoch training metrics CSV.
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Dictionary building with on-disk caching
pub mod dictionary_store;

/// Model-variant hyperparameter config loading
pub mod hyperparams;

/// Training metrics CSV logger
pub mod metrics;

// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains ALL Burn framework specific code.
// No other layer imports from burn directly — only this one
// and the data layer's batchers.
//
// What's in this layer:
//
//   model.rs     — The Relational Network architecture
//                  • 4-layer strided conv image encoder
//                  • Embedding + LSTM question encoder
//                  • coordinate-tagged object pairs
//                  • g MLP with question injection at a
//                    configurable layer, summed over pairs
//                  • f MLP producing answer logits
//
//   trainer.rs   — The training loop
//                  Forward pass, weighted cross-entropy loss,
//                  backward pass, Adam step, interval logging,
//                  per-epoch validation and checkpointing
//
//   extractor.rs — Intermediate feature extraction
//                  Runs a trained checkpoint over val images
//                  and aggregates a chosen layer's input
//                  activations by max and mean over the
//                  object-pair combinations
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Santoro et al. (2017) A simple neural network
//            module for relational reasoning

/// Relational Network model architecture
pub mod model;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Intermediate-layer feature extraction from a checkpoint
pub mod extractor;

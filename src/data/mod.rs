// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from the raw CLEVR directory layout to GPU-ready
// tensor batches.
//
// The pipeline flows in this order:
//
//   <root>/questions/CLEVR_{split}_questions.json
//       │
//       ▼
//   questions         → parses JSON, caches the parsed records
//       │
//       ▼
//   Dictionaries      → word/answer ids (built once over train)
//       │
//       ▼
//   ClevrDataset      → (image pixels, token ids, answer id)
//       │                 images read lazily per sample
//       ▼
//   ClevrBatcher      → pads questions, stacks into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// CLEVR question JSON parsing with a binary cache sibling
pub mod questions;

/// PNG loading, resize and train-time augmentation
pub mod transform;

/// Burn Dataset implementations over questions and images
pub mod dataset;

/// Burn Batcher implementations (question padding lives here)
pub mod batcher;

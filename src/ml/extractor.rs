// ============================================================
// Layer 5 — Feature Extractor
// ============================================================
// Runs a trained checkpoint over the val images and dumps the
// input activations of one chosen layer, aggregated per image.
//
// The capture point is explicit in the model
// (forward_with_features) rather than a forward hook — Burn has
// no hook mechanism, and an explicit return is clearer anyway.
//
// Aggregation: the captured activations have shape
// [batch, combinations, features] where combinations is the
// 64*64 object pairs for a g layer and 1 for f_fc1. Both an
// elementwise max and a mean over the combinations dimension
// are kept, one row per image. When the capture layer is the
// question-injection layer, the trailing lstm_hidden features
// are the broadcast question embedding — meaningless for the
// zero-question placeholder input — and are stripped first.
//
// Output: features/gfc{i}_max_features.bin and
// features/gfc{i}_avg_features.bin, each a bincode-serialised
// Vec<(batch_index, Vec<row>)>.

use std::fs;

use anyhow::{anyhow, Context, Result};
use burn::{data::dataloader::DataLoaderBuilder, prelude::*};

use crate::application::extract_use_case::ExtractConfig;
use crate::data::{batcher::ImageBatcher, dataset::ClevrImageDataset};
use crate::infra::hyperparams::ModelHyperparams;
use crate::ml::model::RelationNetwork;

type ExtractBackend = burn::backend::Wgpu;

/// Token length of the zero-filled question placeholder fed to
/// the model during extraction.
const PLACEHOLDER_QUESTION_LEN: usize = 100;

/// Per-image feature rows for one batch, tagged with the batch
/// index so downstream consumers can re-align with image order.
pub type FeatureDump = Vec<(usize, Vec<Vec<f32>>)>;

pub fn run_extraction(
    cfg:     &ExtractConfig,
    hyp:     &ModelHyperparams,
    model:   RelationNetwork<ExtractBackend>,
    dataset: ClevrImageDataset,
    device:  burn::backend::wgpu::WgpuDevice,
) -> Result<()> {
    fs::create_dir_all(&cfg.features_dir)
        .with_context(|| format!("Cannot create '{}'", cfg.features_dir.display()))?;

    let layer = cfg.extraction_layer;
    if layer < model.g_layer_count() {
        tracing::info!("Extracting features from the input of g_fc{}", layer + 1);
    } else {
        tracing::info!("Extracting features from the input of f_fc1");
    }

    let batcher = ImageBatcher::<ExtractBackend>::new(device.clone());
    let loader = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .num_workers(8)
        .build(dataset);

    let mut max_features: FeatureDump = Vec::new();
    let mut avg_features: FeatureDump = Vec::new();

    for (batch_idx, batch) in loader.iter().enumerate() {
        let batch_size = batch.images.dims()[0];

        let questions = Tensor::<ExtractBackend, 2, Int>::zeros(
            [batch_size, PLACEHOLDER_QUESTION_LEN],
            &device,
        );
        // The placeholder counts as full-length for every sample
        let lengths = Tensor::<ExtractBackend, 1, Int>::full(
            [batch_size],
            PLACEHOLDER_QUESTION_LEN as i32,
            &device,
        );

        let (_, features) = model.forward_with_features(batch.images, questions, lengths, layer);
        let [_, combinations, width] = features.dims();

        // Drop the broadcast question features at the injection layer
        let features = if layer == hyp.question_injection_position {
            features.slice([0..batch_size, 0..combinations, 0..width - hyp.lstm_hidden])
        } else {
            features
        };

        let max = features.clone().max_dim(1).squeeze::<2>(1);
        let avg = features.mean_dim(1).squeeze::<2>(1);

        max_features.push((batch_idx, to_rows(max)?));
        avg_features.push((batch_idx, to_rows(avg)?));

        if batch_idx % 50 == 0 {
            tracing::info!("Extracted batch {}", batch_idx);
        }
    }

    let max_path = cfg.features_dir.join(format!("gfc{}_max_features.bin", layer));
    let avg_path = cfg.features_dir.join(format!("gfc{}_avg_features.bin", layer));

    fs::write(&max_path, bincode::serialize(&max_features)?)
        .with_context(|| format!("Cannot write '{}'", max_path.display()))?;
    fs::write(&avg_path, bincode::serialize(&avg_features)?)
        .with_context(|| format!("Cannot write '{}'", avg_path.display()))?;

    tracing::info!(
        "Wrote {} batches of features to '{}' and '{}'",
        max_features.len(),
        max_path.display(),
        avg_path.display(),
    );
    Ok(())
}

/// [batch, width] tensor → one Vec<f32> row per sample
fn to_rows<B: Backend>(tensor: Tensor<B, 2>) -> Result<Vec<Vec<f32>>> {
    let [_, width] = tensor.dims();
    let flat: Vec<f32> = tensor
        .into_data()
        .to_vec()
        .map_err(|e| anyhow!("tensor readback failed: {e:?}"))?;
    Ok(flat.chunks(width).map(|row| row.to_vec()).collect())
}

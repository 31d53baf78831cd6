// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
// Key backend split:
//   - Training uses MyBackend (Autodiff<Wgpu>) for gradients
//   - model.valid() returns the model on MyInnerBackend (Wgpu)
//   - Validation batcher must also use MyInnerBackend
//   - argmax(1) returns [batch,1] so we flatten before .equal()
//
// The training loss is cross-entropy weighted by inverse answer
// frequency — rare answers ("cyan", "8") would otherwise drown
// under the frequent yes/no classes. Validation loss and
// accuracy are unweighted so epochs stay comparable.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    data::dataset::Dataset,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ClevrBatcher, dataset::ClevrDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::hyperparams::ModelHyperparams;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{RelationNetConfig, RelationNetwork};

type MyBackend      = burn::backend::Autodiff<burn::backend::Wgpu>;
type MyInnerBackend = burn::backend::Wgpu;

/// Pick the wgpu adapter: default GPU, or the CPU fallback
/// adapter when --cpu was given.
pub fn select_device(cpu: bool) -> burn::backend::wgpu::WgpuDevice {
    if cpu {
        burn::backend::wgpu::WgpuDevice::Cpu
    } else {
        burn::backend::wgpu::WgpuDevice::default()
    }
}

pub fn run_training(
    cfg:           &TrainConfig,
    hyp:           &ModelHyperparams,
    qdict_size:    usize,
    adict_size:    usize,
    train_dataset: ClevrDataset,
    val_dataset:   ClevrDataset,
    ckpt_manager:  CheckpointManager,
) -> Result<()> {
    let device = select_device(cfg.cpu);
    tracing::info!("Using WGPU device: {:?}", device);
    MyBackend::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = RelationNetConfig::new(
        qdict_size,
        adict_size,
        hyp.wordemb_dim,
        hyp.lstm_hidden,
        hyp.g_layers.clone(),
        hyp.f_fc1,
        hyp.f_fc2,
        hyp.dropout,
        hyp.question_injection_position,
    );
    let mut model: RelationNetwork<MyBackend> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} g layers, lstm_hidden={}, question injection at g_fc{}",
        hyp.g_layers.len(),
        hyp.lstm_hidden,
        hyp.question_injection_position + 1,
    );

    if let Some(name) = &cfg.resume {
        model = ckpt_manager.load_named(model, name, &device)?;
    }

    // ── Class-weighted loss (train) and plain loss (val) ──────────────────────
    let sample_weights = train_dataset.answer_weights();
    let (min_weight, max_weight) = sample_weights
        .iter()
        .fold((f64::INFINITY, 0.0f64), |(lo, hi), &w| (lo.min(w), hi.max(w)));
    tracing::info!(
        "Answer re-weighting over {} samples: per-sample weights in [{:.4}, {:.4}]",
        sample_weights.len(),
        min_weight,
        max_weight,
    );

    let class_weights = train_dataset.answer_class_weights(adict_size);
    let train_loss_fn = CrossEntropyLossConfig::new()
        .with_weights(Some(class_weights))
        .init::<MyBackend>(&device);
    let val_loss_fn = CrossEntropyLossConfig::new().init::<MyInnerBackend>(&device);

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let optim_cfg = AdamConfig::new().with_epsilon(1e-8);
    let mut optim = optim_cfg.init();

    let num_train = train_dataset.len();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = ClevrBatcher::<MyBackend>::new(device.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(8)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_batcher = ClevrBatcher::<MyInnerBackend>::new(device.clone());
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(8)
        .build(val_dataset);

    let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
    let mut best_val_loss = f64::INFINITY;

    // 0 would make the interval check divide by zero
    let log_interval = cfg.log_interval.max(1);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;
        let mut interval_loss  = 0.0f64;
        let mut interval_count = 0usize;

        for (batch_idx, batch) in train_loader.iter().enumerate() {
            let logits = model.forward(batch.images, batch.questions, batch.question_lengths);
            let loss = train_loss_fn.forward(logits, batch.answers);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_batches  += 1;
            interval_loss  += loss_val;
            interval_count += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            if batch_idx % log_interval == 0 && batch_idx > 0 {
                tracing::info!(
                    "Epoch {} [{}/{}] train_loss={:.4}",
                    epoch,
                    batch_idx * cfg.batch_size,
                    num_train,
                    interval_loss / interval_count as f64,
                );
                interval_loss  = 0.0;
                interval_count = 0;
            }
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → RelationNetwork<MyInnerBackend>,
        // dropout disabled for deterministic evaluation
        let model_valid = model.valid();

        let mut val_loss_sum  = 0.0f64;
        let mut val_batches   = 0usize;
        let mut corrects      = 0usize;
        let mut total_samples = 0usize;

        for batch in val_loader.iter() {
            let logits =
                model_valid.forward(batch.images, batch.questions, batch.question_lengths);

            let batch_loss: f64 = val_loss_fn
                .forward(logits.clone(), batch.answers.clone())
                .into_scalar()
                .elem::<f64>();
            val_loss_sum += batch_loss;
            val_batches  += 1;

            // argmax(1) returns shape [batch, 1] — flatten to [batch]
            let predictions = logits.argmax(1).flatten::<1>(0, 1);

            total_samples += batch.answers.dims()[0];
            let batch_correct: i64 = predictions
                .equal(batch.answers)
                .int()
                .sum()
                .into_scalar()
                .elem::<i64>();
            corrects += batch_correct as usize;
        }

        let avg_val_loss = if val_batches   > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let accuracy     = if total_samples > 0 { corrects as f64 / total_samples as f64 } else { 0.0 };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | accuracy={:.2}% ({}/{})",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss,
            accuracy * 100.0, corrects, total_samples,
        );

        let epoch_metrics = EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, accuracy);
        if epoch_metrics.is_improvement(best_val_loss) {
            best_val_loss = epoch_metrics.val_loss;
            tracing::info!("New best validation loss: {:.4}", best_val_loss);
        }
        metrics.log(&epoch_metrics)?;

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);
    }

    tracing::info!("Training complete!");
    Ok(())
}

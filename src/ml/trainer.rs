// ============================================================
// Layer 5 - Training Loop
// ============================================================
// Full train + validation loop using Burn's DataLoader and Adam.
//
//   - Training uses Autodiff<B> for gradients
//   - model.valid() returns the model on B::InnerBackend, so the
//     validation batcher uses the inner backend too
//   - Only the best epoch (lowest validation MSE) is checkpointed
//   - The plateau scheduler sets the LR for the next epoch
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SequenceBatcher, dataset::SequenceDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::backend::{ComputeBackend, NdArrayTrainBackend, WgpuTrainBackend};
use crate::ml::model::HybridLstModel;
use crate::ml::scheduler::{EarlyStopping, ReduceLrOnPlateau};

/// Outcome of a training run.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub history:       Vec<EpochMetrics>,
    pub best_epoch:    usize,
    pub best_val_loss: f64,
    pub stopped_early: bool,
}

impl TrainingReport {
    pub fn final_lr(&self) -> Option<f64> {
        self.history.last().map(|m| m.lr)
    }
}

pub fn run_training(
    cfg:           &TrainConfig,
    n_features:    usize,
    train_dataset: SequenceDataset,
    val_dataset:   SequenceDataset,
    ckpt_manager:  &CheckpointManager,
    logger:        &MetricsLogger,
) -> Result<TrainingReport> {
    match cfg.backend {
        ComputeBackend::Wgpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            train_loop::<WgpuTrainBackend>(
                cfg, n_features, train_dataset, val_dataset, ckpt_manager, logger, device,
            )
        }
        ComputeBackend::NdArray => {
            let device = burn::backend::ndarray::NdArrayDevice::default();
            tracing::info!("Using NdArray device: {:?}", device);
            train_loop::<NdArrayTrainBackend>(
                cfg, n_features, train_dataset, val_dataset, ckpt_manager, logger, device,
            )
        }
    }
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    n_features:    usize,
    train_dataset: SequenceDataset,
    val_dataset:   SequenceDataset,
    ckpt_manager:  &CheckpointManager,
    logger:        &MetricsLogger,
    device:        B::Device,
) -> Result<TrainingReport> {
    if train_dataset.is_empty() {
        bail!("training set is empty; provide more rows or lower seq_len");
    }
    if val_dataset.is_empty() {
        bail!("validation set is empty; provide more rows or raise val_fraction");
    }
    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: HybridLstModel<B> = cfg.model_config(n_features).init(&device);
    tracing::info!(
        "Model ready: {} features, {} conv filters, LSTM hidden {}",
        n_features, cfg.conv_filters, cfg.lstm_hidden
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim_cfg = AdamConfig::new()
        .with_epsilon(1e-8)
        .with_grad_clipping(cfg.clip_grad_norm.map(GradientClippingConfig::Norm));
    let mut optim = optim_cfg.init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_samples = train_dataset.sample_count();
    let train_batcher = SequenceBatcher::<B>::new(device.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend, no autodiff overhead) ───────────
    let val_samples = val_dataset.sample_count();
    let val_batcher = SequenceBatcher::<B::InnerBackend>::new(device.clone());
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    tracing::info!(
        "Training on {} windows, validating on {} windows",
        train_samples, val_samples
    );

    let mut scheduler = ReduceLrOnPlateau::new(cfg.lr, cfg.plateau());
    let mut stopper   = cfg.early_stop_patience.map(|p| EarlyStopping::new(p, cfg.min_delta));
    let mut history   = Vec::with_capacity(cfg.epochs);
    let mut best: Option<(usize, f64)> = None;
    let mut stopped_early = false;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let lr = scheduler.lr();

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_seen     = 0usize;

        for batch in train_loader.iter() {
            let batch_len = batch.targets.dims()[0];
            let (loss, _) = model.forward_loss(batch.inputs, batch.targets);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val * batch_len as f64;
            train_seen     += batch_len;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }

        let avg_train_loss = if train_seen > 0 {
            train_loss_sum / train_seen as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        // dropout disabled for deterministic evaluation
        let model_valid = model.valid();

        let mut sq_err_sum  = 0.0f64;
        let mut abs_err_sum = 0.0f64;
        let mut val_seen    = 0usize;

        for batch in val_loader.iter() {
            val_seen += batch.targets.dims()[0];
            let diff = model_valid.forward(batch.inputs) - batch.targets;

            sq_err_sum  += diff.clone().powf_scalar(2.0).sum().into_scalar().elem::<f64>();
            abs_err_sum += diff.abs().sum().into_scalar().elem::<f64>();
        }

        let (val_loss, val_mae) = if val_seen > 0 {
            (sq_err_sum / val_seen as f64, abs_err_sum / val_seen as f64)
        } else { (f64::NAN, f64::NAN) };

        let metrics = EpochMetrics::new(epoch, avg_train_loss, val_loss, val_mae, lr);
        logger.log(&metrics)?;
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.5} | val_loss={:.5} | val_mae={:.5} | lr={:.2e}",
            epoch, cfg.epochs, avg_train_loss, val_loss, val_mae, lr,
        );

        // ── Best checkpoint ───────────────────────────────────────────────────
        let best_so_far = best.map_or(f64::INFINITY, |(_, loss)| loss);
        if metrics.is_improvement(best_so_far) {
            ckpt_manager.save_best(&model_valid, epoch, val_loss)?;
            best = Some((epoch, val_loss));
            tracing::info!("New best model at epoch {} (val_loss {:.5})", epoch, val_loss);
        }
        history.push(metrics);

        if let Some(new_lr) = scheduler.step(val_loss) {
            tracing::info!(
                "Validation loss plateaued at {:.5}; learning rate reduced to {:.2e}",
                scheduler.best(),
                new_lr
            );
        }

        if let Some(stopper) = stopper.as_mut() {
            if stopper.should_stop(val_loss) {
                tracing::info!("Early stopping after epoch {}", epoch);
                stopped_early = true;
                break;
            }
        }
    }

    let Some((best_epoch, best_val_loss)) = best else {
        bail!("validation loss was never finite; no checkpoint was written");
    };

    tracing::info!(
        "Training complete! Best epoch {} with val_loss {:.5}, history in '{}'",
        best_epoch, best_val_loss, logger.csv_path().display()
    );
    Ok(TrainingReport { history, best_epoch, best_val_loss, stopped_early })
}

// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting file concerns shared by the use cases:
//
//   checkpoint.rs - best-model weights (Burn CompactRecorder)
//                   plus the JSON artifacts needed to rebuild
//                   the pipeline: TrainConfig, fitted scalers,
//                   best epoch.
//
//   metrics.rs    - per-epoch training history CSV.
//
//   report.rs     - predictions.csv, evaluation.json and
//                   attention.csv after scoring a checkpoint.
//
// Reference: Burn Book §5 (Checkpointing)

/// Best-model checkpoint and run artifacts
pub mod checkpoint;

/// Training history CSV logger
pub mod metrics;

/// Evaluation outputs
pub mod report;

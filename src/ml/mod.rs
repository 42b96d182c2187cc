// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// All model code lives here:
//
//   backend.rs    - WGPU / NdArray selection
//
//   model.rs      - hybrid CNN + LSTM + additive attention
//                   regressor
//
//   scheduler.rs  - LR reduction on plateau, early stopping
//
//   trainer.rs    - epoch loop: Adam, validation, best
//                   checkpoint, history
//
//   inferencer.rs - loads the best checkpoint and runs it
//                   over windows in batches
//
//   evaluator.rs  - inverse scaling and regression metrics
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Hochreiter & Schmidhuber (1997) LSTM
//            Bahdanau et al. (2015) additive attention

pub mod backend;

/// CNN + LSTM + attention architecture
pub mod model;

pub mod scheduler;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Inference engine
pub mod inferencer;

/// Metrics in LST units
pub mod evaluator;

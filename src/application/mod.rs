// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Orchestrates the other layers for one CLI command each.
//
// Rules for this layer:
//   - No model math here (Layer 5)
//   - No printing here (Layer 1)
//   - File access goes through Layers 4 and 6
//
// Reference: Clean Architecture pattern

/// CSV → features → scaled windows, shared by the use cases
pub mod pipeline;

/// The training workflow
pub mod train_use_case;

/// Re-score a saved checkpoint
pub mod evaluate_use_case;

/// Next-day forecast
pub mod predict_use_case;

/// Synthetic dataset
pub mod generate_use_case;

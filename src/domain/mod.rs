// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Pure Rust structs and traits describing the core concepts:
// a daily series of solar-activity observations and the
// feature frame derived from it.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums, and traits

/// Daily series and feature frame types
pub mod series;

/// Abstractions implemented by the data layer
pub mod traits;

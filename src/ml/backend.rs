// Compute backend selection. Training runs on the autodiff
// wrapper of the chosen backend; validation and inference run
// on the plain backend.

use serde::{Deserialize, Serialize};

pub type WgpuBackend   = burn::backend::Wgpu;
pub type NdArrayBackend = burn::backend::NdArray;

pub type WgpuTrainBackend    = burn::backend::Autodiff<WgpuBackend>;
pub type NdArrayTrainBackend = burn::backend::Autodiff<NdArrayBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ComputeBackend {
    /// GPU through WGPU (Vulkan, Metal, DX12)
    Wgpu,
    /// CPU through ndarray
    #[value(name = "ndarray")]
    NdArray,
}

impl Default for ComputeBackend {
    fn default() -> Self {
        ComputeBackend::Wgpu
    }
}

impl std::fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComputeBackend::Wgpu    => write!(f, "wgpu"),
            ComputeBackend::NdArray => write!(f, "ndarray"),
        }
    }
}

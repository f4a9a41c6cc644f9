//! Activation layers.

use super::module::{Module, ModuleKind};
use crate::tensor::Tensor;

/// Rectified linear unit: max(0, x).
#[derive(Debug, Default, Clone, Copy)]
pub struct ReLU;

impl ReLU {
    /// Create a new `ReLU` activation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Module for ReLU {
    fn forward(&self, input: &Tensor) -> Tensor {
        let data: Vec<f32> = input.data().iter().map(|&v| v.max(0.0)).collect();
        Tensor::new(&data, input.shape())
    }

    fn parameters(&self) -> Vec<&Tensor> {
        Vec::new()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        Vec::new()
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Activation
    }
}

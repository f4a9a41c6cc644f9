//! Normalization layers.
//!
//! # References
//!
//! - Ioffe, S., & Szegedy, C. (2015). Batch normalization: Accelerating deep
//!   network training by reducing internal covariate shift. ICML.

use super::hook::{ForwardHook, HookId, HookList};
use super::init::{constant, zeros};
use super::module::{Module, ModuleKind};
use crate::tensor::Tensor;

/// 1D batch normalization over `[batch, features]` or `[batch, features, length]`.
///
/// Normalizes each feature with batch statistics in training mode and with
/// running statistics in evaluation mode, then applies the learnable scale
/// (weight) and shift (bias). The feature dimension of the per-feature scale
/// is coupled to the preceding layer's output width, which is why this layer
/// cannot shrink under pruning and only supports zeroed channels.
pub struct BatchNorm1d {
    num_features: usize,
    eps: f32,
    /// Learnable scale
    weight: Tensor,
    /// Learnable shift, or None if detached
    bias: Option<Tensor>,
    /// Running mean (not learnable)
    running_mean: Tensor,
    /// Running variance (not learnable)
    running_var: Tensor,
    /// Training mode
    training: bool,
    /// Forward hooks, run after the layer's own computation
    hooks: HookList,
}

impl BatchNorm1d {
    /// Create a new `BatchNorm1d` layer.
    #[must_use]
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            eps: 1e-5,
            weight: constant(&[num_features], 1.0).requires_grad(),
            bias: Some(zeros(&[num_features]).requires_grad()),
            running_mean: zeros(&[num_features]),
            running_var: constant(&[num_features], 1.0),
            training: true,
            hooks: HookList::new(),
        }
    }

    /// Set epsilon for numerical stability.
    #[must_use]
    pub fn with_eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    /// Get the number of features.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Per-feature (mean, var) used for normalization.
    fn statistics(&self, input: &Tensor) -> (Vec<f32>, Vec<f32>) {
        let shape = input.shape();
        let features = shape[1];
        let data = input.data();

        if !self.training {
            return (
                self.running_mean.data().to_vec(),
                self.running_var.data().to_vec(),
            );
        }

        let length = if input.ndim() == 3 { shape[2] } else { 1 };
        let batch_size = shape[0];
        let count = (batch_size * length) as f32;

        let mut means = vec![0.0f32; features];
        let mut vars = vec![0.0f32; features];
        for f in 0..features {
            let mut sum = 0.0;
            for b in 0..batch_size {
                for l in 0..length {
                    sum += data[b * features * length + f * length + l];
                }
            }
            let mean = sum / count;

            let mut var_sum = 0.0;
            for b in 0..batch_size {
                for l in 0..length {
                    let val = data[b * features * length + f * length + l];
                    var_sum += (val - mean).powi(2);
                }
            }
            means[f] = mean;
            vars[f] = var_sum / count;
        }
        (means, vars)
    }
}

impl Module for BatchNorm1d {
    fn forward(&self, input: &Tensor) -> Tensor {
        assert!(
            input.ndim() == 2 || input.ndim() == 3,
            "BatchNorm1d expects 2D or 3D input, got {}D",
            input.ndim()
        );

        let shape = input.shape();
        // For both 2D [batch, features] and 3D [batch, features, length],
        // features is always at shape[1]
        let features = shape[1];

        assert_eq!(
            features, self.num_features,
            "Expected {} features, got {}",
            self.num_features, features
        );

        let (means, vars) = self.statistics(input);

        let batch_size = shape[0];
        let length = if input.ndim() == 3 { shape[2] } else { 1 };
        let data = input.data();
        let gamma = self.weight.data();
        let mut output = vec![0.0f32; data.len()];

        for b in 0..batch_size {
            for f in 0..features {
                let scale = gamma[f] / (vars[f] + self.eps).sqrt();
                for l in 0..length {
                    let idx = b * features * length + f * length + l;
                    let mut val = (data[idx] - means[f]) * scale;
                    if let Some(ref beta) = self.bias {
                        val += beta.data()[f];
                    }
                    output[idx] = val;
                }
            }
        }

        let output = Tensor::new(&output, shape);
        self.hooks.run(output)
    }

    fn parameters(&self) -> Vec<&Tensor> {
        match &self.bias {
            Some(b) => vec![&self.weight, b],
            None => vec![&self.weight],
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        match &mut self.bias {
            Some(b) => vec![&mut self.weight, b],
            None => vec![&mut self.weight],
        }
    }

    fn train(&mut self) {
        self.training = true;
    }

    fn eval(&mut self) {
        self.training = false;
    }

    fn training(&self) -> bool {
        self.training
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::BatchNorm1d
    }

    fn weight(&self) -> Option<&Tensor> {
        Some(&self.weight)
    }

    fn set_weight(&mut self, weight: Tensor) {
        self.weight = weight;
    }

    fn bias(&self) -> Option<&Tensor> {
        self.bias.as_ref()
    }

    fn set_bias(&mut self, bias: Tensor) {
        self.bias = Some(bias);
    }

    fn take_bias(&mut self) -> Option<Tensor> {
        self.bias.take()
    }

    fn register_forward_hook(&mut self, hook: Box<dyn ForwardHook>) -> Option<HookId> {
        Some(self.hooks.register(hook))
    }

    fn remove_forward_hook(&mut self, id: HookId) -> bool {
        self.hooks.remove(id)
    }
}

impl std::fmt::Debug for BatchNorm1d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchNorm1d")
            .field("num_features", &self.num_features)
            .field("eps", &self.eps)
            .field("training", &self.training)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batchnorm_normalizes_batch() {
        let bn = BatchNorm1d::new(2);
        let x = Tensor::new(&[1.0, 10.0, 3.0, 30.0], &[2, 2]);
        let y = bn.forward(&x);

        // Each feature column normalized to zero mean
        let data = y.data();
        assert!((data[0] + data[2]).abs() < 1e-4);
        assert!((data[1] + data[3]).abs() < 1e-4);
    }

    #[test]
    fn test_batchnorm_eval_uses_running_stats() {
        let mut bn = BatchNorm1d::new(2);
        bn.eval();

        // Running stats are mean 0, var 1 at construction
        let x = Tensor::new(&[2.0, 4.0], &[1, 2]);
        let y = bn.forward(&x);

        let data = y.data();
        assert!((data[0] - 2.0).abs() < 1e-3);
        assert!((data[1] - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_batchnorm_3d_shape() {
        let bn = BatchNorm1d::new(3);
        let x = Tensor::ones(&[2, 3, 4]);
        let y = bn.forward(&x);
        assert_eq!(y.shape(), &[2, 3, 4]);
    }

    #[test]
    fn test_batchnorm_zeroed_scale_zeroes_channel() {
        let mut bn = BatchNorm1d::new(2);
        bn.eval();
        bn.take_bias();
        bn.set_weight(Tensor::new(&[1.0, 0.0], &[2]));

        let x = Tensor::new(&[2.0, 4.0], &[1, 2]);
        let y = bn.forward(&x);

        assert!((y.data()[0] - 2.0).abs() < 1e-3);
        assert_eq!(y.data()[1], 0.0);
    }
}

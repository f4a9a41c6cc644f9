//! Fully connected (linear) layer.
//!
//! Implements the transformation y = xW^T + b.
//!
//! # References
//!
//! - Glorot, X., & Bengio, Y. (2010). Understanding the difficulty of training
//!   deep feedforward neural networks. AISTATS.

use super::hook::{ForwardHook, HookId, HookList};
use super::init::{xavier_uniform, zeros};
use super::module::{Module, ModuleKind};
use crate::tensor::Tensor;

/// Fully connected layer: y = xW^T + b
///
/// Applies a linear transformation to the incoming data.
/// Weight initialization follows Xavier/Glorot (Glorot & Bengio, 2010).
///
/// # Shape
///
/// - Input: `(*, in_features)` where `*` means any number of batch dimensions
/// - Output: `(*, U)` where `U` is the live weight's row count, equal to
///   `out_features` unless the weight has been replaced by a narrower one
///
/// # Example
///
/// ```
/// use podar::nn::{Module, Linear};
/// use podar::tensor::Tensor;
///
/// let layer = Linear::new(20, 30);
/// let x = Tensor::ones(&[128, 20]);
/// let output = layer.forward(&x);
///
/// assert_eq!(output.shape(), &[128, 30]);
/// ```
pub struct Linear {
    /// Weight matrix, shape: [`out_features`, `in_features`]
    weight: Tensor,

    /// Cached transposed weight [`in_features`, `out_features`] for fast forward.
    /// Computed once when weight is set, avoids transpose overhead every forward.
    weight_t: Option<Tensor>,

    /// Bias vector, shape: [`out_features`], or None if detached/absent
    bias: Option<Tensor>,

    /// Number of input features
    in_features: usize,

    /// Number of output features at construction
    out_features: usize,

    /// Forward hooks, run after the layer's own computation
    hooks: HookList,
}

impl Linear {
    /// Create a new Linear layer with Xavier initialization.
    #[must_use]
    pub fn new(in_features: usize, out_features: usize) -> Self {
        Self::with_seed(in_features, out_features, None)
    }

    /// Create a Linear layer with a specific random seed.
    #[must_use]
    pub fn with_seed(in_features: usize, out_features: usize, seed: Option<u64>) -> Self {
        let weight =
            xavier_uniform(&[out_features, in_features], in_features, out_features, seed)
                .requires_grad();
        let weight_t = Some(weight.transpose());
        let bias = zeros(&[out_features]).requires_grad();

        Self {
            weight,
            weight_t,
            bias: Some(bias),
            in_features,
            out_features,
            hooks: HookList::new(),
        }
    }

    /// Create a Linear layer without bias.
    ///
    /// Useful when followed by a normalization layer with its own shift.
    #[must_use]
    pub fn without_bias(in_features: usize, out_features: usize) -> Self {
        let mut layer = Self::with_seed(in_features, out_features, None);
        layer.bias = None;
        layer
    }

    /// Get the input feature dimension.
    #[must_use]
    pub fn in_features(&self) -> usize {
        self.in_features
    }

    /// Get the output feature dimension at construction time.
    #[must_use]
    pub fn out_features(&self) -> usize {
        self.out_features
    }

    /// Check if this layer has a bias term attached.
    #[must_use]
    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }
}

impl Module for Linear {
    fn forward(&self, input: &Tensor) -> Tensor {
        // y = x @ W^T + b
        // Input: [*, in_features]; output width follows the live weight's
        // row count so externally replaced weights flow through unchanged.
        let input_shape = input.shape();
        let ndim = input_shape.len();
        let active_out = self.weight.shape()[0];

        let (reshaped, batch_shape) = if ndim > 2 {
            let batch_size: usize = input_shape[..ndim - 1].iter().product();
            let in_features = input_shape[ndim - 1];
            let batch_shape: Vec<usize> = input_shape[..ndim - 1].to_vec();

            (input.view(&[batch_size, in_features]), Some(batch_shape))
        } else {
            (input.clone(), None)
        };

        // Use cached transposed weight (computed when the weight is set).
        let weight_t = self.weight_t.as_ref().unwrap_or_else(|| {
            panic!("Linear layer has no cached weight_t. Call set_weight() first or use new().");
        });
        let output = reshaped.matmul(weight_t);

        let output = match &self.bias {
            Some(b) => output.broadcast_add(b),
            None => output,
        };

        let output = match batch_shape {
            Some(mut shape) => {
                shape.push(active_out);
                output.view(&shape)
            }
            None => output,
        };

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

    fn refresh_caches(&mut self) {
        // Recompute cached transposed weight after parameters were modified
        self.weight_t = Some(self.weight.transpose());
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Linear
    }

    fn weight(&self) -> Option<&Tensor> {
        Some(&self.weight)
    }

    fn set_weight(&mut self, weight: Tensor) {
        // Pre-compute transpose once here, not every forward pass
        self.weight_t = Some(weight.transpose());
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

impl std::fmt::Debug for Linear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linear")
            .field("in_features", &self.in_features)
            .field("out_features", &self.out_features)
            .field("bias", &self.bias.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_forward_shape() {
        let layer = Linear::new(10, 5);
        let x = Tensor::ones(&[32, 10]);
        let output = layer.forward(&x);

        assert_eq!(output.shape(), &[32, 5]);
    }

    #[test]
    fn test_linear_forward_3d() {
        let layer = Linear::new(6, 4);
        let x = Tensor::ones(&[2, 3, 6]);
        let output = layer.forward(&x);

        assert_eq!(output.shape(), &[2, 3, 4]);
    }

    #[test]
    fn test_linear_parameters() {
        let layer = Linear::new(10, 5);
        let params = layer.parameters();

        assert_eq!(params.len(), 2); // weight + bias
        assert_eq!(params[0].shape(), &[5, 10]); // weight
        assert_eq!(params[1].shape(), &[5]); // bias
    }

    #[test]
    fn test_linear_without_bias() {
        let layer = Linear::without_bias(10, 5);
        let params = layer.parameters();

        assert_eq!(params.len(), 1); // weight only
        assert!(!layer.has_bias());
    }

    #[test]
    fn test_linear_num_parameters() {
        let layer = Linear::new(10, 5);
        // weight: 10*5 = 50, bias: 5, total: 55
        assert_eq!(layer.num_parameters(), 55);
    }

    #[test]
    fn test_linear_reproducible() {
        let layer1 = Linear::with_seed(10, 5, Some(42));
        let layer2 = Linear::with_seed(10, 5, Some(42));

        assert_eq!(layer1.weight.data(), layer2.weight.data());
    }

    #[test]
    fn test_linear_identity_like() {
        let mut layer = Linear::with_seed(3, 3, Some(42));

        // Set weight to identity, bias to zero (set_weight updates the cache)
        let identity = Tensor::new(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0], &[3, 3]);
        layer.set_weight(identity.requires_grad());
        layer.set_bias(Tensor::zeros(&[3]).requires_grad());

        let x = Tensor::new(&[1.0, 2.0, 3.0], &[1, 3]);
        let output = layer.forward(&x);

        let out_data = output.data();
        assert!((out_data[0] - 1.0).abs() < 1e-5);
        assert!((out_data[1] - 2.0).abs() < 1e-5);
        assert!((out_data[2] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_linear_with_bias() {
        let mut layer = Linear::with_seed(2, 2, Some(42));

        layer.set_weight(Tensor::new(&[1.0, 0.0, 0.0, 1.0], &[2, 2]).requires_grad());
        layer.set_bias(Tensor::new(&[10.0, 20.0], &[2]).requires_grad());

        let x = Tensor::new(&[1.0, 2.0], &[1, 2]);
        let output = layer.forward(&x);

        // y = [1, 2] @ I + [10, 20] = [11, 22]
        let out_data = output.data();
        assert!((out_data[0] - 11.0).abs() < 1e-5);
        assert!((out_data[1] - 22.0).abs() < 1e-5);
    }

    #[test]
    fn test_take_bias_detaches() {
        let mut layer = Linear::with_seed(2, 2, Some(1));
        let bias = layer.take_bias();
        assert!(bias.is_some());
        assert!(!layer.has_bias());
        assert_eq!(layer.parameters().len(), 1);
    }

    #[test]
    fn test_forward_follows_replaced_weight_width() {
        // PROPERTY: a narrower weight narrows the output without touching
        // the constructed out_features
        let mut layer = Linear::with_seed(3, 3, Some(2));
        layer.take_bias();
        layer.set_weight(Tensor::new(&[1.0, 0.0, 0.0, 0.0, 1.0, 0.0], &[2, 3]));

        let x = Tensor::ones(&[4, 3]);
        let output = layer.forward(&x);

        assert_eq!(output.shape(), &[4, 2]);
        assert_eq!(layer.out_features(), 3);
    }
}

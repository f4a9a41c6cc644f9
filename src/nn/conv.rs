//! Convolutional layers.
//!
//! Implements 1D convolution following the `PyTorch` API shape conventions.
//!
//! # References
//!
//! - `LeCun`, Y., et al. (1998). Gradient-based learning applied to document
//!   recognition. Proceedings of the IEEE.
//! - He, K., et al. (2015). Delving deep into rectifiers. ICCV.

use super::hook::{ForwardHook, HookId, HookList};
use super::init::{kaiming_uniform, zeros};
use super::module::{Module, ModuleKind};
use crate::tensor::Tensor;

/// 1D Convolution layer.
///
/// Applies a 1D convolution over an input signal composed of several input
/// planes.
///
/// # Shape
///
/// - Input: `(N, C_in, L)` where N is batch size, `C_in` is input channels, L is length
/// - Output: `(N, C_out, L_out)` where `L_out` = (L + 2*padding - `kernel_size`) / stride + 1;
///   `C_out` follows the live weight's leading dimension
pub struct Conv1d {
    /// Weight tensor, shape: [`out_channels`, `in_channels`, `kernel_size`]
    weight: Tensor,
    /// Bias tensor, shape: [`out_channels`], or None if detached/absent
    bias: Option<Tensor>,
    /// Number of input channels
    in_channels: usize,
    /// Number of output channels at construction
    out_channels: usize,
    /// Kernel size
    kernel_size: usize,
    /// Stride
    stride: usize,
    /// Padding
    padding: usize,
    /// Forward hooks, run after the layer's own computation
    hooks: HookList,
}

impl Conv1d {
    /// Create a new Conv1d layer with stride 1 and no padding.
    #[must_use]
    pub fn new(in_channels: usize, out_channels: usize, kernel_size: usize) -> Self {
        Self::with_options(in_channels, out_channels, kernel_size, 1, 0, true)
    }

    /// Create a Conv1d layer with a specific random seed.
    #[must_use]
    pub fn with_seed(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        seed: Option<u64>,
    ) -> Self {
        let mut conv = Self::with_options(in_channels, out_channels, kernel_size, 1, 0, true);
        let fan_in = in_channels * kernel_size;
        conv.weight = kaiming_uniform(&[out_channels, in_channels, kernel_size], fan_in, seed)
            .requires_grad();
        conv
    }

    /// Create Conv1d with custom options.
    #[must_use]
    pub fn with_options(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        bias: bool,
    ) -> Self {
        // Kaiming initialization (He et al., 2015)
        let fan_in = in_channels * kernel_size;
        let weight =
            kaiming_uniform(&[out_channels, in_channels, kernel_size], fan_in, None)
                .requires_grad();

        let bias_tensor = if bias {
            Some(zeros(&[out_channels]).requires_grad())
        } else {
            None
        };

        Self {
            weight,
            bias: bias_tensor,
            in_channels,
            out_channels,
            kernel_size,
            stride,
            padding,
            hooks: HookList::new(),
        }
    }

    /// Get the number of input channels.
    #[must_use]
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Get the number of output channels at construction time.
    #[must_use]
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Get kernel size.
    #[must_use]
    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }
}

impl Module for Conv1d {
    fn forward(&self, input: &Tensor) -> Tensor {
        assert_eq!(
            input.ndim(),
            3,
            "Conv1d expects 3D input [N, C, L], got {}D",
            input.ndim()
        );

        let shape = input.shape();
        let (batch_size, in_channels, in_length) = (shape[0], shape[1], shape[2]);

        assert_eq!(
            in_channels, self.in_channels,
            "Expected {} input channels, got {}",
            self.in_channels, in_channels
        );

        // Channel count follows the live weight
        let active_out = self.weight.shape()[0];
        let out_length = (in_length + 2 * self.padding - self.kernel_size) / self.stride + 1;

        let mut output = vec![0.0; batch_size * active_out * out_length];

        let input_data = input.data();
        let weight_data = self.weight.data();

        for n in 0..batch_size {
            for oc in 0..active_out {
                for ol in 0..out_length {
                    let mut sum = 0.0;

                    for ic in 0..self.in_channels {
                        for k in 0..self.kernel_size {
                            let il = ol * self.stride + k;

                            // Handle padding
                            let val = if il < self.padding || il >= in_length + self.padding {
                                0.0
                            } else {
                                let actual_il = il - self.padding;
                                input_data[n * in_channels * in_length + ic * in_length + actual_il]
                            };

                            let w_idx = oc * self.in_channels * self.kernel_size
                                + ic * self.kernel_size
                                + k;
                            sum += val * weight_data[w_idx];
                        }
                    }

                    if let Some(ref bias) = self.bias {
                        sum += bias.data()[oc];
                    }

                    output[n * active_out * out_length + oc * out_length + ol] = sum;
                }
            }
        }

        let output = Tensor::new(&output, &[batch_size, active_out, out_length]);
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

    fn kind(&self) -> ModuleKind {
        ModuleKind::Conv1d
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

impl std::fmt::Debug for Conv1d {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conv1d")
            .field("in_channels", &self.in_channels)
            .field("out_channels", &self.out_channels)
            .field("kernel_size", &self.kernel_size)
            .field("stride", &self.stride)
            .field("padding", &self.padding)
            .finish_non_exhaustive()
    }
}

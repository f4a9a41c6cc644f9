//! Forward hooks reconciling activations and bias with the live mask.
//!
//! Structural pruning shrinks a module's output, but the surrounding
//! unmodified modules still expect the original width. The reconstruction
//! hook re-expands the activation with zeros at removed positions. The bias
//! hook re-adds the detached bias after the primary computation, masked in
//! tandem with the weight when bias pruning is on. Both hold a shared handle
//! to the module's live mask state; the attachment engine keeps the
//! authoritative hook-id records for removal at finalize time.

use super::parametrize::SharedPruneState;
use crate::nn::{ForwardHook, ModuleKind};
use crate::tensor::Tensor;

/// Re-expand a structurally pruned activation back to its original width.
///
/// Removed-unit positions are filled with zeros so downstream consumers keep
/// functioning on the pre-pruning shape.
pub struct ActivationReconstruction {
    state: SharedPruneState,
    kind: ModuleKind,
}

impl ActivationReconstruction {
    /// Create a reconstruction hook over a module's shared mask state.
    #[must_use]
    pub fn new(state: SharedPruneState, kind: ModuleKind) -> Self {
        Self { state, kind }
    }
}

impl ForwardHook for ActivationReconstruction {
    fn on_output(&self, output: Tensor) -> Tensor {
        let state = self.state.lock().expect("prune state lock poisoned");
        let mask = &state.mask;
        if mask.pruned_count() == 0 {
            return output;
        }

        let axis = self.kind.unit_axis(output.ndim());
        let shape = output.shape();
        debug_assert_eq!(shape[axis], mask.retained_count());

        let outer: usize = shape[..axis].iter().product();
        let inner: usize = shape[axis + 1..].iter().product();
        let width = mask.width();
        let retained = mask.retained_units();

        let mut expanded = vec![0.0f32; outer * width * inner];
        let data = output.data();
        for o in 0..outer {
            for (compact, &unit) in retained.iter().enumerate() {
                let src = (o * retained.len() + compact) * inner;
                let dst = (o * width + unit) * inner;
                expanded[dst..dst + inner].copy_from_slice(&data[src..src + inner]);
            }
        }

        let mut new_shape = shape.to_vec();
        new_shape[axis] = width;
        Tensor::new(&expanded, &new_shape)
    }
}

/// Re-add the detached bias to a module's output.
///
/// With bias pruning on, masked-out units get a zero bias contribution;
/// otherwise the full bias is added at every unit.
pub struct BiasCorrection {
    state: SharedPruneState,
    kind: ModuleKind,
    prune_bias: bool,
}

impl BiasCorrection {
    /// Create a bias-reconciliation hook over a module's shared mask state.
    #[must_use]
    pub fn new(state: SharedPruneState, kind: ModuleKind, prune_bias: bool) -> Self {
        Self {
            state,
            kind,
            prune_bias,
        }
    }
}

impl ForwardHook for BiasCorrection {
    fn on_output(&self, output: Tensor) -> Tensor {
        let state = self.state.lock().expect("prune state lock poisoned");
        let Some(bias) = state.bias.as_ref() else {
            return output;
        };

        let axis = self.kind.unit_axis(output.ndim());
        let shape = output.shape();
        let width = shape[axis];
        debug_assert_eq!(width, bias.numel());

        let outer: usize = shape[..axis].iter().product();
        let inner: usize = shape[axis + 1..].iter().product();
        let bias_data = bias.data();

        let mut data = output.data().to_vec();
        for o in 0..outer {
            for unit in 0..width {
                let contribution = if self.prune_bias && !state.mask.is_retained(unit) {
                    0.0
                } else {
                    bias_data[unit]
                };
                if contribution == 0.0 {
                    continue;
                }
                let start = (o * width + unit) * inner;
                for value in &mut data[start..start + inner] {
                    *value += contribution;
                }
            }
        }

        Tensor::new(&data, shape)
    }
}

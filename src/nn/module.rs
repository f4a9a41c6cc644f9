//! The `Module` trait and the module-kind capability table.

use std::fmt;

use super::hook::{ForwardHook, HookId};
use crate::tensor::Tensor;

/// Kind tag for a module, driving the pruning capability table.
///
/// # Toyota Way: Poka-Yoke
/// Capabilities are looked up from an explicit tag instead of downcasting,
/// so an unsupported layer is caught before any weight is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    /// Fully connected layer; output units along the last axis.
    Linear,
    /// 1D convolution; output channels along axis 1.
    Conv1d,
    /// 1D batch normalization; features along axis 1.
    BatchNorm1d,
    /// Parameter-free activation layer.
    Activation,
    /// Container composing child modules.
    Container,
    /// Anything else; not prunable.
    Other,
}

impl ModuleKind {
    /// Kinds whose output units can be physically removed from the weight.
    ///
    /// This is the supported-kind set consulted by auto-discovery and by the
    /// structural attachment path.
    #[must_use]
    pub fn supports_structural(self) -> bool {
        matches!(self, ModuleKind::Linear | ModuleKind::Conv1d)
    }

    /// Kinds whose masks must be supplied externally because their shape is
    /// coupled to a preceding layer.
    #[must_use]
    pub fn needs_manual_update(self) -> bool {
        matches!(self, ModuleKind::BatchNorm1d)
    }

    /// Kinds whose pruned units are zeroed in place rather than removed.
    #[must_use]
    pub fn needs_zeroing(self) -> bool {
        matches!(self, ModuleKind::BatchNorm1d)
    }

    /// Axis of the output-unit dimension in an activation of `ndim` axes.
    #[must_use]
    pub fn unit_axis(self, ndim: usize) -> usize {
        match self {
            ModuleKind::Conv1d | ModuleKind::BatchNorm1d => 1,
            _ => ndim.saturating_sub(1),
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleKind::Linear => "Linear",
            ModuleKind::Conv1d => "Conv1d",
            ModuleKind::BatchNorm1d => "BatchNorm1d",
            ModuleKind::Activation => "Activation",
            ModuleKind::Container => "Container",
            ModuleKind::Other => "Other",
        };
        write!(f, "{name}")
    }
}

/// Interface for all neural network layers.
///
/// Beyond the forward/parameter surface, the trait exposes what the pruning
/// engine consumes: declaration-order child enumeration, by-name child
/// lookup, the primary weight/bias slots, and removable forward hooks.
/// Leaf layers without those capabilities keep the defaults.
pub trait Module {
    /// Compute the module output for an input tensor.
    fn forward(&self, input: &Tensor) -> Tensor;

    /// All trainable parameters of this module (and its children).
    fn parameters(&self) -> Vec<&Tensor>;

    /// Mutable references to all trainable parameters.
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Set the module (and children) to training mode.
    fn train(&mut self) {}

    /// Set the module (and children) to evaluation mode.
    fn eval(&mut self) {}

    /// Check whether the module is in training mode.
    fn training(&self) -> bool {
        false
    }

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.numel()).sum()
    }

    /// Recompute derived caches after parameters were replaced externally.
    fn refresh_caches(&mut self) {}

    /// Kind tag used by the pruning capability table.
    fn kind(&self) -> ModuleKind {
        ModuleKind::Other
    }

    /// Child modules in declaration order, with their local names.
    fn named_children(&self) -> Vec<(String, &dyn Module)> {
        Vec::new()
    }

    /// Mutable child modules in declaration order.
    fn named_children_mut(&mut self) -> Vec<(String, &mut dyn Module)> {
        Vec::new()
    }

    /// Look up a direct child by its local name.
    fn child(&self, name: &str) -> Option<&dyn Module> {
        let _ = name;
        None
    }

    /// Look up a direct child mutably by its local name.
    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Module> {
        let _ = name;
        None
    }

    /// The primary weight tensor, if this module has one.
    fn weight(&self) -> Option<&Tensor> {
        None
    }

    /// Replace the primary weight tensor.
    ///
    /// # Panics
    ///
    /// Panics on modules without a weight slot; callers check `kind()` first.
    fn set_weight(&mut self, weight: Tensor) {
        let _ = weight;
        panic!("{} module has no weight slot", self.kind());
    }

    /// The bias tensor, if this module has one attached.
    fn bias(&self) -> Option<&Tensor> {
        None
    }

    /// Install a bias tensor.
    ///
    /// # Panics
    ///
    /// Panics on modules without a bias slot; callers check `kind()` first.
    fn set_bias(&mut self, bias: Tensor) {
        let _ = bias;
        panic!("{} module has no bias slot", self.kind());
    }

    /// Detach and return the bias, clearing the module's bias slot.
    fn take_bias(&mut self) -> Option<Tensor> {
        None
    }

    /// Register a forward hook; `None` if the module has no hook support.
    fn register_forward_hook(&mut self, hook: Box<dyn ForwardHook>) -> Option<HookId> {
        let _ = hook;
        None
    }

    /// Remove a forward hook by handle. Returns `false` if unknown.
    fn remove_forward_hook(&mut self, id: HookId) -> bool {
        let _ = id;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // FALSIFICATION: capability table matches the module-kind contract
    // ==========================================================================
    #[test]
    fn test_structural_kinds() {
        assert!(ModuleKind::Linear.supports_structural());
        assert!(ModuleKind::Conv1d.supports_structural());
        assert!(!ModuleKind::BatchNorm1d.supports_structural());
        assert!(!ModuleKind::Activation.supports_structural());
        assert!(!ModuleKind::Container.supports_structural());
        assert!(!ModuleKind::Other.supports_structural());
    }

    #[test]
    fn test_manual_update_kinds() {
        assert!(ModuleKind::BatchNorm1d.needs_manual_update());
        assert!(!ModuleKind::Linear.needs_manual_update());
        assert!(!ModuleKind::Conv1d.needs_manual_update());
    }

    #[test]
    fn test_zeroing_kinds() {
        assert!(ModuleKind::BatchNorm1d.needs_zeroing());
        assert!(!ModuleKind::Linear.needs_zeroing());
    }

    #[test]
    fn test_unit_axis() {
        assert_eq!(ModuleKind::Linear.unit_axis(2), 1);
        assert_eq!(ModuleKind::Linear.unit_axis(3), 2);
        assert_eq!(ModuleKind::Conv1d.unit_axis(3), 1);
        assert_eq!(ModuleKind::BatchNorm1d.unit_axis(2), 1);
        assert_eq!(ModuleKind::BatchNorm1d.unit_axis(3), 1);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ModuleKind::Linear.to_string(), "Linear");
        assert_eq!(ModuleKind::BatchNorm1d.to_string(), "BatchNorm1d");
    }
}

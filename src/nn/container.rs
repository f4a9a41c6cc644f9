//! Container modules for composing neural networks.
//!
//! These containers allow building complex networks from simpler modules.

use super::module::{Module, ModuleKind};
use crate::tensor::Tensor;

/// Sequential container for chaining modules.
///
/// Modules are executed in order, with each module's output becoming the
/// next module's input. Children are named by their insertion index
/// ("0", "1", …), which is how they appear in dotted module paths.
///
/// # Example
///
/// ```
/// use podar::nn::{Sequential, Linear, ReLU, Module};
/// use podar::tensor::Tensor;
///
/// let model = Sequential::new()
///     .add(Linear::new(8, 4))
///     .add(ReLU::new())
///     .add(Linear::new(4, 2));
///
/// let x = Tensor::ones(&[3, 8]);
/// let output = model.forward(&x);
/// assert_eq!(output.shape(), &[3, 2]);
/// ```
pub struct Sequential {
    modules: Vec<Box<dyn Module>>,
    training: bool,
}

impl Sequential {
    /// Create an empty Sequential container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            training: true,
        }
    }

    /// Add a module to the sequence.
    ///
    /// Returns self for method chaining.
    #[allow(clippy::should_implement_trait)]
    #[must_use]
    pub fn add<M: Module + 'static>(mut self, module: M) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Add a module by boxed trait object.
    #[must_use]
    pub fn add_boxed(mut self, module: Box<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// Get a module by index.
    pub fn get(&self, index: usize) -> Option<&dyn Module> {
        self.modules.get(index).map(AsRef::as_ref)
    }

    /// Get a mutable module by index.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut dyn Module> {
        self.modules.get_mut(index).map(|m| &mut **m as &mut dyn Module)
    }

    /// Get the number of modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if the container is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for Sequential {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for Sequential {
    fn forward(&self, input: &Tensor) -> Tensor {
        self.modules
            .iter()
            .fold(input.clone(), |x, module| module.forward(&x))
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.modules.iter().flat_map(|m| m.parameters()).collect()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.modules
            .iter_mut()
            .flat_map(|m| m.parameters_mut())
            .collect()
    }

    fn train(&mut self) {
        self.training = true;
        for module in &mut self.modules {
            module.train();
        }
    }

    fn eval(&mut self) {
        self.training = false;
        for module in &mut self.modules {
            module.eval();
        }
    }

    fn training(&self) -> bool {
        self.training
    }

    fn refresh_caches(&mut self) {
        for module in &mut self.modules {
            module.refresh_caches();
        }
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::Container
    }

    fn named_children(&self) -> Vec<(String, &dyn Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (i.to_string(), &**m as &dyn Module))
            .collect()
    }

    fn named_children_mut(&mut self) -> Vec<(String, &mut dyn Module)> {
        self.modules
            .iter_mut()
            .enumerate()
            .map(|(i, m)| (i.to_string(), &mut **m as &mut dyn Module))
            .collect()
    }

    fn child(&self, name: &str) -> Option<&dyn Module> {
        let index: usize = name.parse().ok()?;
        self.get(index)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut dyn Module> {
        let index: usize = name.parse().ok()?;
        self.get_mut(index)
    }
}

impl std::fmt::Debug for Sequential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequential")
            .field("num_modules", &self.modules.len())
            .field("training", &self.training)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::activation::ReLU;
    use super::super::linear::Linear;
    use super::*;

    #[test]
    fn test_sequential_forward_chain() {
        let model = Sequential::new()
            .add(Linear::with_seed(4, 3, Some(1)))
            .add(ReLU::new())
            .add(Linear::with_seed(3, 2, Some(2)));

        let x = Tensor::ones(&[5, 4]);
        let y = model.forward(&x);
        assert_eq!(y.shape(), &[5, 2]);
    }

    #[test]
    fn test_sequential_named_children() {
        let model = Sequential::new()
            .add(Linear::new(4, 3))
            .add(ReLU::new());

        let children = model.named_children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].0, "0");
        assert_eq!(children[1].0, "1");
        assert_eq!(children[0].1.kind(), ModuleKind::Linear);
        assert_eq!(children[1].1.kind(), ModuleKind::Activation);
    }

    #[test]
    fn test_sequential_child_lookup() {
        let model = Sequential::new().add(Linear::new(4, 3));
        assert!(model.child("0").is_some());
        assert!(model.child("1").is_none());
        assert!(model.child("weight").is_none());
    }

    #[test]
    fn test_sequential_parameters_flattened() {
        let model = Sequential::new()
            .add(Linear::new(4, 3))
            .add(Linear::new(3, 2));

        // (weight + bias) per linear
        assert_eq!(model.parameters().len(), 4);
    }

    #[test]
    fn test_sequential_train_eval_propagates() {
        let mut model = Sequential::new().add(Linear::new(2, 2));
        assert!(model.training());
        model.eval();
        assert!(!model.training());
        model.train();
        assert!(model.training());
    }
}

//! Forward-hook plumbing for module outputs.
//!
//! A forward hook observes a module's output after the module's own
//! computation and may replace it. Registration returns a removable handle
//! so installers can cleanly undo what they added.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::tensor::Tensor;

/// Unique identifier for a registered forward hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl HookId {
    /// Generate a new unique hook ID.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        HookId(COUNTER.fetch_add(1, Ordering::SeqCst))
    }
}

/// Observer of a module's forward output.
///
/// Hooks run in registration order; each receives the previous hook's
/// output (the module's own output for the first hook).
pub trait ForwardHook: Send + Sync {
    /// Transform the module output.
    fn on_output(&self, output: Tensor) -> Tensor;
}

/// Ordered collection of forward hooks attached to a module.
#[derive(Default)]
pub struct HookList {
    entries: Vec<(HookId, Box<dyn ForwardHook>)>,
}

impl HookList {
    /// Create an empty hook list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a hook, returning its removal handle.
    pub fn register(&mut self, hook: Box<dyn ForwardHook>) -> HookId {
        let id = HookId::next();
        self.entries.push((id, hook));
        id
    }

    /// Remove a hook by handle. Returns `false` if the handle is unknown.
    pub fn remove(&mut self, id: HookId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(hook_id, _)| *hook_id != id);
        self.entries.len() != before
    }

    /// Run all hooks over an output in registration order.
    #[must_use]
    pub fn run(&self, output: Tensor) -> Tensor {
        self.entries
            .iter()
            .fold(output, |out, (_, hook)| hook.on_output(out))
    }

    /// Number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for HookList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookList")
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AddOne;
    impl ForwardHook for AddOne {
        fn on_output(&self, output: Tensor) -> Tensor {
            let data: Vec<f32> = output.data().iter().map(|&v| v + 1.0).collect();
            Tensor::new(&data, output.shape())
        }
    }

    struct Double;
    impl ForwardHook for Double {
        fn on_output(&self, output: Tensor) -> Tensor {
            let data: Vec<f32> = output.data().iter().map(|&v| v * 2.0).collect();
            Tensor::new(&data, output.shape())
        }
    }

    #[test]
    fn test_hook_ids_unique() {
        let mut hooks = HookList::new();
        let a = hooks.register(Box::new(AddOne));
        let b = hooks.register(Box::new(AddOne));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let mut hooks = HookList::new();
        hooks.register(Box::new(AddOne));
        hooks.register(Box::new(Double));

        // (1 + 1) * 2 = 4, not 1 * 2 + 1 = 3
        let out = hooks.run(Tensor::from_slice(&[1.0]));
        assert_eq!(out.data(), &[4.0]);
    }

    #[test]
    fn test_remove_hook() {
        let mut hooks = HookList::new();
        let id = hooks.register(Box::new(AddOne));
        assert_eq!(hooks.len(), 1);

        assert!(hooks.remove(id));
        assert!(hooks.is_empty());
        assert!(!hooks.remove(id));

        let out = hooks.run(Tensor::from_slice(&[1.0]));
        assert_eq!(out.data(), &[1.0]);
    }
}

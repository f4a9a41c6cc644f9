//! Dense tensor substrate with a no-gradient scope.
//!
//! The pruning engine only needs a small slice of a tensor library: dense
//! `f32` storage with shape metadata, the handful of ops the host layers
//! compute with, and a scope that disables gradient recording while mask
//! state is mutated. Gradient recording itself is the host training
//! engine's concern; the flag here exists so mask updates can honor the
//! no-recording contract without knowing who is listening.

mod ops;
#[allow(clippy::module_inception)]
mod tensor;

pub use tensor::Tensor;

use std::cell::RefCell;

thread_local! {
    /// Flag to disable gradient tracking (for inference and mask updates).
    static GRAD_ENABLED: RefCell<bool> = const { RefCell::new(true) };
}

/// Execute a closure without gradient tracking.
///
/// Mask recomputation runs inside this scope so that in-place mask and
/// weight mutation is never observed by gradient bookkeeping.
///
/// # Example
///
/// ```
/// use podar::tensor::{is_grad_enabled, no_grad};
///
/// assert!(is_grad_enabled());
/// no_grad(|| {
///     assert!(!is_grad_enabled());
/// });
/// assert!(is_grad_enabled());
/// ```
pub fn no_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    GRAD_ENABLED.with(|enabled| {
        let prev = *enabled.borrow();
        *enabled.borrow_mut() = false;
        let result = f();
        *enabled.borrow_mut() = prev;
        result
    })
}

/// Check if gradient tracking is currently enabled.
#[must_use]
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(|enabled| *enabled.borrow())
}

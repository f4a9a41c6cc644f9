//! Neural network modules: the host model layer for pruning.
//!
//! The nn module is organized around the [`Module`] trait, which defines the
//! interface for all layers. Beyond the familiar forward/parameter surface,
//! the trait exposes what the pruning engine consumes: declaration-order
//! child enumeration, module-kind tags, weight/bias slots, and removable
//! forward hooks.
//!
//! - **Layers**: [`Linear`], [`Conv1d`]
//! - **Normalization**: [`BatchNorm1d`]
//! - **Activations**: [`ReLU`]
//! - **Containers**: [`Sequential`]
//!
//! # Example
//!
//! ```
//! use podar::nn::{Module, Linear, ReLU, Sequential};
//! use podar::tensor::Tensor;
//!
//! let model = Sequential::new()
//!     .add(Linear::new(784, 256))
//!     .add(ReLU::new())
//!     .add(Linear::new(256, 10));
//!
//! let x = Tensor::ones(&[32, 784]);
//! let output = model.forward(&x);
//! assert_eq!(output.shape(), &[32, 10]);
//! ```
//!
//! # References
//!
//! - Paszke, A., et al. (2019). `PyTorch`: An imperative style, high-performance
//!   deep learning library. `NeurIPS`.

mod activation;
mod container;
mod conv;
mod hook;
pub mod init;
mod linear;
mod module;
mod normalization;

pub use activation::ReLU;
pub use container::Sequential;
pub use conv::Conv1d;
pub use hook::{ForwardHook, HookId, HookList};
pub use linear::Linear;
pub use module::{Module, ModuleKind};
pub use normalization::BatchNorm1d;

//! Podar: structured pruning for neural networks in pure Rust.
//!
//! Podar provides the bookkeeping machinery for training-time structured
//! pruning: it binds prunable layers to per-channel masks, installs
//! non-destructive weight transforms plus the forward hooks that keep bias
//! and activation shapes consistent with the mask, and drives the mask
//! update cycle until the pruning decision is baked in permanently.
//!
//! # Toyota Way Principles
//!
//! - **Jidoka** (Quality at Source): configuration errors fail loudly at the
//!   offending call, never downstream
//! - **Poka-Yoke**: masks and module kinds are validated before any weight
//!   is touched
//! - **Andon**: advisory conditions are first-class events, recorded and
//!   surfaced rather than swallowed
//!
//! # Quick Start
//!
//! ```
//! use podar::nn::{Linear, Module, ReLU, Sequential};
//! use podar::prune::{GroupDefaults, MagnitudeChannelPolicy, StructuredPruner};
//!
//! let mut model = Sequential::new()
//!     .add(Linear::with_seed(8, 6, Some(42)))
//!     .add(ReLU::new())
//!     .add(Linear::with_seed(6, 4, Some(43)));
//!
//! let defaults = GroupDefaults::new().with_sparsity(0.5);
//! let mut pruner =
//!     StructuredPruner::with_defaults(Box::new(MagnitudeChannelPolicy::l2()), defaults);
//!
//! // Attach masks and hooks to every supported layer.
//! pruner.prepare(&mut model, None, true).unwrap();
//!
//! // Recompute masks once per optimization step.
//! pruner.step(&mut model).unwrap();
//!
//! // Bake the pruning decision into the stored weights.
//! pruner.squash_mask(&mut model).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`tensor`]: dense tensor substrate with a no-gradient scope
//! - [`nn`]: host model layer (module tree, layers, forward hooks)
//! - [`prune`]: the mask lifecycle engine (path resolver, group registry,
//!   mask attachment, mask update, finalization)
//!
//! # References
//!
//! - Han, S., et al. (2015). Learning both weights and connections for
//!   efficient neural networks. NeurIPS.
//! - Li, H., et al. (2017). Pruning filters for efficient ConvNets. ICLR.
//! - Paszke, A., et al. (2019). PyTorch: An imperative style,
//!   high-performance deep learning library. NeurIPS.

pub mod nn;
pub mod prune;
pub mod tensor;

pub use prune::{PruneError, Result, StructuredPruner};
pub use tensor::Tensor;

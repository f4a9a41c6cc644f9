//! Structured pruning: the mask lifecycle engine.
//!
//! This module binds prunable layers to live channel masks and keeps the
//! rest of the model consistent while masks change:
//!
//! - **Path resolution** ([`module_to_path`], [`path_to_module`]):
//!   bidirectional mapping between modules and their dotted tree positions
//! - **Group registry** ([`GroupSpec`], [`GroupDefaults`], [`ModuleGroup`]):
//!   per-module configuration records, auto-discovered or explicit
//! - **Mask attachment** ([`StructuredPruner::prepare`]): installs the
//!   weight transform and the activation/bias reconciliation hooks
//! - **Mask update** ([`StructuredPruner::step`], injected [`MaskPolicy`]):
//!   recomputes masks in place without touching the model graph
//! - **Finalization** ([`StructuredPruner::squash_mask`]): bakes the pruned
//!   weight in permanently and strips every trace of the bookkeeping
//!
//! # Toyota Way Principles
//!
//! - **Jidoka** (Quality at Source): lifecycle violations stop the line with
//!   typed errors at the offending call
//! - **Andon**: layers that cannot be auto-masked raise recorded advisories
//!   instead of failing silently
//!
//! # References
//!
//! - Han, S., et al. (2015). Learning both weights and connections. `NeurIPS`.
//! - Li, H., et al. (2017). Pruning filters for efficient `ConvNets`. ICLR.

mod andon;
mod error;
mod hooks;
mod magnitude;
mod mask;
mod parametrize;
mod path;
mod policy;
mod pruner;
mod registry;

pub use andon::{AdvisorySeverity, PruneAdvisory};
pub use error::{PruneError, Result};
pub use hooks::{ActivationReconstruction, BiasCorrection};
pub use magnitude::MagnitudeChannelPolicy;
pub use mask::ChannelMask;
pub use parametrize::{structural_view, zeroed_view, PruneMode, PruneState, SharedPruneState};
pub use path::{module_to_path, path_to_module, path_to_module_mut};
pub use policy::{MaskPolicy, MaskUpdateContext};
pub use pruner::StructuredPruner;
pub use registry::{GroupConfig, GroupDefaults, GroupSpec, ModuleGroup};

//! Pruning-specific error types.
//!
//! Provides rich error context for pruning operations following
//! Toyota Way Jidoka (stop on defect) principles: every fatal condition is
//! raised at the offending call, never deferred.

use std::fmt;

use crate::nn::ModuleKind;

/// Result alias for pruning operations.
pub type Result<T> = std::result::Result<T, PruneError>;

/// Pruning operation errors with detailed context.
///
/// # Toyota Way: Andon
/// Errors contain actionable information for diagnosis. Each variant
/// provides specific context to help identify and resolve issues quickly.
#[derive(Debug, Clone)]
pub enum PruneError {
    /// A configured module path does not resolve inside the model tree.
    UnresolvedModule {
        /// Dotted path that failed to resolve
        path: String,
    },

    /// The same module appears more than once in the configuration.
    ///
    /// # Jidoka Principle
    /// Double registration would break the one-group-per-module invariant,
    /// so it is rejected at build time instead of silently accepted.
    DuplicateModule {
        /// Dotted path of the duplicated module
        path: String,
    },

    /// Module kind cannot take the structural pruning path.
    UnsupportedModule {
        /// Dotted path of the offending module
        path: String,
        /// Kind that is outside the supported set
        kind: ModuleKind,
    },

    /// Module exposes no weight tensor to prune.
    NoPrunableWeight {
        /// Dotted path of the offending module
        path: String,
    },

    /// Module kind needs forward hooks but offers no hook support.
    HooksUnavailable {
        /// Dotted path of the offending module
        path: String,
    },

    /// Invalid sparsity target.
    ///
    /// Sparsity must be in range [0.0, 1.0].
    InvalidSparsity {
        /// Provided value
        value: f32,
        /// Constraint description
        constraint: String,
    },

    /// Operation requires a prepared module but none (or no longer one) exists.
    ///
    /// Raised when stepping, manually updating, or squashing a module whose
    /// mask state was never attached or was already finalized.
    NotPrepared {
        /// Dotted path of the module
        path: String,
    },

    /// `prepare` was called while attachments from a previous call are live.
    AlreadyPrepared {
        /// Dotted path of a module that is still attached
        path: String,
    },

    /// Finalization requested with no prepared module groups.
    ///
    /// Raised when `squash_mask` runs before `prepare` or after a previous
    /// squash already consumed the registry.
    NothingPrepared,

    /// A pruned-unit index is outside the mask width.
    UnitOutOfRange {
        /// Dotted path of the module
        path: String,
        /// Offending unit index
        unit: usize,
        /// Mask width
        width: usize,
    },

    /// Policy callback failed to recompute a mask.
    PolicyFailure {
        /// Policy name
        policy: String,
        /// Detailed description
        details: String,
    },
}

impl fmt::Display for PruneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneError::UnresolvedModule { path } => {
                write!(f, "Module path '{path}' does not resolve in the model tree")
            }
            PruneError::DuplicateModule { path } => {
                write!(f, "Module '{path}' is configured more than once")
            }
            PruneError::UnsupportedModule { path, kind } => {
                write!(
                    f,
                    "Module '{path}' of kind {kind} is not supported for structural pruning"
                )
            }
            PruneError::NoPrunableWeight { path } => {
                write!(f, "Module '{path}' has no weight tensor to prune")
            }
            PruneError::HooksUnavailable { path } => {
                write!(f, "Module '{path}' does not support forward hooks")
            }
            PruneError::InvalidSparsity { value, constraint } => {
                write!(f, "Invalid sparsity value {value}: {constraint}")
            }
            PruneError::NotPrepared { path } => {
                write!(
                    f,
                    "Module '{path}' has no attached mask state (never prepared or already squashed)"
                )
            }
            PruneError::AlreadyPrepared { path } => {
                write!(f, "Module '{path}' is already prepared; squash before re-preparing")
            }
            PruneError::NothingPrepared => {
                write!(f, "No prepared module groups (never prepared or already squashed)")
            }
            PruneError::UnitOutOfRange { path, unit, width } => {
                write!(
                    f,
                    "Pruned unit {unit} out of range for module '{path}' with {width} output units"
                )
            }
            PruneError::PolicyFailure { policy, details } => {
                write!(f, "Mask policy '{policy}' failed: {details}")
            }
        }
    }
}

impl std::error::Error for PruneError {}

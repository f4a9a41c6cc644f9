//! The mask-recomputation capability implemented by concrete pruning
//! strategies.
//!
//! The engine never decides *which* units to prune; it hands each group's
//! context to an injected policy and applies whatever the policy wrote into
//! the mask. Policies run inside a no-gradient scope and see the pristine
//! stored weight, whose row count always matches the mask width.

use super::error::Result;
use super::mask::ChannelMask;
use super::registry::GroupConfig;
use crate::nn::{Module, ModuleKind};
use crate::tensor::Tensor;

/// Everything a policy may read while recomputing one module's mask.
///
/// Bookkeeping fields of the module group are deliberately not reachable
/// from here; a policy mutates the mask and nothing else.
pub struct MaskUpdateContext<'a> {
    /// Dotted path of the module.
    pub fqn: &'a str,
    /// Kind tag of the module.
    pub kind: ModuleKind,
    /// The module itself; its live weight is the current transform output.
    pub module: &'a dyn Module,
    /// Pristine stored weight (pre-transform), rows = mask width.
    pub weight: &'a Tensor,
    /// The group's merged configuration.
    pub config: &'a GroupConfig,
}

/// Per-layer mask recomputation strategy.
///
/// # Object Safety
/// This trait is object-safe and injected into the engine as
/// `Box<dyn MaskPolicy>`.
pub trait MaskPolicy: Send + Sync {
    /// Recompute the mask for one module in place.
    fn update_mask(&self, ctx: &MaskUpdateContext<'_>, mask: &mut ChannelMask) -> Result<()>;

    /// Name of this policy for diagnostics.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PruneFirst;
    impl MaskPolicy for PruneFirst {
        fn update_mask(&self, _ctx: &MaskUpdateContext<'_>, mask: &mut ChannelMask) -> Result<()> {
            mask.prune_unit(0);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "prune_first"
        }
    }

    #[test]
    fn test_policy_trait_object_safe() {
        fn accept_dyn(_: &dyn MaskPolicy) {}
        accept_dyn(&PruneFirst);
    }

    #[test]
    fn test_policy_mutates_mask_in_place() {
        use std::collections::BTreeMap;

        let module = crate::nn::Linear::with_seed(2, 3, Some(0));
        let weight = Tensor::zeros(&[3, 2]);
        let config = GroupConfig {
            sparsity: 0.5,
            extra: BTreeMap::new(),
        };
        let ctx = MaskUpdateContext {
            fqn: "0",
            kind: ModuleKind::Linear,
            module: &module,
            weight: &weight,
            config: &config,
        };

        let mut mask = ChannelMask::dense(3);
        PruneFirst.update_mask(&ctx, &mut mask).expect("policy runs");
        assert_eq!(mask.pruned_units(), vec![0]);
    }
}

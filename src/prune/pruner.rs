//! The structured pruning engine: mask attachment, update cycle, and
//! finalization.
//!
//! `StructuredPruner` drives the whole mask lifecycle. `prepare` builds the
//! group registry and installs the weight transform plus forward hooks on
//! every registered module; `step` runs the injected mask policy over the
//! registry; `squash_mask` bakes the transform output into the stored
//! weights and removes every trace of the bookkeeping.
//!
//! # Toyota Way: Jidoka
//! Every lifecycle violation (unsupported kind, missing attachment, double
//! preparation) stops the line with a typed error at the offending call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::andon::{self, PruneAdvisory};
use super::error::{PruneError, Result};
use super::hooks::{ActivationReconstruction, BiasCorrection};
use super::mask::ChannelMask;
use super::parametrize::{PruneMode, PruneState, SharedPruneState};
use super::path::path_to_module_mut;
use super::policy::{MaskPolicy, MaskUpdateContext};
use super::registry::{build_groups, GroupDefaults, GroupSpec, ModuleGroup};
use crate::nn::{HookId, Module};
use crate::tensor::{no_grad, Tensor};

/// Engine-internal record of what was installed on one module.
struct Attachment {
    /// Shared mask state, also held by the installed hooks
    state: SharedPruneState,
    /// Handles of the installed forward hooks, for removal at finalize
    hook_ids: Vec<HookId>,
}

/// Structured pruning engine.
///
/// Owns the module-group registry, the authoritative module-to-attachment
/// mapping, and the injected mask policy. The model itself is never stored;
/// every operation takes the model root as an argument and resolves modules
/// by their registered paths.
///
/// # Example
///
/// ```
/// use podar::nn::{Linear, Sequential};
/// use podar::prune::{MagnitudeChannelPolicy, StructuredPruner};
///
/// let mut model = Sequential::new().add(Linear::with_seed(8, 4, Some(7)));
/// let mut pruner = StructuredPruner::new(Box::new(MagnitudeChannelPolicy::l2()));
///
/// pruner.prepare(&mut model, None, true).unwrap();
/// pruner.step(&mut model).unwrap();
/// pruner.squash_mask(&mut model).unwrap();
/// ```
pub struct StructuredPruner {
    policy: Box<dyn MaskPolicy>,
    defaults: GroupDefaults,
    prune_bias: bool,
    /// Global switch for automatic mask recomputation; `step` is a no-op
    /// while this is false.
    pub enable_mask_update: bool,
    groups: Vec<ModuleGroup>,
    attachments: BTreeMap<String, Attachment>,
    advisories: Vec<PruneAdvisory>,
}

impl StructuredPruner {
    /// Create an engine with the given mask policy and default configuration.
    #[must_use]
    pub fn new(policy: Box<dyn MaskPolicy>) -> Self {
        Self::with_defaults(policy, GroupDefaults::default())
    }

    /// Create an engine with explicit group defaults.
    #[must_use]
    pub fn with_defaults(policy: Box<dyn MaskPolicy>, defaults: GroupDefaults) -> Self {
        Self {
            policy,
            defaults,
            prune_bias: true,
            enable_mask_update: true,
            groups: Vec::new(),
            attachments: BTreeMap::new(),
            advisories: Vec::new(),
        }
    }

    /// Build the group registry and attach mask state to every registered
    /// module.
    ///
    /// The model is modified in place: each registered module's weight is
    /// replaced by the transform output, its bias is detached into the
    /// engine-held state, and the reconciliation hooks are installed.
    ///
    /// With `config == None`, supported layers are auto-discovered.
    /// `prune_bias` selects whether masked units also lose their bias
    /// contribution.
    ///
    /// # Errors
    ///
    /// Fails on configuration errors (unresolved path, unsupported kind,
    /// duplicate module, invalid sparsity) and when attachments from a
    /// previous `prepare` are still live.
    pub fn prepare(
        &mut self,
        model: &mut dyn Module,
        config: Option<&[GroupSpec]>,
        prune_bias: bool,
    ) -> Result<()> {
        if let Some(path) = self.attachments.keys().next() {
            return Err(PruneError::AlreadyPrepared { path: path.clone() });
        }

        self.prune_bias = prune_bias;
        let groups = build_groups(model, config, &self.defaults, prune_bias, &mut self.advisories)?;
        for group in &groups {
            self.attach_group(model, group)?;
        }
        self.groups = groups;
        Ok(())
    }

    /// Run the mask policy over every group in registry order.
    ///
    /// No-op while [`enable_mask_update`](Self::enable_mask_update) is false.
    /// Manual-update kinds are skipped with an advisory; every other group's
    /// mask is recomputed inside a no-gradient scope and the module's weight
    /// is re-materialized from the transform.
    ///
    /// # Errors
    ///
    /// Fails if a group's attachment is missing or its module no longer
    /// resolves, or when the policy itself fails.
    pub fn step(&mut self, model: &mut dyn Module) -> Result<()> {
        if !self.enable_mask_update {
            return Ok(());
        }

        for group in &self.groups {
            if group.kind.needs_manual_update() {
                andon::raise(
                    &mut self.advisories,
                    PruneAdvisory::ManualMaskNotRecomputed {
                        fqn: group.fqn.clone(),
                        kind: group.kind,
                    },
                );
                continue;
            }

            let attachment =
                self.attachments
                    .get(&group.fqn)
                    .ok_or_else(|| PruneError::NotPrepared {
                        path: group.fqn.clone(),
                    })?;

            let module =
                path_to_module_mut(model, &group.fqn).ok_or_else(|| PruneError::UnresolvedModule {
                    path: group.fqn.clone(),
                })?;

            {
                let mut guard = attachment.state.lock().expect("prune state lock poisoned");
                let PruneState {
                    mask,
                    original_weight,
                    ..
                } = &mut *guard;
                let ctx = MaskUpdateContext {
                    fqn: &group.fqn,
                    kind: group.kind,
                    module: &*module,
                    weight: original_weight,
                    config: &group.config,
                };
                no_grad(|| self.policy.update_mask(&ctx, mask))?;
            }

            Self::materialize(module, &attachment.state);
        }

        Ok(())
    }

    /// Merge externally supplied pruned-unit indices into one module's mask.
    ///
    /// Other groups are untouched. This is the only mutation path for
    /// manual-update kinds, and is also available for any prepared module.
    ///
    /// # Errors
    ///
    /// Fails if the module was never prepared (or already squashed), if its
    /// path no longer resolves, or if any index exceeds the mask width.
    pub fn manual_mask_update(
        &mut self,
        model: &mut dyn Module,
        path: &str,
        pruned_units: &[usize],
    ) -> Result<()> {
        let attachment = self
            .attachments
            .get(path)
            .ok_or_else(|| PruneError::NotPrepared {
                path: path.to_string(),
            })?;

        {
            let mut guard = attachment.state.lock().expect("prune state lock poisoned");
            let width = guard.mask.width();
            for &unit in pruned_units {
                if unit >= width {
                    return Err(PruneError::UnitOutOfRange {
                        path: path.to_string(),
                        unit,
                        width,
                    });
                }
            }
            guard.mask.merge_pruned(pruned_units);
        }

        let module =
            path_to_module_mut(model, path).ok_or_else(|| PruneError::UnresolvedModule {
                path: path.to_string(),
            })?;
        Self::materialize(module, &attachment.state);
        Ok(())
    }

    /// Bake the pruning decision in permanently and discard all bookkeeping.
    ///
    /// For each group: the transform's output becomes the module's permanent
    /// weight, a bias consistent with the final shape is restored, the
    /// installed hooks are removed by their recorded handles, and the mask
    /// state is dropped. This is destructive and not reversible.
    ///
    /// # Errors
    ///
    /// Fails if no groups are prepared (never prepared or already squashed)
    /// or if a group's attachment or module is missing.
    pub fn squash_mask(&mut self, model: &mut dyn Module) -> Result<()> {
        if self.groups.is_empty() {
            return Err(PruneError::NothingPrepared);
        }

        for group in &self.groups {
            let attachment =
                self.attachments
                    .remove(&group.fqn)
                    .ok_or_else(|| PruneError::NotPrepared {
                        path: group.fqn.clone(),
                    })?;

            let module =
                path_to_module_mut(model, &group.fqn).ok_or_else(|| PruneError::UnresolvedModule {
                    path: group.fqn.clone(),
                })?;

            let (mut final_weight, final_bias, trainable) = {
                let guard = attachment.state.lock().expect("prune state lock poisoned");
                let weight = guard.masked_weight();
                let bias = guard
                    .bias
                    .as_ref()
                    .map(|b| Self::final_bias(b, &guard.mask, guard.mode, self.prune_bias));
                (weight, bias, guard.original_weight.requires_grad_enabled())
            };

            for id in &attachment.hook_ids {
                module.remove_forward_hook(*id);
            }

            final_weight.requires_grad_(trainable);
            module.set_weight(final_weight);
            if let Some(mut bias) = final_bias {
                bias.requires_grad_(trainable);
                module.set_bias(bias);
            }
            module.refresh_caches();
        }

        self.groups.clear();
        Ok(())
    }

    /// The module groups in registry order.
    #[must_use]
    pub fn groups(&self) -> &[ModuleGroup] {
        &self.groups
    }

    /// Advisory events recorded so far, oldest first.
    #[must_use]
    pub fn advisories(&self) -> &[PruneAdvisory] {
        &self.advisories
    }

    /// Whether bias pruning was requested at preparation.
    #[must_use]
    pub fn prune_bias(&self) -> bool {
        self.prune_bias
    }

    /// Check whether a module currently has attached mask state.
    #[must_use]
    pub fn is_prepared(&self, path: &str) -> bool {
        self.attachments.contains_key(path)
    }

    /// Snapshot of a prepared module's live mask.
    #[must_use]
    pub fn mask(&self, path: &str) -> Option<ChannelMask> {
        self.attachments.get(path).map(|attachment| {
            attachment
                .state
                .lock()
                .expect("prune state lock poisoned")
                .mask
                .clone()
        })
    }

    /// Install mask state and hooks on one module.
    fn attach_group(&mut self, model: &mut dyn Module, group: &ModuleGroup) -> Result<()> {
        let module =
            path_to_module_mut(model, &group.fqn).ok_or_else(|| PruneError::UnresolvedModule {
                path: group.fqn.clone(),
            })?;

        let original_weight = module
            .weight()
            .ok_or_else(|| PruneError::NoPrunableWeight {
                path: group.fqn.clone(),
            })?
            .clone();
        let mask = ChannelMask::dense(original_weight.shape()[0]);

        // Detach bias into the engine-held state so the host optimizer stops
        // treating it as a live parameter while pruning is active.
        let bias = module.take_bias().map(|b| b.detach());

        let state: SharedPruneState = Arc::new(Mutex::new(PruneState {
            mask,
            original_weight,
            bias,
            mode: group.mode,
        }));

        let mut hook_ids = Vec::new();
        if group.mode == PruneMode::Structural {
            let hook = ActivationReconstruction::new(Arc::clone(&state), group.kind);
            hook_ids.push(module.register_forward_hook(Box::new(hook)).ok_or_else(
                || PruneError::HooksUnavailable {
                    path: group.fqn.clone(),
                },
            )?);
        }
        let hook = BiasCorrection::new(Arc::clone(&state), group.kind, self.prune_bias);
        hook_ids.push(module.register_forward_hook(Box::new(hook)).ok_or_else(
            || PruneError::HooksUnavailable {
                path: group.fqn.clone(),
            },
        )?);

        Self::materialize(module, &state);
        self.attachments
            .insert(group.fqn.clone(), Attachment { state, hook_ids });
        Ok(())
    }

    /// Write the transform output into the module's weight slot.
    fn materialize(module: &mut dyn Module, state: &SharedPruneState) {
        let (mut masked, trainable) = {
            let guard = state.lock().expect("prune state lock poisoned");
            (
                guard.masked_weight(),
                guard.original_weight.requires_grad_enabled(),
            )
        };
        masked.requires_grad_(trainable);
        module.set_weight(masked);
        module.refresh_caches();
    }

    /// Bias consistent with the squashed weight shape.
    fn final_bias(
        bias: &Tensor,
        mask: &ChannelMask,
        mode: PruneMode,
        prune_bias: bool,
    ) -> Tensor {
        match mode {
            PruneMode::Structural => {
                let data: Vec<f32> = mask
                    .retained_units()
                    .iter()
                    .map(|&unit| bias.data()[unit])
                    .collect();
                Tensor::from_slice(&data)
            }
            PruneMode::Zeroing => {
                if prune_bias {
                    let data: Vec<f32> = bias
                        .data()
                        .iter()
                        .enumerate()
                        .map(|(unit, &v)| if mask.is_retained(unit) { v } else { 0.0 })
                        .collect();
                    Tensor::from_slice(&data)
                } else {
                    bias.clone()
                }
            }
        }
    }
}

impl fmt::Display for StructuredPruner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StructuredPruner (")?;
        writeln!(f, "\tpolicy: {}", self.policy.name())?;
        for (i, group) in self.groups.iter().enumerate() {
            writeln!(f, "\tModule Group {i}")?;
            writeln!(f, "\t    fqn: {}", group.fqn)?;
            writeln!(f, "\t    kind: {}", group.kind)?;
            writeln!(f, "\t    mode: {}", group.mode)?;
            writeln!(f, "\t    sparsity: {}", group.config.sparsity)?;
            for (key, value) in &group.config.extra {
                writeln!(f, "\t    {key}: {value}")?;
            }
            match self.mask(&group.fqn) {
                Some(mask) => writeln!(
                    f,
                    "\t    mask: {}/{} retained",
                    mask.retained_count(),
                    mask.width()
                )?,
                None => writeln!(f, "\t    mask: detached")?,
            }
        }
        write!(f, ")")
    }
}

impl fmt::Debug for StructuredPruner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredPruner")
            .field("policy", &self.policy.name())
            .field("groups", &self.groups.len())
            .field("attached", &self.attachments.len())
            .field("enable_mask_update", &self.enable_mask_update)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{BatchNorm1d, Linear, ModuleKind, ReLU, Sequential};
    use crate::prune::magnitude::MagnitudeChannelPolicy;

    fn engine(sparsity: f32) -> StructuredPruner {
        StructuredPruner::with_defaults(
            Box::new(MagnitudeChannelPolicy::l2()),
            GroupDefaults::new().with_sparsity(sparsity),
        )
    }

    fn simple_model() -> Sequential {
        Sequential::new()
            .add(Linear::with_seed(8, 6, Some(10)))
            .add(ReLU::new())
            .add(Linear::with_seed(6, 4, Some(11)))
    }

    #[test]
    fn test_prepare_attaches_dense_masks() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");

        assert_eq!(pruner.groups().len(), 2);
        let mask = pruner.mask("0").expect("mask attached");
        assert_eq!(mask.width(), 6);
        assert_eq!(mask.pruned_count(), 0);
        assert!(pruner.is_prepared("2"));
    }

    #[test]
    fn test_prepare_detaches_bias() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");

        let linear = model.get(0).expect("child exists");
        assert!(linear.bias().is_none());
    }

    #[test]
    fn test_prepare_twice_is_fatal() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");

        let err = pruner.prepare(&mut model, None, true).unwrap_err();
        assert!(matches!(err, PruneError::AlreadyPrepared { .. }));
    }

    #[test]
    fn test_step_disabled_changes_nothing() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");

        pruner.enable_mask_update = false;
        pruner.step(&mut model).expect("step");

        assert_eq!(pruner.mask("0").expect("mask").pruned_count(), 0);
        assert_eq!(pruner.mask("2").expect("mask").pruned_count(), 0);
    }

    #[test]
    fn test_step_prunes_to_target_sparsity() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");
        pruner.step(&mut model).expect("step");

        // 6 units at 0.5 -> 3 pruned; 4 units at 0.5 -> 2 pruned
        assert_eq!(pruner.mask("0").expect("mask").pruned_count(), 3);
        assert_eq!(pruner.mask("2").expect("mask").pruned_count(), 2);
    }

    #[test]
    fn test_step_materializes_shrunk_weight() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");
        pruner.step(&mut model).expect("step");

        let weight = model.get(0).expect("child").weight().expect("weight");
        assert_eq!(weight.shape(), &[3, 8]);
    }

    #[test]
    fn test_forward_width_preserved_after_step() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");
        pruner.step(&mut model).expect("step");

        let x = Tensor::ones(&[2, 8]);
        let y = model.forward(&x);
        assert_eq!(y.shape(), &[2, 4]);
    }

    #[test]
    fn test_manual_update_merges_units() {
        let mut model = simple_model();
        let mut pruner = engine(0.0);
        pruner.prepare(&mut model, None, true).expect("prepare");

        pruner
            .manual_mask_update(&mut model, "0", &[1, 4])
            .expect("manual update");

        assert_eq!(pruner.mask("0").expect("mask").pruned_units(), vec![1, 4]);
        // Other group untouched
        assert_eq!(pruner.mask("2").expect("mask").pruned_count(), 0);
    }

    #[test]
    fn test_manual_update_out_of_range_is_fatal() {
        let mut model = simple_model();
        let mut pruner = engine(0.0);
        pruner.prepare(&mut model, None, true).expect("prepare");

        let err = pruner.manual_mask_update(&mut model, "0", &[6]).unwrap_err();
        assert!(matches!(err, PruneError::UnitOutOfRange { width: 6, .. }));
    }

    #[test]
    fn test_manual_update_unprepared_is_fatal() {
        let mut model = simple_model();
        let mut pruner = engine(0.0);
        let err = pruner.manual_mask_update(&mut model, "0", &[0]).unwrap_err();
        assert!(matches!(err, PruneError::NotPrepared { .. }));
    }

    #[test]
    fn test_step_skips_manual_update_layers() {
        let mut model = Sequential::new()
            .add(Linear::with_seed(4, 4, Some(12)))
            .add(BatchNorm1d::new(4));
        let specs = vec![GroupSpec::new("0"), GroupSpec::new("1")];

        let mut pruner = engine(0.5);
        pruner
            .prepare(&mut model, Some(&specs), true)
            .expect("prepare");
        pruner.step(&mut model).expect("step");

        // Linear pruned, BatchNorm untouched but flagged
        assert_eq!(pruner.mask("0").expect("mask").pruned_count(), 2);
        assert_eq!(pruner.mask("1").expect("mask").pruned_count(), 0);
        assert!(pruner.advisories().iter().any(|a| matches!(
            a,
            PruneAdvisory::ManualMaskNotRecomputed { fqn, kind: ModuleKind::BatchNorm1d } if fqn == "1"
        )));
    }

    #[test]
    fn test_squash_restores_untouched_weights() {
        let mut model = simple_model();
        let original_weight = model.get(0).expect("child").weight().expect("weight").clone();
        let original_bias = model.get(0).expect("child").bias().expect("bias").clone();

        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");
        pruner.squash_mask(&mut model).expect("squash");

        let module = model.get(0).expect("child");
        assert_eq!(module.weight().expect("weight").data(), original_weight.data());
        assert_eq!(module.bias().expect("bias").data(), original_bias.data());
        assert!(!pruner.is_prepared("0"));
    }

    #[test]
    fn test_squash_bakes_pruned_weight_and_bias() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");
        pruner.step(&mut model).expect("step");
        pruner.squash_mask(&mut model).expect("squash");

        let module = model.get(0).expect("child");
        assert_eq!(module.weight().expect("weight").shape(), &[3, 8]);
        assert_eq!(module.bias().expect("bias").shape(), &[3]);
    }

    #[test]
    fn test_squash_twice_is_fatal() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");
        pruner.squash_mask(&mut model).expect("squash");

        let err = pruner.squash_mask(&mut model).unwrap_err();
        assert!(matches!(err, PruneError::NothingPrepared));
    }

    #[test]
    fn test_squash_without_prepare_is_fatal() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        let err = pruner.squash_mask(&mut model).unwrap_err();
        assert!(matches!(err, PruneError::NothingPrepared));
    }

    #[test]
    fn test_display_dump_lists_groups() {
        let mut model = simple_model();
        let mut pruner = engine(0.5);
        pruner.prepare(&mut model, None, true).expect("prepare");

        let dump = pruner.to_string();
        assert!(dump.contains("Module Group 0"));
        assert!(dump.contains("fqn: 0"));
        assert!(dump.contains("kind: Linear"));
        assert!(dump.contains("6/6 retained"));
    }
}

//! Module groups: the per-module configuration records of the engine.
//!
//! A module group binds one prunable module (by its dotted path) to the
//! merged configuration the engine and the mask policy read. Groups are
//! created at preparation in config/discovery order and live until
//! finalization.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::andon::{self, PruneAdvisory};
use super::error::{PruneError, Result};
use super::parametrize::PruneMode;
use super::path::path_to_module;
use crate::nn::{Module, ModuleKind};

/// Default configuration applied to every module group.
///
/// Immutable and copied by value into each group at build time, so groups
/// never alias a shared mutable default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDefaults {
    /// Target fraction of output units to prune (0.0 to 1.0).
    pub sparsity: f32,
    /// Policy-specific keys, opaque to the engine.
    #[serde(default)]
    pub extra: BTreeMap<String, f32>,
}

impl Default for GroupDefaults {
    fn default() -> Self {
        Self {
            sparsity: 0.5,
            extra: BTreeMap::new(),
        }
    }
}

impl GroupDefaults {
    /// Create defaults with the standard sparsity target.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default sparsity target.
    #[must_use]
    pub fn with_sparsity(mut self, sparsity: f32) -> Self {
        self.sparsity = sparsity;
        self
    }

    /// Attach a policy-specific key.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: f32) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// One configuration entry: a module named by path plus optional overrides.
///
/// The bare form (`GroupSpec::new("encoder.0")`) names a module and inherits
/// every default; builder methods override individual keys, and overrides
/// win over defaults at build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Dotted path of the module inside the model tree.
    pub module: String,
    /// Per-module sparsity override.
    #[serde(default)]
    pub sparsity: Option<f32>,
    /// Per-module policy-specific keys; merged over the defaults.
    #[serde(default)]
    pub extra: BTreeMap<String, f32>,
}

impl GroupSpec {
    /// Name a module by its dotted path, inheriting all defaults.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            sparsity: None,
            extra: BTreeMap::new(),
        }
    }

    /// Override the sparsity target for this module.
    #[must_use]
    pub fn with_sparsity(mut self, sparsity: f32) -> Self {
        self.sparsity = Some(sparsity);
        self
    }

    /// Attach a policy-specific key for this module.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: f32) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Merged configuration carried by one module group.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Target fraction of output units to prune.
    pub sparsity: f32,
    /// Policy-specific keys, opaque to the engine.
    pub extra: BTreeMap<String, f32>,
}

/// Registry record binding a module to its configuration and mode.
///
/// The `fqn` uniquely identifies the module at registration time; it goes
/// stale if the tree is restructured afterwards. Mask state lives in the
/// engine's attachment record, present exactly while the module is prepared.
#[derive(Debug, Clone)]
pub struct ModuleGroup {
    /// Dotted path of the module inside the model tree.
    pub fqn: String,
    /// Kind tag of the module.
    pub kind: ModuleKind,
    /// Transform flavor selected for the module.
    pub mode: PruneMode,
    /// Merged configuration (defaults overlaid with per-module overrides).
    pub config: GroupConfig,
}

fn validate_sparsity(value: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(PruneError::InvalidSparsity {
            value,
            constraint: "must be between 0.0 and 1.0".to_string(),
        })
    }
}

/// Select the transform flavor for a module kind, or fail for kinds that
/// support neither path.
fn mode_for(path: &str, kind: ModuleKind) -> Result<PruneMode> {
    if kind.needs_zeroing() {
        Ok(PruneMode::Zeroing)
    } else if kind.supports_structural() {
        Ok(PruneMode::Structural)
    } else {
        Err(PruneError::UnsupportedModule {
            path: path.to_string(),
            kind,
        })
    }
}

/// Depth-first discovery of supported modules, in declaration order.
///
/// Needs-manual-update kinds are not traversed into: their channel coupling
/// to a preceding layer cannot be inferred automatically, so their masks
/// must be supplied externally.
fn discover(
    node: &dyn Module,
    prefix: &str,
    prune_bias: bool,
    found: &mut Vec<String>,
    advisories: &mut Vec<PruneAdvisory>,
) {
    for (name, child) in node.named_children() {
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}.{name}")
        };
        let kind = child.kind();
        if kind.supports_structural() {
            found.push(path);
        } else if kind.needs_manual_update() {
            if prune_bias {
                andon::raise(
                    advisories,
                    PruneAdvisory::ManualUpdateLayerSkipped { fqn: path, kind },
                );
            }
        } else {
            discover(child, &path, prune_bias, found, advisories);
        }
    }
}

/// Build the group registry from explicit configuration or auto-discovery.
///
/// Registry order equals config/discovery order. Duplicate module paths are
/// rejected; every entry must resolve, and every resolved kind must support
/// a pruning path.
pub(crate) fn build_groups(
    model: &dyn Module,
    config: Option<&[GroupSpec]>,
    defaults: &GroupDefaults,
    prune_bias: bool,
    advisories: &mut Vec<PruneAdvisory>,
) -> Result<Vec<ModuleGroup>> {
    validate_sparsity(defaults.sparsity)?;

    let specs: Vec<GroupSpec> = match config {
        Some(entries) => entries.to_vec(),
        None => {
            let mut found = Vec::new();
            discover(model, "", prune_bias, &mut found, advisories);
            found.into_iter().map(GroupSpec::new).collect()
        }
    };

    let mut seen = HashSet::new();
    let mut groups = Vec::with_capacity(specs.len());
    for spec in specs {
        let fqn = spec
            .module
            .strip_prefix('.')
            .unwrap_or(&spec.module)
            .to_string();

        let module = path_to_module(model, &fqn).ok_or_else(|| PruneError::UnresolvedModule {
            path: fqn.clone(),
        })?;
        let kind = module.kind();
        let mode = mode_for(&fqn, kind)?;

        if !seen.insert(fqn.clone()) {
            return Err(PruneError::DuplicateModule { path: fqn });
        }

        let sparsity = validate_sparsity(spec.sparsity.unwrap_or(defaults.sparsity))?;
        let mut extra = defaults.extra.clone();
        extra.extend(spec.extra);

        groups.push(ModuleGroup {
            fqn,
            kind,
            mode,
            config: GroupConfig { sparsity, extra },
        });
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{BatchNorm1d, Linear, ReLU, Sequential};

    fn model_with_bn() -> Sequential {
        Sequential::new()
            .add(Linear::with_seed(8, 6, Some(1)))
            .add(ReLU::new())
            .add(BatchNorm1d::new(6))
            .add(Linear::with_seed(6, 4, Some(2)))
    }

    #[test]
    fn test_discovery_registers_supported_kinds_once() {
        let model = model_with_bn();
        let mut advisories = Vec::new();
        let groups = build_groups(&model, None, &GroupDefaults::new(), true, &mut advisories)
            .expect("discovery succeeds");

        let fqns: Vec<&str> = groups.iter().map(|g| g.fqn.as_str()).collect();
        assert_eq!(fqns, vec!["0", "3"]);
        assert!(groups.iter().all(|g| g.kind.supports_structural()));
    }

    #[test]
    fn test_discovery_warns_on_manual_layer_with_bias_pruning() {
        let model = model_with_bn();
        let mut advisories = Vec::new();
        build_groups(&model, None, &GroupDefaults::new(), true, &mut advisories)
            .expect("discovery succeeds");

        assert_eq!(
            advisories,
            vec![PruneAdvisory::ManualUpdateLayerSkipped {
                fqn: "2".to_string(),
                kind: ModuleKind::BatchNorm1d,
            }]
        );
    }

    #[test]
    fn test_discovery_silent_without_bias_pruning() {
        let model = model_with_bn();
        let mut advisories = Vec::new();
        build_groups(&model, None, &GroupDefaults::new(), false, &mut advisories)
            .expect("discovery succeeds");
        assert!(advisories.is_empty());
    }

    #[test]
    fn test_discovery_recurses_into_containers() {
        let inner = Sequential::new().add(Linear::with_seed(4, 4, Some(3)));
        let model = Sequential::new()
            .add(Linear::with_seed(8, 4, Some(4)))
            .add(inner);

        let mut advisories = Vec::new();
        let groups = build_groups(&model, None, &GroupDefaults::new(), true, &mut advisories)
            .expect("discovery succeeds");
        let fqns: Vec<&str> = groups.iter().map(|g| g.fqn.as_str()).collect();
        assert_eq!(fqns, vec!["0", "1.0"]);
    }

    #[test]
    fn test_explicit_config_preserves_order_and_overrides() {
        let model = model_with_bn();
        let defaults = GroupDefaults::new()
            .with_sparsity(0.25)
            .with_extra("window", 8.0);
        let specs = vec![
            GroupSpec::new("3").with_sparsity(0.75),
            GroupSpec::new("0").with_extra("window", 2.0),
        ];

        let mut advisories = Vec::new();
        let groups = build_groups(&model, Some(&specs), &defaults, true, &mut advisories)
            .expect("explicit config succeeds");

        assert_eq!(groups[0].fqn, "3");
        assert!((groups[0].config.sparsity - 0.75).abs() < 1e-6);
        assert_eq!(groups[0].config.extra["window"], 8.0);

        assert_eq!(groups[1].fqn, "0");
        assert!((groups[1].config.sparsity - 0.25).abs() < 1e-6);
        assert_eq!(groups[1].config.extra["window"], 2.0);
    }

    #[test]
    fn test_explicit_batchnorm_takes_zeroing_path() {
        let model = model_with_bn();
        let specs = vec![GroupSpec::new("2")];
        let mut advisories = Vec::new();
        let groups = build_groups(&model, Some(&specs), &GroupDefaults::new(), true, &mut advisories)
            .expect("explicit bn config succeeds");
        assert_eq!(groups[0].mode, PruneMode::Zeroing);
    }

    #[test]
    fn test_unresolved_path_is_fatal() {
        let model = model_with_bn();
        let specs = vec![GroupSpec::new("9")];
        let mut advisories = Vec::new();
        let err = build_groups(&model, Some(&specs), &GroupDefaults::new(), true, &mut advisories)
            .unwrap_err();
        assert!(matches!(err, PruneError::UnresolvedModule { .. }));
    }

    #[test]
    fn test_unsupported_kind_is_fatal() {
        let model = model_with_bn();
        let specs = vec![GroupSpec::new("1")]; // the ReLU
        let mut advisories = Vec::new();
        let err = build_groups(&model, Some(&specs), &GroupDefaults::new(), true, &mut advisories)
            .unwrap_err();
        assert!(matches!(err, PruneError::UnsupportedModule { .. }));
    }

    #[test]
    fn test_duplicate_module_is_fatal() {
        let model = model_with_bn();
        let specs = vec![GroupSpec::new("0"), GroupSpec::new("0")];
        let mut advisories = Vec::new();
        let err = build_groups(&model, Some(&specs), &GroupDefaults::new(), true, &mut advisories)
            .unwrap_err();
        assert!(matches!(err, PruneError::DuplicateModule { .. }));
    }

    #[test]
    fn test_invalid_sparsity_is_fatal() {
        let model = model_with_bn();
        let specs = vec![GroupSpec::new("0").with_sparsity(1.5)];
        let mut advisories = Vec::new();
        let err = build_groups(&model, Some(&specs), &GroupDefaults::new(), true, &mut advisories)
            .unwrap_err();
        assert!(matches!(err, PruneError::InvalidSparsity { .. }));
    }

    #[test]
    fn test_leading_separator_stripped() {
        let model = model_with_bn();
        let specs = vec![GroupSpec::new(".0")];
        let mut advisories = Vec::new();
        let groups = build_groups(&model, Some(&specs), &GroupDefaults::new(), true, &mut advisories)
            .expect("leading dot tolerated");
        assert_eq!(groups[0].fqn, "0");
    }

    #[test]
    fn test_group_spec_deserializes_from_json() {
        let spec: GroupSpec =
            serde_json::from_str(r#"{"module": "encoder.0", "sparsity": 0.8}"#)
                .expect("valid spec json");
        assert_eq!(spec.module, "encoder.0");
        assert_eq!(spec.sparsity, Some(0.8));
        assert!(spec.extra.is_empty());
    }
}

//! Non-destructive weight transforms over a channel mask.
//!
//! A transform derives the weight the computation actually uses from the
//! pristine stored weight plus the live mask, without destroying the stored
//! value. The structural transform physically removes pruned rows; the
//! zeroing transform blanks them in place for layers whose shape is coupled
//! to a neighbor. Finalization keeps the transform's last output as the
//! permanent weight.

use std::sync::{Arc, Mutex};

use super::mask::ChannelMask;
use crate::tensor::Tensor;

/// How a module's pruned units are realized in its weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneMode {
    /// Pruned rows are physically removed; the weight shrinks.
    Structural,
    /// Pruned rows are zeroed in place; the shape is preserved.
    Zeroing,
}

impl std::fmt::Display for PruneMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PruneMode::Structural => write!(f, "Structural"),
            PruneMode::Zeroing => write!(f, "Zeroing"),
        }
    }
}

/// Live mask state for one prepared module.
///
/// This is the single canonical home of a module's mask, its pristine weight,
/// and its detached bias. The attachment engine owns one record per prepared
/// module and shares it with the installed forward hooks.
#[derive(Debug)]
pub struct PruneState {
    /// Live channel mask, width equals the pristine weight's row count
    pub mask: ChannelMask,
    /// Pristine weight as stored before preparation
    pub original_weight: Tensor,
    /// Detached bias (non-trainable), if the module owned one
    pub bias: Option<Tensor>,
    /// Transform flavor for this module
    pub mode: PruneMode,
}

/// Shared handle to a module's live mask state.
pub type SharedPruneState = Arc<Mutex<PruneState>>;

impl PruneState {
    /// Compute the transform output for the current mask.
    #[must_use]
    pub fn masked_weight(&self) -> Tensor {
        match self.mode {
            PruneMode::Structural => structural_view(&self.original_weight, &self.mask),
            PruneMode::Zeroing => zeroed_view(&self.original_weight, &self.mask),
        }
    }
}

/// Remove pruned rows along the weight's leading (output-unit) axis.
///
/// # Panics
///
/// Panics if the mask width differs from the weight's leading dimension.
#[must_use]
pub fn structural_view(weight: &Tensor, mask: &ChannelMask) -> Tensor {
    let width = weight.shape()[0];
    assert_eq!(
        mask.width(),
        width,
        "mask width {} does not cover weight rows {}",
        mask.width(),
        width
    );

    let row_stride = if width == 0 { 0 } else { weight.numel() / width };
    let retained = mask.retained_units();

    let mut data = Vec::with_capacity(retained.len() * row_stride);
    for &unit in &retained {
        let start = unit * row_stride;
        data.extend_from_slice(&weight.data()[start..start + row_stride]);
    }

    let mut shape = weight.shape().to_vec();
    shape[0] = retained.len();
    Tensor::new(&data, &shape)
}

/// Zero pruned rows along the weight's leading axis, preserving shape.
///
/// # Panics
///
/// Panics if the mask width differs from the weight's leading dimension.
#[must_use]
pub fn zeroed_view(weight: &Tensor, mask: &ChannelMask) -> Tensor {
    let width = weight.shape()[0];
    assert_eq!(
        mask.width(),
        width,
        "mask width {} does not cover weight rows {}",
        mask.width(),
        width
    );

    let row_stride = if width == 0 { 0 } else { weight.numel() / width };
    let mut data = weight.data().to_vec();
    for unit in mask.pruned_units() {
        for value in &mut data[unit * row_stride..(unit + 1) * row_stride] {
            *value = 0.0;
        }
    }

    Tensor::new(&data, weight.shape())
}

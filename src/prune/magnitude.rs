//! Magnitude-based channel mask policy.
//!
//! Uses per-unit weight norms as importance and prunes the lowest-norm
//! fraction of output units, per the group's `sparsity` key.
//!
//! # References
//! - Han, S., et al. (2015). Learning both weights and connections. `NeurIPS`.
//! - Li, H., et al. (2017). Pruning filters for efficient `ConvNets`. ICLR.

use super::error::Result;
use super::mask::ChannelMask;
use super::policy::{MaskPolicy, MaskUpdateContext};

/// Norm used to score output units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NormKind {
    L1,
    L2,
}

/// Channel policy ranking output units by weight-row magnitude.
#[derive(Debug, Clone)]
pub struct MagnitudeChannelPolicy {
    norm: NormKind,
}

impl MagnitudeChannelPolicy {
    /// Create a magnitude policy with L2 norm.
    #[must_use]
    pub fn new() -> Self {
        Self::l2()
    }

    /// Create a magnitude policy with L1 norm.
    #[must_use]
    pub fn l1() -> Self {
        Self {
            norm: NormKind::L1,
        }
    }

    /// Create a magnitude policy with L2 norm.
    #[must_use]
    pub fn l2() -> Self {
        Self {
            norm: NormKind::L2,
        }
    }
}

impl Default for MagnitudeChannelPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl MaskPolicy for MagnitudeChannelPolicy {
    fn update_mask(&self, ctx: &MaskUpdateContext<'_>, mask: &mut ChannelMask) -> Result<()> {
        let width = mask.width();
        if width == 0 {
            return Ok(());
        }

        let row_stride = ctx.weight.numel() / width;
        let data = ctx.weight.data();

        // Score each output unit by its row norm
        let mut scores: Vec<(usize, f32)> = (0..width)
            .map(|unit| {
                let row = &data[unit * row_stride..(unit + 1) * row_stride];
                let score = match self.norm {
                    NormKind::L1 => row.iter().map(|v| v.abs()).sum(),
                    NormKind::L2 => row.iter().map(|v| v * v).sum::<f32>().sqrt(),
                };
                (unit, score)
            })
            .collect();

        scores.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        // Recompute the whole mask: lowest-importance units pruned
        let num_prune = (width as f32 * ctx.config.sparsity) as usize;
        mask.retain_all();
        for &(unit, _) in scores.iter().take(num_prune) {
            mask.prune_unit(unit);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        match self.norm {
            NormKind::L1 => "magnitude_l1",
            NormKind::L2 => "magnitude_l2",
        }
    }
}

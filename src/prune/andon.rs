//! Andon mechanism for advisory pruning conditions (Toyota Jidoka).
//!
//! Not every irregularity stops the line: some layers legitimately cannot be
//! auto-masked and must be flagged rather than failed. Advisory events are
//! first-class values, recorded on the engine for inspection and echoed to
//! stderr, named after the Toyota Production System's Andon cord.

use std::fmt;

use crate::nn::ModuleKind;

/// Alert severity levels for Andon events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvisorySeverity {
    /// Informational - no action required.
    Info,
    /// Warning - potential issue, operation continues.
    Warning,
}

impl fmt::Display for AdvisorySeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// Advisory conditions raised during the mask lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PruneAdvisory {
    /// Auto-discovery skipped a layer whose mask must be supplied externally.
    ///
    /// Raised only when bias pruning is requested, since that is when the
    /// missing channel coupling actually changes the output.
    ManualUpdateLayerSkipped {
        /// Dotted path of the skipped layer
        fqn: String,
        /// Kind of the skipped layer
        kind: ModuleKind,
    },
    /// `step` left a registered manual-update layer's mask untouched.
    ManualMaskNotRecomputed {
        /// Dotted path of the layer
        fqn: String,
        /// Kind of the layer
        kind: ModuleKind,
    },
}

impl PruneAdvisory {
    /// Get the severity of this advisory.
    #[must_use]
    pub fn severity(&self) -> AdvisorySeverity {
        match self {
            Self::ManualUpdateLayerSkipped { .. } => AdvisorySeverity::Warning,
            Self::ManualMaskNotRecomputed { .. } => AdvisorySeverity::Warning,
        }
    }
}

impl fmt::Display for PruneAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ManualUpdateLayerSkipped { fqn, kind } => {
                write!(
                    f,
                    "ANDON: {kind} layer '{fqn}' needs externally supplied pruned outputs; skipped by discovery"
                )
            }
            Self::ManualMaskNotRecomputed { fqn, kind } => {
                write!(
                    f,
                    "ANDON: mask of {kind} layer '{fqn}' must be updated manually; left untouched"
                )
            }
        }
    }
}

/// Record an advisory and echo it to stderr.
pub(crate) fn raise(log: &mut Vec<PruneAdvisory>, advisory: PruneAdvisory) {
    eprintln!("[ANDON {}] {}", advisory.severity(), advisory);
    log.push(advisory);
}

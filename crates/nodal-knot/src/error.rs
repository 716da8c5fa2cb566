//! Error kinds shared by the pipeline stages.
//!
//! Recovery policy
//! - `DegenerateView` is local: view search drops the candidate and moves on.
//! - `ExhaustedSearch` reaches the caller, who should supply a manual view.
//! - `ManualViewRequired` means no automatic search applies to the graph.
//! - `InvalidDiagram` and `MalformedVolume` abort the current evaluation or build.
//!
//! A failed minor search is not an error; see `minor::MinorOutcome`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnotError {
    #[error("degenerate view: {reason}")]
    DegenerateView { reason: String },
    #[error("no valid view found after {attempts} attempts; supply a manual view")]
    ExhaustedSearch { attempts: usize },
    #[error("graph has a node of degree {max_degree}; supply a manual view or candidate list")]
    ManualViewRequired { max_degree: usize },
    #[error("invalid planar diagram code: {reason}")]
    InvalidDiagram { reason: String },
    #[error("malformed volume: {reason}")]
    MalformedVolume { reason: String },
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl KnotError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateView {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_diagram(reason: impl Into<String>) -> Self {
        Self::InvalidDiagram {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedVolume {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// True for errors the view search absorbs by trying another rotation.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateView { .. })
    }
}

pub type Result<T, E = KnotError> = std::result::Result<T, E>;

use std::time::Duration;

use thiserror::Error;

use crate::host::{DocumentError, Notification, RenderError};
use crate::reflow::geometry::GeometryError;
use crate::reflow::splitter::{OracleError, SplitError};

/// Shown for failures the user cannot act on. The document is never left half-written.
const GENERIC_FAILURE: &str = "Text wrap failed. The document was not changed.";

/// The selection does not describe one text layer next to one obstacle.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Select exactly two layers: one text layer and one image (selected {0}).")]
    WrongCount(usize),

    #[error("Select exactly one text layer and one image or shape.")]
    TextCount(usize),

    #[error("The text layer must be inside a frame or page.")]
    Detached,

    #[error("Both selected layers need visible bounds.")]
    MissingBounds,

    #[error("The selected text layer has no readable text.")]
    MissingText,
}

/// Operation-scoped failure of a wrap-text pass. Every variant leaves the document as it was.
#[derive(Debug, Error)]
pub enum WrapError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Font load error: {0}")]
    FontLoad(#[from] RenderError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Search cancelled after {probes} probes")]
    Cancelled { probes: u32 },

    #[error("Search exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Search exceeded its limit of {limit} probes")]
    ProbeLimit { limit: u32 },

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),
}

impl From<SplitError> for WrapError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::Oracle(e) => WrapError::Oracle(e),
            SplitError::Cancelled { probes } => WrapError::Cancelled { probes },
            SplitError::DeadlineExceeded(d) => WrapError::DeadlineExceeded(d),
            SplitError::ProbeLimit { limit } => WrapError::ProbeLimit { limit },
        }
    }
}

impl WrapError {
    /// Maps the error to the message shown in the editor, logging internal detail.
    pub fn notification(&self) -> Notification {
        let message = match self {
            WrapError::Selection(e) => e.to_string(),
            WrapError::Geometry(e) => {
                tracing::warn!("Geometry error: {e}");
                "Not enough room beside the image. Reduce the spacing or move the layers."
                    .to_string()
            }
            WrapError::FontLoad(e) => {
                tracing::error!("Font load error: {e}");
                "Could not load the text layer's font.".to_string()
            }
            WrapError::Oracle(e) => {
                tracing::error!("Oracle error: {e}");
                GENERIC_FAILURE.to_string()
            }
            WrapError::Cancelled { probes } => {
                tracing::info!(probes, "Wrap cancelled");
                "Text wrap cancelled.".to_string()
            }
            WrapError::DeadlineExceeded(_) | WrapError::ProbeLimit { .. } => {
                tracing::error!("Search aborted: {self}");
                GENERIC_FAILURE.to_string()
            }
            WrapError::Document(e) => {
                tracing::error!("Document error: {e}");
                GENERIC_FAILURE.to_string()
            }
        };

        Notification::Error(message)
    }
}

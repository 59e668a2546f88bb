//! Fragment Composer: builds the side and continuation fragments from a split.
//!
//! Both fragments inherit font, size, line height and fills verbatim from the source
//! run. Their character ranges are `[0, split)` and `[split, len)`, so concatenating
//! them always reproduces the original text exactly.

use serde::Serialize;

use crate::host::{TextAutoResize, TextRun, TextStyle, VerticalAlign};
use crate::reflow::geometry::{BoundingBox, ColumnSpec, ContinuationGeometry};

/// Initial height of the continuation box; auto-height sizing grows it to fit.
const CONTINUATION_SEED_HEIGHT: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentRole {
    Side,
    Continuation,
}

/// A text layer to be created, fully described before any document write happens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub role: FragmentRole,
    pub characters: String,
    /// Parent-local box.
    pub bounds: BoundingBox,
    pub style: TextStyle,
    pub auto_resize: TextAutoResize,
    pub align: VerticalAlign,
}

impl Fragment {
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// Builds `(side, continuation)` for `original` split at char index `split_index`.
///
/// `column` and `continuation` must already be in the parent's coordinate frame.
/// An index past the end puts the whole text in the side fragment.
pub fn compose(
    original: &TextRun,
    split_index: usize,
    column: &ColumnSpec,
    continuation: &ContinuationGeometry,
) -> (Fragment, Fragment) {
    let (head, tail) = split_at_char(&original.characters, split_index);

    let side = Fragment {
        role: FragmentRole::Side,
        characters: head.to_string(),
        bounds: BoundingBox::new(column.x, column.y, column.width, column.height_limit),
        style: original.style.clone(),
        auto_resize: TextAutoResize::Height,
        align: VerticalAlign::Top,
    };

    let rest = Fragment {
        role: FragmentRole::Continuation,
        characters: tail.to_string(),
        bounds: BoundingBox::new(
            continuation.x,
            continuation.y,
            continuation.width,
            CONTINUATION_SEED_HEIGHT,
        ),
        style: original.style.clone(),
        auto_resize: TextAutoResize::Height,
        align: VerticalAlign::Top,
    };

    (side, rest)
}

fn split_at_char(text: &str, index: usize) -> (&str, &str) {
    let byte = text
        .char_indices()
        .nth(index)
        .map(|(b, _)| b)
        .unwrap_or(text.len());
    text.split_at(byte)
}

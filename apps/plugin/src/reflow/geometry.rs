//! Geometry Resolver: computes where the side column lives beside an obstacle.
//!
//! All boxes here are absolute document coordinates. The orchestrator translates the
//! results into the text layer's parent frame before anything is written back.
//!
//! # Orientation
//! The obstacle is on the left when its horizontal center is left of the text block's
//! center, otherwise on the right. The column always spans the remaining width of the
//! text block on the far side of the obstacle, minus the padding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_WRAP_HEIGHT_PERCENT: i64 = 1;
pub const MAX_WRAP_HEIGHT_PERCENT: i64 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        BoundingBox {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// True if any side is non-positive or any coordinate is not finite.
    pub fn is_degenerate(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        !finite || self.width <= 0.0 || self.height <= 0.0
    }

    pub fn translated(self, dx: f64, dy: f64) -> Self {
        BoundingBox {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// Which side of the text block the obstacle sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleSide {
    Left,
    Right,
}

/// The region beside the obstacle the side fragment must fit into.
///
/// `height_limit` is the obstacle height scaled by the wrap-height percentage; the side
/// fragment is considered overflowed once its rendered height exceeds it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height_limit: f64,
    pub side: ObstacleSide,
}

impl ColumnSpec {
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        ColumnSpec {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

/// Where the continuation fragment starts: below the wrap zone, full text width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContinuationGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
}

impl ContinuationGeometry {
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        ContinuationGeometry {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{which} bounding box is degenerate")]
    DegenerateBox { which: &'static str },

    #[error("padding must be a non-negative number, got {0}")]
    InvalidPadding(f64),

    #[error("no room beside the obstacle: column width would be {width}")]
    NonPositiveWidth { width: f64 },

    #[error("wrap zone height would be {height}")]
    NonPositiveHeightLimit { height: f64 },
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Clamps a wrap-height percentage into `[1, 100]`. Out-of-range values are not errors.
pub fn clamp_wrap_height_percent(percent: i64) -> i64 {
    percent.clamp(MIN_WRAP_HEIGHT_PERCENT, MAX_WRAP_HEIGHT_PERCENT)
}

/// Resolves the side column for `text` wrapping around `obstacle`.
///
/// Left obstacle: `width = text.width - (obstacle.x - text.x) - obstacle.width - padding`.
/// Right obstacle: `width = (obstacle.x - text.x) - padding`.
/// The column top is the obstacle top.
pub fn resolve_column(
    obstacle: &BoundingBox,
    text: &BoundingBox,
    padding: f64,
    wrap_height_percent: i64,
) -> Result<ColumnSpec, GeometryError> {
    if obstacle.is_degenerate() {
        return Err(GeometryError::DegenerateBox { which: "obstacle" });
    }
    if text.is_degenerate() {
        return Err(GeometryError::DegenerateBox { which: "text" });
    }
    if !padding.is_finite() || padding < 0.0 {
        return Err(GeometryError::InvalidPadding(padding));
    }

    let percent = clamp_wrap_height_percent(wrap_height_percent);
    let height_limit = obstacle.height * (percent as f64 / 100.0);
    if height_limit <= 0.0 {
        return Err(GeometryError::NonPositiveHeightLimit {
            height: height_limit,
        });
    }

    let offset_x = obstacle.x - text.x;
    let (side, x, width) = if obstacle.center_x() < text.center_x() {
        (
            ObstacleSide::Left,
            obstacle.right() + padding,
            text.width - offset_x - obstacle.width - padding,
        )
    } else {
        (ObstacleSide::Right, text.x, offset_x - padding)
    };

    if width <= 0.0 {
        return Err(GeometryError::NonPositiveWidth { width });
    }

    Ok(ColumnSpec {
        x,
        y: obstacle.y,
        width,
        height_limit,
        side,
    })
}

/// The continuation starts at the text block's left edge, `padding` below the wrap zone.
pub fn resolve_continuation(
    text: &BoundingBox,
    column: &ColumnSpec,
    padding: f64,
) -> ContinuationGeometry {
    ContinuationGeometry {
        x: text.x,
        y: column.y + column.height_limit + padding,
        width: text.width,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

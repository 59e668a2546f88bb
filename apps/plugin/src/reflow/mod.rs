// Text reflow around an obstacle.
// Geometry resolves the side column, the splitter searches for the split through the
// measurement oracle, the composer builds fragments, and the orchestrator commits them.

pub mod composer;
pub mod geometry;
pub mod oracle;
pub mod orchestrator;
pub mod splitter;

// Re-export the public API consumed by the host binary and message layer.
pub use geometry::{resolve_column, BoundingBox, ColumnSpec, ObstacleSide};
pub use orchestrator::{
    ReflowOutcome, ReflowReport, ReflowState, WrapOptions, WrapText, DEFAULT_SPACING,
    DEFAULT_WRAP_HEIGHT_PERCENT,
};
pub use splitter::{find_split, MeasurementOracle, OracleError, SearchOptions, Split};

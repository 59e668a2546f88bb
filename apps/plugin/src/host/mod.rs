// Host collaborators: the editor surfaces the reflow engine reads from and writes to.
// The engine never owns the document. Every operation receives it as `&mut impl Document`
// and a `Renderer` that answers height queries.

pub mod metrics;
pub mod scene;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::reflow::geometry::BoundingBox;
use crate::reflow::splitter::OracleError;

pub use metrics::MetricRenderer;
pub use scene::Scene;

// ────────────────────────────────────────────────────────────────────────────
// Identifiers and node kinds
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    pub fn new() -> Self {
        NodeId(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Layer types the engine distinguishes. Anything that is not `Text` can act as an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Page,
    Frame,
    Group,
    Text,
    Rectangle,
    Ellipse,
    Vector,
}

impl NodeKind {
    pub fn is_text(self) -> bool {
        self == NodeKind::Text
    }

    /// True for kinds that may hold children.
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Page | NodeKind::Frame | NodeKind::Group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Text style
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl Default for FontName {
    fn default() -> Self {
        FontName {
            family: "Inter".to_string(),
            style: "Regular".to_string(),
        }
    }
}

impl fmt::Display for FontName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// Line spacing as the host stores it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineHeight {
    #[default]
    Auto,
    Pixels(f64),
    Percent(f64),
}

/// `Auto` line height as a multiple of the font size.
const AUTO_LINE_HEIGHT: f64 = 1.2;

impl LineHeight {
    /// Resolves the line height to pixels for a given font size.
    pub fn to_pixels(self, font_size: f64) -> f64 {
        match self {
            LineHeight::Auto => font_size * AUTO_LINE_HEIGHT,
            LineHeight::Pixels(px) => px,
            LineHeight::Percent(pct) => font_size * pct / 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Paint {
    Solid {
        color: Rgb,
        #[serde(default = "full_opacity")]
        opacity: f64,
    },
    Image {
        image_hash: String,
    },
}

fn full_opacity() -> f64 {
    1.0
}

/// Visual attributes carried verbatim from a source text layer to its fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub font: FontName,
    pub font_size: f64,
    #[serde(default)]
    pub line_height: LineHeight,
    #[serde(default)]
    pub fills: Vec<Paint>,
}

impl Default for TextStyle {
    fn default() -> Self {
        TextStyle {
            font: FontName::default(),
            font_size: 12.0,
            line_height: LineHeight::Auto,
            fills: vec![Paint::Solid {
                color: Rgb {
                    r: 0.0,
                    g: 0.0,
                    b: 0.0,
                },
                opacity: 1.0,
            }],
        }
    }
}

/// The characters of a text layer plus its style. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextRun {
    pub characters: String,
    #[serde(default)]
    pub style: TextStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextAutoResize {
    #[default]
    None,
    Height,
    WidthAndHeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

// ────────────────────────────────────────────────────────────────────────────
// Selection and document
// ────────────────────────────────────────────────────────────────────────────

/// One entry of the current selection as the host reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedElement {
    pub id: NodeId,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Absolute bounding box. `None` for layers the host cannot measure.
    pub bounds: Option<BoundingBox>,
    /// Position relative to the parent container.
    pub position: Point,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocumentError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("node {0} is not a text layer")]
    NotText(NodeId),

    #[error("node {0} cannot hold children")]
    NotContainer(NodeId),

    #[error("invalid box for node {node}: {width}x{height}")]
    InvalidBox {
        node: NodeId,
        width: f64,
        height: f64,
    },
}

/// Document mutation and selection queries. All calls are synchronous.
pub trait Document {
    fn selection(&self) -> Vec<SelectedElement>;

    fn text_run(&self, node: NodeId) -> Option<TextRun>;

    /// Creates an empty text layer appended as the last child of `parent`.
    fn create_text_node(&mut self, parent: NodeId) -> Result<NodeId, DocumentError>;

    fn set_text(&mut self, node: NodeId, characters: &str) -> Result<(), DocumentError>;

    /// Sets position and size in the parent's coordinate frame.
    fn set_box(&mut self, node: NodeId, bounds: BoundingBox) -> Result<(), DocumentError>;

    fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<(), DocumentError>;

    fn set_style(&mut self, node: NodeId, style: &TextStyle) -> Result<(), DocumentError>;

    fn set_sizing(
        &mut self,
        node: NodeId,
        auto_resize: TextAutoResize,
        align: VerticalAlign,
    ) -> Result<(), DocumentError>;

    fn remove_node(&mut self, node: NodeId) -> Result<(), DocumentError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Renderer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("font {0} is not available")]
    FontUnavailable(FontName),
}

/// The host's layout engine. Every call may run a full layout pass, so callers
/// should keep the number of `measure` calls small.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn load_font(&self, font: &FontName) -> Result<(), RenderError>;

    /// Rendered height of `text` laid out at `width` with top-aligned auto-height sizing.
    async fn measure(&self, text: &str, style: &TextStyle, width: f64) -> Result<f64, OracleError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Notifications
// ────────────────────────────────────────────────────────────────────────────

/// User-facing outcome of a command. No structured codes beyond success/failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notification {
    Success(String),
    Error(String),
}

impl Notification {
    pub fn is_success(&self) -> bool {
        matches!(self, Notification::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Notification::Success(msg) | Notification::Error(msg) => msg,
        }
    }
}

//! In-memory scene: a serializable stand-in for the editor's document.
//!
//! Nodes store positions relative to their parent, the way the editor does. Absolute
//! bounds are derived by walking up to the page, which sits at the origin and has no
//! bounds of its own. Child order is insertion order.

use serde::{Deserialize, Serialize};

use crate::host::{
    Document, DocumentError, NodeId, NodeKind, Point, SelectedElement, TextAutoResize, TextRun,
    TextStyle, VerticalAlign,
};
use crate::reflow::geometry::BoundingBox;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: NodeId,
    #[serde(default)]
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextRun>,
    #[serde(default)]
    pub auto_resize: TextAutoResize,
    #[serde(default)]
    pub align: VerticalAlign,
}

fn visible_by_default() -> bool {
    true
}

impl SceneNode {
    pub fn new(kind: NodeKind) -> Self {
        SceneNode {
            id: NodeId::new(),
            name: String::new(),
            kind,
            parent: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            visible: true,
            text: None,
            auto_resize: TextAutoResize::None,
            align: VerticalAlign::Top,
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn inside(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_text(mut self, run: TextRun) -> Self {
        self.text = Some(run);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub selection: Vec<NodeId>,
}

// ────────────────────────────────────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────────────────────────────────────

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: SceneNode) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        id
    }

    pub fn select(&mut self, ids: &[NodeId]) {
        self.selection = ids.to_vec();
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, DocumentError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(DocumentError::NodeNotFound(id))
    }

    fn text_node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, DocumentError> {
        let node = self.node_mut(id)?;
        if node.kind.is_text() {
            Ok(node)
        } else {
            Err(DocumentError::NotText(id))
        }
    }

    pub fn children(&self, parent: NodeId) -> impl Iterator<Item = &SceneNode> + '_ {
        self.nodes.iter().filter(move |n| n.parent == Some(parent))
    }

    /// Absolute position of a node's top-left corner. Pages sit at the origin.
    pub fn absolute_origin(&self, id: NodeId) -> Option<Point> {
        let mut origin = Point::default();
        let mut current = self.node(id)?;
        // A well-formed scene is a tree; the step cap guards against parent cycles.
        for _ in 0..=self.nodes.len() {
            if current.kind == NodeKind::Page {
                return Some(origin);
            }
            origin.x += current.x;
            origin.y += current.y;
            match current.parent {
                Some(parent) => current = self.node(parent)?,
                None => return Some(origin),
            }
        }
        None
    }

    pub fn absolute_bounds(&self, id: NodeId) -> Option<BoundingBox> {
        let node = self.node(id)?;
        if node.kind == NodeKind::Page {
            return None;
        }
        let origin = self.absolute_origin(id)?;
        Some(BoundingBox::new(origin.x, origin.y, node.width, node.height))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document
// ────────────────────────────────────────────────────────────────────────────

impl Document for Scene {
    fn selection(&self) -> Vec<SelectedElement> {
        self.selection
            .iter()
            .filter_map(|&id| self.node(id))
            .map(|n| SelectedElement {
                id: n.id,
                kind: n.kind,
                parent: n.parent,
                bounds: self.absolute_bounds(n.id),
                position: Point { x: n.x, y: n.y },
            })
            .collect()
    }

    fn text_run(&self, node: NodeId) -> Option<TextRun> {
        self.node(node)
            .filter(|n| n.kind.is_text())
            .and_then(|n| n.text.clone())
    }

    fn create_text_node(&mut self, parent: NodeId) -> Result<NodeId, DocumentError> {
        let container = self
            .node(parent)
            .ok_or(DocumentError::NodeNotFound(parent))?;
        if !container.kind.is_container() {
            return Err(DocumentError::NotContainer(parent));
        }
        let node = SceneNode::new(NodeKind::Text)
            .inside(parent)
            .with_text(TextRun::default());
        Ok(self.insert(node))
    }

    fn set_text(&mut self, node: NodeId, characters: &str) -> Result<(), DocumentError> {
        let target = self.text_node_mut(node)?;
        target
            .text
            .get_or_insert_with(TextRun::default)
            .characters = characters.to_string();
        Ok(())
    }

    fn set_box(&mut self, node: NodeId, bounds: BoundingBox) -> Result<(), DocumentError> {
        if bounds.is_degenerate() {
            return Err(DocumentError::InvalidBox {
                node,
                width: bounds.width,
                height: bounds.height,
            });
        }
        let target = self.node_mut(node)?;
        target.x = bounds.x;
        target.y = bounds.y;
        target.width = bounds.width;
        target.height = bounds.height;
        Ok(())
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) -> Result<(), DocumentError> {
        self.node_mut(node)?.visible = visible;
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, style: &TextStyle) -> Result<(), DocumentError> {
        let target = self.text_node_mut(node)?;
        target.text.get_or_insert_with(TextRun::default).style = style.clone();
        Ok(())
    }

    fn set_sizing(
        &mut self,
        node: NodeId,
        auto_resize: TextAutoResize,
        align: VerticalAlign,
    ) -> Result<(), DocumentError> {
        let target = self.text_node_mut(node)?;
        target.auto_resize = auto_resize;
        target.align = align;
        Ok(())
    }

    fn remove_node(&mut self, node: NodeId) -> Result<(), DocumentError> {
        self.node(node).ok_or(DocumentError::NodeNotFound(node))?;

        let mut doomed = vec![node];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor];
            doomed.extend(self.children(parent).map(|c| c.id));
            cursor += 1;
        }

        self.nodes.retain(|n| !doomed.contains(&n.id));
        self.selection.retain(|id| !doomed.contains(id));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

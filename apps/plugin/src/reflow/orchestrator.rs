//! Reflow Orchestrator: one wrap-text pass, from selection to commit.
//!
//! # State machine
//! `Idle → ValidatingSelection → ResolvingGeometry → Splitting → Composing → Committed`,
//! with `Aborted` reachable from every step. The pass is single-shot: `WrapText::run`
//! consumes the command, so a pass can never be re-entered while in flight.
//!
//! # Mutation discipline
//! Nothing is written to the document until the split is known. The commit itself is
//! all-or-nothing: if any write fails, the nodes created so far are removed and the
//! original layer stays visible.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{SelectionError, WrapError};
use crate::host::{Document, DocumentError, NodeId, Notification, Renderer, SelectedElement};
use crate::reflow::composer::{compose, Fragment};
use crate::reflow::geometry::{resolve_column, resolve_continuation, BoundingBox, ColumnSpec};
use crate::reflow::oracle::TextOracle;
use crate::reflow::splitter::{find_split, SearchOptions, Split};

pub const DEFAULT_SPACING: f64 = 10.0;
pub const DEFAULT_WRAP_HEIGHT_PERCENT: i64 = 100;

const SUCCESS_MESSAGE: &str = "Wrap complete!";

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflowState {
    Idle,
    ValidatingSelection,
    ResolvingGeometry,
    Splitting,
    Composing,
    Committed,
    Aborted,
}

/// Inputs of the wrap-text command.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapOptions {
    /// Gap between obstacle and text, in document units.
    pub spacing: f64,
    /// Share of the obstacle height the side column may use. Clamped to `[1, 100]`.
    pub wrap_height_percent: i64,
    pub search: SearchOptions,
}

impl Default for WrapOptions {
    fn default() -> Self {
        WrapOptions {
            spacing: DEFAULT_SPACING,
            wrap_height_percent: DEFAULT_WRAP_HEIGHT_PERCENT,
            search: SearchOptions::default(),
        }
    }
}

/// What a committed pass did.
#[derive(Debug, Clone, Serialize)]
pub struct ReflowReport {
    pub original: NodeId,
    pub side: NodeId,
    /// `None` when the whole text fit beside the obstacle.
    pub continuation: Option<NodeId>,
    pub split_index: usize,
    pub probes: u32,
    /// Side column in the parent's frame.
    pub column: ColumnSpec,
}

#[derive(Debug)]
pub struct ReflowOutcome {
    /// `Committed` on success, `Aborted` otherwise.
    pub state: ReflowState,
    pub result: Result<ReflowReport, WrapError>,
}

impl ReflowOutcome {
    pub fn is_committed(&self) -> bool {
        self.state == ReflowState::Committed
    }

    pub fn notification(&self) -> Notification {
        match &self.result {
            Ok(_) => Notification::Success(SUCCESS_MESSAGE.to_string()),
            Err(e) => e.notification(),
        }
    }
}

/// The validated selection: one text layer and one obstacle, both measurable.
struct Target {
    text: SelectedElement,
    parent: NodeId,
    text_box: BoundingBox,
    obstacle_box: BoundingBox,
}

impl Target {
    /// Translation from absolute coordinates into the text layer's parent frame.
    fn frame_offset(&self) -> (f64, f64) {
        (
            self.text.position.x - self.text_box.x,
            self.text.position.y - self.text_box.y,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Command
// ────────────────────────────────────────────────────────────────────────────

/// A single wrap-text pass.
#[derive(Debug)]
pub struct WrapText {
    options: WrapOptions,
    cancel: CancellationToken,
    state: ReflowState,
}

impl WrapText {
    pub fn new(options: WrapOptions) -> Self {
        WrapText {
            options,
            cancel: CancellationToken::new(),
            state: ReflowState::Idle,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that aborts the pass before its next probe.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> ReflowState {
        self.state
    }

    /// Runs the pass to completion or abort.
    pub async fn run<D, R>(mut self, document: &mut D, renderer: &R) -> ReflowOutcome
    where
        D: Document + ?Sized,
        R: Renderer + ?Sized,
    {
        let result = self.drive(document, renderer).await;
        if let Err(e) = &result {
            warn!(from = ?self.state, "Wrap text aborted: {e}");
            self.enter(ReflowState::Aborted);
        }
        ReflowOutcome {
            state: self.state,
            result,
        }
    }

    fn enter(&mut self, next: ReflowState) {
        debug!(from = ?self.state, to = ?next, "Reflow transition");
        self.state = next;
    }

    async fn drive<D, R>(
        &mut self,
        document: &mut D,
        renderer: &R,
    ) -> Result<ReflowReport, WrapError>
    where
        D: Document + ?Sized,
        R: Renderer + ?Sized,
    {
        self.enter(ReflowState::ValidatingSelection);
        let target = validate_selection(&document.selection())?;
        let run = document
            .text_run(target.text.id)
            .ok_or(SelectionError::MissingText)?;

        self.enter(ReflowState::ResolvingGeometry);
        let spacing = self.options.spacing;
        let column = resolve_column(
            &target.obstacle_box,
            &target.text_box,
            spacing,
            self.options.wrap_height_percent,
        )?;
        let continuation = resolve_continuation(&target.text_box, &column, spacing);

        renderer.load_font(&run.style.font).await?;

        self.enter(ReflowState::Splitting);
        let characters: Vec<char> = run.characters.chars().collect();
        let oracle = TextOracle::new(&characters, &run.style, renderer);
        let split: Split = find_split(
            characters.len(),
            column.width,
            column.height_limit,
            &oracle,
            &self.options.search,
            &self.cancel,
        )
        .await?;

        self.enter(ReflowState::Composing);
        let (dx, dy) = target.frame_offset();
        let local_column = column.translated(dx, dy);
        let (side, rest) = compose(
            &run,
            split.index,
            &local_column,
            &continuation.translated(dx, dy),
        );
        let (side_id, continuation_id) =
            commit(document, target.parent, target.text.id, &side, &rest)?;

        self.enter(ReflowState::Committed);
        info!(
            original = %target.text.id,
            split_index = split.index,
            len = characters.len(),
            probes = split.probes,
            side = ?column.side,
            "Wrap text committed"
        );

        Ok(ReflowReport {
            original: target.text.id,
            side: side_id,
            continuation: continuation_id,
            split_index: split.index,
            probes: split.probes,
            column: local_column,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Steps
// ────────────────────────────────────────────────────────────────────────────

fn validate_selection(selection: &[SelectedElement]) -> Result<Target, SelectionError> {
    if selection.len() != 2 {
        return Err(SelectionError::WrongCount(selection.len()));
    }
    let texts = selection.iter().filter(|e| e.kind.is_text()).count();
    if texts != 1 {
        return Err(SelectionError::TextCount(texts));
    }

    let (text, obstacle) = if selection[0].kind.is_text() {
        (&selection[0], &selection[1])
    } else {
        (&selection[1], &selection[0])
    };

    let parent = text.parent.ok_or(SelectionError::Detached)?;
    let text_box = text.bounds.ok_or(SelectionError::MissingBounds)?;
    let obstacle_box = obstacle.bounds.ok_or(SelectionError::MissingBounds)?;

    Ok(Target {
        text: text.clone(),
        parent,
        text_box,
        obstacle_box,
    })
}

/// Writes both fragments and hides the original, or nothing at all.
fn commit<D: Document + ?Sized>(
    document: &mut D,
    parent: NodeId,
    original: NodeId,
    side: &Fragment,
    continuation: &Fragment,
) -> Result<(NodeId, Option<NodeId>), DocumentError> {
    let mut created = Vec::with_capacity(2);
    match write_all(document, parent, original, side, continuation, &mut created) {
        Ok(ids) => Ok(ids),
        Err(e) => {
            for node in created.iter().rev() {
                if let Err(cleanup) = document.remove_node(*node) {
                    warn!(node = %node, "Rollback could not remove fragment: {cleanup}");
                }
            }
            Err(e)
        }
    }
}

fn write_all<D: Document + ?Sized>(
    document: &mut D,
    parent: NodeId,
    original: NodeId,
    side: &Fragment,
    continuation: &Fragment,
    created: &mut Vec<NodeId>,
) -> Result<(NodeId, Option<NodeId>), DocumentError> {
    let side_id = write_fragment(document, parent, side, created)?;
    let continuation_id = if continuation.is_empty() {
        None
    } else {
        Some(write_fragment(document, parent, continuation, created)?)
    };
    document.set_visible(original, false)?;
    Ok((side_id, continuation_id))
}

fn write_fragment<D: Document + ?Sized>(
    document: &mut D,
    parent: NodeId,
    fragment: &Fragment,
    created: &mut Vec<NodeId>,
) -> Result<NodeId, DocumentError> {
    let node = document.create_text_node(parent)?;
    created.push(node);
    document.set_style(node, &fragment.style)?;
    document.set_box(node, fragment.bounds)?;
    document.set_sizing(node, fragment.auto_resize, fragment.align)?;
    document.set_text(node, &fragment.characters)?;
    Ok(node)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::scene::SceneNode;
    use crate::host::{
        FontName, MetricRenderer, NodeKind, RenderError, Scene, TextAutoResize, TextRun,
        TextStyle,
    };
    use crate::reflow::splitter::OracleError;
    use async_trait::async_trait;
    use std::time::Duration;

    /// height = 10px per character, independent of width.
    struct PerCharRenderer;

    #[async_trait]
    impl Renderer for PerCharRenderer {
        async fn load_font(&self, _font: &FontName) -> Result<(), RenderError> {
            Ok(())
        }

        async fn measure(
            &self,
            text: &str,
            _style: &TextStyle,
            _width: f64,
        ) -> Result<f64, OracleError> {
            Ok(text.chars().count() as f64 * 10.0)
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl Renderer for BrokenRenderer {
        async fn load_font(&self, _font: &FontName) -> Result<(), RenderError> {
            Ok(())
        }

        async fn measure(
            &self,
            _text: &str,
            _style: &TextStyle,
            _width: f64,
        ) -> Result<f64, OracleError> {
            Ok(f64::NAN)
        }
    }

    struct Fixture {
        scene: Scene,
        frame: NodeId,
        text: NodeId,
        image: NodeId,
    }

    /// Frame at (100, 50); text at local (0, 0) 400×300; image at local `image_x`, 0,
    /// 150×`image_height`.
    fn make_fixture(characters: &str, image_x: f64, image_height: f64) -> Fixture {
        let mut scene = Scene::new();
        let page = scene.insert(SceneNode::new(NodeKind::Page));
        let frame = scene.insert(
            SceneNode::new(NodeKind::Frame)
                .inside(page)
                .at(100.0, 50.0)
                .sized(1000.0, 1000.0),
        );
        let text = scene.insert(
            SceneNode::new(NodeKind::Text)
                .named("Body")
                .inside(frame)
                .sized(400.0, 300.0)
                .with_text(TextRun {
                    characters: characters.to_string(),
                    style: TextStyle::default(),
                }),
        );
        let image = scene.insert(
            SceneNode::new(NodeKind::Rectangle)
                .inside(frame)
                .at(image_x, 0.0)
                .sized(150.0, image_height),
        );
        scene.select(&[text, image]);
        Fixture {
            scene,
            frame,
            text,
            image,
        }
    }

    fn fast_options(spacing: f64, wrap_height_percent: i64) -> WrapOptions {
        WrapOptions {
            spacing,
            wrap_height_percent,
            search: SearchOptions {
                settle: Duration::ZERO,
                ..SearchOptions::default()
            },
        }
    }

    fn text_of(scene: &Scene, node: NodeId) -> String {
        scene.node(node).unwrap().text.as_ref().unwrap().characters.clone()
    }

    // ── scenarios ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_scenario_a_commits_two_fragments() {
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        let outcome = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &PerCharRenderer)
            .await;

        assert!(outcome.is_committed());
        assert_eq!(outcome.notification(), Notification::Success("Wrap complete!".into()));
        let report = outcome.result.unwrap();
        assert_eq!(report.split_index, 5);
        assert_eq!(text_of(&f.scene, report.side), "ABCDE");
        assert_eq!(text_of(&f.scene, report.continuation.unwrap()), "FGHIJ");
        assert!(!f.scene.node(f.text).unwrap().visible);
        assert_eq!(text_of(&f.scene, f.text), "ABCDEFGHIJ");
    }

    #[tokio::test]
    async fn test_fragments_are_siblings_in_parent_frame() {
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        let report = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &PerCharRenderer)
            .await
            .result
            .unwrap();

        let children: Vec<NodeId> = f.scene.children(f.frame).map(|n| n.id).collect();
        assert_eq!(
            children,
            vec![f.text, f.image, report.side, report.continuation.unwrap()]
        );

        // Image on the left at local x 0..150: column starts at 160 local, 240 wide.
        let side = f.scene.node(report.side).unwrap();
        assert_eq!((side.x, side.y, side.width, side.height), (160.0, 0.0, 240.0, 55.0));
        assert_eq!(side.auto_resize, TextAutoResize::Height);

        // Continuation: text's left edge, below the 55px wrap zone plus spacing.
        let rest = f.scene.node(report.continuation.unwrap()).unwrap();
        assert_eq!((rest.x, rest.y, rest.width), (0.0, 65.0, 400.0));
        assert_eq!(rest.text.as_ref().unwrap().style, TextStyle::default());
    }

    #[tokio::test]
    async fn test_obstacle_on_right_puts_column_at_text_left_edge() {
        let mut f = make_fixture("ABCDEFGHIJ", 250.0, 55.0);
        let report = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &PerCharRenderer)
            .await
            .result
            .unwrap();

        let side = f.scene.node(report.side).unwrap();
        assert_eq!((side.x, side.width), (0.0, 240.0));
    }

    #[tokio::test]
    async fn test_scenario_b_tiny_wrap_zone_leaves_side_empty() {
        // 1% of 55px = 0.55px: not even one character fits.
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        let report = WrapText::new(fast_options(10.0, 0))
            .run(&mut f.scene, &PerCharRenderer)
            .await
            .result
            .unwrap();

        assert_eq!(report.split_index, 0);
        assert_eq!(text_of(&f.scene, report.side), "");
        assert_eq!(text_of(&f.scene, report.continuation.unwrap()), "ABCDEFGHIJ");
    }

    #[tokio::test]
    async fn test_scenario_c_everything_fits_skips_continuation() {
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 200.0);
        let report = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &PerCharRenderer)
            .await
            .result
            .unwrap();

        assert_eq!(report.split_index, 10);
        assert!(report.continuation.is_none());
        assert_eq!(text_of(&f.scene, report.side), "ABCDEFGHIJ");
        assert_eq!(f.scene.children(f.frame).count(), 3);
    }

    #[tokio::test]
    async fn test_scenario_d_three_selected_aborts_without_mutation() {
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        let extra = f.scene.insert(
            SceneNode::new(NodeKind::Ellipse)
                .inside(f.frame)
                .sized(10.0, 10.0),
        );
        f.scene.select(&[f.text, f.image, extra]);
        let before = f.scene.clone();

        let outcome = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &PerCharRenderer)
            .await;

        assert_eq!(outcome.state, ReflowState::Aborted);
        assert!(matches!(
            outcome.result,
            Err(WrapError::Selection(SelectionError::WrongCount(3)))
        ));
        assert!(!outcome.notification().is_success());
        assert_eq!(f.scene, before);
        assert!(f.scene.node(f.text).unwrap().visible);
    }

    #[tokio::test]
    async fn test_scenario_e_padding_too_large_aborts() {
        // Image on the right at local x 300; 350px spacing leaves negative room.
        let mut f = make_fixture("ABCDEFGHIJ", 300.0, 55.0);
        let before = f.scene.clone();
        let outcome = WrapText::new(fast_options(350.0, 100))
            .run(&mut f.scene, &PerCharRenderer)
            .await;

        assert_eq!(outcome.state, ReflowState::Aborted);
        assert!(matches!(outcome.result, Err(WrapError::Geometry(_))));
        assert_eq!(f.scene, before);
    }

    // ── selection validation ────────────────────────────────────────────────

    #[tokio::test]
    async fn test_two_non_text_layers_rejected() {
        let mut f = make_fixture("ABC", 0.0, 55.0);
        let other = f.scene.insert(
            SceneNode::new(NodeKind::Rectangle)
                .inside(f.frame)
                .sized(10.0, 10.0),
        );
        f.scene.select(&[f.image, other]);

        let outcome = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &PerCharRenderer)
            .await;
        assert!(matches!(
            outcome.result,
            Err(WrapError::Selection(SelectionError::TextCount(0)))
        ));
    }

    #[tokio::test]
    async fn test_selection_order_does_not_matter() {
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        f.scene.select(&[f.image, f.text]);
        let outcome = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &PerCharRenderer)
            .await;
        assert_eq!(outcome.result.unwrap().split_index, 5);
    }

    // ── failure handling ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_invalid_oracle_height_aborts_without_mutation() {
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        let before = f.scene.clone();
        let outcome = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &BrokenRenderer)
            .await;

        assert!(matches!(outcome.result, Err(WrapError::Oracle(_))));
        assert_eq!(
            outcome.notification().message(),
            "Text wrap failed. The document was not changed."
        );
        assert_eq!(f.scene, before);
    }

    #[tokio::test]
    async fn test_missing_font_aborts_before_search() {
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        let before = f.scene.clone();
        let renderer = MetricRenderer::new().without_font("Inter");
        let outcome = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &renderer)
            .await;

        assert!(matches!(outcome.result, Err(WrapError::FontLoad(_))));
        assert_eq!(f.scene, before);
    }

    #[tokio::test]
    async fn test_cancelled_pass_commits_nothing() {
        let mut f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        let before = f.scene.clone();
        let command = WrapText::new(fast_options(10.0, 100));
        command.cancellation().cancel();

        let outcome = command.run(&mut f.scene, &PerCharRenderer).await;
        assert!(matches!(outcome.result, Err(WrapError::Cancelled { probes: 0 })));
        assert_eq!(f.scene, before);
    }

    /// Scene wrapper whose `set_visible` always fails, to exercise rollback.
    struct FailingHide(Scene);

    impl Document for FailingHide {
        fn selection(&self) -> Vec<SelectedElement> {
            self.0.selection()
        }
        fn text_run(&self, node: NodeId) -> Option<TextRun> {
            self.0.text_run(node)
        }
        fn create_text_node(&mut self, parent: NodeId) -> Result<NodeId, DocumentError> {
            self.0.create_text_node(parent)
        }
        fn set_text(&mut self, node: NodeId, characters: &str) -> Result<(), DocumentError> {
            self.0.set_text(node, characters)
        }
        fn set_box(&mut self, node: NodeId, bounds: BoundingBox) -> Result<(), DocumentError> {
            self.0.set_box(node, bounds)
        }
        fn set_visible(&mut self, node: NodeId, _visible: bool) -> Result<(), DocumentError> {
            Err(DocumentError::NodeNotFound(node))
        }
        fn set_style(&mut self, node: NodeId, style: &TextStyle) -> Result<(), DocumentError> {
            self.0.set_style(node, style)
        }
        fn set_sizing(
            &mut self,
            node: NodeId,
            auto_resize: TextAutoResize,
            align: crate::host::VerticalAlign,
        ) -> Result<(), DocumentError> {
            self.0.set_sizing(node, auto_resize, align)
        }
        fn remove_node(&mut self, node: NodeId) -> Result<(), DocumentError> {
            self.0.remove_node(node)
        }
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back_created_fragments() {
        let f = make_fixture("ABCDEFGHIJ", 0.0, 55.0);
        let before = f.scene.clone();
        let mut doc = FailingHide(f.scene);

        let outcome = WrapText::new(fast_options(10.0, 100))
            .run(&mut doc, &PerCharRenderer)
            .await;

        assert!(matches!(outcome.result, Err(WrapError::Document(_))));
        assert_eq!(doc.0, before);
    }

    // ── end to end with the metric renderer ─────────────────────────────────

    #[tokio::test]
    async fn test_metric_renderer_split_preserves_text_and_fits() {
        let body = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
                    tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
                    quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo.";
        let mut f = make_fixture(body, 0.0, 60.0);
        let renderer = MetricRenderer::new();
        let report = WrapText::new(fast_options(10.0, 100))
            .run(&mut f.scene, &renderer)
            .await
            .result
            .unwrap();

        let side = text_of(&f.scene, report.side);
        let rest = text_of(&f.scene, report.continuation.unwrap());
        assert_eq!(format!("{side}{rest}"), body);
        assert!(report.split_index > 0 && report.split_index < body.chars().count());
        assert!(report.probes <= crate::reflow::splitter::probe_bound(body.chars().count()));

        let style = TextStyle::default();
        let fitted = renderer.measure(&side, &style, 240.0).await.unwrap();
        assert!(fitted <= 60.0);
        let one_more: String = body.chars().take(report.split_index + 1).collect();
        let overflow = renderer.measure(&one_more, &style, 240.0).await.unwrap();
        assert!(overflow > 60.0);
    }
}

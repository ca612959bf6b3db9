use std::collections::VecDeque;

use arsupport_core::{AnnotationConfig, DrawColor, Point2D, StrokeId};
use arsupport_protocol::AnnotationMessage;
use tracing::{debug, info, trace, warn};

use crate::anchor::Anchor;
use crate::scene::{PlacedPoint, SceneRenderer, ViewpointProvider};

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    /// No stroke root exists.
    Idle,
    /// At least one stroke root exists.
    StrokeActive,
}

/// What a single [`ReplayStateMachine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Queue was empty.
    Idle,
    /// One point placed under the given stroke.
    Placed(StrokeId),
    /// One point dropped because it arrived outside any stroke.
    Discarded,
}

/// Geometry tunables, taken from [`AnnotationConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementParams {
    pub pixels_per_meter: f64,
    pub anchor_distance: f32,
    pub anchor_scale: f32,
    pub point_radius: f32,
}

impl From<&AnnotationConfig> for PlacementParams {
    fn from(cfg: &AnnotationConfig) -> Self {
        Self {
            pixels_per_meter: cfg.pixels_per_meter,
            anchor_distance: cfg.anchor_distance,
            anchor_scale: cfg.anchor_scale,
            point_radius: cfg.point_radius,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub strokes_created: u64,
    /// Stroke starts skipped because the viewpoint was unavailable.
    pub strokes_skipped: u64,
    pub strokes_undone: u64,
    pub points_queued: u64,
    pub points_placed: u64,
    /// Points dropped at their tick for having no stroke.
    pub points_discarded: u64,
    /// Pending points purged by an undo of their stroke.
    pub points_purged: u64,
}

#[derive(Debug, Clone, Copy)]
struct Stroke {
    id: StrokeId,
    anchor: Anchor,
}

/// A queued point, bound to the stroke current when it arrived.
#[derive(Debug, Clone, Copy)]
struct PendingPoint {
    point: Point2D,
    stroke: Option<StrokeId>,
}

// ── ReplayStateMachine ────────────────────────────────────────────────────────

/// Replays a remote peer's annotations into a local 3D scene.
///
/// Message handling ([`apply`](Self::apply)) and placement
/// ([`tick`](Self::tick)) take `&mut self`; both must run on the same task.
/// The peer driver hands decoded messages across to that task over a
/// channel.
///
/// Queued points stay with the stroke that was current when they arrived, so
/// a fast `touch-start` cannot pull trailing points of the previous stroke
/// into the new one. Color is read at placement time.
pub struct ReplayStateMachine<R, V> {
    renderer: R,
    viewpoint: V,
    params: PlacementParams,
    strokes: Vec<Stroke>,
    pending: VecDeque<PendingPoint>,
    /// Stroke receiving new points; cleared by `touch-end` and by undoing it.
    active: Option<StrokeId>,
    color: DrawColor,
    next_id: u64,
    stats: ReplayStats,
}

impl<R: SceneRenderer, V: ViewpointProvider> ReplayStateMachine<R, V> {
    pub fn new(renderer: R, viewpoint: V, config: &AnnotationConfig) -> Self {
        Self {
            renderer,
            viewpoint,
            params: PlacementParams::from(config),
            strokes: Vec::new(),
            pending: VecDeque::new(),
            active: None,
            color: config.initial_color,
            next_id: 0,
            stats: ReplayStats::default(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn state(&self) -> ReplayState {
        if self.strokes.is_empty() {
            ReplayState::Idle
        } else {
            ReplayState::StrokeActive
        }
    }

    pub fn color(&self) -> DrawColor {
        self.color
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    pub fn stroke_ids(&self) -> impl Iterator<Item = StrokeId> + '_ {
        self.strokes.iter().map(|s| s.id)
    }

    pub fn active_stroke(&self) -> Option<StrokeId> {
        self.active
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pending points in placement order.
    pub fn pending_points(&self) -> impl Iterator<Item = Point2D> + '_ {
        self.pending.iter().map(|p| p.point)
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn viewpoint_mut(&mut self) -> &mut V {
        &mut self.viewpoint
    }

    // ── Events ───────────────────────────────────────────────────────────────

    /// Apply one decoded message. Never touches the scene except for undo.
    pub fn apply(&mut self, msg: AnnotationMessage) {
        match msg {
            AnnotationMessage::TouchStart => {
                self.start_stroke();
            }
            AnnotationMessage::TouchEnd => self.end_stroke(),
            AnnotationMessage::Undo => {
                self.undo();
            }
            AnnotationMessage::Color(c) => self.set_color(c),
            AnnotationMessage::Points(points) => self.enqueue_points(points),
        }
    }

    /// Open a new stroke anchored in front of the current viewpoint.
    pub fn start_stroke(&mut self) -> Option<StrokeId> {
        let Some(pose) = self.viewpoint.current_pose() else {
            self.stats.strokes_skipped += 1;
            self.active = None;
            warn!("touch-start ignored: no viewpoint available");
            return None;
        };

        let id = StrokeId(self.next_id);
        self.next_id += 1;
        let anchor = Anchor::facing(&pose, self.params.anchor_distance, self.params.anchor_scale);
        self.renderer.add_stroke_root(id, &anchor);
        self.strokes.push(Stroke { id, anchor });
        self.active = Some(id);
        self.stats.strokes_created += 1;
        info!("Started {} at {:?} ({} strokes)", id, anchor.position, self.strokes.len());
        Some(id)
    }

    pub fn end_stroke(&mut self) {
        if let Some(id) = self.active.take() {
            debug!("Ended {} ({} points pending)", id, self.pending.len());
        }
    }

    pub fn enqueue_points(&mut self, points: Vec<Point2D>) {
        let stroke = self.active;
        if stroke.is_none() {
            debug!("{} point(s) arrived outside a stroke", points.len());
        }
        self.stats.points_queued += points.len() as u64;
        self.pending
            .extend(points.into_iter().map(|point| PendingPoint { point, stroke }));
    }

    /// Remove the most recent stroke, its placed points and its pending
    /// points. Returns the removed stroke, or `None` if there were none.
    pub fn undo(&mut self) -> Option<StrokeId> {
        let Some(stroke) = self.strokes.pop() else {
            debug!("undo with no strokes: ignored");
            return None;
        };
        self.renderer.remove_stroke_root(stroke.id);

        let before = self.pending.len();
        self.pending.retain(|p| p.stroke != Some(stroke.id));
        let purged = before - self.pending.len();
        self.stats.points_purged += purged as u64;

        if self.active == Some(stroke.id) {
            self.active = None;
        }
        self.stats.strokes_undone += 1;
        info!(
            "Undid {} ({} pending point(s) purged, {} strokes left)",
            stroke.id, purged, self.strokes.len()
        );
        Some(stroke.id)
    }

    /// Change the color for every placement from now on, queued points
    /// included.
    pub fn set_color(&mut self, color: DrawColor) {
        debug!("Draw color {:?} → {:?}", self.color.components(), color.components());
        self.color = color;
    }

    // ── Render tick ──────────────────────────────────────────────────────────

    /// Place at most one pending point. Call once per rendered frame.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(next) = self.pending.pop_front() else {
            return TickOutcome::Idle;
        };

        let Some(stroke) = next.stroke.and_then(|id| self.strokes.iter().find(|s| s.id == id)) else {
            self.stats.points_discarded += 1;
            trace!("Discarded stroke-less point {}", next.point);
            return TickOutcome::Discarded;
        };

        let ppm = self.params.pixels_per_meter;
        let placed = PlacedPoint {
            local: stroke.anchor.local_offset(next.point, ppm),
            world: stroke.anchor.world_position(next.point, ppm),
            color: self.color,
            radius: self.params.point_radius,
        };
        let id = stroke.id;
        self.renderer.place_point(id, placed);
        self.stats.points_placed += 1;
        trace!("Placed {} under {} at {:?}", next.point, id, placed.world);
        TickOutcome::Placed(id)
    }

    /// Drain the whole queue, one tick per point.
    pub fn drain(&mut self) -> usize {
        let mut ticks = 0;
        while self.tick() != TickOutcome::Idle {
            ticks += 1;
        }
        ticks
    }

    /// Discard all strokes and pending points at session end.
    pub fn teardown(&mut self) {
        for stroke in self.strokes.drain(..).rev() {
            self.renderer.remove_stroke_root(stroke.id);
        }
        let dropped = self.pending.len();
        self.pending.clear();
        self.active = None;
        info!("Replay torn down ({} pending point(s) dropped)", dropped);
    }
}

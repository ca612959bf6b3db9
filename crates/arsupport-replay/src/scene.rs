//! Collaborators of the replay state machine: the 3D scene and the camera.

use std::collections::BTreeMap;

use arsupport_core::{DrawColor, Pose, StrokeId};
use glam::Vec3;
use tracing::{trace, warn};

use crate::anchor::Anchor;

// MARK: - SceneRenderer

/// A point ready to be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedPoint {
    /// Position inside the stroke's anchor frame.
    pub local: Vec3,
    /// Same position in world space.
    pub world: Vec3,
    pub color: DrawColor,
    pub radius: f32,
}

/// Fire-and-forget scene commands issued by the replay state machine.
pub trait SceneRenderer {
    /// Create an empty root node for a new stroke.
    fn add_stroke_root(&mut self, stroke: StrokeId, anchor: &Anchor);

    /// Add one point under an existing stroke root.
    fn place_point(&mut self, stroke: StrokeId, point: PlacedPoint);

    /// Remove a stroke root and everything placed under it.
    fn remove_stroke_root(&mut self, stroke: StrokeId);
}

impl<T: SceneRenderer + ?Sized> SceneRenderer for &mut T {
    fn add_stroke_root(&mut self, stroke: StrokeId, anchor: &Anchor) {
        (**self).add_stroke_root(stroke, anchor)
    }

    fn place_point(&mut self, stroke: StrokeId, point: PlacedPoint) {
        (**self).place_point(stroke, point)
    }

    fn remove_stroke_root(&mut self, stroke: StrokeId) {
        (**self).remove_stroke_root(stroke)
    }
}

// MARK: - ViewpointProvider

/// Current camera pose of the receiving peer. `None` while tracking is
/// unavailable.
pub trait ViewpointProvider {
    fn current_pose(&self) -> Option<Pose>;
}

/// A camera that never moves. Used by the demo and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedViewpoint(pub Option<Pose>);

impl FixedViewpoint {
    pub fn at(pose: Pose) -> Self {
        Self(Some(pose))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }
}

impl ViewpointProvider for FixedViewpoint {
    fn current_pose(&self) -> Option<Pose> {
        self.0
    }
}

// MARK: - InMemoryScene

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub anchor: Anchor,
    pub points: Vec<PlacedPoint>,
}

/// Scene graph kept in memory: one node per live stroke root.
#[derive(Debug, Default)]
pub struct InMemoryScene {
    roots: BTreeMap<StrokeId, SceneNode>,
}

impl InMemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, stroke: StrokeId) -> Option<&SceneNode> {
        self.roots.get(&stroke)
    }

    pub fn roots(&self) -> impl Iterator<Item = (&StrokeId, &SceneNode)> {
        self.roots.iter()
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Points currently visible across all strokes.
    pub fn point_count(&self) -> usize {
        self.roots.values().map(|n| n.points.len()).sum()
    }
}

impl SceneRenderer for InMemoryScene {
    fn add_stroke_root(&mut self, stroke: StrokeId, anchor: &Anchor) {
        trace!("scene: add root {} at {:?}", stroke, anchor.position);
        self.roots.insert(stroke, SceneNode { anchor: *anchor, points: Vec::new() });
    }

    fn place_point(&mut self, stroke: StrokeId, point: PlacedPoint) {
        match self.roots.get_mut(&stroke) {
            Some(node) => node.points.push(point),
            None => warn!("scene: point for missing root {}", stroke),
        }
    }

    fn remove_stroke_root(&mut self, stroke: StrokeId) {
        if self.roots.remove(&stroke).is_none() {
            warn!("scene: remove of missing root {}", stroke);
        }
    }
}

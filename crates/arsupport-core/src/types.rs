use serde::{Deserialize, Serialize};

pub use glam::Vec3;

// MARK: - Point2D

/// Screen-space sample of a drag gesture, in raw pixels of the sending view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The point reached by moving `dx, dy` pixels from `self`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point2D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

// MARK: - DrawColor

/// RGBA draw color. Components are nominally in [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawColor {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl DrawColor {
    pub const SYSTEM_BLUE: Self = Self::rgba(0.0, 0.478, 1.0, 1.0);
    pub const SYSTEM_GRAY: Self = Self::rgba(0.557, 0.557, 0.576, 1.0);
    pub const SYSTEM_GREEN: Self = Self::rgba(0.204, 0.78, 0.349, 1.0);
    pub const SYSTEM_YELLOW: Self = Self::rgba(1.0, 0.8, 0.0, 1.0);
    pub const SYSTEM_RED: Self = Self::rgba(1.0, 0.231, 0.188, 1.0);

    /// Colors offered by the annotating peer's picker, in display order.
    pub const PALETTE: [Self; 5] = [
        Self::SYSTEM_BLUE,
        Self::SYSTEM_GRAY,
        Self::SYSTEM_GREEN,
        Self::SYSTEM_YELLOW,
        Self::SYSTEM_RED,
    ];

    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self { red, green, blue, alpha }
    }

    pub fn components(&self) -> [f64; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    pub fn from_components([red, green, blue, alpha]: [f64; 4]) -> Self {
        Self { red, green, blue, alpha }
    }
}

impl Default for DrawColor {
    fn default() -> Self {
        Self::SYSTEM_BLUE
    }
}

// MARK: - StrokeId

/// Identifier of one stroke on the receiving peer. Allocated in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StrokeId(pub u64);

impl std::fmt::Display for StrokeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stroke#{}", self.0)
    }
}

// MARK: - Pose

/// Viewpoint of the receiving peer's camera in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    /// Direction the camera looks along. Need not be normalised.
    pub forward: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }

    /// Pose from a column-major camera transform: forward is the negated
    /// third column, position the fourth.
    pub fn from_cols_array(m: &[f32; 16]) -> Self {
        Self {
            position: Vec3::new(m[12], m[13], m[14]),
            forward: Vec3::new(-m[8], -m[9], -m[10]),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self { position: Vec3::ZERO, forward: Vec3::NEG_Z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_display_matches_wire_pair() {
        assert_eq!(Point2D::new(120.0, 340.5).to_string(), "(120.0, 340.5)");
    }

    #[test]
    fn translated_adds_delta() {
        let p = Point2D::new(10.0, 20.0).translated(2.5, -4.0);
        assert_eq!(p, Point2D::new(12.5, 16.0));
    }

    #[test]
    fn pose_from_identity_transform_looks_down_negative_z() {
        let identity: [f32; 16] = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.5, 1.5, -2.0, 1.0,
        ];
        let pose = Pose::from_cols_array(&identity);
        assert_eq!(pose.forward, Vec3::NEG_Z);
        assert_eq!(pose.position, Vec3::new(0.5, 1.5, -2.0));
    }

    #[test]
    fn palette_starts_with_default_color() {
        assert_eq!(DrawColor::PALETTE[0], DrawColor::default());
        assert_eq!(DrawColor::SYSTEM_RED.components(), [1.0, 0.231, 0.188, 1.0]);
    }
}

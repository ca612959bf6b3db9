use arsupport_core::{Point2D, Pose};
use glam::Vec3;

/// Reference frame a stroke's points are placed in.
///
/// The frame sits `distance` in front of the viewpoint that was current when
/// the stroke started and faces that viewpoint: local +Z runs along the
/// camera's forward direction, local +X toward the camera's left, local +Y
/// up. Screen points are mirrored into it so that screen-right maps to
/// camera-right and screen-down to world-down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub position: Vec3,
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub z_axis: Vec3,
    /// Uniform scale applied to local offsets. Points projected further out
    /// appear smaller than drawn; this compensates.
    pub scale: f32,
}

impl Anchor {
    pub fn facing(pose: &Pose, distance: f32, scale: f32) -> Self {
        let z_axis = pose.forward.try_normalize().unwrap_or(Vec3::NEG_Z);
        // Looking straight up or down leaves no horizontal reference.
        let x_axis = Vec3::Y.cross(z_axis).try_normalize().unwrap_or(Vec3::NEG_X);
        let y_axis = z_axis.cross(x_axis);
        Self {
            position: pose.position + z_axis * distance,
            x_axis,
            y_axis,
            z_axis,
            scale,
        }
    }

    /// Offset of a screen point inside the anchor frame, in meters.
    pub fn local_offset(&self, point: Point2D, pixels_per_meter: f64) -> Vec3 {
        let x = -(point.x / pixels_per_meter) as f32;
        let y = -(point.y / pixels_per_meter) as f32;
        Vec3::new(x, y, 0.0) * self.scale
    }

    /// World position of a screen point placed under this anchor.
    pub fn world_position(&self, point: Point2D, pixels_per_meter: f64) -> Vec3 {
        let local = self.local_offset(point, pixels_per_meter);
        self.position + self.x_axis * local.x + self.y_axis * local.y + self.z_axis * local.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn anchor_sits_in_front_of_camera() {
        let pose = Pose::new(Vec3::new(0.0, 1.5, 0.0), Vec3::new(0.0, 0.0, -2.0));
        let a = Anchor::facing(&pose, 1.0, 1.25);
        assert!(a.position.abs_diff_eq(Vec3::new(0.0, 1.5, -1.0), EPS));
        assert!(a.z_axis.abs_diff_eq(Vec3::NEG_Z, EPS));
    }

    #[test]
    fn screen_axes_map_to_camera_axes() {
        let a = Anchor::facing(&Pose::default(), 1.0, 1.25);
        let p = a.world_position(Point2D::new(100.0, 200.0), 1000.0);
        // Screen right → camera right (+X), screen down → world down (−Y).
        assert!(p.abs_diff_eq(Vec3::new(0.125, -0.25, -1.0), EPS), "{p:?}");
    }

    #[test]
    fn turned_camera_turns_the_frame() {
        // Looking along +X: camera right is +Z.
        let a = Anchor::facing(&Pose::new(Vec3::ZERO, Vec3::X), 2.0, 1.0);
        let p = a.world_position(Point2D::new(500.0, 0.0), 1000.0);
        assert!(p.abs_diff_eq(Vec3::new(2.0, 0.0, 0.5), EPS), "{p:?}");
    }

    #[test]
    fn looking_straight_down_stays_finite() {
        let a = Anchor::facing(&Pose::new(Vec3::ZERO, Vec3::NEG_Y), 1.0, 1.0);
        let p = a.world_position(Point2D::new(10.0, 10.0), 1000.0);
        assert!(p.is_finite());
    }
}

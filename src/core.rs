//! Parameter vectors the choreographer interpolates, plus the viewport
//! profile that selects which camera path a timeline builder emits.

/// Normalize an external progress value: NaN becomes 0, everything else
/// (infinities included) clamps into `[0,1]`.
pub fn clamp_progress(t: f64) -> f64 {
    if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
}

/// Types that can be blended linearly between two endpoints.
pub trait Lerp: Sized {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }
}

impl Lerp for f32 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        (*a as f64 + ((*b as f64 - *a as f64) * t)) as f32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl Lerp for Vec3 {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Vec3::new(
            a.x + (b.x - a.x) * t,
            a.y + (b.y - a.y) * t,
            a.z + (b.z - a.z) * t,
        )
    }
}

/// The camera parameter vector driven through a timeline: eye position,
/// look-at target, and vertical field of view in degrees.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CameraRig {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_deg: f64,
}

impl Lerp for CameraRig {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            position: <Vec3 as Lerp>::lerp(&a.position, &b.position, t),
            target: <Vec3 as Lerp>::lerp(&a.target, &b.target, t),
            fov_deg: a.fov_deg + (b.fov_deg - a.fov_deg) * t,
        }
    }
}

/// Viewport dimensions sampled once at setup time.
///
/// Path selection is a pure function of this value; the choreographer never
/// re-reads the environment mid-animation, so a resize during playback cannot
/// produce a discontinuous camera jump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ViewportProfile {
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ViewportClass {
    Narrow,
    Wide,
}

impl ViewportProfile {
    /// Width below which a viewport gets the narrow (portrait/phone) path.
    pub const NARROW_MAX_WIDTH_PX: u32 = 768;

    pub const fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    pub fn class(self) -> ViewportClass {
        if self.width_px <= Self::NARROW_MAX_WIDTH_PX {
            ViewportClass::Narrow
        } else {
            ViewportClass::Wide
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_progress_handles_non_finite_input() {
        assert_eq!(clamp_progress(f64::NAN), 0.0);
        assert_eq!(clamp_progress(f64::INFINITY), 1.0);
        assert_eq!(clamp_progress(f64::NEG_INFINITY), 0.0);
        assert_eq!(clamp_progress(0.4), 0.4);
        assert_eq!(clamp_progress(-2.0), 0.0);
        assert_eq!(clamp_progress(3.0), 1.0);
    }

    #[test]
    fn lerp_midpoint_for_scalars_and_vectors() {
        assert_eq!(<f64 as Lerp>::lerp(&0.0, &10.0, 0.5), 5.0);
        assert_eq!(
            <Vec3 as Lerp>::lerp(&Vec3::new(0.0, 2.0, -4.0), &Vec3::new(2.0, 4.0, 4.0), 0.5),
            Vec3::new(1.0, 3.0, 0.0)
        );
    }

    #[test]
    fn camera_rig_lerps_componentwise() {
        let a = CameraRig {
            position: Vec3::new(0.0, 0.0, 0.0),
            target: Vec3::new(0.0, 0.0, -1.0),
            fov_deg: 40.0,
        };
        let b = CameraRig {
            position: Vec3::new(4.0, 0.0, 0.0),
            target: Vec3::new(0.0, 0.0, -3.0),
            fov_deg: 60.0,
        };
        let mid = CameraRig::lerp(&a, &b, 0.5);
        assert_eq!(mid.position, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(mid.target, Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(mid.fov_deg, 50.0);
    }

    #[test]
    fn viewport_class_boundary() {
        assert_eq!(ViewportProfile::new(768, 1024).class(), ViewportClass::Narrow);
        assert_eq!(ViewportProfile::new(769, 1024).class(), ViewportClass::Wide);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    /// Overshoots past the target and settles back, for reveal moments.
    /// Output exceeds 1 inside the interval; endpoints stay exact.
    OutBack,
}

impl Ease {
    // Dyadic so OVERSHOOT + 1 - OVERSHOOT cancels exactly in f64 and
    // apply(0) stays a hard 0.
    const OVERSHOOT: f64 = 1.75;

    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::OutBack => {
                let c1 = Self::OVERSHOOT;
                let c3 = c1 + 1.0;
                let u = t - 1.0;
                1.0 + u * u * (c3 * u + c1)
            }
        }
    }

    /// True when larger `t` always produces larger output.
    pub fn is_monotonic(self) -> bool {
        !matches!(self, Self::OutBack)
    }
}

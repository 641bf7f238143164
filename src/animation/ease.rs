use std::{fmt, sync::Arc};

/// Built-in easing curves applied to the raw `[0, 1]` animation fraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// Identity.
    #[default]
    Linear,
    /// Quadratic ease in.
    InQuad,
    /// Quadratic ease out.
    OutQuad,
    /// Quadratic ease in and out.
    InOutQuad,
    /// Cubic ease in.
    InCubic,
    /// Cubic ease out.
    OutCubic,
    /// Cubic ease in and out.
    InOutCubic,
    /// Cosine ease in and out.
    InOutSine,
    /// `sin(2 * pi * cycles * t)`: oscillates in `[-1, 1]` instead of sweeping.
    Cycle {
        /// Full oscillations per animation period.
        cycles: f64,
    },
}

impl Ease {
    /// Map a fraction (clamped to `[0, 1]`) through the curve.
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
            Self::InOutSine => (1.0 - (std::f64::consts::PI * t).cos()) / 2.0,
            Self::Cycle { cycles } => (2.0 * std::f64::consts::PI * cycles * t).sin(),
        }
    }
}

/// Time interpolation of a group animator: a built-in [`Ease`] or a caller-supplied curve.
#[derive(Clone)]
pub enum Interpolation {
    /// Built-in curve.
    Ease(Ease),
    /// Caller-supplied curve; non-finite outputs are treated as `0`.
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl Interpolation {
    /// Wrap an arbitrary curve. Input is the raw fraction in `[0, 1]`.
    pub fn custom(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Map a raw fraction through the interpolation.
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Self::Ease(e) => e.apply(t),
            Self::Custom(f) => {
                let v = f(t.clamp(0.0, 1.0));
                if v.is_finite() { v } else { 0.0 }
            }
        }
    }
}

impl Default for Interpolation {
    fn default() -> Self {
        Self::Ease(Ease::Linear)
    }
}

impl From<Ease> for Interpolation {
    fn from(e: Ease) -> Self {
        Self::Ease(e)
    }
}

impl fmt::Debug for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ease(e) => f.debug_tuple("Ease").field(e).finish(),
            Self::Custom(c) => f
                .debug_tuple("Custom")
                .field(&Arc::as_ptr(c).cast::<()>())
                .finish(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;

use std::fmt;

use crate::{foundation::core::Rgba8Premul, geometry::gradient::lerp_rgba};

/// Maps animation progress to a value of `T` on every draw.
pub trait Evaluator<T>: Send + Sync {
    /// Value at `progress`, normally in `[0, 1]`.
    fn evaluate(&self, progress: f64) -> T;
}

impl<T, F> Evaluator<T> for F
where
    F: Fn(f64) -> T + Send + Sync,
{
    fn evaluate(&self, progress: f64) -> T {
        self(progress)
    }
}

/// One customizable input of the shimmer paint.
pub enum Customization<T> {
    /// Built-in behavior.
    Default,
    /// Caller-supplied evaluator replacing the built-in behavior.
    Custom(Box<dyn Evaluator<T>>),
    /// Input switched off (for a transform: the shader is not moved).
    Disabled,
}

impl<T> Customization<T> {
    /// Wrap an evaluator.
    pub fn custom(e: impl Evaluator<T> + 'static) -> Self {
        Self::Custom(Box::new(e))
    }

    /// Evaluate a custom hook; `None` for `Default` and `Disabled`.
    pub fn evaluate(&self, progress: f64) -> Option<T> {
        match self {
            Self::Custom(e) => Some(e.evaluate(progress)),
            Self::Default | Self::Disabled => None,
        }
    }

    /// Whether the built-in behavior applies.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl<T> Default for Customization<T> {
    fn default() -> Self {
        Self::Default
    }
}

impl<T> fmt::Debug for Customization<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Disabled => f.write_str("Disabled"),
        }
    }
}

/// Color evaluator cycling through a palette once per period.
///
/// Progress `0` maps to the first color and `1` wraps back to it; colors in between are
/// interpolated channel-wise.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorCycle {
    colors: Vec<Rgba8Premul>,
}

impl ColorCycle {
    /// Cycle through `colors`. An empty palette evaluates to transparent.
    pub fn new(colors: impl IntoIterator<Item = Rgba8Premul>) -> Self {
        Self {
            colors: colors.into_iter().collect(),
        }
    }
}

impl Evaluator<Rgba8Premul> for ColorCycle {
    fn evaluate(&self, progress: f64) -> Rgba8Premul {
        let n = self.colors.len();
        match n {
            0 => return Rgba8Premul::transparent(),
            1 => return self.colors[0],
            _ => {}
        }
        let p = if progress.is_finite() {
            progress.rem_euclid(1.0)
        } else {
            0.0
        };
        let pos = p * n as f64;
        let i = (pos.floor() as usize).min(n - 1);
        let next = (i + 1) % n;
        lerp_rgba(self.colors[i], self.colors[next], pos - i as f64)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/surface/evaluator.rs"]
mod tests;

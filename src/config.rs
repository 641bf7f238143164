use serde::{Deserialize, Serialize};

use crate::{
    animation::ease::Ease,
    foundation::core::Rgba8Premul,
    foundation::error::{ShimmerError, ShimmerResult},
    geometry::band::{bounding_rect, gradient_stops},
};

/// How a surface composes the band over its content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionMode {
    /// Each surface paints the band procedurally with its own shader.
    #[default]
    Procedural,
    /// Surfaces share the group's prebuilt mask and scratch buffers.
    SharedMask,
}

/// Per-surface shimmer parameters.
///
/// Every field has a default, so `{}` is a valid JSON config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShimmerConfig {
    /// Gradient direction in degrees.
    #[serde(default = "default_angle")]
    pub angle_deg: f64,
    /// Band half-thickness as a fraction of the surface width, in `(0, 0.5)`.
    #[serde(default = "default_band_fraction")]
    pub band_fraction: f64,
    /// Opaque core half-thickness as a fraction of the width, in `(0, band_fraction)`.
    #[serde(default = "default_center_fraction")]
    pub center_fraction: f64,
    /// Sweep period in milliseconds.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    /// Band color as straight (non-premultiplied) RGBA8.
    #[serde(default = "default_color")]
    pub color: [u8; 4],
    /// Time curve of each sweep.
    #[serde(default)]
    pub interpolation: Ease,
    /// Composition strategy.
    #[serde(default)]
    pub mode: CompositionMode,
    /// Name of a shared group; `None` gives the surface a private group.
    #[serde(default)]
    pub group: Option<String>,
}

fn default_angle() -> f64 {
    20.0
}

fn default_band_fraction() -> f64 {
    0.25
}

fn default_center_fraction() -> f64 {
    0.05
}

fn default_duration_ms() -> u64 {
    1200
}

fn default_color() -> [u8; 4] {
    [255, 255, 255, 128]
}

impl Default for ShimmerConfig {
    fn default() -> Self {
        Self {
            angle_deg: default_angle(),
            band_fraction: default_band_fraction(),
            center_fraction: default_center_fraction(),
            duration_ms: default_duration_ms(),
            color: default_color(),
            interpolation: Ease::default(),
            mode: CompositionMode::default(),
            group: None,
        }
    }
}

impl ShimmerConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json_str(s: &str) -> ShimmerResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| ShimmerError::serde(format!("parse shimmer config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> ShimmerResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ShimmerError::serde(format!("serialize shimmer config JSON: {e}")))
    }

    /// Check ranges that do not depend on the surface size.
    pub fn validate(&self) -> ShimmerResult<()> {
        if !self.angle_deg.is_finite() {
            return Err(ShimmerError::validation("angle_deg must be finite"));
        }
        if self.duration_ms == 0 {
            return Err(ShimmerError::validation("duration_ms must be >= 1"));
        }
        if let Ease::Cycle { cycles } = self.interpolation
            && !cycles.is_finite()
        {
            return Err(ShimmerError::validation("cycle count must be finite"));
        }
        if let Some(g) = &self.group
            && g.trim().is_empty()
        {
            return Err(ShimmerError::validation("group name must not be empty"));
        }
        gradient_stops(self.band_fraction, self.center_fraction)
            .map_err(|e| ShimmerError::validation(format!("invalid band widths: {e}")))?;
        // Probe the band geometry on a unit surface so a bad combination fails here, not on draw.
        bounding_rect(1.0, 1.0, self.angle_deg, self.band_fraction)
            .map_err(|e| ShimmerError::validation(format!("invalid band geometry: {e}")))?;
        Ok(())
    }

    /// Band color, premultiplied.
    pub fn color_premul(&self) -> Rgba8Premul {
        Rgba8Premul::from_straight(self.color)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;

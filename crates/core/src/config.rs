//! Frame drawer configuration.
//!
//! Parsed from JSON; every field is optional and falls back to the values
//! the video pipeline has always used.

use serde::{Deserialize, Serialize};

use crate::blur::DEFAULT_RADIUS;
use crate::error::RenderError;
use crate::texture::SlotPolicy;
use crate::viewport::viewport_extent;

/// Settings for [`FrameDrawer`](crate::frame::FrameDrawer).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DrawerConfig {
    /// RGBA clear color, each channel in `[0, 1]`.
    pub clear_color: [f32; 4],
    /// Blur radius in texture coordinates.
    pub blur_radius: [f32; 2],
    /// Handling of out-of-range sampler slots.
    pub slot_policy: SlotPolicy,
    /// Initial surface size until the surface reports its own.
    pub draw_size: [u32; 2],
    /// Sample the source with vertically mirrored coordinates.
    pub flip_vertical: bool,
}

impl Default for DrawerConfig {
    fn default() -> Self {
        Self {
            clear_color: [0.0; 4],
            blur_radius: DEFAULT_RADIUS,
            slot_policy: SlotPolicy::default(),
            draw_size: [720, 1280],
            flip_vertical: false,
        }
    }
}

impl DrawerConfig {
    /// Parses and validates a JSON object. An empty object yields the defaults.
    ///
    /// # Errors
    ///
    /// `RenderError::InvalidConfig` for malformed JSON, unknown keys or
    /// out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RenderError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// `RenderError::InvalidConfig` naming the first offending field.
    pub fn validate(&self) -> Result<(), RenderError> {
        if !self.clear_color.iter().all(|c| (0.0..=1.0).contains(c)) {
            return Err(RenderError::InvalidConfig(format!(
                "clear_color channels must be in [0, 1], got {:?}",
                self.clear_color
            )));
        }
        if !self.blur_radius.iter().all(|r| r.is_finite() && *r >= 0.0) {
            return Err(RenderError::InvalidConfig(format!(
                "blur_radius must be finite and non-negative, got {:?}",
                self.blur_radius
            )));
        }
        let [width, height] = self.draw_size;
        viewport_extent(width, height).map_err(|_| {
            RenderError::InvalidConfig(format!(
                "draw_size must be non-zero and fit a GL viewport, got {:?}",
                self.draw_size
            ))
        })?;
        Ok(())
    }
}

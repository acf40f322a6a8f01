//! Per-frame render target preparation.

use crate::driver::{ClearMask, GlDriver};
use crate::error::RenderError;

/// Converts a surface size to GL viewport extents.
///
/// # Errors
///
/// `RenderError::InvalidConfig` if either side is zero or exceeds `i32::MAX`.
pub fn viewport_extent(width: u32, height: u32) -> Result<(i32, i32), RenderError> {
    match (i32::try_from(width), i32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(RenderError::InvalidConfig(format!(
            "draw size must be non-zero and fit a GL viewport, got {width}x{height}"
        ))),
    }
}

/// Binds `framebuffer` (`None` for the default framebuffer), sets the
/// viewport to `(0, 0, width, height)` and clears the color buffer.
///
/// Depth and stencil are left untouched; the pipeline composites 2D video
/// and never attaches either.
///
/// # Errors
///
/// `RenderError::InvalidConfig` for a size GL cannot take as a viewport. No
/// driver call is made in that case.
pub fn clear_viewport<G: GlDriver>(
    gl: &G,
    framebuffer: Option<G::Framebuffer>,
    width: u32,
    height: u32,
) -> Result<(), RenderError> {
    let (width, height) = viewport_extent(width, height)?;
    gl.bind_framebuffer(framebuffer);
    gl.viewport(0, 0, width, height);
    gl.clear(ClearMask::COLOR);
    Ok(())
}

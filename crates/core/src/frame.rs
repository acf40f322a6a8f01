//! Per-surface drawing of an external video texture.
//!
//! `FrameDrawer` owns the external texture a video decoder renders into and
//! the blur pass that presents it. The surrounding surface layer makes the
//! context current, latches the newest frame into the texture, calls
//! [`FrameDrawer::draw_frame`] and swaps buffers.

use glam::Vec2;
use tracing::{debug, info};

use crate::blur::{BlurDrawer, BlurPass};
use crate::config::DrawerConfig;
use crate::driver::{Capability, GlDriver, TextureTarget};
use crate::error::RenderError;
use crate::texture::{create_external_texture, TextureBinder};
use crate::viewport::{clear_viewport, viewport_extent};

/// Sets the fixed-function state the 2D compositing passes expect.
pub fn prepare_context<G: GlDriver>(gl: &G, clear_color: [f32; 4]) {
    gl.disable(Capability::CullFace);
    gl.disable(Capability::DepthTest);
    gl.disable(Capability::Blend);
    let [r, g, b, a] = clear_color;
    gl.clear_color(r, g, b, a);
}

pub struct FrameDrawer<G: GlDriver> {
    config: DrawerConfig,
    binder: TextureBinder,
    external_texture: G::Texture,
    blur: BlurDrawer<G>,
    draw_size: (u32, u32),
}

impl<G: GlDriver> FrameDrawer<G> {
    /// Prepares context state and creates the external texture and blur pass.
    ///
    /// # Errors
    ///
    /// Invalid config, texture or program creation failure. The texture is
    /// released again if the blur pass cannot be built.
    pub fn new(gl: &G, config: DrawerConfig) -> Result<Self, RenderError> {
        config.validate()?;
        prepare_context(gl, config.clear_color);

        let external_texture = create_external_texture(gl)?;
        let blur = BlurDrawer::new(gl, TextureTarget::External)
            .inspect_err(|_| gl.delete_texture(external_texture))?;

        let [width, height] = config.draw_size;
        info!(?external_texture, width, height, "frame drawer ready");
        Ok(Self {
            binder: TextureBinder::new(config.slot_policy),
            config,
            external_texture,
            blur,
            draw_size: (width, height),
        })
    }

    /// Texture the video source should render into.
    pub fn external_texture(&self) -> G::Texture {
        self.external_texture
    }

    pub fn draw_size(&self) -> (u32, u32) {
        self.draw_size
    }

    /// Records the surface size used by the next frames.
    ///
    /// # Errors
    ///
    /// `RenderError::InvalidConfig` if the size cannot be a GL viewport; the
    /// previous size is kept.
    pub fn set_draw_size(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        viewport_extent(width, height)?;
        debug!(width, height, "draw size changed");
        self.draw_size = (width, height);
        Ok(())
    }

    /// Clears `framebuffer` at the draw size and draws the blurred frame.
    ///
    /// # Errors
    ///
    /// Invalid draw size, or sampler binding errors from the blur pass.
    pub fn draw_frame(
        &self,
        gl: &G,
        framebuffer: Option<G::Framebuffer>,
    ) -> Result<(), RenderError> {
        let (width, height) = self.draw_size;
        clear_viewport(gl, framebuffer, width, height)?;

        let pass = BlurPass {
            radius: Vec2::from(self.config.blur_radius),
            flip_vertical: self.config.flip_vertical,
            ..BlurPass::default()
        };
        self.blur.draw(gl, &self.binder, self.external_texture, &pass)
    }

    /// Deletes the external texture and the blur pass objects.
    pub fn release(self, gl: &G) {
        gl.delete_texture(self.external_texture);
        self.blur.release(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::create_vertex_buffer;
    use crate::driver::{ClearMask, Primitive, ShaderStage};
    use crate::recording::{GlCall, RecordingDriver};
    use crate::shader::build_program;
    use crate::texture::SamplerSlot;

    const PASSTHROUGH_VERTEX: &str = "attribute vec4 a_position;\n\
        attribute vec2 a_texCoord;\n\
        varying vec2 v_texCoord;\n\
        void main() { gl_Position = a_position; v_texCoord = a_texCoord; }";

    const PASSTHROUGH_FRAGMENT: &str = "#extension GL_OES_EGL_image_external : require\n\
        precision mediump float;\n\
        varying vec2 v_texCoord;\n\
        uniform samplerExternalOES s_texture;\n\
        void main() { gl_FragColor = texture2D(s_texture, v_texCoord); }";

    #[test]
    fn passthrough_pipeline_completes_without_fatal_errors() {
        let gl = RecordingDriver::new();

        let program = build_program(&gl, PASSTHROUGH_VERTEX, PASSTHROUGH_FRAGMENT).unwrap();
        let texture = create_external_texture(&gl).unwrap();
        gl.use_program(Some(program));
        let location = gl.get_uniform_location(program, "s_texture");
        let unit = TextureBinder::default()
            .bind_sampler(
                &gl,
                SamplerSlot::new(0),
                location.as_ref(),
                texture,
                TextureTarget::External,
            )
            .unwrap();
        let buffer = create_vertex_buffer(&gl, &[0.0; 12]).unwrap();

        assert!(program > 0 && texture > 0 && buffer > 0);
        assert_eq!(unit, 0);
        assert_eq!(gl.get_error(), crate::driver::NO_ERROR);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn new_prepares_context_before_creating_objects() {
        let gl = RecordingDriver::new();
        let _drawer = FrameDrawer::new(&gl, DrawerConfig::default()).unwrap();
        let calls = gl.calls();

        assert_eq!(
            &calls[..4],
            &[
                GlCall::Disable {
                    capability: Capability::CullFace
                },
                GlCall::Disable {
                    capability: Capability::DepthTest
                },
                GlCall::Disable {
                    capability: Capability::Blend
                },
                GlCall::ClearColor {
                    red: 0.0,
                    green: 0.0,
                    blue: 0.0,
                    alpha: 0.0
                },
            ]
        );
    }

    #[test]
    fn draw_frame_clears_at_draw_size_then_draws_quad() {
        let gl = RecordingDriver::new();
        let mut drawer = FrameDrawer::new(&gl, DrawerConfig::default()).unwrap();
        drawer.set_draw_size(1080, 1920).unwrap();
        gl.take_calls();

        drawer.draw_frame(&gl, None).unwrap();
        let calls = gl.calls();

        assert_eq!(calls[0], GlCall::BindFramebuffer { framebuffer: None });
        assert_eq!(
            calls[1],
            GlCall::Viewport {
                x: 0,
                y: 0,
                width: 1080,
                height: 1920
            }
        );
        assert_eq!(
            calls[2],
            GlCall::Clear {
                mask: ClearMask::COLOR
            }
        );
        assert!(calls.contains(&GlCall::BindTexture {
            target: TextureTarget::External,
            texture: Some(drawer.external_texture())
        }));
        assert!(calls.contains(&GlCall::DrawArrays {
            mode: Primitive::TriangleStrip,
            first: 0,
            count: 4
        }));
    }

    #[test]
    fn configured_radius_reaches_the_shader() {
        let gl = RecordingDriver::new();
        let config = DrawerConfig {
            blur_radius: [0.125, 0.0625],
            ..DrawerConfig::default()
        };
        let drawer = FrameDrawer::new(&gl, config).unwrap();
        gl.take_calls();

        drawer.draw_frame(&gl, None).unwrap();
        assert!(gl.calls().iter().any(|c| matches!(
            c,
            GlCall::Uniform2f { x, y, .. } if *x == 0.125 && *y == 0.0625
        )));
    }

    #[test]
    fn oversized_draw_size_is_rejected_and_previous_size_kept() {
        let gl = RecordingDriver::new();
        let mut drawer = FrameDrawer::new(&gl, DrawerConfig::default()).unwrap();
        gl.take_calls();

        let err = drawer.set_draw_size(3_000_000_000, 10).unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfig(_)));
        assert_eq!(drawer.draw_size(), (720, 1280));

        drawer.draw_frame(&gl, None).unwrap();
        assert!(gl.calls().contains(&GlCall::Viewport {
            x: 0,
            y: 0,
            width: 720,
            height: 1280
        }));
        let negative = |c: &GlCall| {
            matches!(c, GlCall::Viewport { width, height, .. } if *width < 0 || *height < 0)
        };
        assert!(!gl.calls().iter().any(negative));
    }

    #[test]
    fn zero_draw_size_is_rejected() {
        let gl = RecordingDriver::new();
        let mut drawer = FrameDrawer::new(&gl, DrawerConfig::default()).unwrap();
        assert!(drawer.set_draw_size(0, 1080).is_err());
        assert_eq!(drawer.draw_size(), (720, 1280));
    }

    #[test]
    fn release_leaves_no_live_objects() {
        let gl = RecordingDriver::new();
        let drawer = FrameDrawer::new(&gl, DrawerConfig::default()).unwrap();
        drawer.draw_frame(&gl, None).unwrap();
        drawer.release(&gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn failed_blur_build_releases_the_texture() {
        let gl = RecordingDriver::new().with_link_failure();
        let result = FrameDrawer::new(&gl, DrawerConfig::default());
        assert!(matches!(result, Err(RenderError::Shader(_))));
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn vertex_failure_is_recoverable() {
        let gl = RecordingDriver::new().with_compile_failure(ShaderStage::Vertex);
        let err = FrameDrawer::new(&gl, DrawerConfig::default()).err().unwrap();
        assert!(!err.is_fatal());
    }

    #[test]
    fn invalid_config_touches_no_state() {
        let gl = RecordingDriver::new();
        let config = DrawerConfig {
            draw_size: [0, 0],
            ..DrawerConfig::default()
        };
        assert!(FrameDrawer::new(&gl, config).is_err());
        assert!(gl.calls().is_empty());
    }
}

//! Radial blur pass over a single texture.
//!
//! Draws the full-viewport quad from [`crate::quad`] with a fragment shader
//! that averages samples on concentric rings around each texel. The sampler
//! type is chosen from the texture target at construction, so one drawer
//! serves either external video frames or ordinary 2D textures, never both.

use glam::{Mat4, Vec2};

use crate::buffer::{
    create_vertex_buffer, COORDS_PER_VERTEX, COORDS_UV_PER_TEXTURE, TEXTURE_STRIDE, VERTEX_STRIDE,
};
use crate::driver::{GlDriver, Primitive, TextureTarget};
use crate::error::RenderError;
use crate::quad::{QUAD_POSITIONS, QUAD_UV, QUAD_UV_FLIPPED, QUAD_VERTEX_COUNT};
use crate::shader::build_program;
use crate::texture::{SamplerSlot, TextureBinder};

/// Blur radius in texture coordinates, tuned for 2160x3840 sources.
pub const DEFAULT_RADIUS: [f32; 2] = [30.0 / 2160.0, 30.0 / 3840.0];

/// GLSL ES 1.00 vertex shader shared by both sampler variants.
pub const BLUR_VERTEX_SHADER: &str = r#"uniform mat4 u_textureMatrix;
uniform mat4 u_vertexMatrix;

attribute vec4 a_position;
attribute vec2 a_texCoord;

varying vec2 v_texCoord;

void main() {
    gl_Position = u_vertexMatrix * a_position;
    v_texCoord = (u_textureMatrix * vec4(a_texCoord, 0.0, 1.0)).xy;
}
"#;

const BLUR_FRAGMENT_BODY: &str = r#"precision mediump float;

const float TAU = 6.28318530718;
const float DIRECTIONS = 32.0;
const float QUALITY = 40.0;

varying vec2 v_texCoord;
uniform vec2 u_radius;

void main() {
    vec4 color = vec4(0.0);
    for (float d = 0.0; d < TAU; d += TAU / DIRECTIONS) {
        for (float i = 1.0 / QUALITY; i <= 1.0; i += 1.0 / QUALITY) {
            color += texture2D(s_baseMap, v_texCoord + vec2(cos(d), sin(d)) * u_radius * i);
        }
    }
    gl_FragColor = color / (QUALITY * DIRECTIONS);
}
"#;

/// Builds the blur fragment shader for a texture target.
pub fn blur_fragment_shader(target: TextureTarget) -> String {
    let (header, sampler) = match target {
        TextureTarget::External => (
            "#extension GL_OES_EGL_image_external : require\n",
            "samplerExternalOES",
        ),
        TextureTarget::Planar2D => ("", "sampler2D"),
    };
    // The sampler must be declared before `main` references it.
    let body = BLUR_FRAGMENT_BODY.replacen(
        "uniform vec2 u_radius;",
        &format!("uniform vec2 u_radius;\nuniform {sampler} s_baseMap;"),
        1,
    );
    format!("{header}{body}")
}

/// Per-draw parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurPass {
    /// Ring radius in texture coordinates.
    pub radius: Vec2,
    /// Sample with [`QUAD_UV_FLIPPED`] instead of [`QUAD_UV`].
    pub flip_vertical: bool,
    pub vertex_matrix: Mat4,
    pub texture_matrix: Mat4,
}

impl Default for BlurPass {
    fn default() -> Self {
        Self {
            radius: Vec2::from(DEFAULT_RADIUS),
            flip_vertical: false,
            vertex_matrix: Mat4::IDENTITY,
            texture_matrix: Mat4::IDENTITY,
        }
    }
}

/// Program, locations and quad buffers of the blur pass.
///
/// Owns its GL objects; call [`BlurDrawer::release`] before the context
/// goes away.
pub struct BlurDrawer<G: GlDriver> {
    program: G::Program,
    target: TextureTarget,
    a_position: u32,
    a_tex_coord: u32,
    u_sampler: Option<G::UniformLocation>,
    u_vertex_matrix: Option<G::UniformLocation>,
    u_texture_matrix: Option<G::UniformLocation>,
    u_radius: Option<G::UniformLocation>,
    positions: G::Buffer,
    uv: G::Buffer,
    uv_flipped: G::Buffer,
}

impl<G: GlDriver> BlurDrawer<G> {
    /// Builds the program for `target` and uploads the quad buffers.
    ///
    /// # Errors
    ///
    /// Shader build errors, a missing vertex attribute, or a refused buffer
    /// allocation. Nothing created here survives a failed call.
    pub fn new(gl: &G, target: TextureTarget) -> Result<Self, RenderError> {
        let program = build_program(gl, BLUR_VERTEX_SHADER, &blur_fragment_shader(target))?;
        Self::with_program(gl, program, target).inspect_err(|_| gl.delete_program(program))
    }

    fn with_program(
        gl: &G,
        program: G::Program,
        target: TextureTarget,
    ) -> Result<Self, RenderError> {
        let attrib = |name: &str| {
            gl.get_attrib_location(program, name)
                .ok_or_else(|| RenderError::MissingAttribute(name.to_string()))
        };
        let a_position = attrib("a_position")?;
        let a_tex_coord = attrib("a_texCoord")?;

        let mut buffers = Vec::with_capacity(3);
        for data in [&QUAD_POSITIONS[..], &QUAD_UV[..], &QUAD_UV_FLIPPED[..]] {
            match create_vertex_buffer(gl, data) {
                Ok(buffer) => buffers.push(buffer),
                Err(e) => {
                    buffers.into_iter().for_each(|b| gl.delete_buffer(b));
                    return Err(e);
                }
            }
        }

        Ok(Self {
            program,
            target,
            a_position,
            a_tex_coord,
            u_sampler: gl.get_uniform_location(program, "s_baseMap"),
            u_vertex_matrix: gl.get_uniform_location(program, "u_vertexMatrix"),
            u_texture_matrix: gl.get_uniform_location(program, "u_textureMatrix"),
            u_radius: gl.get_uniform_location(program, "u_radius"),
            positions: buffers[0],
            uv: buffers[1],
            uv_flipped: buffers[2],
        })
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn program(&self) -> G::Program {
        self.program
    }

    /// Draws `texture` blurred into the currently bound framebuffer.
    ///
    /// Restores the array buffer, vertex attributes and program binding
    /// afterwards. The texture stays bound to unit 0.
    ///
    /// # Errors
    ///
    /// Only if `binder` rejects sampler slot 0, which no policy does.
    pub fn draw(
        &self,
        gl: &G,
        binder: &TextureBinder,
        texture: G::Texture,
        pass: &BlurPass,
    ) -> Result<(), RenderError> {
        gl.use_program(Some(self.program));

        gl.bind_array_buffer(Some(self.positions));
        gl.vertex_attrib_pointer_f32(self.a_position, COORDS_PER_VERTEX, VERTEX_STRIDE, 0);
        gl.enable_vertex_attrib_array(self.a_position);

        let uv = if pass.flip_vertical {
            self.uv_flipped
        } else {
            self.uv
        };
        gl.bind_array_buffer(Some(uv));
        gl.vertex_attrib_pointer_f32(self.a_tex_coord, COORDS_UV_PER_TEXTURE, TEXTURE_STRIDE, 0);
        gl.enable_vertex_attrib_array(self.a_tex_coord);

        gl.uniform_matrix_4_f32(
            self.u_vertex_matrix.as_ref(),
            &pass.vertex_matrix.to_cols_array(),
        );
        gl.uniform_matrix_4_f32(
            self.u_texture_matrix.as_ref(),
            &pass.texture_matrix.to_cols_array(),
        );
        gl.uniform_2_f32(self.u_radius.as_ref(), pass.radius.x, pass.radius.y);
        binder.bind_sampler(
            gl,
            SamplerSlot::new(0),
            self.u_sampler.as_ref(),
            texture,
            self.target,
        )?;

        gl.draw_arrays(Primitive::TriangleStrip, 0, QUAD_VERTEX_COUNT);

        gl.disable_vertex_attrib_array(self.a_position);
        gl.disable_vertex_attrib_array(self.a_tex_coord);
        gl.bind_array_buffer(None);
        gl.use_program(None);
        Ok(())
    }

    /// Deletes the program and buffers.
    pub fn release(self, gl: &G) {
        gl.delete_program(self.program);
        gl.delete_buffer(self.positions);
        gl.delete_buffer(self.uv);
        gl.delete_buffer(self.uv_flipped);
    }
}

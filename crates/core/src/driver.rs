//! The seam between this crate and the GL context.
//!
//! GL keeps its state (bound buffers, active texture unit, current program)
//! implicitly in the context. `GlDriver` narrows that global surface to the
//! calls this crate issues, with typed arguments instead of raw enums, so the
//! same helpers run against a real `glow::Context` (feature `render`) or the
//! [`RecordingDriver`](crate::recording::RecordingDriver) used in tests.
//!
//! Method names follow `glow::HasContext`. All methods take `&self` and must
//! be called on the thread that owns the context.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Value reported by `get_error` when no error is pending.
pub const NO_ERROR: u32 = 0;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Lowercase stage name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Texture binding target. Fixed for the lifetime of a texture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureTarget {
    /// `GL_TEXTURE_EXTERNAL_OES`, fed by an external image producer.
    External,
    /// `GL_TEXTURE_2D`.
    #[default]
    Planar2D,
}

impl TextureTarget {
    /// Maps an "is external" flag to a target.
    pub fn for_external(is_external: bool) -> Self {
        if is_external {
            TextureTarget::External
        } else {
            TextureTarget::Planar2D
        }
    }
}

/// Texture parameter names understood by [`GlDriver::tex_parameter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureParameter {
    MinFilter,
    MagFilter,
    WrapS,
    WrapT,
}

/// Values for [`TextureParameter`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterValue {
    Linear,
    Nearest,
    ClampToEdge,
    Repeat,
}

/// Buffer usage hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
    StreamDraw,
}

/// Which buffers a `clear` call touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearMask {
    /// Color buffer only.
    pub const COLOR: ClearMask = ClearMask {
        color: true,
        depth: false,
        stencil: false,
    };
}

/// Server-side capabilities toggled with `enable`/`disable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CullFace,
    DepthTest,
    Blend,
}

/// Primitive topology for `draw_arrays`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Triangles,
    TriangleStrip,
}

/// The subset of a GL context used by this crate.
///
/// Object-creating calls return `Err` with a driver message when the
/// driver refuses to allocate (the GL "name 0" case). Query methods return
/// `None` where GL would return `-1`.
pub trait GlDriver {
    type Shader: Copy + Debug;
    type Program: Copy + Debug;
    type Texture: Copy + Debug;
    type Buffer: Copy + Debug;
    type Framebuffer: Copy + Debug;
    type UniformLocation: Clone + Debug;

    // Shaders and programs.
    fn create_shader(&self, stage: ShaderStage) -> Result<Self::Shader, String>;
    fn shader_source(&self, shader: Self::Shader, source: &str);
    fn compile_shader(&self, shader: Self::Shader);
    fn get_shader_compile_status(&self, shader: Self::Shader) -> bool;
    fn get_shader_info_log(&self, shader: Self::Shader) -> String;
    fn delete_shader(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn attach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn detach_shader(&self, program: Self::Program, shader: Self::Shader);
    fn link_program(&self, program: Self::Program);
    fn get_program_link_status(&self, program: Self::Program) -> bool;
    fn get_program_info_log(&self, program: Self::Program) -> String;
    fn delete_program(&self, program: Self::Program);
    fn use_program(&self, program: Option<Self::Program>);

    fn get_attrib_location(&self, program: Self::Program, name: &str) -> Option<u32>;
    fn get_uniform_location(
        &self,
        program: Self::Program,
        name: &str,
    ) -> Option<Self::UniformLocation>;
    fn uniform_1_i32(&self, location: Option<&Self::UniformLocation>, value: i32);
    fn uniform_2_f32(&self, location: Option<&Self::UniformLocation>, x: f32, y: f32);
    fn uniform_matrix_4_f32(&self, location: Option<&Self::UniformLocation>, matrix: &[f32; 16]);

    // Textures. `unit` is a zero-based index, not `GL_TEXTURE0 + n`.
    fn create_texture(&self) -> Result<Self::Texture, String>;
    fn bind_texture(&self, target: TextureTarget, texture: Option<Self::Texture>);
    fn tex_parameter(
        &self,
        target: TextureTarget,
        parameter: TextureParameter,
        value: ParameterValue,
    );
    fn active_texture(&self, unit: u32);
    fn delete_texture(&self, texture: Self::Texture);

    // Array buffers and vertex attributes. Attributes are always
    // non-normalized floats.
    fn create_buffer(&self) -> Result<Self::Buffer, String>;
    fn bind_array_buffer(&self, buffer: Option<Self::Buffer>);
    fn array_buffer_data_f32(&self, data: &[f32], usage: BufferUsage);
    fn delete_buffer(&self, buffer: Self::Buffer);
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn disable_vertex_attrib_array(&self, index: u32);

    // Framebuffer and fixed-function state. `None` is the default framebuffer.
    fn bind_framebuffer(&self, framebuffer: Option<Self::Framebuffer>);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32);
    fn clear(&self, mask: ClearMask);
    fn disable(&self, capability: Capability);
    fn draw_arrays(&self, mode: Primitive, first: i32, count: i32);

    /// Returns and clears the oldest pending error code, [`NO_ERROR`] if none.
    fn get_error(&self) -> u32;
}

/// Fails with a [`DriverError`] naming `operation` if the driver has an
/// error pending.
///
/// Used after calls that are expected to succeed; a pending error there
/// means context state is already corrupt and the caller must not retry.
pub fn check_error<G: GlDriver>(gl: &G, operation: impl Into<String>) -> Result<(), DriverError> {
    match gl.get_error() {
        NO_ERROR => Ok(()),
        code => Err(DriverError {
            operation: operation.into(),
            code,
        }),
    }
}

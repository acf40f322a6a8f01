//! `GlDriver` over a live `glow::Context`.
//!
//! Only available with the `render` feature. Each method forwards to the
//! matching `glow::HasContext` call; the typed arguments of the trait are
//! mapped back to GL enums here.

use glow::HasContext;

use crate::driver::{
    BufferUsage, Capability, ClearMask, GlDriver, ParameterValue, Primitive, ShaderStage,
    TextureParameter, TextureTarget,
};

/// `GL_TEXTURE_EXTERNAL_OES` from `OES_EGL_image_external`.
pub const TEXTURE_EXTERNAL_OES: u32 = 0x8D65;

fn stage_enum(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn target_enum(target: TextureTarget) -> u32 {
    match target {
        TextureTarget::External => TEXTURE_EXTERNAL_OES,
        TextureTarget::Planar2D => glow::TEXTURE_2D,
    }
}

fn parameter_enum(parameter: TextureParameter) -> u32 {
    match parameter {
        TextureParameter::MinFilter => glow::TEXTURE_MIN_FILTER,
        TextureParameter::MagFilter => glow::TEXTURE_MAG_FILTER,
        TextureParameter::WrapS => glow::TEXTURE_WRAP_S,
        TextureParameter::WrapT => glow::TEXTURE_WRAP_T,
    }
}

fn value_enum(value: ParameterValue) -> u32 {
    match value {
        ParameterValue::Linear => glow::LINEAR,
        ParameterValue::Nearest => glow::NEAREST,
        ParameterValue::ClampToEdge => glow::CLAMP_TO_EDGE,
        ParameterValue::Repeat => glow::REPEAT,
    }
}

fn usage_enum(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
        BufferUsage::StreamDraw => glow::STREAM_DRAW,
    }
}

fn capability_enum(capability: Capability) -> u32 {
    match capability {
        Capability::CullFace => glow::CULL_FACE,
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::Blend => glow::BLEND,
    }
}

fn primitive_enum(mode: Primitive) -> u32 {
    match mode {
        Primitive::Triangles => glow::TRIANGLES,
        Primitive::TriangleStrip => glow::TRIANGLE_STRIP,
    }
}

/// Converts a clear mask to GL buffer bits.
pub fn clear_bits(mask: ClearMask) -> u32 {
    let mut bits = 0;
    if mask.color {
        bits |= glow::COLOR_BUFFER_BIT;
    }
    if mask.depth {
        bits |= glow::DEPTH_BUFFER_BIT;
    }
    if mask.stencil {
        bits |= glow::STENCIL_BUFFER_BIT;
    }
    bits
}

// SAFETY (all methods): glow marks raw GL entry points unsafe because they
// require a current context on the calling thread and valid object names.
// `GlDriver` carries the same thread-affinity contract, and every handle
// passed in was produced by this context through the create_* methods.
#[allow(unsafe_code)]
impl GlDriver for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type Texture = glow::Texture;
    type Buffer = glow::Buffer;
    type Framebuffer = glow::Framebuffer;
    type UniformLocation = glow::UniformLocation;

    fn create_shader(&self, stage: ShaderStage) -> Result<glow::Shader, String> {
        unsafe { HasContext::create_shader(self, stage_enum(stage)) }
    }

    fn shader_source(&self, shader: glow::Shader, source: &str) {
        unsafe { HasContext::shader_source(self, shader, source) }
    }

    fn compile_shader(&self, shader: glow::Shader) {
        unsafe { HasContext::compile_shader(self, shader) }
    }

    fn get_shader_compile_status(&self, shader: glow::Shader) -> bool {
        unsafe { HasContext::get_shader_compile_status(self, shader) }
    }

    fn get_shader_info_log(&self, shader: glow::Shader) -> String {
        unsafe { HasContext::get_shader_info_log(self, shader) }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        unsafe { HasContext::delete_shader(self, shader) }
    }

    fn create_program(&self) -> Result<glow::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn attach_shader(&self, program: glow::Program, shader: glow::Shader) {
        unsafe { HasContext::attach_shader(self, program, shader) }
    }

    fn detach_shader(&self, program: glow::Program, shader: glow::Shader) {
        unsafe { HasContext::detach_shader(self, program, shader) }
    }

    fn link_program(&self, program: glow::Program) {
        unsafe { HasContext::link_program(self, program) }
    }

    fn get_program_link_status(&self, program: glow::Program) -> bool {
        unsafe { HasContext::get_program_link_status(self, program) }
    }

    fn get_program_info_log(&self, program: glow::Program) -> String {
        unsafe { HasContext::get_program_info_log(self, program) }
    }

    fn delete_program(&self, program: glow::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn use_program(&self, program: Option<glow::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn get_attrib_location(&self, program: glow::Program, name: &str) -> Option<u32> {
        unsafe { HasContext::get_attrib_location(self, program, name) }
    }

    fn get_uniform_location(
        &self,
        program: glow::Program,
        name: &str,
    ) -> Option<glow::UniformLocation> {
        unsafe { HasContext::get_uniform_location(self, program, name) }
    }

    fn uniform_1_i32(&self, location: Option<&glow::UniformLocation>, value: i32) {
        unsafe { HasContext::uniform_1_i32(self, location, value) }
    }

    fn uniform_2_f32(&self, location: Option<&glow::UniformLocation>, x: f32, y: f32) {
        unsafe { HasContext::uniform_2_f32(self, location, x, y) }
    }

    fn uniform_matrix_4_f32(&self, location: Option<&glow::UniformLocation>, matrix: &[f32; 16]) {
        unsafe { HasContext::uniform_matrix_4_f32_slice(self, location, false, matrix) }
    }

    fn create_texture(&self) -> Result<glow::Texture, String> {
        unsafe { HasContext::create_texture(self) }
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<glow::Texture>) {
        unsafe { HasContext::bind_texture(self, target_enum(target), texture) }
    }

    fn tex_parameter(
        &self,
        target: TextureTarget,
        parameter: TextureParameter,
        value: ParameterValue,
    ) {
        unsafe {
            HasContext::tex_parameter_i32(
                self,
                target_enum(target),
                parameter_enum(parameter),
                value_enum(value) as i32,
            )
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { HasContext::active_texture(self, glow::TEXTURE0 + unit) }
    }

    fn delete_texture(&self, texture: glow::Texture) {
        unsafe { HasContext::delete_texture(self, texture) }
    }

    fn create_buffer(&self) -> Result<glow::Buffer, String> {
        unsafe { HasContext::create_buffer(self) }
    }

    fn bind_array_buffer(&self, buffer: Option<glow::Buffer>) {
        unsafe { HasContext::bind_buffer(self, glow::ARRAY_BUFFER, buffer) }
    }

    fn array_buffer_data_f32(&self, data: &[f32], usage: BufferUsage) {
        unsafe {
            HasContext::buffer_data_u8_slice(
                self,
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                usage_enum(usage),
            )
        }
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        unsafe { HasContext::delete_buffer(self, buffer) }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        unsafe {
            HasContext::vertex_attrib_pointer_f32(
                self,
                index,
                size,
                glow::FLOAT,
                false,
                stride,
                offset,
            )
        }
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::enable_vertex_attrib_array(self, index) }
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        unsafe { HasContext::disable_vertex_attrib_array(self, index) }
    }

    fn bind_framebuffer(&self, framebuffer: Option<glow::Framebuffer>) {
        unsafe { HasContext::bind_framebuffer(self, glow::FRAMEBUFFER, framebuffer) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        unsafe { HasContext::clear_color(self, red, green, blue, alpha) }
    }

    fn clear(&self, mask: ClearMask) {
        unsafe { HasContext::clear(self, clear_bits(mask)) }
    }

    fn disable(&self, capability: Capability) {
        unsafe { HasContext::disable(self, capability_enum(capability)) }
    }

    fn draw_arrays(&self, mode: Primitive, first: i32, count: i32) {
        unsafe { HasContext::draw_arrays(self, primitive_enum(mode), first, count) }
    }

    fn get_error(&self) -> u32 {
        unsafe { HasContext::get_error(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Everything past the enum mapping needs a current GL context.

    #[test]
    fn external_target_maps_to_oes_enum() {
        assert_eq!(target_enum(TextureTarget::External), 0x8D65);
        assert_eq!(target_enum(TextureTarget::Planar2D), glow::TEXTURE_2D);
    }

    #[test]
    fn color_mask_maps_to_color_bit_only() {
        assert_eq!(clear_bits(ClearMask::COLOR), glow::COLOR_BUFFER_BIT);
    }

    #[test]
    fn full_mask_sets_all_bits() {
        let mask = ClearMask {
            color: true,
            depth: true,
            stencil: true,
        };
        assert_eq!(
            clear_bits(mask),
            glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT
        );
    }

    #[test]
    fn sampling_parameters_map_to_gl_enums() {
        assert_eq!(parameter_enum(TextureParameter::MinFilter), glow::TEXTURE_MIN_FILTER);
        assert_eq!(value_enum(ParameterValue::ClampToEdge), glow::CLAMP_TO_EDGE);
        assert_eq!(usage_enum(BufferUsage::StaticDraw), glow::STATIC_DRAW);
    }

    #[test]
    fn glow_context_implements_driver() {
        fn _assert_driver<G: GlDriver>() {}
        _assert_driver::<glow::Context>();
    }
}

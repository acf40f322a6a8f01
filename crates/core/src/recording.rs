//! In-memory `GlDriver` that records every state-changing call.
//!
//! `RecordingDriver` hands out sequential non-zero names, tracks which
//! shaders, programs, textures and buffers are still alive, and can be told
//! to fail specific steps (compile, link, allocation, post-link error state).
//! Tests assert on the recorded call sequence and the live-object counts;
//! the CLI prints the sequence as a trace.
//!
//! Query calls (`get_*`) are not recorded.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::driver::{
    BufferUsage, Capability, ClearMask, GlDriver, ParameterValue, Primitive, ShaderStage,
    TextureParameter, TextureTarget, NO_ERROR,
};

/// One recorded driver call. Object names are the recorder's `u32` handles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum GlCall {
    CreateShader { stage: ShaderStage, shader: u32 },
    ShaderSource { shader: u32 },
    CompileShader { shader: u32 },
    DeleteShader { shader: u32 },
    CreateProgram { program: u32 },
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    LinkProgram { program: u32 },
    DeleteProgram { program: u32 },
    UseProgram { program: Option<u32> },
    Uniform1i { location: Option<u32>, value: i32 },
    Uniform2f { location: Option<u32>, x: f32, y: f32 },
    UniformMatrix4 { location: Option<u32> },
    CreateTexture { texture: u32 },
    BindTexture { target: TextureTarget, texture: Option<u32> },
    TexParameter {
        target: TextureTarget,
        parameter: TextureParameter,
        value: ParameterValue,
    },
    ActiveTexture { unit: u32 },
    DeleteTexture { texture: u32 },
    CreateBuffer { buffer: u32 },
    BindArrayBuffer { buffer: Option<u32> },
    ArrayBufferData { floats: usize, usage: BufferUsage },
    DeleteBuffer { buffer: u32 },
    VertexAttribPointer { index: u32, size: i32, stride: i32, offset: i32 },
    EnableVertexAttribArray { index: u32 },
    DisableVertexAttribArray { index: u32 },
    BindFramebuffer { framebuffer: Option<u32> },
    Viewport { x: i32, y: i32, width: i32, height: i32 },
    ClearColor { red: f32, green: f32, blue: f32, alpha: f32 },
    Clear { mask: ClearMask },
    Disable { capability: Capability },
    DrawArrays { mode: Primitive, first: i32, count: i32 },
}

fn opt(name: &Option<u32>) -> String {
    name.map_or_else(|| "0".to_string(), |n| n.to_string())
}

impl fmt::Display for GlCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlCall::CreateShader { stage, shader } => {
                write!(f, "glCreateShader({stage}) -> {shader}")
            }
            GlCall::ShaderSource { shader } => write!(f, "glShaderSource({shader})"),
            GlCall::CompileShader { shader } => write!(f, "glCompileShader({shader})"),
            GlCall::DeleteShader { shader } => write!(f, "glDeleteShader({shader})"),
            GlCall::CreateProgram { program } => write!(f, "glCreateProgram() -> {program}"),
            GlCall::AttachShader { program, shader } => {
                write!(f, "glAttachShader({program}, {shader})")
            }
            GlCall::DetachShader { program, shader } => {
                write!(f, "glDetachShader({program}, {shader})")
            }
            GlCall::LinkProgram { program } => write!(f, "glLinkProgram({program})"),
            GlCall::DeleteProgram { program } => write!(f, "glDeleteProgram({program})"),
            GlCall::UseProgram { program } => write!(f, "glUseProgram({})", opt(program)),
            GlCall::Uniform1i { location, value } => {
                write!(f, "glUniform1i({}, {value})", opt(location))
            }
            GlCall::Uniform2f { location, x, y } => {
                write!(f, "glUniform2f({}, {x}, {y})", opt(location))
            }
            GlCall::UniformMatrix4 { location } => {
                write!(f, "glUniformMatrix4fv({})", opt(location))
            }
            GlCall::CreateTexture { texture } => write!(f, "glGenTextures() -> {texture}"),
            GlCall::BindTexture { target, texture } => {
                write!(f, "glBindTexture({target:?}, {})", opt(texture))
            }
            GlCall::TexParameter {
                target,
                parameter,
                value,
            } => write!(f, "glTexParameter({target:?}, {parameter:?}, {value:?})"),
            GlCall::ActiveTexture { unit } => write!(f, "glActiveTexture(TEXTURE{unit})"),
            GlCall::DeleteTexture { texture } => write!(f, "glDeleteTextures({texture})"),
            GlCall::CreateBuffer { buffer } => write!(f, "glGenBuffers() -> {buffer}"),
            GlCall::BindArrayBuffer { buffer } => {
                write!(f, "glBindBuffer(ARRAY_BUFFER, {})", opt(buffer))
            }
            GlCall::ArrayBufferData { floats, usage } => {
                write!(f, "glBufferData(ARRAY_BUFFER, {floats} floats, {usage:?})")
            }
            GlCall::DeleteBuffer { buffer } => write!(f, "glDeleteBuffers({buffer})"),
            GlCall::VertexAttribPointer {
                index,
                size,
                stride,
                offset,
            } => write!(
                f,
                "glVertexAttribPointer({index}, {size}, FLOAT, false, {stride}, {offset})"
            ),
            GlCall::EnableVertexAttribArray { index } => {
                write!(f, "glEnableVertexAttribArray({index})")
            }
            GlCall::DisableVertexAttribArray { index } => {
                write!(f, "glDisableVertexAttribArray({index})")
            }
            GlCall::BindFramebuffer { framebuffer } => {
                write!(f, "glBindFramebuffer(FRAMEBUFFER, {})", opt(framebuffer))
            }
            GlCall::Viewport {
                x,
                y,
                width,
                height,
            } => write!(f, "glViewport({x}, {y}, {width}, {height})"),
            GlCall::ClearColor {
                red,
                green,
                blue,
                alpha,
            } => write!(f, "glClearColor({red}, {green}, {blue}, {alpha})"),
            GlCall::Clear { mask } => write!(
                f,
                "glClear(color={}, depth={}, stencil={})",
                mask.color, mask.depth, mask.stencil
            ),
            GlCall::Disable { capability } => write!(f, "glDisable({capability:?})"),
            GlCall::DrawArrays { mode, first, count } => {
                write!(f, "glDrawArrays({mode:?}, {first}, {count})")
            }
        }
    }
}

#[derive(Debug)]
struct ShaderObject {
    stage: ShaderStage,
    source: String,
    compiled: bool,
}

#[derive(Debug, Default)]
struct ProgramObject {
    attached: Vec<u32>,
    linked: bool,
    source: String,
}

#[derive(Debug, Default)]
struct State {
    last_name: u32,
    calls: Vec<GlCall>,
    shaders: BTreeMap<u32, ShaderObject>,
    programs: BTreeMap<u32, ProgramObject>,
    textures: BTreeSet<u32>,
    buffers: BTreeSet<u32>,
    attribs: HashMap<(u32, String), u32>,
    uniforms: HashMap<(u32, String), u32>,
    pending_error: u32,

    failing_stages: HashSet<ShaderStage>,
    fail_link: bool,
    refuse_shaders: bool,
    refuse_programs: bool,
    refuse_textures: bool,
    error_after_link: Option<u32>,
}

impl State {
    fn next_name(&mut self) -> u32 {
        self.last_name += 1;
        self.last_name
    }

    fn record(&mut self, call: GlCall) {
        self.calls.push(call);
    }
}

/// A `GlDriver` that records calls instead of talking to a GPU.
///
/// Not `Sync`: like a real context it belongs to one thread.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    state: RefCell<State>,
}

impl RecordingDriver {
    /// Creates a driver on which every operation succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every shader of `stage` fail to compile.
    pub fn with_compile_failure(mut self, stage: ShaderStage) -> Self {
        self.state.get_mut().failing_stages.insert(stage);
        self
    }

    /// Makes every link fail.
    pub fn with_link_failure(mut self) -> Self {
        self.state.get_mut().fail_link = true;
        self
    }

    /// Makes `create_shader` refuse to allocate.
    pub fn with_shader_allocation_failure(mut self) -> Self {
        self.state.get_mut().refuse_shaders = true;
        self
    }

    /// Makes `create_program` refuse to allocate.
    pub fn with_program_allocation_failure(mut self) -> Self {
        self.state.get_mut().refuse_programs = true;
        self
    }

    /// Makes `create_texture` refuse to allocate.
    pub fn with_texture_allocation_failure(mut self) -> Self {
        self.state.get_mut().refuse_textures = true;
        self
    }

    /// Flags `code` in the error state whenever a program is linked.
    pub fn with_error_after_link(mut self, code: u32) -> Self {
        self.state.get_mut().error_after_link = Some(code);
        self
    }

    /// Flags `code` in the error state, as if the last call had failed.
    pub fn raise_error(&self, code: u32) {
        let mut state = self.state.borrow_mut();
        if state.pending_error == NO_ERROR {
            state.pending_error = code;
        }
    }

    /// Returns a copy of every call recorded so far.
    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    /// Returns the recorded calls and starts a fresh log.
    pub fn take_calls(&self) -> Vec<GlCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Total number of driver objects not yet deleted.
    pub fn live_objects(&self) -> usize {
        self.live_shaders() + self.live_programs() + self.live_textures() + self.live_buffers()
    }
}

impl GlDriver for RecordingDriver {
    type Shader = u32;
    type Program = u32;
    type Texture = u32;
    type Buffer = u32;
    type Framebuffer = u32;
    type UniformLocation = u32;

    fn create_shader(&self, stage: ShaderStage) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        if state.refuse_shaders {
            return Err("glCreateShader returned 0".to_string());
        }
        let shader = state.next_name();
        state.shaders.insert(
            shader,
            ShaderObject {
                stage,
                source: String::new(),
                compiled: false,
            },
        );
        state.record(GlCall::CreateShader { stage, shader });
        Ok(shader)
    }

    fn shader_source(&self, shader: u32, source: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.shaders.get_mut(&shader) {
            object.source = source.to_string();
        }
        state.record(GlCall::ShaderSource { shader });
    }

    fn compile_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        let failing = state.failing_stages.clone();
        if let Some(object) = state.shaders.get_mut(&shader) {
            object.compiled = !failing.contains(&object.stage) && !object.source.trim().is_empty();
        }
        state.record(GlCall::CompileShader { shader });
    }

    fn get_shader_compile_status(&self, shader: u32) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.compiled)
    }

    fn get_shader_info_log(&self, shader: u32) -> String {
        match self.state.borrow().shaders.get(&shader) {
            Some(s) if !s.compiled => format!("ERROR: 0:1: {} shader rejected", s.stage),
            _ => String::new(),
        }
    }

    fn delete_shader(&self, shader: u32) {
        let mut state = self.state.borrow_mut();
        state.shaders.remove(&shader);
        state.record(GlCall::DeleteShader { shader });
    }

    fn create_program(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        if state.refuse_programs {
            return Err("glCreateProgram returned 0".to_string());
        }
        let program = state.next_name();
        state.programs.insert(program, ProgramObject::default());
        state.record(GlCall::CreateProgram { program });
        Ok(program)
    }

    fn attach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.programs.get_mut(&program) {
            object.attached.push(shader);
        }
        state.record(GlCall::AttachShader { program, shader });
    }

    fn detach_shader(&self, program: u32, shader: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(object) = state.programs.get_mut(&program) {
            object.attached.retain(|&s| s != shader);
        }
        state.record(GlCall::DetachShader { program, shader });
    }

    fn link_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        let attached = state
            .programs
            .get(&program)
            .map(|p| p.attached.clone())
            .unwrap_or_default();
        let stages_ok = attached
            .iter()
            .all(|s| state.shaders.get(s).is_some_and(|o| o.compiled));
        let source: String = attached
            .iter()
            .filter_map(|s| state.shaders.get(s))
            .map(|o| o.source.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let linked = !state.fail_link && !attached.is_empty() && stages_ok;
        if let Some(object) = state.programs.get_mut(&program) {
            object.linked = linked;
            object.source = source;
        }
        if linked {
            if let Some(code) = state.error_after_link {
                if state.pending_error == NO_ERROR {
                    state.pending_error = code;
                }
            }
        }
        state.record(GlCall::LinkProgram { program });
    }

    fn get_program_link_status(&self, program: u32) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    fn get_program_info_log(&self, program: u32) -> String {
        match self.state.borrow().programs.get(&program) {
            Some(p) if !p.linked => "ERROR: Linking failed: varying mismatch".to_string(),
            _ => String::new(),
        }
    }

    fn delete_program(&self, program: u32) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        state.attribs.retain(|(p, _), _| *p != program);
        state.uniforms.retain(|(p, _), _| *p != program);
        state.record(GlCall::DeleteProgram { program });
    }

    fn use_program(&self, program: Option<u32>) {
        self.state
            .borrow_mut()
            .record(GlCall::UseProgram { program });
    }

    fn get_attrib_location(&self, program: u32, name: &str) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let declared = state
            .programs
            .get(&program)
            .is_some_and(|p| p.linked && p.source.contains(name));
        if !declared {
            return None;
        }
        let next = state.attribs.keys().filter(|(p, _)| *p == program).count() as u32;
        Some(*state.attribs.entry((program, name.to_string())).or_insert(next))
    }

    fn get_uniform_location(&self, program: u32, name: &str) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let declared = state
            .programs
            .get(&program)
            .is_some_and(|p| p.linked && p.source.contains(name));
        if !declared {
            return None;
        }
        let next = state.uniforms.keys().filter(|(p, _)| *p == program).count() as u32;
        Some(*state.uniforms.entry((program, name.to_string())).or_insert(next))
    }

    fn uniform_1_i32(&self, location: Option<&u32>, value: i32) {
        self.state.borrow_mut().record(GlCall::Uniform1i {
            location: location.copied(),
            value,
        });
    }

    fn uniform_2_f32(&self, location: Option<&u32>, x: f32, y: f32) {
        self.state.borrow_mut().record(GlCall::Uniform2f {
            location: location.copied(),
            x,
            y,
        });
    }

    fn uniform_matrix_4_f32(&self, location: Option<&u32>, _matrix: &[f32; 16]) {
        self.state.borrow_mut().record(GlCall::UniformMatrix4 {
            location: location.copied(),
        });
    }

    fn create_texture(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        if state.refuse_textures {
            return Err("glGenTextures produced no name".to_string());
        }
        let texture = state.next_name();
        state.textures.insert(texture);
        state.record(GlCall::CreateTexture { texture });
        Ok(texture)
    }

    fn bind_texture(&self, target: TextureTarget, texture: Option<u32>) {
        self.state
            .borrow_mut()
            .record(GlCall::BindTexture { target, texture });
    }

    fn tex_parameter(
        &self,
        target: TextureTarget,
        parameter: TextureParameter,
        value: ParameterValue,
    ) {
        self.state.borrow_mut().record(GlCall::TexParameter {
            target,
            parameter,
            value,
        });
    }

    fn active_texture(&self, unit: u32) {
        self.state
            .borrow_mut()
            .record(GlCall::ActiveTexture { unit });
    }

    fn delete_texture(&self, texture: u32) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture);
        state.record(GlCall::DeleteTexture { texture });
    }

    fn create_buffer(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        let buffer = state.next_name();
        state.buffers.insert(buffer);
        state.record(GlCall::CreateBuffer { buffer });
        Ok(buffer)
    }

    fn bind_array_buffer(&self, buffer: Option<u32>) {
        self.state
            .borrow_mut()
            .record(GlCall::BindArrayBuffer { buffer });
    }

    fn array_buffer_data_f32(&self, data: &[f32], usage: BufferUsage) {
        self.state.borrow_mut().record(GlCall::ArrayBufferData {
            floats: data.len(),
            usage,
        });
    }

    fn delete_buffer(&self, buffer: u32) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer);
        state.record(GlCall::DeleteBuffer { buffer });
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, stride: i32, offset: i32) {
        self.state.borrow_mut().record(GlCall::VertexAttribPointer {
            index,
            size,
            stride,
            offset,
        });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.state
            .borrow_mut()
            .record(GlCall::EnableVertexAttribArray { index });
    }

    fn disable_vertex_attrib_array(&self, index: u32) {
        self.state
            .borrow_mut()
            .record(GlCall::DisableVertexAttribArray { index });
    }

    fn bind_framebuffer(&self, framebuffer: Option<u32>) {
        self.state
            .borrow_mut()
            .record(GlCall::BindFramebuffer { framebuffer });
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.state.borrow_mut().record(GlCall::Viewport {
            x,
            y,
            width,
            height,
        });
    }

    fn clear_color(&self, red: f32, green: f32, blue: f32, alpha: f32) {
        self.state.borrow_mut().record(GlCall::ClearColor {
            red,
            green,
            blue,
            alpha,
        });
    }

    fn clear(&self, mask: ClearMask) {
        self.state.borrow_mut().record(GlCall::Clear { mask });
    }

    fn disable(&self, capability: Capability) {
        self.state
            .borrow_mut()
            .record(GlCall::Disable { capability });
    }

    fn draw_arrays(&self, mode: Primitive, first: i32, count: i32) {
        self.state
            .borrow_mut()
            .record(GlCall::DrawArrays { mode, first, count });
    }

    fn get_error(&self) -> u32 {
        std::mem::replace(&mut self.state.borrow_mut().pending_error, NO_ERROR)
    }
}

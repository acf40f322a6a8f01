//! Shader compilation and program linking.
//!
//! [`build_program`] drives the compile → link → validate protocol and
//! guarantees that no shader object outlives the call, whichever stage
//! fails. Compile and link failures are ordinary errors carrying the
//! driver's info log; allocation refusals and a dirty error state after a
//! successful link are fatal.

use thiserror::Error;
use tracing::{debug, error};

use crate::driver::{check_error, GlDriver, ShaderStage};
use crate::error::DriverError;

/// Errors that can occur while building a shader program.
#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    #[error("shader compile error ({stage}):\n{log}")]
    CompileError {
        /// The stage that failed.
        stage: ShaderStage,
        /// Numbered source followed by the driver's info log.
        log: String,
    },
    /// The program failed to link.
    #[error("shader link error:\n{0}")]
    LinkError(String),
    /// The driver refused to create a shader or program object.
    #[error("failed to allocate {object}: {reason}")]
    Allocation { object: &'static str, reason: String },
    /// The driver flagged an error during an operation that should succeed.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ShaderError {
    /// Compile and link failures depend on the source and may be retried
    /// with different code. Everything else indicates exhaustion or state
    /// corruption.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ShaderError::CompileError { .. } | ShaderError::LinkError(_)
        )
    }
}

/// Formats a shader compilation error for human-readable debugging.
///
/// Prepends right-aligned line numbers to each line of `source`, then
/// appends the driver's error `log`, so line references in the log can be
/// matched against the GLSL.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let source_lines: Vec<&str> = source.lines().collect();
    let width = source_lines.len().max(1).to_string().len();

    let numbered: String = source_lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1, width = width))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

/// Compiles a single shader stage.
///
/// On failure the shader object is deleted before returning, and the
/// diagnostic is logged at `error` level.
///
/// # Errors
///
/// `ShaderError::CompileError` if the source is rejected;
/// `ShaderError::Allocation` or `ShaderError::Driver` if the driver cannot
/// create the shader object.
pub fn compile_shader<G: GlDriver>(
    gl: &G,
    stage: ShaderStage,
    source: &str,
) -> Result<G::Shader, ShaderError> {
    let shader = gl
        .create_shader(stage)
        .map_err(|reason| ShaderError::Allocation {
            object: "shader",
            reason,
        })?;
    if let Err(e) = check_error(gl, format!("glCreateShader type={stage}")) {
        gl.delete_shader(shader);
        return Err(e.into());
    }

    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if gl.get_shader_compile_status(shader) {
        Ok(shader)
    } else {
        let info_log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        error!(%stage, log = %info_log, "could not compile shader");
        Err(ShaderError::CompileError {
            stage,
            log: format_shader_error(source, &info_log),
        })
    }
}

/// Links a vertex and fragment shader into a program.
///
/// Attaches both shaders, links, and detaches them again; the caller still
/// owns and must delete the shaders. A program that fails to link is
/// deleted here.
///
/// # Errors
///
/// `ShaderError::Allocation` if no program object can be created (nothing is
/// attached in that case), `ShaderError::LinkError` if linking fails.
pub fn link_program<G: GlDriver>(
    gl: &G,
    vertex: G::Shader,
    fragment: G::Shader,
) -> Result<G::Program, ShaderError> {
    let program = gl
        .create_program()
        .map_err(|reason| ShaderError::Allocation {
            object: "program",
            reason,
        })?;

    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    gl.detach_shader(program, vertex);
    gl.detach_shader(program, fragment);

    if gl.get_program_link_status(program) {
        Ok(program)
    } else {
        let info_log = gl.get_program_info_log(program);
        gl.delete_program(program);
        error!(log = %info_log, "error linking program");
        Err(ShaderError::LinkError(info_log))
    }
}

/// Compiles vertex and fragment sources and links them into a program.
///
/// The fragment stage is only compiled once the vertex stage succeeded.
/// Both shader objects are deleted before returning on every path; on
/// success the caller owns the returned program.
///
/// After a successful link the driver error state must be clean. If it is
/// not, the program is deleted and a fatal `ShaderError::Driver` naming
/// `"link program"` is returned.
///
/// # Errors
///
/// See [`ShaderError`]; use [`ShaderError::is_recoverable`] to tell bad
/// source apart from driver failure.
pub fn build_program<G: GlDriver>(
    gl: &G,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<G::Program, ShaderError> {
    let vert = compile_shader(gl, ShaderStage::Vertex, vertex_src)?;
    let frag = match compile_shader(gl, ShaderStage::Fragment, fragment_src) {
        Ok(f) => f,
        Err(e) => {
            gl.delete_shader(vert);
            return Err(e);
        }
    };

    let result = link_program(gl, vert, frag);

    // The linked program keeps its own copy of the binaries.
    gl.delete_shader(vert);
    gl.delete_shader(frag);

    let program = result?;
    if let Err(e) = check_error(gl, "link program") {
        gl.delete_program(program);
        return Err(e.into());
    }

    debug!(?program, "built shader program");
    Ok(program)
}

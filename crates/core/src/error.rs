//! Error types for the vidgl core.

use thiserror::Error;

use crate::shader::ShaderError;

/// The driver reported an error after an operation expected to succeed.
///
/// Always fatal: it means the context state is corrupt, not that the input
/// was bad. Carries the failing operation's name and the raw GL error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation}: glError 0x{code:X}")]
pub struct DriverError {
    /// Name of the operation after which the error was observed.
    pub operation: String,
    /// Raw `glGetError` value.
    pub code: u32,
}

/// Errors produced by the texture, buffer and drawing helpers.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Building a shader program failed.
    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// The driver flagged an unexpected error state.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// A sampler slot outside `0..max` was rejected by [`SlotPolicy::Reject`](crate::texture::SlotPolicy).
    #[error("sampler slot {slot} is outside the supported range 0..{max}")]
    SlotOutOfRange { slot: u32, max: u32 },

    /// The driver refused to allocate an object.
    #[error("failed to allocate {object}: {reason}")]
    Allocation { object: &'static str, reason: String },

    /// A vertex attribute the program must expose was optimized out or misspelled.
    #[error("attribute not found in program: {0}")]
    MissingAttribute(String),

    /// Drawer configuration could not be parsed or is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl RenderError {
    /// Whether this error indicates driver state corruption or resource
    /// exhaustion rather than bad input.
    pub fn is_fatal(&self) -> bool {
        match self {
            RenderError::Shader(e) => !e.is_recoverable(),
            RenderError::Driver(_) | RenderError::Allocation { .. } => true,
            RenderError::SlotOutOfRange { .. }
            | RenderError::MissingAttribute(_)
            | RenderError::InvalidConfig(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ShaderStage;

    #[test]
    fn driver_error_displays_operation_and_hex_code() {
        let err = DriverError {
            operation: "glBindTexture 3".into(),
            code: 0x0502,
        };
        assert_eq!(err.to_string(), "glBindTexture 3: glError 0x502");
    }

    #[test]
    fn slot_out_of_range_includes_slot_and_bound() {
        let err = RenderError::SlotOutOfRange { slot: 12, max: 10 };
        let msg = format!("{err}");
        assert!(msg.contains("12"), "missing slot in: {msg}");
        assert!(msg.contains("10"), "missing bound in: {msg}");
    }

    #[test]
    fn allocation_includes_object_and_reason() {
        let err = RenderError::Allocation {
            object: "buffer",
            reason: "out of memory".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("buffer"), "missing object in: {msg}");
        assert!(msg.contains("out of memory"), "missing reason in: {msg}");
    }

    #[test]
    fn shader_errors_display_transparently() {
        let err = RenderError::from(ShaderError::LinkError("varying mismatch".into()));
        assert!(err.to_string().contains("varying mismatch"));
    }

    #[test]
    fn compile_failures_are_not_fatal() {
        let err = RenderError::from(ShaderError::CompileError {
            stage: ShaderStage::Fragment,
            log: "syntax error".into(),
        });
        assert!(!err.is_fatal());
    }

    #[test]
    fn driver_errors_are_fatal() {
        let err = RenderError::from(DriverError {
            operation: "op".into(),
            code: 0x0500,
        });
        assert!(err.is_fatal());
    }

    #[test]
    fn driver_error_inside_shader_error_is_fatal() {
        let err = RenderError::from(ShaderError::Driver(DriverError {
            operation: "link program".into(),
            code: 0x0501,
        }));
        assert!(err.is_fatal());
    }

    #[test]
    fn input_errors_are_not_fatal() {
        assert!(!RenderError::SlotOutOfRange { slot: 10, max: 10 }.is_fatal());
        assert!(!RenderError::MissingAttribute("a_position".into()).is_fatal());
        assert!(!RenderError::InvalidConfig("bad".into()).is_fatal());
    }

    #[test]
    fn render_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RenderError>();
    }

    #[test]
    fn render_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<RenderError>();
    }
}

#![deny(unsafe_code)]
//! GL resource helpers for a video compositing pipeline.
//!
//! Builds shader programs (compile → link → validate), allocates external
//! textures, binds textures to sampler uniforms through texture units,
//! uploads vertex data and clears render targets. All GL access goes through
//! the [`GlDriver`] trait, implemented for `glow::Context` with the `render`
//! feature and by [`RecordingDriver`] for tests and call tracing.
//!
//! Every call must happen on the thread that owns the current context.

pub mod blur;
pub mod buffer;
pub mod config;
pub mod driver;
pub mod error;
pub mod frame;
pub mod quad;
pub mod recording;
pub mod shader;
pub mod texture;
pub mod viewport;

#[cfg(feature = "render")]
pub mod glow_driver;

pub use blur::{BlurDrawer, BlurPass};
pub use buffer::{create_vertex_buffer, upload_vertex_buffer};
pub use config::DrawerConfig;
pub use driver::{check_error, GlDriver, ShaderStage, TextureTarget};
pub use error::{DriverError, RenderError};
pub use frame::FrameDrawer;
pub use recording::{GlCall, RecordingDriver};
pub use shader::{build_program, compile_shader, format_shader_error, link_program, ShaderError};
pub use texture::{
    create_external_texture, SamplerSlot, SlotPolicy, TextureBinder, MAX_SAMPLER_SLOTS,
};
pub use viewport::{clear_viewport, viewport_extent};

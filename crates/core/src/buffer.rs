//! Vertex buffer layout and upload.
//!
//! Geometry is uploaded as tightly packed `f32` arrays: positions carry
//! [`COORDS_PER_VERTEX`] components, texture coordinates
//! [`COORDS_UV_PER_TEXTURE`]. Shaders consuming these buffers must use the
//! matching strides.

use tracing::debug;

use crate::driver::{BufferUsage, GlDriver};
use crate::error::RenderError;

/// Size of one `f32` component in bytes.
pub const FLOAT_SIZE: i32 = std::mem::size_of::<f32>() as i32;

/// Components per vertex position (x, y, z).
pub const COORDS_PER_VERTEX: i32 = 3;

/// Components per texture coordinate (u, v).
pub const COORDS_UV_PER_TEXTURE: i32 = 2;

/// Byte stride of one vertex position.
pub const VERTEX_STRIDE: i32 = COORDS_PER_VERTEX * FLOAT_SIZE;

/// Byte stride of one texture coordinate.
pub const TEXTURE_STRIDE: i32 = COORDS_UV_PER_TEXTURE * FLOAT_SIZE;

/// Uploads `data` into `buffer` as a static array buffer.
///
/// `buffer` must have been created on this context; the buffer is left
/// bound to `ARRAY_BUFFER`.
pub fn upload_vertex_buffer<G: GlDriver>(gl: &G, buffer: G::Buffer, data: &[f32]) {
    gl.bind_array_buffer(Some(buffer));
    gl.array_buffer_data_f32(data, BufferUsage::StaticDraw);
}

/// Allocates a buffer and uploads `data` into it.
///
/// # Errors
///
/// `RenderError::Allocation` if the driver refuses to create the buffer.
pub fn create_vertex_buffer<G: GlDriver>(gl: &G, data: &[f32]) -> Result<G::Buffer, RenderError> {
    let buffer = gl.create_buffer().map_err(|reason| RenderError::Allocation {
        object: "buffer",
        reason,
    })?;
    upload_vertex_buffer(gl, buffer, data);
    debug!(?buffer, floats = data.len(), "uploaded vertex buffer");
    Ok(buffer)
}

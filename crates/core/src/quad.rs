//! Full-viewport quad geometry for textured passes.
//!
//! The quad is drawn as a 4-vertex `TRIANGLE_STRIP` in clip space at depth
//! 0. [`QUAD_UV`] is the default texture mapping; [`QUAD_UV_FLIPPED`]
//! mirrors it vertically.

const DEPTH: f32 = 0.0;

/// Number of vertices in the strip.
pub const QUAD_VERTEX_COUNT: i32 = 4;

/// Clip-space positions, [`COORDS_PER_VERTEX`](crate::buffer::COORDS_PER_VERTEX) floats each.
pub const QUAD_POSITIONS: [f32; 12] = [
    -1.0, -1.0, DEPTH, //
    1.0, -1.0, DEPTH, //
    -1.0, 1.0, DEPTH, //
    1.0, 1.0, DEPTH,
];

/// Default texture coordinates, [`COORDS_UV_PER_TEXTURE`](crate::buffer::COORDS_UV_PER_TEXTURE) floats each.
pub const QUAD_UV: [f32; 8] = [
    0.0, 1.0, //
    1.0, 1.0, //
    0.0, 0.0, //
    1.0, 0.0,
];

/// [`QUAD_UV`] mirrored in v.
pub const QUAD_UV_FLIPPED: [f32; 8] = [
    0.0, 0.0, //
    1.0, 0.0, //
    0.0, 1.0, //
    1.0, 1.0,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{COORDS_PER_VERTEX, COORDS_UV_PER_TEXTURE};

    #[test]
    fn positions_hold_one_vertex_per_strip_corner() {
        assert_eq!(
            QUAD_POSITIONS.len() as i32,
            QUAD_VERTEX_COUNT * COORDS_PER_VERTEX
        );
    }

    #[test]
    fn uv_sets_hold_one_pair_per_vertex() {
        let expected = (QUAD_VERTEX_COUNT * COORDS_UV_PER_TEXTURE) as usize;
        assert_eq!(QUAD_UV.len(), expected);
        assert_eq!(QUAD_UV_FLIPPED.len(), expected);
    }

    #[test]
    fn flipped_uvs_mirror_v() {
        for (a, b) in QUAD_UV.chunks(2).zip(QUAD_UV_FLIPPED.chunks(2)) {
            assert_eq!(a[0], b[0], "u must match");
            assert_eq!(a[1], 1.0 - b[1], "v must be mirrored");
        }
    }

    #[test]
    fn positions_lie_on_the_depth_plane() {
        assert!(QUAD_POSITIONS.chunks(3).all(|v| v[2] == DEPTH));
    }
}

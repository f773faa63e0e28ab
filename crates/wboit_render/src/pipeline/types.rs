//! GPU-compatible data types for the OIT programs
//!
//! These types are designed to match the shader layouts exactly.
//! All types derive Pod and Zeroable for safe GPU buffer operations.

use bytemuck::{Pod, Zeroable};
use wboit_math::Mat4;

use crate::scene::{GlyphSegment, GLYPH_SEGMENT_COUNT, SPRITE_PALETTE, SPRITE_PALETTE_LEN};

/// A vertex of the shared unit quad (attribute slot 0)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
}

impl QuadVertex {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }
}

/// Opaque program uniforms
/// Layout: 240 bytes (must match opaque.wgsl GlyphUniforms)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GlyphUniforms {
    /// Per-instance `(scale.xy, offset.xy)`
    pub segments: [[f32; 4]; GLYPH_SEGMENT_COUNT],
    /// Solid fill color
    pub color: [f32; 4],
}

impl GlyphUniforms {
    pub fn new(segments: &[GlyphSegment; GLYPH_SEGMENT_COUNT], color: [f32; 4]) -> Self {
        let mut packed = [[0.0; 4]; GLYPH_SEGMENT_COUNT];
        for (dst, segment) in packed.iter_mut().zip(segments) {
            *dst = segment.packed();
        }
        Self {
            segments: packed,
            color,
        }
    }
}

/// Accumulate program per-frame uniforms
/// Layout: 80 bytes (must match accumulate.wgsl SpriteUniforms)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SpriteUniforms {
    /// Projection matrix (64 bytes)
    pub projection: Mat4,
    /// Animation time in seconds
    pub time: f32,
    /// Padding to the 16-byte struct alignment
    pub _padding: [f32; 3],
}

impl SpriteUniforms {
    pub fn new(projection: Mat4, time: f32) -> Self {
        Self {
            projection,
            time,
            _padding: [0.0; 3],
        }
    }
}

/// Accumulate program color table
/// Layout: 96 bytes (must match accumulate.wgsl SpritePalette)
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct SpritePalette {
    pub colors: [[f32; 4]; SPRITE_PALETTE_LEN],
}

impl Default for SpritePalette {
    fn default() -> Self {
        Self {
            colors: SPRITE_PALETTE,
        }
    }
}

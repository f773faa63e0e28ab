//! Fixed scene content
//!
//! Per-instance tables live here on the host and are uploaded once as uniform
//! arrays; the vertex stages index them with the instance ordinal.

/// Number of quads making up the opaque glyph
pub const GLYPH_SEGMENT_COUNT: usize = 14;

/// Number of entries in the sprite color palette
pub const SPRITE_PALETTE_LEN: usize = 6;

/// Eye-space depth of the sprite orbit center
pub const SPRITE_ORBIT_DEPTH: f32 = -3.0;

/// One opaque quad of the glyph: the unit quad is scaled then offset, directly in clip space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphSegment {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
}

impl GlyphSegment {
    const fn new(sx: f32, sy: f32, ox: f32, oy: f32) -> Self {
        Self {
            scale: [sx, sy],
            offset: [ox, oy],
        }
    }

    /// Clip-space bounds `(min, max)` of the segment
    pub fn bounds(&self) -> ([f32; 2], [f32; 2]) {
        let half = [self.scale[0] * 0.5, self.scale[1] * 0.5];
        (
            [self.offset[0] - half[0], self.offset[1] - half[1]],
            [self.offset[0] + half[0], self.offset[1] + half[1]],
        )
    }

    /// Packed as `(scale.x, scale.y, offset.x, offset.y)` for the uniform array
    pub fn packed(&self) -> [f32; 4] {
        [self.scale[0], self.scale[1], self.offset[0], self.offset[1]]
    }
}

const U: f32 = 1.0 / 25.0;
const V: f32 = 1.0 / 5.0;

/// Glyph layout, in drawing order
pub const GLYPH: [GlyphSegment; GLYPH_SEGMENT_COUNT] = [
    GlyphSegment::new(2.0 * U, 1.0, -16.0 * U, 0.0),
    GlyphSegment::new(2.0 * U, 1.0, -12.0 * U, 0.0),
    GlyphSegment::new(2.0 * U, 3.0 * V, -8.0 * U, V),
    GlyphSegment::new(2.0 * U, V, -6.0 * U, 0.0),
    GlyphSegment::new(2.0 * U, 1.0, -4.0 * U, 0.0),
    GlyphSegment::new(6.0 * U, V, 2.0 * U, 2.0 * V),
    GlyphSegment::new(2.0 * U, V, 0.0, V),
    GlyphSegment::new(6.0 * U, V, 2.0 * U, 0.0),
    GlyphSegment::new(2.0 * U, V, 4.0 * U, -V),
    GlyphSegment::new(6.0 * U, V, 2.0 * U, -2.0 * V),
    GlyphSegment::new(2.0 * U, 1.0, 8.0 * U, 0.0),
    GlyphSegment::new(2.0 * U, 3.0 * V, 12.0 * U, V),
    GlyphSegment::new(2.0 * U, V, 14.0 * U, 0.0),
    GlyphSegment::new(2.0 * U, 1.0, 16.0 * U, 0.0),
];

/// Sprite colors, all at alpha 0.5
pub const SPRITE_PALETTE: [[f32; 4]; SPRITE_PALETTE_LEN] = [
    [0.06, 0.93, 0.8, 0.5],
    [1.0, 0.68, 0.2, 0.5],
    [0.37, 0.83, 0.09, 0.5],
    [0.87, 0.93, 0.2, 0.5],
    [1.0, 0.67, 0.47, 0.5],
    [1.0, 0.37, 0.4, 0.5],
];

/// Color of sprite `index`
pub fn sprite_color(index: u32) -> [f32; 4] {
    SPRITE_PALETTE[index as usize % SPRITE_PALETTE_LEN]
}

/// Eye-space center of sprite `index` at animation time `time`
///
/// Each sprite orbits the point `(0, 0, -3)` in the XZ plane, phase-shifted by its index.
pub fn sprite_center(index: u32, time: f32) -> [f32; 3] {
    let phase = time + index as f32;
    [-phase.sin(), 0.0, SPRITE_ORBIT_DEPTH - phase.cos()]
}

/// Tunable scene parameters
#[derive(Clone, Debug, PartialEq)]
pub struct SceneParams {
    /// Clear color of the default target
    pub background_color: [f32; 4],
    /// Solid color of the opaque glyph
    pub glyph_color: [f32; 4],
    /// Number of translucent sprites drawn per frame
    pub sprite_count: u32,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            background_color: [0.2, 0.3, 0.3, 1.0],
            glyph_color: [1.0, 0.333, 0.0, 1.0],
            sprite_count: SPRITE_PALETTE_LEN as u32,
        }
    }
}

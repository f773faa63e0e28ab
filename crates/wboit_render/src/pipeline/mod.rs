//! Rendering pipeline components
//!
//! GPU resources for weighted-blended OIT: the shared quad, the offscreen
//! accumulation target, blend configurations, and the three programs.

pub mod blend;
pub mod mesh;
pub mod offscreen;
pub mod programs;
pub mod types;

pub use blend::{BlendSpec, ACCUM_BLEND, REVEAL_BLEND, SOURCE_OVER_BLEND};
pub use mesh::{QuadMesh, QUAD_VERTICES, QUAD_VERTEX_COUNT};
pub use offscreen::{OffscreenTarget, ACCUM_FORMAT, REVEAL_FORMAT};
pub use programs::{ProgramKind, ProgramSet};
pub use types::{GlyphUniforms, QuadVertex, SpritePalette, SpriteUniforms};

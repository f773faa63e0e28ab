//! Matrix math for the weighted-blended OIT renderer
//!
//! ## Core Types
//!
//! - [`Mat4`] - 4x4 column-major matrix, laid out exactly as WGSL's `mat4x4<f32>`
//!
//! ## Projection
//!
//! - [`perspective`] - builds the projection from aspect ratio, half-FOV tangent and clip planes
//! - [`perspective_fov`] - convenience wrapper taking the full vertical field of view

pub mod mat4;
pub mod projection;

pub use mat4::Mat4;
pub use projection::{perspective, perspective_fov, project_point};

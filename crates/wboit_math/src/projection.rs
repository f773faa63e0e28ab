//! Perspective projection builder
//!
//! Produces the OpenGL-convention projection (NDC z in [-1, 1], `w' = -z`)
//! used by the transparent sprites. The matrix is built once at startup and
//! handed out by value; nothing here keeps global state.

use crate::mat4::{self, Mat4};

/// Build a perspective projection.
///
/// # Arguments
/// * `aspect` - viewport width / height
/// * `tan_half_fov` - tangent of half the vertical field of view
/// * `near`, `far` - clip plane distances, `0 < near < far`
///
/// Only five entries are non-zero (flat column-major indices 0, 5, 10, 11, 14).
pub fn perspective(aspect: f32, tan_half_fov: f32, near: f32, far: f32) -> Mat4 {
    debug_assert!(aspect > 0.0 && tan_half_fov > 0.0);
    debug_assert!(near > 0.0 && near < far);

    let mut m = mat4::ZERO;
    m[0][0] = 1.0 / (aspect * tan_half_fov);
    m[1][1] = 1.0 / tan_half_fov;
    m[2][2] = (far + near) / (near - far);
    m[2][3] = -1.0;
    m[3][2] = (2.0 * far * near) / (near - far);
    m
}

/// Helper to create a perspective projection from the full vertical FOV (radians)
pub fn perspective_fov(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    perspective(aspect, (fov_y / 2.0).tan(), near, far)
}

/// Project an eye-space point to normalized device coordinates
pub fn project_point(m: Mat4, p: [f32; 3]) -> [f32; 3] {
    let clip = mat4::transform(m, [p[0], p[1], p[2], 1.0]);
    [clip[0] / clip[3], clip[1] / clip[3], clip[2] / clip[3]]
}

//! 4x4 matrix utilities
//!
//! Matrices are stored column-major as `[[f32; 4]; 4]`, so `m[col][row]`.
//! The flat index used by OpenGL-style descriptions (`P[11]`, `P[14]`, ...)
//! maps to `m[k / 4][k % 4]`.

/// 4x4 matrix type (column-major)
pub type Mat4 = [[f32; 4]; 4];

/// All-zero matrix
pub const ZERO: Mat4 = [[0.0; 4]; 4];

/// Transform a homogeneous point by a 4x4 matrix (column-major)
///
/// result = M * v
pub fn transform(m: Mat4, v: [f32; 4]) -> [f32; 4] {
    [
        m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2] + m[3][0] * v[3],
        m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2] + m[3][1] * v[3],
        m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2] + m[3][2] * v[3],
        m[0][3] * v[0] + m[1][3] * v[1] + m[2][3] * v[2] + m[3][3] * v[3],
    ]
}

/// Flatten into the 16-element column-major array a GL uniform upload would see
pub fn to_cols_array(m: Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    for (k, value) in out.iter_mut().enumerate() {
        *value = m[k / 4][k % 4];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: Mat4 = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    fn translation(x: f32, y: f32, z: f32) -> Mat4 {
        let mut m = IDENTITY;
        m[3] = [x, y, z, 1.0];
        m
    }

    #[test]
    fn test_identity_transform() {
        let v = [1.0, 2.0, 3.0, 1.0];
        assert_eq!(transform(IDENTITY, v), v);
    }

    #[test]
    fn test_translation_lives_in_last_column() {
        let m = translation(1.0, 2.0, 3.0);
        assert_eq!(transform(m, [0.0, 0.0, 0.0, 1.0]), [1.0, 2.0, 3.0, 1.0]);
        // Directions (w = 0) are unaffected
        assert_eq!(transform(m, [1.0, 0.0, 0.0, 0.0]), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_cols_array_indexing() {
        let mut m = ZERO;
        m[2][3] = -1.0;
        m[3][2] = 7.0;
        let flat = to_cols_array(m);
        assert_eq!(flat[11], -1.0);
        assert_eq!(flat[14], 7.0);
        assert_eq!(flat.iter().filter(|&&v| v != 0.0).count(), 2);
    }
}

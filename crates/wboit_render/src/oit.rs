//! Weighted-blended OIT math, mirrored on the host
//!
//! These functions compute exactly what `accumulate.wgsl` and `composite.wgsl`
//! compute per fragment. They back the software [`ReferenceRenderer`] and the
//! unit tests; the GPU never calls them.
//!
//! [`ReferenceRenderer`]: crate::reference::ReferenceRenderer

/// Lower clamp of the fragment weight
pub const WEIGHT_MIN: f32 = 1e-2;

/// Upper clamp of the fragment weight
pub const WEIGHT_MAX: f32 = 3e3;

/// Sprites are discarded outside this UV radius (UV spans [-1, 1])
pub const SPRITE_MASK_RADIUS: f32 = 0.8;

/// Relative tolerance for the "revealage is one" test, and the floor of the
/// accumulated weight divisor
pub const EPSILON: f32 = 1e-5;

/// Accumulation clear value (attachment 0)
pub const ACCUM_CLEAR: [f32; 4] = [0.0; 4];

/// Revealage clear value (attachment 1); only the red channel is read
pub const REVEAL_CLEAR: [f32; 4] = [1.0; 4];

/// Convert NDC depth to OpenGL window depth in [0, 1].
///
/// The projection follows the GL convention (NDC z in [-1, 1]) while wgpu hands
/// the fragment stage NDC z directly, so the accumulate shader remaps it before
/// weighting.
pub fn window_depth(ndc_z: f32) -> f32 {
    ndc_z * 0.5 + 0.5
}

/// Per-fragment weight favouring opaque, near fragments.
///
/// `clamp((min(1, 10a) + 0.01)^3 * 1e8 * (1 - 0.9d)^3, 1e-2, 3e3)`
pub fn weight(alpha: f32, depth: f32) -> f32 {
    let a = (alpha * 10.0).min(1.0) + 0.01;
    let d = 1.0 - depth * 0.9;
    (a * a * a * 1e8 * d * d * d).clamp(WEIGHT_MIN, WEIGHT_MAX)
}

/// Outputs of the accumulate fragment stage
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccumFragment {
    /// Weighted premultiplied color + alpha (attachment 0)
    pub accum: [f32; 4],
    /// Alpha written to the revealage attachment (attachment 1)
    pub reveal: f32,
}

/// Accumulate fragment stage: `None` when the fragment is outside the circular mask
pub fn accumulate_fragment(color: [f32; 4], uv: [f32; 2], depth: f32) -> Option<AccumFragment> {
    if (uv[0] * uv[0] + uv[1] * uv[1]).sqrt() > SPRITE_MASK_RADIUS {
        return None;
    }

    let alpha = color[3];
    let w = weight(alpha, depth);
    Some(AccumFragment {
        accum: [
            color[0] * alpha * w,
            color[1] * alpha * w,
            color[2] * alpha * w,
            alpha * w,
        ],
        reveal: alpha,
    })
}

/// Relative float comparison used by the composite stage
pub fn approx_equal(a: f32, b: f32) -> bool {
    (a - b).abs() <= a.abs().max(b.abs()) * EPSILON
}

/// Composite fragment stage: `None` means discard (no translucent coverage).
///
/// Returns straight (non-premultiplied) color with alpha `1 - revealage`, ready
/// for source-over blending onto the opaque image.
pub fn composite_fragment(accum: [f32; 4], revealage: f32) -> Option<[f32; 4]> {
    if approx_equal(revealage, 1.0) {
        return None;
    }

    // Half-float overflow: rgb <= a per channel, so the saturated average is white
    if accum[..3].iter().any(|c| !c.is_finite()) {
        return Some([1.0, 1.0, 1.0, 1.0 - revealage]);
    }

    let divisor = accum[3].max(EPSILON);
    Some([
        accum[0] / divisor,
        accum[1] / divisor,
        accum[2] / divisor,
        1.0 - revealage,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::blend::{blend, ACCUM_BLEND, REVEAL_BLEND};

    /// Largest finite value of the accumulation attachment's half-float format
    const F16_MAX: f32 = 65504.0;

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    /// Run a list of fragments through the accumulation blend states
    fn accumulate(fragments: &[AccumFragment]) -> ([f32; 4], f32) {
        let mut accum = ACCUM_CLEAR;
        let mut reveal = REVEAL_CLEAR;
        for frag in fragments {
            accum = blend(Some(ACCUM_BLEND), frag.accum, accum);
            reveal = blend(Some(REVEAL_BLEND), [frag.reveal, 0.0, 0.0, 1.0], reveal);
        }
        (accum, reveal[0])
    }

    #[test]
    fn test_weight_monotonic_in_alpha() {
        for &depth in &[0.0, 0.5, 0.9, 0.99, 1.0] {
            let mut previous = weight(0.0, depth);
            for step in 1..=100 {
                let w = weight(step as f32 / 100.0, depth);
                assert!(w >= previous, "depth {}: weight dropped at alpha step {}", depth, step);
                previous = w;
            }
        }
    }

    #[test]
    fn test_weight_grows_as_depth_decreases() {
        for &alpha in &[0.0, 0.01, 0.05, 0.5, 1.0] {
            let mut previous = weight(alpha, 1.0);
            for step in (0..100).rev() {
                let w = weight(alpha, step as f32 / 100.0);
                assert!(w >= previous, "alpha {}: weight dropped at depth step {}", alpha, step);
                previous = w;
            }
        }
    }

    #[test]
    fn test_weight_bounds() {
        for a in 0..=10 {
            for d in 0..=10 {
                let w = weight(a as f32 / 10.0, d as f32 / 10.0);
                assert!((WEIGHT_MIN..=WEIGHT_MAX).contains(&w));
            }
        }
        // Near and visible saturates the ceiling
        assert_eq!(weight(0.5, 0.0), WEIGHT_MAX);
        // Past the far plane the falloff collapses onto the floor
        assert_eq!(weight(0.0, 1.5), WEIGHT_MIN);
    }

    #[test]
    fn test_zero_alpha_is_the_weakest_weight() {
        // alpha = 0 still contributes the (0.01)^3 * 1e8 baseline
        assert!(approx(weight(0.0, 0.0), 100.0, 1e-2));
        assert!(approx(weight(0.0, 1.0), 0.1, 1e-4));
        for d in 0..=10 {
            let depth = d as f32 / 10.0;
            assert!(weight(0.0, depth) <= weight(0.3, depth));
        }
    }

    #[test]
    fn test_window_depth() {
        assert_eq!(window_depth(-1.0), 0.0);
        assert_eq!(window_depth(1.0), 1.0);
        assert_eq!(window_depth(0.0), 0.5);
    }

    #[test]
    fn test_circular_mask() {
        let color = [1.0, 0.0, 0.0, 0.5];
        assert!(accumulate_fragment(color, [0.0, 0.0], 0.5).is_some());
        assert!(accumulate_fragment(color, [0.79, 0.0], 0.5).is_some());
        assert!(accumulate_fragment(color, [0.6, 0.6], 0.5).is_none());
        assert!(accumulate_fragment(color, [-1.0, -1.0], 0.5).is_none());
    }

    #[test]
    fn test_accumulate_outputs_weighted_premultiplied_color() {
        let frag = accumulate_fragment([0.2, 0.4, 0.6, 0.5], [0.0, 0.0], 0.9).unwrap();
        let w = weight(0.5, 0.9);
        assert!(approx(frag.accum[0], 0.1 * w, 1e-3));
        assert!(approx(frag.accum[1], 0.2 * w, 1e-3));
        assert!(approx(frag.accum[2], 0.3 * w, 1e-3));
        assert!(approx(frag.accum[3], 0.5 * w, 1e-3));
        assert_eq!(frag.reveal, 0.5);
    }

    #[test]
    fn test_revealage_is_product_of_one_minus_alpha() {
        let frag = accumulate_fragment([1.0, 1.0, 1.0, 0.5], [0.0, 0.0], 0.9).unwrap();
        let (_, reveal) = accumulate(&[frag, frag, frag]);
        assert!(approx(reveal, 0.125, 1e-6), "revealage = {}", reveal);
    }

    #[test]
    fn test_result_is_independent_of_draw_order() {
        let frags = [
            accumulate_fragment([0.9, 0.1, 0.1, 0.2], [0.0, 0.0], 0.95).unwrap(),
            accumulate_fragment([0.1, 0.9, 0.1, 0.5], [0.1, 0.2], 0.93).unwrap(),
            accumulate_fragment([0.1, 0.1, 0.9, 0.7], [0.3, 0.0], 0.97).unwrap(),
        ];
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

        let reference = {
            let (accum, reveal) = accumulate(&frags);
            composite_fragment(accum, reveal).unwrap()
        };
        for order in orders {
            let permuted: Vec<_> = order.iter().map(|&i| frags[i]).collect();
            let (accum, reveal) = accumulate(&permuted);
            assert!(approx(reveal, 0.8 * 0.5 * 0.3, 1e-6));
            let out = composite_fragment(accum, reveal).unwrap();
            for c in 0..4 {
                assert!(
                    approx(out[c], reference[c], 1e-5),
                    "order {:?}: {:?} vs {:?}",
                    order,
                    out,
                    reference
                );
            }
        }
    }

    #[test]
    fn test_composite_discards_untouched_pixels() {
        assert_eq!(composite_fragment(ACCUM_CLEAR, REVEAL_CLEAR[0]), None);
        // Within the relative tolerance is still "untouched"
        assert_eq!(composite_fragment(ACCUM_CLEAR, 1.0 - 1e-6), None);
        assert!(composite_fragment(ACCUM_CLEAR, 0.99).is_some());
    }

    #[test]
    fn test_composite_recovers_average_color() {
        let frag = accumulate_fragment([0.2, 0.4, 0.6, 0.5], [0.0, 0.0], 0.9).unwrap();
        let (accum, reveal) = accumulate(&[frag, frag]);
        let out = composite_fragment(accum, reveal).unwrap();
        assert!(approx(out[0], 0.2, 1e-5));
        assert!(approx(out[1], 0.4, 1e-5));
        assert!(approx(out[2], 0.6, 1e-5));
        assert!(approx(out[3], 0.75, 1e-6));
    }

    #[test]
    fn test_composite_guards_non_finite_color() {
        let out = composite_fragment([f32::INFINITY, 1.0, 2.0, 4.0], 0.25).unwrap();
        assert_eq!(out, [1.0, 1.0, 1.0, 0.75]);

        let out = composite_fragment([1.0, f32::NAN, 2.0, 4.0], 0.5).unwrap();
        assert!(out.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_composite_survives_half_float_overflow() {
        // Saturated weight: each fragment adds 1500 to alpha, past f16 max after 44
        let frag = accumulate_fragment([1.0, 0.34, 0.1, 0.5], [0.0, 0.0], 0.0).unwrap();
        assert_eq!(frag.accum[3], 1500.0);

        let mut accum = ACCUM_CLEAR;
        let mut reveal = REVEAL_CLEAR;
        for _ in 0..50 {
            accum = blend(Some(ACCUM_BLEND), frag.accum, accum).map(|v| {
                if v.abs() > F16_MAX {
                    f32::INFINITY.copysign(v)
                } else {
                    v
                }
            });
            reveal = blend(Some(REVEAL_BLEND), [frag.reveal, 0.0, 0.0, 1.0], reveal);
        }
        assert!(accum[0].is_infinite());
        assert!(accum[3].is_infinite());

        let out = composite_fragment(accum, reveal[0]).unwrap();
        assert!(out.iter().all(|c| c.is_finite()), "composite produced {:?}", out);
        assert_eq!(out, [1.0, 1.0, 1.0, out[3]]);
        assert!(approx(out[3], 1.0, 1e-6));
    }

    #[test]
    fn test_composite_floors_the_divisor() {
        let out = composite_fragment([0.0, 0.0, 0.0, 0.0], 0.5).unwrap();
        assert_eq!(out, [0.0, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_approx_equal_is_relative() {
        assert!(approx_equal(1.0, 1.0));
        assert!(approx_equal(1000.0, 1000.005));
        assert!(!approx_equal(1.0, 0.999));
        assert!(approx_equal(0.0, 0.0));
    }
}

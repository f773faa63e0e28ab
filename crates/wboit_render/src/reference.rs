//! Software executor of the frame graph
//!
//! Rasterizes every pass on the CPU with the same per-fragment math as the
//! shaders ([`crate::oit`]) and the same fixed-function blending
//! ([`crate::pipeline::blend::blend`]). All geometry is axis-aligned quads, so a
//! pixel is covered when its center falls inside the projected rectangle.
//!
//! Buffers hold `f32` values: the accumulation buffer is not rounded to half
//! floats, the surface and revealage buffers are clamped to [0, 1] like the
//! unorm attachments they stand in for.

use wboit_math::Mat4;

use crate::frame::{FrameGraphError, PassDescriptor, PassExecutor, RenderTarget};
use crate::oit::{self, ACCUM_CLEAR, REVEAL_CLEAR};
use crate::pipeline::blend::blend;
use crate::pipeline::programs::ProgramKind;
use crate::scene::{self, SceneParams, GLYPH, GLYPH_SEGMENT_COUNT};

/// Half extent of the unit quad
const QUAD_HALF: f32 = 0.5;

/// CPU render target set: one surface plus the two OIT attachments
pub struct ReferenceRenderer {
    width: u32,
    height: u32,
    scene: SceneParams,
    projection: Mat4,
    time: f32,
    surface: Vec<[f32; 4]>,
    accum: Vec<[f32; 4]>,
    reveal: Vec<[f32; 4]>,
}

impl ReferenceRenderer {
    /// Allocate buffers; the surface starts black, the OIT attachments start cleared
    pub fn new(width: u32, height: u32, scene: SceneParams, projection: Mat4) -> Self {
        let len = (width as usize) * (height as usize);
        Self {
            width,
            height,
            scene,
            projection,
            time: 0.0,
            surface: vec![[0.0; 4]; len],
            accum: vec![ACCUM_CLEAR; len],
            reveal: vec![REVEAL_CLEAR; len],
        }
    }

    /// Animation time used by the accumulate pass
    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    /// Surface color at pixel `(x, y)`, y down
    pub fn pixel(&self, x: u32, y: u32) -> [f32; 4] {
        self.surface[self.index(x, y)]
    }

    /// Revealage at pixel `(x, y)`
    pub fn revealage_at(&self, x: u32, y: u32) -> f32 {
        self.reveal[self.index(x, y)][0]
    }

    /// The whole surface, row-major
    pub fn surface(&self) -> &[[f32; 4]] {
        &self.surface
    }

    /// Accumulation buffer, row-major
    pub fn accumulation(&self) -> &[[f32; 4]] {
        &self.accum
    }

    /// Revealage values (red channel of attachment 1), row-major
    pub fn revealage(&self) -> Vec<f32> {
        self.reveal.iter().map(|r| r[0]).collect()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + x as usize
    }

    /// NDC of the center of pixel `(x, y)`
    fn pixel_ndc(&self, x: u32, y: u32) -> [f32; 2] {
        [
            (x as f32 + 0.5) / self.width as f32 * 2.0 - 1.0,
            1.0 - (y as f32 + 0.5) / self.height as f32 * 2.0,
        ]
    }

    fn clear(&mut self, pass: &PassDescriptor) {
        match pass.target {
            RenderTarget::Surface => {
                if let Some(color) = pass.clear.value(0) {
                    self.surface.fill(clamp_unorm(color));
                }
            }
            RenderTarget::Offscreen => {
                if let Some(accum) = pass.clear.value(0) {
                    self.accum.fill(accum);
                }
                if let Some(reveal) = pass.clear.value(1) {
                    self.reveal.fill(clamp_unorm(reveal));
                }
            }
        }
    }

    /// Fragment outputs of `program` for `instance` at pixel `(x, y)`, one per attachment
    fn shade(&self, program: ProgramKind, instance: u32, x: u32, y: u32) -> Option<Vec<[f32; 4]>> {
        let ndc = self.pixel_ndc(x, y);
        match program {
            ProgramKind::Opaque => {
                let segment = &GLYPH[instance as usize % GLYPH_SEGMENT_COUNT];
                let (min, max) = segment.bounds();
                covers(min, max, ndc).then(|| vec![self.scene.glyph_color])
            }
            ProgramKind::Accumulate => {
                let center = scene::sprite_center(instance, self.time);
                let p = self.projection;
                // Quad lies in a plane of constant eye z, so w is constant across it
                let w = -center[2];
                let clip_z = p[2][2] * center[2] + p[3][2];
                let ndc_z = clip_z / w;
                if !(0.0..=1.0).contains(&ndc_z) {
                    return None;
                }

                // Invert the projection to the quad's local position
                let local = [
                    ndc[0] * w / p[0][0] - center[0],
                    ndc[1] * w / p[1][1] - center[1],
                ];
                if local.iter().any(|c| c.abs() > QUAD_HALF) {
                    return None;
                }

                let uv = [local[0] * 2.0, local[1] * 2.0];
                let color = scene::sprite_color(instance);
                let frag = oit::accumulate_fragment(color, uv, oit::window_depth(ndc_z))?;
                Some(vec![frag.accum, [frag.reveal, 0.0, 0.0, 1.0]])
            }
            ProgramKind::Composite => {
                let i = self.index(x, y);
                oit::composite_fragment(self.accum[i], self.reveal[i][0]).map(|color| vec![color])
            }
        }
    }
}

impl PassExecutor for ReferenceRenderer {
    type Error = FrameGraphError;

    fn execute(&mut self, pass: &PassDescriptor) -> Result<(), FrameGraphError> {
        let blends = pass.blend.attachment_blends();
        if blends.len() != pass.target.attachment_count() {
            return Err(FrameGraphError::AttachmentMismatch {
                program: pass.program.label(),
                expected: pass.target.attachment_count(),
                found: blends.len(),
            });
        }

        self.clear(pass);
        if pass.vertices == 0 {
            return Ok(());
        }

        for instance in 0..pass.instances {
            for y in 0..self.height {
                for x in 0..self.width {
                    let Some(outputs) = self.shade(pass.program, instance, x, y) else {
                        continue;
                    };
                    let i = self.index(x, y);
                    match pass.target {
                        RenderTarget::Surface => {
                            let color = blend(blends[0], outputs[0], self.surface[i]);
                            self.surface[i] = clamp_unorm(color);
                        }
                        RenderTarget::Offscreen => {
                            self.accum[i] = blend(blends[0], outputs[0], self.accum[i]);
                            let reveal = blend(blends[1], outputs[1], self.reveal[i]);
                            self.reveal[i] = clamp_unorm(reveal);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

fn covers(min: [f32; 2], max: [f32; 2], p: [f32; 2]) -> bool {
    p[0] >= min[0] && p[0] < max[0] && p[1] >= min[1] && p[1] < max[1]
}

fn clamp_unorm(c: [f32; 4]) -> [f32; 4] {
    c.map(|v| v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameGraph;
    use wboit_math::{perspective_fov, project_point};

    const WIDTH: u32 = 160;
    const HEIGHT: u32 = 100;

    fn projection() -> Mat4 {
        perspective_fov(1.0, WIDTH as f32 / HEIGHT as f32, 0.1, 100.0)
    }

    fn render(graph: &FrameGraph, scene: &SceneParams) -> ReferenceRenderer {
        render_at(graph, scene, 0.0)
    }

    fn render_at(graph: &FrameGraph, scene: &SceneParams, time: f32) -> ReferenceRenderer {
        let mut renderer = ReferenceRenderer::new(WIDTH, HEIGHT, scene.clone(), projection());
        renderer.set_time(time);
        graph.execute(&mut renderer).unwrap();
        renderer
    }

    /// Number of half-alpha layers behind revealage `r`
    fn overlap_count(r: f32, max: u32) -> i32 {
        (0..=max as i32)
            .find(|&k| (r - 0.5f32.powi(k)).abs() < 1e-6)
            .unwrap_or_else(|| panic!("revealage {} is not a power of 0.5", r))
    }

    fn opaque_only(scene: &SceneParams) -> ReferenceRenderer {
        let graph = FrameGraph::weighted_blended(scene);
        render(&FrameGraph::new(graph.passes()[..1].to_vec()), scene)
    }

    #[test]
    fn test_no_sprites_matches_opaque_only() {
        let scene = SceneParams {
            sprite_count: 0,
            ..SceneParams::default()
        };
        let full = render(&FrameGraph::weighted_blended(&scene), &scene);
        assert_eq!(full.surface(), opaque_only(&scene).surface());
        assert!(full.revealage().iter().all(|&r| r == 1.0));
    }

    #[test]
    fn test_glyph_is_drawn_over_background() {
        let scene = SceneParams::default();
        let frame = opaque_only(&scene);
        // Corners are outside the glyph
        assert_eq!(frame.pixel(0, 0), scene.background_color);
        assert_eq!(frame.pixel(WIDTH - 1, HEIGHT - 1), scene.background_color);
        assert!(frame.surface().iter().any(|&c| c == scene.glyph_color));
    }

    #[test]
    fn test_untouched_pixels_keep_opaque_color() {
        let scene = SceneParams::default();
        let full = render(&FrameGraph::weighted_blended(&scene), &scene);
        let opaque = opaque_only(&scene);

        let reveal = full.revealage();
        for (i, &r) in reveal.iter().enumerate() {
            if r == 1.0 {
                assert_eq!(full.surface()[i], opaque.surface()[i], "pixel {}", i);
            }
        }
        assert_eq!(full.revealage_at(0, 0), 1.0);
    }

    #[test]
    fn test_revealage_is_power_of_half() {
        // Every palette alpha is 0.5, so k overlapping sprites leave 0.5^k
        let scene = SceneParams::default();
        let full = render(&FrameGraph::weighted_blended(&scene), &scene);

        let mut max_overlap = 0;
        for r in full.revealage() {
            max_overlap = max_overlap.max(overlap_count(r, scene.sprite_count));
        }
        assert!(max_overlap >= 2, "expected overlapping sprites, max overlap {}", max_overlap);
    }

    #[test]
    fn test_covered_pixels_are_tinted() {
        let scene = SceneParams::default();
        let full = render(&FrameGraph::weighted_blended(&scene), &scene);
        let opaque = opaque_only(&scene);

        let reveal = full.revealage();
        let tinted = reveal
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r < 1.0)
            .filter(|&(i, _)| full.surface()[i] != opaque.surface()[i])
            .count();
        assert!(tinted > 0);
        assert!(full.surface().iter().flatten().all(|c| c.is_finite()));
    }

    #[test]
    fn test_single_sprite_center() {
        // Sprite 0 at t = 0 sits at (0, 0, -4), straight ahead
        let scene = SceneParams {
            sprite_count: 1,
            ..SceneParams::default()
        };
        let full = render(&FrameGraph::weighted_blended(&scene), &scene);
        let (cx, cy) = (WIDTH / 2, HEIGHT / 2);
        assert!((full.revealage_at(cx, cy) - 0.5).abs() < 1e-6);

        let accum = full.accumulation()[(cy * WIDTH + cx) as usize];
        let color = scene::sprite_color(0);
        // Composite recovers the sprite color exactly
        for c in 0..3 {
            assert!((accum[c] / accum[3] - color[c]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_sprites_move_with_time() {
        let scene = SceneParams::default();
        let graph = FrameGraph::weighted_blended(&scene);
        let early = render_at(&graph, &scene, 0.0);
        let late = render_at(&graph, &scene, 1.2);

        assert_ne!(early.revealage(), late.revealage());
        assert_ne!(early.surface(), late.surface());
        for r in late.revealage() {
            overlap_count(r, scene.sprite_count);
        }
    }

    #[test]
    fn test_single_sprite_follows_its_orbit() {
        let scene = SceneParams {
            sprite_count: 1,
            ..SceneParams::default()
        };
        let time = 1.2;
        let frame = render_at(&FrameGraph::weighted_blended(&scene), &scene, time);

        // Pixel under the projected center of sprite 0
        let ndc = project_point(projection(), scene::sprite_center(0, time));
        let x = ((ndc[0] + 1.0) / 2.0 * WIDTH as f32) as u32;
        let y = ((1.0 - ndc[1]) / 2.0 * HEIGHT as f32) as u32;
        assert!(x < WIDTH / 2, "sprite should have swung left, x = {}", x);
        assert!((frame.revealage_at(x, y) - 0.5).abs() < 1e-6);

        // It has left the spot it occupied at t = 0
        assert_eq!(frame.revealage_at(WIDTH / 2, HEIGHT / 2), 1.0);
    }

    #[test]
    fn test_composite_before_accumulation_loses_sprites() {
        let scene = SceneParams::default();
        let good = FrameGraph::weighted_blended(&scene);
        let mut passes = good.passes().to_vec();
        passes.swap(1, 2);
        let bad = FrameGraph::new(passes);

        assert!(bad.validate().is_err());
        let wrong = render(&bad, &scene);
        assert_eq!(wrong.surface(), opaque_only(&scene).surface());
        assert_ne!(wrong.surface(), render(&good, &scene).surface());
    }

    #[test]
    fn test_rejects_mismatched_attachments() {
        let scene = SceneParams::default();
        let mut pass = FrameGraph::weighted_blended(&scene).passes()[1].clone();
        pass.target = RenderTarget::Surface;

        let mut renderer = ReferenceRenderer::new(4, 4, scene, projection());
        assert_eq!(
            renderer.execute(&pass),
            Err(FrameGraphError::AttachmentMismatch {
                program: "accumulate",
                expected: 1,
                found: 2,
            })
        );
    }
}

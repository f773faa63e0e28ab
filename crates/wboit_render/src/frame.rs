//! Frame graph for weighted-blended OIT
//!
//! A frame is an ordered list of [`PassDescriptor`]s: target, clear, blend,
//! program and instance count. [`FrameGraph::execute`] walks the list once per
//! frame and hands each pass to a [`PassExecutor`]; [`GpuPassExecutor`] records
//! it into a wgpu command encoder, the software [`ReferenceRenderer`] rasterizes
//! it on the CPU.
//!
//! The weighted-blended frame is:
//!
//! 1. `opaque`     - surface, clear to background, blending off, glyph instances
//! 2. `accumulate` - offscreen, clear accum to 0 / revealage to 1,
//!    (ONE, ONE) + (ZERO, ONE_MINUS_SRC), sprite instances
//! 3. `composite`  - surface, keep contents, source-over, one full-screen quad
//!
//! Presenting the surface is left to the caller.
//!
//! [`ReferenceRenderer`]: crate::reference::ReferenceRenderer

use std::fmt;

use crate::oit::{ACCUM_CLEAR, REVEAL_CLEAR};
use crate::pipeline::blend::BlendSpec;
use crate::pipeline::mesh::{QuadMesh, QUAD_VERTEX_COUNT};
use crate::pipeline::offscreen::OffscreenTarget;
use crate::pipeline::programs::{ProgramKind, ProgramSet};
use crate::scene::{SceneParams, GLYPH_SEGMENT_COUNT};

/// Render target a pass draws into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTarget {
    /// The window surface (default framebuffer)
    Surface,
    /// Accumulation (attachment 0) + revealage (attachment 1)
    Offscreen,
}

impl RenderTarget {
    /// Number of color attachments bound for this target
    pub fn attachment_count(self) -> usize {
        match self {
            RenderTarget::Surface => 1,
            RenderTarget::Offscreen => 2,
        }
    }
}

/// What happens to the target's contents when a pass begins
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearSpec {
    /// Keep the previous contents
    Load,
    /// Clear the single color attachment
    Color([f32; 4]),
    /// Clear accumulation and revealage separately
    Accumulation { accum: [f32; 4], reveal: [f32; 4] },
}

impl ClearSpec {
    /// The OIT clear: accumulation to zero, revealage to one
    pub const OIT: ClearSpec = ClearSpec::Accumulation {
        accum: ACCUM_CLEAR,
        reveal: REVEAL_CLEAR,
    };

    /// Clear value of one attachment, `None` to load
    pub fn value(&self, attachment: usize) -> Option<[f32; 4]> {
        match *self {
            ClearSpec::Load => None,
            ClearSpec::Color(color) => Some(color),
            ClearSpec::Accumulation { accum, reveal } => {
                Some(if attachment == 0 { accum } else { reveal })
            }
        }
    }

    fn load_op(&self, attachment: usize) -> wgpu::LoadOp<wgpu::Color> {
        match self.value(attachment) {
            None => wgpu::LoadOp::Load,
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: c[0] as f64,
                g: c[1] as f64,
                b: c[2] as f64,
                a: c[3] as f64,
            }),
        }
    }
}

/// One pass of the frame
#[derive(Clone, Debug, PartialEq)]
pub struct PassDescriptor {
    pub name: &'static str,
    pub target: RenderTarget,
    pub clear: ClearSpec,
    pub blend: BlendSpec,
    pub program: ProgramKind,
    pub instances: u32,
    pub vertices: u32,
}

/// Ordering rule broken by a frame graph
#[derive(Debug, Clone, PartialEq)]
pub enum FrameGraphError {
    /// No passes at all
    Empty,
    /// The first pass must clear the surface
    SurfaceNotClearedFirst,
    /// Offscreen pass that does not clear accum to 0 and revealage to 1
    AccumulationNotCleared { pass: &'static str },
    /// Composite pass with no accumulation before it
    CompositeBeforeAccumulation { pass: &'static str },
    /// Composite pass clearing the surface it must blend onto
    CompositeClearsSurface { pass: &'static str },
    /// Program drawn into the wrong target
    WrongTarget { pass: &'static str, expected: RenderTarget },
    /// Program drawn with the wrong blend configuration
    WrongBlend { pass: &'static str, expected: BlendSpec, found: BlendSpec },
    /// Composite pass drawing anything but one full-screen quad
    CompositeInstanceCount { pass: &'static str, found: u32 },
    /// No pass draws a program that is required
    MissingProgram { program: &'static str },
    /// Blend state count differs from the target's
    AttachmentMismatch { program: &'static str, expected: usize, found: usize },
}

impl fmt::Display for FrameGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameGraphError::Empty => write!(f, "frame graph has no passes"),
            FrameGraphError::SurfaceNotClearedFirst => {
                write!(f, "first pass must clear the surface")
            }
            FrameGraphError::AccumulationNotCleared { pass } => {
                write!(f, "pass '{}' draws offscreen without clearing accumulation/revealage", pass)
            }
            FrameGraphError::CompositeBeforeAccumulation { pass } => {
                write!(f, "pass '{}' composites before any accumulation pass", pass)
            }
            FrameGraphError::CompositeClearsSurface { pass } => {
                write!(f, "pass '{}' clears the opaque image it composites onto", pass)
            }
            FrameGraphError::WrongTarget { pass, expected } => {
                write!(f, "pass '{}' must draw into {:?}", pass, expected)
            }
            FrameGraphError::WrongBlend { pass, expected, found } => {
                write!(f, "pass '{}' uses {:?} blending, expected {:?}", pass, found, expected)
            }
            FrameGraphError::CompositeInstanceCount { pass, found } => {
                write!(f, "pass '{}' draws {} instances, expected 1", pass, found)
            }
            FrameGraphError::MissingProgram { program } => {
                write!(f, "no pass draws the '{}' program", program)
            }
            FrameGraphError::AttachmentMismatch { program, expected, found } => write!(
                f,
                "program '{}' has {} blend states for {} attachments",
                program, found, expected
            ),
        }
    }
}

impl std::error::Error for FrameGraphError {}

/// Consumer of pass descriptors
pub trait PassExecutor {
    type Error;

    /// Run one pass: bind its target, clear, configure blending, draw
    fn execute(&mut self, pass: &PassDescriptor) -> Result<(), Self::Error>;
}

/// Ordered list of passes making up a frame
#[derive(Clone, Debug, PartialEq)]
pub struct FrameGraph {
    passes: Vec<PassDescriptor>,
}

impl FrameGraph {
    /// Build a graph from explicit passes
    pub fn new(passes: Vec<PassDescriptor>) -> Self {
        Self { passes }
    }

    /// The weighted-blended OIT frame for a scene
    pub fn weighted_blended(scene: &SceneParams) -> Self {
        Self::new(vec![
            PassDescriptor {
                name: "opaque",
                target: RenderTarget::Surface,
                clear: ClearSpec::Color(scene.background_color),
                blend: BlendSpec::Disabled,
                program: ProgramKind::Opaque,
                instances: GLYPH_SEGMENT_COUNT as u32,
                vertices: QUAD_VERTEX_COUNT,
            },
            PassDescriptor {
                name: "accumulate",
                target: RenderTarget::Offscreen,
                clear: ClearSpec::OIT,
                blend: BlendSpec::WeightedAccumulate,
                program: ProgramKind::Accumulate,
                instances: scene.sprite_count,
                vertices: QUAD_VERTEX_COUNT,
            },
            PassDescriptor {
                name: "composite",
                target: RenderTarget::Surface,
                clear: ClearSpec::Load,
                blend: BlendSpec::SourceOver,
                program: ProgramKind::Composite,
                instances: 1,
                vertices: QUAD_VERTEX_COUNT,
            },
        ])
    }

    /// Passes in execution order
    pub fn passes(&self) -> &[PassDescriptor] {
        &self.passes
    }

    /// First pass drawing with `program`
    pub fn pass_for(&self, program: ProgramKind) -> Option<&PassDescriptor> {
        self.passes.iter().find(|p| p.program == program)
    }

    /// Check the ordering rules the technique depends on
    pub fn validate(&self) -> Result<(), FrameGraphError> {
        let first = self.passes.first().ok_or(FrameGraphError::Empty)?;
        if first.target != RenderTarget::Surface || !matches!(first.clear, ClearSpec::Color(_)) {
            return Err(FrameGraphError::SurfaceNotClearedFirst);
        }

        let mut accumulated = false;
        for pass in &self.passes {
            if pass.blend.attachment_count() != pass.target.attachment_count() {
                return Err(FrameGraphError::AttachmentMismatch {
                    program: pass.program.label(),
                    expected: pass.target.attachment_count(),
                    found: pass.blend.attachment_count(),
                });
            }
            if pass.target == RenderTarget::Offscreen && pass.clear != ClearSpec::OIT {
                return Err(FrameGraphError::AccumulationNotCleared { pass: pass.name });
            }

            let (expected_target, expected_blend) = match pass.program {
                ProgramKind::Opaque => (RenderTarget::Surface, BlendSpec::Disabled),
                ProgramKind::Accumulate => (RenderTarget::Offscreen, BlendSpec::WeightedAccumulate),
                ProgramKind::Composite => (RenderTarget::Surface, BlendSpec::SourceOver),
            };
            if pass.target != expected_target {
                return Err(FrameGraphError::WrongTarget {
                    pass: pass.name,
                    expected: expected_target,
                });
            }
            if pass.blend != expected_blend {
                return Err(FrameGraphError::WrongBlend {
                    pass: pass.name,
                    expected: expected_blend,
                    found: pass.blend,
                });
            }

            match pass.program {
                ProgramKind::Accumulate => accumulated = true,
                ProgramKind::Composite => {
                    if !accumulated {
                        return Err(FrameGraphError::CompositeBeforeAccumulation {
                            pass: pass.name,
                        });
                    }
                    if pass.clear != ClearSpec::Load {
                        return Err(FrameGraphError::CompositeClearsSurface { pass: pass.name });
                    }
                    if pass.instances != 1 {
                        return Err(FrameGraphError::CompositeInstanceCount {
                            pass: pass.name,
                            found: pass.instances,
                        });
                    }
                }
                ProgramKind::Opaque => {}
            }
        }

        for program in ProgramKind::ALL {
            if self.pass_for(program).is_none() {
                return Err(FrameGraphError::MissingProgram { program: program.label() });
            }
        }

        Ok(())
    }

    /// Run every pass in order
    pub fn execute<E: PassExecutor>(&self, executor: &mut E) -> Result<(), E::Error> {
        for pass in &self.passes {
            log::trace!(
                "pass '{}': {:?} {:?} {} x {}",
                pass.name,
                pass.target,
                pass.blend,
                pass.instances,
                pass.vertices
            );
            executor.execute(pass)?;
        }
        Ok(())
    }
}

/// Records passes into a wgpu command encoder
pub struct GpuPassExecutor<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub surface_view: &'a wgpu::TextureView,
    pub offscreen: &'a OffscreenTarget,
    pub programs: &'a ProgramSet,
    pub mesh: &'a QuadMesh,
}

impl PassExecutor for GpuPassExecutor<'_> {
    type Error = std::convert::Infallible;

    fn execute(&mut self, pass: &PassDescriptor) -> Result<(), Self::Error> {
        let views: Vec<&wgpu::TextureView> = match pass.target {
            RenderTarget::Surface => vec![self.surface_view],
            RenderTarget::Offscreen => self.offscreen.views().to_vec(),
        };

        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = views
            .into_iter()
            .enumerate()
            .map(|(i, view)| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: pass.clear.load_op(i),
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let mut render_pass = self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.name),
            color_attachments: &color_attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(self.programs.pipeline(pass.program));
        render_pass.set_bind_group(0, self.programs.bind_group(pass.program, self.offscreen), &[]);
        render_pass.set_vertex_buffer(0, self.mesh.buffer().slice(..));
        render_pass.draw(0..pass.vertices, 0..pass.instances);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> FrameGraph {
        FrameGraph::weighted_blended(&SceneParams::default())
    }

    /// Records pass names instead of drawing
    struct Recorder(Vec<&'static str>);

    impl PassExecutor for Recorder {
        type Error = ();

        fn execute(&mut self, pass: &PassDescriptor) -> Result<(), ()> {
            self.0.push(pass.name);
            Ok(())
        }
    }

    #[test]
    fn test_weighted_blended_graph_is_valid() {
        assert_eq!(graph().validate(), Ok(()));
    }

    #[test]
    fn test_pass_order_and_counts() {
        let g = graph();
        let passes = g.passes();
        assert_eq!(passes.len(), 3);

        assert_eq!(passes[0].program, ProgramKind::Opaque);
        assert_eq!(passes[0].instances, 14);
        assert_eq!(passes[0].blend, BlendSpec::Disabled);

        assert_eq!(passes[1].program, ProgramKind::Accumulate);
        assert_eq!(passes[1].instances, 6);
        assert_eq!(passes[1].clear.value(0), Some([0.0; 4]));
        assert_eq!(passes[1].clear.value(1), Some([1.0; 4]));

        assert_eq!(passes[2].program, ProgramKind::Composite);
        assert_eq!(passes[2].instances, 1);
        assert_eq!(passes[2].clear, ClearSpec::Load);
        assert!(passes.iter().all(|p| p.vertices == 6));
    }

    #[test]
    fn test_execute_visits_passes_in_order() {
        let mut recorder = Recorder(Vec::new());
        graph().execute(&mut recorder).unwrap();
        assert_eq!(recorder.0, ["opaque", "accumulate", "composite"]);
    }

    #[test]
    fn test_zero_sprites_is_still_valid() {
        let scene = SceneParams {
            sprite_count: 0,
            ..SceneParams::default()
        };
        let g = FrameGraph::weighted_blended(&scene);
        assert_eq!(g.validate(), Ok(()));
        assert_eq!(g.pass_for(ProgramKind::Accumulate).unwrap().instances, 0);
    }

    #[test]
    fn test_rejects_composite_before_accumulation() {
        let mut passes = graph().passes().to_vec();
        passes.swap(1, 2);
        assert_eq!(
            FrameGraph::new(passes).validate(),
            Err(FrameGraphError::CompositeBeforeAccumulation { pass: "composite" })
        );
    }

    #[test]
    fn test_rejects_uncleared_accumulation() {
        let mut passes = graph().passes().to_vec();
        passes[1].clear = ClearSpec::Load;
        assert_eq!(
            FrameGraph::new(passes).validate(),
            Err(FrameGraphError::AccumulationNotCleared { pass: "accumulate" })
        );
    }

    #[test]
    fn test_rejects_revealage_cleared_to_zero() {
        let mut passes = graph().passes().to_vec();
        passes[1].clear = ClearSpec::Accumulation {
            accum: [0.0; 4],
            reveal: [0.0; 4],
        };
        assert!(matches!(
            FrameGraph::new(passes).validate(),
            Err(FrameGraphError::AccumulationNotCleared { .. })
        ));
    }

    #[test]
    fn test_rejects_wrong_blend() {
        let mut passes = graph().passes().to_vec();
        passes[2].blend = BlendSpec::Disabled;
        assert_eq!(
            FrameGraph::new(passes).validate(),
            Err(FrameGraphError::WrongBlend {
                pass: "composite",
                expected: BlendSpec::SourceOver,
                found: BlendSpec::Disabled,
            })
        );
    }

    #[test]
    fn test_rejects_composite_clearing_surface() {
        let mut passes = graph().passes().to_vec();
        passes[2].clear = ClearSpec::Color([0.0; 4]);
        assert_eq!(
            FrameGraph::new(passes).validate(),
            Err(FrameGraphError::CompositeClearsSurface { pass: "composite" })
        );
    }

    #[test]
    fn test_rejects_missing_opaque_clear() {
        let passes = graph().passes()[1..].to_vec();
        assert_eq!(
            FrameGraph::new(passes).validate(),
            Err(FrameGraphError::SurfaceNotClearedFirst)
        );
        assert_eq!(FrameGraph::new(Vec::new()).validate(), Err(FrameGraphError::Empty));
    }

    #[test]
    fn test_rejects_missing_program() {
        let passes = vec![graph().passes()[0].clone()];
        assert_eq!(
            FrameGraph::new(passes).validate(),
            Err(FrameGraphError::MissingProgram { program: "accumulate" })
        );
    }

    #[test]
    fn test_error_display() {
        let err = FrameGraphError::CompositeBeforeAccumulation { pass: "composite" };
        assert!(err.to_string().contains("composite"));
    }
}

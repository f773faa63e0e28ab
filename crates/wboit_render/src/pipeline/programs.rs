//! The three OIT programs
//!
//! Each program is a WGSL vertex/fragment pair compiled into a render pipeline.
//! Blend state is part of a wgpu pipeline, so every program is built against
//! the pass that draws it: the pass descriptor's [`BlendSpec`] and render target
//! decide the color targets. Build failures are caught with a validation error
//! scope and reported as [`RenderError::ShaderLink`].

use wgpu::util::DeviceExt;
use wboit_math::Mat4;

use super::blend::{color_targets, BlendSpec};
use super::mesh::QuadMesh;
use super::offscreen::{self, OffscreenTarget, OFFSCREEN_FORMATS};
use super::types::{GlyphUniforms, SpritePalette, SpriteUniforms};
use crate::error::RenderError;
use crate::frame::{FrameGraph, FrameGraphError, RenderTarget};
use crate::scene::{SceneParams, GLYPH};

/// Identifies one of the three programs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Solid glyph quads, no projection
    Opaque,
    /// Projected sprites writing accumulation + revealage
    Accumulate,
    /// Full-screen resolve of the offscreen attachments
    Composite,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 3] = [
        ProgramKind::Opaque,
        ProgramKind::Accumulate,
        ProgramKind::Composite,
    ];

    /// Name used in labels and diagnostics
    pub fn label(self) -> &'static str {
        match self {
            ProgramKind::Opaque => "opaque",
            ProgramKind::Accumulate => "accumulate",
            ProgramKind::Composite => "composite",
        }
    }

    /// WGSL source of the program
    pub fn source(self) -> &'static str {
        match self {
            ProgramKind::Opaque => include_str!("../shaders/opaque.wgsl"),
            ProgramKind::Accumulate => include_str!("../shaders/accumulate.wgsl"),
            ProgramKind::Composite => include_str!("../shaders/composite.wgsl"),
        }
    }
}

/// All three programs plus the uniform buffers they own
#[allow(dead_code)] // Buffers must outlive the bind groups referencing them
pub struct ProgramSet {
    opaque: wgpu::RenderPipeline,
    accumulate: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    /// Glyph table + color (written once)
    glyph_buffer: wgpu::Buffer,
    /// Projection + animation time (time rewritten each frame)
    sprite_buffer: wgpu::Buffer,
    /// Sprite color table (written once)
    palette_buffer: wgpu::Buffer,
    opaque_bind_group: wgpu::BindGroup,
    accumulate_bind_group: wgpu::BindGroup,
    /// Layout for [`OffscreenTarget`] bind groups
    composite_layout: wgpu::BindGroupLayout,
    projection: Mat4,
}

impl ProgramSet {
    /// Build every program the frame graph draws with.
    ///
    /// `projection` is the startup projection matrix; it is stored and
    /// re-uploaded unchanged alongside each time update.
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        graph: &FrameGraph,
        scene: &SceneParams,
        projection: Mat4,
    ) -> Result<Self, RenderError> {
        // Opaque uniforms
        let glyph_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Opaque Bind Group Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT)],
        });
        let glyph_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Glyph Uniform Buffer"),
            contents: bytemuck::bytes_of(&GlyphUniforms::new(&GLYPH, scene.glyph_color)),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let opaque_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Opaque Bind Group"),
            layout: &glyph_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: glyph_buffer.as_entire_binding(),
            }],
        });

        // Accumulate uniforms
        let sprite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Accumulate Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX),
                uniform_entry(1, wgpu::ShaderStages::VERTEX),
            ],
        });
        let sprite_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Uniform Buffer"),
            contents: bytemuck::bytes_of(&SpriteUniforms::new(projection, 0.0)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let palette_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Palette Buffer"),
            contents: bytemuck::bytes_of(&SpritePalette::default()),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let accumulate_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Accumulate Bind Group"),
            layout: &sprite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: sprite_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: palette_buffer.as_entire_binding(),
                },
            ],
        });

        let composite_layout = offscreen::sampling_layout(device);

        let build = |kind: ProgramKind,
                     layout: &wgpu::BindGroupLayout|
         -> Result<wgpu::RenderPipeline, RenderError> {
            let (target, blend) = graph
                .pass_for(kind)
                .map(|pass| (pass.target, pass.blend))
                .ok_or(FrameGraphError::MissingProgram { program: kind.label() })?;
            let formats: &[wgpu::TextureFormat] = match target {
                RenderTarget::Surface => std::slice::from_ref(&surface_format),
                RenderTarget::Offscreen => &OFFSCREEN_FORMATS,
            };
            build_program(device, kind, layout, blend, formats)
        };

        let opaque = build(ProgramKind::Opaque, &glyph_layout)?;
        let accumulate = build(ProgramKind::Accumulate, &sprite_layout)?;
        let composite = build(ProgramKind::Composite, &composite_layout)?;

        log::info!("Built {} programs for {:?}", ProgramKind::ALL.len(), surface_format);

        Ok(Self {
            opaque,
            accumulate,
            composite,
            glyph_buffer,
            sprite_buffer,
            palette_buffer,
            opaque_bind_group,
            accumulate_bind_group,
            composite_layout,
            projection,
        })
    }

    /// Upload this frame's animation time
    pub fn update_time(&self, queue: &wgpu::Queue, time: f32) {
        let uniforms = SpriteUniforms::new(self.projection, time);
        queue.write_buffer(&self.sprite_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Pipeline of a program
    pub fn pipeline(&self, kind: ProgramKind) -> &wgpu::RenderPipeline {
        match kind {
            ProgramKind::Opaque => &self.opaque,
            ProgramKind::Accumulate => &self.accumulate,
            ProgramKind::Composite => &self.composite,
        }
    }

    /// Bind group 0 of a program; the composite program reads the offscreen target
    pub fn bind_group<'a>(
        &'a self,
        kind: ProgramKind,
        offscreen: &'a OffscreenTarget,
    ) -> &'a wgpu::BindGroup {
        match kind {
            ProgramKind::Opaque => &self.opaque_bind_group,
            ProgramKind::Accumulate => &self.accumulate_bind_group,
            ProgramKind::Composite => offscreen.bind_group(),
        }
    }

    /// Layout the offscreen target's bind group must be created with
    pub fn composite_layout(&self) -> &wgpu::BindGroupLayout {
        &self.composite_layout
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Compile and link one program, turning validation errors into `ShaderLink`
fn build_program(
    device: &wgpu::Device,
    kind: ProgramKind,
    layout: &wgpu::BindGroupLayout,
    blend: BlendSpec,
    formats: &[wgpu::TextureFormat],
) -> Result<wgpu::RenderPipeline, RenderError> {
    let targets = color_targets(blend, formats).ok_or(FrameGraphError::AttachmentMismatch {
        program: kind.label(),
        expected: formats.len(),
        found: blend.attachment_count(),
    })?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kind.label()),
        source: wgpu::ShaderSource::Wgsl(kind.source().into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(kind.label()),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(kind.label()),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[QuadMesh::vertex_buffer_layout()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::ShaderLink {
            program: kind.label(),
            log: error.to_string(),
        });
    }

    log::debug!("Linked program '{}' ({:?}, {} targets)", kind.label(), blend, targets.len());
    Ok(pipeline)
}

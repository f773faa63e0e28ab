//! Shared unit-quad geometry
//!
//! One vertex buffer of two triangles covering [-0.5, 0.5]², used by all three
//! programs. Per-instance placement happens in the vertex stages.

use wgpu::util::DeviceExt;

use super::types::QuadVertex;

/// Two triangles covering [-0.5, 0.5]²
pub const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex::new(-0.5, -0.5),
    QuadVertex::new(0.5, 0.5),
    QuadVertex::new(0.5, -0.5),
    QuadVertex::new(-0.5, 0.5),
    QuadVertex::new(0.5, 0.5),
    QuadVertex::new(-0.5, -0.5),
];

/// Vertices issued per instance
pub const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

/// GPU copy of the unit quad
pub struct QuadMesh {
    buffer: wgpu::Buffer,
}

impl QuadMesh {
    /// Upload the quad
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self { buffer }
    }

    /// The vertex buffer, bound at slot 0
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Vertex layout shared by every program
    pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // position: vec2<f32>
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 0,
                },
            ],
        }
    }
}

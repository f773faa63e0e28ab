//! Offscreen accumulation target
//!
//! Attachment 0 accumulates weighted premultiplied color and weight
//! (`Rgba16Float`); attachment 1 accumulates revealage (`R8Unorm`, 1 = nothing
//! drawn). Both are cleared at the start of every accumulation pass, so their
//! contents never carry over between frames.

/// Format of the accumulation attachment
pub const ACCUM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Format of the revealage attachment
pub const REVEAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Attachment formats in attachment order
pub const OFFSCREEN_FORMATS: [wgpu::TextureFormat; 2] = [ACCUM_FORMAT, REVEAL_FORMAT];

/// Bind group layout through which the composite program reads both attachments
pub fn sampling_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
        },
        count: None,
    };

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Composite Bind Group Layout"),
        entries: &[texture_entry(0), texture_entry(1)],
    })
}

/// Accumulation + revealage render target
#[allow(dead_code)] // Textures must outlive their views
pub struct OffscreenTarget {
    accum_texture: wgpu::Texture,
    reveal_texture: wgpu::Texture,
    accum_view: wgpu::TextureView,
    reveal_view: wgpu::TextureView,
    /// Composite program's view of both attachments
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

impl OffscreenTarget {
    /// Allocate both attachments at the given resolution
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);

        let accum_texture =
            create_attachment(device, "OIT Accumulation Texture", ACCUM_FORMAT, width, height);
        let reveal_texture =
            create_attachment(device, "OIT Revealage Texture", REVEAL_FORMAT, width, height);

        let accum_view = accum_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let reveal_view = reveal_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Composite Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&accum_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&reveal_view),
                },
            ],
        });

        log::debug!("Created offscreen OIT target {}x{}", width, height);

        Self {
            accum_texture,
            reveal_texture,
            accum_view,
            reveal_view,
            bind_group,
            size: (width, height),
        }
    }

    /// Re-create the attachments if the size changed
    pub fn ensure_size(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
        layout: &wgpu::BindGroupLayout,
    ) {
        if self.size != (width.max(1), height.max(1)) {
            *self = Self::new(device, width, height, layout);
        }
    }

    /// Both attachment views, in attachment order
    pub fn views(&self) -> [&wgpu::TextureView; 2] {
        [&self.accum_view, &self.reveal_view]
    }

    /// Bind group for the composite program
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

fn create_attachment(
    device: &wgpu::Device,
    label: &str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

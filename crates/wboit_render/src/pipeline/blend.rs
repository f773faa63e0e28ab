//! Blend state configurations
//!
//! Each pass of the frame graph names a [`BlendSpec`]; the spec expands to one
//! `wgpu::BlendState` per color attachment. [`blend`] evaluates a blend state on
//! the host with the same fixed-function equation the GPU uses.

/// Additive blending for the accumulation attachment: `dst = src + dst`
pub const ACCUM_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Multiplicative blending for the revealage attachment: `dst = dst * (1 - src)`
pub const REVEAL_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::OneMinusSrc,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::OneMinusSrc,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Standard source-over: `(SRC_ALPHA, ONE_MINUS_SRC_ALPHA)` on color and alpha
pub const SOURCE_OVER_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Blend configuration of a pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendSpec {
    /// Fragments overwrite the single attachment
    Disabled,
    /// Attachment 0 adds, attachment 1 multiplies by `(1 - src)`
    WeightedAccumulate,
    /// Source-over on the single attachment
    SourceOver,
}

impl BlendSpec {
    /// Blend state per color attachment, in attachment order
    pub fn attachment_blends(self) -> &'static [Option<wgpu::BlendState>] {
        match self {
            BlendSpec::Disabled => &[None],
            BlendSpec::WeightedAccumulate => &[Some(ACCUM_BLEND), Some(REVEAL_BLEND)],
            BlendSpec::SourceOver => &[Some(SOURCE_OVER_BLEND)],
        }
    }

    /// Number of color attachments this configuration covers
    pub fn attachment_count(self) -> usize {
        self.attachment_blends().len()
    }
}

/// Build color target states for the given attachment formats
///
/// Returns `None` when the number of formats does not match the blend configuration.
pub fn color_targets(
    spec: BlendSpec,
    formats: &[wgpu::TextureFormat],
) -> Option<Vec<Option<wgpu::ColorTargetState>>> {
    let blends = spec.attachment_blends();
    if blends.len() != formats.len() {
        return None;
    }

    Some(
        formats
            .iter()
            .zip(blends)
            .map(|(&format, &blend)| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect(),
    )
}

/// Evaluate a blend state on the host: `src` is the fragment output, `dst` the
/// attachment's current value. `None` means blending disabled.
///
/// Constant factors use wgpu's default blend constant (transparent black) and
/// there is no second source output.
pub fn blend(state: Option<wgpu::BlendState>, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let Some(state) = state else {
        return src;
    };

    let mut out = [0.0; 4];
    for (c, value) in out.iter_mut().enumerate() {
        let component = if c < 3 { &state.color } else { &state.alpha };
        *value = apply_component(component, src, dst, c);
    }
    out
}

fn apply_component(
    component: &wgpu::BlendComponent,
    src: [f32; 4],
    dst: [f32; 4],
    c: usize,
) -> f32 {
    let s = src[c] * factor(component.src_factor, src, dst, c);
    let d = dst[c] * factor(component.dst_factor, src, dst, c);
    match component.operation {
        wgpu::BlendOperation::Add => s + d,
        wgpu::BlendOperation::Subtract => s - d,
        wgpu::BlendOperation::ReverseSubtract => d - s,
        wgpu::BlendOperation::Min => src[c].min(dst[c]),
        wgpu::BlendOperation::Max => src[c].max(dst[c]),
    }
}

fn factor(factor: wgpu::BlendFactor, src: [f32; 4], dst: [f32; 4], c: usize) -> f32 {
    use wgpu::BlendFactor as F;

    match factor {
        F::Zero => 0.0,
        F::One => 1.0,
        F::Src => src[c],
        F::OneMinusSrc => 1.0 - src[c],
        F::SrcAlpha => src[3],
        F::OneMinusSrcAlpha => 1.0 - src[3],
        F::Dst => dst[c],
        F::OneMinusDst => 1.0 - dst[c],
        F::DstAlpha => dst[3],
        F::OneMinusDstAlpha => 1.0 - dst[3],
        F::SrcAlphaSaturated => {
            if c == 3 {
                1.0
            } else {
                src[3].min(1.0 - dst[3])
            }
        }
        F::Constant | F::Src1 | F::Src1Alpha => 0.0,
        F::OneMinusConstant | F::OneMinusSrc1 | F::OneMinusSrc1Alpha => 1.0,
    }
}

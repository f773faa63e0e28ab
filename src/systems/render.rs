//! GPU rendering system
//!
//! Manages GPU rendering including:
//! - Render context and surface
//! - The three OIT programs and the offscreen target
//! - Running the frame graph once per frame

use std::sync::Arc;
use std::time::Instant;
use winit::window::Window;
use wboit_math::perspective_fov;
use wboit_render::{
    context::RenderContext,
    frame::GpuPassExecutor,
    FrameGraph, OffscreenTarget, ProgramSet, QuadMesh, RenderError,
};
use crate::config::AppConfig;

/// Per-frame error types
#[derive(Debug)]
pub enum FrameError {
    /// Surface was lost or outdated; it has been reconfigured and the frame skipped
    SurfaceLost,
    /// GPU out of memory
    OutOfMemory,
    /// Other surface error
    Other(String),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::SurfaceLost => write!(f, "Surface lost"),
            FrameError::OutOfMemory => write!(f, "Out of memory"),
            FrameError::Other(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for FrameError {}

/// Manages GPU rendering
pub struct RenderSystem {
    context: RenderContext,
    mesh: QuadMesh,
    programs: ProgramSet,
    offscreen: OffscreenTarget,
    graph: FrameGraph,
    start: Instant,
    animation_speed: f32,
}

impl RenderSystem {
    /// Create render system from window and config.
    ///
    /// Validates the frame graph and builds every program up front; any
    /// failure here is fatal and nothing is rendered.
    pub fn new(window: Arc<Window>, config: &AppConfig) -> Result<Self, RenderError> {
        let context = pollster::block_on(RenderContext::with_vsync(window, config.window.vsync))?;

        let scene = config.scene.to_scene_params();
        let graph = FrameGraph::weighted_blended(&scene);
        graph.validate()?;

        // Built once from the configured window size, never rebuilt on resize
        let projection = perspective_fov(
            config.camera.fov_y,
            config.aspect_ratio(),
            config.camera.near,
            config.camera.far,
        );

        let mesh = QuadMesh::new(&context.device);
        let programs = ProgramSet::new(
            &context.device,
            context.surface_format(),
            &graph,
            &scene,
            projection,
        )?;
        let offscreen = OffscreenTarget::new(
            &context.device,
            context.size.width,
            context.size.height,
            programs.composite_layout(),
        );

        log::info!(
            "Renderer ready: {} passes, {} sprites",
            graph.passes().len(),
            scene.sprite_count
        );

        Ok(Self {
            context,
            mesh,
            programs,
            offscreen,
            graph,
            start: Instant::now(),
            animation_speed: config.scene.animation_speed,
        })
    }

    /// Handle window resize
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.context
            .resize(winit::dpi::PhysicalSize::new(width, height));
        self.offscreen.ensure_size(
            &self.context.device,
            width,
            height,
            self.programs.composite_layout(),
        );
    }

    /// Animation time of the current frame
    fn animation_time(&self) -> f32 {
        self.start.elapsed().as_secs_f32() * self.animation_speed
    }

    /// Render a single frame and present it
    pub fn render_frame(&mut self) -> Result<(), FrameError> {
        let output = match self.context.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.context.reconfigure();
                return Err(FrameError::SurfaceLost);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(FrameError::OutOfMemory),
            Err(e) => return Err(FrameError::Other(format!("{:?}", e))),
        };

        self.programs
            .update_time(&self.context.queue, self.animation_time());

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let mut executor = GpuPassExecutor {
            encoder: &mut encoder,
            surface_view: &view,
            offscreen: &self.offscreen,
            programs: &self.programs,
            mesh: &self.mesh,
        };
        if let Err(never) = self.graph.execute(&mut executor) {
            match never {}
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

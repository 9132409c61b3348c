use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::capability::AdapterProfile;
use crate::field::FieldUniforms;
use crate::host::{DrawError, RenderSurface, SurfaceError, SurfaceRequest};
use crate::palette::Palette;
use crate::runtime::Viewport;

use super::context::GpuContext;
use super::palette::PaletteTexture;
use super::pipeline::FieldPipeline;

/// GPU path of the renderer: one window surface, one program, one palette.
///
/// Each resource sits in an `Option` so the controller's teardown calls
/// release them one at a time, in the order it chooses.
pub struct GpuSurface {
    window: Arc<Window>,
    context: Option<GpuContext>,
    pipeline: Option<FieldPipeline>,
    palette: Option<PaletteTexture>,
    uniform_buffer: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
    viewport: Viewport,
    frames: u64,
    frames_since_report: u32,
    last_report: Instant,
}

impl GpuSurface {
    pub fn new(window: Arc<Window>, request: SurfaceRequest<'_>) -> Result<Self, SurfaceError> {
        let context = GpuContext::new(window.clone(), request.viewport)?;
        let pipeline = FieldPipeline::new(&context.device, context.config.format)?;
        let palette = PaletteTexture::new(&context.device, &context.queue, request.palette);

        context
            .device
            .push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let uniform_buffer =
            context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("field uniforms"),
                    contents: bytemuck::bytes_of(request.uniforms),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
        if let Some(err) = pollster::block_on(context.device.pop_error_scope()) {
            return Err(SurfaceError::Allocation(err.to_string()));
        }
        let bind_group = pipeline.bind_group(&context.device, &uniform_buffer, &palette);

        debug!(
            width = request.viewport.width,
            height = request.viewport.height,
            profile = %request.profile,
            stops = request.palette.len(),
            "GPU surface ready"
        );

        Ok(Self {
            window,
            context: Some(context),
            pipeline: Some(pipeline),
            palette: Some(palette),
            uniform_buffer: Some(uniform_buffer),
            bind_group: Some(bind_group),
            viewport: request.viewport,
            frames: 0,
            frames_since_report: 0,
            last_report: Instant::now(),
        })
    }

    pub fn adapter(&self) -> Option<&AdapterProfile> {
        self.context.as_ref().map(|context| &context.adapter_profile)
    }

    fn report_stats(&mut self, time: f32) {
        self.frames += 1;
        self.frames_since_report += 1;
        let elapsed = self.last_report.elapsed();
        if elapsed >= Duration::from_secs(5) {
            let fps = self.frames_since_report as f32 / elapsed.as_secs_f32();
            debug!(fps = fps.round(), frames = self.frames, time, "render stats");
            self.frames_since_report = 0;
            self.last_report = Instant::now();
        }
    }
}

impl RenderSurface for GpuSurface {
    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(context) = self.context.as_mut() {
            context.resize(viewport);
        }
    }

    fn draw(&mut self, uniforms: &FieldUniforms) -> Result<(), DrawError> {
        let (Some(context), Some(pipeline), Some(buffer), Some(bind_group)) = (
            self.context.as_ref(),
            self.pipeline.as_ref(),
            self.uniform_buffer.as_ref(),
            self.bind_group.as_ref(),
        ) else {
            return Err(DrawError::Fatal("GPU resources already released".into()));
        };
        let Some(surface) = context.surface.as_ref() else {
            return Err(DrawError::Fatal("surface detached".into()));
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                return Err(DrawError::Reconfigure)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                return Err(DrawError::Transient("surface timeout".into()))
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(DrawError::Fatal("surface out of memory".into()))
            }
            Err(other) => return Err(DrawError::Transient(format!("{other:?}"))),
        };

        context
            .queue
            .write_buffer(buffer, 0, bytemuck::bytes_of(uniforms));

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("field encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("field pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        context.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        frame.present();

        self.report_stats(uniforms.time);
        Ok(())
    }

    fn update_palette(&mut self, palette: &Palette) -> Result<(), SurfaceError> {
        let (Some(context), Some(pipeline), Some(buffer)) = (
            self.context.as_ref(),
            self.pipeline.as_ref(),
            self.uniform_buffer.as_ref(),
        ) else {
            return Err(SurfaceError::Allocation("GPU resources already released".into()));
        };
        if let Some(existing) = self.palette.as_ref() {
            if existing.rewrite(&context.queue, palette) {
                debug!(stops = palette.len(), "palette rewritten in place");
                return Ok(());
            }
        }
        let texture = PaletteTexture::new(&context.device, &context.queue, palette);
        self.bind_group = Some(pipeline.bind_group(&context.device, buffer, &texture));
        self.palette = Some(texture);
        debug!(stops = palette.len(), "palette texture rebuilt");
        Ok(())
    }

    fn detach(&mut self) {
        if let Some(context) = self.context.as_mut() {
            if context.surface.take().is_some() {
                debug!("surface detached");
            }
        }
    }

    fn release_palette(&mut self) {
        self.bind_group = None;
        if let Some(palette) = self.palette.take() {
            palette.texture.destroy();
        }
    }

    fn release_program(&mut self) {
        self.pipeline = None;
    }

    fn release_buffers(&mut self) {
        if let Some(buffer) = self.uniform_buffer.take() {
            buffer.destroy();
        }
        if let Some(context) = self.context.take() {
            if context.surface.is_some() {
                warn!("releasing GPU buffers while the surface is still attached");
            }
            context.device.destroy();
        }
    }
}

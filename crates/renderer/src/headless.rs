//! Host without a window: frames are shaded on the CPU by the field mirror.
//!
//! Used by `ether snapshot` and by tests that need real pixels without a GPU.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use crate::capability::{AdapterProfile, CapabilityReport, GraphicsSupport};
use crate::controller::{Controller, ControllerState};
use crate::fallback::FallbackNode;
use crate::field::{render_rgba, unpremultiply, FieldUniforms};
use crate::host::{DrawError, FrameRequest, Host, RenderSurface, SurfaceError, SurfaceRequest};
use crate::palette::Palette;
use crate::runtime::Viewport;

/// Largest frame the software surface agrees to shade.
pub const MAX_SOFTWARE_DIMENSION: u32 = 4096;

pub struct HeadlessHost {
    viewport: Viewport,
    report: CapabilityReport,
    next_frame: u64,
    pending: Option<FrameRequest>,
    fallback: Option<FallbackNode>,
}

impl HeadlessHost {
    pub fn new(viewport: Viewport) -> Self {
        Self::with_report(viewport, Self::software_report())
    }

    pub fn with_report(viewport: Viewport, report: CapabilityReport) -> Self {
        Self {
            viewport,
            report,
            next_frame: 0,
            pending: None,
            fallback: None,
        }
    }

    /// The report a headless host gives: a software rasterizer is available.
    pub fn software_report() -> CapabilityReport {
        CapabilityReport {
            graphics: GraphicsSupport::Available {
                adapter: AdapterProfile {
                    name: "field mirror".into(),
                    backend: "Cpu".into(),
                    device_type: "Cpu".into(),
                    driver: String::new(),
                    max_texture_dimension: MAX_SOFTWARE_DIMENSION,
                    software: true,
                },
            },
            hardware_concurrency: crate::capability::host_concurrency(),
        }
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// The mounted fallback node, if the controller chose the CSS path.
    pub fn fallback(&self) -> Option<&FallbackNode> {
        self.fallback.as_ref()
    }
}

impl Host for HeadlessHost {
    type Surface = SoftwareSurface;

    fn probe(&mut self) -> CapabilityReport {
        self.report.clone()
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn create_surface(
        &mut self,
        request: SurfaceRequest<'_>,
    ) -> Result<SoftwareSurface, SurfaceError> {
        let Viewport { width, height } = request.viewport;
        if width > MAX_SOFTWARE_DIMENSION || height > MAX_SOFTWARE_DIMENSION {
            return Err(SurfaceError::Allocation(format!(
                "software surface limited to {MAX_SOFTWARE_DIMENSION}px, requested {width}x{height}"
            )));
        }
        Ok(SoftwareSurface {
            viewport: request.viewport,
            palette: Some(request.palette.clone()),
            frame: Some(vec![0; width as usize * height as usize * 4]),
            attached: true,
            frames_drawn: 0,
            program_loaded: true,
        })
    }

    fn request_frame(&mut self) -> FrameRequest {
        self.next_frame += 1;
        let request = FrameRequest(self.next_frame);
        self.pending = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }

    fn mount_fallback(&mut self, node: &FallbackNode) {
        self.fallback = Some(node.clone());
    }

    fn unmount_fallback(&mut self) {
        self.fallback = None;
    }
}

/// CPU surface holding the last shaded frame as premultiplied RGBA8.
#[derive(Debug)]
pub struct SoftwareSurface {
    viewport: Viewport,
    palette: Option<Palette>,
    frame: Option<Vec<u8>>,
    attached: bool,
    frames_drawn: u64,
    program_loaded: bool,
}

impl SoftwareSurface {
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn frame(&self) -> Option<&[u8]> {
        self.frame.as_deref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl RenderSurface for SoftwareSurface {
    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(frame) = self.frame.as_mut() {
            frame.clear();
            frame.resize(viewport.width as usize * viewport.height as usize * 4, 0);
        }
    }

    fn draw(&mut self, uniforms: &FieldUniforms) -> Result<(), DrawError> {
        if !self.attached || !self.program_loaded {
            return Err(DrawError::Fatal("surface already torn down".into()));
        }
        let palette = self
            .palette
            .as_ref()
            .ok_or_else(|| DrawError::Fatal("palette released".into()))?;
        let Viewport { width, height } = self.viewport;
        let pixels = render_rgba(width, height, uniforms, palette);
        match self.frame.as_mut() {
            Some(frame) if frame.len() == pixels.len() => frame.copy_from_slice(&pixels),
            Some(_) => return Err(DrawError::Reconfigure),
            None => return Err(DrawError::Fatal("frame buffer released".into())),
        }
        self.frames_drawn += 1;
        Ok(())
    }

    fn update_palette(&mut self, palette: &Palette) -> Result<(), SurfaceError> {
        self.palette = Some(palette.clone());
        Ok(())
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn release_palette(&mut self) {
        self.palette = None;
    }

    fn release_program(&mut self) {
        self.program_loaded = false;
    }

    fn release_buffers(&mut self) {
        self.frame = None;
    }
}

/// Fires pending frame requests until `frames` frames were drawn or the
/// controller leaves the running state. Returns the number drawn.
///
/// Callback timestamps are synthesised one frame interval apart so the
/// pacing logic sees a steady cadence.
pub fn run_frames(controller: &mut Controller<HeadlessHost>, frames: u32) -> u64 {
    let interval = controller
        .config()
        .runtime
        .frame_interval()
        .unwrap_or(Duration::ZERO);
    let start_frames = controller.clock().frames();
    let target = start_frames + u64::from(frames);
    let mut now = Instant::now();
    while controller.state() == ControllerState::Running && controller.clock().frames() < target {
        if controller.host_mut().pending.take().is_none() {
            break;
        }
        controller.on_frame(now);
        now += interval;
    }
    controller.clock().frames() - start_frames
}

/// Writes the last shaded frame as a straight-alpha PNG.
pub fn save_png(surface: &SoftwareSurface, path: &Path) -> Result<()> {
    let frame = surface
        .frame()
        .ok_or_else(|| anyhow!("software surface has no frame buffer"))?;
    let mut pixels = frame.to_vec();
    unpremultiply(&mut pixels);
    let Viewport { width, height } = surface.viewport();
    let image = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| anyhow!("frame buffer does not match {width}x{height}"))?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

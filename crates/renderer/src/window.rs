use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::capability::{CapabilityProbe, CapabilityReport, WgpuProbe};
use crate::controller::{Controller, ControllerState};
use crate::fallback::FallbackNode;
use crate::gpu::GpuSurface;
use crate::host::{FrameRequest, Host, SurfaceError, SurfaceRequest};
use crate::runtime::Viewport;
use crate::types::RenderConfig;

/// Desktop window options.
#[derive(Debug, Clone)]
pub struct WindowOptions {
    pub title: String,
    pub size: Viewport,
    /// Where the fallback stylesheet is written when the GPU path is skipped.
    pub fallback_css: Option<PathBuf>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "Liquid Ether".into(),
            size: Viewport::new(1280, 720),
            fallback_css: None,
        }
    }
}

/// Hosts the controller inside a winit window.
pub struct WindowHost {
    window: Arc<Window>,
    title: String,
    probe: Box<dyn CapabilityProbe>,
    next_frame: u64,
    pending: Option<FrameRequest>,
    fallback_css: Option<PathBuf>,
    fallback: Option<FallbackNode>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>, fallback_css: Option<PathBuf>) -> Self {
        Self::with_probe(window, fallback_css, Box::new(WgpuProbe::default()))
    }

    pub fn with_probe(
        window: Arc<Window>,
        fallback_css: Option<PathBuf>,
        probe: Box<dyn CapabilityProbe>,
    ) -> Self {
        Self {
            title: window.title(),
            window,
            probe,
            next_frame: 0,
            pending: None,
            fallback_css,
            fallback: None,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn take_pending(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }
}

impl Host for WindowHost {
    type Surface = GpuSurface;

    fn probe(&mut self) -> CapabilityReport {
        self.probe.probe()
    }

    fn viewport(&self) -> Viewport {
        let size = self.window.inner_size();
        Viewport::new(size.width, size.height)
    }

    fn create_surface(&mut self, request: SurfaceRequest<'_>) -> Result<GpuSurface, SurfaceError> {
        GpuSurface::new(self.window.clone(), request)
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
        self.window.set_title(&fallback_title(&self.title));
        match &self.fallback_css {
            Some(path) => match std::fs::write(path, &node.stylesheet) {
                Ok(()) => info!(path = %path.display(), "wrote fallback stylesheet"),
                Err(err) => warn!(path = %path.display(), error = %err, "failed to write fallback stylesheet"),
            },
            None => info!(classes = ?node.class_list, "fallback stylesheet:\n{}", node.stylesheet),
        }
        self.fallback = Some(node.clone());
    }

    fn unmount_fallback(&mut self) {
        if self.fallback.take().is_some() {
            self.window.set_title(&self.title);
            tracing::debug!("fallback node removed");
        }
    }
}

fn fallback_title(title: &str) -> String {
    format!("{title} (CSS fallback)")
}

/// Opens a window and drives a controller until the window closes.
pub fn run_window(config: RenderConfig, options: WindowOptions) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = WindowBuilder::new()
        .with_title(options.title.clone())
        .with_inner_size(PhysicalSize::new(options.size.width, options.size.height))
        .with_transparent(true)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let host = WindowHost::new(window.clone(), options.fallback_css);
    let mut controller = Some(Controller::mount(host, config));
    if let Some(controller) = controller.as_ref() {
        info!(state = ?controller.state(), "controller mounted");
    }

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { event, window_id } if window_id == window.id() => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    if let Some(mut controller) = controller.take() {
                        controller.unmount();
                    }
                    elwt.exit();
                }
                WindowEvent::Resized(size) => {
                    if size.width == 0 || size.height == 0 {
                        return;
                    }
                    if let Some(controller) = controller.as_mut() {
                        controller.resize(Viewport::new(size.width, size.height));
                    }
                }
                WindowEvent::RedrawRequested => {
                    let Some(controller) = controller.as_mut() else {
                        return;
                    };
                    if controller.host_mut().take_pending().is_some() {
                        controller.on_frame(Instant::now());
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                let Some(controller) = controller.as_ref() else {
                    elwt.set_control_flow(ControlFlow::Wait);
                    return;
                };
                if controller.state() != ControllerState::Running || !controller.host().has_pending()
                {
                    elwt.set_control_flow(ControlFlow::Wait);
                    return;
                }
                let now = Instant::now();
                match controller.next_deadline() {
                    Some(deadline) if deadline > now => {
                        elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                    }
                    _ => {
                        controller.host().window().request_redraw();
                        elwt.set_control_flow(ControlFlow::Wait);
                    }
                }
            }
            Event::LoopExiting => {
                if let Some(mut controller) = controller.take() {
                    controller.unmount();
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}

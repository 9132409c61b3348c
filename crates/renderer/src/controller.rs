//! Lifecycle state machine for one mounted background.
//!
//! ```text
//!   Uninitialized ──probe fails──────────────▶ CssFallback ──▶ Unmounted
//!        │                                        ▲
//!        └─probe ok─▶ Initializing ──error────────┤
//!                          │                      │
//!                          └─ok─▶ Running ──fatal draw┘
//!                                    │
//!                                    └──────────────────────▶ Unmounted
//! ```
//!
//! Nothing escapes the controller: capability gaps, initialisation errors and
//! fatal draw errors all end on the CSS gradient.

use std::time::Instant;

use crate::capability::{CapabilityPolicy, Decision, FallbackReason};
use crate::fallback::FallbackStyle;
use crate::field::FieldUniforms;
use crate::host::{DrawError, FrameRequest, Host, RenderSurface, SurfaceError, SurfaceRequest};
use crate::palette::{Color, Palette};
use crate::runtime::{FixedStepClock, FrameScheduler, Viewport};
use crate::types::{RenderConfig, DEFAULT_COLORS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    Uninitialized,
    Initializing,
    Running,
    CssFallback,
    Unmounted,
}

pub struct Controller<H: Host> {
    host: H,
    config: RenderConfig,
    state: ControllerState,
    history: Vec<ControllerState>,
    clock: FixedStepClock,
    scheduler: FrameScheduler,
    viewport: Viewport,
    uniforms: FieldUniforms,
    palette: Option<Palette>,
    surface: Option<H::Surface>,
    pending: Option<FrameRequest>,
    fallback_reason: Option<FallbackReason>,
}

impl<H: Host> Controller<H> {
    /// Mounts with a clock starting at zero, stepping by the sanitized
    /// `runtime.time_step`.
    pub fn mount(host: H, config: RenderConfig) -> Self {
        let config = config.sanitized();
        let clock = FixedStepClock::new(config.runtime.time_step);
        Self::mount_with_clock(host, config, clock)
    }

    /// Mounts with an injected clock. The clock keeps its own step.
    pub fn mount_with_clock(host: H, config: RenderConfig, clock: FixedStepClock) -> Self {
        let mut config = config.sanitized();
        if let Err(err) = Palette::new(&config.colors) {
            tracing::warn!(error = %err, "invalid palette; using default colors");
            config.colors = DEFAULT_COLORS.to_vec();
        }
        let viewport = host.viewport();
        let uniforms = FieldUniforms::new(&config, config.colors.len(), viewport);
        let scheduler = FrameScheduler::new(config.runtime.frame_interval());

        let mut controller = Self {
            host,
            config,
            state: ControllerState::Uninitialized,
            history: vec![ControllerState::Uninitialized],
            clock,
            scheduler,
            viewport,
            uniforms,
            palette: None,
            surface: None,
            pending: None,
            fallback_reason: None,
        };
        controller.start();
        controller
    }

    fn start(&mut self) {
        let report = self.host.probe();
        let policy = CapabilityPolicy::from_runtime(&self.config.runtime);
        match policy.decide(&report) {
            Decision::Fallback(reason) => self.enter_fallback(reason),
            Decision::Gpu => {
                self.transition(ControllerState::Initializing);
                match self.initialize() {
                    Ok(()) => {
                        self.transition(ControllerState::Running);
                        self.schedule_frame();
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "GPU initialisation failed");
                        self.enter_fallback(FallbackReason::InitFailed {
                            detail: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    fn initialize(&mut self) -> Result<(), SurfaceError> {
        let palette = Palette::new(&self.config.colors)
            .map_err(|err| SurfaceError::Allocation(err.to_string()))?;
        self.uniforms.set_palette_size(palette.len());
        let surface = self.host.create_surface(SurfaceRequest {
            viewport: self.viewport,
            palette: &palette,
            uniforms: &self.uniforms,
            profile: self.config.profile,
        })?;
        self.palette = Some(palette);
        self.surface = Some(surface);
        Ok(())
    }

    fn transition(&mut self, next: ControllerState) {
        tracing::debug!(from = ?self.state, to = ?next, "controller transition");
        self.state = next;
        self.history.push(next);
    }

    fn enter_fallback(&mut self, reason: FallbackReason) {
        tracing::info!(%reason, "using CSS gradient fallback");
        let node = FallbackStyle::from_config(&self.config).node();
        self.host.mount_fallback(&node);
        self.fallback_reason = Some(reason);
        self.transition(ControllerState::CssFallback);
    }

    fn schedule_frame(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.host.request_frame());
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Every state visited since mount, in order.
    pub fn history(&self) -> &[ControllerState] {
        &self.history
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        self.fallback_reason.as_ref()
    }

    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn uniforms(&self) -> &FieldUniforms {
        &self.uniforms
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Palette currently uploaded to the GPU path.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn surface(&self) -> Option<&H::Surface> {
        self.surface.as_ref()
    }

    /// Earliest instant the next frame would be drawn, if paced.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Animation callback. Call once per fired [`FrameRequest`].
    pub fn on_frame(&mut self, now: Instant) {
        if self.state != ControllerState::Running {
            return;
        }
        self.pending = None;
        if !self.scheduler.ready_for_frame(now) {
            self.schedule_frame();
            return;
        }

        // The clock only advances for presented frames.
        self.uniforms.set_time(self.clock.peek());
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        match surface.draw(&self.uniforms) {
            Ok(()) => {
                self.clock.tick();
                self.scheduler.mark_rendered(now);
            }
            Err(DrawError::Reconfigure) => {
                tracing::debug!(viewport = ?self.viewport, "reconfiguring surface");
                surface.resize(self.viewport);
            }
            Err(DrawError::Transient(detail)) => {
                tracing::debug!(%detail, "frame skipped");
            }
            Err(DrawError::Fatal(detail)) => {
                tracing::error!(%detail, "fatal draw error");
                self.teardown_gpu();
                self.enter_fallback(FallbackReason::DrawFailed { detail });
                return;
            }
        }
        self.schedule_frame();
    }

    /// Applies a new drawable size. Repeating the current size is a no-op.
    pub fn resize(&mut self, viewport: Viewport) {
        if viewport == self.viewport || self.state == ControllerState::Unmounted {
            return;
        }
        self.viewport = viewport;
        self.uniforms.set_viewport(viewport);
        if let Some(surface) = self.surface.as_mut() {
            surface.resize(viewport);
        }
    }

    /// Recolors the running effect, rebuilding the palette only when the
    /// list actually changed.
    pub fn set_colors(&mut self, colors: Vec<Color>) {
        if colors == self.config.colors || self.state == ControllerState::Unmounted {
            return;
        }
        let palette = match Palette::new(&colors) {
            Ok(palette) => palette,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring palette update");
                return;
            }
        };
        self.config.colors = colors;
        self.uniforms.set_palette_size(palette.len());
        match self.state {
            ControllerState::Running => {
                let result = match self.surface.as_mut() {
                    Some(surface) => surface.update_palette(&palette),
                    None => Ok(()),
                };
                match result {
                    Ok(()) => self.palette = Some(palette),
                    Err(err) => {
                        tracing::error!(error = %err, "palette upload failed");
                        self.teardown_gpu();
                        self.enter_fallback(FallbackReason::DrawFailed {
                            detail: err.to_string(),
                        });
                    }
                }
            }
            ControllerState::CssFallback => {
                let node = FallbackStyle::from_config(&self.config).node();
                self.host.unmount_fallback();
                self.host.mount_fallback(&node);
            }
            _ => {}
        }
    }

    fn teardown_gpu(&mut self) {
        if let Some(request) = self.pending.take() {
            self.host.cancel_frame(request);
        }
        if let Some(mut surface) = self.surface.take() {
            surface.detach();
            surface.release_palette();
            surface.release_program();
            surface.release_buffers();
        }
        self.palette = None;
        self.scheduler.reset();
    }

    /// Tears everything down. Safe to call more than once.
    pub fn unmount(&mut self) {
        match self.state {
            ControllerState::Unmounted => return,
            ControllerState::CssFallback => {
                if let Some(request) = self.pending.take() {
                    self.host.cancel_frame(request);
                }
                self.host.unmount_fallback();
            }
            _ => self.teardown_gpu(),
        }
        self.transition(ControllerState::Unmounted);
    }
}

impl<H: Host> Drop for Controller<H> {
    fn drop(&mut self) {
        self.unmount();
    }
}

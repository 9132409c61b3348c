//! The seam between the controller and whatever embeds it.
//!
//! A [`Host`] owns the platform pieces: the animation-frame source, the
//! drawable surface and the node the CSS fallback is mounted into. The
//! controller only ever talks to these traits, which is what lets the same
//! state machine drive a winit window, the headless software surface and the
//! recording mocks in tests.

use thiserror::Error;

use crate::capability::CapabilityReport;
use crate::fallback::FallbackNode;
use crate::field::FieldUniforms;
use crate::palette::Palette;
use crate::runtime::Viewport;
use crate::types::QualityProfile;

/// Handle for one scheduled animation callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Failures while acquiring or building the GPU path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("failed to acquire graphics context: {0}")]
    Context(String),
    #[error("no suitable graphics adapter: {0}")]
    Adapter(String),
    #[error("shader compilation failed: {0}")]
    Compile(String),
    #[error("failed to allocate GPU resources: {0}")]
    Allocation(String),
}

/// Failures while drawing a frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    /// The frame was dropped; the next one may succeed.
    #[error("frame skipped: {0}")]
    Transient(String),
    /// The surface must be reconfigured before the next frame.
    #[error("surface lost or outdated")]
    Reconfigure,
    #[error("unrecoverable draw failure: {0}")]
    Fatal(String),
}

/// Everything a host needs to build the GPU path.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceRequest<'a> {
    pub viewport: Viewport,
    pub palette: &'a Palette,
    pub uniforms: &'a FieldUniforms,
    pub profile: QualityProfile,
}

/// A live drawing surface and the GPU objects behind it.
///
/// Teardown happens through the `detach`/`release_*` calls, which the
/// controller issues in a fixed order; dropping afterwards must be cheap.
pub trait RenderSurface {
    fn resize(&mut self, viewport: Viewport);

    /// Uploads `uniforms` and draws one frame.
    fn draw(&mut self, uniforms: &FieldUniforms) -> Result<(), DrawError>;

    /// Replaces the palette lookup without touching the program.
    fn update_palette(&mut self, palette: &Palette) -> Result<(), SurfaceError>;

    fn detach(&mut self);
    fn release_palette(&mut self);
    fn release_program(&mut self);
    fn release_buffers(&mut self);
}

pub trait Host {
    type Surface: RenderSurface;

    fn probe(&mut self) -> CapabilityReport;

    fn viewport(&self) -> Viewport;

    fn create_surface(&mut self, request: SurfaceRequest<'_>)
        -> Result<Self::Surface, SurfaceError>;

    /// Schedules exactly one animation callback.
    fn request_frame(&mut self) -> FrameRequest;

    fn cancel_frame(&mut self, request: FrameRequest);

    fn mount_fallback(&mut self, node: &FallbackNode);

    fn unmount_fallback(&mut self);
}

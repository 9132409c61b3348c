//! Liquid Ether: an animated procedural background.
//!
//! ```text
//!   host (window / headless / page)
//!          │ RenderConfig
//!          ▼
//!   Controller::mount ──probe──▶ CapabilityPolicy ──▶ CSS fallback
//!          │
//!          ▼
//!   Palette ─▶ RenderSurface::draw(FieldUniforms) ◀── FixedStepClock
//! ```
//!
//! The [`Controller`] is the only thing a host talks to. It decides between
//! the GPU field shader and the CSS gradient, owns the clock and viewport,
//! and tears resources down in a fixed order on unmount. [`field`] holds the
//! shader source together with a CPU mirror of it used by the headless host.

pub mod capability;
mod compile;
pub mod controller;
pub mod fallback;
pub mod field;
mod gpu;
pub mod headless;
pub mod host;
pub mod palette;
pub mod runtime;
pub mod types;
mod window;

pub use capability::{
    AdapterProfile, CapabilityPolicy, CapabilityProbe, CapabilityReport, Decision, FallbackReason,
    GraphicsSupport, StaticProbe, WgpuProbe,
};
pub use compile::validate_wgsl;
pub use controller::{Controller, ControllerState};
pub use fallback::{FallbackNode, FallbackStyle};
pub use field::FieldUniforms;
pub use gpu::GpuSurface;
pub use headless::{run_frames, save_png, HeadlessHost, SoftwareSurface};
pub use host::{DrawError, FrameRequest, Host, RenderSurface, SurfaceError, SurfaceRequest};
pub use palette::{parse_colors, Color, Palette, PaletteError};
pub use runtime::{FixedStepClock, FrameScheduler, Viewport};
pub use types::{
    LiquidSettings, Presentation, QualityProfile, RenderConfig, RuntimeSettings, StarSettings,
    DEFAULT_COLORS, MAX_STAR_LAYERS,
};
pub use window::{run_window, WindowHost, WindowOptions};

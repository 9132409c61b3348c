//! wgpu backend for the field generator.
//!
//! - `context` owns instance/device/surface wiring and reconfigures the
//!   swapchain on resize.
//! - `palette` uploads the 1×N lookup and rewrites it in place on recolor.
//! - `pipeline` compiles the WGSL program and builds its bind group.
//! - `state` ties them together as a [`crate::RenderSurface`].

mod context;
mod palette;
mod pipeline;
mod state;

pub use state::GpuSurface;

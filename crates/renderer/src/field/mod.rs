//! Procedural field generator.
//!
//! The field is a pure function of (pixel, time, palette, tuning). It exists
//! twice: as the WGSL program in [`SHADER_WGSL`] that the GPU path compiles,
//! and as [`shade`], a CPU mirror of the same arithmetic that the headless
//! surface and the tests use. Both read their inputs from [`FieldUniforms`].

mod reference;
mod stars;

use bytemuck::{Pod, Zeroable};

use crate::runtime::Viewport;
use crate::types::RenderConfig;

pub use reference::{render_rgba, shade, unpremultiply};
pub use stars::{star_seed, starfield, StarSeed};

/// WGSL source for the fullscreen field program.
pub const SHADER_WGSL: &str = include_str!("../shaders/liquid_ether.wgsl");

/// Flow layer table: (spatial frequency, time multiplier, phase, weight).
///
/// The first layer dominates; the simple profile drops the last row.
pub const FLOW_LAYERS: [[f32; 4]; 4] = [
    [1.0, 1.0, 0.0, 1.0],
    [1.9, 1.31, 1.7, 0.55],
    [3.3, 0.73, 4.1, 0.3],
    [5.7, 1.67, 2.3, 0.15],
];

/// Uniform block shared by the WGSL program and the CPU mirror.
///
/// Layout matches `struct Field` in the shader: a `vec2<f32>` followed by
/// sixteen 4-byte scalars and trailing padding up to 80 bytes.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub opacity: f32,
    pub flow_speed: f32,
    pub turbulence: f32,
    pub color_mixing: f32,
    pub color_intensity: f32,
    pub background_darkness: f32,
    pub initial_brightness: f32,
    pub palette_size: u32,
    pub flow_layers: u32,
    /// Zero disables the starfield.
    pub star_layers: u32,
    pub star_density: f32,
    pub star_drift: f32,
    pub star_rotation: f32,
    pub star_brightness: f32,
    pub star_twinkle: f32,
    pub _padding: [f32; 2],
}

unsafe impl Zeroable for FieldUniforms {}
unsafe impl Pod for FieldUniforms {}

impl FieldUniforms {
    /// Builds the block for a sanitized configuration at time zero.
    pub fn new(config: &RenderConfig, palette_size: usize, viewport: Viewport) -> Self {
        let mut uniforms = Self {
            resolution: [0.0, 0.0],
            time: 0.0,
            opacity: config.opacity,
            flow_speed: config.liquid.flow_speed,
            turbulence: config.liquid.turbulence,
            color_mixing: config.liquid.color_mixing,
            color_intensity: config.liquid.color_intensity,
            background_darkness: config.liquid.background_darkness,
            initial_brightness: config.liquid.initial_brightness,
            palette_size: palette_size as u32,
            flow_layers: config.profile.flow_layers(),
            star_layers: config.effective_star_layers(),
            star_density: config.stars.density,
            star_drift: config.stars.drift_speed,
            star_rotation: config.stars.rotation_speed,
            star_brightness: config.stars.brightness,
            star_twinkle: config.stars.twinkle_speed,
            _padding: [0.0; 2],
        };
        uniforms.set_viewport(viewport);
        uniforms
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.resolution = [viewport.width as f32, viewport.height as f32];
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    pub fn set_palette_size(&mut self, size: usize) {
        self.palette_size = size as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QualityProfile;

    #[test]
    fn uniform_block_is_eighty_bytes() {
        assert_eq!(std::mem::size_of::<FieldUniforms>(), 80);
        assert_eq!(std::mem::align_of::<FieldUniforms>(), 16);
    }

    #[test]
    fn profile_selects_flow_layers() {
        let mut config = RenderConfig::default();
        config.profile = QualityProfile::Simple;
        let uniforms = FieldUniforms::new(&config, 3, Viewport::new(10, 20));
        assert_eq!(uniforms.flow_layers, 3);
        assert_eq!(uniforms.resolution, [10.0, 20.0]);
        config.profile = QualityProfile::Full;
        assert_eq!(FieldUniforms::new(&config, 3, Viewport::new(1, 1)).flow_layers, 4);
    }

    #[test]
    fn shader_declares_expected_bindings() {
        assert!(SHADER_WGSL.contains("@group(0) @binding(0)"));
        assert!(SHADER_WGSL.contains("@group(0) @binding(1)"));
        assert!(SHADER_WGSL.contains("@group(0) @binding(2)"));
        assert!(SHADER_WGSL.contains("fn vs_main"));
        assert!(SHADER_WGSL.contains("fn fs_main"));
    }
}

use std::collections::BTreeMap;
use std::time::Duration;

use crate::palette::Color;

/// Hard cap on starfield depth planes understood by the field shader.
pub const MAX_STAR_LAYERS: u32 = 7;

/// Palette used when a caller mounts the renderer without any colors.
pub const DEFAULT_COLORS: [Color; 3] = [
    Color::rgb(0x52, 0x27, 0xff),
    Color::rgb(0xff, 0x9f, 0xfc),
    Color::rgb(0xb1, 0x9e, 0xef),
];

/// Frame rate the GPU path is capped to unless the caller asks otherwise.
pub const DEFAULT_MAX_FPS: f32 = 15.0;

/// Clock increment applied per rendered frame.
pub const DEFAULT_TIME_STEP: f32 = 0.016;

/// Supported range for a frame-rate cap.
pub const MIN_FPS: f32 = 0.1;
pub const MAX_FPS: f32 = 1000.0;

/// Largest clock increment per frame, in seconds.
pub const MAX_TIME_STEP: f32 = 1.0;

/// Cost/fidelity trade-off for the field shader.
///
/// Both profiles share the same pipeline; they only differ in how many flow
/// layers are summed and how many starfield planes are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityProfile {
    /// Three flow layers and at most three star planes.
    Simple,
    /// Four flow layers and the full seven star planes.
    #[default]
    Full,
}

impl QualityProfile {
    pub fn flow_layers(self) -> u32 {
        match self {
            QualityProfile::Simple => 3,
            QualityProfile::Full => 4,
        }
    }

    pub fn max_star_layers(self) -> u32 {
        match self {
            QualityProfile::Simple => 3,
            QualityProfile::Full => MAX_STAR_LAYERS,
        }
    }
}

impl std::fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityProfile::Simple => f.write_str("simple"),
            QualityProfile::Full => f.write_str("full"),
        }
    }
}

/// Starfield tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarSettings {
    pub enabled: bool,
    /// Requested depth planes; clamped to [`MAX_STAR_LAYERS`].
    pub layers: u32,
    pub density: f32,
    pub drift_speed: f32,
    pub rotation_speed: f32,
    pub brightness: f32,
    pub twinkle_speed: f32,
}

impl Default for StarSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            layers: 4,
            density: 1.0,
            drift_speed: 0.05,
            rotation_speed: 0.02,
            brightness: 1.0,
            twinkle_speed: 1.0,
        }
    }
}

/// Liquid field tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiquidSettings {
    pub flow_speed: f32,
    pub turbulence: f32,
    pub color_mixing: f32,
    pub color_intensity: f32,
    pub background_darkness: f32,
    pub initial_brightness: f32,
}

impl Default for LiquidSettings {
    fn default() -> Self {
        Self {
            flow_speed: 1.0,
            turbulence: 1.0,
            color_mixing: 1.0,
            color_intensity: 1.0,
            background_darkness: 0.35,
            initial_brightness: 1.0,
        }
    }
}

/// Presentation hooks forwarded to whatever node hosts the effect.
///
/// They never change what the renderer computes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    pub class_name: Option<String>,
    pub style: BTreeMap<String, String>,
}

/// Host-side knobs: pacing, clock step and capability policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSettings {
    /// Upper bound on presented frames per second; `None` renders every callback.
    pub max_fps: Option<f32>,
    /// Fixed clock increment per rendered frame.
    pub time_step: f32,
    /// Skip the GPU path regardless of what the probe reports.
    pub force_fallback: bool,
    /// Accept software rasterizers as a GPU path.
    pub allow_software: bool,
    /// Devices reporting fewer hardware threads are treated as low-end.
    pub min_concurrency: usize,
}

impl RuntimeSettings {
    /// Minimum spacing between rendered frames, if capped.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.max_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .and_then(|fps| Duration::try_from_secs_f32(1.0 / fps).ok())
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            max_fps: Some(DEFAULT_MAX_FPS),
            time_step: DEFAULT_TIME_STEP,
            force_fallback: false,
            allow_software: false,
            min_concurrency: 2,
        }
    }
}

/// Immutable per-mount configuration.
///
/// `RenderConfig` is what a hosting page hands to [`crate::Controller::mount`].
/// Out-of-range numbers are tolerated here; [`RenderConfig::sanitized`] clamps
/// them before anything reaches the shader.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub colors: Vec<Color>,
    pub opacity: f32,
    pub profile: QualityProfile,
    pub stars: StarSettings,
    pub liquid: LiquidSettings,
    pub presentation: Presentation,
    pub runtime: RuntimeSettings,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            colors: DEFAULT_COLORS.to_vec(),
            opacity: 1.0,
            profile: QualityProfile::default(),
            stars: StarSettings::default(),
            liquid: LiquidSettings::default(),
            presentation: Presentation::default(),
            runtime: RuntimeSettings::default(),
        }
    }
}

impl RenderConfig {
    /// Star planes the shader will actually evaluate.
    pub fn effective_star_layers(&self) -> u32 {
        if !self.stars.enabled {
            return 0;
        }
        self.stars.layers.min(self.profile.max_star_layers())
    }

    /// Returns a copy with every tuning value pulled into its documented range.
    ///
    /// Clamping is logged rather than rejected.
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        config.opacity = clamp_logged("opacity", self.opacity, 0.0, 1.0, 1.0);

        let stars = &mut config.stars;
        if stars.layers > MAX_STAR_LAYERS {
            tracing::warn!(
                requested = stars.layers,
                max = MAX_STAR_LAYERS,
                "star layer count clamped"
            );
            stars.layers = MAX_STAR_LAYERS;
        }
        stars.density = clamp_logged("stars.density", stars.density, 0.0, 8.0, 1.0);
        stars.drift_speed = clamp_logged("stars.drift_speed", stars.drift_speed, -4.0, 4.0, 0.0);
        stars.rotation_speed =
            clamp_logged("stars.rotation_speed", stars.rotation_speed, -4.0, 4.0, 0.0);
        stars.brightness = clamp_logged("stars.brightness", stars.brightness, 0.0, 4.0, 1.0);
        stars.twinkle_speed =
            clamp_logged("stars.twinkle_speed", stars.twinkle_speed, 0.0, 16.0, 1.0);

        let liquid = &mut config.liquid;
        liquid.flow_speed = clamp_logged("liquid.flow_speed", liquid.flow_speed, 0.0, 10.0, 1.0);
        liquid.turbulence = clamp_logged("liquid.turbulence", liquid.turbulence, 0.0, 4.0, 1.0);
        liquid.color_mixing =
            clamp_logged("liquid.color_mixing", liquid.color_mixing, 0.0, 2.0, 1.0);
        liquid.color_intensity =
            clamp_logged("liquid.color_intensity", liquid.color_intensity, 0.0, 4.0, 1.0);
        liquid.background_darkness = clamp_logged(
            "liquid.background_darkness",
            liquid.background_darkness,
            0.0,
            1.0,
            0.0,
        );
        liquid.initial_brightness = clamp_logged(
            "liquid.initial_brightness",
            liquid.initial_brightness,
            0.0,
            4.0,
            1.0,
        );

        let runtime = &mut config.runtime;
        if !runtime.time_step.is_finite() || runtime.time_step < 0.0 {
            tracing::warn!(value = runtime.time_step, "invalid time step; using default");
            runtime.time_step = DEFAULT_TIME_STEP;
        }
        runtime.time_step = clamp_logged(
            "runtime.time_step",
            runtime.time_step,
            0.0,
            MAX_TIME_STEP,
            DEFAULT_TIME_STEP,
        );
        runtime.max_fps = runtime
            .max_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| clamp_logged("runtime.max_fps", fps, MIN_FPS, MAX_FPS, DEFAULT_MAX_FPS));

        config
    }
}

fn clamp_logged(name: &str, value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        tracing::warn!(option = name, fallback, "non-finite value replaced");
        return fallback;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::warn!(option = name, value, clamped, "value clamped to supported range");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_layers_clamp_to_hard_cap() {
        let mut config = RenderConfig::default();
        config.stars.enabled = true;
        config.stars.layers = 12;
        assert_eq!(config.effective_star_layers(), MAX_STAR_LAYERS);
        assert_eq!(config.sanitized().stars.layers, MAX_STAR_LAYERS);
    }

    #[test]
    fn simple_profile_limits_star_layers() {
        let mut config = RenderConfig::default();
        config.profile = QualityProfile::Simple;
        config.stars.enabled = true;
        config.stars.layers = 7;
        assert_eq!(config.effective_star_layers(), 3);
    }

    #[test]
    fn disabled_stars_report_zero_layers() {
        let config = RenderConfig::default();
        assert!(!config.stars.enabled);
        assert_eq!(config.effective_star_layers(), 0);
    }

    #[test]
    fn sanitize_clamps_and_replaces_non_finite() {
        let mut config = RenderConfig::default();
        config.opacity = 3.0;
        config.stars.density = -2.0;
        config.liquid.turbulence = f32::NAN;
        config.runtime.max_fps = Some(0.0);
        let clean = config.sanitized();
        assert_eq!(clean.opacity, 1.0);
        assert_eq!(clean.stars.density, 0.0);
        assert_eq!(clean.liquid.turbulence, 1.0);
        assert_eq!(clean.runtime.max_fps, None);
    }

    #[test]
    fn tiny_and_huge_fps_caps_are_clamped() {
        let mut config = RenderConfig::default();
        config.runtime.max_fps = Some(1e-20);
        let clean = config.sanitized();
        assert_eq!(clean.runtime.max_fps, Some(MIN_FPS));
        let interval = clean.runtime.frame_interval().expect("capped");
        assert!((interval.as_secs_f32() - 10.0).abs() < 1e-3);

        config.runtime.max_fps = Some(1e9);
        assert_eq!(config.sanitized().runtime.max_fps, Some(MAX_FPS));
    }

    #[test]
    fn unsanitized_extreme_fps_does_not_panic() {
        let runtime = RuntimeSettings {
            max_fps: Some(1e-30),
            ..RuntimeSettings::default()
        };
        assert!(runtime.frame_interval().is_none());
    }

    #[test]
    fn bad_time_steps_are_replaced_or_clamped() {
        let mut config = RenderConfig::default();
        for step in [-1.0, f32::INFINITY, f32::NAN] {
            config.runtime.time_step = step;
            assert_eq!(config.sanitized().runtime.time_step, DEFAULT_TIME_STEP);
        }
        config.runtime.time_step = 50.0;
        assert_eq!(config.sanitized().runtime.time_step, MAX_TIME_STEP);
    }

    #[test]
    fn frame_interval_follows_fps_cap() {
        let runtime = RuntimeSettings::default();
        let interval = runtime.frame_interval().expect("capped");
        assert!((interval.as_secs_f32() - 1.0 / 15.0).abs() < 1e-4);
        let uncapped = RuntimeSettings {
            max_fps: None,
            ..RuntimeSettings::default()
        };
        assert!(uncapped.frame_interval().is_none());
    }
}

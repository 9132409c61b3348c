//! Turns `ether.toml` plus command-line overrides into a [`RenderConfig`].

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use etherconfig::{EtherConfig, FrameCap, ProfileSetting};
use renderer::{parse_colors, QualityProfile, RenderConfig};

use crate::cli::ConfigArgs;
use crate::paths::AppPaths;

/// Loads the explicit `--config` file, or the default file when it exists.
///
/// A missing default file yields an empty configuration; a missing explicit
/// file is an error.
pub fn load_file(explicit: Option<&Path>, paths: &AppPaths) -> Result<EtherConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = paths.config_file();
            if !default.exists() {
                tracing::debug!(path = %default.display(), "no config file; using defaults");
                return Ok(EtherConfig::empty());
            }
            default
        }
    };
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = EtherConfig::from_toml_str(&text)
        .with_context(|| format!("failed to load config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

pub fn resolve(args: &ConfigArgs, paths: &AppPaths) -> Result<RenderConfig> {
    let file = load_file(args.config.as_deref(), paths)?;
    render_config(&file, args)
}

pub fn render_config(file: &EtherConfig, args: &ConfigArgs) -> Result<RenderConfig> {
    let mut config = RenderConfig::default();

    if let Some(colors) = args.colors.as_ref().or(file.colors.as_ref()) {
        config.colors = parse_colors(colors.as_slice()).context("invalid palette")?;
    }
    if let Some(profile) = args.profile.or(file.profile) {
        config.profile = map_profile(profile);
    }
    if let Some(opacity) = file.opacity {
        config.opacity = opacity;
    }
    config.presentation.class_name = file.class_name.clone();
    config.presentation.style = file.style.clone();

    let stars = &file.stars;
    config.stars.enabled = args.stars || stars.enabled.unwrap_or(config.stars.enabled);
    override_with(&mut config.stars.layers, stars.layers);
    override_with(&mut config.stars.density, stars.density);
    override_with(&mut config.stars.drift_speed, stars.drift_speed);
    override_with(&mut config.stars.rotation_speed, stars.rotation_speed);
    override_with(&mut config.stars.brightness, stars.brightness);
    override_with(&mut config.stars.twinkle_speed, stars.twinkle_speed);

    let liquid = &file.liquid;
    override_with(&mut config.liquid.flow_speed, liquid.flow_speed);
    override_with(&mut config.liquid.turbulence, liquid.turbulence);
    override_with(&mut config.liquid.color_mixing, liquid.color_mixing);
    override_with(&mut config.liquid.color_intensity, liquid.color_intensity);
    override_with(
        &mut config.liquid.background_darkness,
        liquid.background_darkness,
    );
    override_with(
        &mut config.liquid.initial_brightness,
        liquid.initial_brightness,
    );

    let runtime = &file.runtime;
    match args.fps {
        Some(fps) if fps == 0.0 => config.runtime.max_fps = None,
        Some(fps) => config.runtime.max_fps = Some(fps),
        None => match file.frame_cap() {
            FrameCap::Unset => {}
            FrameCap::Uncapped => config.runtime.max_fps = None,
            FrameCap::Fps(fps) => config.runtime.max_fps = Some(fps),
        },
    }
    override_with(&mut config.runtime.time_step, runtime.time_step);
    config.runtime.force_fallback =
        args.force_fallback || runtime.force_fallback.unwrap_or(false);
    override_with(&mut config.runtime.allow_software, runtime.allow_software);
    override_with(&mut config.runtime.min_concurrency, runtime.min_concurrency);

    Ok(config)
}

fn map_profile(profile: ProfileSetting) -> QualityProfile {
    match profile {
        ProfileSetting::Simple => QualityProfile::Simple,
        ProfileSetting::Full => QualityProfile::Full,
    }
}

fn override_with<T: Copy>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

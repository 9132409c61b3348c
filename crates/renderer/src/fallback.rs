//! CSS gradient substitute for devices that do not get the GPU path.
//!
//! The stylesheet layers one radial gradient per palette blob over a linear
//! base gradient and cycles `background-position` with a keyframe loop. It is
//! derived from the same colors and tuning as the shader so swapping paths
//! keeps the look roughly consistent.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

use crate::palette::Color;
use crate::types::RenderConfig;

/// Class every fallback node carries; the stylesheet targets it.
pub const FALLBACK_CLASS: &str = "liquid-ether-fallback";
const KEYFRAMES: &str = "liquid-ether-drift";

/// Blob centres as (x%, y%) positions.
const BLOBS: [(u32, u32); 3] = [(20, 30), (78, 24), (50, 82)];

/// Loop length at flow speed 1.
const BASE_LOOP_SECS: f32 = 24.0;

/// The styled node that replaces the GPU surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackNode {
    pub class_list: Vec<String>,
    pub inline_style: String,
    pub stylesheet: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackStyle {
    colors: Vec<Color>,
    opacity: f32,
    loop_duration: Option<Duration>,
    class_name: Option<String>,
    style: BTreeMap<String, String>,
}

impl FallbackStyle {
    /// Expects a sanitized configuration.
    pub fn from_config(config: &RenderConfig) -> Self {
        let colors = if config.colors.is_empty() {
            crate::types::DEFAULT_COLORS.to_vec()
        } else {
            config.colors.clone()
        };
        let speed = config.liquid.flow_speed;
        let loop_duration = (speed > 0.0)
            .then(|| Duration::from_secs_f32((BASE_LOOP_SECS / speed).clamp(4.0, 120.0)));
        Self {
            colors,
            opacity: config.opacity,
            loop_duration,
            class_name: config.presentation.class_name.clone(),
            style: config.presentation.style.clone(),
        }
    }

    /// `None` when the flow is frozen and the gradient stays static.
    pub fn loop_duration(&self) -> Option<Duration> {
        self.loop_duration
    }

    fn color_at(&self, index: usize) -> Color {
        let last = self.colors.len().saturating_sub(1);
        self.colors[index.min(last)]
    }

    fn background_image(&self) -> String {
        let mut layers: Vec<String> = BLOBS
            .iter()
            .enumerate()
            .map(|(i, (x, y))| {
                format!(
                    "radial-gradient(circle at {x}% {y}%, {} 0%, {} 60%)",
                    rgba(self.color_at(i), 0.85),
                    rgba(self.color_at(i), 0.0),
                )
            })
            .collect();
        let stops: Vec<String> = self.colors.iter().map(|c| rgba(*c, 0.55)).collect();
        let base = if stops.len() == 1 {
            format!("linear-gradient(135deg, {0}, {0})", stops[0])
        } else {
            format!("linear-gradient(135deg, {})", stops.join(", "))
        };
        layers.push(base);
        layers.join(",\n    ")
    }

    pub fn class_list(&self) -> Vec<String> {
        let mut classes = vec![FALLBACK_CLASS.to_string()];
        if let Some(extra) = &self.class_name {
            classes.extend(extra.split_whitespace().map(str::to_string));
        }
        classes
    }

    /// Passthrough style entries as a `style` attribute value.
    pub fn inline_style(&self) -> String {
        self.style
            .iter()
            .filter_map(|(key, value)| declaration(key, value))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn stylesheet(&self) -> String {
        let mut css = String::new();
        let _ = writeln!(css, ".{FALLBACK_CLASS} {{");
        let _ = writeln!(css, "  position: absolute;");
        let _ = writeln!(css, "  inset: 0;");
        let _ = writeln!(css, "  pointer-events: none;");
        let _ = writeln!(css, "  opacity: {};", trim_float(self.opacity));
        let _ = writeln!(css, "  background-image:\n    {};", self.background_image());
        let _ = writeln!(css, "  background-size: 200% 200%;");
        let _ = writeln!(css, "  background-position: 0% 50%;");
        if let Some(duration) = self.loop_duration {
            let _ = writeln!(
                css,
                "  animation: {KEYFRAMES} {}s ease-in-out infinite;",
                trim_float(duration.as_secs_f32())
            );
        }
        let _ = writeln!(css, "}}");

        if self.loop_duration.is_some() {
            let _ = writeln!(css);
            let _ = writeln!(css, "@keyframes {KEYFRAMES} {{");
            let _ = writeln!(css, "  0% {{ background-position: 0% 50%; }}");
            let _ = writeln!(css, "  50% {{ background-position: 100% 50%; }}");
            let _ = writeln!(css, "  100% {{ background-position: 0% 50%; }}");
            let _ = writeln!(css, "}}");
            let _ = writeln!(css);
            let _ = writeln!(css, "@media (prefers-reduced-motion: reduce) {{");
            let _ = writeln!(css, "  .{FALLBACK_CLASS} {{ animation: none; }}");
            let _ = writeln!(css, "}}");
        }
        css
    }

    pub fn node(&self) -> FallbackNode {
        FallbackNode {
            class_list: self.class_list(),
            inline_style: self.inline_style(),
            stylesheet: self.stylesheet(),
        }
    }
}

fn rgba(color: Color, alpha: f32) -> String {
    let a = alpha * color.a as f32 / 255.0;
    format!(
        "rgba({}, {}, {}, {})",
        color.r,
        color.g,
        color.b,
        trim_float(a)
    )
}

fn trim_float(value: f32) -> String {
    let text = format!("{value:.3}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Drops entries that could escape the declaration block.
fn declaration(key: &str, value: &str) -> Option<String> {
    let unsafe_char = |c: char| matches!(c, ';' | '{' | '}' | '<' | '>');
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() || key.contains(unsafe_char) || value.contains(unsafe_char)
    {
        tracing::warn!(key, value, "ignoring style passthrough entry");
        return None;
    }
    Some(format!("{key}: {value};"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::parse_colors;

    fn config_with(colors: &[&str]) -> RenderConfig {
        RenderConfig {
            colors: parse_colors(colors).unwrap(),
            ..RenderConfig::default()
        }
    }

    #[test]
    fn stylesheet_uses_every_color() {
        let style = FallbackStyle::from_config(&config_with(&["#ff0000", "#00ff00", "#0000ff"]));
        let css = style.stylesheet();
        assert!(css.contains("rgba(255, 0, 0, 0.85)"));
        assert!(css.contains("rgba(0, 255, 0, 0.85)"));
        assert!(css.contains("rgba(0, 0, 255, 0.85)"));
        assert!(css.contains("linear-gradient(135deg"));
        assert!(css.contains("background-size: 200% 200%"));
        assert!(css.contains("@keyframes liquid-ether-drift"));
    }

    #[test]
    fn short_palettes_repeat_last_color() {
        let style = FallbackStyle::from_config(&config_with(&["#102030"]));
        let css = style.stylesheet();
        assert_eq!(css.matches("radial-gradient").count(), 3);
        assert_eq!(css.matches("rgba(16, 32, 48, 0.85)").count(), 3);
    }

    #[test]
    fn loop_duration_tracks_flow_speed() {
        let mut config = RenderConfig::default();
        config.liquid.flow_speed = 2.0;
        let style = FallbackStyle::from_config(&config);
        assert_eq!(style.loop_duration(), Some(Duration::from_secs(12)));
        assert!(style.stylesheet().contains("liquid-ether-drift 12s"));

        config.liquid.flow_speed = 0.0;
        let frozen = FallbackStyle::from_config(&config);
        assert_eq!(frozen.loop_duration(), None);
        assert!(!frozen.stylesheet().contains("animation:"));
    }

    #[test]
    fn reduced_motion_disables_animation() {
        let css = FallbackStyle::from_config(&RenderConfig::default()).stylesheet();
        assert!(css.contains("@media (prefers-reduced-motion: reduce)"));
    }

    #[test]
    fn presentation_is_passed_through() {
        let mut config = RenderConfig::default();
        config.presentation.class_name = Some("hero  backdrop".into());
        config.presentation.style.insert("z-index".into(), "-1".into());
        config
            .presentation
            .style
            .insert("color".into(), "red; } body {".into());
        let node = FallbackStyle::from_config(&config).node();
        assert_eq!(node.class_list, vec![FALLBACK_CLASS, "hero", "backdrop"]);
        assert_eq!(node.inline_style, "z-index: -1;");
    }

    #[test]
    fn trims_float_noise() {
        assert_eq!(trim_float(1.0), "1");
        assert_eq!(trim_float(0.5), "0.5");
        assert_eq!(trim_float(0.0), "0");
        assert_eq!(trim_float(0.125), "0.125");
    }
}

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use super::stars::starfield;
use super::{FieldUniforms, FLOW_LAYERS};
use crate::palette::Palette;

pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Shades one pixel. `frag` is the pixel centre in framebuffer coordinates
/// (origin top-left), exactly what `@builtin(position)` yields.
///
/// Returns premultiplied RGBA in `[0, 1]`.
pub fn shade(frag: Vec2, u: &FieldUniforms, palette: &Palette) -> [f32; 4] {
    let res = Vec2::from(u.resolution).max(Vec2::ONE);
    let uv = frag / res;
    let centered = uv * 2.0 - 1.0;
    let p = centered * res / res.min_element();
    let st = u.time * u.flow_speed;

    let warp = Vec2::new(
        (p.y * 1.4 + st * 0.6 + 0.5).sin(),
        (p.x * 1.2 - st * 0.5 + 0.3).cos(),
    );
    let q = p + warp * (u.turbulence * 0.35);

    let layers = u.flow_layers.clamp(1, FLOW_LAYERS.len() as u32) as usize;
    let mut raw = 0.0;
    let mut weight = 0.0;
    for [freq, speed, phase, w] in FLOW_LAYERS.iter().take(layers).copied() {
        let wave = 0.5
            * ((q.x * freq + st * speed + phase).sin()
                + (q.y * freq * 0.9 - st * speed * 0.8 + phase * 1.3).cos());
        raw += wave * w;
        weight += w;
    }
    raw /= weight;

    let mask = smoothstep(-0.55, 0.55, raw);
    let ta = (0.5 + 0.5 * u.color_mixing * raw).clamp(0.0, 1.0);
    let tb = (0.5 + 0.5 * u.color_mixing * (raw * PI + st * 0.35 + 2.1).sin()).clamp(0.0, 1.0);
    let ca = palette.sample(ta);
    let cb = palette.sample(tb);
    let blended = Vec3::new(ca[0], ca[1], ca[2]).lerp(Vec3::new(cb[0], cb[1], cb[2]), mask);
    let stop_alpha = ca[3] + (cb[3] - ca[3]) * mask;

    let mut color = blended * (u.color_intensity * u.initial_brightness);
    color *= 1.0 - u.background_darkness * (1.0 - mask);

    let fade = 1.0 - smoothstep(0.7, 1.42, centered.length());
    let alpha = (mask * u.opacity * fade * stop_alpha).clamp(0.0, 1.0);

    let stars = if u.star_layers > 0 {
        starfield(p, u)
    } else {
        0.0
    };
    let star_amount = (stars * u.opacity * fade).clamp(0.0, 1.0);
    let out_alpha = (alpha + star_amount).clamp(0.0, 1.0);
    if out_alpha < 1.0 / 255.0 {
        return [0.0; 4];
    }
    let rgb = (color * alpha + Vec3::splat(star_amount)).min(Vec3::splat(out_alpha));
    [rgb.x, rgb.y, rgb.z, out_alpha]
}

/// Renders a full frame as premultiplied RGBA8, row-major from the top.
pub fn render_rgba(width: u32, height: u32, u: &FieldUniforms, palette: &Palette) -> Vec<u8> {
    let mut frame = *u;
    frame.resolution = [width as f32, height as f32];
    let mut out = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let px = shade(Vec2::new(x as f32 + 0.5, y as f32 + 0.5), &frame, palette);
            out.extend(px.iter().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8));
        }
    }
    out
}

/// Converts premultiplied RGBA8 to straight alpha in place, for image files.
pub fn unpremultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = px[3];
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{parse_colors, Color};
    use crate::runtime::Viewport;
    use crate::types::{QualityProfile, RenderConfig};

    fn uniforms(config: &RenderConfig, width: u32, height: u32) -> FieldUniforms {
        let clean = config.sanitized();
        FieldUniforms::new(&clean, clean.colors.len(), Viewport::new(width, height))
    }

    fn black_white() -> Palette {
        Palette::new(&parse_colors(&["#000000", "#ffffff"]).unwrap()).unwrap()
    }

    #[test]
    fn center_of_black_white_palette_is_a_blend() {
        for profile in [QualityProfile::Simple, QualityProfile::Full] {
            let config = RenderConfig {
                profile,
                colors: black_white().colors().to_vec(),
                ..RenderConfig::default()
            };
            let u = uniforms(&config, 64, 64);
            assert_eq!(u.palette_size, 2);
            let px = shade(Vec2::new(32.0, 32.0), &u, &black_white());
            assert!(px[3] > 0.5, "alpha {}", px[3]);
            let straight = px[0] / px[3];
            assert!(straight > 0.05 && straight < 0.95, "{profile}: {straight}");
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
        }
    }

    #[test]
    fn shading_is_pure() {
        let mut config = RenderConfig::default();
        config.stars.enabled = true;
        let u = uniforms(&config, 128, 72);
        let palette = Palette::new(&config.colors).unwrap();
        for (x, y) in [(3.5, 4.5), (64.5, 36.5), (120.5, 70.5)] {
            let frag = Vec2::new(x, y);
            assert_eq!(shade(frag, &u, &palette), shade(frag, &u, &palette));
        }
    }

    #[test]
    fn output_is_premultiplied() {
        let mut config = RenderConfig::default();
        config.stars.enabled = true;
        config.stars.layers = 7;
        config.opacity = 0.6;
        let u = uniforms(&config, 48, 32);
        let palette = Palette::new(&[Color::rgb(255, 255, 255)]).unwrap();
        let frame = render_rgba(48, 32, &u, &palette);
        for px in frame.chunks_exact(4) {
            assert!(px[0] <= px[3] && px[1] <= px[3] && px[2] <= px[3]);
        }
    }

    #[test]
    fn corners_fade_out() {
        let u = uniforms(&RenderConfig::default(), 64, 64);
        let px = shade(Vec2::new(0.5, 0.5), &u, &black_white());
        assert!(px[3] < 0.01);
    }

    #[test]
    fn zero_opacity_is_fully_transparent() {
        let mut config = RenderConfig::default();
        config.opacity = 0.0;
        config.stars.enabled = true;
        let u = uniforms(&config, 32, 32);
        let frame = render_rgba(32, 32, &u, &black_white());
        assert!(frame.iter().all(|b| *b == 0));
    }

    #[test]
    fn extreme_tuning_stays_finite() {
        let mut config = RenderConfig::default();
        config.liquid.turbulence = 1e9;
        config.liquid.flow_speed = f32::INFINITY;
        config.liquid.color_mixing = -5.0;
        config.stars.enabled = true;
        config.stars.layers = 99;
        config.stars.density = 1e6;
        let mut u = uniforms(&config, 16, 16);
        u.set_time(1e4);
        let px = shade(Vec2::new(8.0, 8.0), &u, &black_white());
        assert!(px.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn unpremultiply_restores_straight_alpha() {
        let mut px = [64, 32, 0, 128, 10, 10, 10, 0];
        unpremultiply(&mut px);
        assert_eq!(px, [128, 64, 0, 128, 0, 0, 0, 0]);
    }
}

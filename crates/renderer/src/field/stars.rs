//! Hashed starfield.
//!
//! Star placement uses the PCG integer hash on grid-cell coordinates, so a
//! given cell produces the same star on every frame and on both the CPU and
//! the GPU. Only rotation, drift and twinkle depend on time.

use std::f32::consts::TAU;

use glam::{IVec2, Vec2};

use super::reference::smoothstep;
use super::FieldUniforms;

/// Cells per unit of aspect-corrected space at density 1.
const BASE_CELLS: f32 = 6.0;
/// Fraction of cells that hold a star.
const STAR_PRESENCE: f32 = 0.35;

/// Per-cell star parameters derived from the hash.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StarSeed {
    /// Offset from the cell centre, in cell units.
    pub offset: Vec2,
    /// Glow radius in cell units.
    pub size: f32,
    pub present: bool,
    /// Twinkle phase in `[0, 1)`.
    pub phase: f32,
}

fn pcg(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

fn unit(h: u32) -> f32 {
    (h >> 8) as f32 / 16_777_216.0
}

/// Deterministic star for a cell of a given layer.
pub fn star_seed(layer: u32, cell: IVec2) -> StarSeed {
    let h0 = pcg(pcg(pcg(layer) ^ cell.x as u32) ^ cell.y as u32);
    let h1 = pcg(h0);
    let h2 = pcg(h1);
    let h3 = pcg(h2);
    let h4 = pcg(h3);
    StarSeed {
        offset: (Vec2::new(unit(h0), unit(h1)) - 0.5) * 0.7,
        size: 0.02 + 0.06 * unit(h2),
        present: unit(h3) < STAR_PRESENCE,
        phase: unit(h4),
    }
}

/// Star intensity at aspect-corrected point `p`, before opacity and fade.
pub fn starfield(p: Vec2, u: &FieldUniforms) -> f32 {
    let angle = u.time * u.star_rotation;
    let rp = Vec2::from_angle(angle).rotate(p);
    let drift = Vec2::new(0.0, u.time * u.star_drift);
    let mut total = 0.0;
    for i in 0..u.star_layers {
        let depth = i as f32;
        let scale = BASE_CELLS * u.star_density * (1.0 + depth * 0.75);
        let grid = (rp + drift) * scale + Vec2::new(depth * 17.3, depth * 9.1);
        let cell = grid.floor();
        let local = grid - cell - 0.5;
        let seed = star_seed(i, cell.as_ivec2());
        if !seed.present {
            continue;
        }
        let d = (local - seed.offset).length();
        let glow = 1.0 - smoothstep(0.0, seed.size, d);
        let twinkle = 0.6 + 0.4 * (u.time * u.star_twinkle + seed.phase * TAU).sin();
        total += glow * twinkle * u.star_brightness / (1.0 + depth * 0.6);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_are_stable_and_bounded() {
        for layer in 0..7 {
            for x in -20..20 {
                for y in -20..20 {
                    let cell = IVec2::new(x, y);
                    let a = star_seed(layer, cell);
                    assert_eq!(a, star_seed(layer, cell));
                    assert!(a.offset.x.abs() <= 0.35 && a.offset.y.abs() <= 0.35);
                    assert!((0.02..=0.08).contains(&a.size));
                    assert!((0.0..1.0).contains(&a.phase));
                }
            }
        }
    }

    #[test]
    fn roughly_a_third_of_cells_hold_stars() {
        let mut present = 0;
        let total = 64 * 64;
        for x in 0..64 {
            for y in 0..64 {
                if star_seed(0, IVec2::new(x, y)).present {
                    present += 1;
                }
            }
        }
        let ratio = present as f32 / total as f32;
        assert!(ratio > 0.25 && ratio < 0.45, "ratio {ratio}");
    }

    #[test]
    fn layers_hash_independently() {
        let cell = IVec2::new(3, -4);
        assert_ne!(star_seed(0, cell), star_seed(1, cell));
    }

    #[test]
    fn zero_layers_emit_nothing() {
        let u = FieldUniforms {
            star_layers: 0,
            star_density: 1.0,
            star_brightness: 1.0,
            ..bytemuck::Zeroable::zeroed()
        };
        assert_eq!(starfield(Vec2::new(0.1, 0.2), &u), 0.0);
    }
}

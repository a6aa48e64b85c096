//! Twinkling particle backdrop. Purely decorative: drift is wall-clock
//! driven, only size/brightness react to the audio energy.

use std::f32::consts::TAU;

use macroquad::prelude::{vec2, Color, Vec2};
use macroquad::rand::gen_range;

use crate::modes::Primitive;

struct Particle {
    pos: Vec2,
    base_radius: f32,
    drift: Vec2,
    phase: f32,
}

pub struct ParticleField {
    particles: Vec<Particle>,
    width: f32,
    height: f32,
}

impl ParticleField {
    pub fn new(count: usize, width: f32, height: f32) -> Self {
        let particles = (0..count)
            .map(|_| Particle {
                pos: vec2(gen_range(0.0, width), gen_range(0.0, height)),
                base_radius: gen_range(1.0, 3.0),
                drift: vec2(gen_range(-12.0, 12.0), gen_range(-12.0, 12.0)),
                phase: gen_range(0.0, TAU),
            })
            .collect();
        Self {
            particles,
            width,
            height,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Re-seed the field when the canvas geometry changes.
    pub fn resize(&mut self, width: f32, height: f32) {
        if (width - self.width).abs() > f32::EPSILON || (height - self.height).abs() > f32::EPSILON
        {
            *self = Self::new(self.particles.len(), width, height);
        }
    }

    /// Advance drift positions, wrapping toroidally at the canvas bounds.
    pub fn advance(&mut self, dt: f32) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return;
        }
        for p in &mut self.particles {
            p.pos += p.drift * dt;
            p.pos.x = p.pos.x.rem_euclid(self.width);
            p.pos.y = p.pos.y.rem_euclid(self.height);
        }
    }

    /// Current frame's discs: twinkle alpha from wall-clock phase, radius
    /// scaled by energy (255-scale).
    pub fn primitives(&self, time: f64, energy: f32) -> Vec<Primitive> {
        let scale = 1.0 + energy / 255.0 * 0.8;
        self.particles
            .iter()
            .map(|p| {
                let twinkle = ((time as f32 * 2.0 + p.phase).sin() * 0.5 + 0.5) * 0.45 + 0.25;
                Primitive::Disc {
                    center: p.pos,
                    radius: p.base_radius * scale,
                    color: Color::new(0.6, 0.85, 1.0, twinkle),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_fixed_and_positions_wrap() {
        macroquad::rand::srand(7);
        let mut field = ParticleField::new(40, 320.0, 200.0);
        assert_eq!(field.len(), 40);
        for _ in 0..500 {
            field.advance(0.5);
        }
        assert_eq!(field.len(), 40);
        for prim in field.primitives(0.0, 0.0) {
            let Primitive::Disc { center, .. } = prim else {
                panic!("expected disc");
            };
            assert!((0.0..320.0).contains(&center.x));
            assert!((0.0..200.0).contains(&center.y));
        }
    }

    #[test]
    fn energy_scales_disc_radius() {
        macroquad::rand::srand(7);
        let field = ParticleField::new(10, 100.0, 100.0);
        let quiet = field.primitives(1.0, 0.0);
        let loud = field.primitives(1.0, 255.0);
        for (a, b) in quiet.iter().zip(&loud) {
            let (Primitive::Disc { radius: ra, .. }, Primitive::Disc { radius: rb, .. }) = (a, b)
            else {
                panic!("expected discs");
            };
            assert!((rb / ra - 1.8).abs() < 1e-3);
        }
    }

    #[test]
    fn resize_reseeds_within_new_bounds() {
        macroquad::rand::srand(7);
        let mut field = ParticleField::new(25, 800.0, 600.0);
        field.resize(100.0, 50.0);
        assert_eq!(field.len(), 25);
        for prim in field.primitives(0.0, 0.0) {
            let Primitive::Disc { center, .. } = prim else {
                panic!("expected disc");
            };
            assert!(center.x < 100.0 && center.y < 50.0);
        }
    }
}

//! Frame renderer: background, particle backdrop, mode dispatch, and the
//! shared ring/label overlays, in that fixed order.

use macroquad::prelude::*;

use crate::analyser;
use crate::config::{Mode, Theme, ANGLE_ENERGY_DIV, ANGLE_STEP};
use crate::modes::{self, FrameParams, Primitive};
use crate::particles::ParticleField;

/// Per-frame inputs the renderer is a pure function of (plus the
/// accumulated angle shift it owns).
pub struct FrameInput<'a> {
    pub buffer: &'a [u8],
    pub mode: Mode,
    /// Wall-clock seconds since startup.
    pub time: f64,
    /// Seconds since the previous frame.
    pub dt: f32,
}

pub struct Scene {
    theme: Theme,
    label: String,
    particles: Option<ParticleField>,
    angle_shift: f32,
}

impl Scene {
    pub fn new(theme: Theme, label: String, with_particles: bool) -> Self {
        let particles = (with_particles && theme.particle_count > 0)
            .then(|| ParticleField::new(theme.particle_count, screen_width(), screen_height()));
        Self {
            theme,
            label,
            particles,
            angle_shift: 0.0,
        }
    }

    pub fn angle_shift(&self) -> f32 {
        self.angle_shift
    }

    /// Draw one complete frame and advance the animation state.
    pub fn render(&mut self, input: &FrameInput) {
        let width = screen_width();
        let height = screen_height();
        let min_dim = width.min(height);
        let center = vec2(width / 2.0, height / 2.0);
        let energy = analyser::energy(input.buffer);
        let bass = analyser::bass_energy(input.buffer);

        clear_background(BLACK);
        draw_vignette(center, min_dim);
        draw_scanlines(width, height, self.theme.scanline_step_px);

        if let Some(field) = &mut self.particles {
            field.resize(width, height);
            field.advance(input.dt);
            draw_primitives(&field.primitives(input.time, energy));
        }

        let radius = self.theme.working_radius(min_dim, input.time);
        let params = FrameParams {
            center,
            width,
            height,
            min_dim,
            radius,
            bars: self.theme.bar_count(min_dim),
            dots: self.theme.dot_count(min_dim),
            spiral_points: self.theme.spiral_points(min_dim),
            angle_shift: self.angle_shift,
            time: input.time,
            hue_cycle: self.theme.hue_cycle,
        };
        draw_primitives(&modes::build(input.mode, &params, input.buffer));

        if input.mode.has_ring() {
            draw_circle_lines(
                center.x,
                center.y,
                radius + self.theme.ring_offset_px,
                self.theme.ring_offset_px + energy / 18.0,
                Color::new(1.0, 0.84, 0.0, 0.22),
            );
        }

        self.draw_label(center, min_dim, bass);
        self.advance(energy);
    }

    /// Center label, counter-rotated by the accumulated angle so it reads
    /// against the rotating modes; size breathes with bass energy.
    fn draw_label(&self, center: Vec2, min_dim: f32, bass: f32) {
        let size = min_dim * self.theme.label_size_frac * (1.0 + bass / 255.0 * 0.25);
        let font_size = size.round().max(8.0) as u16;
        let dims = measure_text(&self.label, None, font_size, 1.0);
        let rotation = -self.angle_shift;
        // Rotate the baseline offset around the canvas center so the pivot
        // stays put as the label spins.
        let (sin, cos) = rotation.sin_cos();
        let offset = vec2(-dims.width / 2.0, min_dim * 0.03);
        let pos = center + vec2(cos * offset.x - sin * offset.y, sin * offset.x + cos * offset.y);
        draw_text_ex(
            &self.label,
            pos.x,
            pos.y,
            TextParams {
                font_size,
                rotation,
                color: GOLD,
                ..Default::default()
            },
        );
    }

    /// Advance the rotation state: fixed step plus a small energy term,
    /// every frame, unconditionally.
    pub fn advance(&mut self, energy: f32) {
        self.angle_shift += ANGLE_STEP + energy / ANGLE_ENERGY_DIV;
    }
}

/// Cinematic vignette: darkening band from 0.2 to 0.5 of the smaller
/// dimension, approximated with concentric strokes.
fn draw_vignette(center: Vec2, min_dim: f32) {
    const STEPS: usize = 24;
    let inner = min_dim * 0.2;
    let outer = min_dim * 0.5;
    let thickness = (outer - inner) / STEPS as f32 + 1.0;
    for i in 0..STEPS {
        let t = i as f32 / (STEPS - 1) as f32;
        let r = inner + (outer - inner) * t;
        draw_circle_lines(center.x, center.y, r, thickness, Color::new(0.0, 0.0, 0.0, 0.18 * t));
    }
}

fn draw_scanlines(width: f32, height: f32, step: f32) {
    let color = Color::new(0.0, 1.0, 1.0, 0.07);
    let mut y = 0.0;
    while y < height {
        draw_rectangle(0.0, y, width, 2.0, color);
        y += step;
    }
}

pub fn draw_primitives(prims: &[Primitive]) {
    for prim in prims {
        match prim {
            Primitive::Segment {
                from,
                to,
                thickness,
                color,
            } => draw_line(from.x, from.y, to.x, to.y, *thickness, *color),
            Primitive::Rect { pos, size, color } => {
                draw_rectangle(pos.x, pos.y, size.x, size.y, *color)
            }
            Primitive::Disc {
                center,
                radius,
                color,
            } => draw_circle(center.x, center.y, *radius, *color),
            Primitive::Polyline {
                points,
                thickness,
                color,
            } => {
                for pair in points.windows(2) {
                    draw_line(pair[0].x, pair[0].y, pair[1].x, pair[1].y, *thickness, *color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_shift_is_strictly_increasing() {
        let mut scene = Scene::new(Theme::default(), "TEST".into(), false);
        let mut last = scene.angle_shift();
        for _ in 0..100 {
            scene.advance(0.0);
            assert!(scene.angle_shift() > last);
            last = scene.angle_shift();
        }
    }

    #[test]
    fn energy_speeds_up_rotation() {
        let mut quiet = Scene::new(Theme::default(), "TEST".into(), false);
        let mut loud = Scene::new(Theme::default(), "TEST".into(), false);
        for _ in 0..10 {
            quiet.advance(0.0);
            loud.advance(255.0);
        }
        assert!(loud.angle_shift() > quiet.angle_shift());
    }
}

//! The seven visualization routines. Each one turns the sample buffer
//! into a list of drawing primitives; the scene translates those into
//! actual draw calls. Keeping the geometry pure makes every mode
//! checkable without a window.

use std::f32::consts::TAU;

use macroquad::prelude::{vec2, Color, Vec2};

use crate::config::Mode;

/// One drawable shape in canvas coordinates.
#[derive(Debug, Clone)]
pub enum Primitive {
    Segment {
        from: Vec2,
        to: Vec2,
        thickness: f32,
        color: Color,
    },
    Rect {
        pos: Vec2,
        size: Vec2,
        color: Color,
    },
    Disc {
        center: Vec2,
        radius: f32,
        color: Color,
    },
    Polyline {
        points: Vec<Vec2>,
        thickness: f32,
        color: Color,
    },
}

/// Everything a mode routine needs for one frame.
#[derive(Debug, Clone)]
pub struct FrameParams {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
    pub min_dim: f32,
    /// Working radius for the rotating modes.
    pub radius: f32,
    pub bars: usize,
    pub dots: usize,
    pub spiral_points: usize,
    pub angle_shift: f32,
    /// Wall-clock seconds, drives hue cycling.
    pub time: f64,
    pub hue_cycle: bool,
}

/// Dispatch to the routine for `mode`. Total over the enum; callers that
/// parse mode names get the circular fallback from `Mode::from_name`.
pub fn build(mode: Mode, p: &FrameParams, buffer: &[u8]) -> Vec<Primitive> {
    match mode {
        Mode::Circular => circular_spokes(p, buffer),
        Mode::Linear => linear_bars(p, buffer),
        Mode::Waveform => waveform_line(p, buffer),
        Mode::Radial => radial_lines(p, buffer),
        Mode::Dot => dot_orbit(p, buffer),
        Mode::Spiral => spiral_arm(p, buffer),
        Mode::Mirror => mirror_bars(p, buffer),
    }
}

/// Element i reads buffer index `i mod len`; the buffer is reused
/// cyclically when the element count exceeds it.
pub fn sample_at(buffer: &[u8], i: usize) -> u8 {
    if buffer.is_empty() {
        0
    } else {
        buffer[i % buffer.len()]
    }
}

fn circular_spokes(p: &FrameParams, buffer: &[u8]) -> Vec<Primitive> {
    let mut out = Vec::with_capacity(p.bars);
    for i in 0..p.bars {
        let angle = (i as f32 / p.bars as f32) * TAU + p.angle_shift;
        let val = sample_at(buffer, i) as f32;
        let len = p.radius + val / 255.0 * (p.min_dim * 0.13);
        let dir = vec2(angle.cos(), angle.sin());
        out.push(Primitive::Segment {
            from: p.center + dir * p.radius,
            to: p.center + dir * len,
            thickness: 5.5 + val / 90.0,
            color: element_color(p, cycle_hue(angle.to_degrees(), p.time, 18.0), 0.68 + val / 700.0),
        });
    }
    out
}

fn linear_bars(p: &FrameParams, buffer: &[u8]) -> Vec<Primitive> {
    let bar_width = p.width / p.bars as f32;
    let mut out = Vec::with_capacity(p.bars);
    for i in 0..p.bars {
        let val = sample_at(buffer, i) as f32;
        let bar_height = val / 255.0 * (p.height * 0.6);
        let hue = cycle_hue(i as f32 * 360.0 / p.bars as f32, p.time, 18.0);
        out.push(Primitive::Rect {
            pos: vec2(i as f32 * bar_width, p.height - bar_height),
            size: vec2(bar_width * 0.7, bar_height),
            color: element_color(p, hue, 0.68 + val / 700.0),
        });
    }
    out
}

fn waveform_line(p: &FrameParams, buffer: &[u8]) -> Vec<Primitive> {
    if buffer.is_empty() {
        return Vec::new();
    }
    let points = buffer
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = i as f32 / buffer.len() as f32 * p.width;
            let y = p.center.y + (v as f32 - 128.0) / 128.0 * (p.height * 0.32);
            vec2(x, y)
        })
        .collect();
    vec![Primitive::Polyline {
        points,
        thickness: 8.0,
        color: element_color(p, cycle_hue(0.0, p.time, 8.0), 0.8),
    }]
}

fn radial_lines(p: &FrameParams, buffer: &[u8]) -> Vec<Primitive> {
    let mut out = Vec::with_capacity(p.bars);
    for i in 0..p.bars {
        let angle = (i as f32 / p.bars as f32) * TAU + p.angle_shift;
        let val = sample_at(buffer, i) as f32;
        let len = p.radius + val / 255.0 * (p.min_dim * 0.28);
        let dir = vec2(angle.cos(), angle.sin());
        out.push(Primitive::Segment {
            from: p.center,
            to: p.center + dir * len,
            thickness: 4.5 + val / 120.0,
            color: element_color(p, cycle_hue(angle.to_degrees(), p.time, 18.0), 0.6 + val / 700.0),
        });
    }
    out
}

fn dot_orbit(p: &FrameParams, buffer: &[u8]) -> Vec<Primitive> {
    let mut out = Vec::with_capacity(p.dots);
    for i in 0..p.dots {
        let angle = (i as f32 / p.dots as f32) * TAU + p.angle_shift * 1.5;
        let val = sample_at(buffer, i) as f32;
        let len = p.radius + val / 255.0 * (p.min_dim * 0.18);
        out.push(Primitive::Disc {
            center: p.center + vec2(angle.cos(), angle.sin()) * len,
            radius: 16.0 + val / 18.0,
            color: element_color(p, cycle_hue(angle.to_degrees(), p.time, 12.0), 0.75 + val / 700.0),
        });
    }
    out
}

fn spiral_arm(p: &FrameParams, buffer: &[u8]) -> Vec<Primitive> {
    let points = (0..p.spiral_points)
        .map(|i| {
            let t = i as f32 / p.spiral_points as f32 * 3.0 * TAU + p.angle_shift * 2.0;
            let val = sample_at(buffer, i) as f32;
            let r = p.radius + val / 255.0 * (p.min_dim * 0.28) + i as f32 * (p.min_dim * 0.0015);
            p.center + vec2(t.cos(), t.sin()) * r
        })
        .collect();
    vec![Primitive::Polyline {
        points,
        thickness: 12.0,
        color: element_color(p, cycle_hue(0.0, p.time, 4.0), 0.85),
    }]
}

fn mirror_bars(p: &FrameParams, buffer: &[u8]) -> Vec<Primitive> {
    let bar_width = p.width / p.bars as f32;
    let mut out = Vec::with_capacity(p.bars * 2);
    for i in 0..p.bars {
        let val = sample_at(buffer, i) as f32;
        let bar_height = val / 255.0 * (p.height * 0.32);
        let hue = cycle_hue(i as f32 * 360.0 / p.bars as f32, p.time, 18.0);
        out.push(Primitive::Rect {
            pos: vec2(i as f32 * bar_width, p.center.y - bar_height),
            size: vec2(bar_width * 0.7, bar_height),
            color: element_color(p, hue, 0.68 + val / 700.0),
        });
        // Lower half mirrors in the complementary hue at reduced opacity.
        let mut color = element_color(p, hue + 180.0, 0.6 + val / 900.0);
        color.a = 0.7;
        out.push(Primitive::Rect {
            pos: vec2(i as f32 * bar_width, p.center.y),
            size: vec2(bar_width * 0.7, bar_height),
            color,
        });
    }
    out
}

fn element_color(p: &FrameParams, hue: f32, lightness: f32) -> Color {
    if p.hue_cycle {
        hsl_color(hue, 1.0, lightness, 1.0)
    } else {
        Color::new(1.0, 1.0, 1.0, 0.9)
    }
}

/// Hue rotating with wall time; smaller divisors cycle faster.
fn cycle_hue(base_deg: f32, time: f64, divisor: f32) -> f32 {
    (base_deg + (time * 1000.0) as f32 / divisor) % 360.0
}

pub fn hsl_color(h: f32, s: f32, l: f32, a: f32) -> Color {
    let h = ((h % 360.0) + 360.0) % 360.0;
    let l = l.clamp(0.0, 1.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;
    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };
    Color::new(r + m, g + m, b + m, a)
}

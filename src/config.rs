//! Tuning knobs shared across the analyser and renderer.

// ---- Analysis ----------------------------------------------------------

/// Number of samples fed into each FFT frame.
pub const FFT_SIZE: usize = 2048;
/// Number of magnitude bins exposed to the renderer.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

// ---- Animation ---------------------------------------------------------

/// Base angular advance per frame (radians).
pub const ANGLE_STEP: f32 = 0.006;
/// Divisor for the energy-proportional advance term (255-scale energy).
pub const ANGLE_ENERGY_DIV: f32 = 60_000.0;

// ---- Recording ---------------------------------------------------------

/// Nominal capture rate written into the exported container.
pub const RECORD_FPS: u32 = 60;

/// Visualization style, selected by CLI flag or number keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Circular,
    Linear,
    Waveform,
    Radial,
    Dot,
    Spiral,
    Mirror,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Circular,
        Mode::Linear,
        Mode::Waveform,
        Mode::Radial,
        Mode::Dot,
        Mode::Spiral,
        Mode::Mirror,
    ];

    /// Parse a mode name. Unknown names fall back to circular.
    pub fn from_name(name: &str) -> Mode {
        match name.to_lowercase().as_str() {
            "circular" => Mode::Circular,
            "linear" => Mode::Linear,
            "waveform" => Mode::Waveform,
            "radial" => Mode::Radial,
            "dot" => Mode::Dot,
            "spiral" => Mode::Spiral,
            "mirror" => Mode::Mirror,
            other => {
                log::debug!("unknown mode '{}', falling back to circular", other);
                Mode::Circular
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Circular => "circular",
            Mode::Linear => "linear",
            Mode::Waveform => "waveform",
            Mode::Radial => "radial",
            Mode::Dot => "dot",
            Mode::Spiral => "spiral",
            Mode::Mirror => "mirror",
        }
    }

    /// Waveform reads the time-domain tap; everything else reads spectra.
    pub fn uses_time_domain(self) -> bool {
        matches!(self, Mode::Waveform)
    }

    /// Modes that get the shared outer-ring overlay.
    pub fn has_ring(self) -> bool {
        matches!(self, Mode::Circular | Mode::Radial | Mode::Dot | Mode::Spiral)
    }
}

/// Visual constants that differed between the two historical renderer
/// variants, unified into one parameterized set. Defaults follow the
/// canvas-proportional variant: radius and element counts scale with the
/// smaller window dimension, hue cycling on, no glow.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Working radius as a fraction of min(width, height).
    pub radius_frac: f32,
    /// Breathing amplitude added to the working radius (pixels).
    pub radius_pulse_px: f32,
    /// Bar/spoke count floor; actual count is max(floor, min_dim / bar_px).
    pub min_bars: usize,
    pub bar_px: f32,
    pub min_dots: usize,
    pub dot_px: f32,
    pub min_spiral_points: usize,
    pub spiral_px: f32,
    /// Per-element hue rotation keyed by angle and wall time.
    pub hue_cycle: bool,
    /// Decorative backdrop size; zero disables the field.
    pub particle_count: usize,
    /// Outer ring offset from the working radius (pixels).
    pub ring_offset_px: f32,
    /// Vertical spacing of the scanline overlay (pixels).
    pub scanline_step_px: f32,
    /// Center label size as a fraction of min(width, height).
    pub label_size_frac: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            radius_frac: 0.145,
            radius_pulse_px: 4.0,
            min_bars: 120,
            bar_px: 10.0,
            min_dots: 90,
            dot_px: 16.0,
            min_spiral_points: 200,
            spiral_px: 4.0,
            hue_cycle: true,
            particle_count: 90,
            ring_offset_px: 32.0,
            scanline_step_px: 6.0,
            label_size_frac: 0.045,
        }
    }
}

impl Theme {
    /// Working radius for the rotating modes, with a slow breathing pulse.
    pub fn working_radius(&self, min_dim: f32, time: f64) -> f32 {
        min_dim * self.radius_frac + (time * 2.5).sin() as f32 * self.radius_pulse_px
    }

    pub fn bar_count(&self, min_dim: f32) -> usize {
        self.min_bars.max((min_dim / self.bar_px) as usize)
    }

    pub fn dot_count(&self, min_dim: f32) -> usize {
        self.min_dots.max((min_dim / self.dot_px) as usize)
    }

    pub fn spiral_points(&self, min_dim: f32) -> usize {
        self.min_spiral_points.max((min_dim / self.spiral_px) as usize)
    }
}

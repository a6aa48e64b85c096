//! Vizbeat: real-time audio visualizer with seven drawing modes and
//! optional recording of the rendered frames plus the played audio.

mod analyser;
mod avi;
mod config;
mod modes;
mod particles;
mod playback;
mod recorder;
mod scene;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use macroquad::prelude::*;

use analyser::Analyser;
use config::{Mode, Theme, FFT_SIZE, RECORD_FPS};
use playback::{Player, Track};
use recorder::{FramePixels, Recorder};
use scene::{FrameInput, Scene};

#[derive(Parser, Debug)]
#[command(name = "vizbeat", about = "Audio-reactive visualizer", version)]
struct Args {
    /// Audio file to play (wav, mp3, flac, ogg). Omit for a silent demo.
    file: Option<PathBuf>,

    /// Starting mode: circular, linear, waveform, radial, dot, spiral, mirror
    #[arg(short, long, default_value = "circular")]
    mode: String,

    /// Text drawn at the canvas center
    #[arg(short, long, default_value = "VIZBEAT")]
    label: String,

    /// Where recordings are written
    #[arg(short, long, default_value = "recording.avi")]
    output: PathBuf,

    /// Disable the particle backdrop
    #[arg(long)]
    no_particles: bool,
}

/// Whether the main loop should keep running after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Halt,
}

struct App {
    mode: Mode,
    scene: Scene,
    analyser: Analyser,
    player: Option<Player>,
    recorder: Recorder,
    output: PathBuf,
    show_hud: bool,
}

impl App {
    fn new(args: &Args) -> anyhow::Result<Self> {
        let player = match &args.file {
            Some(path) => {
                let track = Track::decode(path)
                    .with_context(|| format!("cannot load {}", path.display()))?;
                log::info!(
                    "loaded {}: {:.1}s, {} ch @ {} Hz",
                    path.display(),
                    track.duration_secs(),
                    track.channels,
                    track.sample_rate
                );
                Some(Player::start(Arc::new(track)).context("cannot start playback")?)
            }
            None => {
                log::info!("no audio file given, rendering silence");
                None
            }
        };
        Ok(Self {
            mode: Mode::from_name(&args.mode),
            scene: Scene::new(Theme::default(), args.label.clone(), !args.no_particles),
            analyser: Analyser::new(),
            player,
            recorder: Recorder::new(),
            output: args.output.clone(),
            show_hud: true,
        })
    }

    fn tick(&mut self) -> Flow {
        if is_key_pressed(KeyCode::Escape) {
            return Flow::Halt;
        }
        self.handle_keys();

        let window = match &self.player {
            Some(player) => player.mono_window(FFT_SIZE),
            None => vec![0.0; FFT_SIZE],
        };
        self.analyser.refresh(&window, self.mode);

        let input = FrameInput {
            buffer: self.analyser.data(),
            mode: self.mode,
            time: get_time(),
            dt: get_frame_time(),
        };
        self.scene.render(&input);

        if self.recorder.is_recording() {
            let image = get_screen_data();
            self.recorder.capture(
                get_frame_time(),
                FramePixels {
                    width: image.width,
                    height: image.height,
                    rgba: image.bytes,
                },
            );
            // Drawn after capture so the badge never lands in the export.
            draw_circle(24.0, 24.0, 8.0, RED);
        }

        if self.show_hud {
            self.draw_hud();
        }

        if let Some(player) = &self.player {
            if player.finished() && self.recorder.is_recording() {
                log::info!("track finished, stopping recording");
                self.finish_recording();
            }
        }
        Flow::Continue
    }

    fn handle_keys(&mut self) {
        const MODE_KEYS: [KeyCode; 7] = [
            KeyCode::Key1,
            KeyCode::Key2,
            KeyCode::Key3,
            KeyCode::Key4,
            KeyCode::Key5,
            KeyCode::Key6,
            KeyCode::Key7,
        ];
        for (key, mode) in MODE_KEYS.iter().zip(Mode::ALL) {
            if is_key_pressed(*key) && self.mode != mode {
                log::debug!("mode -> {}", mode.name());
                self.mode = mode;
            }
        }
        if is_key_pressed(KeyCode::R) {
            if self.recorder.is_recording() {
                self.finish_recording();
            } else if let Some(player) = &self.player {
                self.recorder.start(player.position_frames());
            } else {
                log::warn!("recording needs an audio file");
            }
        }
        if is_key_pressed(KeyCode::Space) {
            self.show_hud = !self.show_hud;
        }
    }

    fn finish_recording(&mut self) {
        let Some(player) = &self.player else { return };
        let end = player.position_frames();
        match self.recorder.stop(player.track(), end, &self.output) {
            Ok(Some(path)) => log::info!("wrote {}", path.display()),
            Ok(None) => {}
            Err(e) => log::error!("recording failed: {}", e),
        }
    }

    fn draw_hud(&self) {
        let white = Color::new(1.0, 1.0, 1.0, 0.85);
        draw_text(&format!("FPS: {}", get_fps()), 10.0, 20.0, 20.0, white);
        draw_text(&format!("Mode: {}", self.mode.name()), 10.0, 40.0, 20.0, white);
        if let Some(player) = &self.player {
            let track = player.track();
            let pos = player.position_frames() as f32 / track.sample_rate as f32;
            draw_text(
                &format!("{:.1}s / {:.1}s", pos, track.duration_secs()),
                10.0,
                60.0,
                20.0,
                white,
            );
        }
        let rec = if self.recorder.is_recording() {
            format!("[R] stop recording ({} fps)", RECORD_FPS)
        } else {
            "[R] record".to_string()
        };
        draw_text(
            &format!("[1-7] modes  {}  [Space] hud  [Esc] quit", rec),
            10.0,
            screen_height() - 12.0,
            18.0,
            Color::new(1.0, 1.0, 1.0, 0.6),
        );
    }

    /// Flush a still-active recording before exit.
    fn shutdown(&mut self) {
        if self.recorder.is_recording() {
            self.finish_recording();
        }
    }
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Vizbeat".to_string(),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut app = match App::new(&args) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return;
        }
    };

    loop {
        if app.tick() == Flow::Halt {
            break;
        }
        next_frame().await;
    }
    app.shutdown();
}

#![deny(unsafe_code)]
//! Headless frame driver for the particle morph system.
//!
//! Subcommands:
//! - `run <bootstrap>`: bootstrap, play image requests, settle, write PNG
//! - `sample <image>`: report how an image samples onto N particles
//! - `config`: print default configuration and parameter schema

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use glam::Vec3;
use particle_morph_core::{
    AnimationState, ControllerState, Delivery, ImageSampler, MorphConfig, MorphController,
    NoiseField, SampleRegime, SceneHooks, Status, Xorshift64,
};
use particle_morph_io::{read_image, snapshot, ImageLoader, LoadSource, Viewport};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "particle-morph", about = "Particle image morph driver")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Configuration overrides as a JSON object.
    #[arg(long, global = true, default_value = "{}")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Bootstrap from an image, morph through the requested images and
    /// write a PNG of the final frame.
    Run {
        /// Image that fixes the particle count.
        bootstrap: PathBuf,

        /// Image to morph to, in order. Repeatable.
        #[arg(short, long = "morph")]
        morphs: Vec<PathBuf>,

        /// Simulated frames per second.
        #[arg(long, default_value_t = 60)]
        fps: u32,

        /// Submit the next request after this many frames instead of
        /// waiting for each morph to finish.
        #[arg(long)]
        interrupt_after: Option<usize>,

        /// Idle frames to run after the last morph.
        #[arg(long, default_value_t = 120)]
        settle_frames: usize,

        /// PRNG and noise seed. Wall clock when omitted.
        #[arg(long)]
        seed: Option<u64>,

        /// Output image width in pixels.
        #[arg(short = 'W', long, default_value_t = 512)]
        width: usize,

        /// Output image height in pixels.
        #[arg(short = 'H', long, default_value_t = 512)]
        height: usize,

        /// Output file path.
        #[arg(short, long, default_value = "morph.png")]
        output: PathBuf,
    },
    /// Sample an image onto N particles and report the result.
    Sample {
        image: PathBuf,

        /// Particle count. Defaults to the image's opaque pixel count.
        #[arg(short, long)]
        count: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the default configuration and its schema.
    Config,
}

/// Forwards controller notifications to the log and keeps the history.
#[derive(Default)]
struct LogHooks {
    statuses: Vec<Status>,
    auto_rotate: bool,
}

impl SceneHooks for LogHooks {
    fn set_auto_rotate(&mut self, enabled: bool) {
        log::debug!("auto-rotate {}", if enabled { "on" } else { "off" });
        self.auto_rotate = enabled;
    }

    fn set_busy(&mut self, busy: bool) {
        log::debug!("busy: {busy}");
    }

    fn set_status(&mut self, status: &Status) {
        log::info!("status: {status}");
        self.statuses.push(status.clone());
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn seeded_parts(seed: Option<u64>) -> (NoiseField, Xorshift64) {
    match seed {
        Some(seed) => (
            NoiseField::new((seed ^ (seed >> 32)) as u32),
            Xorshift64::new(seed),
        ),
        None => (
            NoiseField::from_entropy_or_disabled(),
            Xorshift64::from_entropy(),
        ),
    }
}

/// Ticks until the controller goes idle, at most `limit` frames.
fn run_until_idle(controller: &mut MorphController<LogHooks>, dt: f32, limit: usize) -> usize {
    for frame in 0..limit {
        if controller.phase() == ControllerState::Idle {
            return frame;
        }
        controller.tick(dt);
    }
    log::warn!("controller still busy after {limit} frames");
    limit
}

#[derive(Default)]
struct RunReport {
    frames: usize,
    started: usize,
    recovered: usize,
    stale: usize,
}

impl RunReport {
    fn record(&mut self, name: &str, delivery: Delivery) {
        match delivery {
            Delivery::Started(_) => self.started += 1,
            Delivery::Recovered(source) => {
                log::warn!("{name} failed to load, recovered from {source:?}");
                self.recovered += 1;
            }
            Delivery::Stale => {
                log::debug!("{name} was superseded");
                self.stale += 1;
            }
        }
    }
}

/// Drives frames through every requested image.
///
/// Loads run on the loader thread while frames keep ticking. Frames spent
/// waiting on a load are paced at `fps` so the load timeout is a frame
/// count. With `interrupt_after`, the next request goes out that many
/// frames after the previous one, whether or not its image has arrived.
fn play(
    controller: &mut MorphController<LogHooks>,
    loader: &ImageLoader,
    morphs: &[PathBuf],
    fps: u32,
    interrupt_after: Option<usize>,
    settle_frames: usize,
) -> Result<RunReport, CliError> {
    let fps = fps.max(1);
    let dt = 1.0 / fps as f32;
    let frame = Duration::from_secs_f32(dt);
    let limit = (controller.config().morph_duration * fps as f32).ceil() as usize * 2 + 10;
    let timeout_frames = (LOAD_TIMEOUT.as_secs_f32() * fps as f32).ceil() as usize;
    let mut report = RunReport {
        frames: run_until_idle(controller, dt, limit),
        ..RunReport::default()
    };

    let mut outstanding = 0usize;
    for (i, path) in morphs.iter().enumerate() {
        let name = display_name(path);
        let id = controller.begin_request(&name);
        loader.submit(id, &name, LoadSource::Path(path.clone()))?;
        outstanding += 1;

        let last = i + 1 == morphs.len();
        let (mut frames, mut waited, mut busy) = (0usize, 0usize, 0usize);
        loop {
            while let Some(loaded) = loader.try_recv()? {
                outstanding = outstanding.saturating_sub(1);
                waited = 0;
                let delivery = controller.deliver(loaded.id, &loaded.name, loaded.result)?;
                report.record(&loaded.name, delivery);
            }

            let done = match interrupt_after {
                Some(n) if !last => frames >= n,
                _ => outstanding == 0 && controller.phase() == ControllerState::Idle,
            };
            if done {
                break;
            }
            if outstanding > 0 {
                if waited >= timeout_frames {
                    return Err(CliError::Io(format!(
                        "timed out loading {name} after {waited} frames"
                    )));
                }
                waited += 1;
                thread::sleep(frame);
            } else if busy >= limit {
                log::warn!("controller still busy after {limit} frames");
                break;
            } else {
                busy += 1;
            }

            controller.tick(dt);
            frames += 1;
        }
        report.frames += frames;
    }

    for _ in 0..settle_frames {
        controller.tick(dt);
    }
    report.frames += settle_frames;
    Ok(report)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let overrides: Value = serde_json::from_str(&cli.config)
        .map_err(|e| CliError::Input(format!("invalid --config JSON: {e}")))?;
    let config = MorphConfig::from_json(&overrides);

    match cli.command {
        Command::Config => {
            if cli.json {
                let info = json!({
                    "defaults": MorphConfig::default().to_json(),
                    "effective": config.to_json(),
                    "schema": MorphConfig::schema(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&config.to_json())?);
                println!("{}", serde_json::to_string_pretty(&MorphConfig::schema())?);
            }
        }
        Command::Sample { image, count, seed } => {
            let decoded = read_image(&image)?;
            let opaque = decoded.opaque_count(config.alpha_threshold);
            let count = count.unwrap_or(if opaque == 0 {
                config.default_particle_count
            } else {
                opaque
            });
            let (_, mut rng) = seeded_parts(seed);
            let targets = ImageSampler::from_config(&config).sample(&decoded, count, &mut rng);
            let regime = SampleRegime::classify(opaque, count);
            let (min, max) = targets.positions().iter().fold(
                (Vec3::INFINITY, Vec3::NEG_INFINITY),
                |(lo, hi), p| (lo.min(*p), hi.max(*p)),
            );

            if cli.json {
                let info = json!({
                    "image": image.display().to_string(),
                    "width": decoded.width(),
                    "height": decoded.height(),
                    "opaque": opaque,
                    "count": targets.len(),
                    "regime": regime.name(),
                    "bounds": if targets.is_empty() {
                        Value::Null
                    } else {
                        json!({ "min": min.to_array(), "max": max.to_array() })
                    },
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!(
                    "{}: {}x{}, {opaque} opaque pixels",
                    image.display(),
                    decoded.width(),
                    decoded.height()
                );
                println!("sampled {} points ({})", targets.len(), regime.name());
                if !targets.is_empty() {
                    println!("bounds {min} .. {max}");
                }
            }
        }
        Command::Run {
            bootstrap,
            morphs,
            fps,
            interrupt_after,
            settle_frames,
            seed,
            width,
            height,
            output,
        } => {
            let (noise, rng) = seeded_parts(seed);
            if !noise.is_enabled() {
                log::warn!("noise unavailable, morphs will have no swirl or turbulence");
            }
            let state = AnimationState::new(config, noise, rng);
            let mut controller = MorphController::with_parts(state, LogHooks::default());

            let name = display_name(&bootstrap);
            let count = controller.bootstrap(read_image(&bootstrap), &name)?;
            let loader = ImageLoader::spawn()?;
            let report = play(
                &mut controller,
                &loader,
                &morphs,
                fps,
                interrupt_after,
                settle_frames,
            )?;

            let buffer = controller.particles()?;
            let viewport = Viewport::fit(width, height, buffer.positions())?;
            snapshot::write_png(buffer, controller.config(), &viewport, &output)?;

            let status = controller
                .hooks()
                .statuses
                .last()
                .map(ToString::to_string)
                .unwrap_or_default();
            if cli.json {
                let info = json!({
                    "bootstrap": bootstrap.display().to_string(),
                    "particles": count,
                    "requests": morphs.len(),
                    "started": report.started,
                    "recovered": report.recovered,
                    "stale": report.stale,
                    "frames": report.frames,
                    "status": status,
                    "auto_rotate": controller.hooks().auto_rotate,
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "morphed {count} particles through {} image(s) in {} frames ({status}) -> {}",
                    morphs.len(),
                    report.frames,
                    output.display()
                );
            }
        }
    }

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}

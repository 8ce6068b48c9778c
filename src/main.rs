//! marina-rom CLI - reduced-order model evaluation.
//!
//! Generate synthetic model bundles, inspect a bundle, reconstruct single
//! fields, and replay parameter-change scripts through an interactive session.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use marina_rom::database::{RomConfig, RomDatabase};
use marina_rom::field::Field;
use marina_rom::interp::ParamPoint;
use marina_rom::logging::init_logging;
use marina_rom::render::{
    export_field_png, export_field_raw, ColorMap, CountingSink, PngFieldSink, RawFieldSink, RawFormat,
    RenderSink, RetryingSink, TeeSink,
};
use marina_rom::session::{ParameterEvent, ParameterState, Session};
use marina_rom::synthetic::{SyntheticConfig, SyntheticModel};

/// Parametric reduced-order model evaluator.
#[derive(Parser)]
#[command(name = "marina-rom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic model bundle (mean, basis, regimes, rom.json).
    Synth {
        /// Output directory for the bundle.
        #[arg(short, long, default_value = "./bundle")]
        output: PathBuf,

        /// Field dimension (mesh points).
        #[arg(long, default_value = "4096")]
        points: usize,

        /// Number of basis modes.
        #[arg(long, default_value = "60")]
        modes: usize,

        /// Random seed for reproducible generation.
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
    /// Load a bundle and print its dimensions.
    Info {
        /// Bundle configuration file.
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Reconstruct a single field.
    Eval {
        /// Bundle configuration file.
        #[arg(short, long)]
        config: PathBuf,

        /// Regime name (defaults to the configured one).
        #[arg(short, long)]
        regime: Option<String>,

        /// Wind speed in m/s.
        #[arg(short, long)]
        velocity: Option<f64>,

        /// Wind angle in degrees.
        #[arg(short, long)]
        angle_deg: Option<f64>,

        /// Number of modes to include.
        #[arg(short, long)]
        modes: Option<usize>,

        /// Write the field as a coolwarm PNG.
        #[arg(long)]
        png: Option<PathBuf>,

        /// Write the field as raw little-endian floats.
        #[arg(long)]
        raw: Option<PathBuf>,

        /// Element format for --raw.
        #[arg(long, default_value = "f32")]
        raw_format: RawOption,
    },
    /// Replay parameter-change events (one per line) through a session.
    Replay {
        /// Bundle configuration file.
        #[arg(short, long)]
        config: PathBuf,

        /// Event script, e.g. lines like "angle 90" or "regime noon".
        #[arg(short, long)]
        events: PathBuf,

        /// Write every published frame (PNG and RAW) into this directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Attempts per frame when the output sink fails.
        #[arg(long, default_value = "3")]
        retries: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RawOption {
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl From<RawOption> for RawFormat {
    fn from(option: RawOption) -> Self {
        match option {
            RawOption::F32 => RawFormat::F32,
            RawOption::F64 => RawFormat::F64,
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth {
            output,
            points,
            modes,
            seed,
        } => run_synth(output, points, modes, seed),
        Commands::Info { config } => run_info(&config),
        Commands::Eval {
            config,
            regime,
            velocity,
            angle_deg,
            modes,
            png,
            raw,
            raw_format,
        } => run_eval(&config, regime, velocity, angle_deg, modes, png, raw, raw_format.into()),
        Commands::Replay {
            config,
            events,
            output,
            retries,
        } => run_replay(&config, &events, output, retries),
    }
}

fn load_config(path: &Path) -> RomConfig {
    match RomConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    }
}

fn open_database(config: &RomConfig) -> RomDatabase {
    match RomDatabase::open(config) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Error loading model: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_field_summary(field: &Field) {
    match field.value_range() {
        Some((lo, hi)) => println!("Field range: [{:.4}, {:.4}] K, mean {:.4} K", lo, hi, field.mean()),
        None => println!("Field has no finite values"),
    }
}

fn run_synth(output: PathBuf, points: usize, modes: usize, seed: u64) {
    if points == 0 || modes == 0 {
        eprintln!("Error: points and modes must be at least 1");
        std::process::exit(1);
    }

    println!("marina-rom - Synthetic Bundle");
    println!("=============================");
    println!("Points: {}", points);
    println!("Modes: {}", modes);
    println!("Seed: {}", seed);
    println!("Output: {}", output.display());

    let start = Instant::now();
    let config = SyntheticConfig {
        points,
        modes,
        seed,
        ..Default::default()
    };
    let model = match SyntheticModel::generate(&config) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error generating model: {}", e);
            std::process::exit(1);
        }
    };
    match model.write(&output) {
        Ok(path) => println!("Wrote {} in {:.2?}", path.display(), start.elapsed()),
        Err(e) => {
            eprintln!("Error writing bundle: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_info(config_path: &Path) {
    let config = load_config(config_path);
    let db = open_database(&config);

    println!("marina-rom - Bundle Info");
    println!("========================");
    println!("Field points: {}", db.basis().field_len());
    println!("Basis modes:  {}", db.basis().max_modes());
    println!(
        "Display range: [{}, {}] K",
        config.display_range.low, config.display_range.high
    );
    println!("Mode slider: {}..={}", config.mode_slider.0, config.mode_slider.1);
    println!(
        "Velocity slider: {}..={} m/s",
        config.velocity_slider.0, config.velocity_slider.1
    );
    println!();
    println!("Regimes:");
    for name in db.regimes().names() {
        let limit = db.mode_limit(name).unwrap_or(0);
        let marker = if name == config.defaults.regime { " (default)" } else { "" };
        println!("  {:<12} {:>4} modes{}", name, limit, marker);
    }
    println!("Modes served by every regime: {}", db.regimes().min_modes().min(db.basis().max_modes()));
    println!();
    println!(
        "Defaults: velocity {} m/s, angle {}°, {} modes",
        config.defaults.velocity, config.defaults.angle_deg, config.defaults.modes
    );
}

#[allow(clippy::too_many_arguments)]
fn run_eval(
    config_path: &Path,
    regime: Option<String>,
    velocity: Option<f64>,
    angle_deg: Option<f64>,
    modes: Option<usize>,
    png: Option<PathBuf>,
    raw: Option<PathBuf>,
    raw_format: RawFormat,
) {
    let config = load_config(config_path);
    let db = open_database(&config);

    let regime = regime.unwrap_or_else(|| config.defaults.regime.clone());
    let velocity = velocity.unwrap_or(config.defaults.velocity);
    let angle_deg = angle_deg.unwrap_or(config.defaults.angle_deg);
    let modes = modes.unwrap_or(config.defaults.modes);

    println!(
        "Regime {}, velocity {} m/s, angle {}°, {} modes",
        regime, velocity, angle_deg, modes
    );

    let start = Instant::now();
    let field = match db.reconstruct(&regime, ParamPoint::from_degrees(velocity, angle_deg), modes) {
        Ok(field) => field,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("Reconstructed {} points in {:.2?}", field.len(), start.elapsed());
    print_field_summary(&field);

    if let Some(path) = png {
        if let Err(e) = export_field_png(&field, &path, config.display_range, ColorMap::Coolwarm, None) {
            eprintln!("Error exporting PNG: {}", e);
            std::process::exit(1);
        }
        println!("  Exported {}", path.display());
    }
    if let Some(path) = raw {
        if let Err(e) = export_field_raw(&field, &path, raw_format) {
            eprintln!("Error exporting RAW: {}", e);
            std::process::exit(1);
        }
        println!("  Exported {}", path.display());
    }
}

fn run_replay(config_path: &Path, events_path: &Path, output: Option<PathBuf>, retries: u32) {
    let config = load_config(config_path);

    let script = match std::fs::read_to_string(events_path) {
        Ok(script) => script,
        Err(e) => {
            eprintln!("Error reading events: {}", e);
            std::process::exit(1);
        }
    };

    let counter = Arc::new(CountingSink::new());
    let sink: Arc<dyn RenderSink> = match &output {
        Some(dir) => match PngFieldSink::new(dir, "frame").and_then(|png| {
            let raw = RawFieldSink::new(dir, "frame", RawFormat::F32)?;
            Ok((png, raw))
        }) {
            Ok((png, raw)) => Arc::new(
                TeeSink::new()
                    .with(RetryingSink::new(png, retries))
                    .with(RetryingSink::new(raw, retries))
                    .with(Arc::clone(&counter)),
            ),
            Err(e) => {
                eprintln!("Error creating output directory: {}", e);
                std::process::exit(1);
            }
        },
        None => counter.clone(),
    };

    let start = Instant::now();
    let session = match Session::from_config(&config, sink) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error starting session: {}", e);
            std::process::exit(1);
        }
    };
    println!("Initial state: {}", session.state());

    let mut accepted = 0usize;
    let mut rejected = 0usize;
    for (number, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: ParameterEvent = match line.parse() {
            Ok(event) => event,
            Err(e) => {
                println!("  line {:>4}: skipped ({})", number + 1, e);
                rejected += 1;
                continue;
            }
        };
        if let Some(note) = config.slider_excursion(&event) {
            println!("  line {:>4}: note: {}", number + 1, note);
        }
        match session.apply(&event) {
            Ok(frame) => {
                accepted += 1;
                let advisory = if frame.advisory.is_some() { " [extrapolated]" } else { "" };
                println!("  line {:>4}: {} -> frame {}{}", number + 1, event, frame.sequence, advisory);
            }
            Err(e) => {
                rejected += 1;
                println!("  line {:>4}: {} rejected ({})", number + 1, event, e);
            }
        }
    }

    let final_state: ParameterState = session.state();
    println!();
    println!("Replay finished in {:.2?}", start.elapsed());
    println!("Accepted: {}, rejected: {}, published: {}", accepted, rejected, counter.count());
    println!("Final state: {}", final_state);
    print_field_summary(&session.field());
}

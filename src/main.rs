//! Classroom monitor command-line tool for scanning and replaying frames.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use classroom_monitor::attendance::summarize;
use classroom_monitor::config::{Config, EXAMPLE_CONFIG};
use classroom_monitor::frame::Rgb;
use classroom_monitor::lifecycle::SessionManager;
use classroom_monitor::model::{ClassSession, Student};
use classroom_monitor::scanner::ChannelSelection;
use classroom_monitor::store::{ClassRepository, InMemoryStore};
use classroom_monitor::utils::image_conversion::{load_frame, save_frame};
use classroom_monitor::utils::{bbox_to_region, draw_outline};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// Seed for box jitter and confidence draws
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one detection cycle over an image and print the candidates
    Scan {
        /// Image file to scan
        image: PathBuf,

        /// Write a copy of the image with detections outlined
        #[arg(short, long)]
        annotate: Option<PathBuf>,
    },

    /// Replay images as consecutive cycles of one class and print attendance
    Replay {
        /// Image files, one per cycle
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Number of synthetic roster students
        #[arg(short, long, default_value = "6")]
        students: u64,

        /// Class duration in minutes
        #[arg(long, default_value = "60")]
        duration: f64,

        /// Attendance threshold in percent (configured default when absent)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Print an example configuration file
    ExampleConfig,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("failed to load {}", path.display()))?
        }
        None => Config::default(),
    };
    if args.seed.is_some() {
        config.monitor.seed = args.seed;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn scan(config: &Config, image: &Path, annotate: Option<&Path>) -> Result<()> {
    let mut frame = load_frame(image).with_context(|| format!("failed to load {}", image.display()))?;
    let scanner = config.create_scanner();
    let mut rng = config.create_rng();
    let result = scanner.scan(&frame, ChannelSelection::all(), &mut rng);

    println!("{}x{} frame", frame.width(), frame.height());
    for face in &result.faces {
        println!(
            "face    x={:<5.0} y={:<5.0} w={:<5.1} h={:<5.1} score={:.2}",
            face.bbox.x, face.bbox.y, face.bbox.width, face.bbox.height, face.score
        );
    }
    for behavior in result.behaviors() {
        println!(
            "{:<7} x={:<5.0} y={:<5.0} w={:<5.1} h={:<5.1} score={:.2}",
            behavior.kind.warning_type().to_string(),
            behavior.bbox.x,
            behavior.bbox.y,
            behavior.bbox.width,
            behavior.bbox.height,
            behavior.score
        );
    }

    if let Some(out) = annotate {
        let bounds = frame.bounds();
        for face in &result.faces {
            draw_outline(&mut frame, bbox_to_region(&face.bbox, bounds), 2, Rgb::new(0, 255, 0));
        }
        for phone in &result.phones {
            draw_outline(&mut frame, bbox_to_region(&phone.bbox, bounds), 2, Rgb::new(255, 0, 0));
        }
        for talking in &result.talking {
            draw_outline(&mut frame, bbox_to_region(&talking.bbox, bounds), 2, Rgb::new(0, 0, 255));
        }
        save_frame(&frame, out).with_context(|| format!("failed to write {}", out.display()))?;
        info!("Annotated frame written to {}", out.display());
    }

    Ok(())
}

async fn replay(config: &Config, images: &[PathBuf], students: u64, duration: f64, threshold: Option<f64>) -> Result<()> {
    const CLASS_ID: u64 = 1;

    let store = Arc::new(InMemoryStore::with_policy(config.attendance_policy()));
    for id in 1..=students {
        store.add_student(Student {
            id,
            name: format!("Student {id}"),
            student_code: format!("S{id:04}"),
            email: None,
            photo_ref: Some(format!("photos/{id}.jpg")),
            descriptor: None,
        })?;
    }

    let mut class = ClassSession::new(CLASS_ID, "Replay", duration);
    class.attendance_threshold = threshold.unwrap_or(config.attendance.default_threshold);
    store.add_class(class)?;

    let manager = SessionManager::new(store.clone(), config.attendance_policy());
    let started = Utc::now();
    manager.start_class(CLASS_ID, started).await?;
    let mut session = manager.open_session(CLASS_ID, config, None)?;

    let step = Duration::from_std(config.sample_interval()).context("sample interval out of range")?;
    let mut now = started;
    for (cycle, path) in images.iter().enumerate() {
        now += step;
        let frame = match load_frame(path) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping cycle {}: {e}", cycle + 1);
                continue;
            }
        };
        let outcome = session.analyze(&frame)?;
        session.accept(&outcome);
        let commit = session.commit(&outcome, store.as_ref(), now);
        let missing = manager.sweep_not_detected(CLASS_ID, now)?;
        println!(
            "cycle {:>3}: {} faces, {} students recorded, {} warnings, {} not detected",
            cycle + 1,
            outcome.faces.len(),
            commit.detections_recorded,
            commit.warnings_emitted,
            missing.len()
        );
    }
    session.dispose();

    let records = manager.end_class(CLASS_ID, now).await?;
    let class = store.get_class(CLASS_ID)?;
    println!();
    for record in &records {
        println!(
            "student {:>4}: {:<7} {:>6.2} min ({:.1}%), seen {} times",
            record.student_id,
            record.status.to_string(),
            record.minutes_present(),
            record.percentage(&class),
            record.detection_count
        );
    }

    let summary = summarize(&records, &class, now, manager.policy());
    println!(
        "\npresent {}, late {}, absent {}, mean attendance {:.1}%",
        summary.present, summary.late, summary.absent, summary.mean_percentage
    );
    for warning in store.warnings(CLASS_ID)? {
        println!("warning: student {} {} ({})", warning.student_id, warning.warning_type, warning.description);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    match &args.command {
        Command::ExampleConfig => {
            print!("{EXAMPLE_CONFIG}");
            Ok(())
        }
        Command::Scan { image, annotate } => {
            let config = load_config(&args)?;
            scan(&config, image, annotate.as_deref())
        }
        Command::Replay { images, students, duration, threshold } => {
            let config = load_config(&args)?;
            replay(&config, images, *students, *duration, *threshold).await
        }
    }
}

//! Posecoach CLI - replay recorded landmarks through the coaching pipeline
//!
//! Commands:
//! - replay: Count reps and check form over recorded landmarks
//! - yoga: Classify yoga poses and compare them against saved references
//! - references: List saved reference poses
//! - tips: Print coaching tips for an exercise
//! - doctor: Diagnose configuration, model and reference health

use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use log::{debug, info};
use posecoach::capture::{run_frame_loop, ImageSequence, StopSignal};
use posecoach::landmarks::{LandmarkRecord, ScriptedProvider};
use posecoach::yoga::{ModelArtifact, ReferenceStore, YogaPose, ANGLE_PARTS};
use posecoach::{
    exercise_tips, CoachConfig, ExerciseKind, ExerciseSession, LandmarkSet, PipelineError,
    WorkoutReport, YogaSession, POSECOACH_VERSION, PRODUCER_NAME,
};

/// Posecoach - frame-by-frame exercise coaching from body landmarks
#[derive(Parser)]
#[command(name = "posecoach")]
#[command(version = POSECOACH_VERSION)]
#[command(about = "Count reps, check form and coach yoga poses from landmarks", long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count reps and check form over recorded landmarks
    Replay {
        /// Exercise name, e.g. "squats" or "Push-ups"
        exercise: String,

        /// Landmark records, one JSON object per line (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Frame reports as NDJSON (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Write the workout summary to this file
        #[arg(long)]
        summary_output: Option<PathBuf>,

        /// Stop after this many frames
        #[arg(long)]
        max_frames: Option<u64>,

        /// Save every annotated frame as PNG into this directory
        #[arg(long)]
        save_annotated: Option<PathBuf>,
    },

    /// Classify yoga poses and compare them against saved references
    Yoga {
        /// Pose model file (overrides the configuration)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Reference pose directory (overrides the configuration)
        #[arg(long)]
        references: Option<PathBuf>,

        /// Landmark records, one JSON object per line (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Frame reports as NDJSON (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Save the last confident detection as its pose's reference
        #[arg(long)]
        save_reference: bool,
    },

    /// List saved reference poses
    References {
        /// Reference pose directory (overrides the configuration)
        #[arg(long)]
        references: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print coaching tips for an exercise
    Tips {
        /// Exercise name
        exercise: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration, model and reference health
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(level));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PosecoachCliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Replay {
            exercise,
            input,
            output,
            summary_output,
            max_frames,
            save_annotated,
        } => cmd_replay(
            &load_config(config_path)?,
            &exercise,
            &input,
            &output,
            summary_output.as_deref(),
            max_frames,
            save_annotated.as_deref(),
        ),

        Commands::Yoga {
            model,
            references,
            input,
            output,
            save_reference,
        } => {
            let mut config = load_config(config_path)?;
            if model.is_some() {
                config.model_path = model;
            }
            if references.is_some() {
                config.reference_dir = references;
            }
            cmd_yoga(&config, &input, &output, save_reference)
        }

        Commands::References { references, json } => {
            let config = load_config(config_path)?;
            let dir = references
                .or(config.reference_dir)
                .ok_or(PosecoachCliError::NoReferenceDir)?;
            cmd_references(&dir, json)
        }

        Commands::Tips { exercise, json } => cmd_tips(&exercise, json),

        Commands::Doctor { json } => cmd_doctor(config_path, json),
    }
}

fn load_config(path: Option<&Path>) -> Result<CoachConfig, PosecoachCliError> {
    let config = match path {
        Some(path) => CoachConfig::from_file(path)?,
        None => CoachConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn read_records(input: &Path) -> Result<Vec<LandmarkRecord>, PosecoachCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let records = LandmarkRecord::parse_ndjson(&input_data)?;
    if records.is_empty() {
        return Err(PosecoachCliError::NoRecords);
    }
    debug!("read {} landmark records", records.len());
    Ok(records)
}

fn open_output(output: &Path) -> Result<Box<dyn Write>, PosecoachCliError> {
    if output.to_string_lossy() == "-" {
        Ok(Box::new(BufWriter::new(io::stdout())))
    } else {
        Ok(Box::new(BufWriter::new(File::create(output)?)))
    }
}

fn cmd_replay(
    config: &CoachConfig,
    exercise: &str,
    input: &Path,
    output: &Path,
    summary_output: Option<&Path>,
    max_frames: Option<u64>,
    save_annotated: Option<&Path>,
) -> Result<(), PosecoachCliError> {
    let kind: ExerciseKind = exercise.parse()?;
    let records = read_records(input)?;

    if let Some(dir) = save_annotated {
        fs::create_dir_all(dir)?;
    }

    let timestamps: Vec<DateTime<Utc>> = records.iter().map(|r| r.timestamp).collect();
    let mut provider = ScriptedProvider::new(records.into_iter().map(|r| r.landmarks));
    let source = ImageSequence::blank(config.canvas.width, config.canvas.height, timestamps.len());
    let mut session = ExerciseSession::new(kind, config.clone());
    let mut out = open_output(output)?;
    let stop = StopSignal::new();

    let handled = run_frame_loop(source, &stop, |captured| {
        let index = captured.index;
        let now = timestamps[index as usize];
        let result = session.process_frame(captured.image, &mut provider, now);

        writeln!(out, "{}", result.report.to_json()?)?;
        if let Some(dir) = save_annotated {
            result
                .frame
                .image
                .save(dir.join(format!("frame_{index:06}.png")))
                .map_err(io::Error::other)?;
        }

        if max_frames.is_some_and(|max| index + 1 >= max) {
            stop.stop();
        }
        Ok(())
    })?;
    out.flush()?;

    let report = WorkoutReport::new(session.summary(None));
    info!(
        "{}: {handled} frames, {} reps, {:.1} kcal",
        kind, report.summary.reps_completed, report.summary.calories_burned
    );

    if let Some(path) = summary_output {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(())
}

fn cmd_yoga(
    config: &CoachConfig,
    input: &Path,
    output: &Path,
    save_reference: bool,
) -> Result<(), PosecoachCliError> {
    let records = read_records(input)?;
    let mut session = YogaSession::from_config(config)?;
    let mut out = open_output(output)?;

    // Most recent frame confident enough to become a reference
    let mut candidate: Option<(LandmarkSet, DateTime<Utc>)> = None;
    let (width, height) = (config.canvas.width, config.canvas.height);

    for record in records {
        let landmarks = record.landmarks.clone();
        let result = session.process_landmarks(
            image::RgbImage::new(width, height),
            record.landmarks,
            record.timestamp,
        );
        writeln!(out, "{}", result.report.to_json()?)?;

        let confident = result.report.yoga.as_ref().is_some_and(|y| {
            y.pose.is_some() && y.confidence >= config.yoga.save_confidence
        });
        if let (true, Some(set)) = (confident, landmarks) {
            candidate = Some((set, record.timestamp));
        }
    }
    out.flush()?;

    if save_reference {
        // The detector saves its current detection, so replay the candidate last
        let now = match candidate {
            Some((set, timestamp)) => {
                let canvas = image::RgbImage::new(width, height);
                session.process_landmarks(canvas, Some(set), timestamp);
                timestamp
            }
            None => Utc::now(),
        };
        let outcome = session.save_reference(now);
        eprintln!("{}", serde_json::to_string(&outcome)?);
        if !outcome.saved {
            return Err(PosecoachCliError::SaveRejected(outcome.message));
        }
    }

    Ok(())
}

fn cmd_references(dir: &Path, json: bool) -> Result<(), PosecoachCliError> {
    let store = ReferenceStore::open(dir)?;
    let entries: Vec<ReferenceEntry> = YogaPose::ALL
        .iter()
        .map(|&pose| {
            let record = store.record(pose).filter(|r| !r.angles.is_empty());
            ReferenceEntry {
                pose,
                has_reference: record.is_some(),
                saved_at: record.as_ref().map(|r| r.saved_at),
                angles: record.map(|r| r.angles).unwrap_or_default(),
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("Reference poses in {}", dir.display());
        println!();
        for entry in &entries {
            match entry.saved_at {
                Some(saved_at) => println!(
                    "  {:<10} saved {}",
                    entry.pose.title(),
                    saved_at.format("%Y-%m-%d %H:%M:%S UTC")
                ),
                None => println!("  {:<10} -", entry.pose.title()),
            }
        }
    }

    Ok(())
}

fn cmd_tips(exercise: &str, json: bool) -> Result<(), PosecoachCliError> {
    let kind: ExerciseKind = exercise.parse()?;
    let tips = exercise_tips(kind);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "exercise": kind,
                "tips": tips,
            }))?
        );
    } else {
        println!("{kind}");
        for tip in tips {
            println!("  - {tip}");
        }
    }

    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), PosecoachCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "posecoach_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Posecoach version {}", POSECOACH_VERSION),
    });

    let config = match load_config(config_path) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: match config_path {
                    Some(path) => format!("Configuration {} is valid", path.display()),
                    None => "Using default configuration".to_string(),
                },
            });
            config
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid configuration: {}", CliError::from(e).message),
            });
            CoachConfig::default()
        }
    };

    checks.push(check_model(config.model_path.as_deref()));

    if let Some(dir) = &config.reference_dir {
        checks.push(check_references(dir));
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input to replay a file)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready to replay landmarks)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: POSECOACH_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Posecoach Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PosecoachCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_model(path: Option<&Path>) -> DoctorCheck {
    let name = "pose_model".to_string();
    let Some(path) = path else {
        return DoctorCheck {
            name,
            status: CheckStatus::Warning,
            message: "No pose model configured, yoga poses will not be classified".to_string(),
        };
    };

    match ModelArtifact::load(path) {
        Ok(artifact) => {
            let classes = artifact.classifier.centroids.len();
            let features = artifact.scaler.mean.len();
            if classes == YogaPose::ALL.len() && features == ANGLE_PARTS.len() {
                DoctorCheck {
                    name,
                    status: CheckStatus::Ok,
                    message: format!("Model valid ({classes} poses, {features} features)"),
                }
            } else {
                DoctorCheck {
                    name,
                    status: CheckStatus::Error,
                    message: format!(
                        "Model has {classes} poses and {features} features, expected {} and {}",
                        YogaPose::ALL.len(),
                        ANGLE_PARTS.len()
                    ),
                }
            }
        }
        Err(e) => DoctorCheck {
            name,
            status: CheckStatus::Error,
            message: format!("Cannot load model {}: {}", path.display(), e),
        },
    }
}

fn check_references(dir: &Path) -> DoctorCheck {
    let name = "references".to_string();
    if !dir.is_dir() {
        return DoctorCheck {
            name,
            status: CheckStatus::Warning,
            message: format!("{} does not exist yet", dir.display()),
        };
    }

    let saved = YogaPose::ALL
        .iter()
        .filter(|&&pose| ReferenceStore::path_for(dir, pose).is_file())
        .count();
    DoctorCheck {
        name,
        status: CheckStatus::Ok,
        message: format!("{saved} of {} reference poses saved", YogaPose::ALL.len()),
    }
}

// Error types

#[derive(Debug)]
enum PosecoachCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    NoRecords,
    NoReferenceDir,
    SaveRejected(String),
    DoctorFailed,
}

impl From<io::Error> for PosecoachCliError {
    fn from(e: io::Error) -> Self {
        PosecoachCliError::Io(e)
    }
}

impl From<PipelineError> for PosecoachCliError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Io(e) => PosecoachCliError::Io(e),
            other => PosecoachCliError::Pipeline(other),
        }
    }
}

impl From<serde_json::Error> for PosecoachCliError {
    fn from(e: serde_json::Error) -> Self {
        PosecoachCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PosecoachCliError> for CliError {
    fn from(e: PosecoachCliError) -> Self {
        match e {
            PosecoachCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PosecoachCliError::Pipeline(PipelineError::UnknownExercise(name)) => CliError {
                code: "UNKNOWN_EXERCISE".to_string(),
                message: format!("Unknown exercise: {name}"),
                hint: Some(format!(
                    "Use one of: {}",
                    ExerciseKind::ALL.map(|k| k.as_str()).join(", ")
                )),
            },
            PosecoachCliError::Pipeline(e @ PipelineError::InvalidLandmarks(_)) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Each line needs a timestamp and 33 landmarks (or null)".to_string(),
                ),
            },
            PosecoachCliError::Pipeline(e @ PipelineError::Config(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'posecoach doctor --config <file>' for details".to_string()),
            },
            PosecoachCliError::Pipeline(e) => CliError {
                code: "PIPELINE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            PosecoachCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PosecoachCliError::NoRecords => CliError {
                code: "NO_RECORDS".to_string(),
                message: "No landmark records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PosecoachCliError::NoReferenceDir => CliError {
                code: "NO_REFERENCE_DIR".to_string(),
                message: "No reference directory given".to_string(),
                hint: Some("Pass --references or set reference_dir in the config".to_string()),
            },
            PosecoachCliError::SaveRejected(message) => CliError {
                code: "SAVE_REJECTED".to_string(),
                message,
                hint: Some("Hold the pose steadily in full view and retry".to_string()),
            },
            PosecoachCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ReferenceEntry {
    pose: YogaPose,
    has_reference: bool,
    saved_at: Option<DateTime<Utc>>,
    angles: Vec<f64>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

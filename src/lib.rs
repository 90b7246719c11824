//! Posecoach - frame-by-frame exercise coaching from body landmarks
//!
//! Each camera frame runs through a deterministic pipeline: landmark
//! extraction → rep counting and form checks (or yoga classification and
//! reference comparison) → annotated frame and structured report.
//!
//! ## Modules
//!
//! - **Exercises**: nine rep counters (curls, deadlifts, lunges, plank,
//!   pull-ups, push-ups, shoulder press, squats) with a form evaluator
//! - **Yoga**: joint angle features, pose classification and corrections
//!   against saved reference poses
//! - **Sessions**: per-feed state, frame annotation and workout summaries

pub mod capture;
pub mod config;
pub mod error;
pub mod exercises;
pub mod form;
pub mod geometry;
pub mod landmarks;
pub mod overlay;
pub mod pipeline;
pub mod types;
pub mod workout;
pub mod yoga;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::CoachConfig;
pub use error::{PipelineError, Result};
pub use landmarks::{Detection, DetectionStatus, LandmarkProvider};
pub use pipeline::{ExerciseSession, FrameReport, FrameResult, YogaSession};
pub use types::{BodyLandmark, ExerciseKind, ExerciseState, Landmark, LandmarkSet, Stage};
pub use workout::{exercise_tips, WorkoutReport, WorkoutSummary};
pub use yoga::{ReferenceStore, YogaDetector, YogaPose};

/// Library version embedded in every frame report
pub const POSECOACH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for frame reports
pub const PRODUCER_NAME: &str = "posecoach";

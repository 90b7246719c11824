//! Core types for the Posecoach pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: landmark sets, exercise identifiers, per-session exercise state and
//! the form-quality verdict.

use crate::error::{PipelineError, Result};
use crate::geometry::{joint_angle, Point};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of points in the BlazePose body skeleton
pub const LANDMARK_COUNT: usize = 33;

/// BlazePose body landmark indices (33 total)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyLandmark {
    /// Position of this joint in a landmark set
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyLandmark::Nose => "nose",
            BodyLandmark::LeftEyeInner => "left_eye_inner",
            BodyLandmark::LeftEye => "left_eye",
            BodyLandmark::LeftEyeOuter => "left_eye_outer",
            BodyLandmark::RightEyeInner => "right_eye_inner",
            BodyLandmark::RightEye => "right_eye",
            BodyLandmark::RightEyeOuter => "right_eye_outer",
            BodyLandmark::LeftEar => "left_ear",
            BodyLandmark::RightEar => "right_ear",
            BodyLandmark::MouthLeft => "mouth_left",
            BodyLandmark::MouthRight => "mouth_right",
            BodyLandmark::LeftShoulder => "left_shoulder",
            BodyLandmark::RightShoulder => "right_shoulder",
            BodyLandmark::LeftElbow => "left_elbow",
            BodyLandmark::RightElbow => "right_elbow",
            BodyLandmark::LeftWrist => "left_wrist",
            BodyLandmark::RightWrist => "right_wrist",
            BodyLandmark::LeftPinky => "left_pinky",
            BodyLandmark::RightPinky => "right_pinky",
            BodyLandmark::LeftIndex => "left_index",
            BodyLandmark::RightIndex => "right_index",
            BodyLandmark::LeftThumb => "left_thumb",
            BodyLandmark::RightThumb => "right_thumb",
            BodyLandmark::LeftHip => "left_hip",
            BodyLandmark::RightHip => "right_hip",
            BodyLandmark::LeftKnee => "left_knee",
            BodyLandmark::RightKnee => "right_knee",
            BodyLandmark::LeftAnkle => "left_ankle",
            BodyLandmark::RightAnkle => "right_ankle",
            BodyLandmark::LeftHeel => "left_heel",
            BodyLandmark::RightHeel => "right_heel",
            BodyLandmark::LeftFootIndex => "left_foot_index",
            BodyLandmark::RightFootIndex => "right_foot_index",
        }
    }
}

/// A single normalized keypoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position, 0-1 of frame width
    pub x: f64,
    /// Vertical position, 0-1 of frame height (grows downwards)
    pub y: f64,
    /// Relative depth, unused by the 2D rules
    #[serde(default)]
    pub z: f64,
    /// Detector confidence that the point is visible (0-1)
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// The 33-point body skeleton detected in one frame.
///
/// The index-to-joint mapping follows [`BodyLandmark`] and is never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Build a landmark set, rejecting anything other than 33 points
    pub fn new(points: Vec<Landmark>) -> Result<Self> {
        if points.len() != LANDMARK_COUNT {
            return Err(PipelineError::InvalidLandmarks(format!(
                "expected {LANDMARK_COUNT} landmarks, got {}",
                points.len()
            )));
        }
        if points
            .iter()
            .any(|p| !p.x.is_finite() || !p.y.is_finite() || !p.visibility.is_finite())
        {
            return Err(PipelineError::InvalidLandmarks(
                "landmark coordinates must be finite".to_string(),
            ));
        }
        Ok(Self { points })
    }

    /// Build from `[x, y, visibility]` triples
    pub fn from_triples(triples: &[[f64; 3]]) -> Result<Self> {
        Self::new(
            triples
                .iter()
                .map(|[x, y, v]| Landmark::new(*x, *y, *v))
                .collect(),
        )
    }

    pub fn get(&self, landmark: BodyLandmark) -> &Landmark {
        &self.points[landmark.index()]
    }

    pub fn point(&self, landmark: BodyLandmark) -> Point {
        self.get(landmark).point()
    }

    pub fn visibility(&self, landmark: BodyLandmark) -> f64 {
        self.get(landmark).visibility
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Angle at `b` between `a` and `c`, in degrees
    pub fn angle(&self, a: BodyLandmark, b: BodyLandmark, c: BodyLandmark) -> Result<f64> {
        joint_angle(self.point(a), self.point(b), self.point(c)).ok_or_else(|| {
            PipelineError::DegenerateGeometry(format!(
                "{} / {} / {}",
                a.as_str(),
                b.as_str(),
                c.as_str()
            ))
        })
    }

    /// Mean visibility over a subset of joints
    pub fn mean_visibility(&self, joints: &[BodyLandmark]) -> f64 {
        if joints.is_empty() {
            return 0.0;
        }
        joints.iter().map(|j| self.visibility(*j)).sum::<f64>() / joints.len() as f64
    }

    /// First joint in `joints` whose visibility is below `threshold`
    pub fn first_hidden(&self, joints: &[BodyLandmark], threshold: f64) -> Option<BodyLandmark> {
        joints
            .iter()
            .copied()
            .find(|j| self.visibility(*j) < threshold)
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = PipelineError;

    fn try_from(points: Vec<Landmark>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

/// Exercises with a dedicated rep counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    BicepCurls,
    Deadlifts,
    HammerCurls,
    Lunges,
    Plank,
    PullUps,
    PushUps,
    ShoulderPress,
    Squats,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 9] = [
        ExerciseKind::BicepCurls,
        ExerciseKind::Deadlifts,
        ExerciseKind::HammerCurls,
        ExerciseKind::Lunges,
        ExerciseKind::Plank,
        ExerciseKind::PullUps,
        ExerciseKind::PushUps,
        ExerciseKind::ShoulderPress,
        ExerciseKind::Squats,
    ];

    /// Human-facing name, as shown by the web layer
    pub fn display_name(&self) -> &'static str {
        match self {
            ExerciseKind::BicepCurls => "Bicep Curls",
            ExerciseKind::Deadlifts => "Deadlifts",
            ExerciseKind::HammerCurls => "Hammer Curls",
            ExerciseKind::Lunges => "Lunges",
            ExerciseKind::Plank => "Plank",
            ExerciseKind::PullUps => "Pull-ups",
            ExerciseKind::PushUps => "Push-ups",
            ExerciseKind::ShoulderPress => "Shoulder Press",
            ExerciseKind::Squats => "Squats",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseKind::BicepCurls => "bicep_curls",
            ExerciseKind::Deadlifts => "deadlifts",
            ExerciseKind::HammerCurls => "hammer_curls",
            ExerciseKind::Lunges => "lunges",
            ExerciseKind::Plank => "plank",
            ExerciseKind::PullUps => "pull_ups",
            ExerciseKind::PushUps => "push_ups",
            ExerciseKind::ShoulderPress => "shoulder_press",
            ExerciseKind::Squats => "squats",
        }
    }

    /// Plank is scored by hold duration instead of repetitions
    pub fn is_timed(&self) -> bool {
        matches!(self, ExerciseKind::Plank)
    }

    /// Stage a fresh session starts in
    pub fn initial_stage(&self) -> Stage {
        if self.is_timed() {
            Stage::Idle
        } else {
            Stage::Up
        }
    }

    /// Whether this exercise's counter can ever be in `stage`
    pub fn accepts_stage(&self, stage: Stage) -> bool {
        if self.is_timed() {
            matches!(stage, Stage::Idle | Stage::Planking | Stage::Resting)
        } else {
            matches!(stage, Stage::Up | Stage::Down)
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ExerciseKind {
    type Err = PipelineError;

    /// Accepts display names ("Push-ups") and identifiers ("push_ups"),
    /// ignoring case, spaces, dashes and underscores.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = normalize_name(s);
        ExerciseKind::ALL
            .iter()
            .copied()
            .find(|k| normalize_name(k.as_str()) == wanted)
            .ok_or_else(|| PipelineError::UnknownExercise(s.to_string()))
    }
}

fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Phase of the current repetition cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Up,
    Down,
    Idle,
    Planking,
    Resting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Up => "up",
            Stage::Down => "down",
            Stage::Idle => "idle",
            Stage::Planking => "planking",
            Stage::Resting => "resting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plank hold timer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlankTimer {
    /// When the current hold started
    pub start_time: Option<DateTime<Utc>>,
    /// Longest hold in this session (seconds)
    pub best_duration: f64,
    /// Length of the current hold (seconds)
    pub current_duration: f64,
}

/// Per-session exercise state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseState {
    /// Completed repetitions
    pub counter: u32,
    /// Current stage of the cycle
    pub stage: Stage,
    /// Hold timer, only advanced by the plank counter
    pub plank: PlankTimer,
}

impl ExerciseState {
    pub fn new(kind: ExerciseKind) -> Self {
        Self {
            counter: 0,
            stage: kind.initial_stage(),
            plank: PlankTimer::default(),
        }
    }

    /// Restore the initial counter, stage and timer for `kind`
    pub fn reset(&mut self, kind: ExerciseKind) {
        *self = Self::new(kind);
    }

    pub fn with_stage(stage: Stage) -> Self {
        Self {
            counter: 0,
            stage,
            plank: PlankTimer::default(),
        }
    }
}

/// Structural verdict on the current posture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormQuality {
    pub is_correct: bool,
    pub message: String,
    /// 0-100
    pub confidence: u8,
}

impl FormQuality {
    pub fn correct() -> Self {
        Self {
            is_correct: true,
            message: "Correct Posture".to_string(),
            confidence: 90,
        }
    }

    pub fn undetected() -> Self {
        Self {
            is_correct: true,
            message: "Posture Undetected".to_string(),
            confidence: 50,
        }
    }

    pub fn out_of_frame() -> Self {
        Self {
            is_correct: true,
            message: "Move Into Frame".to_string(),
            confidence: 60,
        }
    }

    pub fn wrong(issue: &str, confidence: u8) -> Self {
        Self {
            is_correct: false,
            message: format!("Wrong: {issue}"),
            confidence,
        }
    }
}

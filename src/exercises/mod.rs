//! Rep counters
//!
//! Each exercise is a small state machine keyed on one or more joint angles.
//! Counters are pure: they read the prior [`ExerciseState`] and return a
//! [`RepOutcome`] which the caller applies. Entering the extended zone sets the
//! baseline stage; entering the contracted zone while in the baseline stage
//! counts one repetition and flips the stage. Staying in either zone for any
//! number of frames never counts twice.

pub mod bicep_curl;
pub mod deadlift;
pub mod hammer_curl;
pub mod lunge;
pub mod plank;
pub mod pull_up;
pub mod push_up;
pub mod shoulder_press;
pub mod squat;

use crate::config::PlankConfig;
use crate::error::Result;
use crate::types::{ExerciseKind, ExerciseState, LandmarkSet, PlankTimer, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Feedback lines shown per frame unless configured otherwise
pub const DEFAULT_FEEDBACK_LIMIT: usize = 3;

/// A measured joint angle, for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointAngle {
    pub name: String,
    pub degrees: f64,
}

/// Result of running a counter on one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepOutcome {
    pub stage: Stage,
    pub counter: u32,
    pub plank: PlankTimer,
    /// Advisory cues in the order they were raised
    pub feedback: Vec<String>,
    pub angles: Vec<JointAngle>,
}

impl RepOutcome {
    /// Start from the prior state with no feedback
    pub fn carry(state: &ExerciseState) -> Self {
        Self {
            stage: state.stage,
            counter: state.counter,
            plank: state.plank.clone(),
            feedback: Vec::new(),
            angles: Vec::new(),
        }
    }

    pub(crate) fn say(&mut self, cue: &str) {
        self.feedback.push(cue.to_string());
    }

    pub(crate) fn record(&mut self, name: &str, degrees: f64) {
        self.angles.push(JointAngle {
            name: name.to_string(),
            degrees,
        });
    }

    /// Debounced edge trigger.
    ///
    /// `extended` moves to `baseline`; `contracted` while at `baseline` counts
    /// a repetition and moves to `counted`. Returns true when a rep was counted.
    pub(crate) fn advance(
        &mut self,
        extended: bool,
        contracted: bool,
        baseline: Stage,
        counted: Stage,
    ) -> bool {
        if extended {
            self.stage = baseline;
        }
        if contracted && self.stage == baseline {
            self.stage = counted;
            self.counter += 1;
            return true;
        }
        false
    }

    /// First `limit` feedback lines
    pub fn top_feedback(&self, limit: usize) -> &[String] {
        &self.feedback[..self.feedback.len().min(limit)]
    }

    /// Write the new stage, counter and timer back into session state
    pub fn apply(&self, state: &mut ExerciseState) {
        state.stage = self.stage;
        state.counter = self.counter;
        state.plank = self.plank.clone();
    }
}

/// Run the counter for `kind` on one frame
pub fn process(
    kind: ExerciseKind,
    landmarks: &LandmarkSet,
    state: &ExerciseState,
    now: DateTime<Utc>,
    plank_config: &PlankConfig,
) -> Result<RepOutcome> {
    match kind {
        ExerciseKind::BicepCurls => bicep_curl::process(landmarks, state),
        ExerciseKind::Deadlifts => deadlift::process(landmarks, state),
        ExerciseKind::HammerCurls => hammer_curl::process(landmarks, state),
        ExerciseKind::Lunges => lunge::process(landmarks, state),
        ExerciseKind::Plank => plank::process(landmarks, state, now, plank_config.grace_secs),
        ExerciseKind::PullUps => pull_up::process(landmarks, state),
        ExerciseKind::PushUps => push_up::process(landmarks, state),
        ExerciseKind::ShoulderPress => shoulder_press::process(landmarks, state),
        ExerciseKind::Squats => squat::process(landmarks, state),
    }
}

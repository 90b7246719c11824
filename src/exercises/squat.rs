//! Squats, counted on the left knee

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, Stage};

/// Knee angle above which the lifter is standing
pub const STANDING_KNEE: f64 = 160.0;

/// Knee angle below which the squat is deep enough to count
pub const DEPTH_KNEE: f64 = 90.0;

/// General cues shown while the lifter is above depth
pub const FORM_CUES: [&str; 8] = [
    "Keep back straight",
    "Balance both legs",
    "Knees over ankles",
    "Lower hips more",
    "Widen stance",
    "Narrow stance",
    "Reduce knee flare",
    "Engage knees more",
];

pub fn process(landmarks: &LandmarkSet, state: &ExerciseState) -> Result<RepOutcome> {
    let knee = landmarks.angle(L::LeftHip, L::LeftKnee, L::LeftAnkle)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("knee", knee);
    outcome.advance(knee > STANDING_KNEE, knee < DEPTH_KNEE, Stage::Up, Stage::Down);

    if knee < DEPTH_KNEE {
        outcome.say("Good depth!");
    } else {
        for cue in FORM_CUES {
            outcome.say(cue);
        }
    }

    Ok(outcome)
}

//! Pull-ups, counted on both elbows

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, Stage};

pub const HANGING_ELBOW: f64 = 160.0;
pub const PULLED_ELBOW: f64 = 90.0;
pub const MAX_ASYMMETRY: f64 = 15.0;

pub fn process(landmarks: &LandmarkSet, state: &ExerciseState) -> Result<RepOutcome> {
    let left = landmarks.angle(L::LeftShoulder, L::LeftElbow, L::LeftWrist)?;
    let right = landmarks.angle(L::RightShoulder, L::RightElbow, L::RightWrist)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("left_elbow", left);
    outcome.record("right_elbow", right);

    let hanging = left > HANGING_ELBOW && right > HANGING_ELBOW;
    let pulled = left < PULLED_ELBOW && right < PULLED_ELBOW;
    if outcome.advance(hanging, pulled, Stage::Down, Stage::Up) {
        outcome.say("Good rep!");
    }

    if hanging {
        outcome.say("Fully extend arms!");
    } else if pulled {
        outcome.say("Chin above bar!");
    }
    if (left - right).abs() > MAX_ASYMMETRY {
        outcome.say("Balance both arms");
    }

    Ok(outcome)
}

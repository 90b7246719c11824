//! Lunges
//!
//! A rep is a valid lunge: torso roughly vertical, one knee bent past 90
//! degrees and the other nearly straight. The stage returns to up as soon as
//! the position is no longer valid.

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, Stage};

pub const TORSO_MIN: f64 = 75.0;
pub const TORSO_MAX: f64 = 105.0;
pub const FRONT_KNEE: f64 = 90.0;
pub const BACK_KNEE: f64 = 150.0;

pub fn process(landmarks: &LandmarkSet, state: &ExerciseState) -> Result<RepOutcome> {
    let left_knee = landmarks.angle(L::LeftHip, L::LeftKnee, L::LeftAnkle)?;
    let right_knee = landmarks.angle(L::RightHip, L::RightKnee, L::RightAnkle)?;
    let torso = landmarks.angle(L::LeftShoulder, L::LeftHip, L::RightHip)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("left_knee", left_knee);
    outcome.record("right_knee", right_knee);
    outcome.record("torso", torso);

    let upright = torso > TORSO_MIN && torso < TORSO_MAX;
    let split = (left_knee < FRONT_KNEE && right_knee > BACK_KNEE)
        || (right_knee < FRONT_KNEE && left_knee > BACK_KNEE);
    let valid = upright && split;

    if valid && outcome.stage != Stage::Down {
        outcome.stage = Stage::Down;
        outcome.counter += 1;
        outcome.say("Good lunge!");
    } else if !valid && outcome.stage == Stage::Down {
        outcome.stage = Stage::Up;
    }

    if torso < TORSO_MIN {
        outcome.say("Lean forward less");
    }
    if torso > TORSO_MAX {
        outcome.say("Keep torso upright");
    }
    if left_knee < FRONT_KNEE && landmarks.get(L::LeftKnee).x < landmarks.get(L::LeftAnkle).x {
        outcome.say("Front knee over toes");
    }
    if right_knee < FRONT_KNEE && landmarks.get(L::RightKnee).x > landmarks.get(L::RightAnkle).x
    {
        outcome.say("Front knee over toes");
    }

    Ok(outcome)
}

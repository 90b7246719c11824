//! Hammer curls, counted on both arms together

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, Stage};

pub const EXTENDED_ELBOW: f64 = 160.0;
pub const CURLED_ELBOW: f64 = 90.0;
pub const MAX_ASYMMETRY: f64 = 15.0;
pub const ELBOW_DRIFT: f64 = 0.1;

pub fn process(landmarks: &LandmarkSet, state: &ExerciseState) -> Result<RepOutcome> {
    let left = landmarks.angle(L::LeftShoulder, L::LeftElbow, L::LeftWrist)?;
    let right = landmarks.angle(L::RightShoulder, L::RightElbow, L::RightWrist)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("left_elbow", left);
    outcome.record("right_elbow", right);

    let extended = left > EXTENDED_ELBOW && right > EXTENDED_ELBOW;
    let curled = left < CURLED_ELBOW && right < CURLED_ELBOW;
    if outcome.advance(extended, curled, Stage::Down, Stage::Up) {
        outcome.say("Good rep!");
    }

    if (left - right).abs() > MAX_ASYMMETRY {
        outcome.say("Unbalanced arms");
    }

    let l_shoulder = landmarks.get(L::LeftShoulder);
    let r_shoulder = landmarks.get(L::RightShoulder);
    let l_elbow = landmarks.get(L::LeftElbow);
    let r_elbow = landmarks.get(L::RightElbow);

    if l_elbow.x < l_shoulder.x - ELBOW_DRIFT || r_elbow.x > r_shoulder.x + ELBOW_DRIFT {
        outcome.say("Keep elbows close");
    }
    if l_shoulder.y > l_elbow.y || r_shoulder.y > r_elbow.y {
        outcome.say("Shoulders raised");
    }

    Ok(outcome)
}

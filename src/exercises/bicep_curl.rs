//! Bicep curls, counted on the right arm

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, Stage};

pub const EXTENDED_ELBOW: f64 = 160.0;
pub const CURLED_ELBOW: f64 = 30.0;

/// Horizontal elbow drift away from the shoulder that draws a cue
pub const ELBOW_DRIFT: f64 = 0.1;

pub fn process(landmarks: &LandmarkSet, state: &ExerciseState) -> Result<RepOutcome> {
    let elbow = landmarks.angle(L::RightShoulder, L::RightElbow, L::RightWrist)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("elbow", elbow);
    if outcome.advance(
        elbow > EXTENDED_ELBOW,
        elbow < CURLED_ELBOW,
        Stage::Down,
        Stage::Up,
    ) {
        outcome.say("Good rep!");
    }

    if elbow > EXTENDED_ELBOW {
        outcome.say("Lower your arm!");
    } else if elbow < CURLED_ELBOW {
        outcome.say("Curl up!");
    }

    let drift = (landmarks.get(L::RightElbow).x - landmarks.get(L::RightShoulder).x).abs();
    if drift > ELBOW_DRIFT {
        outcome.say("Keep elbow close to body");
    }

    Ok(outcome)
}

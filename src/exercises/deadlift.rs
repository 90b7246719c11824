//! Deadlifts, counted on the left knee and back

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, Stage};

/// Both knee and back above this means the lifter is standing tall
pub const LOCKOUT: f64 = 160.0;
pub const HINGED_BACK: f64 = 120.0;
pub const HINGED_KNEE: f64 = 140.0;

pub const ROUNDED_BACK: f64 = 100.0;
pub const DEEP_KNEE: f64 = 80.0;
pub const IDEAL_BACK: f64 = 140.0;
pub const BACK_TOLERANCE: f64 = 20.0;

pub fn process(landmarks: &LandmarkSet, state: &ExerciseState) -> Result<RepOutcome> {
    let knee = landmarks.angle(L::LeftHip, L::LeftKnee, L::LeftAnkle)?;
    let back = landmarks.angle(L::LeftShoulder, L::LeftHip, L::LeftKnee)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("knee", knee);
    outcome.record("back", back);

    let standing = back > LOCKOUT && knee > LOCKOUT;
    let hinged = back < HINGED_BACK && knee < HINGED_KNEE;
    if outcome.advance(standing, hinged, Stage::Up, Stage::Down) {
        outcome.say("Good rep!");
    }

    if back < ROUNDED_BACK {
        outcome.say("Keep back straight!");
    }
    if knee < DEEP_KNEE {
        outcome.say("Don't bend knees too much!");
    }
    if (back - IDEAL_BACK).abs() > BACK_TOLERANCE {
        outcome.say("Adjust back angle");
    }

    Ok(outcome)
}

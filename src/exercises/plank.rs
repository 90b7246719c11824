//! Plank hold timer
//!
//! Plank is scored by duration, never by repetitions. The stage moves between
//! idle, planking and resting:
//!
//! - entering position while not planking starts a new hold
//! - while planking the current duration tracks `now - start_time` and the
//!   best duration keeps the longest hold seen in the session
//! - leaving position ends the hold only once the grace period since the hold
//!   started has passed, which absorbs brief landmark jitter

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, PlankTimer, Stage};
use chrono::{DateTime, Utc};
use log::debug;

/// Knees below this are considered bent
pub const STRAIGHT_KNEE: f64 = 160.0;
/// Maximum vertical offset between hips
pub const HIP_LEVEL_TOLERANCE: f64 = 0.05;
pub const BODY_LINE_MIN: f64 = 160.0;
pub const BODY_LINE_MAX: f64 = 190.0;
pub const SAGGING_BODY: f64 = 165.0;
pub const PIKED_BODY: f64 = 185.0;

/// Default grace period before a broken hold ends (seconds)
pub const DEFAULT_GRACE_SECS: f64 = 2.0;
/// Default hold goal (seconds)
pub const DEFAULT_GOAL_SECS: f64 = 60.0;

pub fn process(
    landmarks: &LandmarkSet,
    state: &ExerciseState,
    now: DateTime<Utc>,
    grace_secs: f64,
) -> Result<RepOutcome> {
    let left_body = landmarks.angle(L::LeftShoulder, L::LeftHip, L::LeftKnee)?;
    let right_body = landmarks.angle(L::RightShoulder, L::RightHip, L::RightKnee)?;
    let body = (left_body + right_body) / 2.0;
    let left_knee = landmarks.angle(L::LeftHip, L::LeftKnee, L::LeftAnkle)?;
    let right_knee = landmarks.angle(L::RightHip, L::RightKnee, L::RightAnkle)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("body", body);
    outcome.record("left_knee", left_knee);
    outcome.record("right_knee", right_knee);

    let knees_bent = left_knee < STRAIGHT_KNEE || right_knee < STRAIGHT_KNEE;
    let hips_level =
        (landmarks.get(L::LeftHip).y - landmarks.get(L::RightHip).y).abs() < HIP_LEVEL_TOLERANCE;
    let body_straight = body > BODY_LINE_MIN && body < BODY_LINE_MAX;

    if !knees_bent && hips_level && body_straight {
        if outcome.stage != Stage::Planking {
            outcome.stage = Stage::Planking;
            outcome.plank.start_time = Some(now);
            outcome.say("Plank started!");
            debug!("plank hold started");
        }

        let current = elapsed_secs(&outcome.plank, now);
        outcome.plank.current_duration = current;
        if current > outcome.plank.best_duration {
            outcome.plank.best_duration = current;
        }

        if body < SAGGING_BODY {
            outcome.say("Engage core - hips sagging");
        } else if body > PIKED_BODY {
            outcome.say("Lower hips slightly");
        }
    } else if outcome.stage == Stage::Planking {
        if elapsed_secs(&outcome.plank, now) > grace_secs {
            debug!(
                "plank hold ended after {:.1}s",
                outcome.plank.current_duration
            );
            outcome.stage = Stage::Resting;
            outcome.plank.current_duration = 0.0;
            outcome.say("Get back in plank position");
        }
    } else {
        outcome.say("Assume plank position");
    }

    Ok(outcome)
}

/// Seconds since the current hold started, never negative.
///
/// A frame stamped before the hold began counts as no time elapsed.
pub fn elapsed_secs(timer: &PlankTimer, now: DateTime<Utc>) -> f64 {
    timer
        .start_time
        .map(|start| (now - start).num_milliseconds() as f64 / 1000.0)
        .map(|secs| secs.max(0.0))
        .unwrap_or(0.0)
}

/// Fraction of the goal reached by the current hold, 0.0-1.0
pub fn progress(timer: &PlankTimer, goal_secs: f64) -> f64 {
    if goal_secs <= 0.0 {
        return 1.0;
    }
    (timer.current_duration / goal_secs).clamp(0.0, 1.0)
}

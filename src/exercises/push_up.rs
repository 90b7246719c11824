//! Push-ups, counted on both elbows

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, Stage};

pub const LOCKED_ELBOW: f64 = 165.0;
pub const BOTTOM_ELBOW: f64 = 90.0;
pub const OVER_DEPTH_ELBOW: f64 = 70.0;
pub const MAX_TORSO: f64 = 10.0;
pub const MAX_ASYMMETRY: f64 = 15.0;

pub fn process(landmarks: &LandmarkSet, state: &ExerciseState) -> Result<RepOutcome> {
    let left = landmarks.angle(L::LeftShoulder, L::LeftElbow, L::LeftWrist)?;
    let right = landmarks.angle(L::RightShoulder, L::RightElbow, L::RightWrist)?;
    let torso = landmarks.angle(L::LeftShoulder, L::LeftHip, L::RightHip)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("left_elbow", left);
    outcome.record("right_elbow", right);
    outcome.record("torso", torso);

    let locked = left > LOCKED_ELBOW && right > LOCKED_ELBOW;
    let bottom = left < BOTTOM_ELBOW && right < BOTTOM_ELBOW;
    if outcome.advance(locked, bottom, Stage::Up, Stage::Down) {
        outcome.say("Full range achieved!");
    }

    if torso > MAX_TORSO {
        outcome.say("Keep body straight");
    }
    if (left - right).abs() > MAX_ASYMMETRY {
        outcome.say("Balance arm movement");
    }
    if left < OVER_DEPTH_ELBOW || right < OVER_DEPTH_ELBOW {
        outcome.say("Lower more");
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::PoseBuilder;
    use crate::types::ExerciseKind;

    /// Left shoulder and right hip on the same side of the left hip, so the
    /// torso angle is zero
    fn arms(left: f64, right: f64) -> LandmarkSet {
        PoseBuilder::standing()
            .at(L::LeftShoulder, 0.8, 0.5)
            .at(L::LeftHip, 0.5, 0.5)
            .at(L::RightHip, 0.52, 0.5)
            .bend(L::LeftShoulder, L::LeftElbow, L::LeftWrist, left)
            .bend(L::RightShoulder, L::RightElbow, L::RightWrist, right)
            .build()
            .unwrap()
    }

    #[test]
    fn test_push_up_cycle() {
        let mut state = ExerciseState::new(ExerciseKind::PushUps);
        let mut counts = Vec::new();
        for degrees in [170.0, 120.0, 85.0, 80.0, 120.0, 170.0, 85.0] {
            process(&arms(degrees, degrees), &state)
                .unwrap()
                .apply(&mut state);
            counts.push(state.counter);
        }
        assert_eq!(counts, vec![0, 0, 1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_feedback_in_insertion_order() {
        let state = ExerciseState::with_stage(Stage::Up);
        let outcome = process(&arms(85.0, 60.0), &state).unwrap();
        assert_eq!(
            outcome.feedback,
            vec!["Full range achieved!", "Balance arm movement", "Lower more"]
        );
    }

    #[test]
    fn test_bent_torso_cue() {
        let state = ExerciseState::with_stage(Stage::Up);
        let upright = PoseBuilder::standing().build().unwrap();
        let outcome = process(&upright, &state).unwrap();
        assert!(outcome.feedback.contains(&"Keep body straight".to_string()));
    }
}

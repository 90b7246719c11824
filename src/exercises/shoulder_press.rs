//! Shoulder press, counted on both elbows

use super::RepOutcome;
use crate::error::Result;
use crate::types::{BodyLandmark as L, ExerciseState, LandmarkSet, Stage};

pub const EXTENDED_ELBOW: f64 = 160.0;
pub const RACKED_ELBOW: f64 = 90.0;
pub const MAX_ASYMMETRY: f64 = 15.0;

pub fn process(landmarks: &LandmarkSet, state: &ExerciseState) -> Result<RepOutcome> {
    let left = landmarks.angle(L::LeftShoulder, L::LeftElbow, L::LeftWrist)?;
    let right = landmarks.angle(L::RightShoulder, L::RightElbow, L::RightWrist)?;

    let mut outcome = RepOutcome::carry(state);
    outcome.record("left_elbow", left);
    outcome.record("right_elbow", right);

    let extended = left > EXTENDED_ELBOW && right > EXTENDED_ELBOW;
    let racked = left < RACKED_ELBOW && right < RACKED_ELBOW;
    if outcome.advance(extended, racked, Stage::Down, Stage::Up) {
        outcome.say("Good rep!");
    }

    if extended {
        outcome.say("Lower the weights!");
    } else if racked {
        outcome.say("Press upwards!");
    }
    if (left - right).abs() > MAX_ASYMMETRY {
        outcome.say("Balance both arms");
    }
    if landmarks.get(L::LeftShoulder).y > landmarks.get(L::LeftElbow).y
        || landmarks.get(L::RightShoulder).y > landmarks.get(L::RightElbow).y
    {
        outcome.say("Don't shrug shoulders");
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::PoseBuilder;
    use crate::types::ExerciseKind;

    fn arms(left: f64, right: f64) -> PoseBuilder {
        PoseBuilder::standing()
            .bend(L::LeftShoulder, L::LeftElbow, L::LeftWrist, left)
            .bend(L::RightShoulder, L::RightElbow, L::RightWrist, right)
    }

    #[test]
    fn test_press_cycle() {
        let mut state = ExerciseState::new(ExerciseKind::ShoulderPress);
        for degrees in [80.0, 170.0, 100.0, 80.0, 85.0] {
            process(&arms(degrees, degrees).build().unwrap(), &state)
                .unwrap()
                .apply(&mut state);
        }
        assert_eq!(state.counter, 1);
        assert_eq!(state.stage, Stage::Up);
    }

    #[test]
    fn test_feedback() {
        let state = ExerciseState::new(ExerciseKind::ShoulderPress);
        let outcome = process(&arms(170.0, 170.0).build().unwrap(), &state).unwrap();
        assert_eq!(outcome.feedback, vec!["Lower the weights!"]);

        let elbows_low = arms(60.0, 85.0)
            .at(L::RightElbow, 0.38, 0.25)
            .build()
            .unwrap();
        let outcome = process(&elbows_low, &state).unwrap();
        assert!(outcome.feedback.contains(&"Don't shrug shoulders".to_string()));
    }
}

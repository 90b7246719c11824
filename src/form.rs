//! Form-quality evaluation
//!
//! Independent of rep counting: given the current landmarks, exercise and
//! stage, run that exercise's structural checks and report the first fault
//! found. Most checks only apply in the contracted stage of the movement.

use crate::error::{PipelineError, Result};
use crate::geometry::{joint_angle, Point};
use crate::types::{BodyLandmark as L, ExerciseKind, FormQuality, LandmarkSet, Stage};
use log::debug;

/// Mean visibility required on the key joints before form is judged
pub const DEFAULT_FORM_VISIBILITY: f64 = 0.7;

/// Shoulders, elbows, hips and knees
pub const FORM_KEY_JOINTS: [L; 8] = [
    L::LeftShoulder,
    L::RightShoulder,
    L::LeftElbow,
    L::RightElbow,
    L::LeftHip,
    L::RightHip,
    L::LeftKnee,
    L::RightKnee,
];

/// A failed check: issue text and confidence
type Fault = (&'static str, u8);

/// Evaluate form with the default visibility threshold
pub fn evaluate(landmarks: Option<&LandmarkSet>, kind: ExerciseKind, stage: Stage) -> FormQuality {
    evaluate_with(landmarks, kind, stage, DEFAULT_FORM_VISIBILITY)
}

/// Evaluate form; exactly one verdict, the first failing check wins
pub fn evaluate_with(
    landmarks: Option<&LandmarkSet>,
    kind: ExerciseKind,
    stage: Stage,
    min_visibility: f64,
) -> FormQuality {
    let Some(landmarks) = landmarks else {
        return FormQuality::undetected();
    };

    if landmarks.mean_visibility(&FORM_KEY_JOINTS) < min_visibility {
        return FormQuality::out_of_frame();
    }

    let fault = match kind {
        ExerciseKind::Squats => squat(landmarks, stage),
        ExerciseKind::PushUps => push_up(landmarks, stage),
        ExerciseKind::Plank => plank(landmarks),
        ExerciseKind::Lunges => lunge(landmarks, stage),
        ExerciseKind::BicepCurls | ExerciseKind::HammerCurls => curl(landmarks, stage),
        ExerciseKind::Deadlifts => deadlift(landmarks, stage),
        ExerciseKind::PullUps => pull_up(landmarks, stage),
        ExerciseKind::ShoulderPress => shoulder_press(landmarks, stage),
    };

    match fault {
        Ok(Some((issue, confidence))) => FormQuality::wrong(issue, confidence),
        Ok(None) => FormQuality::correct(),
        Err(e) => {
            debug!("form check skipped: {e}");
            FormQuality::undetected()
        }
    }
}

fn mid(landmarks: &LandmarkSet, a: L, b: L) -> Point {
    Point::midpoint(landmarks.point(a), landmarks.point(b))
}

fn angle(a: Point, b: Point, c: Point) -> Result<f64> {
    joint_angle(a, b, c).ok_or_else(|| {
        PipelineError::DegenerateGeometry("form check midpoints".to_string())
    })
}

/// Either knee further left than its ankle by more than 0.1
fn knees_past_toes(landmarks: &LandmarkSet) -> bool {
    landmarks.get(L::LeftKnee).x < landmarks.get(L::LeftAnkle).x - 0.1
        || landmarks.get(L::RightKnee).x < landmarks.get(L::RightAnkle).x - 0.1
}

/// Shoulder, hip and ankle midpoints out of line
fn body_line(landmarks: &LandmarkSet) -> Result<Option<Fault>> {
    let shoulders = mid(landmarks, L::LeftShoulder, L::RightShoulder);
    let hips = mid(landmarks, L::LeftHip, L::RightHip);
    let ankles = mid(landmarks, L::LeftAnkle, L::RightAnkle);

    if angle(shoulders, hips, ankles)? < 160.0 {
        if hips.y > shoulders.y && hips.y > ankles.y {
            return Ok(Some(("Hips Too Low", 85)));
        }
        return Ok(Some(("Hips Too High", 85)));
    }
    Ok(None)
}

fn squat(landmarks: &LandmarkSet, stage: Stage) -> Result<Option<Fault>> {
    if stage != Stage::Down {
        return Ok(None);
    }
    if knees_past_toes(landmarks) {
        return Ok(Some(("Knees Past Toes", 80)));
    }

    let left_knee = landmarks.angle(L::LeftHip, L::LeftKnee, L::LeftAnkle)?;
    let right_knee = landmarks.angle(L::RightHip, L::RightKnee, L::RightAnkle)?;
    if (left_knee + right_knee) / 2.0 > 120.0 {
        return Ok(Some(("Squat Deeper", 85)));
    }

    let back = angle(
        mid(landmarks, L::LeftShoulder, L::RightShoulder),
        mid(landmarks, L::LeftHip, L::RightHip),
        landmarks.point(L::Nose),
    )?;
    if back < 150.0 {
        return Ok(Some(("Back Not Straight", 85)));
    }
    Ok(None)
}

fn push_up(landmarks: &LandmarkSet, stage: Stage) -> Result<Option<Fault>> {
    if stage != Stage::Down {
        return Ok(None);
    }
    let left = landmarks.angle(L::LeftShoulder, L::LeftElbow, L::LeftWrist)?;
    let right = landmarks.angle(L::RightShoulder, L::RightElbow, L::RightWrist)?;
    if (left + right) / 2.0 > 110.0 {
        return Ok(Some(("Lower Your Chest", 85)));
    }
    body_line(landmarks)
}

fn plank(landmarks: &LandmarkSet) -> Result<Option<Fault>> {
    if let Some(fault) = body_line(landmarks)? {
        return Ok(Some(fault));
    }

    let hips = mid(landmarks, L::LeftHip, L::RightHip).y;
    let shoulders = mid(landmarks, L::LeftShoulder, L::RightShoulder).y;
    let ankles = mid(landmarks, L::LeftAnkle, L::RightAnkle).y;
    if hips < shoulders - 0.05 || hips < ankles - 0.05 {
        return Ok(Some(("Keep Body Level", 80)));
    }
    Ok(None)
}

fn lunge(landmarks: &LandmarkSet, stage: Stage) -> Result<Option<Fault>> {
    if stage != Stage::Down {
        return Ok(None);
    }
    if knees_past_toes(landmarks) {
        return Ok(Some(("Knee Past Toes", 80)));
    }
    let lean = (mid(landmarks, L::LeftShoulder, L::RightShoulder).x
        - mid(landmarks, L::LeftHip, L::RightHip).x)
        .abs();
    if lean > 0.1 {
        return Ok(Some(("Keep Torso Upright", 85)));
    }
    Ok(None)
}

fn curl(landmarks: &LandmarkSet, stage: Stage) -> Result<Option<Fault>> {
    if stage != Stage::Up {
        return Ok(None);
    }
    let left = (landmarks.get(L::LeftElbow).x - landmarks.get(L::LeftShoulder).x).abs();
    let right = (landmarks.get(L::RightElbow).x - landmarks.get(L::RightShoulder).x).abs();
    if left > 0.15 || right > 0.15 {
        return Ok(Some(("Keep Elbows Fixed", 85)));
    }
    Ok(None)
}

fn deadlift(landmarks: &LandmarkSet, stage: Stage) -> Result<Option<Fault>> {
    if stage != Stage::Down {
        return Ok(None);
    }
    let shoulders = mid(landmarks, L::LeftShoulder, L::RightShoulder);
    let hips = mid(landmarks, L::LeftHip, L::RightHip);
    let above_hips = Point::new(hips.x, hips.y - 0.5);
    if angle(shoulders, hips, above_hips)? > 45.0 {
        return Ok(Some(("Keep Back Straight", 85)));
    }

    let knee_width = (landmarks.get(L::LeftKnee).x - landmarks.get(L::RightKnee).x).abs();
    let hip_width = (landmarks.get(L::LeftHip).x - landmarks.get(L::RightHip).x).abs();
    if knee_width < hip_width * 0.7 {
        return Ok(Some(("Knees Too Close", 80)));
    }
    Ok(None)
}

fn pull_up(landmarks: &LandmarkSet, stage: Stage) -> Result<Option<Fault>> {
    if stage != Stage::Up {
        return Ok(None);
    }
    let wrists = (landmarks.get(L::LeftWrist).y + landmarks.get(L::RightWrist).y) / 2.0;
    if landmarks.get(L::Nose).y > wrists {
        return Ok(Some(("Pull Up Higher", 85)));
    }
    Ok(None)
}

fn shoulder_press(landmarks: &LandmarkSet, stage: Stage) -> Result<Option<Fault>> {
    if stage != Stage::Up {
        return Ok(None);
    }
    let shoulders = mid(landmarks, L::LeftShoulder, L::RightShoulder);
    let wrists = mid(landmarks, L::LeftWrist, L::RightWrist);
    if shoulders.y - wrists.y < 0.2 {
        return Ok(Some(("Extend Arms Fully", 85)));
    }
    let hips = mid(landmarks, L::LeftHip, L::RightHip);
    if (shoulders.x - hips.x).abs() > 0.1 {
        return Ok(Some(("Keep Back Straight", 85)));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::PoseBuilder;

    fn standing() -> LandmarkSet {
        PoseBuilder::standing().build().unwrap()
    }

    #[test]
    fn test_no_pose_is_undetected() {
        let verdict = evaluate(None, ExerciseKind::Squats, Stage::Down);
        assert_eq!(verdict, FormQuality::undetected());
        assert!(verdict.is_correct);
        assert_eq!(verdict.confidence, 50);
    }

    #[test]
    fn test_low_visibility_asks_to_move_into_frame() {
        let faint = PoseBuilder::standing().all_visibility(0.6).build().unwrap();
        let verdict = evaluate(Some(&faint), ExerciseKind::PushUps, Stage::Down);
        assert_eq!(verdict.message, "Move Into Frame");
        assert_eq!(verdict.confidence, 60);
    }

    #[test]
    fn test_checks_gated_by_stage() {
        // a standing pose is a shallow squat, but only judged at the bottom
        let pose = standing();
        assert_eq!(
            evaluate(Some(&pose), ExerciseKind::Squats, Stage::Up),
            FormQuality::correct()
        );
        let verdict = evaluate(Some(&pose), ExerciseKind::Squats, Stage::Down);
        assert_eq!(verdict.message, "Wrong: Squat Deeper");
        assert!(!verdict.is_correct);
        assert_eq!(verdict.confidence, 85);
    }

    #[test]
    fn test_first_failing_check_wins() {
        // knees past toes and too shallow: the knee check comes first
        let pose = PoseBuilder::standing()
            .at(L::LeftKnee, 0.40, 0.75)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&pose), ExerciseKind::Squats, Stage::Down);
        assert_eq!(verdict, FormQuality::wrong("Knees Past Toes", 80));
    }

    #[test]
    fn test_plank_hips_sagging() {
        let pose = PoseBuilder::standing()
            .at(L::LeftShoulder, 0.2, 0.5)
            .at(L::RightShoulder, 0.2, 0.5)
            .at(L::LeftHip, 0.5, 0.65)
            .at(L::RightHip, 0.5, 0.65)
            .at(L::LeftAnkle, 0.9, 0.5)
            .at(L::RightAnkle, 0.9, 0.5)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&pose), ExerciseKind::Plank, Stage::Idle);
        assert_eq!(verdict.message, "Wrong: Hips Too Low");

        let piked = PoseBuilder::standing()
            .at(L::LeftShoulder, 0.2, 0.5)
            .at(L::RightShoulder, 0.2, 0.5)
            .at(L::LeftHip, 0.5, 0.35)
            .at(L::RightHip, 0.5, 0.35)
            .at(L::LeftAnkle, 0.9, 0.5)
            .at(L::RightAnkle, 0.9, 0.5)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&piked), ExerciseKind::Plank, Stage::Planking);
        assert_eq!(verdict.message, "Wrong: Hips Too High");
    }

    #[test]
    fn test_plank_level_body_is_correct() {
        let pose = PoseBuilder::standing()
            .at(L::LeftShoulder, 0.2, 0.5)
            .at(L::RightShoulder, 0.2, 0.5)
            .at(L::LeftHip, 0.5, 0.5)
            .at(L::RightHip, 0.5, 0.5)
            .at(L::LeftAnkle, 0.9, 0.5)
            .at(L::RightAnkle, 0.9, 0.5)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&pose), ExerciseKind::Plank, Stage::Planking);
        assert_eq!(verdict, FormQuality::correct());
    }

    #[test]
    fn test_curls_share_elbow_check() {
        let pose = PoseBuilder::standing()
            .at(L::RightElbow, 0.2, 0.45)
            .build()
            .unwrap();
        for kind in [ExerciseKind::BicepCurls, ExerciseKind::HammerCurls] {
            let verdict = evaluate(Some(&pose), kind, Stage::Up);
            assert_eq!(verdict.message, "Wrong: Keep Elbows Fixed");
        }
    }

    #[test]
    fn test_pull_up_height() {
        // hands at hip level, nose well above: fine
        assert_eq!(
            evaluate(Some(&standing()), ExerciseKind::PullUps, Stage::Up),
            FormQuality::correct()
        );
        let low = PoseBuilder::standing()
            .at(L::LeftWrist, 0.6, 0.05)
            .at(L::RightWrist, 0.4, 0.05)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&low), ExerciseKind::PullUps, Stage::Up);
        assert_eq!(verdict.message, "Wrong: Pull Up Higher");
    }

    #[test]
    fn test_shoulder_press_extension() {
        let verdict = evaluate(Some(&standing()), ExerciseKind::ShoulderPress, Stage::Up);
        assert_eq!(verdict.message, "Wrong: Extend Arms Fully");

        let overhead = PoseBuilder::standing()
            .at(L::LeftWrist, 0.6, 0.02)
            .at(L::RightWrist, 0.4, 0.02)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&overhead), ExerciseKind::ShoulderPress, Stage::Up);
        assert_eq!(verdict, FormQuality::correct());
    }

    #[test]
    fn test_deadlift_checks() {
        // upright back, knees narrower than hips
        let narrow = PoseBuilder::standing()
            .at(L::LeftKnee, 0.52, 0.75)
            .at(L::RightKnee, 0.48, 0.75)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&narrow), ExerciseKind::Deadlifts, Stage::Down);
        assert_eq!(verdict, FormQuality::wrong("Knees Too Close", 80));

        let rounded = PoseBuilder::standing()
            .at(L::LeftShoulder, 0.9, 0.45)
            .at(L::RightShoulder, 0.8, 0.45)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&rounded), ExerciseKind::Deadlifts, Stage::Down);
        assert_eq!(verdict.message, "Wrong: Keep Back Straight");
    }

    #[test]
    fn test_degenerate_check_is_undetected() {
        let collapsed = PoseBuilder::standing()
            .at(L::LeftShoulder, 0.5, 0.6)
            .at(L::RightShoulder, 0.5, 0.6)
            .at(L::LeftHip, 0.5, 0.6)
            .at(L::RightHip, 0.5, 0.6)
            .build()
            .unwrap();
        let verdict = evaluate(Some(&collapsed), ExerciseKind::Deadlifts, Stage::Down);
        assert_eq!(verdict, FormQuality::undetected());
    }
}

//! Yoga feature extraction
//!
//! The classifier was trained on eight joint angles computed from fixed
//! landmark triples. The triples below must stay exactly as they are, even
//! where the joint names look mirrored, or saved models and references stop
//! matching.

use crate::error::Result;
use crate::types::{BodyLandmark as L, LandmarkSet};
use log::debug;

/// Mean visibility over the key joints required for extraction
pub const DEFAULT_YOGA_VISIBILITY: f64 = 0.5;

/// Shoulders, elbows, wrists, hips and knees
pub const YOGA_KEY_JOINTS: [L; 10] = [
    L::LeftShoulder,
    L::RightShoulder,
    L::LeftElbow,
    L::RightElbow,
    L::LeftWrist,
    L::RightWrist,
    L::LeftHip,
    L::RightHip,
    L::LeftKnee,
    L::RightKnee,
];

/// Body part named by each position of the angle vector
pub const ANGLE_PARTS: [&str; 8] = [
    "right shoulder",
    "left shoulder",
    "right elbow",
    "left elbow",
    "right hip",
    "left hip",
    "right knee",
    "left knee",
];

/// Length of every angle vector the classifier and references use
pub const ANGLE_COUNT: usize = ANGLE_PARTS.len();

/// Landmark triples in feature order; the angle is measured at the middle joint
const ANGLE_TRIPLES: [(L, L, L); 8] = [
    (L::RightShoulder, L::LeftShoulder, L::LeftElbow),
    (L::LeftShoulder, L::RightShoulder, L::RightElbow),
    (L::LeftShoulder, L::LeftElbow, L::LeftWrist),
    (L::RightShoulder, L::RightElbow, L::RightWrist),
    (L::LeftHip, L::RightHip, L::RightShoulder),
    (L::RightHip, L::LeftHip, L::LeftShoulder),
    (L::RightHip, L::RightKnee, L::RightAnkle),
    (L::LeftHip, L::LeftKnee, L::LeftAnkle),
];

/// Human-readable name for an angle index
pub fn body_part(index: usize) -> String {
    ANGLE_PARTS
        .get(index)
        .map(|part| part.to_string())
        .unwrap_or_else(|| format!("angle_{index}"))
}

/// Compute the eight yoga angles.
///
/// Returns an empty vector when the key joints are not visible enough; the
/// caller skips classification for that frame. A degenerate triple is an
/// error.
pub fn extract_angles(landmarks: &LandmarkSet, min_visibility: f64) -> Result<Vec<f64>> {
    let visibility = landmarks.mean_visibility(&YOGA_KEY_JOINTS);
    if visibility < min_visibility {
        debug!("key joint visibility {visibility:.2} too low for yoga angles");
        return Ok(Vec::new());
    }

    ANGLE_TRIPLES
        .iter()
        .map(|(a, b, c)| landmarks.angle(*a, *b, *c))
        .collect()
}

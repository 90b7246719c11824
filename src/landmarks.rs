//! Landmark extraction
//!
//! The body landmark detector itself lives outside this crate. It is plugged in
//! through [`LandmarkProvider`]; this module turns its output into a
//! [`Detection`] and applies the visibility gates the exercises rely on.

use crate::error::{PipelineError, Result};
use crate::types::{BodyLandmark, ExerciseKind, LandmarkSet};
#[cfg(test)]
use crate::types::{Landmark, LANDMARK_COUNT};
use chrono::{DateTime, Utc};
use image::RgbImage;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Visibility required on every full-body point before a plank frame counts
pub const FULL_BODY_VISIBILITY: f64 = 0.5;

/// Points that must be visible to judge a plank
pub const PLANK_REQUIRED: [BodyLandmark; 8] = [
    BodyLandmark::LeftShoulder,
    BodyLandmark::RightShoulder,
    BodyLandmark::LeftHip,
    BodyLandmark::RightHip,
    BodyLandmark::LeftKnee,
    BodyLandmark::RightKnee,
    BodyLandmark::LeftAnkle,
    BodyLandmark::RightAnkle,
];

/// A capability that finds a body skeleton in a frame
pub trait LandmarkProvider {
    /// Returns `None` when no pose is present in the frame
    fn detect(&mut self, frame: &RgbImage) -> Option<LandmarkSet>;

    /// Short name used in logs and diagnostics
    fn name(&self) -> &str {
        "provider"
    }
}

/// Stand-in for an unavailable detector: never finds a pose
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

impl LandmarkProvider for NullProvider {
    fn detect(&mut self, _frame: &RgbImage) -> Option<LandmarkSet> {
        None
    }

    fn name(&self) -> &str {
        "null"
    }
}

/// Replays recorded detections in order, one per frame.
///
/// Once the script runs out every further frame reports no pose.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    script: VecDeque<Option<LandmarkSet>>,
}

impl ScriptedProvider {
    pub fn new<I>(detections: I) -> Self
    where
        I: IntoIterator<Item = Option<LandmarkSet>>,
    {
        Self {
            script: detections.into_iter().collect(),
        }
    }

    /// Queue one more detection result
    pub fn push(&mut self, detection: Option<LandmarkSet>) {
        self.script.push_back(detection);
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl LandmarkProvider for ScriptedProvider {
    fn detect(&mut self, _frame: &RgbImage) -> Option<LandmarkSet> {
        self.script.pop_front().flatten()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// One recorded detector output, as replayed from NDJSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkRecord {
    pub timestamp: DateTime<Utc>,
    /// `null` or missing when no pose was detected
    #[serde(default)]
    pub landmarks: Option<LandmarkSet>,
}

impl LandmarkRecord {
    /// Parse newline-delimited records, skipping blank lines
    pub fn parse_ndjson(input: &str) -> Result<Vec<Self>> {
        input
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line.trim()).map_err(|e| {
                    PipelineError::InvalidLandmarks(format!("line {}: {e}", i + 1))
                })
            })
            .collect()
    }
}

/// Outcome of looking for a body in one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// A usable skeleton
    Pose(LandmarkSet),
    /// The provider found nothing
    NoPose,
    /// A skeleton was found but a required point is hidden
    NotFullyVisible {
        landmarks: LandmarkSet,
        hidden: BodyLandmark,
    },
}

impl Detection {
    /// Landmarks to draw, if any were detected
    pub fn landmarks(&self) -> Option<&LandmarkSet> {
        match self {
            Detection::Pose(set) => Some(set),
            Detection::NotFullyVisible { landmarks, .. } => Some(landmarks),
            Detection::NoPose => None,
        }
    }

    /// Landmarks usable for counting and scoring
    pub fn usable(&self) -> Option<&LandmarkSet> {
        match self {
            Detection::Pose(set) => Some(set),
            _ => None,
        }
    }

    pub fn status(&self) -> DetectionStatus {
        match self {
            Detection::Pose(_) => DetectionStatus::Pose,
            Detection::NoPose => DetectionStatus::NoPose,
            Detection::NotFullyVisible { .. } => DetectionStatus::NotFullyVisible,
        }
    }
}

/// Serializable summary of a [`Detection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    Pose,
    NoPose,
    NotFullyVisible,
    /// A pose was found but its geometry could not be measured
    Degenerate,
}

/// Run the provider on a frame without any visibility gating
pub fn extract(provider: &mut dyn LandmarkProvider, frame: &RgbImage) -> Detection {
    match provider.detect(frame) {
        Some(set) => Detection::Pose(set),
        None => {
            debug!("{}: no pose in frame", provider.name());
            Detection::NoPose
        }
    }
}

/// Require every joint in `required` to be at least `threshold` visible
pub fn gate_visibility(
    detection: Detection,
    required: &[BodyLandmark],
    threshold: f64,
) -> Detection {
    match detection {
        Detection::Pose(set) => match set.first_hidden(required, threshold) {
            Some(hidden) => {
                debug!(
                    "{} below visibility {threshold:.2}, body not fully visible",
                    hidden.as_str()
                );
                Detection::NotFullyVisible {
                    landmarks: set,
                    hidden,
                }
            }
            None => Detection::Pose(set),
        },
        other => other,
    }
}

/// Extract landmarks with the gating an exercise needs
pub fn extract_for(
    kind: ExerciseKind,
    provider: &mut dyn LandmarkProvider,
    frame: &RgbImage,
    full_body_threshold: f64,
) -> Detection {
    gate_for(kind, extract(provider, frame), full_body_threshold)
}

/// Apply the gating `kind` needs to an existing detection
pub fn gate_for(kind: ExerciseKind, detection: Detection, full_body_threshold: f64) -> Detection {
    if kind.is_timed() {
        gate_visibility(detection, &PLANK_REQUIRED, full_body_threshold)
    } else {
        detection
    }
}

impl From<Option<LandmarkSet>> for Detection {
    fn from(landmarks: Option<LandmarkSet>) -> Self {
        match landmarks {
            Some(set) => Detection::Pose(set),
            None => Detection::NoPose,
        }
    }
}

/// Test fixture: builds landmark sets from a neutral standing pose.
///
/// Start from the default skeleton, move the joints that matter and build.
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct PoseBuilder {
    points: Vec<Landmark>,
}

#[cfg(test)]
impl Default for PoseBuilder {
    fn default() -> Self {
        Self::standing()
    }
}

#[cfg(test)]
impl PoseBuilder {
    /// Front-facing standing skeleton, all points fully visible
    pub fn standing() -> Self {
        let coords: [(f64, f64); LANDMARK_COUNT] = [
            (0.50, 0.15),
            (0.51, 0.13),
            (0.52, 0.13),
            (0.53, 0.13),
            (0.49, 0.13),
            (0.48, 0.13),
            (0.47, 0.13),
            (0.55, 0.14),
            (0.45, 0.14),
            (0.52, 0.18),
            (0.48, 0.18),
            (0.60, 0.30),
            (0.40, 0.30),
            (0.62, 0.45),
            (0.38, 0.45),
            (0.63, 0.60),
            (0.37, 0.60),
            (0.64, 0.63),
            (0.36, 0.63),
            (0.635, 0.635),
            (0.365, 0.635),
            (0.62, 0.62),
            (0.38, 0.62),
            (0.56, 0.60),
            (0.44, 0.60),
            (0.56, 0.75),
            (0.44, 0.75),
            (0.56, 0.90),
            (0.44, 0.90),
            (0.555, 0.92),
            (0.445, 0.92),
            (0.58, 0.93),
            (0.42, 0.93),
        ];
        Self {
            points: coords
                .iter()
                .map(|(x, y)| Landmark::new(*x, *y, 1.0))
                .collect(),
        }
    }

    /// Move a joint
    pub fn at(mut self, joint: BodyLandmark, x: f64, y: f64) -> Self {
        let point = &mut self.points[joint.index()];
        point.x = x;
        point.y = y;
        self
    }

    pub fn visibility(mut self, joint: BodyLandmark, visibility: f64) -> Self {
        self.points[joint.index()].visibility = visibility;
        self
    }

    /// Set the same visibility on every point
    pub fn all_visibility(mut self, visibility: f64) -> Self {
        for point in &mut self.points {
            point.visibility = visibility;
        }
        self
    }

    /// Place `c` so that the angle at `b` between `a` and `c` is `degrees`,
    /// keeping the current `b`-`c` length (0.15 if they coincide).
    pub fn bend(mut self, a: BodyLandmark, b: BodyLandmark, c: BodyLandmark, degrees: f64) -> Self {
        let pa = self.points[a.index()].point();
        let pb = self.points[b.index()].point();
        let pc = self.points[c.index()].point();
        let length = match pb.distance(pc) {
            d if d > 1e-6 => d,
            _ => 0.15,
        };
        let heading = (pa.y - pb.y).atan2(pa.x - pb.x) + degrees.to_radians();
        let point = &mut self.points[c.index()];
        point.x = pb.x + length * heading.cos();
        point.y = pb.y + length * heading.sin();
        self
    }

    /// Fails only if a coordinate passed to [`PoseBuilder::at`] was not finite
    pub fn build(self) -> Result<LandmarkSet> {
        LandmarkSet::new(self.points)
    }
}

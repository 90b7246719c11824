//! Yoga pose pipeline
//!
//! landmarks → 8 joint angles → scaler + classifier → comparison against the
//! saved reference for the predicted pose → ranked corrections and feedback.

pub mod angles;
pub mod classifier;
pub mod compare;
pub mod detector;
pub mod reference;

pub use angles::{extract_angles, ANGLE_COUNT, ANGLE_PARTS, YOGA_KEY_JOINTS};
pub use classifier::{
    CentroidClassifier, Classification, ModelArtifact, PoseClassifier, Prediction,
    StandardScaler, UnavailableClassifier,
};
pub use compare::{
    compare_angles, pose_feedback, Correction, Direction, FeedbackLevel, YogaFeedback,
};
pub use detector::{PoseAvailability, SaveOutcome, YogaDetector, YogaFrame};
pub use reference::{ReferencePose, ReferenceStore, REFERENCE_FORMAT_VERSION};

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Poses the classifier is trained on, in class-index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YogaPose {
    Downdog,
    Goddess,
    Plank,
    Tree,
    Warrior2,
}

impl YogaPose {
    pub const ALL: [YogaPose; 5] = [
        YogaPose::Downdog,
        YogaPose::Goddess,
        YogaPose::Plank,
        YogaPose::Tree,
        YogaPose::Warrior2,
    ];

    /// Map a classifier output index; anything out of range is unknown
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            YogaPose::Downdog => "downdog",
            YogaPose::Goddess => "goddess",
            YogaPose::Plank => "plank",
            YogaPose::Tree => "tree",
            YogaPose::Warrior2 => "warrior2",
        }
    }

    /// Capitalized name for on-screen captions
    pub fn title(&self) -> &'static str {
        match self {
            YogaPose::Downdog => "Downdog",
            YogaPose::Goddess => "Goddess",
            YogaPose::Plank => "Plank",
            YogaPose::Tree => "Tree",
            YogaPose::Warrior2 => "Warrior2",
        }
    }
}

impl fmt::Display for YogaPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for YogaPose {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| PipelineError::UnknownPose(s.to_string()))
    }
}

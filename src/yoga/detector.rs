//! Yoga pose detector
//!
//! Holds the classifier, a handle on the shared reference store and the most
//! recent detection, which is what a reference save captures.

use super::classifier::{classify, Classification, PoseClassifier, StandardScaler};
use super::compare::{compare_angles, pose_feedback, YogaFeedback};
use super::reference::ReferenceStore;
use super::{angles, YogaPose};
use crate::config::CoachConfig;
use crate::landmarks::DetectionStatus;
use crate::types::LandmarkSet;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Classifier confidence (percent) above which a frame is compared
pub const DEFAULT_COMPARE_CONFIDENCE: f64 = 30.0;

/// Classifier confidence (percent) required to save a reference
pub const DEFAULT_SAVE_CONFIDENCE: f64 = 70.0;

/// Detection result for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YogaFrame {
    pub status: DetectionStatus,
    pub pose: Option<YogaPose>,
    pub confidence: f64,
    pub angles: Vec<f64>,
    /// Present when a reference was available for comparison
    pub feedback: Option<YogaFeedback>,
    /// Instructional message when detection or comparison was not possible
    pub message: Option<String>,
    /// Wall time spent classifying and comparing this frame
    #[serde(default)]
    pub processing_ms: f64,
}

impl YogaFrame {
    fn empty(status: DetectionStatus, message: &str) -> Self {
        Self {
            status,
            pose: None,
            confidence: 0.0,
            angles: Vec::new(),
            feedback: None,
            message: Some(message.to_string()),
            processing_ms: 0.0,
        }
    }
}

/// Result of trying to save the current pose as a reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub saved: bool,
    pub message: String,
}

impl SaveOutcome {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            saved: false,
            message: message.into(),
        }
    }
}

/// Whether a reference exists for a pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseAvailability {
    pub pose: YogaPose,
    pub has_reference: bool,
}

/// Last successfully classified frame
#[derive(Debug, Clone, Default)]
struct CurrentPose {
    classification: Option<Classification>,
    angles: Vec<f64>,
}

pub struct YogaDetector {
    scaler: Option<StandardScaler>,
    classifier: Box<dyn PoseClassifier + Send>,
    references: Arc<ReferenceStore>,
    min_visibility: f64,
    compare_confidence: f64,
    save_confidence: f64,
    current: CurrentPose,
}

impl YogaDetector {
    pub fn new(
        scaler: Option<StandardScaler>,
        classifier: Box<dyn PoseClassifier + Send>,
        references: Arc<ReferenceStore>,
        config: &CoachConfig,
    ) -> Self {
        Self {
            scaler,
            classifier,
            references,
            min_visibility: config.visibility.yoga,
            compare_confidence: config.yoga.compare_confidence,
            save_confidence: config.yoga.save_confidence,
            current: CurrentPose::default(),
        }
    }

    pub fn references(&self) -> &Arc<ReferenceStore> {
        &self.references
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    /// Classify one frame and compare it with the saved reference
    pub fn process(&mut self, landmarks: Option<&LandmarkSet>) -> YogaFrame {
        let started = Instant::now();
        let mut frame = self.detect(landmarks);
        frame.processing_ms = started.elapsed().as_secs_f64() * 1000.0;
        frame
    }

    fn detect(&mut self, landmarks: Option<&LandmarkSet>) -> YogaFrame {
        self.current = CurrentPose::default();

        let Some(landmarks) = landmarks else {
            return YogaFrame::empty(DetectionStatus::NoPose, "No body detected");
        };

        let angles = match angles::extract_angles(landmarks, self.min_visibility) {
            Ok(angles) => angles,
            Err(e) => {
                debug!("yoga frame skipped: {e}");
                return YogaFrame::empty(
                    DetectionStatus::Degenerate,
                    "Move your full body into frame",
                );
            }
        };
        if angles.len() != angles::ANGLE_PARTS.len() {
            return YogaFrame::empty(
                DetectionStatus::NotFullyVisible,
                "Move your full body into frame",
            );
        }

        let classification = classify(self.scaler.as_ref(), self.classifier.as_ref(), &angles);
        self.current = CurrentPose {
            classification: Some(classification),
            angles: angles.clone(),
        };

        let mut frame = YogaFrame {
            status: DetectionStatus::Pose,
            pose: classification.pose,
            confidence: classification.confidence,
            angles,
            feedback: None,
            message: None,
            processing_ms: 0.0,
        };

        if let Some(pose) = classification.pose {
            if classification.confidence > self.compare_confidence {
                match self.references.get(pose) {
                    Some(reference) if reference.len() == angles::ANGLE_COUNT => {
                        let (corrections, score) =
                            compare_angles(&frame.angles, &reference, Some(pose));
                        frame.feedback = Some(pose_feedback(pose, corrections, score));
                    }
                    _ => frame.message = Some("Reference pose not available".to_string()),
                }
            }
        }

        frame
    }

    /// Save the most recent detection as the reference for its pose
    pub fn save_current_as_reference(&self, now: DateTime<Utc>) -> SaveOutcome {
        let Some(classification) = self.current.classification else {
            return SaveOutcome::rejected("No valid pose detected to save as reference");
        };
        let Some(pose) = classification.pose else {
            return SaveOutcome::rejected("No valid pose detected to save as reference");
        };
        if classification.confidence < self.save_confidence {
            return SaveOutcome::rejected("Confidence too low to save as reference");
        }
        if self.current.angles.is_empty() {
            return SaveOutcome::rejected("No angles detected to save as reference");
        }

        match self.references.save(pose, self.current.angles.clone(), now) {
            Ok(()) => SaveOutcome {
                saved: true,
                message: format!("Successfully saved reference for {pose}"),
            },
            Err(e) => {
                warn!("failed to save reference for {pose}: {e}");
                SaveOutcome::rejected(format!("Failed to save reference for {pose}"))
            }
        }
    }

    /// Every supported pose and whether it has a reference
    pub fn available_poses(&self) -> Vec<PoseAvailability> {
        YogaPose::ALL
            .iter()
            .map(|pose| PoseAvailability {
                pose: *pose,
                has_reference: self.references.has(*pose),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::landmarks::PoseBuilder;
    use crate::types::BodyLandmark as L;
    use crate::yoga::classifier::{Prediction, UnavailableClassifier};
    use chrono::TimeZone;

    struct Fixed {
        class_index: usize,
        probability: f64,
    }

    impl PoseClassifier for Fixed {
        fn predict(&self, _features: &[f64]) -> Result<Prediction> {
            let mut probabilities = vec![0.0; 5];
            if let Some(p) = probabilities.get_mut(self.class_index) {
                *p = self.probability;
            }
            Ok(Prediction {
                class_index: self.class_index,
                probabilities: Some(probabilities),
            })
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn detector(pose: YogaPose, probability: f64) -> YogaDetector {
        YogaDetector::new(
            None,
            Box::new(Fixed {
                class_index: pose.index(),
                probability,
            }),
            Arc::new(ReferenceStore::in_memory()),
            &CoachConfig::default(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 9, 30, 0).unwrap()
    }

    fn pose() -> LandmarkSet {
        PoseBuilder::standing().build().unwrap()
    }

    #[test]
    fn test_no_body() {
        let mut detector = detector(YogaPose::Tree, 0.9);
        let frame = detector.process(None);
        assert_eq!(frame.status, DetectionStatus::NoPose);
        assert_eq!(frame.message.as_deref(), Some("No body detected"));
        assert_eq!(
            detector.save_current_as_reference(now()).message,
            "No valid pose detected to save as reference"
        );
    }

    struct Slow;

    impl PoseClassifier for Slow {
        fn predict(&self, _features: &[f64]) -> Result<Prediction> {
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(Prediction {
                class_index: YogaPose::Tree.index(),
                probabilities: None,
            })
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[test]
    fn test_processing_time_reported() {
        let mut detector = YogaDetector::new(
            None,
            Box::new(Slow),
            Arc::new(ReferenceStore::in_memory()),
            &CoachConfig::default(),
        );
        let frame = detector.process(Some(&pose()));
        assert_eq!(frame.status, DetectionStatus::Pose);
        assert!(frame.processing_ms >= 5.0);

        let frame = detector.process(None);
        assert!(frame.processing_ms >= 0.0);

        let json = serde_json::to_value(&frame).unwrap();
        assert!(json["processing_ms"].is_number());
    }

    #[test]
    fn test_low_visibility_skips_classification() {
        let mut detector = detector(YogaPose::Tree, 0.9);
        let faint = PoseBuilder::standing().all_visibility(0.3).build().unwrap();
        let frame = detector.process(Some(&faint));
        assert_eq!(frame.status, DetectionStatus::NotFullyVisible);
        assert!(frame.pose.is_none());
        assert!(frame.angles.is_empty());
    }

    #[test]
    fn test_missing_reference_message() {
        let mut detector = detector(YogaPose::Tree, 0.9);
        let frame = detector.process(Some(&pose()));
        assert_eq!(frame.pose, Some(YogaPose::Tree));
        assert!((frame.confidence - 90.0).abs() < 1e-9);
        assert!(frame.feedback.is_none());
        assert_eq!(frame.message.as_deref(), Some("Reference pose not available"));
    }

    #[test]
    fn test_save_then_compare() {
        let mut detector = detector(YogaPose::Warrior2, 0.85);
        detector.process(Some(&pose()));

        let outcome = detector.save_current_as_reference(now());
        assert_eq!(
            outcome,
            SaveOutcome {
                saved: true,
                message: "Successfully saved reference for warrior2".to_string()
            }
        );

        let frame = detector.process(Some(&pose()));
        let feedback = frame.feedback.unwrap();
        assert_eq!(feedback.score, 100.0);
        assert!(feedback.detailed_corrections.is_empty());

        let bent = PoseBuilder::standing()
            .bend(L::LeftHip, L::LeftKnee, L::LeftAnkle, 120.0)
            .build()
            .unwrap();
        let feedback = detector.process(Some(&bent)).feedback.unwrap();
        assert_eq!(
            feedback.detailed_corrections,
            vec!["Extend your left knee more (important!)"]
        );
        assert!(feedback.score < 100.0);

        let available = detector.available_poses();
        assert_eq!(available.len(), 5);
        assert!(available
            .iter()
            .all(|a| a.has_reference == (a.pose == YogaPose::Warrior2)));
    }

    #[test]
    fn test_low_confidence_cannot_save() {
        let mut detector = detector(YogaPose::Goddess, 0.6);
        detector.process(Some(&pose()));
        let outcome = detector.save_current_as_reference(now());
        assert!(!outcome.saved);
        assert_eq!(outcome.message, "Confidence too low to save as reference");
    }

    #[test]
    fn test_low_confidence_skips_comparison() {
        let mut detector = detector(YogaPose::Goddess, 0.25);
        detector
            .references()
            .save(YogaPose::Goddess, vec![90.0; 8], now())
            .unwrap();
        let frame = detector.process(Some(&pose()));
        assert!(frame.feedback.is_none());
        assert!(frame.message.is_none());
    }

    #[test]
    fn test_unavailable_classifier_degrades() {
        let mut detector = YogaDetector::new(
            None,
            Box::new(UnavailableClassifier),
            Arc::new(ReferenceStore::in_memory()),
            &CoachConfig::default(),
        );
        let frame = detector.process(Some(&pose()));
        assert_eq!(frame.status, DetectionStatus::Pose);
        assert!(frame.pose.is_none());
        assert_eq!(frame.confidence, 0.0);
        assert_eq!(frame.angles.len(), 8);
    }
}

//! Pose classification
//!
//! The trained classifier is an external artifact. It is consumed through the
//! [`PoseClassifier`] contract: scaled feature vector in, class index and
//! optional class probabilities out. [`CentroidClassifier`] is a runnable
//! model format that can be exported from any trained model as per-class mean
//! feature vectors.

use super::YogaPose;
use crate::error::{PipelineError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current model artifact format
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Feature standardization: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Scaler that leaves features unchanged
    pub fn identity(len: usize) -> Self {
        Self {
            mean: vec![0.0; len],
            scale: vec![1.0; len],
        }
    }

    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.mean.len() || features.len() != self.scale.len() {
            return Err(PipelineError::Classifier(format!(
                "scaler expects {} features, got {}",
                self.mean.len(),
                features.len()
            )));
        }
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (mean, scale))| {
                // zero variance features pass through centered
                if *scale == 0.0 {
                    x - mean
                } else {
                    (x - mean) / scale
                }
            })
            .collect())
    }
}

/// Raw classifier output
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    /// Per-class probabilities, when the model provides them
    pub probabilities: Option<Vec<f64>>,
}

/// External classifier capability
pub trait PoseClassifier {
    /// Predict a class for a scaled feature vector
    fn predict(&self, features: &[f64]) -> Result<Prediction>;

    /// Short name used in logs and diagnostics
    fn name(&self) -> &str;
}

/// Stand-in used when no trained model is available: every prediction fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableClassifier;

impl PoseClassifier for UnavailableClassifier {
    fn predict(&self, _features: &[f64]) -> Result<Prediction> {
        Err(PipelineError::ClassifierUnavailable)
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Nearest-centroid classifier.
///
/// Probabilities are a softmax over negative Euclidean distances to each class
/// centroid, sharpened by `temperature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidClassifier {
    /// One centroid per class, in class-index order
    pub centroids: Vec<Vec<f64>>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_temperature() -> f64 {
    1.0
}

impl CentroidClassifier {
    pub fn new(centroids: Vec<Vec<f64>>) -> Self {
        Self {
            centroids,
            temperature: default_temperature(),
        }
    }
}

impl PoseClassifier for CentroidClassifier {
    fn predict(&self, features: &[f64]) -> Result<Prediction> {
        if self.centroids.is_empty() {
            return Err(PipelineError::Classifier("model has no classes".to_string()));
        }

        let mut distances = Vec::with_capacity(self.centroids.len());
        for centroid in &self.centroids {
            if centroid.len() != features.len() {
                return Err(PipelineError::Classifier(format!(
                    "centroid has {} features, input has {}",
                    centroid.len(),
                    features.len()
                )));
            }
            let d = centroid
                .iter()
                .zip(features)
                .map(|(c, x)| (c - x).powi(2))
                .sum::<f64>()
                .sqrt();
            distances.push(d);
        }

        let mut class_index = 0;
        for (i, d) in distances.iter().enumerate() {
            if *d < distances[class_index] {
                class_index = i;
            }
        }

        let temperature = if self.temperature > 0.0 {
            self.temperature
        } else {
            1.0
        };
        // shift by the best distance so the largest exponent is zero
        let best = distances[class_index];
        let weights: Vec<f64> = distances
            .iter()
            .map(|d| (-(d - best) / temperature).exp())
            .collect();
        let total: f64 = weights.iter().sum();
        let probabilities = weights.iter().map(|w| w / total).collect();

        Ok(Prediction {
            class_index,
            probabilities: Some(probabilities),
        })
    }

    fn name(&self) -> &str {
        "centroid"
    }
}

/// On-disk model: the scaler plus a nearest-centroid classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub scaler: StandardScaler,
    pub classifier: CentroidClassifier,
}

impl ModelArtifact {
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)?;
        if artifact.format_version != MODEL_FORMAT_VERSION {
            return Err(PipelineError::Classifier(format!(
                "unsupported model format version {}",
                artifact.format_version
            )));
        }
        Ok(artifact)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Pose label and confidence for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// `None` when the pose is unknown
    pub pose: Option<YogaPose>,
    /// 0-100
    pub confidence: f64,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            pose: None,
            confidence: 0.0,
        }
    }
}

/// Scale the angle vector and run the classifier.
///
/// Classifier failures degrade to an unknown pose. Confidence is the top class
/// probability as a percentage, or 0 when the model gives no probabilities.
pub fn classify(
    scaler: Option<&StandardScaler>,
    classifier: &dyn PoseClassifier,
    angles: &[f64],
) -> Classification {
    let features = match scaler {
        Some(scaler) => match scaler.transform(angles) {
            Ok(features) => features,
            Err(e) => {
                warn!("scaling failed: {e}");
                return Classification::unknown();
            }
        },
        None => angles.to_vec(),
    };

    let prediction = match classifier.predict(&features) {
        Ok(prediction) => prediction,
        Err(e) => {
            debug!("{} classifier gave no prediction: {e}", classifier.name());
            return Classification::unknown();
        }
    };

    let confidence = prediction
        .probabilities
        .as_ref()
        .and_then(|p| p.iter().copied().reduce(f64::max))
        .map(|p| p * 100.0)
        .unwrap_or(0.0);

    Classification {
        pose: YogaPose::from_index(prediction.class_index),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClassifier(Prediction);

    impl PoseClassifier for FixedClassifier {
        fn predict(&self, _features: &[f64]) -> Result<Prediction> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn centroids() -> CentroidClassifier {
        CentroidClassifier::new(vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![0.0, 10.0],
        ])
    }

    #[test]
    fn test_scaler_transform() {
        let scaler = StandardScaler {
            mean: vec![90.0, 180.0],
            scale: vec![10.0, 0.0],
        };
        assert_eq!(scaler.transform(&[100.0, 170.0]).unwrap(), vec![1.0, -10.0]);
        assert!(scaler.transform(&[1.0]).is_err());
    }

    #[test]
    fn test_nearest_centroid_wins() {
        let prediction = centroids().predict(&[9.0, 1.0]).unwrap();
        assert_eq!(prediction.class_index, 1);

        let probabilities = prediction.probabilities.unwrap();
        assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probabilities[1] > probabilities[0]);
        assert!(probabilities[1] > probabilities[2]);
    }

    #[test]
    fn test_centroid_dimension_mismatch() {
        assert!(centroids().predict(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_confidence_from_probabilities() {
        let classifier = FixedClassifier(Prediction {
            class_index: 3,
            probabilities: Some(vec![0.05, 0.05, 0.1, 0.8, 0.0]),
        });
        let result = classify(None, &classifier, &[0.0; 8]);
        assert_eq!(result.pose, Some(YogaPose::Tree));
        assert!((result.confidence - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_probabilities_give_zero_confidence() {
        let classifier = FixedClassifier(Prediction {
            class_index: 0,
            probabilities: None,
        });
        let result = classify(None, &classifier, &[0.0; 8]);
        assert_eq!(result.pose, Some(YogaPose::Downdog));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_out_of_range_index_is_unknown() {
        let classifier = FixedClassifier(Prediction {
            class_index: 9,
            probabilities: Some(vec![1.0]),
        });
        assert_eq!(classify(None, &classifier, &[0.0; 8]).pose, None);
    }

    #[test]
    fn test_unavailable_classifier_is_unknown() {
        let result = classify(None, &UnavailableClassifier, &[0.0; 8]);
        assert_eq!(result, Classification::unknown());
    }

    #[test]
    fn test_artifact_version_check() {
        let artifact = ModelArtifact {
            format_version: MODEL_FORMAT_VERSION,
            scaler: StandardScaler::identity(2),
            classifier: centroids(),
        };
        let json = artifact.to_json().unwrap();
        assert_eq!(ModelArtifact::from_json(&json).unwrap(), artifact);

        let future = json.replace("\"format_version\": 1", "\"format_version\": 7");
        assert!(ModelArtifact::from_json(&future).is_err());
    }
}

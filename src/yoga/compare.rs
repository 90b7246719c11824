//! Reference comparison and correction feedback

use super::angles::body_part;
use super::YogaPose;
use serde::{Deserialize, Serialize};

/// Threshold used when no pose-specific threshold applies (degrees)
pub const DEFAULT_THRESHOLD: f64 = 15.0;

/// Weight of a critical angle in the score
pub const CRITICAL_WEIGHT: f64 = 2.0;

/// Largest difference an angle can contribute
const MAX_DIFFERENCE: f64 = 180.0;

/// Number of corrections turned into instructions
pub const MAX_INSTRUCTIONS: usize = 3;

/// Difference above which an angle needs correcting (degrees)
pub fn threshold(pose: Option<YogaPose>) -> f64 {
    match pose {
        Some(YogaPose::Downdog) => 15.0,
        Some(YogaPose::Goddess) => 15.0,
        Some(YogaPose::Plank) => 10.0,
        Some(YogaPose::Tree) => 12.0,
        Some(YogaPose::Warrior2) => 15.0,
        None => DEFAULT_THRESHOLD,
    }
}

/// Angle indices that matter most for each pose
pub fn critical_indices(pose: Option<YogaPose>) -> &'static [usize] {
    match pose {
        // shoulders, elbows, hips
        Some(YogaPose::Downdog) => &[0, 1, 2, 3, 4, 5],
        // elbows, hips
        Some(YogaPose::Goddess) => &[2, 3, 4, 5],
        // shoulders, elbows
        Some(YogaPose::Plank) => &[0, 1, 2, 3],
        // elbows, hips, knees
        Some(YogaPose::Tree) | Some(YogaPose::Warrior2) => &[2, 3, 4, 5, 6, 7],
        None => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Increase,
    Decrease,
}

/// An angle outside tolerance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub body_part: String,
    pub difference: f64,
    pub direction: Direction,
    pub is_critical: bool,
}

impl Correction {
    /// On-screen instruction for this correction
    pub fn instruction(&self) -> String {
        let mut text = match self.direction {
            Direction::Increase => format!("Extend your {} more", self.body_part),
            Direction::Decrease => format!("Reduce the angle of your {}", self.body_part),
        };
        if self.is_critical {
            text.push_str(" (important!)");
        }
        text
    }
}

/// Compare the user's angles with a reference.
///
/// Returns the corrections, critical first and then by difference descending,
/// and a score in `[0, 100]`. Empty or mismatched vectors give `([], 0)`.
pub fn compare_angles(
    user: &[f64],
    reference: &[f64],
    pose: Option<YogaPose>,
) -> (Vec<Correction>, f64) {
    if user.is_empty() || reference.is_empty() || user.len() != reference.len() {
        return (Vec::new(), 0.0);
    }

    let critical = critical_indices(pose);
    let limit = threshold(pose);

    let mut corrections = Vec::new();
    let mut total_error = 0.0;
    let mut max_error = 0.0;

    for (i, (u, r)) in user.iter().zip(reference).enumerate() {
        let difference = (u - r).abs();
        let is_critical = critical.contains(&i);
        let weight = if is_critical { CRITICAL_WEIGHT } else { 1.0 };

        max_error += MAX_DIFFERENCE * weight;
        total_error += difference.min(MAX_DIFFERENCE) * weight;

        if difference > limit {
            corrections.push(Correction {
                body_part: body_part(i),
                difference,
                direction: if u < r {
                    Direction::Increase
                } else {
                    Direction::Decrease
                },
                is_critical,
            });
        }
    }

    corrections.sort_by(|a, b| {
        b.is_critical
            .cmp(&a.is_critical)
            .then(b.difference.total_cmp(&a.difference))
    });

    let score = 100.0 - total_error / max_error * 100.0;
    (corrections, score.clamp(0.0, 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    Excellent,
    Good,
    Moderate,
    NeedsImprovement,
}

impl FeedbackLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            FeedbackLevel::Excellent
        } else if score >= 75.0 {
            FeedbackLevel::Good
        } else if score >= 60.0 {
            FeedbackLevel::Moderate
        } else {
            FeedbackLevel::NeedsImprovement
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            FeedbackLevel::Excellent => "Your pose is excellent! Keep it up!",
            FeedbackLevel::Good => "Good job! A few minor adjustments needed.",
            FeedbackLevel::Moderate => "Getting there! Focus on the suggested corrections.",
            FeedbackLevel::NeedsImprovement => {
                "Keep practicing! Focus on the key elements of the pose."
            }
        }
    }
}

/// Structured yoga feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YogaFeedback {
    pub pose_name: YogaPose,
    pub score: f64,
    pub level: FeedbackLevel,
    pub summary: String,
    /// Instructions for the top corrections
    pub detailed_corrections: Vec<String>,
    /// All corrections, ranked
    pub corrections: Vec<Correction>,
}

pub fn pose_feedback(pose: YogaPose, corrections: Vec<Correction>, score: f64) -> YogaFeedback {
    let level = FeedbackLevel::from_score(score);
    YogaFeedback {
        pose_name: pose,
        score,
        level,
        summary: level.summary().to_string(),
        detailed_corrections: corrections
            .iter()
            .take(MAX_INSTRUCTIONS)
            .map(Correction::instruction)
            .collect(),
        corrections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REFERENCE: [f64; 8] = [90.0, 90.0, 170.0, 170.0, 100.0, 100.0, 175.0, 175.0];

    #[test]
    fn test_identical_vectors_score_100() {
        let (corrections, score) = compare_angles(&REFERENCE, &REFERENCE, Some(YogaPose::Tree));
        assert!(corrections.is_empty());
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        // index 0 is not critical for tree
        let mut user = REFERENCE;
        user[0] += 12.0;
        let (corrections, _) = compare_angles(&user, &REFERENCE, Some(YogaPose::Tree));
        assert!(corrections.is_empty());

        user[0] += 0.5;
        let (corrections, _) = compare_angles(&user, &REFERENCE, Some(YogaPose::Tree));
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].direction, Direction::Decrease);
        assert!(!corrections[0].is_critical);
    }

    #[test]
    fn test_worst_single_critical_angle() {
        // plank: 4 critical (weight 2) + 4 normal, max error = 180 * 12
        let reference = [0.0; 8];
        let mut user = [0.0; 8];
        user[0] = 180.0;
        let (corrections, score) = compare_angles(&user, &reference, Some(YogaPose::Plank));
        let expected = 100.0 - (180.0 * 2.0) / (180.0 * 12.0) * 100.0;
        assert!((score - expected).abs() < 1e-9);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].direction, Direction::Decrease);
        assert!(corrections[0].is_critical);

        // same gap the other way round: the user needs to open the angle
        let (corrections, flipped) = compare_angles(&reference, &user, Some(YogaPose::Plank));
        assert!((flipped - expected).abs() < 1e-9);
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].direction, Direction::Increase);
        assert!(corrections[0].is_critical);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert_eq!(compare_angles(&[1.0, 2.0], &REFERENCE, None), (vec![], 0.0));
        assert_eq!(compare_angles(&[], &[], None), (vec![], 0.0));
    }

    #[test]
    fn test_ranking_critical_first() {
        let mut user = REFERENCE;
        user[0] -= 60.0; // right shoulder, not critical for warrior2
        user[4] -= 20.0; // right hip, critical
        user[6] -= 40.0; // right knee, critical
        let (corrections, _) = compare_angles(&user, &REFERENCE, Some(YogaPose::Warrior2));
        let parts: Vec<_> = corrections.iter().map(|c| c.body_part.as_str()).collect();
        assert_eq!(parts, vec!["right knee", "right hip", "right shoulder"]);
    }

    #[test]
    fn test_feedback_levels() {
        assert_eq!(FeedbackLevel::from_score(90.0), FeedbackLevel::Excellent);
        assert_eq!(FeedbackLevel::from_score(89.9), FeedbackLevel::Good);
        assert_eq!(FeedbackLevel::from_score(60.0), FeedbackLevel::Moderate);
        assert_eq!(FeedbackLevel::from_score(10.0), FeedbackLevel::NeedsImprovement);
    }

    #[test]
    fn test_feedback_instructions() {
        let mut user = REFERENCE;
        user[2] -= 30.0;
        user[3] += 25.0;
        user[6] -= 20.0;
        user[7] -= 16.0;
        let (corrections, score) = compare_angles(&user, &REFERENCE, Some(YogaPose::Goddess));
        let feedback = pose_feedback(YogaPose::Goddess, corrections, score);

        assert_eq!(feedback.corrections.len(), 4);
        assert_eq!(
            feedback.detailed_corrections,
            vec![
                "Extend your right elbow more (important!)",
                "Reduce the angle of your left elbow (important!)",
                "Extend your right knee more",
            ]
        );
        assert_eq!(feedback.level, FeedbackLevel::Excellent);
    }
}

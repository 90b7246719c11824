//! End-of-workout summary
//!
//! Produces the record handed to the persistence layer when a workout ends,
//! with a MET-based calorie estimate.

use crate::types::{ExerciseKind, ExerciseState};
use serde::{Deserialize, Serialize};

/// Body weight assumed when the user has none on file (kg)
pub const DEFAULT_WEIGHT_KG: f64 = 70.0;

/// Metabolic equivalents
pub const PLANK_MET: f64 = 3.5;
pub const EXERCISE_MET: f64 = 5.0;

/// Duration credited to each repetition when no timer ran (seconds)
pub const SECS_PER_REP: f64 = 3.0;

/// Duration used when neither reps nor a hold were recorded (0.01 h)
pub const MIN_DURATION_SECS: f64 = 36.0;

/// Workout record for the external store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub exercise_type: ExerciseKind,
    pub reps_completed: u32,
    /// Seconds
    pub duration: f64,
    pub calories_burned: f64,
}

impl WorkoutSummary {
    /// Summarize a session's final state. `weight_kg` falls back to
    /// [`DEFAULT_WEIGHT_KG`] when missing or not positive.
    pub fn from_state(kind: ExerciseKind, state: &ExerciseState, weight_kg: Option<f64>) -> Self {
        let duration = duration_secs(kind, state);
        let weight = weight_kg
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(DEFAULT_WEIGHT_KG);

        Self {
            exercise_type: kind,
            reps_completed: state.counter,
            duration,
            calories_burned: met(kind) * weight * duration / 3600.0,
        }
    }

    pub fn performance_score(&self) -> f64 {
        performance_score(self.reps_completed)
    }
}

pub fn met(kind: ExerciseKind) -> f64 {
    if kind.is_timed() {
        PLANK_MET
    } else {
        EXERCISE_MET
    }
}

/// Plank: the best hold. Otherwise three seconds per rep, or the minimum.
pub fn duration_secs(kind: ExerciseKind, state: &ExerciseState) -> f64 {
    if kind.is_timed() && state.plank.best_duration > 0.0 {
        state.plank.best_duration
    } else if state.counter > 0 {
        state.counter as f64 * SECS_PER_REP
    } else {
        MIN_DURATION_SECS
    }
}

/// 3.5 points per rep, capped at 100
pub fn performance_score(reps: u32) -> f64 {
    (reps as f64 * 3.5).min(100.0)
}

pub fn exercise_tips(kind: ExerciseKind) -> [&'static str; 3] {
    match kind {
        ExerciseKind::Squats => [
            "Keep your back straight throughout the movement",
            "Make sure knees track over toes, not inward",
            "Try to reach parallel depth on each rep",
        ],
        ExerciseKind::PushUps => [
            "Maintain a straight line from head to heels",
            "Keep elbows at a 45-degree angle to your body",
            "Lower your chest all the way to the ground",
        ],
        ExerciseKind::Plank => [
            "Keep your hips level with your shoulders",
            "Engage your glutes and core throughout",
            "Focus on quality rather than duration",
        ],
        _ => [
            "Focus on maintaining proper form",
            "Take breaks when needed to maintain quality",
            "Stay consistent with your workouts",
        ],
    }
}

/// Everything shown when a workout ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutReport {
    pub summary: WorkoutSummary,
    pub performance_score: f64,
    pub tips: Vec<String>,
}

impl WorkoutReport {
    pub fn new(summary: WorkoutSummary) -> Self {
        Self {
            performance_score: summary.performance_score(),
            tips: exercise_tips(summary.exercise_type)
                .iter()
                .map(|t| t.to_string())
                .collect(),
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(kind: ExerciseKind, counter: u32, best: f64) -> ExerciseState {
        let mut state = ExerciseState::new(kind);
        state.counter = counter;
        state.plank.best_duration = best;
        state
    }

    #[test]
    fn test_rep_calories() {
        let squats = state(ExerciseKind::Squats, 20, 0.0);
        let summary = WorkoutSummary::from_state(ExerciseKind::Squats, &squats, None);
        assert_eq!(summary.duration, 60.0);
        // 5.0 MET * 70 kg * 60 s
        assert!((summary.calories_burned - 5.0 * 70.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_plank_calories_use_best_hold() {
        let plank = state(ExerciseKind::Plank, 0, 90.0);
        let summary = WorkoutSummary::from_state(ExerciseKind::Plank, &plank, Some(80.0));
        assert_eq!(summary.duration, 90.0);
        assert!((summary.calories_burned - 3.5 * 80.0 * 0.025).abs() < 1e-9);
    }

    #[test]
    fn test_empty_workout_uses_minimum_duration() {
        let summary = WorkoutSummary::from_state(
            ExerciseKind::Lunges,
            &ExerciseState::new(ExerciseKind::Lunges),
            Some(-3.0),
        );
        assert_eq!(summary.reps_completed, 0);
        assert_eq!(summary.duration, MIN_DURATION_SECS);
        assert!((summary.calories_burned - 5.0 * 70.0 * 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_performance_score_caps() {
        assert_eq!(performance_score(10), 35.0);
        assert_eq!(performance_score(40), 100.0);
    }

    #[test]
    fn test_tips() {
        assert_eq!(
            exercise_tips(ExerciseKind::Plank)[0],
            "Keep your hips level with your shoulders"
        );
        assert_eq!(
            exercise_tips(ExerciseKind::Deadlifts),
            exercise_tips(ExerciseKind::HammerCurls)
        );

        let report = WorkoutReport::new(WorkoutSummary::from_state(
            ExerciseKind::PushUps,
            &state(ExerciseKind::PushUps, 12, 0.0),
            None,
        ));
        assert_eq!(report.performance_score, 42.0);
        assert_eq!(report.tips.len(), 3);
    }

    #[test]
    fn test_serialized_field_names() {
        let summary = WorkoutSummary::from_state(
            ExerciseKind::BicepCurls,
            &state(ExerciseKind::BicepCurls, 1, 0.0),
            None,
        );
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["exercise_type"], "bicep_curls");
        assert_eq!(json["reps_completed"], 1);
    }
}

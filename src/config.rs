//! Configuration for coaching sessions
//!
//! Rep-counting thresholds are fixed per exercise and live next to each
//! counter. Everything a deployment may reasonably tune is collected here.

use crate::error::{PipelineError, Result};
use crate::exercises::plank::{DEFAULT_GOAL_SECS, DEFAULT_GRACE_SECS};
use crate::exercises::DEFAULT_FEEDBACK_LIMIT;
use crate::form::DEFAULT_FORM_VISIBILITY;
use crate::landmarks::FULL_BODY_VISIBILITY;
use crate::workout::DEFAULT_WEIGHT_KG;
use crate::yoga::angles::DEFAULT_YOGA_VISIBILITY;
use crate::yoga::detector::{DEFAULT_COMPARE_CONFIDENCE, DEFAULT_SAVE_CONFIDENCE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachConfig {
    /// Visibility thresholds
    pub visibility: VisibilityConfig,

    /// Yoga classification and comparison gates
    pub yoga: YogaConfig,

    /// Plank timer settings
    pub plank: PlankConfig,

    /// Maximum feedback lines carried per frame
    pub feedback_limit: usize,

    /// Body weight used for calorie estimates when none is given (kg)
    pub default_weight_kg: f64,

    /// Directory holding saved reference poses
    pub reference_dir: Option<PathBuf>,

    /// Pose classifier model artifact
    pub model_path: Option<PathBuf>,

    /// Blank canvas size used when replaying landmarks without video
    pub canvas: CanvasConfig,
}

/// Visibility thresholds (0.0-1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Every full-body point must reach this for a plank frame to count
    pub full_body: f64,

    /// Mean visibility of the key joints required for form checks
    pub form: f64,

    /// Mean visibility of the key joints required for yoga angles
    pub yoga: f64,
}

/// Yoga gates, as classifier confidence percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YogaConfig {
    /// Compare against the reference only above this confidence
    pub compare_confidence: f64,

    /// Minimum confidence to save the current pose as reference
    pub save_confidence: f64,
}

/// Plank timer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlankConfig {
    /// Time out of position tolerated before the hold ends (seconds)
    pub grace_secs: f64,

    /// Target hold duration (seconds)
    pub goal_secs: f64,
}

/// Canvas dimensions in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            visibility: VisibilityConfig::default(),
            yoga: YogaConfig::default(),
            plank: PlankConfig::default(),
            feedback_limit: DEFAULT_FEEDBACK_LIMIT,
            default_weight_kg: DEFAULT_WEIGHT_KG,
            reference_dir: None,
            model_path: None,
            canvas: CanvasConfig::default(),
        }
    }
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            full_body: FULL_BODY_VISIBILITY,
            form: DEFAULT_FORM_VISIBILITY,
            yoga: DEFAULT_YOGA_VISIBILITY,
        }
    }
}

impl Default for YogaConfig {
    fn default() -> Self {
        Self {
            compare_confidence: DEFAULT_COMPARE_CONFIDENCE,
            save_confidence: DEFAULT_SAVE_CONFIDENCE,
        }
    }
}

impl Default for PlankConfig {
    fn default() -> Self {
        Self {
            grace_secs: DEFAULT_GRACE_SECS,
            goal_secs: DEFAULT_GOAL_SECS,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

impl CoachConfig {
    /// Parse configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("visibility.full_body", self.visibility.full_body),
            ("visibility.form", self.visibility.form),
            ("visibility.yoga", self.visibility.yoga),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PipelineError::Config(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }

        for (name, value) in [
            ("yoga.compare_confidence", self.yoga.compare_confidence),
            ("yoga.save_confidence", self.yoga.save_confidence),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(PipelineError::Config(format!(
                    "{name} must be between 0 and 100"
                )));
            }
        }

        if self.plank.grace_secs < 0.0 {
            return Err(PipelineError::Config(
                "plank.grace_secs must not be negative".to_string(),
            ));
        }
        if self.plank.goal_secs <= 0.0 {
            return Err(PipelineError::Config(
                "plank.goal_secs must be greater than 0".to_string(),
            ));
        }
        if self.feedback_limit == 0 {
            return Err(PipelineError::Config(
                "feedback_limit must be greater than 0".to_string(),
            ));
        }
        if self.default_weight_kg <= 0.0 {
            return Err(PipelineError::Config(
                "default_weight_kg must be greater than 0".to_string(),
            ));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(PipelineError::Config(
                "canvas dimensions must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

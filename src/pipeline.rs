//! Session pipeline
//!
//! One session per camera feed. A session owns its state and is driven one
//! frame at a time:
//!
//! frame → landmark provider → rep counter + form evaluator (or the yoga
//! detector) → annotated frame + [`FrameReport`].
//!
//! Per-frame problems never fail a session: they are reported through
//! [`FrameReport::status`] and leave the session state untouched.

use crate::config::CoachConfig;
use crate::error::{PipelineError, Result};
use crate::exercises::{self, JointAngle};
use crate::form;
use crate::landmarks::{self, Detection, DetectionStatus, LandmarkProvider};
use crate::overlay::{self, AnnotatedFrame};
use crate::types::{ExerciseKind, ExerciseState, FormQuality, LandmarkSet, PlankTimer, Stage};
use crate::workout::WorkoutSummary;
use crate::yoga::{
    ModelArtifact, PoseAvailability, PoseClassifier, ReferenceStore, SaveOutcome,
    StandardScaler, UnavailableClassifier, YogaDetector, YogaFrame,
};
use crate::{POSECOACH_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use image::RgbImage;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Library that produced a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
}

impl Default for Producer {
    fn default() -> Self {
        Self {
            name: PRODUCER_NAME.to_string(),
            version: POSECOACH_VERSION.to_string(),
        }
    }
}

/// Structured result of one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub producer: Producer,
    pub session_id: Uuid,
    pub frame_index: u64,
    pub timestamp: DateTime<Utc>,
    /// `None` for yoga sessions
    pub exercise: Option<ExerciseKind>,
    pub status: DetectionStatus,
    pub counter: u32,
    pub stage: Stage,
    /// Hold timer, plank only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plank: Option<PlankTimer>,
    pub angles: Vec<JointAngle>,
    pub feedback: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yoga: Option<YogaFrame>,
    /// Status line shown when the frame could not be scored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FrameReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Annotated frame and report for one processed frame
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame: AnnotatedFrame,
    pub report: FrameReport,
}

/// Rep-counting session for one exercise
pub struct ExerciseSession {
    id: Uuid,
    kind: ExerciseKind,
    config: CoachConfig,
    state: ExerciseState,
    frame_index: u64,
}

impl ExerciseSession {
    pub fn new(kind: ExerciseKind, config: CoachConfig) -> Self {
        let id = Uuid::new_v4();
        info!("started {kind} session {id}");
        Self {
            id,
            kind,
            config,
            state: ExerciseState::new(kind),
            frame_index: 0,
        }
    }

    /// Parse the exercise name strictly and start a session
    pub fn from_name(name: &str, config: CoachConfig) -> Result<Self> {
        Ok(Self::new(name.parse()?, config))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ExerciseKind {
        self.kind
    }

    pub fn state(&self) -> &ExerciseState {
        &self.state
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_index
    }

    /// Run the provider on `image` and process the result
    pub fn process_frame(
        &mut self,
        image: RgbImage,
        provider: &mut dyn LandmarkProvider,
        now: DateTime<Utc>,
    ) -> FrameResult {
        let detection = landmarks::extract_for(
            self.kind,
            provider,
            &image,
            self.config.visibility.full_body,
        );
        self.process_detection(image, detection, now)
    }

    /// Process landmarks detected elsewhere
    pub fn process_landmarks(
        &mut self,
        image: RgbImage,
        landmarks: Option<LandmarkSet>,
        now: DateTime<Utc>,
    ) -> FrameResult {
        let detection = landmarks::gate_for(
            self.kind,
            Detection::from(landmarks),
            self.config.visibility.full_body,
        );
        self.process_detection(image, detection, now)
    }

    fn process_detection(
        &mut self,
        image: RgbImage,
        detection: Detection,
        now: DateTime<Utc>,
    ) -> FrameResult {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let mut frame = AnnotatedFrame::new(image);
        if let Some(set) = detection.landmarks() {
            overlay::draw_skeleton(&mut frame.image, set, overlay::DRAW_VISIBILITY);
        }

        let mut report = self.blank_report(frame_index, now, detection.status());

        match &detection {
            Detection::NoPose => {
                overlay::no_pose(&mut frame);
                report.form = Some(FormQuality::undetected());
                report.message = frame.captions.last().map(|c| c.text.clone());
            }
            Detection::NotFullyVisible { hidden, .. } => {
                debug!("frame {frame_index}: {} hidden", hidden.as_str());
                overlay::not_fully_visible(&mut frame);
                report.form = Some(FormQuality::out_of_frame());
                report.message = frame.captions.last().map(|c| c.text.clone());
            }
            Detection::Pose(set) => {
                match exercises::process(self.kind, set, &self.state, now, &self.config.plank) {
                    Ok(outcome) => {
                        if outcome.counter > self.state.counter {
                            debug!("{} rep {} counted", self.kind, outcome.counter);
                        }
                        outcome.apply(&mut self.state);

                        let feedback = outcome.top_feedback(self.config.feedback_limit).to_vec();
                        overlay::exercise(
                            &mut frame,
                            self.kind,
                            &outcome,
                            &feedback,
                            self.config.plank.goal_secs,
                        );

                        report.counter = self.state.counter;
                        report.stage = self.state.stage;
                        report.plank = self.plank_timer();
                        report.angles = outcome.angles;
                        report.feedback = feedback;
                        report.form = Some(form::evaluate_with(
                            Some(set),
                            self.kind,
                            self.state.stage,
                            self.config.visibility.form,
                        ));
                    }
                    Err(e) => {
                        debug!("frame {frame_index} skipped: {e}");
                        report.status = DetectionStatus::Degenerate;
                        report.form = Some(FormQuality::undetected());
                    }
                }
            }
        }

        FrameResult { frame, report }
    }

    fn plank_timer(&self) -> Option<PlankTimer> {
        self.kind.is_timed().then(|| self.state.plank.clone())
    }

    fn blank_report(
        &self,
        frame_index: u64,
        now: DateTime<Utc>,
        status: DetectionStatus,
    ) -> FrameReport {
        FrameReport {
            producer: Producer::default(),
            session_id: self.id,
            frame_index,
            timestamp: now,
            exercise: Some(self.kind),
            status,
            counter: self.state.counter,
            stage: self.state.stage,
            plank: self.plank_timer(),
            angles: Vec::new(),
            feedback: Vec::new(),
            form: None,
            yoga: None,
            message: None,
        }
    }

    /// Restore the initial counter, stage and plank timer
    pub fn reset(&mut self) {
        info!("session {} reset after {} reps", self.id, self.state.counter);
        self.state.reset(self.kind);
    }

    /// Summarize the session; `weight_kg` falls back to the configured default
    pub fn summary(&self, weight_kg: Option<f64>) -> WorkoutSummary {
        let weight = weight_kg.or(Some(self.config.default_weight_kg));
        WorkoutSummary::from_state(self.kind, &self.state, weight)
    }

    /// Serialize the exercise state so a session can be resumed
    pub fn save_state(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.state)?)
    }

    /// Resume from state produced by [`ExerciseSession::save_state`].
    ///
    /// The stage must belong to this session's exercise. On error the current
    /// state is kept.
    pub fn load_state(&mut self, json: &str) -> Result<()> {
        let state: ExerciseState = serde_json::from_str(json)?;
        if !self.kind.accepts_stage(state.stage) {
            return Err(PipelineError::SessionState(format!(
                "stage {} is not valid for {}",
                state.stage.as_str(),
                self.kind
            )));
        }
        self.state = state;
        Ok(())
    }
}

/// Build a yoga detector from configuration.
///
/// A missing or unreadable model leaves the detector running with
/// [`UnavailableClassifier`]: every frame then reports an unknown pose.
pub fn yoga_detector(config: &CoachConfig, references: Arc<ReferenceStore>) -> YogaDetector {
    let (scaler, classifier): (Option<StandardScaler>, Box<dyn PoseClassifier + Send>) =
        match &config.model_path {
            Some(path) => match ModelArtifact::load(path) {
                Ok(artifact) => {
                    info!("loaded pose model {}", path.display());
                    (Some(artifact.scaler), Box::new(artifact.classifier))
                }
                Err(e) => {
                    warn!("pose model {} unavailable: {e}", path.display());
                    (None, Box::new(UnavailableClassifier))
                }
            },
            None => {
                warn!("no pose model configured, yoga poses will not be classified");
                (None, Box::new(UnavailableClassifier))
            }
        };
    YogaDetector::new(scaler, classifier, references, config)
}

/// Open the configured reference store, or an in-memory one
pub fn reference_store(config: &CoachConfig) -> Result<Arc<ReferenceStore>> {
    let store = match &config.reference_dir {
        Some(dir) => ReferenceStore::open(dir)?,
        None => ReferenceStore::in_memory(),
    };
    Ok(Arc::new(store))
}

/// Yoga session: classification and reference comparison per frame
pub struct YogaSession {
    id: Uuid,
    detector: YogaDetector,
    frame_index: u64,
}

impl YogaSession {
    pub fn new(detector: YogaDetector) -> Self {
        let id = Uuid::new_v4();
        info!(
            "started yoga session {id} with {} classifier",
            detector.classifier_name()
        );
        Self {
            id,
            detector,
            frame_index: 0,
        }
    }

    /// Session wired from configuration: model, reference directory, gates
    pub fn from_config(config: &CoachConfig) -> Result<Self> {
        let references = reference_store(config)?;
        Ok(Self::new(yoga_detector(config, references)))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn detector(&self) -> &YogaDetector {
        &self.detector
    }

    pub fn process_frame(
        &mut self,
        image: RgbImage,
        provider: &mut dyn LandmarkProvider,
        now: DateTime<Utc>,
    ) -> FrameResult {
        let landmarks = provider.detect(&image);
        self.process_landmarks(image, landmarks, now)
    }

    pub fn process_landmarks(
        &mut self,
        image: RgbImage,
        landmarks: Option<LandmarkSet>,
        now: DateTime<Utc>,
    ) -> FrameResult {
        let frame_index = self.frame_index;
        self.frame_index += 1;

        let mut frame = AnnotatedFrame::new(image);
        if let Some(set) = &landmarks {
            overlay::draw_skeleton(&mut frame.image, set, overlay::DRAW_VISIBILITY);
        }

        let result = self.detector.process(landmarks.as_ref());
        overlay::yoga(&mut frame, &result);

        let feedback = result
            .feedback
            .as_ref()
            .map(|f| f.detailed_corrections.clone())
            .unwrap_or_default();

        let report = FrameReport {
            producer: Producer::default(),
            session_id: self.id,
            frame_index,
            timestamp: now,
            exercise: None,
            status: result.status,
            counter: 0,
            stage: Stage::Idle,
            plank: None,
            angles: Vec::new(),
            feedback,
            form: None,
            message: result.message.clone(),
            yoga: Some(result),
        };

        FrameResult { frame, report }
    }

    /// Save the most recent detection as its pose's reference
    pub fn save_reference(&self, now: DateTime<Utc>) -> SaveOutcome {
        self.detector.save_current_as_reference(now)
    }

    pub fn available_poses(&self) -> Vec<PoseAvailability> {
        self.detector.available_poses()
    }
}

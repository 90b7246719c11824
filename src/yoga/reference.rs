//! Reference pose storage
//!
//! One reference angle vector per yoga pose, persisted as a small versioned
//! JSON record (`<pose>_reference.json`). The store is read on every frame
//! and written only on an explicit save, so it sits behind a read-mostly
//! lock and is shared between sessions through an `Arc`.

use super::angles::ANGLE_COUNT;
use super::YogaPose;
use crate::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Version written into every reference record
pub const REFERENCE_FORMAT_VERSION: u32 = 1;

/// A saved reference pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePose {
    pub format_version: u32,
    pub pose: YogaPose,
    /// Angle vector in feature order (degrees)
    pub angles: Vec<f64>,
    pub saved_at: DateTime<Utc>,
}

impl ReferencePose {
    pub fn new(pose: YogaPose, angles: Vec<f64>, saved_at: DateTime<Utc>) -> Self {
        Self {
            format_version: REFERENCE_FORMAT_VERSION,
            pose,
            angles,
            saved_at,
        }
    }

    /// Parse a record, rejecting other format versions
    pub fn from_json(json: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(json)?;
        if record.format_version != REFERENCE_FORMAT_VERSION {
            return Err(PipelineError::ReferenceFormat(format!(
                "unsupported format version {} (expected {})",
                record.format_version, REFERENCE_FORMAT_VERSION
            )));
        }
        check_angles(&record.angles)?;
        Ok(record)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A reference holds exactly one finite angle per feature
fn check_angles(angles: &[f64]) -> Result<()> {
    if angles.len() != ANGLE_COUNT {
        return Err(PipelineError::ReferenceFormat(format!(
            "expected {ANGLE_COUNT} angles, found {}",
            angles.len()
        )));
    }
    if angles.iter().any(|a| !a.is_finite()) {
        return Err(PipelineError::ReferenceFormat(
            "angles must be finite".to_string(),
        ));
    }
    Ok(())
}

/// Reference poses keyed by pose, optionally backed by a directory
#[derive(Debug, Default)]
pub struct ReferenceStore {
    dir: Option<PathBuf>,
    poses: RwLock<HashMap<YogaPose, ReferencePose>>,
}

impl ReferenceStore {
    /// A store that lives only in memory
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a directory-backed store and load every reference found.
    ///
    /// Missing files mean no reference for that pose. Unreadable or
    /// incompatible files are skipped with a warning.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let mut poses = HashMap::new();
        for pose in YogaPose::ALL {
            let path = Self::path_for(&dir, pose);
            if !path.exists() {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(PipelineError::from)
                .and_then(|json| ReferencePose::from_json(&json))
            {
                Ok(record) if record.pose == pose => {
                    poses.insert(pose, record);
                }
                Ok(record) => warn!(
                    "{} holds a reference for {}, skipping",
                    path.display(),
                    record.pose
                ),
                Err(e) => warn!("skipping reference {}: {e}", path.display()),
            }
        }

        info!(
            "loaded {} reference poses from {}",
            poses.len(),
            dir.display()
        );
        Ok(Self {
            dir: Some(dir),
            poses: RwLock::new(poses),
        })
    }

    /// File holding the reference for `pose` inside `dir`
    pub fn path_for(dir: &Path, pose: YogaPose) -> PathBuf {
        dir.join(format!("{}_reference.json", pose.as_str()))
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Reference angles for `pose`, if one has been saved
    pub fn get(&self, pose: YogaPose) -> Option<Vec<f64>> {
        self.read().get(&pose).map(|r| r.angles.clone())
    }

    pub fn record(&self, pose: YogaPose) -> Option<ReferencePose> {
        self.read().get(&pose).cloned()
    }

    pub fn has(&self, pose: YogaPose) -> bool {
        self.read().get(&pose).is_some_and(|r| !r.angles.is_empty())
    }

    /// Save `angles` as the reference for `pose`, replacing any previous one.
    ///
    /// The file is written before the in-memory copy is updated, so a failed
    /// write leaves the old reference in place.
    pub fn save(&self, pose: YogaPose, angles: Vec<f64>, now: DateTime<Utc>) -> Result<()> {
        check_angles(&angles)?;
        let record = ReferencePose::new(pose, angles, now);
        if let Some(dir) = &self.dir {
            std::fs::write(Self::path_for(dir, pose), record.to_json()?)?;
        }
        self.write().insert(pose, record);
        info!("saved reference for {pose}");
        Ok(())
    }

    // A poisoned lock still holds consistent data: each entry is replaced whole.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<YogaPose, ReferencePose>> {
        self.poses.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<YogaPose, ReferencePose>> {
        self.poses.write().unwrap_or_else(|e| e.into_inner())
    }
}

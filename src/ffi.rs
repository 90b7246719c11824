//! FFI bindings for Posecoach
//!
//! C-compatible functions for driving sessions from another runtime (the web
//! layer). Landmarks go in and reports come out as JSON. All functions use
//! null-terminated C strings and return allocated memory that must be freed by
//! the caller using `posecoach_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::{DateTime, TimeZone, Utc};
use image::RgbImage;

use crate::config::CoachConfig;
use crate::error::{PipelineError, Result};
use crate::form;
use crate::pipeline::ExerciseSession;
use crate::types::{ExerciseKind, LandmarkSet, Stage};
use crate::workout::{exercise_tips, WorkoutReport};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Return the JSON result, or NULL with the error recorded
fn json_or_null(result: Result<String>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// `null` means no pose was detected in the frame
fn parse_landmarks(json: &str) -> Result<Option<LandmarkSet>> {
    Ok(serde_json::from_str(json)?)
}

fn timestamp(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| PipelineError::Config(format!("timestamp out of range: {millis}")))
}

fn evaluate_form_json(landmarks: &str, exercise: &str, stage: String) -> Result<String> {
    let landmarks = parse_landmarks(landmarks)?;
    let kind: ExerciseKind = exercise.parse()?;
    let stage: Stage = serde_json::from_value(serde_json::Value::String(stage))?;
    let verdict = form::evaluate(landmarks.as_ref(), kind, stage);
    Ok(serde_json::to_string(&verdict)?)
}

/// Landmarks are replayed onto a blank canvas of the configured size
fn process_json(
    session: &mut ExerciseSession,
    landmarks: &str,
    timestamp_ms: i64,
) -> Result<String> {
    let landmarks = parse_landmarks(landmarks)?;
    let now = timestamp(timestamp_ms)?;
    let canvas = &session.config().canvas;
    let image = RgbImage::new(canvas.width, canvas.height);
    session.process_landmarks(image, landmarks, now).report.to_json()
}

// ============================================================================
// Stateless API
// ============================================================================

/// Evaluate form for one landmark frame.
///
/// # Safety
/// - `landmarks_json`, `exercise` and `stage` must be valid null-terminated C strings.
/// - `landmarks_json` is a 33-element landmark array or `null`.
/// - `stage` is one of `up`, `down`, `idle`, `planking`, `resting`.
/// - Returns a newly allocated string that must be freed with `posecoach_free_string`.
/// - Returns NULL on error; call `posecoach_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn posecoach_evaluate_form(
    landmarks_json: *const c_char,
    exercise: *const c_char,
    stage: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let landmarks_str = match cstr_to_string(landmarks_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid landmarks string pointer");
            return ptr::null_mut();
        }
    };

    let exercise_str = match cstr_to_string(exercise) {
        Some(s) => s,
        None => {
            set_last_error("Invalid exercise string pointer");
            return ptr::null_mut();
        }
    };

    let stage_str = match cstr_to_string(stage) {
        Some(s) => s,
        None => {
            set_last_error("Invalid stage string pointer");
            return ptr::null_mut();
        }
    };

    json_or_null(evaluate_form_json(&landmarks_str, &exercise_str, stage_str))
}

/// Tips for an exercise as a JSON array of strings.
///
/// # Safety
/// - `exercise` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `posecoach_free_string`.
/// - Returns NULL on error; call `posecoach_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn posecoach_exercise_tips(exercise: *const c_char) -> *mut c_char {
    clear_last_error();

    let exercise_str = match cstr_to_string(exercise) {
        Some(s) => s,
        None => {
            set_last_error("Invalid exercise string pointer");
            return ptr::null_mut();
        }
    };

    json_or_null(
        exercise_str
            .parse::<ExerciseKind>()
            .and_then(|kind| Ok(serde_json::to_string(&exercise_tips(kind))?)),
    )
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to an ExerciseSession
pub struct PosecoachSessionHandle {
    session: ExerciseSession,
}

/// Create a session for the named exercise.
///
/// # Safety
/// - `exercise` must be a valid null-terminated C string.
/// - `config_json` may be NULL for the default configuration.
/// - Returns a pointer that must be freed with `posecoach_session_free`.
/// - Returns NULL on error; call `posecoach_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn posecoach_session_new(
    exercise: *const c_char,
    config_json: *const c_char,
) -> *mut PosecoachSessionHandle {
    clear_last_error();

    let exercise_str = match cstr_to_string(exercise) {
        Some(s) => s,
        None => {
            set_last_error("Invalid exercise string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config_json.is_null() {
        CoachConfig::default()
    } else {
        let parsed = cstr_to_string(config_json)
            .ok_or_else(|| PipelineError::Config("config is not valid UTF-8".to_string()))
            .and_then(|json| CoachConfig::from_json(&json));
        match parsed {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e.to_string());
                return ptr::null_mut();
            }
        }
    };

    match ExerciseSession::from_name(&exercise_str, config) {
        Ok(session) => Box::into_raw(Box::new(PosecoachSessionHandle { session })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `posecoach_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn posecoach_session_free(session: *mut PosecoachSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Process one landmark frame and return the frame report as JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `posecoach_session_new`.
/// - `landmarks_json` must be a valid null-terminated C string holding a
///   33-element landmark array, or `null` when no pose was detected.
/// - `timestamp_ms` is the frame time in milliseconds since the Unix epoch.
/// - Returns a newly allocated string that must be freed with `posecoach_free_string`.
/// - Returns NULL on error; call `posecoach_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn posecoach_session_process(
    session: *mut PosecoachSessionHandle,
    landmarks_json: *const c_char,
    timestamp_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &mut *session;

    let landmarks_str = match cstr_to_string(landmarks_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid landmarks string pointer");
            return ptr::null_mut();
        }
    };

    json_or_null(process_json(&mut handle.session, &landmarks_str, timestamp_ms))
}

/// Reset the counter, stage and plank timer.
///
/// # Safety
/// - `session` must be a valid pointer returned by `posecoach_session_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn posecoach_session_reset(session: *mut PosecoachSessionHandle) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;
    handle.session.reset();
    0
}

/// End-of-workout summary, performance score and tips as JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `posecoach_session_new`.
/// - `weight_kg` of zero or less uses the configured default weight.
/// - Returns a newly allocated string that must be freed with `posecoach_free_string`.
/// - Returns NULL on error; call `posecoach_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn posecoach_session_summary(
    session: *mut PosecoachSessionHandle,
    weight_kg: f64,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &*session;
    let weight = (weight_kg > 0.0).then_some(weight_kg);
    let report = WorkoutReport::new(handle.session.summary(weight));
    json_or_null(serde_json::to_string(&report).map_err(PipelineError::from))
}

/// Save the session's exercise state to JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `posecoach_session_new`.
/// - Returns a newly allocated string that must be freed with `posecoach_free_string`.
/// - Returns NULL on error; call `posecoach_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn posecoach_session_save_state(
    session: *mut PosecoachSessionHandle,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }

    let handle = &*session;
    json_or_null(handle.session.save_state())
}

/// Load exercise state saved by `posecoach_session_save_state`.
///
/// # Safety
/// - `session` must be a valid pointer returned by `posecoach_session_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `posecoach_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn posecoach_session_load_state(
    session: *mut PosecoachSessionHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }

    let handle = &mut *session;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.session.load_state(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Posecoach functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Posecoach function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn posecoach_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Posecoach call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn posecoach_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the Posecoach library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn posecoach_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::PoseBuilder;
    use crate::types::BodyLandmark as L;

    fn knee_json(degrees: f64) -> CString {
        let set = PoseBuilder::standing()
            .bend(L::LeftHip, L::LeftKnee, L::LeftAnkle, degrees)
            .build()
            .unwrap();
        CString::new(serde_json::to_string(&set).unwrap()).unwrap()
    }

    unsafe fn take(ptr: *mut c_char) -> serde_json::Value {
        assert!(!ptr.is_null());
        let value = serde_json::from_str(CStr::from_ptr(ptr).to_str().unwrap()).unwrap();
        posecoach_free_string(ptr);
        value
    }

    #[test]
    fn test_ffi_session_lifecycle() {
        unsafe {
            let exercise = CString::new("squats").unwrap();
            let session = posecoach_session_new(exercise.as_ptr(), ptr::null());
            assert!(!session.is_null());

            let up = knee_json(170.0);
            let down = knee_json(80.0);
            let t0 = 1_700_000_000_000;
            let report = take(posecoach_session_process(session, up.as_ptr(), t0));
            assert_eq!(report["counter"], 0);
            let report = take(posecoach_session_process(session, down.as_ptr(), t0 + 500));
            assert_eq!(report["counter"], 1);
            assert_eq!(report["stage"], "down");

            let none = CString::new("null").unwrap();
            let report = take(posecoach_session_process(session, none.as_ptr(), t0 + 1000));
            assert_eq!(report["status"], "no_pose");

            let summary = take(posecoach_session_summary(session, 0.0));
            assert_eq!(summary["summary"]["reps_completed"], 1);
            assert_eq!(summary["tips"].as_array().unwrap().len(), 3);

            let state = posecoach_session_save_state(session);
            assert!(!state.is_null());

            assert_eq!(posecoach_session_reset(session), 0);
            let summary = take(posecoach_session_summary(session, 70.0));
            assert_eq!(summary["summary"]["reps_completed"], 0);

            assert_eq!(posecoach_session_load_state(session, state), 0);
            let summary = take(posecoach_session_summary(session, 70.0));
            assert_eq!(summary["summary"]["reps_completed"], 1);

            posecoach_free_string(state);
            posecoach_session_free(session);
        }
    }

    #[test]
    fn test_ffi_unknown_exercise() {
        unsafe {
            let exercise = CString::new("burpees").unwrap();
            let session = posecoach_session_new(exercise.as_ptr(), ptr::null());
            assert!(session.is_null());

            let error = posecoach_last_error();
            assert!(!error.is_null());
            let message = CStr::from_ptr(error).to_str().unwrap();
            assert!(message.contains("burpees"));
        }
    }

    #[test]
    fn test_ffi_bad_landmarks() {
        unsafe {
            let exercise = CString::new("Push-ups").unwrap();
            let session = posecoach_session_new(exercise.as_ptr(), ptr::null());
            let short = CString::new(r#"[{"x":0.1,"y":0.2,"visibility":0.9}]"#).unwrap();

            let report = posecoach_session_process(session, short.as_ptr(), 0);
            assert!(report.is_null());
            assert!(!posecoach_last_error().is_null());

            assert_eq!(posecoach_session_reset(ptr::null_mut()), -1);
            posecoach_session_free(session);
        }
    }

    #[test]
    fn test_ffi_config_and_form() {
        unsafe {
            let exercise = CString::new("plank").unwrap();
            let config = CString::new(r#"{"plank": {"goal_secs": 30}}"#).unwrap();
            let session = posecoach_session_new(exercise.as_ptr(), config.as_ptr());
            assert!(!session.is_null());
            posecoach_session_free(session);

            let pose = knee_json(178.0);
            let squats = CString::new("squats").unwrap();
            let stage = CString::new("up").unwrap();
            let verdict = take(posecoach_evaluate_form(
                pose.as_ptr(),
                squats.as_ptr(),
                stage.as_ptr(),
            ));
            assert!(verdict.get("is_correct").is_some());

            let tips = take(posecoach_exercise_tips(squats.as_ptr()));
            assert_eq!(tips.as_array().unwrap().len(), 3);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = posecoach_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}

//! Frame annotation
//!
//! Shapes (skeleton, status panel, progress bars) are drawn straight onto the
//! frame. Text is not rasterised here: every overlay line becomes a
//! [`Caption`] with its anchor and color, and the display layer renders it.

use crate::exercises::plank;
use crate::exercises::RepOutcome;
use crate::types::{ExerciseKind, LandmarkSet, Stage};
use crate::yoga::YogaFrame;
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// RGB color
pub type Color = [u8; 3];

pub const RED: Color = [255, 0, 0];
pub const BLUE: Color = [0, 0, 255];
pub const GREEN: Color = [0, 255, 0];
pub const YELLOW: Color = [255, 255, 0];
pub const ORANGE: Color = [255, 165, 0];
pub const WHITE: Color = [255, 255, 255];
pub const BLACK: Color = [0, 0, 0];
/// Squat status panel fill
pub const PANEL: Color = [16, 117, 245];

/// Landmarks below this visibility are not drawn
pub const DRAW_VISIBILITY: f64 = 0.5;

/// Repetitions per set shown by the rep progress bar
pub const REP_SET_SIZE: u32 = 10;

/// Pairs of landmark indices joined by a bone
pub const POSE_CONNECTIONS: [[usize; 2]; 35] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 7],
    [0, 4],
    [4, 5],
    [5, 6],
    [6, 8],
    [9, 10],
    [11, 12],
    [11, 13],
    [13, 15],
    [15, 17],
    [15, 19],
    [15, 21],
    [17, 19],
    [12, 14],
    [14, 16],
    [16, 18],
    [16, 20],
    [16, 22],
    [18, 20],
    [11, 23],
    [12, 24],
    [23, 24],
    [23, 25],
    [24, 26],
    [25, 27],
    [26, 28],
    [27, 29],
    [28, 30],
    [29, 31],
    [30, 32],
    [27, 31],
    [28, 32],
];

const STATUS_PANEL: (i32, i32, i32, i32) = (0, 0, 225, 73);
const PLANK_BAR: (i32, i32, i32, i32) = (20, 100, 220, 125);
const REP_BAR: (i32, i32, i32, i32) = (0, 76, 225, 84);
const LINE_SPACING: i32 = 30;

/// A line of overlay text anchored at pixel `(x, y)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub color: Color,
}

/// A frame with shapes drawn in and captions to render
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub image: RgbImage,
    pub captions: Vec<Caption>,
}

impl AnnotatedFrame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            captions: Vec::new(),
        }
    }

    pub fn caption(&mut self, text: impl Into<String>, x: i32, y: i32, color: Color) {
        self.captions.push(Caption {
            text: text.into(),
            x,
            y,
            color,
        });
    }

    /// Caption texts in drawing order
    pub fn texts(&self) -> Vec<&str> {
        self.captions.iter().map(|c| c.text.as_str()).collect()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

fn put(img: &mut RgbImage, x: i32, y: i32, color: Color) {
    if x >= 0 && y >= 0 && x < img.width() as i32 && y < img.height() as i32 {
        img.put_pixel(x as u32, y as u32, Rgb(color));
    }
}

/// Fill the rectangle between two corners, inclusive, clipped to the image
pub fn fill_rect(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Color) {
    let max_x = img.width() as i32 - 1;
    let max_y = img.height() as i32 - 1;
    let (left, right) = (x1.min(x2).max(0), x1.max(x2).min(max_x));
    let (top, bottom) = (y1.min(y2).max(0), y1.max(y2).min(max_y));
    for y in top..=bottom {
        for x in left..=right {
            put(img, x, y, color);
        }
    }
}

/// Bresenham line, clipped to the image first
pub fn draw_line(img: &mut RgbImage, from: (i32, i32), to: (i32, i32), color: Color) {
    let Some((from, to)) = clip_line(img.width(), img.height(), from, to) else {
        return;
    };
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Liang-Barsky clip of a segment to the pixel grid.
///
/// Returns `None` when the segment misses the image entirely.
fn clip_line(
    width: u32,
    height: u32,
    from: (i32, i32),
    to: (i32, i32),
) -> Option<((i32, i32), (i32, i32))> {
    if width == 0 || height == 0 {
        return None;
    }
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let (dx, dy) = (to.0 as f64 - x0, to.1 as f64 - y0);
    let (max_x, max_y) = ((width - 1) as f64, (height - 1) as f64);

    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, x0), (dx, max_x - x0), (-dy, y0), (dy, max_y - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| {
        (
            (x0 + t * dx).round().clamp(0.0, max_x) as i32,
            (y0 + t * dy).round().clamp(0.0, max_y) as i32,
        )
    };
    Some((at(t0), at(t1)))
}

pub fn draw_point(img: &mut RgbImage, x: i32, y: i32, radius: i32, color: Color) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(img, x.saturating_add(dx), y.saturating_add(dy), color);
            }
        }
    }
}

/// Normalized coordinates to pixels, kept within one image size of the frame
fn to_pixel(img: &RgbImage, x: f64, y: f64) -> (i32, i32) {
    let margin = (img.width() + img.height()) as f64;
    let scale = |v: f64, size: u32| {
        (v * size as f64)
            .round()
            .clamp(-margin, size as f64 + margin) as i32
    };
    (scale(x, img.width()), scale(y, img.height()))
}

/// Draw bones and joints whose landmarks are visible enough
pub fn draw_skeleton(img: &mut RgbImage, landmarks: &LandmarkSet, min_visibility: f64) {
    let points = landmarks.points();
    for [a, b] in POSE_CONNECTIONS {
        let (Some(pa), Some(pb)) = (points.get(a), points.get(b)) else {
            continue;
        };
        if pa.visibility < min_visibility || pb.visibility < min_visibility {
            continue;
        }
        let from = to_pixel(img, pa.x, pa.y);
        let to = to_pixel(img, pb.x, pb.y);
        draw_line(img, from, to, WHITE);
    }
    for point in points.iter().filter(|p| p.visibility >= min_visibility) {
        let (x, y) = to_pixel(img, point.x, point.y);
        draw_point(img, x, y, 3, RED);
    }
}

/// Horizontal bar: black track with the filled fraction in `color`
fn progress_bar(img: &mut RgbImage, bar: (i32, i32, i32, i32), fraction: f64, color: Color) {
    let (x1, y1, x2, y2) = bar;
    fill_rect(img, x1, y1, x2, y2, BLACK);
    let filled = ((x2 - x1) as f64 * fraction.clamp(0.0, 1.0)) as i32;
    if filled > 0 {
        fill_rect(img, x1, y1, x1 + filled, y2, color);
    }
}

/// Caption shown when the provider found nobody
pub fn no_pose(frame: &mut AnnotatedFrame) {
    frame.caption("No pose detected - Stand in view of camera", 20, 50, RED);
}

/// Caption shown when a required landmark is hidden
pub fn not_fully_visible(frame: &mut AnnotatedFrame) {
    let y = frame.height() as i32 - 30;
    frame.caption("BODY NOT FULLY VISIBLE", 20, y, RED);
}

fn angle_label(name: &str) -> String {
    let mut words = name.split('_').map(|w| {
        let mut chars = w.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        }
    });
    let mut label = words.next().unwrap_or_default();
    for word in words {
        label.push(' ');
        label.push_str(&word);
    }
    label
}

/// Draw the exercise overlay for a counted frame
pub fn exercise(
    frame: &mut AnnotatedFrame,
    kind: ExerciseKind,
    outcome: &RepOutcome,
    feedback: &[String],
    goal_secs: f64,
) {
    match kind {
        ExerciseKind::Plank => plank_overlay(frame, outcome, feedback, goal_secs),
        ExerciseKind::Squats => squat_overlay(frame, outcome, feedback),
        _ => rep_overlay(frame, outcome, feedback),
    }
}

fn rep_set_fraction(counter: u32) -> f64 {
    match counter {
        0 => 0.0,
        n if n % REP_SET_SIZE == 0 => 1.0,
        n => (n % REP_SET_SIZE) as f64 / REP_SET_SIZE as f64,
    }
}

fn squat_overlay(frame: &mut AnnotatedFrame, outcome: &RepOutcome, feedback: &[String]) {
    let (x1, y1, x2, y2) = STATUS_PANEL;
    fill_rect(&mut frame.image, x1, y1, x2, y2, PANEL);
    progress_bar(
        &mut frame.image,
        REP_BAR,
        rep_set_fraction(outcome.counter),
        GREEN,
    );

    frame.caption("REPS", 15, 12, BLACK);
    frame.caption(outcome.counter.to_string(), 10, 60, WHITE);
    frame.caption("STAGE", 65, 12, BLACK);
    frame.caption(outcome.stage.as_str(), 60, 60, WHITE);

    if let Some(knee) = outcome.angles.first() {
        frame.caption(format!("Angle: {}", knee.degrees as i64), 240, 40, WHITE);
    }
    for (i, text) in feedback.iter().enumerate() {
        frame.caption(text.clone(), 10, 100 + LINE_SPACING * i as i32, YELLOW);
    }
}

fn rep_overlay(frame: &mut AnnotatedFrame, outcome: &RepOutcome, feedback: &[String]) {
    progress_bar(
        &mut frame.image,
        REP_BAR,
        rep_set_fraction(outcome.counter),
        GREEN,
    );
    frame.caption(format!("Count: {}", outcome.counter), 20, 50, RED);
    frame.caption(format!("Stage: {}", outcome.stage), 20, 90, BLUE);

    let mut y = 130;
    for angle in &outcome.angles {
        frame.caption(
            format!("{}: {:.1}°", angle_label(&angle.name), angle.degrees),
            20,
            y,
            GREEN,
        );
        y += LINE_SPACING;
    }
    for text in feedback {
        frame.caption(text.clone(), 20, y, YELLOW);
        y += LINE_SPACING;
    }
}

fn plank_overlay(
    frame: &mut AnnotatedFrame,
    outcome: &RepOutcome,
    feedback: &[String],
    goal_secs: f64,
) {
    let planking = outcome.stage == Stage::Planking;
    let fraction = if planking {
        plank::progress(&outcome.plank, goal_secs)
    } else {
        0.0
    };
    progress_bar(&mut frame.image, PLANK_BAR, fraction, GREEN);

    frame.caption(
        format!("Current: {:.1}s", outcome.plank.current_duration),
        20,
        50,
        RED,
    );
    frame.caption(
        format!("Best: {:.1}s", outcome.plank.best_duration),
        20,
        80,
        BLUE,
    );
    for (i, text) in feedback.iter().enumerate() {
        frame.caption(text.clone(), 20, 150 + LINE_SPACING * i as i32, YELLOW);
    }

    if planking && outcome.plank.current_duration >= goal_secs {
        let x = frame.width() as i32 / 2 - 150;
        let y = frame.height() as i32 / 2;
        frame.caption("GOAL ACHIEVED!", x, y, GREEN);
    }
}

/// Draw the yoga overlay for one detector frame
pub fn yoga(frame: &mut AnnotatedFrame, result: &YogaFrame) {
    if let Some(pose) = result.pose {
        frame.caption(format!("Pose: {}", pose.title()), 10, 30, GREEN);
        frame.caption(
            format!("Confidence: {:.1}%", result.confidence),
            10,
            70,
            GREEN,
        );
    } else if let Some(message) = &result.message {
        frame.caption(message.clone(), 10, 30, RED);
        return;
    }

    if let Some(feedback) = &result.feedback {
        frame.caption(format!("Score: {:.1}%", feedback.score), 10, 110, GREEN);
        for (i, correction) in feedback.detailed_corrections.iter().enumerate() {
            frame.caption(
                correction.clone(),
                10,
                150 + LINE_SPACING * i as i32,
                ORANGE,
            );
        }
    } else if let Some(message) = &result.message {
        frame.caption(message.clone(), 10, 110, RED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::JointAngle;
    use crate::landmarks::{DetectionStatus, PoseBuilder};
    use crate::types::{BodyLandmark as L, PlankTimer};

    fn blank() -> AnnotatedFrame {
        AnnotatedFrame::new(RgbImage::new(640, 480))
    }

    fn outcome(stage: Stage, counter: u32) -> RepOutcome {
        RepOutcome {
            stage,
            counter,
            plank: PlankTimer::default(),
            feedback: Vec::new(),
            angles: vec![JointAngle {
                name: "left_knee".to_string(),
                degrees: 92.3,
            }],
        }
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut img = RgbImage::new(10, 10);
        fill_rect(&mut img, -5, -5, 2, 2, GREEN);
        assert_eq!(img.get_pixel(0, 0), &Rgb(GREEN));
        assert_eq!(img.get_pixel(2, 2), &Rgb(GREEN));
        assert_eq!(img.get_pixel(3, 3), &Rgb(BLACK));
    }

    #[test]
    fn test_line_reaches_both_ends() {
        let mut img = RgbImage::new(20, 20);
        draw_line(&mut img, (1, 2), (15, 9), WHITE);
        assert_eq!(img.get_pixel(1, 2), &Rgb(WHITE));
        assert_eq!(img.get_pixel(15, 9), &Rgb(WHITE));
    }

    #[test]
    fn test_line_clipped_to_image() {
        let mut img = RgbImage::new(20, 20);
        draw_line(&mut img, (5, 4), (i32::MAX, 4), WHITE);
        assert_eq!(img.get_pixel(5, 4), &Rgb(WHITE));
        assert_eq!(img.get_pixel(19, 4), &Rgb(WHITE));
        assert_eq!(img.get_pixel(4, 4), &Rgb(BLACK));

        // entirely outside: nothing drawn
        let mut img = RgbImage::new(20, 20);
        draw_line(&mut img, (i32::MIN, -5), (i32::MAX, -5), WHITE);
        assert!(img.pixels().all(|p| *p == Rgb(BLACK)));
    }

    #[test]
    fn test_far_off_landmark_is_clipped() {
        let pose = PoseBuilder::standing()
            .at(L::LeftWrist, 2.0e7, 0.5)
            .build()
            .unwrap();
        let mut img = RgbImage::new(64, 48);
        draw_skeleton(&mut img, &pose, DRAW_VISIBILITY);

        // the wrist bones run off the right edge instead of hanging the loop
        let right_edge = (0..img.height()).any(|y| img.get_pixel(63, y) == &Rgb(WHITE));
        assert!(right_edge);
    }

    #[test]
    fn test_hidden_joints_not_drawn() {
        let pose = PoseBuilder::standing()
            .all_visibility(0.2)
            .visibility(L::Nose, 0.9)
            .build()
            .unwrap();
        let mut img = RgbImage::new(100, 100);
        draw_skeleton(&mut img, &pose, DRAW_VISIBILITY);

        // nose at (0.50, 0.15)
        assert_eq!(img.get_pixel(50, 15), &Rgb(RED));
        // left hip at (0.56, 0.60) is hidden
        assert_eq!(img.get_pixel(56, 60), &Rgb(BLACK));
    }

    #[test]
    fn test_rep_overlay_captions() {
        let mut frame = blank();
        let feedback = vec!["Keep body straight".to_string()];
        exercise(
            &mut frame,
            ExerciseKind::PushUps,
            &outcome(Stage::Down, 4),
            &feedback,
            60.0,
        );
        assert_eq!(
            frame.texts(),
            vec![
                "Count: 4",
                "Stage: down",
                "Left Knee: 92.3°",
                "Keep body straight"
            ]
        );
        // rep bar is 4/10 full
        assert_eq!(frame.image.get_pixel(10, 80), &Rgb(GREEN));
        assert_eq!(frame.image.get_pixel(200, 80), &Rgb(BLACK));
    }

    #[test]
    fn test_squat_status_panel() {
        let mut frame = blank();
        exercise(
            &mut frame,
            ExerciseKind::Squats,
            &outcome(Stage::Up, 2),
            &[],
            60.0,
        );
        assert_eq!(frame.image.get_pixel(200, 10), &Rgb(PANEL));
        assert_eq!(frame.texts(), vec!["REPS", "2", "STAGE", "up", "Angle: 92"]);
    }

    #[test]
    fn test_plank_goal() {
        let mut frame = blank();
        let mut held = outcome(Stage::Planking, 0);
        held.plank.current_duration = 61.0;
        held.plank.best_duration = 61.0;
        exercise(&mut frame, ExerciseKind::Plank, &held, &[], 60.0);

        assert!(frame.texts().contains(&"GOAL ACHIEVED!"));
        // bar fully green
        assert_eq!(frame.image.get_pixel(219, 110), &Rgb(GREEN));
    }

    #[test]
    fn test_plank_resting_bar_empty() {
        let mut frame = blank();
        let mut resting = outcome(Stage::Resting, 0);
        resting.plank.best_duration = 12.0;
        exercise(&mut frame, ExerciseKind::Plank, &resting, &[], 60.0);

        assert_eq!(frame.image.get_pixel(30, 110), &Rgb(BLACK));
        assert_eq!(frame.texts(), vec!["Current: 0.0s", "Best: 12.0s"]);
    }

    #[test]
    fn test_status_captions() {
        let mut frame = blank();
        no_pose(&mut frame);
        not_fully_visible(&mut frame);
        assert_eq!(frame.captions[1].y, 450);
        assert_eq!(
            frame.texts(),
            vec![
                "No pose detected - Stand in view of camera",
                "BODY NOT FULLY VISIBLE"
            ]
        );
    }

    #[test]
    fn test_yoga_captions() {
        let mut frame = blank();
        let result = YogaFrame {
            status: DetectionStatus::Pose,
            pose: Some(crate::yoga::YogaPose::Tree),
            confidence: 88.0,
            angles: vec![0.0; 8],
            feedback: None,
            message: Some("Reference pose not available".to_string()),
            processing_ms: 4.2,
        };
        yoga(&mut frame, &result);
        assert_eq!(
            frame.texts(),
            vec![
                "Pose: Tree",
                "Confidence: 88.0%",
                "Reference pose not available"
            ]
        );
    }

    #[test]
    fn test_angle_label() {
        assert_eq!(angle_label("left_knee"), "Left Knee");
        assert_eq!(angle_label("torso"), "Torso");
    }
}

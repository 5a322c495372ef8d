//! Constants used throughout the detection and attendance pipeline

/// Skin-tone rule: minimum red value
pub const SKIN_MIN_RED: u8 = 95;
/// Skin-tone rule: minimum green value
pub const SKIN_MIN_GREEN: u8 = 40;
/// Skin-tone rule: minimum blue value
pub const SKIN_MIN_BLUE: u8 = 20;
/// Skin-tone rule: minimum |red - green|
pub const SKIN_MIN_RED_GREEN_GAP: i32 = 15;
/// Skin-tone rule: minimum max(r,g,b) - min(r,g,b)
pub const SKIN_MIN_CHANNEL_SPREAD: i32 = 15;

/// Face score: exclusive bounds on skin ratio
pub const FACE_SKIN_RATIO_MIN: f64 = 0.2;
pub const FACE_SKIN_RATIO_MAX: f64 = 0.8;
/// Face score: exclusive bounds on mean brightness
pub const FACE_BRIGHTNESS_MIN: f64 = 60.0;
pub const FACE_BRIGHTNESS_MAX: f64 = 200.0;
/// Face score: absolute skin pixel count that must be exceeded
pub const FACE_MIN_SKIN_PIXELS: usize = 200;

/// Screen score: mean brightness that must be exceeded
pub const SCREEN_MEAN_BRIGHTNESS: f64 = 150.0;
/// Screen score: brightness of a "bright" pixel
pub const SCREEN_BRIGHT_PIXEL: f64 = 200.0;
/// Screen score: fraction of bright pixels that must be exceeded
pub const SCREEN_BRIGHT_FRACTION: f64 = 0.3;

/// Edge score: brightness step that makes a neighbor differ
pub const EDGE_BRIGHTNESS_STEP: f64 = 30.0;
/// Edge score: neighbors that must differ for an edge pixel
pub const EDGE_MIN_DIFFERING_NEIGHBORS: usize = 2;
/// Edge score: fraction at or below which the score is zero
pub const EDGE_MIN_FRACTION: f64 = 0.4;

/// Uniformity: variance below which the region is fully uniform
pub const UNIFORM_VARIANCE: f64 = 5000.0;
/// Uniformity: variance at which the score reaches zero
pub const UNIFORM_VARIANCE_SCALE: f64 = 10000.0;

/// Aspect ratio (height / width) accepted for a phone, inclusive
pub const PHONE_ASPECT_MIN: f64 = 1.5;
pub const PHONE_ASPECT_MAX: f64 = 2.5;

/// Phone score weights
pub const PHONE_WEIGHT_SCREEN: f64 = 0.4;
pub const PHONE_WEIGHT_EDGES: f64 = 0.3;
pub const PHONE_WEIGHT_UNIFORMITY: f64 = 0.2;
pub const PHONE_WEIGHT_ASPECT: f64 = 0.1;

/// Brightness below which a pixel counts as dark
pub const DARK_PIXEL_BRIGHTNESS: f64 = 60.0;
/// Mouth score: exclusive bounds on dark fraction
pub const MOUTH_DARK_MIN: f64 = 0.15;
pub const MOUTH_DARK_MAX: f64 = 0.6;
/// Mouth score: skin fraction that must be exceeded
pub const MOUTH_MIN_SKIN_FRACTION: f64 = 0.3;
/// Mouth score: mean local contrast that must be exceeded
pub const MOUTH_MIN_CONTRAST: f64 = 20.0;

/// Orientation score: asymmetry at or below which the score is zero
pub const ORIENTATION_MIN_ASYMMETRY: f64 = 0.2;

/// Eye score: exclusive bounds on dark fraction
pub const EYE_DARK_MIN: f64 = 0.1;
pub const EYE_DARK_MAX: f64 = 0.4;

/// Talking score weights
pub const TALKING_WEIGHT_MOUTH: f64 = 0.6;
pub const TALKING_WEIGHT_ORIENTATION: f64 = 0.2;
pub const TALKING_WEIGHT_EYES: f64 = 0.2;

/// Face scanning channel
pub const FACE_WINDOW: u32 = 60;
pub const FACE_STRIDE: u32 = 20;
pub const FACE_THRESHOLD: f64 = 0.6;
pub const FACE_MAX_CANDIDATES: usize = 6;
pub const FACE_SUPPRESSION_RADIUS: u32 = 40;
pub const FACE_BOX_WIDTH: f64 = 80.0;
pub const FACE_BOX_HEIGHT: f64 = 100.0;
pub const FACE_BOX_JITTER: f64 = 20.0;

/// Mobile phone scanning channel
pub const PHONE_WINDOW_WIDTH: u32 = 40;
pub const PHONE_WINDOW_HEIGHT: u32 = 80;
pub const PHONE_STRIDE: u32 = 20;
pub const PHONE_THRESHOLD: f64 = 0.8;
pub const PHONE_MAX_CANDIDATES: usize = 2;

/// Talking scanning channel
pub const TALKING_WINDOW: u32 = 60;
pub const TALKING_STRIDE: u32 = 30;
pub const TALKING_THRESHOLD: f64 = 0.7;
pub const TALKING_MAX_CANDIDATES: usize = 1;

/// Confidence range for ordinally matched faces, `[min, max)`
pub const ORDINAL_CONFIDENCE_MIN: f64 = 75.0;
pub const ORDINAL_CONFIDENCE_MAX: f64 = 95.0;

/// Descriptor distance below which two faces match
pub const DESCRIPTOR_MATCH_DISTANCE: f32 = 0.6;

/// Maximum distance in pixels between a behavior and the face it is attributed to
pub const BEHAVIOR_ATTRIBUTION_RADIUS: f64 = 200.0;

/// Default detection cycle interval
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 1000;

/// Default attendance threshold in percent
pub const DEFAULT_ATTENDANCE_THRESHOLD: f64 = 75.0;

/// Percentage at or above which a partially present student is late
pub const LATE_FLOOR_PERCENT: f64 = 25.0;

/// Minutes without a sighting before a tracked student is shown as not detected
pub const NOT_DETECTED_AFTER_MINUTES: i64 = 5;

/// Bytes per RGBA pixel
pub const RGBA_CHANNELS: usize = 4;

//! Domain entities shared by the scanner, matcher, attendance logic and stores.

use crate::constants::DEFAULT_ATTENDANCE_THRESHOLD;
use crate::frame::Region;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal student identifier
pub type StudentId = u64;

/// Class session identifier
pub type ClassId = u64;

/// Behavior warning identifier
pub type WarningId = u64;

/// Enrolled student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    /// External student code, unique per school
    pub student_code: String,
    pub email: Option<String>,
    /// Reference photo location
    pub photo_ref: Option<String>,
    /// Precomputed face descriptor of the reference photo
    #[serde(default)]
    pub descriptor: Option<Vec<f32>>,
}

impl Student {
    #[must_use]
    pub fn has_photo(&self) -> bool {
        self.photo_ref.is_some()
    }
}

/// A class and its monitoring policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSession {
    pub id: ClassId,
    pub name: String,
    /// Planned duration in minutes
    pub duration_minutes: f64,
    /// Percent of the duration required for `present`
    pub attendance_threshold: f64,
    pub mobile_detection_enabled: bool,
    pub talking_detection_enabled: bool,
    pub is_active: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ClassSession {
    /// New idle class with the default policy
    #[must_use]
    pub fn new(id: ClassId, name: impl Into<String>, duration_minutes: f64) -> Self {
        Self {
            id,
            name: name.into(),
            duration_minutes,
            attendance_threshold: DEFAULT_ATTENDANCE_THRESHOLD,
            mobile_detection_enabled: true,
            talking_detection_enabled: true,
            is_active: false,
            started_at: None,
            ended_at: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.is_active {
            SessionPhase::Active
        } else if self.ended_at.is_some() {
            SessionPhase::Ended
        } else {
            SessionPhase::Idle
        }
    }
}

/// Lifecycle phase of a class session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Active,
    Ended,
}

/// Stored attendance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
        };
        f.write_str(label)
    }
}

/// Attendance of one student in one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub status: AttendanceStatus,
    /// Accrued presence in milliseconds, never decreases
    pub time_present_ms: u64,
    pub detection_count: u64,
    pub last_seen: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Kind of behavior warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningType {
    Mobile,
    Talking,
    NotDetected,
}

impl fmt::Display for WarningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mobile => "mobile",
            Self::Talking => "talking",
            Self::NotDetected => "not_detected",
        };
        f.write_str(label)
    }
}

/// Persisted warning about a student's behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorWarning {
    pub id: WarningId,
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub warning_type: WarningType,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Warning as submitted to the warning sink
#[derive(Debug, Clone, PartialEq)]
pub struct NewWarning {
    pub student_id: StudentId,
    pub class_id: ClassId,
    pub warning_type: WarningType,
    pub description: String,
}

/// Pixel-space box with fractional extents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Euclidean distance between box centers
    #[must_use]
    pub fn center_distance(&self, other: &Self) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        (ax - bx).hypot(ay - by)
    }
}

impl From<Region> for BoundingBox {
    fn from(region: Region) -> Self {
        Self {
            x: f64::from(region.x),
            y: f64::from(region.y),
            width: f64::from(region.width),
            height: f64::from(region.height),
        }
    }
}

/// Identity assigned to a detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub student_id: StudentId,
    pub student_name: String,
}

impl From<&Student> for Identity {
    fn from(student: &Student) -> Self {
        Self { student_id: student.id, student_name: student.name.clone() }
    }
}

/// Face found in one detection cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: BoundingBox,
    /// Scanning window that produced the detection
    pub window: Region,
    /// Heuristic score in `[0, 1]`
    pub score: f64,
    /// Confidence in `[0, 100]`
    pub confidence: f64,
    pub identity: Option<Identity>,
}

/// Kind of behavior a region was flagged for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    Mobile,
    Talking,
}

impl BehaviorKind {
    #[must_use]
    pub fn warning_type(self) -> WarningType {
        match self {
            Self::Mobile => WarningType::Mobile,
            Self::Talking => WarningType::Talking,
        }
    }

    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Mobile => "Mobile phone usage detected",
            Self::Talking => "Talking detected during class",
        }
    }
}

/// Behavior found in one detection cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedBehavior {
    pub kind: BehaviorKind,
    pub bbox: BoundingBox,
    pub score: f64,
    pub confidence: f64,
    pub identity: Option<Identity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_distance() {
        let a = BoundingBox { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = BoundingBox { x: 30.0, y: 40.0, width: 10.0, height: 10.0 };
        assert!((a.center_distance(&b) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_class_phase_transitions() {
        let mut class = ClassSession::new(1, "Algebra", 60.0);
        assert_eq!(class.phase(), SessionPhase::Idle);
        class.is_active = true;
        assert_eq!(class.phase(), SessionPhase::Active);
        class.is_active = false;
        class.ended_at = Some(Utc::now());
        assert_eq!(class.phase(), SessionPhase::Ended);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let yaml = serde_yaml::to_string(&WarningType::NotDetected).unwrap();
        assert_eq!(yaml.trim(), "not_detected");
        assert_eq!(AttendanceStatus::Late.to_string(), "late");
    }
}

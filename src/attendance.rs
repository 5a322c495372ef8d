//! Attendance accrual and finalization.
//!
//! A (student, class) pair moves `Unseen -> Tracked -> Finalized`. The first
//! detection creates a record, later detections accrue presence time, and
//! ending the class finalizes the status against the class policy.
//! "Not detected" is derived at query time and never stored.

use crate::constants::{LATE_FLOOR_PERCENT, NOT_DETECTED_AFTER_MINUTES};
use crate::model::{AttendanceRecord, AttendanceStatus, ClassId, ClassSession, StudentId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration as StdDuration;

const MILLIS_PER_MINUTE: f64 = 60_000.0;

/// Class-independent attendance policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendancePolicy {
    /// Minimum percentage for partial presence to count as late
    pub late_floor_percent: f64,
    /// Time since last sighting after which a tracked student shows as not detected
    pub not_detected_after: Duration,
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self {
            late_floor_percent: LATE_FLOOR_PERCENT,
            not_detected_after: Duration::minutes(NOT_DETECTED_AFTER_MINUTES),
        }
    }
}

/// Accrual state of one (student, class) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Unseen,
    Tracked,
    Finalized,
}

impl TrackingState {
    /// State implied by an optional stored record
    #[must_use]
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        match record {
            None => Self::Unseen,
            Some(r) if r.finalized_at.is_some() => Self::Finalized,
            Some(_) => Self::Tracked,
        }
    }
}

/// Status as shown to users, including the derived not-detected state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Present,
    Late,
    Absent,
    NotDetected,
}

impl From<AttendanceStatus> for DisplayStatus {
    fn from(status: AttendanceStatus) -> Self {
        match status {
            AttendanceStatus::Present => Self::Present,
            AttendanceStatus::Late => Self::Late,
            AttendanceStatus::Absent => Self::Absent,
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Present => "present",
            Self::Late => "late",
            Self::Absent => "absent",
            Self::NotDetected => "not_detected",
        };
        f.write_str(label)
    }
}

/// Presence as a percentage of the class duration; 0 for a zero-length class.
///
/// Computed from whole milliseconds so that presence of exactly the threshold
/// share of a class lands exactly on the threshold.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn attendance_percentage(time_present: StdDuration, duration_minutes: f64) -> f64 {
    if duration_minutes <= 0.0 {
        0.0
    } else {
        time_present.as_millis() as f64 * 100.0 / (duration_minutes * MILLIS_PER_MINUTE)
    }
}

/// Final status for accrued presence.
///
/// `present` at or above the threshold (inclusive), otherwise `late` for any
/// presence at or above the late floor, otherwise `absent`.
#[must_use]
pub fn finalize_status(
    time_present: StdDuration,
    duration_minutes: f64,
    threshold_percent: f64,
    late_floor_percent: f64,
) -> AttendanceStatus {
    if time_present.is_zero() {
        return AttendanceStatus::Absent;
    }

    let percentage = attendance_percentage(time_present, duration_minutes);
    if percentage >= threshold_percent {
        AttendanceStatus::Present
    } else if percentage >= late_floor_percent {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Absent
    }
}

impl AttendanceRecord {
    /// Record created by a student's first detection in a class
    #[must_use]
    pub fn first_detection(
        student_id: StudentId,
        class_id: ClassId,
        present_for: StdDuration,
        seen_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            class_id,
            status: AttendanceStatus::Present,
            time_present_ms: millis(present_for),
            detection_count: 1,
            last_seen: seen_at,
            finalized_at: None,
        }
    }

    /// Apply a later detection. Presence time and `last_seen` never go back.
    pub fn accrue(&mut self, present_for: StdDuration, seen_at: DateTime<Utc>) {
        self.time_present_ms = self.time_present_ms.saturating_add(millis(present_for));
        self.last_seen = self.last_seen.max(seen_at);
        self.detection_count += 1;
    }

    #[must_use]
    pub fn time_present(&self) -> StdDuration {
        StdDuration::from_millis(self.time_present_ms)
    }

    /// Accrued presence in minutes, for display
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn minutes_present(&self) -> f64 {
        self.time_present_ms as f64 / MILLIS_PER_MINUTE
    }

    #[must_use]
    pub fn tracking_state(&self) -> TrackingState {
        TrackingState::of(Some(self))
    }

    #[must_use]
    pub fn percentage(&self, class: &ClassSession) -> f64 {
        attendance_percentage(self.time_present(), class.duration_minutes)
    }

    /// Recompute the status from accrued time. Repeating it with the same
    /// inputs leaves the record unchanged; the first finalization time is kept.
    pub fn finalize(&mut self, class: &ClassSession, policy: &AttendancePolicy, now: DateTime<Utc>) -> AttendanceStatus {
        self.status = finalize_status(
            self.time_present(),
            class.duration_minutes,
            class.attendance_threshold,
            policy.late_floor_percent,
        );
        self.finalized_at.get_or_insert(now);
        self.status
    }

    /// Whether a tracked student has gone unseen for longer than the policy allows
    #[must_use]
    pub fn is_missing(&self, now: DateTime<Utc>, policy: &AttendancePolicy) -> bool {
        self.tracking_state() == TrackingState::Tracked && now - self.last_seen > policy.not_detected_after
    }

    /// Status for display at `now`
    #[must_use]
    pub fn display_status(&self, now: DateTime<Utc>, policy: &AttendancePolicy) -> DisplayStatus {
        if self.is_missing(now, policy) {
            DisplayStatus::NotDetected
        } else {
            self.status.into()
        }
    }
}

fn millis(duration: StdDuration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Per-class attendance counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub not_detected: usize,
    /// Mean attendance percentage over all records, 0 when there are none
    pub mean_percentage: f64,
}

impl ClassSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.present + self.late + self.absent + self.not_detected
    }
}

/// Summarize a class's records as displayed at `now`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(
    records: &[AttendanceRecord],
    class: &ClassSession,
    now: DateTime<Utc>,
    policy: &AttendancePolicy,
) -> ClassSummary {
    let mut summary = ClassSummary::default();
    for record in records {
        match record.display_status(now, policy) {
            DisplayStatus::Present => summary.present += 1,
            DisplayStatus::Late => summary.late += 1,
            DisplayStatus::Absent => summary.absent += 1,
            DisplayStatus::NotDetected => summary.not_detected += 1,
        }
    }

    if !records.is_empty() {
        let total: f64 = records.iter().map(|r| r.percentage(class)).sum();
        summary.mean_percentage = total / records.len() as f64;
    }
    summary
}

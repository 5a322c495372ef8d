//! Per-class detection session state.
//!
//! A [`DetectionSession`] owns everything one monitoring run carries between
//! cycles: the roster cache, the faces of the previous cycle, the matcher and
//! the random source. [`DetectionSession::analyze`] is pure with respect to the
//! backend and to the face cache; [`DetectionSession::accept`] moves a cycle's
//! faces into the cache and [`DetectionSession::commit`] is the only step that
//! writes to the backend.

use crate::config::Config;
use crate::frame::Frame;
use crate::matcher::{attribute_behaviors, warn_if_empty, DescriptorExtractor, IdentityMatcher, Roster};
use crate::model::{ClassSession, DetectedBehavior, DetectedFace, NewWarning, StudentId};
use crate::scanner::{ChannelSelection, RegionScanner};
use crate::store::{AttendanceRepository, RosterSource, WarningSink};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::RngCore;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Detections of one cycle after identity matching
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CycleOutcome {
    /// All faces, matched or not, in scan order
    pub faces: Vec<DetectedFace>,
    /// Behaviors attributed to a student of the previous cycle
    pub behaviors: Vec<DetectedBehavior>,
}

impl CycleOutcome {
    /// Distinct students seen in this cycle
    #[must_use]
    pub fn present_students(&self) -> BTreeSet<StudentId> {
        self.faces
            .iter()
            .filter_map(|f| f.identity.as_ref().map(|id| id.student_id))
            .collect()
    }
}

/// What a commit wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub detections_recorded: usize,
    pub warnings_emitted: usize,
    pub failures: usize,
}

/// Session-scoped detection state for one class
pub struct DetectionSession {
    class: ClassSession,
    scanner: RegionScanner,
    matcher: Box<dyn IdentityMatcher>,
    roster: Roster,
    last_faces: Vec<DetectedFace>,
    rng: Box<dyn RngCore + Send>,
    sample_interval: Duration,
    behavior_radius: f64,
    disposed: bool,
}

impl DetectionSession {
    /// Create a session with an empty roster
    #[must_use]
    pub fn new(
        class: ClassSession,
        scanner: RegionScanner,
        matcher: Box<dyn IdentityMatcher>,
        rng: Box<dyn RngCore + Send>,
        sample_interval: Duration,
        behavior_radius: f64,
    ) -> Self {
        Self {
            class,
            scanner,
            matcher,
            roster: Roster::new(),
            last_faces: Vec::new(),
            rng,
            sample_interval,
            behavior_radius,
            disposed: false,
        }
    }

    /// Create a session from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configured matcher cannot be built.
    pub fn from_config(
        class: ClassSession,
        config: &Config,
        extractor: Option<Box<dyn DescriptorExtractor>>,
    ) -> Result<Self> {
        let matcher = config.create_matcher(extractor)?;
        Ok(Self::new(
            class,
            config.create_scanner(),
            matcher,
            Box::new(config.create_rng()),
            config.sample_interval(),
            config.matching.behavior_radius,
        ))
    }

    #[must_use]
    pub fn class(&self) -> &ClassSession {
        &self.class
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Faces of the most recently accepted cycle
    #[must_use]
    pub fn last_faces(&self) -> &[DetectedFace] {
        &self.last_faces
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Reload the roster wholesale from `source`
    ///
    /// # Errors
    ///
    /// Returns `SessionState` after disposal, or the source's error. The
    /// previous roster is kept when loading fails.
    pub fn refresh_roster<S: RosterSource + ?Sized>(&mut self, source: &S) -> Result<usize> {
        self.ensure_live()?;
        let students = source.list_students_with_photos()?;
        self.roster.refresh(students);
        info!(
            "Loaded {} students for class {} ({} matching)",
            self.roster.len(),
            self.class.id,
            self.matcher.name()
        );
        warn_if_empty(&self.roster, self.matcher.as_ref());
        Ok(self.roster.len())
    }

    /// Scan `frame`, match faces, and attribute behaviors to the faces of the
    /// last accepted cycle. The face cache is left alone.
    ///
    /// # Errors
    ///
    /// Returns `SessionState` after disposal, or the matcher's error.
    pub fn analyze(&mut self, frame: &Frame) -> Result<CycleOutcome> {
        self.ensure_live()?;

        let channels = ChannelSelection {
            mobile: self.class.mobile_detection_enabled,
            talking: self.class.talking_detection_enabled,
        };
        let scan = self.scanner.scan(frame, channels, self.rng.as_mut());

        let mut faces = scan.faces.clone();
        let matched = self
            .matcher
            .assign(frame, &mut faces, &self.roster, self.rng.as_mut())?;

        let behaviors = attribute_behaviors(scan.behaviors().cloned(), &self.last_faces, self.behavior_radius);
        debug!(
            "Class {}: {} faces ({} matched), {} attributed behaviors",
            self.class.id,
            faces.len(),
            matched,
            behaviors.len()
        );

        Ok(CycleOutcome { faces, behaviors })
    }

    /// Make `outcome`'s faces the previous cycle for the next `analyze`
    pub fn accept(&mut self, outcome: &CycleOutcome) {
        if !self.disposed {
            self.last_faces.clone_from(&outcome.faces);
        }
    }

    /// Record presence for every matched student and a warning for every
    /// attributed behavior. Failures are logged and counted; the rest of the
    /// cycle is still written.
    pub fn commit<B>(&self, outcome: &CycleOutcome, backend: &B, now: DateTime<Utc>) -> CommitSummary
    where
        B: AttendanceRepository + WarningSink + ?Sized,
    {
        let mut summary = CommitSummary::default();

        for student_id in outcome.present_students() {
            match backend.record_detection(student_id, self.class.id, self.sample_interval, now) {
                Ok(_) => summary.detections_recorded += 1,
                Err(e) => {
                    warn!("Failed to record detection of student {student_id}: {e}");
                    summary.failures += 1;
                }
            }
        }

        for behavior in &outcome.behaviors {
            let Some(identity) = &behavior.identity else {
                continue;
            };
            let warning = NewWarning {
                student_id: identity.student_id,
                class_id: self.class.id,
                warning_type: behavior.kind.warning_type(),
                description: behavior.kind.describe().to_string(),
            };
            match backend.emit_warning(warning, now) {
                Ok(_) => summary.warnings_emitted += 1,
                Err(e) => {
                    warn!("Failed to emit {} warning for student {}: {e}", behavior.kind.warning_type(), identity.student_id);
                    summary.failures += 1;
                }
            }
        }

        summary
    }

    /// Drop cached state; the session rejects further use
    pub fn dispose(&mut self) {
        self.roster = Roster::new();
        self.last_faces.clear();
        self.disposed = true;
        debug!("Disposed detection session for class {}", self.class.id);
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::SessionState(format!(
                "detection session for class {} was disposed",
                self.class.id
            )))
        } else {
            Ok(())
        }
    }
}

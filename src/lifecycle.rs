//! Class session lifecycle.
//!
//! Start, end and finalize for the same class id are serialized with a
//! per-class async lock. Starting a class ends (and finalizes) whichever
//! class was active before.

use crate::attendance::AttendancePolicy;
use crate::config::Config;
use crate::matcher::DescriptorExtractor;
use crate::model::{AttendanceRecord, BehaviorWarning, ClassId, NewWarning, StudentId, WarningType};
use crate::session::DetectionSession;
use crate::store::{Backend, SessionTransition};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Serializes lifecycle operations per class and owns the not-detected sweep
pub struct SessionManager {
    backend: Arc<dyn Backend>,
    policy: AttendancePolicy,
    locks: Mutex<HashMap<ClassId, Arc<tokio::sync::Mutex<()>>>>,
    /// `last_seen` of the sighting each not-detected warning was raised for
    flagged: Mutex<HashMap<(ClassId, StudentId), DateTime<Utc>>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, policy: AttendancePolicy) -> Self {
        Self {
            backend,
            policy,
            locks: Mutex::default(),
            flagged: Mutex::default(),
        }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    #[must_use]
    pub fn policy(&self) -> &AttendancePolicy {
        &self.policy
    }

    fn class_lock(&self, id: ClassId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| Error::Runtime("class lock table poisoned".to_string()))?;
        Ok(Arc::clone(locks.entry(id).or_default()))
    }

    /// Start class `id`.
    ///
    /// Any class that was active is ended and finalized afterwards; a failure
    /// to finalize it is logged, since the new class has already started.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the class cannot be started.
    pub async fn start_class(&self, id: ClassId, now: DateTime<Utc>) -> Result<SessionTransition> {
        let transition = {
            let lock = self.class_lock(id)?;
            let _guard = lock.lock().await;
            self.backend.start_session(id, now)?
        };
        info!("Started class {} ({})", id, transition.started.name);

        for ended in &transition.force_ended {
            let lock = self.class_lock(ended.id)?;
            let _guard = lock.lock().await;
            match self.backend.finalize_attendance(ended.id, now) {
                Ok(records) => info!(
                    "Finalized {} records of force-ended class {}",
                    records.len(),
                    ended.id
                ),
                Err(e) => error!("Failed to finalize force-ended class {}: {}", ended.id, e),
            }
            self.forget_flags(ended.id);
        }

        Ok(transition)
    }

    /// End class `id` and finalize its attendance
    ///
    /// # Errors
    ///
    /// Returns an error if the class cannot be ended or if finalization fails.
    pub async fn end_class(&self, id: ClassId, now: DateTime<Utc>) -> Result<Vec<AttendanceRecord>> {
        let lock = self.class_lock(id)?;
        let _guard = lock.lock().await;

        let class = self.backend.end_session(id, now)?;
        info!("Ended class {} ({})", id, class.name);

        let records = self.backend.finalize_attendance(id, now).map_err(|e| {
            error!("Finalizing class {id} failed: {e}");
            e
        })?;
        self.forget_flags(id);
        Ok(records)
    }

    /// Re-run finalization for class `id`
    ///
    /// # Errors
    ///
    /// Returns the backend error if finalization fails.
    pub async fn finalize_class(&self, id: ClassId, now: DateTime<Utc>) -> Result<Vec<AttendanceRecord>> {
        let lock = self.class_lock(id)?;
        let _guard = lock.lock().await;
        self.backend.finalize_attendance(id, now)
    }

    /// Detection session for the active class `id`, with a freshly loaded roster
    ///
    /// # Errors
    ///
    /// Returns `SessionState` if the class is not active, or the error from
    /// building the matcher or loading the roster.
    pub fn open_session(
        &self,
        id: ClassId,
        config: &Config,
        extractor: Option<Box<dyn DescriptorExtractor>>,
    ) -> Result<DetectionSession> {
        let class = self.backend.get_class(id)?;
        if !class.is_active {
            return Err(Error::SessionState(format!("class {id} is not active")));
        }

        let mut session = DetectionSession::from_config(class, config, extractor)?;
        session.refresh_roster(self.backend.as_ref())?;
        Ok(session)
    }

    /// Raise a `not_detected` warning for every tracked student of class `id`
    /// unseen for longer than the policy allows. Each absence is flagged once;
    /// a new sighting starts a new episode. Stored statuses are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be read. Failed warnings are
    /// logged and retried on the next sweep.
    pub fn sweep_not_detected(&self, id: ClassId, now: DateTime<Utc>) -> Result<Vec<BehaviorWarning>> {
        let records = self.backend.records_for_class(id)?;
        let mut flagged = self
            .flagged
            .lock()
            .map_err(|_| Error::Runtime("not-detected table poisoned".to_string()))?;

        let mut emitted = Vec::new();
        for record in records.iter().filter(|r| r.is_missing(now, &self.policy)) {
            let key = (id, record.student_id);
            if flagged.get(&key) == Some(&record.last_seen) {
                continue;
            }

            let minutes = self.policy.not_detected_after.num_minutes();
            let warning = NewWarning {
                student_id: record.student_id,
                class_id: id,
                warning_type: WarningType::NotDetected,
                description: format!("Student not detected for more than {minutes} minutes"),
            };
            match self.backend.emit_warning(warning, now) {
                Ok(stored) => {
                    flagged.insert(key, record.last_seen);
                    emitted.push(stored);
                }
                Err(e) => warn!("Failed to emit not-detected warning for student {}: {}", record.student_id, e),
            }
        }
        Ok(emitted)
    }

    fn forget_flags(&self, id: ClassId) {
        if let Ok(mut flagged) = self.flagged.lock() {
            flagged.retain(|(class_id, _), _| *class_id != id);
        }
    }
}

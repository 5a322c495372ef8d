//! Collaborator interfaces consumed by the detection pipeline, plus an
//! in-memory implementation used by the CLI and the tests.

use crate::attendance::AttendancePolicy;
use crate::model::{
    AttendanceRecord, BehaviorWarning, ClassId, ClassSession, NewWarning, SessionPhase, Student,
    StudentId, WarningId,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Source of the matching roster
pub trait RosterSource: Send + Sync {
    /// All students that have a reference photo
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` when the roster cannot be read.
    fn list_students_with_photos(&self) -> Result<Vec<Student>>;
}

/// Result of starting a class
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTransition {
    /// The class that is now active
    pub started: ClassSession,
    /// Classes that were active before and have been ended
    pub force_ended: Vec<ClassSession>,
}

/// Class lookup and lifecycle transitions.
///
/// Implementations keep at most one class active at any time.
pub trait ClassRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown class.
    fn get_class(&self, id: ClassId) -> Result<ClassSession>;

    /// Activate `id`, ending any other active class
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown class and `SessionState` unless the
    /// class is idle.
    fn start_session(&self, id: ClassId, now: DateTime<Utc>) -> Result<SessionTransition>;

    /// End the active class `id`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown class and `SessionState` unless the
    /// class is active.
    fn end_session(&self, id: ClassId, now: DateTime<Utc>) -> Result<ClassSession>;
}

/// Attendance record persistence
pub trait AttendanceRepository: Send + Sync {
    /// Create or update the record of `student_id` in `class_id`
    ///
    /// # Errors
    ///
    /// Returns `SessionState` when the class is not active.
    fn record_detection(
        &self,
        student_id: StudentId,
        class_id: ClassId,
        present_for: Duration,
        seen_at: DateTime<Utc>,
    ) -> Result<AttendanceRecord>;

    /// Finalize every record of `class_id` and return them
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown class.
    fn finalize_attendance(&self, class_id: ClassId, now: DateTime<Utc>) -> Result<Vec<AttendanceRecord>>;

    /// Records of `class_id` ordered by student id
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` when the records cannot be read.
    fn records_for_class(&self, class_id: ClassId) -> Result<Vec<AttendanceRecord>>;
}

/// Append-only warning creation
pub trait WarningSink: Send + Sync {
    /// # Errors
    ///
    /// Returns `Collaborator` when the warning cannot be stored.
    fn emit_warning(&self, warning: NewWarning, now: DateTime<Utc>) -> Result<BehaviorWarning>;
}

/// Everything the pipeline needs from its collaborators
pub trait Backend: RosterSource + ClassRepository + AttendanceRepository + WarningSink {}

impl<T> Backend for T where T: RosterSource + ClassRepository + AttendanceRepository + WarningSink {}

/// Store operations that can be made to fail in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ListStudents,
    RecordDetection,
    FinalizeAttendance,
    EmitWarning,
}

#[derive(Debug, Default)]
struct StoreState {
    students: BTreeMap<StudentId, Student>,
    classes: BTreeMap<ClassId, ClassSession>,
    records: BTreeMap<(ClassId, StudentId), AttendanceRecord>,
    warnings: Vec<BehaviorWarning>,
    next_warning_id: WarningId,
    failing: HashSet<StoreOperation>,
}

impl StoreState {
    fn check(&self, op: StoreOperation) -> Result<()> {
        if self.failing.contains(&op) {
            Err(Error::Collaborator(format!("{op:?} unavailable")))
        } else {
            Ok(())
        }
    }

    fn class(&self, id: ClassId) -> Result<&ClassSession> {
        self.classes
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("class {id}")))
    }
}

/// In-memory collaborator with the admin operations the core does not own
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    policy: AttendancePolicy,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store finalizing with `policy`
    #[must_use]
    pub fn with_policy(policy: AttendancePolicy) -> Self {
        Self { state: Mutex::default(), policy }
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| Error::Collaborator("store lock poisoned".to_string()))
    }

    /// Enroll a student
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the id or student code is already taken.
    pub fn add_student(&self, student: Student) -> Result<()> {
        let mut state = self.lock()?;
        if state.students.contains_key(&student.id)
            || state.students.values().any(|s| s.student_code == student.student_code)
        {
            return Err(Error::InvalidInput(format!(
                "student {} ({}) already exists",
                student.id, student.student_code
            )));
        }
        state.students.insert(student.id, student);
        Ok(())
    }

    /// Register an idle class
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the id is taken or the class is not idle.
    pub fn add_class(&self, class: ClassSession) -> Result<()> {
        let mut state = self.lock()?;
        if state.classes.contains_key(&class.id) {
            return Err(Error::InvalidInput(format!("class {} already exists", class.id)));
        }
        if class.phase() != SessionPhase::Idle {
            return Err(Error::InvalidInput(format!("class {} must be created idle", class.id)));
        }
        state.classes.insert(class.id, class);
        Ok(())
    }

    /// Every class that is currently active
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the store is unusable.
    pub fn active_classes(&self) -> Result<Vec<ClassSession>> {
        Ok(self.lock()?.classes.values().filter(|c| c.is_active).cloned().collect())
    }

    /// Soft-delete a warning
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown warning id.
    pub fn dismiss_warning(&self, id: WarningId) -> Result<BehaviorWarning> {
        let mut state = self.lock()?;
        let warning = state
            .warnings
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| Error::NotFound(format!("warning {id}")))?;
        warning.is_active = false;
        Ok(warning.clone())
    }

    /// Undismissed warnings of a class, oldest first
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the store is unusable.
    pub fn active_warnings(&self, class_id: ClassId) -> Result<Vec<BehaviorWarning>> {
        Ok(self
            .lock()?
            .warnings
            .iter()
            .filter(|w| w.class_id == class_id && w.is_active)
            .cloned()
            .collect())
    }

    /// All warnings of a class, oldest first
    ///
    /// # Errors
    ///
    /// Returns `Collaborator` if the store is unusable.
    pub fn warnings(&self, class_id: ClassId) -> Result<Vec<BehaviorWarning>> {
        Ok(self
            .lock()?
            .warnings
            .iter()
            .filter(|w| w.class_id == class_id)
            .cloned()
            .collect())
    }

    /// Make `op` fail with a collaborator error until cleared
    pub fn set_failing(&self, op: StoreOperation, failing: bool) {
        if let Ok(mut state) = self.state.lock() {
            if failing {
                state.failing.insert(op);
            } else {
                state.failing.remove(&op);
            }
        }
    }
}

impl RosterSource for InMemoryStore {
    fn list_students_with_photos(&self) -> Result<Vec<Student>> {
        let state = self.lock()?;
        state.check(StoreOperation::ListStudents)?;
        Ok(state.students.values().filter(|s| s.has_photo()).cloned().collect())
    }
}

impl ClassRepository for InMemoryStore {
    fn get_class(&self, id: ClassId) -> Result<ClassSession> {
        self.lock()?.class(id).cloned()
    }

    fn start_session(&self, id: ClassId, now: DateTime<Utc>) -> Result<SessionTransition> {
        let mut state = self.lock()?;
        match state.class(id)?.phase() {
            SessionPhase::Idle => {}
            SessionPhase::Active => {
                return Err(Error::SessionState(format!("class {id} is already active")));
            }
            SessionPhase::Ended => {
                return Err(Error::SessionState(format!("class {id} has already ended")));
            }
        }

        let mut force_ended = Vec::new();
        for class in state.classes.values_mut().filter(|c| c.is_active) {
            class.is_active = false;
            class.ended_at = Some(now);
            info!("Force-ended class {} ({})", class.id, class.name);
            force_ended.push(class.clone());
        }

        let class = state
            .classes
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("class {id}")))?;
        class.is_active = true;
        class.started_at = Some(now);

        Ok(SessionTransition { started: class.clone(), force_ended })
    }

    fn end_session(&self, id: ClassId, now: DateTime<Utc>) -> Result<ClassSession> {
        let mut state = self.lock()?;
        let class = state
            .classes
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("class {id}")))?;
        if !class.is_active {
            return Err(Error::SessionState(format!("class {id} is not active")));
        }
        class.is_active = false;
        class.ended_at = Some(now);
        Ok(class.clone())
    }
}

impl AttendanceRepository for InMemoryStore {
    fn record_detection(
        &self,
        student_id: StudentId,
        class_id: ClassId,
        present_for: Duration,
        seen_at: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        let mut state = self.lock()?;
        state.check(StoreOperation::RecordDetection)?;
        if !state.class(class_id)?.is_active {
            return Err(Error::SessionState(format!("class {class_id} is not active")));
        }
        if !state.students.contains_key(&student_id) {
            return Err(Error::NotFound(format!("student {student_id}")));
        }

        let record = state
            .records
            .entry((class_id, student_id))
            .and_modify(|r| r.accrue(present_for, seen_at))
            .or_insert_with(|| {
                debug!("Tracking student {student_id} in class {class_id}");
                AttendanceRecord::first_detection(student_id, class_id, present_for, seen_at)
            });
        Ok(record.clone())
    }

    fn finalize_attendance(&self, class_id: ClassId, now: DateTime<Utc>) -> Result<Vec<AttendanceRecord>> {
        let mut state = self.lock()?;
        state.check(StoreOperation::FinalizeAttendance)?;
        let class = state.class(class_id)?.clone();

        let finalized: Vec<AttendanceRecord> = state
            .records
            .range_mut((class_id, StudentId::MIN)..=(class_id, StudentId::MAX))
            .map(|(_, record)| {
                record.finalize(&class, &self.policy, now);
                record.clone()
            })
            .collect();

        info!("Finalized {} attendance records for class {class_id}", finalized.len());
        Ok(finalized)
    }

    fn records_for_class(&self, class_id: ClassId) -> Result<Vec<AttendanceRecord>> {
        Ok(self
            .lock()?
            .records
            .range((class_id, StudentId::MIN)..=(class_id, StudentId::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }
}

impl WarningSink for InMemoryStore {
    fn emit_warning(&self, warning: NewWarning, now: DateTime<Utc>) -> Result<BehaviorWarning> {
        let mut state = self.lock()?;
        state.check(StoreOperation::EmitWarning)?;
        state.next_warning_id += 1;
        let stored = BehaviorWarning {
            id: state.next_warning_id,
            student_id: warning.student_id,
            class_id: warning.class_id,
            warning_type: warning.warning_type,
            description: warning.description,
            is_active: true,
            created_at: now,
        };
        state.warnings.push(stored.clone());
        Ok(stored)
    }
}

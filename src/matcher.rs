//! Identity matching for detected faces and behaviors.
//!
//! Two interchangeable strategies sit behind [`IdentityMatcher`]:
//!
//! - [`OrdinalMatcher`] assigns the i-th face (scan order) to the i-th
//!   roster student. It ignores appearance entirely.
//! - [`DescriptorMatcher`] extracts a face descriptor through an injected
//!   [`DescriptorExtractor`] and picks the nearest stored student descriptor
//!   under a distance threshold.
//!
//! A deployment picks one strategy; the matchers never fall back to each other.
//! Behaviors are attributed separately with [`attribute_behaviors`].

use crate::constants::{ORDINAL_CONFIDENCE_MAX, ORDINAL_CONFIDENCE_MIN};
use crate::frame::{Frame, Region};
use crate::model::{DetectedBehavior, DetectedFace, Identity, Student, StudentId};
use crate::{Error, Result};
use log::{debug, warn};
use ndarray::Array1;
use rand::{Rng, RngCore};

/// Students eligible for matching: those with a reference photo
#[derive(Debug, Clone, Default)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Roster built from `students`, keeping those with photos
    #[must_use]
    pub fn from_students(students: impl IntoIterator<Item = Student>) -> Self {
        let mut roster = Self::new();
        roster.refresh(students);
        roster
    }

    /// Replace the roster wholesale
    pub fn refresh(&mut self, students: impl IntoIterator<Item = Student>) {
        self.students.clear();
        self.students.extend(students.into_iter().filter(Student::has_photo));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.students.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Students in enumeration order
    #[must_use]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    #[must_use]
    pub fn get(&self, id: StudentId) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }
}

/// Trait for face identity matchers
pub trait IdentityMatcher: Send {
    /// Set `identity` (and confidence) on the faces that match a roster
    /// student, returning how many matched. Faces already carrying an
    /// identity are overwritten.
    ///
    /// # Errors
    ///
    /// Returns `Matcher` when the strategy itself fails, e.g. the
    /// descriptor extractor errors.
    fn assign(
        &self,
        frame: &Frame,
        faces: &mut [DetectedFace],
        roster: &Roster,
        rng: &mut dyn RngCore,
    ) -> Result<usize>;

    /// Get matcher name
    fn name(&self) -> &str;
}

/// Matches faces to students by position in the roster
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdinalMatcher;

impl OrdinalMatcher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IdentityMatcher for OrdinalMatcher {
    fn assign(
        &self,
        _frame: &Frame,
        faces: &mut [DetectedFace],
        roster: &Roster,
        rng: &mut dyn RngCore,
    ) -> Result<usize> {
        let mut matched = 0;
        for (face, student) in faces.iter_mut().zip(roster.students()) {
            face.identity = Some(Identity::from(student));
            face.confidence = rng.gen_range(ORDINAL_CONFIDENCE_MIN..ORDINAL_CONFIDENCE_MAX);
            matched += 1;
        }
        Ok(matched)
    }

    fn name(&self) -> &str {
        "ordinal"
    }
}

/// Computes a face descriptor for a region of a frame
pub trait DescriptorExtractor: Send + Sync {
    /// Descriptor of the face inside `region`, or `None` when no face
    /// can be described there
    ///
    /// # Errors
    ///
    /// Returns an error when extraction fails outright.
    fn extract(&self, frame: &Frame, region: Region) -> Result<Option<Array1<f32>>>;
}

/// Matches faces to the nearest stored student descriptor
pub struct DescriptorMatcher {
    extractor: Box<dyn DescriptorExtractor>,
    threshold: f32,
}

impl DescriptorMatcher {
    /// Create a matcher accepting distances strictly below `threshold`
    #[must_use]
    pub fn new(extractor: Box<dyn DescriptorExtractor>, threshold: f32) -> Self {
        Self { extractor, threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

/// Euclidean distance between two descriptors of equal length
///
/// # Errors
///
/// Returns `Matcher` if the lengths differ.
pub fn descriptor_distance(a: &Array1<f32>, b: &Array1<f32>) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::Matcher(format!(
            "Descriptor length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let diff = a - b;
    Ok(diff.dot(&diff).sqrt())
}

impl IdentityMatcher for DescriptorMatcher {
    fn assign(
        &self,
        frame: &Frame,
        faces: &mut [DetectedFace],
        roster: &Roster,
        _rng: &mut dyn RngCore,
    ) -> Result<usize> {
        let known: Vec<(&Student, Array1<f32>)> = roster
            .students()
            .iter()
            .filter_map(|s| s.descriptor.as_ref().map(|d| (s, Array1::from_vec(d.clone()))))
            .collect();

        if known.is_empty() {
            debug!("No stored descriptors in roster of {}", roster.len());
            return Ok(0);
        }

        let mut claimed = vec![false; known.len()];
        let mut matched = 0;

        for face in faces.iter_mut() {
            let Some(descriptor) = self
                .extractor
                .extract(frame, face.window)
                .map_err(|e| Error::Matcher(format!("Descriptor extraction failed: {e}")))?
            else {
                continue;
            };

            let mut best: Option<(usize, f32)> = None;
            for (idx, (_, stored)) in known.iter().enumerate() {
                if claimed[idx] {
                    continue;
                }
                let distance = descriptor_distance(&descriptor, stored)?;
                if distance < self.threshold && best.map_or(true, |(_, d)| distance < d) {
                    best = Some((idx, distance));
                }
            }

            if let Some((idx, distance)) = best {
                claimed[idx] = true;
                face.identity = Some(Identity::from(known[idx].0));
                face.confidence = f64::from((1.0 - distance).clamp(0.0, 1.0)) * 100.0;
                matched += 1;
            }
        }

        Ok(matched)
    }

    fn name(&self) -> &str {
        "descriptor"
    }
}

/// Attribute each behavior to the nearest face of the previous cycle.
/// Behaviors whose nearest face is `radius` or more away (center to center),
/// or has no identity, are dropped.
#[must_use]
pub fn attribute_behaviors(
    behaviors: impl IntoIterator<Item = DetectedBehavior>,
    last_faces: &[DetectedFace],
    radius: f64,
) -> Vec<DetectedBehavior> {
    behaviors
        .into_iter()
        .filter_map(|mut behavior| {
            let nearest = last_faces
                .iter()
                .map(|face| (face, behavior.bbox.center_distance(&face.bbox)))
                .fold(None, |best: Option<(&DetectedFace, f64)>, (face, d)| match best {
                    Some((_, best_d)) if best_d <= d => best,
                    _ => Some((face, d)),
                });

            match nearest {
                Some((DetectedFace { identity: Some(identity), .. }, distance)) if distance < radius => {
                    behavior.identity = Some(identity.clone());
                    Some(behavior)
                }
                _ => {
                    debug!("Dropping unattributed {:?} behavior", behavior.kind);
                    None
                }
            }
        })
        .collect()
}

/// Log once when matching cannot produce identities
pub(crate) fn warn_if_empty(roster: &Roster, matcher: &dyn IdentityMatcher) {
    if roster.is_empty() {
        warn!(
            "Roster has no students with photos; {} matching will assign no identities",
            matcher.name()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Rgb;
    use crate::model::{BehaviorKind, BoundingBox};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn student(id: StudentId, photo: bool) -> Student {
        Student {
            id,
            name: format!("Student {id}"),
            student_code: format!("S{id:03}"),
            email: None,
            photo_ref: photo.then(|| format!("photos/{id}.jpg")),
            descriptor: None,
        }
    }

    fn face_at(x: f64, y: f64) -> DetectedFace {
        DetectedFace {
            bbox: BoundingBox { x, y, width: 80.0, height: 100.0 },
            window: Region::new(0, 0, 60, 60),
            score: 1.0,
            confidence: 100.0,
            identity: None,
        }
    }

    #[test]
    fn test_roster_keeps_students_with_photos() {
        let mut roster = Roster::from_students(vec![student(1, true), student(2, false), student(3, true)]);
        assert_eq!(roster.len(), 2);
        assert!(roster.get(2).is_none());

        roster.refresh(vec![student(4, true)]);
        assert_eq!(roster.students()[0].id, 4);
        assert!(roster.get(1).is_none());
    }

    #[test]
    fn test_ordinal_confidence_range() {
        let frame = Frame::filled(4, 4, Rgb::new(0, 0, 0)).unwrap();
        let roster = Roster::from_students((1..=3).map(|id| student(id, true)));
        let mut faces = vec![face_at(0.0, 0.0); 3];
        let mut rng = StdRng::seed_from_u64(11);

        let matched = OrdinalMatcher::new().assign(&frame, &mut faces, &roster, &mut rng).unwrap();
        assert_eq!(matched, 3);
        for face in &faces {
            assert!((75.0..95.0).contains(&face.confidence));
        }
    }

    #[test]
    fn test_ordinal_empty_roster_matches_nothing() {
        let frame = Frame::filled(4, 4, Rgb::new(0, 0, 0)).unwrap();
        let mut faces = vec![face_at(0.0, 0.0); 2];
        let mut rng = StdRng::seed_from_u64(0);
        let matched = OrdinalMatcher::new().assign(&frame, &mut faces, &Roster::new(), &mut rng).unwrap();
        assert_eq!(matched, 0);
        assert!(faces.iter().all(|f| f.identity.is_none()));
    }

    #[test]
    fn test_descriptor_distance() {
        let a = Array1::from_vec(vec![0.0f32, 3.0]);
        let b = Array1::from_vec(vec![4.0f32, 0.0]);
        assert!((descriptor_distance(&a, &b).unwrap() - 5.0).abs() < 1e-6);
        assert!(descriptor_distance(&a, &Array1::zeros(3)).is_err());
    }

    #[test]
    fn test_attribution_prefers_nearest_face() {
        let mut near = face_at(100.0, 100.0);
        near.identity = Some(Identity { student_id: 1, student_name: "A".into() });
        let mut far = face_at(250.0, 100.0);
        far.identity = Some(Identity { student_id: 2, student_name: "B".into() });

        let behavior = DetectedBehavior {
            kind: BehaviorKind::Mobile,
            bbox: BoundingBox { x: 120.0, y: 110.0, width: 40.0, height: 80.0 },
            score: 0.9,
            confidence: 90.0,
            identity: None,
        };

        let attributed = attribute_behaviors(vec![behavior], &[far, near], 200.0);
        assert_eq!(attributed.len(), 1);
        assert_eq!(attributed[0].identity.as_ref().unwrap().student_id, 1);
    }
}

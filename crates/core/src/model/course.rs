use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AssessmentId, CourseId, LessonId, ModuleId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("video lesson is missing a video url")]
    MissingVideoUrl,

    #[error("quiz lesson is missing an assessment id")]
    MissingAssessmentId,

    #[error("duplicate lesson id: {0}")]
    DuplicateLessonId(LessonId),
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// Kind of content a lesson carries, which decides the engine that drives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonType {
    Video,
    Quiz,
    Text,
}

/// A single unit of course content belonging to a module.
///
/// A lesson may carry its owning module id directly; when absent the owning
/// module is resolved by scanning the course outline in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    module_id: Option<ModuleId>,
    title: String,
    lesson_type: LessonType,
    video_url: Option<String>,
    assessment_id: Option<AssessmentId>,
    duration_secs: Option<u32>,
}

impl Lesson {
    /// Creates a video lesson.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::MissingVideoUrl` if the url is empty.
    pub fn video(
        id: LessonId,
        title: impl Into<String>,
        video_url: impl Into<String>,
        duration_secs: Option<u32>,
    ) -> Result<Self, CourseError> {
        let video_url = video_url.into();
        if video_url.trim().is_empty() {
            return Err(CourseError::MissingVideoUrl);
        }
        Ok(Self {
            id,
            module_id: None,
            title: title.into(),
            lesson_type: LessonType::Video,
            video_url: Some(video_url),
            assessment_id: None,
            duration_secs,
        })
    }

    /// Creates a quiz lesson backed by an assessment.
    #[must_use]
    pub fn quiz(id: LessonId, title: impl Into<String>, assessment_id: AssessmentId) -> Self {
        Self {
            id,
            module_id: None,
            title: title.into(),
            lesson_type: LessonType::Quiz,
            video_url: None,
            assessment_id: Some(assessment_id),
            duration_secs: None,
        }
    }

    /// Creates a text/content-only lesson (manual completion only).
    #[must_use]
    pub fn text(id: LessonId, title: impl Into<String>) -> Self {
        Self {
            id,
            module_id: None,
            title: title.into(),
            lesson_type: LessonType::Text,
            video_url: None,
            assessment_id: None,
            duration_secs: None,
        }
    }

    /// Attaches the owning module id directly to the lesson.
    #[must_use]
    pub fn with_module(mut self, module_id: ModuleId) -> Self {
        self.module_id = Some(module_id);
        self
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn module_id(&self) -> Option<&ModuleId> {
        self.module_id.as_ref()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn lesson_type(&self) -> LessonType {
        self.lesson_type
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    #[must_use]
    pub fn assessment_id(&self) -> Option<&AssessmentId> {
        self.assessment_id.as_ref()
    }

    #[must_use]
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration_secs
    }
}

//
// ─── MODULE & OUTLINE ──────────────────────────────────────────────────────────
//

/// An ordered group of lessons within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    id: ModuleId,
    title: String,
    lessons: Vec<Lesson>,
}

impl Module {
    #[must_use]
    pub fn new(id: ModuleId, title: impl Into<String>, lessons: Vec<Lesson>) -> Self {
        Self {
            id,
            title: title.into(),
            lessons,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }
}

/// The module/lesson tree for one course, as hydrated from the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOutline {
    course_id: CourseId,
    title: String,
    modules: Vec<Module>,
}

impl CourseOutline {
    /// Builds an outline, rejecting empty titles and duplicate lesson ids.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` or `CourseError::DuplicateLessonId`.
    pub fn new(
        course_id: CourseId,
        title: impl Into<String>,
        modules: Vec<Module>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }

        let mut seen = std::collections::HashSet::new();
        for module in &modules {
            for lesson in module.lessons() {
                if !seen.insert(lesson.id().clone()) {
                    return Err(CourseError::DuplicateLessonId(lesson.id().clone()));
                }
            }
        }

        Ok(Self {
            course_id,
            title,
            modules,
        })
    }

    #[must_use]
    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Finds a lesson anywhere in the outline.
    #[must_use]
    pub fn lesson(&self, lesson_id: &LessonId) -> Option<&Lesson> {
        self.modules
            .iter()
            .flat_map(|m| m.lessons().iter())
            .find(|l| l.id() == lesson_id)
    }

    /// Resolves the module that owns a lesson.
    ///
    /// A lesson carrying its module id wins outright; otherwise the first
    /// module in traversal order containing the lesson is the owner, so the
    /// result is deterministic even if the outline is malformed.
    #[must_use]
    pub fn module_for_lesson(&self, lesson_id: &LessonId) -> Option<&ModuleId> {
        let lesson = self.lesson(lesson_id)?;
        if let Some(module_id) = lesson.module_id() {
            return Some(module_id);
        }
        self.modules
            .iter()
            .find(|m| m.lessons().iter().any(|l| l.id() == lesson_id))
            .map(Module::id)
    }

    /// Lessons flattened in module order; the canonical navigation sequence.
    #[must_use]
    pub fn flattened(&self) -> Vec<&Lesson> {
        self.modules
            .iter()
            .flat_map(|m| m.lessons().iter())
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn outline() -> CourseOutline {
        let m1 = Module::new(
            ModuleId::new("m1"),
            "Foundations",
            vec![
                Lesson::video(LessonId::new("l1"), "Intro", "https://v/1", Some(600)).unwrap(),
                Lesson::text(LessonId::new("l2"), "Reading"),
            ],
        );
        let m2 = Module::new(
            ModuleId::new("m2"),
            "Practice",
            vec![Lesson::quiz(
                LessonId::new("l3"),
                "Checkpoint",
                AssessmentId::new("a1"),
            )],
        );
        CourseOutline::new(CourseId::new("c1"), "Course", vec![m1, m2]).unwrap()
    }

    #[test]
    fn module_resolution_prefers_direct_id() {
        let lesson = Lesson::text(LessonId::new("lx"), "Stray").with_module(ModuleId::new("m9"));
        let module = Module::new(ModuleId::new("m1"), "M", vec![lesson]);
        let outline = CourseOutline::new(CourseId::new("c"), "C", vec![module]).unwrap();

        assert_eq!(
            outline.module_for_lesson(&LessonId::new("lx")),
            Some(&ModuleId::new("m9"))
        );
    }

    #[test]
    fn module_resolution_falls_back_to_first_containing_module() {
        let outline = outline();
        assert_eq!(
            outline.module_for_lesson(&LessonId::new("l3")),
            Some(&ModuleId::new("m2"))
        );
        assert_eq!(outline.module_for_lesson(&LessonId::new("missing")), None);
    }

    #[test]
    fn flattened_preserves_module_order() {
        let ids: Vec<_> = outline()
            .flattened()
            .iter()
            .map(|l| l.id().as_str().to_owned())
            .collect();
        assert_eq!(ids, ["l1", "l2", "l3"]);
    }

    #[test]
    fn duplicate_lesson_ids_are_rejected() {
        let m = Module::new(
            ModuleId::new("m1"),
            "M",
            vec![
                Lesson::text(LessonId::new("dup"), "A"),
                Lesson::text(LessonId::new("dup"), "B"),
            ],
        );
        let err = CourseOutline::new(CourseId::new("c"), "C", vec![m]).unwrap_err();
        assert!(matches!(err, CourseError::DuplicateLessonId(_)));
    }

    #[test]
    fn video_lesson_requires_url() {
        let err = Lesson::video(LessonId::new("l"), "T", "   ", None).unwrap_err();
        assert!(matches!(err, CourseError::MissingVideoUrl));
    }
}

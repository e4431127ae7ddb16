//! Flattened lesson ordering for prev/next navigation.

use portal_core::model::{CourseOutline, LessonId};

/// Course-wide lesson order, flattened across modules once at construction.
#[derive(Debug, Clone)]
pub struct LessonNavigation {
    order: Vec<LessonId>,
}

impl LessonNavigation {
    #[must_use]
    pub fn from_outline(outline: &CourseOutline) -> Self {
        Self {
            order: outline
                .flattened()
                .into_iter()
                .map(|lesson| lesson.id().clone())
                .collect(),
        }
    }

    #[must_use]
    pub fn order(&self) -> &[LessonId] {
        &self.order
    }

    #[must_use]
    pub fn position(&self, lesson_id: &LessonId) -> Option<usize> {
        self.order.iter().position(|id| id == lesson_id)
    }

    /// Lesson preceding `lesson_id` in course order, if any.
    #[must_use]
    pub fn prev(&self, lesson_id: &LessonId) -> Option<&LessonId> {
        let index = self.position(lesson_id)?;
        index.checked_sub(1).map(|i| &self.order[i])
    }

    /// Lesson following `lesson_id` in course order, if any.
    #[must_use]
    pub fn next(&self, lesson_id: &LessonId) -> Option<&LessonId> {
        let index = self.position(lesson_id)?;
        self.order.get(index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::model::{CourseId, Lesson, Module, ModuleId};

    fn build_outline() -> CourseOutline {
        let m1 = Module::new(
            ModuleId::new("m1"),
            "Basics",
            vec![
                Lesson::text(LessonId::new("l1"), "Welcome"),
                Lesson::text(LessonId::new("l2"), "Setup"),
            ],
        );
        let m2 = Module::new(
            ModuleId::new("m2"),
            "Advanced",
            vec![Lesson::text(LessonId::new("l3"), "Wrap up")],
        );
        CourseOutline::new(CourseId::new("c1"), "Course", vec![m1, m2]).expect("valid outline")
    }

    #[test]
    fn prev_next_cross_module_boundaries() {
        let nav = LessonNavigation::from_outline(&build_outline());
        assert_eq!(nav.prev(&LessonId::new("l1")), None);
        assert_eq!(nav.next(&LessonId::new("l2")), Some(&LessonId::new("l3")));
        assert_eq!(nav.prev(&LessonId::new("l3")), Some(&LessonId::new("l2")));
        assert_eq!(nav.next(&LessonId::new("l3")), None);
        assert_eq!(nav.position(&LessonId::new("unknown")), None);
    }
}

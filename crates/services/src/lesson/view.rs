//! Render-ready course tree with completion and lock flags.

use std::collections::HashSet;

use portal_core::model::{CourseOutline, LessonId, LessonType};
use serde::Serialize;

/// One lesson row in the course tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonNodeView {
    pub id: LessonId,
    pub title: String,
    pub lesson_type: LessonType,
    pub is_completed: bool,
    /// Set under sequential unlock when an earlier lesson is incomplete.
    pub is_locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleView {
    pub title: String,
    pub lessons: Vec<LessonNodeView>,
}

/// The whole course, in outline order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseTreeView {
    pub title: String,
    pub modules: Vec<ModuleView>,
}

impl CourseTreeView {
    /// Builds the tree from the outline and the learner's completed set.
    ///
    /// With `sequential_unlock`, a lesson is locked while any lesson before
    /// it in flattened course order is incomplete. The first lesson is never
    /// locked.
    #[must_use]
    pub fn build(
        outline: &CourseOutline,
        completed: &HashSet<LessonId>,
        sequential_unlock: bool,
    ) -> Self {
        let mut all_prior_complete = true;
        let modules = outline
            .modules()
            .iter()
            .map(|module| ModuleView {
                title: module.title().to_owned(),
                lessons: module
                    .lessons()
                    .iter()
                    .map(|lesson| {
                        let is_completed = completed.contains(lesson.id());
                        let is_locked = sequential_unlock && !all_prior_complete;
                        all_prior_complete = all_prior_complete && is_completed;
                        LessonNodeView {
                            id: lesson.id().clone(),
                            title: lesson.title().to_owned(),
                            lesson_type: lesson.lesson_type(),
                            is_completed,
                            is_locked,
                        }
                    })
                    .collect(),
            })
            .collect();
        Self {
            title: outline.title().to_owned(),
            modules,
        }
    }

    /// All lesson rows in course order.
    pub fn lessons(&self) -> impl Iterator<Item = &LessonNodeView> {
        self.modules.iter().flat_map(|module| module.lessons.iter())
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
    fn sequential_unlock_locks_everything_after_first_gap() {
        let outline = build_outline();
        let completed: HashSet<_> = [LessonId::new("l1")].into();
        let tree = CourseTreeView::build(&outline, &completed, true);

        let locks: Vec<_> = tree.lessons().map(|l| l.is_locked).collect();
        assert_eq!(locks, vec![false, false, true]);
    }

    #[test]
    fn free_navigation_never_locks() {
        let outline = build_outline();
        let tree = CourseTreeView::build(&outline, &HashSet::new(), false);
        assert!(tree.lessons().all(|l| !l.is_locked));
        assert!(tree.lessons().all(|l| !l.is_completed));
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an id from a store-issued string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

string_id!(
    /// Unique identifier for an enrolled learner.
    LearnerId
);
string_id!(
    /// Unique identifier for a course.
    CourseId
);
string_id!(
    /// Unique identifier for a module within a course.
    ModuleId
);
string_id!(
    /// Unique identifier for a lesson within a module.
    LessonId
);
string_id!(
    /// Unique identifier for an assessment.
    AssessmentId
);
string_id!(
    /// Unique identifier for a question within an assessment.
    QuestionId
);
string_id!(
    /// Unique identifier for a choice option within a question.
    OptionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_and_display() {
        let id = LessonId::new("lesson-42");
        assert_eq!(id.as_str(), "lesson-42");
        assert_eq!(id.to_string(), "lesson-42");
        assert_eq!(format!("{id:?}"), "LessonId(lesson-42)");
        assert_eq!(LessonId::from("lesson-42"), id);
    }

    #[test]
    fn ids_of_different_kinds_are_distinct_types() {
        // Compile-time property; the assertion just keeps the test meaningful.
        let lesson = LessonId::new("x");
        let module = ModuleId::new("x");
        assert_eq!(lesson.as_str(), module.as_str());
    }
}

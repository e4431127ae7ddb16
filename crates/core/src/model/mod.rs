pub mod assessment;
pub mod course;
pub mod ids;
pub mod progress;
pub mod settings;

pub use assessment::{
    AnswerMap, AnswerValue, Assessment, AssessmentDraft, AssessmentError, AssessmentSubmission,
    Question, QuestionOption, QuestionType,
};
pub use course::{CourseError, CourseOutline, Lesson, LessonType, Module};
pub use ids::{
    AssessmentId, CourseId, LearnerId, LessonId, ModuleId, OptionId, QuestionId,
};
pub use progress::{LessonProgress, ProgressUpdate};
pub use settings::{EngineSettings, SettingsError};

mod navigation;
mod orchestrator;
mod video;
mod view;

pub use navigation::LessonNavigation;
pub use orchestrator::{ActiveLesson, LessonOrchestrator, PlayerFactory};
pub use video::{VideoEngine, VideoSignal};
pub use view::{CourseTreeView, LessonNodeView, ModuleView};

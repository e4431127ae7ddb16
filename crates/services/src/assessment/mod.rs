mod runner;
mod session;

pub use runner::{AssessmentOpening, AssessmentRunner, AssessmentView};
pub use session::{AssessmentSession, SessionPhase};

use thiserror::Error;

use crate::model::{AssessmentError, CourseError, SettingsError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Assessment(#[from] AssessmentError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

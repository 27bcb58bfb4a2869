use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    #[error("missing action")]
    MissingAction,

    #[error("invalid action: {0}")]
    InvalidAction(String),
}

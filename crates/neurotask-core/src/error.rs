use thiserror::Error;

/// Validation failures surfaced straight
/// to the user. Nothing is mutated when
/// one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
  #[error("Please enter a task title")]
  EmptyTitle,

  #[error("Please describe your task")]
  EmptyText,

  #[error("invalid priority: {0}")]
  InvalidPriority(String),

  #[error("invalid due date: {0}")]
  InvalidDue(String)
}

//! Transactional orchestration of the approval state machine.

pub mod project;

pub use project::{DeleteOutcome, ProjectWorkflow, UpdateOutcome};

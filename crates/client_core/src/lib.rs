//! Workflow state machine for turning news headlines into generated artwork.

pub mod export;
pub mod progress;
pub mod state;
mod workflow;

pub use export::{export_media, suggested_file_name, ExportError};
pub use state::{Action, MediaEdit, PromptEdit, TransitionError, WorkflowState};
pub use workflow::{compose_instruction, ExportFailure, Workflow, WorkflowEvent};

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;

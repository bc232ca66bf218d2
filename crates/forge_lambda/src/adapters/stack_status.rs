use thiserror::Error;

pub const STACK_DELETE_IN_PROGRESS: &str = "DELETE_IN_PROGRESS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not fetch the status of stack {stack_id}: {message}")]
pub struct StackStatusError {
    pub stack_id: String,
    pub message: String,
}

pub trait StackStatusSource {
    fn stack_status(&self, stack_id: &str) -> Result<String, StackStatusError>;
}

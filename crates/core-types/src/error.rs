use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Entity index {0} is out of range")]
    UnknownEntity(usize),

    #[error("Entity '{0}' has no peers in its group")]
    NoPeerGroup(String),
}

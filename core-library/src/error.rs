use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    /// The remote catalogue could not be reached or answered with garbage.
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// The collaborator does not implement the requested operation.
    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

impl LibraryError {
    pub fn not_found(entity_type: &str, id: &str) -> Self {
        LibraryError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;

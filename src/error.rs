use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradebookError {
    #[error("DATABASE_URL must be set to a production Postgres instance")]
    MissingDatabaseUrl,

    #[error("GRADEBOOK_MAX_CONNECTIONS must be a positive integer, got {0:?}")]
    InvalidPoolSize(String),

    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    #[error("student not found: {0}")]
    StudentNotFound(String),
}

use thiserror::Error;

/// Failure to bring up a test fixture.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("fixture container failed: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
    #[error("fixture database failed: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

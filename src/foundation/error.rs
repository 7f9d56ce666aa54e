pub type SquarepostResult<T> = Result<T, SquarepostError>;

#[derive(thiserror::Error, Debug)]
pub enum SquarepostError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("storage quota exceeded: {0}")]
    StorageFull(String),

    #[error("nothing to export")]
    EmptyExport,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SquarepostError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn missing_config(msg: impl Into<String>) -> Self {
        Self::MissingConfig(msg.into())
    }

    pub fn storage_full(msg: impl Into<String>) -> Self {
        Self::StorageFull(msg.into())
    }
}

pub type StagecueResult<T> = Result<T, StagecueError>;

#[derive(thiserror::Error, Debug)]
pub enum StagecueError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("choreography error: {0}")]
    Choreography(String),

    #[error("load failed for asset '{id}' ({url}) after {attempts} attempts: {last_error}")]
    LoadExhausted {
        id: String,
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagecueError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn choreography(msg: impl Into<String>) -> Self {
        Self::Choreography(msg.into())
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Config(String),

    #[error("error: {code} {message} {body}")]
    Transport {
        code: String,
        message: String,
        body: String,
    },

    #[error("redline check failed: {0}")]
    Redline(String),

    #[error("invalid redline rule '{0}'")]
    InvalidRule(String),

    #[error("step cancelled")]
    Cancelled,
}

impl StepError {
    pub fn transport<C, M>(code: C, message: M, body: Option<String>) -> Self
    where
        C: Into<String>,
        M: Into<String>,
    {
        StepError::Transport {
            code: code.into(),
            message: message.into(),
            body: body.unwrap_or_else(|| "null".to_string()),
        }
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SidechatError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Attachment error: {path}: {message}")]
    Attachment { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl SidechatError {
    pub fn attachment(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Attachment {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SidechatError>;

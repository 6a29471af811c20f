use thiserror::Error;

/// Why a generated question could not be used.
///
/// None of these reach the player: the generator logs the error and serves
/// the tier's fallback question instead.
#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("question service is not configured (no API key)")]
    NotConfigured,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("question service answered with HTTP {status}")]
    Status { status: u16 },
    #[error("reading reply body failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("reply is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("reply contains no choices")]
    NoChoices,
    #[error("reply content contains no JSON object: {0:?}")]
    NoJsonObject(String),
    #[error("generated question is unusable: {0}")]
    InvalidQuestion(&'static str),
}

impl From<ureq::Error> for QuestionError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, _) => QuestionError::Status { status },
            ureq::Error::Transport(transport) => QuestionError::Transport(transport.to_string()),
        }
    }
}

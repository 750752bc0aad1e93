pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("provider not configured: {message}")]
    NotConfigured { message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("API error HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("response had no message content")]
    EmptyResponse,
}

impl Error {
    #[must_use]
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured {
            message: message.into(),
        }
    }
}

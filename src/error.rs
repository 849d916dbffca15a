use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum ForelastError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Weather API error for {location}: {detail} (status: {status})")]
    Fetch {
        location: String,
        status: String,
        detail: String,
    },

    #[error("Supabase error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable missing: {0}")]
    EnvVar(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<dotenvy::Error> for ForelastError {
    fn from(e: dotenvy::Error) -> Self {
        ForelastError::EnvVar(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForelastError>;

impl ForelastError {
    pub fn fetch(
        location: impl Into<String>,
        status: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        ForelastError::Fetch {
            location: location.into(),
            status: status.into(),
            detail: detail.into(),
        }
    }

    pub fn store(message: impl fmt::Display) -> Self {
        ForelastError::Store(message.to_string())
    }

    pub fn config(message: impl fmt::Display) -> Self {
        ForelastError::Config(message.to_string())
    }
}

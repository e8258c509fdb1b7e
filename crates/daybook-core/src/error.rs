use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaybookError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Identity lookup error: {0}")]
    Identity(String),

    #[error("Mail delivery error: {0}")]
    Mail(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl DaybookError {
    /// Short error code string included in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DaybookError::Config(_) => "CONFIG_ERROR",
            DaybookError::Store(_) => "STORE_ERROR",
            DaybookError::Identity(_) => "IDENTITY_ERROR",
            DaybookError::Mail(_) => "MAIL_ERROR",
            DaybookError::Unauthorized(_) => "UNAUTHORIZED",
        }
    }
}

pub type Result<T> = std::result::Result<T, DaybookError>;

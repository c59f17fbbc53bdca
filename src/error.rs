use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{service} request failed: {message}")]
    Remote { service: String, message: String },

    #[error("Malformed payload from {service}: {message}")]
    Decode { service: String, message: String },

    #[error("Sign in first to open the Favorites page or save recipes.")]
    AuthRequired,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Could not (de)serialize favorites: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid {key} value: {message}")]
    Config { key: String, message: String },
}

impl AppError {
    pub fn remote(service: &str, message: impl ToString) -> Self {
        AppError::Remote {
            service: service.to_string(),
            message: message.to_string(),
        }
    }

    pub fn decode(service: &str, message: impl ToString) -> Self {
        AppError::Decode {
            service: service.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, AppError::AuthRequired)
    }
}

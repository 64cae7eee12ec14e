use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid vehicle profile `{profile}`: {reason}")]
    InvalidProfile { profile: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown vehicle: {0}")]
    UnknownVehicle(Uuid),

    #[error("vehicle {0} is not player controlled")]
    NotPlayerControlled(Uuid),

    #[error("vehicle {0} has no AI agent")]
    NoAgent(Uuid),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

impl SimError {
    pub fn invalid_profile(profile: &str, reason: impl Into<String>) -> Self {
        SimError::InvalidProfile {
            profile: profile.to_string(),
            reason: reason.into(),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;

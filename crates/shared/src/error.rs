use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    Transport,
    Status,
    Decode,
    TimedOut,
}

/// Hard failure of a single probe call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server answered with HTTP {0}")]
    Status(u16),
    #[error("malformed probe response: {0}")]
    Decode(String),
    #[error("probe did not settle within {0:?}")]
    TimedOut(Duration),
}

impl ProbeError {
    pub fn code(&self) -> FailureCode {
        match self {
            ProbeError::Transport(_) => FailureCode::Transport,
            ProbeError::Status(_) => FailureCode::Status,
            ProbeError::Decode(_) => FailureCode::Decode,
            ProbeError::TimedOut(_) => FailureCode::TimedOut,
        }
    }
}

/// Serializable form of a [`ProbeError`], used in run reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub code: FailureCode,
    pub message: String,
}

impl From<&ProbeError> for FailureRecord {
    fn from(value: &ProbeError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}

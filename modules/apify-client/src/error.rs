// Failures surfaced by ApifyClient. reqwest and serde errors are flattened to
// strings at the boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

#[derive(Debug, Error)]
pub enum ApifyError {
    #[error("Apify request failed: {0}")]
    Transport(String),

    #[error("Apify responded {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unreadable Apify payload: {0}")]
    Decode(String),

    #[error("Run ended as {status}: {message}")]
    RunFailed { status: String, message: String },

    #[error("Run {run_id} still unfinished after {polls} polls")]
    Timeout { run_id: String, polls: u32 },

    #[error("Run {run_id} has no default dataset")]
    MissingDataset { run_id: String },
}

impl ApifyError {
    /// True when the run itself ended badly, as opposed to the API call.
    pub fn is_run_outcome(&self) -> bool {
        matches!(self, Self::RunFailed { .. } | Self::Timeout { .. })
    }
}

impl From<reqwest::Error> for ApifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApifyError::Decode(err.to_string())
        } else {
            ApifyError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApifyError {
    fn from(err: serde_json::Error) -> Self {
        ApifyError::Decode(err.to_string())
    }
}

use thiserror::Error;

/// Why a financial plan could not be produced.
///
/// The display text of every variant is safe to show to the end user: it
/// never contains the API key or the raw upstream body.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("API key is not configured on the server.")]
    MissingApiKey,

    #[error("Could not reach the plan service: {0}")]
    Transport(String),

    #[error("Gemini API error: {status} {reason}")]
    Upstream { status: u16, reason: String },

    #[error("Unexpected API response format from Gemini.")]
    MalformedResponse,

    /// Error text relayed verbatim from a remote plan endpoint.
    #[error("{0}")]
    Remote(String),
}

impl PlanError {
    pub(crate) fn transport(err: reqwest::Error) -> Self {
        // Strip the URL so nothing request-specific leaks into user-facing text.
        PlanError::Transport(err.without_url().to_string())
    }
}

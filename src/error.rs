//! Crate-wide error type for the invocation pipeline.

/// Error raised by middleware, route handlers, or the invocation pipeline.
///
/// Carries a human-readable message and an optional cause; both feed the
/// fallback response emitted by the error boundary.
#[derive(Debug, Clone)]
pub struct GateError {
    /// Error message.
    pub message: String,
    /// Underlying cause, when known.
    pub cause: Option<String>,
}

impl GateError {
    /// Create a new GateError.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a GateError with an explicit cause.
    pub fn with_cause(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} ({})", self.message, cause),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for GateError {}

impl From<serde_json::Error> for GateError {
    fn from(err: serde_json::Error) -> Self {
        GateError::with_cause("JSON serialization failed", err.to_string())
    }
}

impl From<http::Error> for GateError {
    fn from(err: http::Error) -> Self {
        GateError::with_cause("failed to synthesize native message", err.to_string())
    }
}

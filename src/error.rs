use thiserror::Error;

/// Every failure the gateway can report to a caller.
///
/// Each variant carries the caller-facing message; `Display` adds a category
/// prefix so log lines stay greppable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Analysis error: {0}")]
    Analysis(String),
}

impl GatewayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GatewayError::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        GatewayError::Configuration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        GatewayError::NotFound(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        GatewayError::Upstream(msg.into())
    }

    /// HTTP status the error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Validation(_) => 400,
            GatewayError::NotFound(_) => 404,
            GatewayError::Timeout(_) => 504,
            GatewayError::Configuration(_)
            | GatewayError::Upstream(_)
            | GatewayError::Analysis(_) => 500,
        }
    }

    /// The text placed in the `{"error": ...}` envelope.
    pub fn message(&self) -> &str {
        match self {
            GatewayError::Validation(msg)
            | GatewayError::Configuration(msg)
            | GatewayError::NotFound(msg)
            | GatewayError::Upstream(msg)
            | GatewayError::Timeout(msg)
            | GatewayError::Analysis(msg) => msg,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs can carry credentials in the query string.
        let err = err.without_url();
        if err.is_timeout() {
            GatewayError::Upstream(format!("Upstream request timed out: {}", err))
        } else {
            GatewayError::Upstream(format!("Upstream request failed: {}", err))
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(GatewayError::validation("x").status_code(), 400);
        assert_eq!(GatewayError::configuration("x").status_code(), 500);
        assert_eq!(GatewayError::not_found("x").status_code(), 404);
        assert_eq!(GatewayError::upstream("x").status_code(), 500);
        assert_eq!(GatewayError::Timeout("x".into()).status_code(), 504);
        assert_eq!(GatewayError::Analysis("x".into()).status_code(), 500);
    }

    #[test]
    fn message_omits_category_prefix() {
        let err = GatewayError::validation("Prompt is required");
        assert_eq!(err.message(), "Prompt is required");
        assert_eq!(err.to_string(), "Validation error: Prompt is required");
    }
}

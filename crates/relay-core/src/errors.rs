use std::time::Duration;

/// Errors from the upstream generation service.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GatewayError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::NetworkError(_) => "network_error",
            Self::StreamInterrupted(_) => "stream_interrupted",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 | 404 => Self::InvalidRequest(body),
            429 => Self::RateLimited { retry_after: None },
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }

    /// Attach a server-provided retry delay to a rate-limit error.
    pub fn with_retry_after(self, retry_after: Option<Duration>) -> Self {
        match self {
            Self::RateLimited { .. } => Self::RateLimited { retry_after },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_status_mapping() {
        assert!(matches!(
            GatewayError::from_status(401, "unauthorized".into()),
            GatewayError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            GatewayError::from_status(403, "forbidden".into()),
            GatewayError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            GatewayError::from_status(400, "bad".into()),
            GatewayError::InvalidRequest(_)
        ));
        assert!(matches!(
            GatewayError::from_status(429, String::new()),
            GatewayError::RateLimited { retry_after: None }
        ));
        assert!(matches!(
            GatewayError::from_status(503, "unavailable".into()),
            GatewayError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            GatewayError::from_status(302, "moved".into()),
            GatewayError::InvalidRequest(msg) if msg.contains("302")
        ));
    }

    #[test]
    fn retry_after_only_applies_to_rate_limits() {
        let delay = Some(Duration::from_secs(3));
        assert!(matches!(
            GatewayError::from_status(429, String::new()).with_retry_after(delay),
            GatewayError::RateLimited { retry_after } if retry_after == delay
        ));
        assert!(matches!(
            GatewayError::from_status(500, "x".into()).with_retry_after(delay),
            GatewayError::ServerError { status: 500, .. }
        ));
    }

    #[test]
    fn error_kind_strings() {
        assert_eq!(
            GatewayError::NetworkError("tcp".into()).error_kind(),
            "network_error"
        );
        assert_eq!(
            GatewayError::RateLimited { retry_after: None }.error_kind(),
            "rate_limited"
        );
        assert_eq!(
            GatewayError::MalformedResponse("eof".into()).error_kind(),
            "malformed_response"
        );
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = GatewayError::ServerError {
            status: 500,
            body: "internal".into(),
        };
        assert_eq!(err.to_string(), "server error 500: internal");
    }
}

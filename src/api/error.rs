//! Error taxonomy for exchange calls.
//!
//! Retrying is decided by [`ExchangeError::is_transient`], not by the concrete
//! variant a caller happens to match on.

use thiserror::Error;

/// Failure of a single exchange call.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The request did not complete within the client timeout
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established or was reset
    #[error("connection failed: {0}")]
    Connect(String),

    /// The exchange rejected the request with an error code
    #[error("exchange error {code}: {msg}")]
    Api { code: i64, msg: String },

    /// Non-success HTTP status without a recognizable error body
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body could not be parsed
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request could not be signed
    #[error("failed to sign request: {0}")]
    Signing(String),

    /// The request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every attempt failed with a transient error
    #[error("request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ExchangeError>,
    },
}

/// Error body returned by the futures REST API.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

impl ExchangeError {
    /// Timeouts and connection failures are worth retrying, nothing else is.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExchangeError::Timeout(_) | ExchangeError::Connect(_))
    }

    /// Map a non-success response to an error, preferring the exchange's own
    /// `{"code", "msg"}` body when present.
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(err) => ExchangeError::Api {
                code: err.code,
                msg: err.msg,
            },
            Err(_) => ExchangeError::Http {
                status,
                body: body.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() {
            ExchangeError::Connect(err.to_string())
        } else if err.is_builder() {
            ExchangeError::InvalidRequest(err.to_string())
        } else if let Some(status) = err.status() {
            ExchangeError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ExchangeError::Decode(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ExchangeError::Timeout("read".into()).is_transient());
        assert!(ExchangeError::Connect("reset".into()).is_transient());
        assert!(!ExchangeError::Api {
            code: -1121,
            msg: "Invalid symbol.".into()
        }
        .is_transient());
        assert!(!ExchangeError::Decode("eof".into()).is_transient());

        let exhausted = ExchangeError::RetriesExhausted {
            attempts: 3,
            source: Box::new(ExchangeError::Timeout("read".into())),
        };
        assert!(!exhausted.is_transient());
    }

    #[test]
    fn test_from_response_parses_api_body() {
        let err = ExchangeError::from_response(400, r#"{"code":-2019,"msg":"Margin is insufficient."}"#);
        match err {
            ExchangeError::Api { code, msg } => {
                assert_eq!(code, -2019);
                assert_eq!(msg, "Margin is insufficient.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_from_response_falls_back_to_http() {
        let err = ExchangeError::from_response(502, "<html>Bad Gateway</html>");
        assert!(matches!(err, ExchangeError::Http { status: 502, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_exhausted_message_includes_last_error() {
        let err = ExchangeError::RetriesExhausted {
            attempts: 3,
            source: Box::new(ExchangeError::Connect("connection refused".into())),
        };
        assert_eq!(
            err.to_string(),
            "request failed after 3 attempts: connection failed: connection refused"
        );
    }
}

//! Store error taxonomy.

use reqwest::StatusCode;

/// Errors returned by record store operations. Every error is scoped to the
/// single call that produced it; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Request construction, connection, I/O or timeout failure.
    #[error("{op}: proxy request failed: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The proxy answered with a non-success status.
    #[error("{op}: proxy returned {status}: {body}")]
    Status {
        op: &'static str,
        status: StatusCode,
        body: String,
    },

    /// The response body is not a JSON record in the configured encoding.
    #[error("failed to decode proxy response ({reason}); body: {body}")]
    Decode { reason: String, body: String },

    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{0} of redis proxy is not supported")]
    Unsupported(&'static str),

    #[error("unknown store type '{0}'")]
    UnknownStore(String),

    #[error("config: {0}")]
    Config(#[from] figment::Error),
}

impl StoreError {
    pub(crate) fn transport(op: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { op, source }
    }

    pub(crate) fn decode(reason: impl ToString, body: &str) -> Self {
        Self::Decode {
            reason: reason.to_string(),
            body: body.to_string(),
        }
    }

    /// True when the call failed because the per-request timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

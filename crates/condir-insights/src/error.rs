use thiserror::Error;

/// Errors returned by the insights client.
#[derive(Debug, Error)]
pub enum InsightsError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("insights service returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not have the chat-completions shape.
    #[error("failed to deserialize {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The first choice carried no text.
    #[error("insights response contained no content")]
    EmptyContent,

    #[error("insights client is not configured: {0} is not set")]
    NotConfigured(&'static str),

    #[error("invalid insights endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

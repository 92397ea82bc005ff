use thiserror::Error;

#[derive(Debug, Error)]
pub enum RezdyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("booking API error: {0}")]
    Api(String),

    #[error("rate limited by upstream (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

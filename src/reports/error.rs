use thiserror::Error;

/// Errors returned by the report backend client.
#[derive(Debug, Error)]
pub enum ReportsError {
    /// Network, TLS or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Reporte {0} no encontrado")]
    NotFound(i64),

    /// Any other non-2xx response.
    #[error("Report backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid report backend URL '{0}'")]
    InvalidBaseUrl(String),
}

pub type ReportsResult<T> = Result<T, ReportsError>;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected before any request was sent (empty required field, missing key).
    #[error("{0}")]
    Validation(String),

    /// The backend answered with an `{"error": ...}` envelope.
    #[error("{0}")]
    Server(String),

    /// Network failure, non-JSON body or an undecodable payload.
    #[error("Request to '{endpoint}' failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Helper for creating validation errors
    ///
    /// # Example
    /// ```
    /// use sqlv_core::Error;
    /// let err = Error::validation("Table name is required");
    /// assert_eq!(err.to_string(), "Table name is required");
    /// ```
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Helper for creating server-reported errors
    pub fn server(msg: impl Into<String>) -> Self {
        Error::Server(msg.into())
    }

    /// Helper for creating transport errors tied to an endpoint
    ///
    /// # Example
    /// ```
    /// use sqlv_core::Error;
    /// let err = Error::transport("/execute_query", anyhow::anyhow!("connection refused"));
    /// assert!(err.is_transport());
    /// ```
    pub fn transport(endpoint: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Error::Transport {
            endpoint: endpoint.into(),
            source: source.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Message shown to the user in a blocking alert.
    ///
    /// Validation and server errors carry their own text. Everything else is
    /// reported with `fallback`, the operation-specific generic message.
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            Error::Validation(msg) | Error::Server(msg) => msg,
            _ => fallback,
        }
    }
}

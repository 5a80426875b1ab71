use thiserror::Error;

pub type CalendarResult<T> = Result<T, CalendarError>;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while assembling the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Invalid value '{value}' for '{key}': {msg}")]
    Invalid {
        key: String,
        value: String,
        msg: String,
    },
}

/// Errors related to feed payloads and the event model.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Invalid event date '{value}' from {source_name}")]
    InvalidDate { source_name: String, value: String },

    #[error("No events found: {0}")]
    NoEventsFound(String),

    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors related to local file I/O.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("IO operation failed")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization failed")]
    Csv(#[from] csv::Error),

    #[error("Failed to create writer: {0}")]
    WriterCreation(String),

    #[error("Failed to write data: {0}")]
    WriteFailed(String),

    #[error("Failed to read data: {0}")]
    ReadFailed(String),
}

/// Errors related to HTTP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {msg}")]
    Request { url: String, msg: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Response from {url} is not valid JSON: {msg}")]
    Body { url: String, msg: String },
}

/// Transport-level failures. Business failures never surface here; they
/// arrive later as push events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("{endpoint} request failed: {message}")]
    Request { endpoint: String, message: String },
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("{endpoint} response could not be decoded: {message}")]
    Decode { endpoint: String, message: String },
    #[error("event stream error: {0}")]
    Stream(String),
    #[error("event stream line exceeded the limit ({0} bytes buffered)")]
    LineTooLong(usize),
    #[error("event stream closed by server")]
    Closed,
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for TransportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

//! Error types for SDP rewriting and signaling

/// Result type alias using the crate Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while negotiating a stream with the media server
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Session description text with no media sections
    #[error("Malformed SDP: {0}")]
    MalformedSdp(String),

    /// Signaling transport failed to open, or closed before a response arrived
    #[error("Signaling transport error: {0}")]
    TransportError(String),

    /// Server answered a command with a non-200 status
    #[error("Command {command} failed with status {status}: {description}")]
    ProtocolError {
        /// Command the server rejected
        command: String,
        /// Server status code
        status: u16,
        /// Server status description
        description: String,
    },

    /// A command with the same name is still awaiting its response
    #[error("Command already in flight: {0}")]
    CommandInFlight(String),

    /// Signaling channel was closed (terminal state)
    #[error("Signaling channel closed")]
    ChannelClosed,

    /// Peer connection collaborator error
    #[error("Peer connection error: {0}")]
    PeerConnectionError(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl Error {
    /// Check if this error is retryable
    ///
    /// Nothing in this crate retries; the caller decides.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransportError(_) | Error::IoError(_))
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_))
    }

    /// Server status code carried by a protocol error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::ProtocolError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("test".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: test");

        let err = Error::ProtocolError {
            command: "getOffer".to_string(),
            status: 514,
            description: "stream not ready".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command getOffer failed with status 514: stream not ready"
        );
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::TransportError("test".to_string()).is_retryable());
        assert!(!Error::ChannelClosed.is_retryable());
        assert!(!Error::InvalidConfig("test".to_string()).is_retryable());
    }

    #[test]
    fn test_status_code() {
        let err = Error::ProtocolError {
            command: "sendOffer".to_string(),
            status: 502,
            description: String::new(),
        };
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(Error::ChannelClosed.status_code(), None);
    }

    #[test]
    fn test_json_error_converts() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, Error::SerializationError(_)));
    }
}

//! Error types for the SOAP datasource.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors surfaced to the host data layer.
#[derive(Error, Debug)]
pub enum SoapSourceError {
    /// The SOAP client capability is unavailable or the configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The WSDL could not be fetched or the handshake failed.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The requested function is not advertised by the service.
    #[error("The function ({0}) does not exist in the webservice")]
    UnknownOperation(String),

    /// The remote call raised a fault.
    #[error("Invalid call: {0}")]
    InvalidCall(String),

    #[error("Invalid configuration file: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SoapSourceError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::ConfigFile(_) => ErrorKind::Configuration,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::UnknownOperation(_) => ErrorKind::UnknownOperation,
            Self::InvalidCall(_) => ErrorKind::InvalidCall,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Error categories, mirroring the host framework's exception vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// SOAP capability missing or bad configuration
    Configuration,
    /// WSDL fetch / handshake failure
    Connection,
    /// Function not found among advertised operations
    UnknownOperation,
    /// Remote fault during invocation
    InvalidCall,
    /// Local IO failure
    Io,
}

impl ErrorKind {
    /// Get the string code for this error kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "CONFIGURATION_ERROR",
            Self::Connection => "CONNECTION_ERROR",
            Self::UnknownOperation => "UNKNOWN_OPERATION",
            Self::InvalidCall => "INVALID_CALL",
            Self::Io => "IO_ERROR",
        }
    }
}

/// A SOAP Fault, or a transport failure reported in the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapFault {
    /// Fault code (`soap:Server`, `soap:Receiver`, `HTTP`, ...)
    pub code: String,
    /// Human-readable fault string
    pub message: String,
}

impl SoapFault {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Fault raised by the client side (transport, parsing).
    pub fn client(message: impl Into<String>) -> Self {
        Self::new("Client", message)
    }
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for SoapFault {}

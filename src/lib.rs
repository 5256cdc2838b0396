//! SOAP datasource
//!
//! Lets a data-access layer call operations of a remote SOAP web service as if
//! it were a database connection.
//!
//! # Features
//!
//! - WSDL at `<localhost>/<service>?wsdl`, loaded for every query
//! - Function existence check against the advertised operations
//! - Uniform errors: configuration, connection, unknown operation, invalid call
//! - Built-in blocking HTTP client with gzip, basic auth and disk WSDL cache
//! - Pluggable protocol client through [`SoapClientFactory`]
//!
//! # Example
//!
//! ```ignore
//! use soap_datasource::{Params, SoapSource, SoapSourceConfig};
//!
//! let config = SoapSourceConfig::new("http://192.168.3.123:8080/webservice", "gestaoClient")
//!     .with_credentials("root", "123456");
//! let source = SoapSource::new(config);
//! let clientes = source.query("listarClientes", Params::new())?;
//! ```

pub mod client;
pub mod config;
pub mod datasource;
pub mod envelope;
pub mod error;
pub mod http;
pub mod parser;
pub mod wsdl;

pub use client::{ClientOptions, ConnectError, Params, SoapClient, SoapClientFactory};
pub use config::{ConfigPatch, CredentialsMode, FunctionMatch, SoapSourceConfig};
pub use datasource::{DebugInfo, Session, SoapSource};
pub use error::{ErrorKind, SoapFault, SoapSourceError};
pub use http::HttpClientFactory;

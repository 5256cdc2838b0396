//! SOAP protocol client abstraction.
//!
//! The datasource only needs three things from a protocol client: the list of
//! advertised operations, a way to invoke one, and the warnings raised while
//! loading the service description. Anything that can provide those can be
//! plugged in through [`SoapClientFactory`].

use crate::config::{CredentialsMode, SoapSourceConfig};
use crate::error::SoapFault;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Parameters of a remote call: one named value per argument element.
pub type Params = Map<String, Value>;

/// A connected SOAP client.
#[cfg_attr(test, mockall::automock)]
pub trait SoapClient {
    /// Operation signatures advertised by the service, one string per operation.
    fn list_operations(&self) -> Vec<String>;

    /// Invoke `operation` with `params` as its single argument structure.
    fn call(&self, operation: &str, params: &Params) -> Result<Value, SoapFault>;

    /// Warnings collected while loading the service description.
    fn warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Builds connected clients from a WSDL URL.
#[cfg_attr(test, mockall::automock)]
pub trait SoapClientFactory {
    fn connect(
        &self,
        wsdl_url: &str,
        options: &ClientOptions,
    ) -> Result<Box<dyn SoapClient>, ConnectError>;
}

/// Failure to produce a client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The protocol client itself cannot be built in this environment.
    #[error("SOAP client capability unavailable: {0}")]
    Unavailable(String),

    /// The WSDL fetch or handshake faulted.
    #[error("{0}")]
    Fault(SoapFault),
}

/// Response compression accepted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Advertise and accept gzip-encoded responses
    AcceptGzip,
}

/// WSDL cache mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsdlCacheMode {
    /// Always fetch the WSDL
    None,
    /// Keep fetched WSDL documents on disk
    Disk,
}

/// Option record handed to the protocol client.
///
/// Every field is optional because the legacy credentials behavior produces a
/// record holding nothing but the login and password.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    pub compression: Option<Compression>,
    /// Whether the client should emit protocol warnings
    pub warnings: Option<bool>,
    pub wsdl_cache: Option<WsdlCacheMode>,
    pub login: Option<String>,
    pub password: Option<String>,
}

impl ClientOptions {
    /// Options derived from a datasource configuration.
    pub fn for_config(config: &SoapSourceConfig) -> Self {
        let mut options = Self {
            compression: Some(Compression::AcceptGzip),
            warnings: Some(false),
            wsdl_cache: Some(if config.cache {
                WsdlCacheMode::Disk
            } else {
                WsdlCacheMode::None
            }),
            login: None,
            password: None,
        };

        if let Some((login, password)) = config.credentials() {
            match config.credentials_options {
                CredentialsMode::Replace => {
                    options = Self {
                        login: Some(login.to_string()),
                        password: Some(password.to_string()),
                        ..Default::default()
                    };
                }
                CredentialsMode::Merge => {
                    options.login = Some(login.to_string());
                    options.password = Some(password.to_string());
                }
            }
        }

        options
    }

    /// Login and password, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.login.as_deref(), self.password.as_deref()) {
            (Some(login), Some(password)) => Some((login, password)),
            _ => None,
        }
    }

    /// Whether warnings are suppressed. An unset value means not suppressed.
    pub fn suppresses_warnings(&self) -> bool {
        self.warnings == Some(false)
    }

    pub fn gzip(&self) -> bool {
        self.compression == Some(Compression::AcceptGzip)
    }

    pub fn disk_cache(&self) -> bool {
        self.wsdl_cache == Some(WsdlCacheMode::Disk)
    }
}

//! The SOAP datasource: a web service seen as a database connection.
//!
//! Every query opens its own [`Session`]: the WSDL is loaded, the requested
//! function is looked up among the advertised operations and then invoked.
//! Nothing is shared between queries except the configuration and the
//! `connected` flag.

use crate::client::{ClientOptions, ConnectError, Params, SoapClient, SoapClientFactory};
use crate::config::{ConfigPatch, CredentialsMode, FunctionMatch, SoapSourceConfig};
use crate::error::SoapSourceError;
use crate::http::HttpClientFactory;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Connection details kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    pub resolved_wsdl_url: String,
}

/// SOAP web service datasource.
pub struct SoapSource<F = HttpClientFactory> {
    config: SoapSourceConfig,
    factory: F,
    connected: AtomicBool,
}

impl SoapSource<HttpClientFactory> {
    /// Create a datasource using the built-in HTTP client.
    pub fn new(config: SoapSourceConfig) -> Self {
        let factory = HttpClientFactory::for_config(&config);
        Self::with_factory(config, factory)
    }
}

impl<F: SoapClientFactory> SoapSource<F> {
    /// Create a datasource with a custom client factory.
    pub fn with_factory(config: SoapSourceConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &SoapSourceConfig {
        &self.config
    }

    /// Merge a partial configuration, e.g. to switch service between calls.
    pub fn set_config(&mut self, patch: ConfigPatch) {
        self.config.apply(patch);
        debug!(wsdl = %self.config.wsdl_url(), "Datasource reconfigured");
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            resolved_wsdl_url: self.config.wsdl_url(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Load the service description and return a fresh session.
    pub fn connect(&self) -> Result<Session, SoapSourceError> {
        self.connected.store(false, Ordering::SeqCst);

        let wsdl_url = self.config.wsdl_url();
        let options = self.build_client_options();

        debug!(wsdl = %wsdl_url, cache = ?options.wsdl_cache, "Connecting to SOAP service");

        let client = self.factory.connect(&wsdl_url, &options).map_err(|e| match e {
            ConnectError::Unavailable(reason) => {
                warn!(reason = %reason, "SOAP client unavailable");
                SoapSourceError::Configuration(format!(
                    "SOAP client capability unavailable: {}",
                    reason
                ))
            }
            ConnectError::Fault(fault) => {
                warn!(wsdl = %wsdl_url, code = %fault.code, message = %fault.message, "SOAP connection failed");
                SoapSourceError::connection(fault.message)
            }
        })?;

        for warning in client.warnings() {
            if options.suppresses_warnings() {
                debug!(wsdl = %wsdl_url, warning = %warning, "SOAP client warning");
            } else {
                warn!(wsdl = %wsdl_url, warning = %warning, "SOAP client warning");
            }
        }

        self.connected.store(true, Ordering::SeqCst);
        info!(wsdl = %wsdl_url, "Connected to SOAP service");

        Ok(Session {
            client,
            wsdl_url,
            function_match: self.config.function_match,
        })
    }

    /// Call `function` on the service with `params` as its argument structure.
    ///
    /// Always connects first; sessions are never reused across queries.
    pub fn query(&self, function: &str, params: Params) -> Result<Value, SoapSourceError> {
        let session = self.connect()?;

        if !session.function_exists(function) {
            warn!(function = %function, wsdl = %session.wsdl_url, "Function not advertised by service");
            return Err(SoapSourceError::UnknownOperation(function.to_string()));
        }

        session.call(function, &params)
    }

    /// Connect and return the advertised operation signatures.
    pub fn operations(&self) -> Result<Vec<String>, SoapSourceError> {
        Ok(self.connect()?.operations())
    }

    fn build_client_options(&self) -> ClientOptions {
        let options = ClientOptions::for_config(&self.config);
        if self.config.credentials().is_some()
            && self.config.credentials_options == CredentialsMode::Replace
        {
            debug!("Credentials replace the default client options (compression, warnings, WSDL cache)");
        }
        options
    }
}

/// A connected client for a single query.
pub struct Session {
    client: Box<dyn SoapClient>,
    wsdl_url: String,
    function_match: FunctionMatch,
}

impl Session {
    pub fn wsdl_url(&self) -> &str {
        &self.wsdl_url
    }

    pub fn operations(&self) -> Vec<String> {
        self.client.list_operations()
    }

    /// Whether `function` is advertised by the service.
    pub fn function_exists(&self, function: &str) -> bool {
        function_exists(&self.client.list_operations(), function, self.function_match)
    }

    /// Invoke `function` without checking that it is advertised.
    pub fn call(&self, function: &str, params: &Params) -> Result<Value, SoapSourceError> {
        debug!(function = %function, wsdl = %self.wsdl_url, "Calling SOAP operation");
        self.client.call(function, params).map_err(|fault| {
            warn!(function = %function, code = %fault.code, message = %fault.message, "SOAP call failed");
            SoapSourceError::InvalidCall(fault.message)
        })
    }
}

/// Match `function` against advertised signatures.
///
/// In substring mode an empty name matches any signature.
pub fn function_exists(signatures: &[String], function: &str, mode: FunctionMatch) -> bool {
    let needle = function.to_lowercase();
    match mode {
        FunctionMatch::Substring => signatures
            .iter()
            .any(|signature| signature.to_lowercase().contains(&needle)),
        FunctionMatch::Exact => signatures
            .iter()
            .filter_map(|signature| operation_name(signature))
            .any(|name| name.to_lowercase() == needle),
    }
}

/// Operation name of a `"<ret> <name>(<args>)"` signature.
fn operation_name(signature: &str) -> Option<&str> {
    let head = match signature.find('(') {
        Some(idx) => &signature[..idx],
        None => signature,
    };
    head.split_whitespace().last()
}

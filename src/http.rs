//! HTTP transport for the SOAP client.
//!
//! Blocking reqwest client: fetches the WSDL, keeps an optional disk copy of
//! it, and posts RPC envelopes to the service endpoint.

use crate::client::{ClientOptions, ConnectError, Params, SoapClient, SoapClientFactory};
use crate::config::SoapSourceConfig;
use crate::envelope::{build_request, decode_response, fault_in};
use crate::error::SoapFault;
use crate::wsdl::{parse_wsdl, ServiceDescription, SoapVersion};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Builds [`HttpSoapClient`]s.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    cache_dir: PathBuf,
    cache_ttl: Duration,
}

impl HttpClientFactory {
    pub fn new(cache_dir: impl Into<PathBuf>, cache_ttl: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            cache_ttl,
        }
    }

    /// Factory using the cache location and lifetime from `config`.
    pub fn for_config(config: &SoapSourceConfig) -> Self {
        Self::new(
            config.cache_dir(),
            Duration::from_secs(config.wsdl_cache_ttl_secs),
        )
    }
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::for_config(&SoapSourceConfig::default())
    }
}

impl SoapClientFactory for HttpClientFactory {
    fn connect(
        &self,
        wsdl_url: &str,
        options: &ClientOptions,
    ) -> Result<Box<dyn SoapClient>, ConnectError> {
        let http = Client::builder()
            .gzip(options.gzip())
            .build()
            .map_err(|e| ConnectError::Unavailable(e.to_string()))?;

        let mut warnings = Vec::new();
        let cache = options
            .disk_cache()
            .then(|| WsdlCache::new(&self.cache_dir, self.cache_ttl));

        let mut description = None;
        if let Some(cache) = &cache {
            if let Some(document) = cache.load(wsdl_url, &mut warnings) {
                match parse_wsdl(&document) {
                    Ok(parsed) => description = Some(parsed),
                    Err(e) => warnings.push(format!("Ignoring cached WSDL: {}", e)),
                }
            }
        }

        let description = match description {
            Some(description) => description,
            None => {
                let document = fetch_wsdl(&http, wsdl_url, options)?;
                let parsed = parse_wsdl(&document)
                    .map_err(|e| ConnectError::Fault(SoapFault::new("WSDL", e.to_string())))?;
                if let Some(cache) = &cache {
                    cache.store(wsdl_url, &document, &mut warnings);
                }
                parsed
            }
        };

        warnings.extend(description.warnings.iter().cloned());

        Ok(Box::new(HttpSoapClient {
            http,
            description,
            credentials: options
                .credentials()
                .map(|(login, password)| (login.to_string(), password.to_string())),
            warnings,
        }))
    }
}

fn fetch_wsdl(http: &Client, url: &str, options: &ClientOptions) -> Result<String, ConnectError> {
    let load_error = |reason: String| {
        ConnectError::Fault(SoapFault::new(
            "WSDL",
            format!(
                "SOAP-ERROR: Parsing WSDL: Couldn't load from '{}' : {}",
                url, reason
            ),
        ))
    };

    let mut request = http.get(url);
    if let Some((login, password)) = options.credentials() {
        request = request.basic_auth(login, Some(password));
    }

    let response = request.send().map_err(|e| load_error(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(load_error(format!("HTTP {}", status)));
    }
    response.text().map_err(|e| load_error(e.to_string()))
}

/// SOAP client speaking HTTP to the endpoint named in the WSDL.
pub struct HttpSoapClient {
    http: Client,
    description: ServiceDescription,
    credentials: Option<(String, String)>,
    warnings: Vec<String>,
}

impl HttpSoapClient {
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((login, password)) => request.basic_auth(login, Some(password)),
            None => request,
        }
    }
}

impl SoapClient for HttpSoapClient {
    fn list_operations(&self) -> Vec<String> {
        self.description.signatures()
    }

    fn call(&self, operation: &str, params: &Params) -> Result<Value, SoapFault> {
        let op = self
            .description
            .operation(operation)
            .ok_or_else(|| {
                SoapFault::client(format!(
                    "Function (\"{}\") is not a valid method for this service",
                    operation
                ))
            })?;

        let version = self.description.soap_version;
        let action = op.soap_action.as_deref();
        let envelope = build_request(version, &self.description.target_namespace, &op.name, params)?;

        let mut request = self
            .http
            .post(&self.description.endpoint)
            .header(CONTENT_TYPE, version.content_type(action))
            .body(envelope);
        if version == SoapVersion::Soap11 {
            request = request.header("SOAPAction", format!("\"{}\"", action.unwrap_or_default()));
        }

        let response = self
            .authorize(request)
            .send()
            .map_err(|e| SoapFault::new("HTTP", format!("Could not connect to host: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| SoapFault::new("HTTP", e.to_string()))?;

        if !status.is_success() {
            return Err(fault_in(&text).unwrap_or_else(|| {
                SoapFault::new(
                    "HTTP",
                    status.canonical_reason().unwrap_or("Unexpected HTTP status"),
                )
            }));
        }

        decode_response(&text)
    }

    fn warnings(&self) -> Vec<String> {
        self.warnings.clone()
    }
}

/// WSDL documents stored on disk, one file per URL.
struct WsdlCache<'a> {
    dir: &'a Path,
    ttl: Duration,
}

impl<'a> WsdlCache<'a> {
    fn new(dir: &'a Path, ttl: Duration) -> Self {
        Self { dir, ttl }
    }

    fn path(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("wsdl-{:x}", Sha256::digest(url.as_bytes())))
    }

    fn load(&self, url: &str, warnings: &mut Vec<String>) -> Option<String> {
        let path = self.path(url);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        if age > self.ttl {
            return None;
        }

        match std::fs::read_to_string(&path) {
            Ok(document) => Some(document),
            Err(e) => {
                warnings.push(format!("Failed to read cached WSDL {}: {}", path.display(), e));
                None
            }
        }
    }

    fn store(&self, url: &str, document: &str, warnings: &mut Vec<String>) {
        let path = self.path(url);
        let result = std::fs::create_dir_all(self.dir)
            .and_then(|_| tempfile::NamedTempFile::new_in(self.dir))
            .and_then(|mut file| {
                file.write_all(document.as_bytes())?;
                file.persist(&path).map_err(|e| e.error)?;
                Ok(())
            });

        if let Err(e) = result {
            warnings.push(format!("Failed to cache WSDL at {}: {}", path.display(), e));
        }
    }
}

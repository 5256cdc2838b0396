//! Configuration types for the SOAP datasource.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Default lifetime of a cached WSDL document (one day).
pub const DEFAULT_WSDL_CACHE_TTL_SECS: u64 = 86_400;

/// Connection configuration for a SOAP web service.
///
/// Key names follow the datasource configuration record hosts already use:
/// `localhost` is the endpoint base URL and `service` the service name, so the
/// WSDL lives at `<localhost>/<service>?wsdl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapSourceConfig {
    /// Endpoint base URL (e.g. `http://192.168.3.123:8080/webservice`)
    pub localhost: String,

    /// Service name appended to the base URL
    pub service: String,

    /// Default operation name (used by the CLI when none is given)
    pub function: String,

    /// Cache the WSDL document on disk
    pub cache: bool,

    /// HTTP login; `false`, empty or missing means no login
    #[serde(deserialize_with = "deserialize_credential")]
    pub login: Option<String>,

    /// HTTP password; `false`, empty or missing means no password
    #[serde(deserialize_with = "deserialize_credential")]
    pub password: Option<String>,

    /// How credentials combine with the default client options
    pub credentials_options: CredentialsMode,

    /// How requested function names are matched against advertised operations
    pub function_match: FunctionMatch,

    /// Directory for cached WSDL documents
    pub wsdl_cache_dir: Option<PathBuf>,

    /// Maximum age of a cached WSDL document in seconds
    pub wsdl_cache_ttl_secs: u64,
}

impl Default for SoapSourceConfig {
    fn default() -> Self {
        Self {
            localhost: String::new(),
            service: String::new(),
            function: String::new(),
            cache: false,
            login: None,
            password: None,
            credentials_options: CredentialsMode::default(),
            function_match: FunctionMatch::default(),
            wsdl_cache_dir: None,
            wsdl_cache_ttl_secs: DEFAULT_WSDL_CACHE_TTL_SECS,
        }
    }
}

impl SoapSourceConfig {
    /// Create a configuration for `<localhost>/<service>?wsdl`.
    pub fn new(localhost: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            localhost: localhost.into(),
            service: service.into(),
            ..Default::default()
        }
    }

    /// Set login and password.
    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self.password = Some(password.into());
        self
    }

    /// The WSDL URL, built exactly as `<localhost>/<service>?wsdl`.
    pub fn wsdl_url(&self) -> String {
        format!("{}/{}?wsdl", self.localhost, self.service)
    }

    /// Login and password, only when both are present and non-empty.
    ///
    /// A lone login or a lone password counts as no credentials at all.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.login.as_deref(), self.password.as_deref()) {
            (Some(login), Some(password)) if !login.is_empty() && !password.is_empty() => {
                Some((login, password))
            }
            _ => None,
        }
    }

    /// Directory used for the disk WSDL cache.
    pub fn cache_dir(&self) -> PathBuf {
        self.wsdl_cache_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("soap-datasource-wsdl"))
    }

    /// Merge a partial configuration into this one.
    pub fn apply(&mut self, patch: ConfigPatch) {
        if let Some(localhost) = patch.localhost {
            self.localhost = localhost;
        }
        if let Some(service) = patch.service {
            self.service = service;
        }
        if let Some(function) = patch.function {
            self.function = function;
        }
        if let Some(cache) = patch.cache {
            self.cache = cache;
        }
        if let Some(login) = patch.login {
            self.login = login;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
    }
}

/// Credential handling when both login and password are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialsMode {
    /// Credentials replace the whole option record; compression, warning and
    /// WSDL cache settings are dropped. Kept for existing deployments.
    #[default]
    Replace,
    /// Credentials are added to the default option record
    Merge,
}

/// Function name matching against the advertised operation list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FunctionMatch {
    /// Case-insensitive substring of any advertised signature.
    /// `list` matches `ClientListAll`.
    #[default]
    Substring,
    /// Case-insensitive equality with the advertised operation name
    Exact,
}

/// Partial configuration update, applied with [`SoapSourceConfig::apply`].
///
/// `login`/`password` use a nested option so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigPatch {
    pub localhost: Option<String>,
    pub service: Option<String>,
    pub function: Option<String>,
    pub cache: Option<bool>,
    pub login: Option<Option<String>>,
    pub password: Option<Option<String>>,
}

impl ConfigPatch {
    /// Patch that switches the service name.
    pub fn service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
            ..Default::default()
        }
    }

    /// Also set credentials.
    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some(Some(login.into()));
        self.password = Some(Some(password.into()));
        self
    }
}

/// Accepts a string, a number, `false` or null.
fn deserialize_credential<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Flag(#[allow(dead_code)] bool),
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) if !text.is_empty() => Some(text),
        Some(Raw::Number(n)) => Some(n.to_string()),
        Some(Raw::Flag(_)) | Some(Raw::Text(_)) | None => None,
    })
}

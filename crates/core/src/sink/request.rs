//! Shaping items into data-collection requests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::Item;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusType {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Api,
    Scraper,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    #[default]
    Rss,
    Api,
    Html,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessMethod {
    OpenAccess,
    ApiKey,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    #[default]
    Xml,
    Json,
    Html,
}

/// Per-request defaults, configurable under `[sink.request]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDefaults {
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub geo: Option<String>,
    #[serde(default = "default_request_method")]
    pub request_method: String,
    #[serde(default)]
    pub access_type: AccessType,
    #[serde(default)]
    pub data_format: DataFormat,
    /// Seconds between fetches downstream.
    #[serde(default = "default_fetch_frequency")]
    pub fetch_frequency_secs: u64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_cache_duration")]
    pub cache_duration_secs: u64,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,
}

fn default_protocol() -> String {
    "https".to_string()
}

fn default_port() -> u16 {
    443
}

fn default_request_method() -> String {
    "GET".to_string()
}

fn default_fetch_frequency() -> u64 {
    300
}

fn default_rate_limit() -> u32 {
    100
}

fn default_rate_limit_window() -> u32 {
    60
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_retry_count() -> u32 {
    1
}

fn default_cache_duration() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_max_connections() -> u32 {
    5
}

fn default_allowed_origins() -> String {
    "*".to_string()
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            port: default_port(),
            path: None,
            geo: None,
            request_method: default_request_method(),
            access_type: AccessType::default(),
            data_format: DataFormat::default(),
            fetch_frequency_secs: default_fetch_frequency(),
            rate_limit: default_rate_limit(),
            rate_limit_window_secs: default_rate_limit_window(),
            timeout_ms: default_timeout_ms(),
            retry_count: default_retry_count(),
            cache_duration_secs: default_cache_duration(),
            cache_enabled: true,
            max_connections: default_max_connections(),
            api_key: None,
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// The request sent downstream for one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataCollectRequest {
    pub id: String,
    pub service: ServiceSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSpec {
    pub service_id: String,
    pub status_type: StatusType,
    pub service_type: ServiceType,
    pub access_type: AccessType,
    pub fetch_frequency: u64,
    pub time_interval: u64,
    pub next_fetch: Option<String>,
    pub last_fetched: Option<String>,
    pub last_error_message: Option<String>,
    pub access_method: AccessMethod,
    pub data_format: DataFormat,
    pub parameters: RequestParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RequestParameters {
    pub protocol: String,
    pub domain: String,
    pub port: u16,
    pub path: Option<String>,
    pub query_parameters: QueryParameters,
    pub request_method: String,
    pub rate_limit: u32,
    pub rate_limit_window: u32,
    pub timeout: u64,
    pub retry_count: u32,
    pub cache_duration: u64,
    pub cache_enabled: bool,
    pub max_connections: u32,
    pub api_key: Option<String>,
    pub logging_enabled: bool,
    pub allowed_origins: String,
    pub error_handling: String,
    pub authentication_required: bool,
    pub authentication_details: AuthenticationDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryParameters {
    pub geo: Option<String>,
}

impl QueryParameters {
    /// Non-null parameters as `(name, value)` pairs.
    fn present(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(geo) = self.geo.as_deref() {
            pairs.push(("geo", geo));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthenticationDetails {
    #[serde(rename = "type")]
    pub auth_type: Option<String>,
    pub location: Option<String>,
    pub required: bool,
}

/// Correlation headers attached to one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHeaders {
    pub correlation_id: String,
    pub trace_id: String,
}

impl TraceHeaders {
    /// A fresh trace id, used for both headers.
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            correlation_id: id[..16].to_string(),
            trace_id: id[..16].to_string(),
        }
    }
}

impl DataCollectRequest {
    pub fn for_item(item: &Item, defaults: &RequestDefaults) -> Self {
        let authenticated = defaults.api_key.as_ref().is_some_and(|k| !k.is_empty());
        Self {
            id: format!("task.{}", item.id),
            service: ServiceSpec {
                service_id: item.id.to_string(),
                status_type: StatusType::Active,
                service_type: ServiceType::Api,
                access_type: defaults.access_type,
                fetch_frequency: defaults.fetch_frequency_secs,
                time_interval: 0,
                next_fetch: None,
                last_fetched: None,
                last_error_message: None,
                access_method: if authenticated {
                    AccessMethod::ApiKey
                } else {
                    AccessMethod::OpenAccess
                },
                data_format: defaults.data_format,
                parameters: RequestParameters {
                    protocol: defaults.protocol.clone(),
                    domain: item.domain.clone(),
                    port: defaults.port,
                    path: defaults.path.clone(),
                    query_parameters: QueryParameters {
                        geo: defaults.geo.clone(),
                    },
                    request_method: defaults.request_method.clone(),
                    rate_limit: defaults.rate_limit,
                    rate_limit_window: defaults.rate_limit_window_secs,
                    timeout: defaults.timeout_ms,
                    retry_count: defaults.retry_count,
                    cache_duration: defaults.cache_duration_secs,
                    cache_enabled: defaults.cache_enabled,
                    max_connections: defaults.max_connections,
                    api_key: defaults.api_key.clone(),
                    logging_enabled: true,
                    allowed_origins: defaults.allowed_origins.clone(),
                    error_handling: "retry".to_string(),
                    authentication_required: authenticated,
                    authentication_details: AuthenticationDetails {
                        auth_type: authenticated.then(|| "api_key".to_string()),
                        location: authenticated.then(|| "header".to_string()),
                        required: authenticated,
                    },
                },
            },
        }
    }

    /// `protocol://domain:port[path][?query]`, with no trailing `?` when there is no query.
    pub fn target_url(&self) -> String {
        let p = &self.service.parameters;
        let query = p
            .query_parameters
            .present()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut url = format!(
            "{}://{}:{}{}",
            p.protocol,
            p.domain,
            p.port,
            p.path.as_deref().unwrap_or("")
        );
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

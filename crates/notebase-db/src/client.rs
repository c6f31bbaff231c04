//! Database gateway: an authenticated FQL query client.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use notebase_core::{defaults, Error, Result};

use crate::fql::Expr;

/// Wire protocol version sent with every query.
const API_VERSION: &str = "4";

/// Executes FQL expressions against the database.
///
/// Implementations hold a single credential; [`Gateway::scoped`] derives a
/// gateway for another credential on the same endpoint.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Run one query and return its result, unwrapped from the response envelope.
    async fn execute(&self, expr: &Expr) -> Result<Value>;

    /// Gateway authenticated with `secret` instead of this gateway's own.
    fn scoped(&self, secret: &str) -> Self
    where
        Self: Sized;
}

/// Run `expr` and decode the result as `T`.
pub async fn query<G, T>(gateway: &G, expr: &Expr) -> Result<T>
where
    G: Gateway + ?Sized,
    T: DeserializeOwned,
{
    let value = gateway.execute(expr).await?;
    serde_json::from_value(value).map_err(|e| Error::Serialization(format!("decode result: {}", e)))
}

/// Gateway connection settings.
#[derive(Clone)]
pub struct FaunaConfig {
    pub secret: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl fmt::Debug for FaunaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaunaConfig")
            .field("secret", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FaunaConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            endpoint: defaults::FAUNA_ENDPOINT.to_string(),
            timeout: Duration::from_secs(defaults::QUERY_TIMEOUT_SECS),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build from environment variables.
    ///
    /// - `FAUNA_SECRET` (legacy name: `FAUNA_ENV`) - required
    /// - `FAUNA_ENDPOINT` - default [`defaults::FAUNA_ENDPOINT`]
    /// - `FAUNA_TIMEOUT_SECS` - default [`defaults::QUERY_TIMEOUT_SECS`]
    pub fn from_env() -> Result<Self> {
        let secret = std::env::var("FAUNA_SECRET")
            .or_else(|_| std::env::var("FAUNA_ENV"))
            .map_err(|_| Error::Config("FAUNA_SECRET is not set".to_string()))?;
        Self::from_env_with_secret(secret)
    }

    /// Endpoint and timeout from the environment, secret supplied by the caller.
    pub fn from_env_with_secret(secret: String) -> Result<Self> {
        if secret.trim().is_empty() {
            return Err(Error::Config("database secret is empty".to_string()));
        }

        let mut config = Self::new(secret);
        if let Ok(endpoint) = std::env::var("FAUNA_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(raw) = std::env::var("FAUNA_TIMEOUT_SECS") {
            config.timeout = parse_timeout(&raw)?;
        }
        Ok(config)
    }
}

/// Parse `FAUNA_TIMEOUT_SECS`. Zero is rejected: it would fail every query
/// before it is sent.
fn parse_timeout(raw: &str) -> Result<Duration> {
    let secs = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("FAUNA_TIMEOUT_SECS is not a number: {}", raw)))?;
    if secs == 0 {
        return Err(Error::Config("FAUNA_TIMEOUT_SECS must be at least 1".to_string()));
    }
    Ok(Duration::from_secs(secs))
}

/// HTTP client for the database's FQL endpoint.
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Clone)]
pub struct FaunaClient {
    http: Client,
    url: String,
    secret: String,
    timeout: Duration,
}

impl fmt::Debug for FaunaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaunaClient")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FaunaClient {
    pub fn new(config: FaunaConfig) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        let url = format!("{}/", config.endpoint.trim_end_matches('/'));
        info!(
            subsystem = "db",
            component = "gateway",
            endpoint = %url,
            timeout_secs = config.timeout.as_secs(),
            "Database gateway initialized"
        );

        Ok(Self {
            http,
            url,
            secret: config.secret,
            timeout: config.timeout,
        })
    }

    /// A client for `secret` sharing this client's endpoint, timeout and pool.
    pub fn session(&self, secret: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            url: self.url.clone(),
            secret: secret.into(),
            timeout: self.timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(skip_all, fields(subsystem = "db", component = "gateway", op = "execute"))]
    async fn send(&self, expr: &Expr) -> Result<Value> {
        let start = Instant::now();

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.secret)
            .header("X-FaunaDB-API-Version", API_VERSION)
            .header("X-Query-Timeout", self.timeout.as_millis().to_string())
            .timeout(self.timeout)
            .json(expr)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(status, duration_ms = elapsed, "Query complete");
        if elapsed > defaults::SLOW_QUERY_MS {
            warn!(duration_ms = elapsed, slow = true, "Slow database query");
        }

        decode_response(status, &body)
    }
}

#[async_trait]
impl Gateway for FaunaClient {
    async fn execute(&self, expr: &Expr) -> Result<Value> {
        self.send(expr).await
    }

    fn scoped(&self, secret: &str) -> Self {
        self.session(secret)
    }
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    resource: Option<Value>,
    #[serde(default)]
    errors: Vec<QueryError>,
}

#[derive(Debug, Deserialize)]
struct QueryError {
    code: String,
    #[serde(default)]
    description: String,
}

/// Turn a raw HTTP answer into the query result or a classified error.
pub(crate) fn decode_response(status: u16, body: &str) -> Result<Value> {
    let parsed: QueryResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) if status == 401 => {
            return Err(Error::Unauthorized("database rejected the secret".to_string()))
        }
        Err(e) => {
            return Err(Error::Serialization(format!(
                "unreadable response (HTTP {}): {}",
                status, e
            )))
        }
    };

    if let Some(first) = parsed.errors.first() {
        return Err(classify(first));
    }

    if !(200..300).contains(&status) {
        return Err(Error::Query(format!("HTTP {} without error details", status)));
    }

    parsed
        .resource
        .map(unescape)
        .ok_or_else(|| Error::Serialization("response carried no resource".to_string()))
}

fn classify(err: &QueryError) -> Error {
    let detail = if err.description.is_empty() {
        err.code.clone()
    } else {
        err.description.clone()
    };
    match err.code.as_str() {
        "instance not found" => Error::NotFound(detail),
        "instance already exists" => Error::AlreadyExists(detail),
        "instance not unique" => Error::NotUnique(detail),
        "unauthorized" | "permission denied" => Error::Unauthorized(detail),
        code => Error::Query(format!("{}: {}", code, detail)),
    }
}

/// Strip `@obj` escapes the database adds around user objects whose keys
/// collide with its own tags.
fn unescape(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if map.len() == 1 {
                if let Some(inner) = map.remove("@obj") {
                    return unescape(inner);
                }
            }
            Value::Object(map.into_iter().map(|(k, v)| (k, unescape(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unescape).collect()),
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("5").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout(" 30 ").unwrap(), Duration::from_secs(30));
        assert!(matches!(parse_timeout("0"), Err(Error::Config(_))));
        assert!(matches!(parse_timeout("abc"), Err(Error::Config(_))));
        assert!(matches!(parse_timeout("-1"), Err(Error::Config(_))));
    }

    #[test]
    fn test_decode_success_resource() {
        let body = json!({ "resource": true }).to_string();
        assert_eq!(decode_response(200, &body).unwrap(), json!(true));
    }

    #[test]
    fn test_decode_instance_not_found() {
        let body = json!({
            "errors": [{ "position": [], "code": "instance not found", "description": "Document not found." }]
        })
        .to_string();
        let err = decode_response(404, &body).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: Document not found.");
    }

    #[test]
    fn test_decode_already_exists() {
        let body = json!({
            "errors": [{ "code": "instance already exists", "description": "Database already exists." }]
        })
        .to_string();
        assert!(decode_response(400, &body).unwrap_err().is_already_exists());
    }

    #[test]
    fn test_decode_not_unique() {
        let body = json!({
            "errors": [{ "code": "instance not unique", "description": "document is not unique." }]
        })
        .to_string();
        assert!(decode_response(400, &body).unwrap_err().is_not_unique());
    }

    #[test]
    fn test_decode_unauthorized_without_json() {
        let err = decode_response(401, "Unauthorized").unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_decode_unknown_code_is_query_error() {
        let body = json!({
            "errors": [{ "code": "invalid argument", "description": "Number expected." }]
        })
        .to_string();
        let err = decode_response(400, &body).unwrap_err();
        assert_eq!(err.to_string(), "Query error: invalid argument: Number expected.");
    }

    #[test]
    fn test_decode_garbage_body() {
        let err = decode_response(502, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_unescape_obj() {
        let body = json!({
            "resource": { "data": { "@obj": { "@ref": "literal" } } }
        })
        .to_string();
        assert_eq!(
            decode_response(200, &body).unwrap(),
            json!({ "data": { "@ref": "literal" } })
        );
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = FaunaConfig::new("fnAE-very-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("fnAE-very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_config_defaults() {
        let config = FaunaConfig::new("s");
        assert_eq!(config.endpoint, defaults::FAUNA_ENDPOINT);
        assert_eq!(config.timeout, Duration::from_secs(defaults::QUERY_TIMEOUT_SECS));
    }

    #[test]
    fn test_client_url_has_single_trailing_slash() {
        let client =
            FaunaClient::new(FaunaConfig::new("s").with_endpoint("http://localhost:8443/")).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8443/");
    }

    #[test]
    fn test_session_keeps_endpoint() {
        let admin =
            FaunaClient::new(FaunaConfig::new("admin").with_endpoint("http://localhost:8443")).unwrap();
        let session = admin.session("scoped");
        assert_eq!(session.endpoint(), admin.endpoint());
        assert_eq!(session.timeout(), admin.timeout());
    }
}

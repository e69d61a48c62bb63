use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use base64::Engine; // for STANDARD.encode
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::{ApiError, Error, ErrorKind, RequestContext, TransportError};
use crate::limiter::RateLimiter;

/// HTTP verbs used by the Customer.io API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Whether requests with this verb carry a body at all.
    /// POST/PUT always send one (empty string when there is no logical
    /// payload); GET/DELETE never do.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Logical endpoint class; selects the base URL and the rate limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointClass {
    Tracking,
    Api,
}

/// A fully built outgoing request as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// None for GET/DELETE; Some (possibly empty) for POST/PUT.
    pub body: Option<String>,
}

/// Raw transport outcome: a status line plus the undecoded body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport capability consumed by the dispatcher. Injected at
/// construction so tests can substitute a fake without global state.
pub trait HttpExecutor: Send + Sync {
    fn execute(&self, req: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

/// Production transport backed by a pooled reqwest client with basic auth.
#[derive(Debug)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
    auth: HeaderValue,
}

impl ReqwestExecutor {
    pub fn new(cfg: &Config) -> Result<Self, Error> {
        let ua = HeaderValue::from_str(&cfg.user_agent)
            .map_err(|_| Error::Config("user_agent is not a valid header value"))?;
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, ua);
        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Transport(TransportError::from(e)))?;
        Ok(Self {
            client,
            auth: basic_auth_header(&cfg.site_id, &cfg.api_key),
        })
    }
}

impl HttpExecutor for ReqwestExecutor {
    fn execute(&self, req: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(req.method.into(), &req.url)
                .header(AUTHORIZATION, self.auth.clone());
            if let Some(body) = req.body {
                builder = builder
                    .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                    .body(body);
            }
            let res = builder.send().await.map_err(|e| {
                warn!("request to {} failed before a response: {}", req.url, e);
                TransportError::from(e)
            })?;
            let status = res.status();
            let body = res.text().await.map_err(TransportError::from)?;
            Ok(HttpResponse { status, body })
        })
    }
}

fn basic_auth_header(site_id: &str, api_key: &str) -> HeaderValue {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", site_id, api_key));
    let mut value =
        HeaderValue::from_str(&format!("Basic {}", encoded)).expect("valid header");
    value.set_sensitive(true);
    value
}

/// Join a relative path onto a base URL with exactly one `/` separator.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Percent-encode a user-supplied id so it stays a single path segment.
pub fn encode_path_segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Normalize an HTTP response into a decoded payload or a classified error.
///
/// Precedence: status buckets first (404, 400, 401, the 5xx retryable set,
/// then any other non-2xx), and only then body decoding. Transport failures
/// never reach this function; they pass through the dispatcher unchanged.
pub fn classify(context: RequestContext, response: &HttpResponse) -> Result<Value, ApiError> {
    let status = response.status;
    let kind = match status.as_u16() {
        404 => Some(ErrorKind::ResourceNotFound),
        400 => Some(ErrorKind::InvalidRequest),
        401 => Some(ErrorKind::InvalidApiKey),
        500 | 502 | 503 | 504 => Some(ErrorKind::InternalServerErr),
        _ if !status.is_success() => Some(ErrorKind::UnexpectedHttpCode),
        _ => None,
    };
    if let Some(kind) = kind {
        return Err(ApiError {
            kind,
            status: Some(status),
            detail: format!("{}: {}", status, response.body),
            context,
        });
    }
    // The tracking API answers many calls with an empty 2xx body; that is
    // a success, not a malformed payload.
    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(&response.body) {
        Ok(value) => Ok(value),
        Err(e) => Err(ApiError {
            kind: ErrorKind::UnexpectedResponseFormat,
            status: Some(status),
            detail: format!("{} (raw response: {})", e, response.body),
            context,
        }),
    }
}

/// Admission-controlled request dispatcher.
///
/// Owns one rate limiter per endpoint class. Every request passes through
/// `acquire()` exactly once before it touches the transport; the dispatcher
/// performs no retries and surfaces every failure unchanged.
pub struct Dispatcher {
    executor: Box<dyn HttpExecutor>,
    track_base: String,
    api_base: String,
    track_limiter: RateLimiter,
    api_limiter: RateLimiter,
}

impl Dispatcher {
    pub fn new(cfg: &Config, executor: Box<dyn HttpExecutor>) -> Self {
        Self {
            executor,
            track_base: cfg.track_url.clone(),
            api_base: cfg.api_url.clone(),
            track_limiter: RateLimiter::from_limit(cfg.track_limit),
            api_limiter: RateLimiter::from_limit(cfg.api_limit),
        }
    }

    fn route(&self, class: EndpointClass) -> (&str, &RateLimiter) {
        match class {
            EndpointClass::Tracking => (&self.track_base, &self.track_limiter),
            EndpointClass::Api => (&self.api_base, &self.api_limiter),
        }
    }

    /// Dispatch one request: wait for admission, send, classify.
    pub async fn dispatch(
        &self,
        class: EndpointClass,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let (base, limiter) = self.route(class);
        limiter.acquire().await;

        // POST/PUT with no logical payload still send an empty string body;
        // GET/DELETE send no body field at all.
        let serialized = if method.carries_body() {
            Some(body.map(Value::to_string).unwrap_or_default())
        } else {
            None
        };
        let context = RequestContext {
            method,
            path: path.to_string(),
            body: serialized.clone(),
        };
        let url = join_url(base, path);
        debug!("dispatching {} {}", method, url);

        let response = self
            .executor
            .execute(HttpRequest {
                method,
                url,
                body: serialized,
            })
            .await?;
        let payload = classify(context, &response)?;
        Ok(payload)
    }
}

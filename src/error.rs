use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::Method;

/// Constant tag identifying this client in classified errors.
pub const SOURCE_TAG: &str = "customerio";

/// Closed set of HTTP-domain error kinds produced by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ResourceNotFound,
    InvalidRequest,
    InvalidApiKey,
    InternalServerErr,
    UnexpectedHttpCode,
    UnexpectedResponseFormat,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ResourceNotFound => "resource_not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::InvalidApiKey => "invalid_api_key",
            ErrorKind::InternalServerErr => "internal_server_err",
            ErrorKind::UnexpectedHttpCode => "unexpected_http_code",
            ErrorKind::UnexpectedResponseFormat => "unexpected_response_format",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Descriptor of the originating request, attached to every classified
/// error so callers can diagnose or retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A classified HTTP-domain failure: kind, diagnostic detail, and the
/// request that produced it.
#[derive(Debug, Error)]
#[error("{} {kind} on {context}: {detail}", SOURCE_TAG)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub status: Option<StatusCode>,
    pub detail: String,
    pub context: RequestContext,
}

/// Connection-level failure raised before any HTTP response existed.
/// Carried unchanged through classification, never mapped to an HTTP kind.
#[derive(Debug, Error)]
#[error("transport failure: {0}")]
pub struct TransportError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError(Box::new(e))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Fatal configuration problem detected at construction time.
    #[error("configuration error: {0}")]
    Config(&'static str),
    /// Transport failure passthrough.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Classified HTTP-domain error.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    /// Classified kind, if this is an HTTP-domain error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Api(e) => Some(e.kind),
            _ => None,
        }
    }
}

//! Async client for the Customer.io tracking and campaign APIs.
//!
//! Every call flows through an admission-controlled dispatcher: a FIFO
//! token-bucket [`RateLimiter`] per endpoint class gates when a request may
//! start, and every transport outcome is normalized into the closed
//! [`ErrorKind`] taxonomy before it reaches the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod limiter;

pub use client::Client;
pub use config::{Config, RateLimit};
pub use error::{ApiError, Error, ErrorKind, RequestContext, TransportError};
pub use http::{EndpointClass, Method};
pub use limiter::RateLimiter;

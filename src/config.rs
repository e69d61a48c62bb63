use std::env;
use std::time::Duration;

use url::Url;

use crate::error::Error;

pub const DEFAULT_TRACK_URL: &str = "https://track.customer.io/api/v1";
pub const DEFAULT_API_URL: &str = "https://api.customer.io/v1/api";

/// Admission budget for one endpoint class: `capacity` grants per `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub capacity: u32,
    pub interval: Duration,
}

impl RateLimit {
    pub fn per_second(capacity: u32) -> Self {
        Self {
            capacity,
            interval: Duration::from_secs(1),
        }
    }
}

/// Runtime configuration for the Customer.io client.
/// Credentials are mandatory at construction; everything else has defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub site_id: String,
    pub api_key: String,
    pub track_url: String,
    pub api_url: String,
    pub track_limit: RateLimit,
    pub api_limit: RateLimit,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Config {
    /// Build a configuration with the documented Customer.io defaults:
    /// 30 tracking admissions/second and 10 api admissions/second.
    ///
    /// Fails with [`Error::Config`] if either credential is empty.
    pub fn new(site_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        let site_id = site_id.into();
        let api_key = api_key.into();
        if site_id.is_empty() {
            return Err(Error::Config("site_id must not be empty"));
        }
        if api_key.is_empty() {
            return Err(Error::Config("api_key must not be empty"));
        }
        Ok(Self {
            site_id,
            api_key,
            track_url: DEFAULT_TRACK_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            track_limit: RateLimit::per_second(30),
            api_limit: RateLimit::per_second(10),
            timeout_secs: 30,
            user_agent: format!("customerio-rust/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Load configuration from environment.
    ///
    /// Env vars:
    /// - CUSTOMERIO_SITE_ID [required]
    /// - CUSTOMERIO_API_KEY [required]
    /// - CUSTOMERIO_TRACK_URL (default: https://track.customer.io/api/v1)
    /// - CUSTOMERIO_API_URL (default: https://api.customer.io/v1/api)
    /// - CUSTOMERIO_HTTP_TIMEOUT_SECS (default: 30)
    pub fn from_env() -> Result<Self, Error> {
        let site_id = env::var("CUSTOMERIO_SITE_ID")
            .map_err(|_| Error::Config("missing CUSTOMERIO_SITE_ID"))?;
        let api_key = env::var("CUSTOMERIO_API_KEY")
            .map_err(|_| Error::Config("missing CUSTOMERIO_API_KEY"))?;
        let mut cfg = Self::new(site_id, api_key)?;
        if let Ok(url) = env::var("CUSTOMERIO_TRACK_URL") {
            cfg.track_url = url;
        }
        if let Ok(url) = env::var("CUSTOMERIO_API_URL") {
            cfg.api_url = url;
        }
        if let Some(secs) = env::var("CUSTOMERIO_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            cfg.timeout_secs = secs;
        }
        Ok(cfg)
    }

    /// Validate that both base URLs parse as absolute URLs.
    pub fn validate(&self) -> Result<(), Error> {
        Url::parse(&self.track_url).map_err(|_| Error::Config("track_url is not a valid URL"))?;
        Url::parse(&self.api_url).map_err(|_| Error::Config("api_url is not a valid URL"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let cfg = Config::new("site", "key").unwrap();
        assert_eq!(cfg.track_limit, RateLimit::per_second(30));
        assert_eq!(cfg.api_limit, RateLimit::per_second(10));
        assert_eq!(cfg.track_url, DEFAULT_TRACK_URL);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_credentials_are_fatal() {
        assert!(matches!(Config::new("", "key"), Err(Error::Config(_))));
        assert!(matches!(Config::new("site", ""), Err(Error::Config(_))));
    }

    #[test]
    fn bad_base_url_fails_validation() {
        let mut cfg = Config::new("site", "key").unwrap();
        cfg.track_url = "not a url".into();
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));
    }
}

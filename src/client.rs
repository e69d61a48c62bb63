use serde_json::{json, Value};

use crate::config::Config;
use crate::error::Error;
use crate::http::{encode_path_segment, Dispatcher, EndpointClass, HttpExecutor, Method, ReqwestExecutor};

/// Customer.io API client: configuration plus the rate-limited dispatcher.
///
/// All entry points funnel through [`Client::track`] or [`Client::api`],
/// which gate admission on the tracking (30/s default) and campaign api
/// (10/s default) limiters respectively.
pub struct Client {
    dispatcher: Dispatcher,
}

impl Client {
    /// Build a client with the production reqwest transport.
    pub fn new(cfg: Config) -> Result<Self, Error> {
        cfg.validate()?;
        let executor = ReqwestExecutor::new(&cfg)?;
        Ok(Self {
            dispatcher: Dispatcher::new(&cfg, Box::new(executor)),
        })
    }

    /// Build a client with an injected transport. Used by tests to run the
    /// pipeline against a fake executor.
    pub fn with_executor(cfg: Config, executor: Box<dyn HttpExecutor>) -> Result<Self, Error> {
        cfg.validate()?;
        Ok(Self {
            dispatcher: Dispatcher::new(&cfg, executor),
        })
    }

    /// Dispatch against the tracking endpoint class.
    pub async fn track(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.dispatcher
            .dispatch(EndpointClass::Tracking, method, path, body)
            .await
    }

    /// Dispatch against the campaign api endpoint class.
    pub async fn api(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.dispatcher
            .dispatch(EndpointClass::Api, method, path, body)
            .await
    }

    // Thin argument-shaping wrappers over the two entry points. No logic
    // beyond path construction and body shaping belongs here.

    /// Create or update a customer profile.
    pub async fn identify(&self, customer_id: &str, attributes: &Value) -> Result<Value, Error> {
        let path = format!("customers/{}", encode_path_segment(customer_id));
        self.track(Method::Put, &path, Some(attributes)).await
    }

    /// Delete a customer profile.
    pub async fn delete_customer(&self, customer_id: &str) -> Result<Value, Error> {
        let path = format!("customers/{}", encode_path_segment(customer_id));
        self.track(Method::Delete, &path, None).await
    }

    /// Emit a named event for a customer.
    pub async fn emit_event(
        &self,
        customer_id: &str,
        name: &str,
        data: Option<&Value>,
    ) -> Result<Value, Error> {
        let path = format!("customers/{}/events", encode_path_segment(customer_id));
        let body = event_body(name, data);
        self.track(Method::Post, &path, Some(&body)).await
    }

    /// Emit a named event not tied to a known customer.
    pub async fn anonymous_event(&self, name: &str, data: Option<&Value>) -> Result<Value, Error> {
        let body = event_body(name, data);
        self.track(Method::Post, "events", Some(&body)).await
    }

    /// Add customer ids to a manual segment.
    pub async fn add_to_segment(
        &self,
        segment_id: u32,
        customer_ids: &[&str],
    ) -> Result<Value, Error> {
        let path = format!("segments/{}/add_customers", segment_id);
        let body = json!({ "ids": customer_ids });
        self.track(Method::Post, &path, Some(&body)).await
    }

    /// Remove customer ids from a manual segment.
    pub async fn remove_from_segment(
        &self,
        segment_id: u32,
        customer_ids: &[&str],
    ) -> Result<Value, Error> {
        let path = format!("segments/{}/remove_customers", segment_id);
        let body = json!({ "ids": customer_ids });
        self.track(Method::Post, &path, Some(&body)).await
    }

    /// Trigger an API-triggered broadcast campaign.
    pub async fn trigger_broadcast(
        &self,
        campaign_id: u32,
        data: Option<&Value>,
    ) -> Result<Value, Error> {
        let path = format!("campaigns/{}/triggers", campaign_id);
        self.api(Method::Post, &path, data).await
    }

    /// Look up the status of a previously created broadcast trigger.
    pub async fn get_trigger(&self, campaign_id: u32, trigger_id: u32) -> Result<Value, Error> {
        let path = format!("campaigns/{}/triggers/{}", campaign_id, trigger_id);
        self.api(Method::Get, &path, None).await
    }
}

fn event_body(name: &str, data: Option<&Value>) -> Value {
    match data {
        Some(data) => json!({ "name": name, "data": data }),
        None => json!({ "name": name }),
    }
}

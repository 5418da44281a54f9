//! PostgREST client for the hosted store (`{url}/rest/v1/...`).

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;

use super::{Order, RowStore};
use crate::config::RemoteConfig;
use crate::error::GatewayError;
use crate::models::RowId;

#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// `order=` query value: `is_pinned.desc,created_at.desc`.
pub fn order_param(order: &[Order]) -> String {
    order
        .iter()
        .map(|o| {
            format!(
                "{}.{}",
                o.column,
                if o.ascending { "asc" } else { "desc" }
            )
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn id_filter(id: &RowId) -> String {
    format!("eq.{id}")
}

impl RestStore {
    pub fn new(config: &RemoteConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.anon_key.clone(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
    }

    /// Send and turn non-2xx statuses into `GatewayError::Server` with the
    /// store's error message when it provides one.
    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
            .unwrap_or(body);

        tracing::warn!(status = %status, message = %message, "remote store rejected request");
        Err(GatewayError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RowStore for RestStore {
    #[tracing::instrument(skip(self, order), fields(table = %table))]
    async fn select(&self, table: &str, order: &[Order]) -> Result<Vec<Value>, GatewayError> {
        let mut query = vec![("select", "*".to_string())];
        if !order.is_empty() {
            query.push(("order", order_param(order)));
        }

        let response = self
            .send(self.client.get(self.table_url(table)).query(&query))
            .await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    async fn select_one(&self, table: &str, id: &RowId) -> Result<Option<Value>, GatewayError> {
        let response = self
            .send(
                self.client
                    .get(self.table_url(table))
                    .query(&[("select", "*".to_string()), ("id", id_filter(id))]),
            )
            .await?;
        let rows = response.json::<Vec<Value>>().await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, table: &str, record: Value) -> Result<(), GatewayError> {
        self.send(
            self.client
                .post(self.table_url(table))
                .header("Prefer", "return=minimal")
                .json(&[record]),
        )
        .await?;
        Ok(())
    }

    async fn update(&self, table: &str, id: &RowId, patch: Value) -> Result<(), GatewayError> {
        self.send(
            self.client
                .patch(self.table_url(table))
                .query(&[("id", id_filter(id))])
                .header("Prefer", "return=minimal")
                .json(&patch),
        )
        .await?;
        Ok(())
    }

    async fn delete(&self, table: &str, id: &RowId) -> Result<(), GatewayError> {
        self.send(
            self.client
                .delete(self.table_url(table))
                .query(&[("id", id_filter(id))]),
        )
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, args), fields(function = %function))]
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, GatewayError> {
        let response = self
            .send(self.client.post(self.rpc_url(function)).json(&args))
            .await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Mirrors the dashboard's connectivity probe: a count on `projects`.
    async fn ping(&self) -> Result<(), GatewayError> {
        self.send(
            self.client
                .get(self.table_url(crate::models::tables::PROJECTS))
                .query(&[("select", "count")]),
        )
        .await?;
        Ok(())
    }
}

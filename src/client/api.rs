//! HTTP backend for the remote slip and placed-bets collections.
//!
//! Endpoints live under `{base}/redis/...` and answer either with a
//! `{ "success": bool, "data": ... }` envelope or with the raw body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::debug;

use super::{ClientError, ClientResult};
use crate::placement::PlacedBet;
use crate::slip::Slip;
use crate::storage::{PlacedBetsStore, RemoteSlipStore, StoreResult};

const DEFAULT_MAX_RETRIES: u32 = 2;

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Unwrap an API body: enveloped payloads yield `data`, anything else is taken as-is.
/// `null` bodies come back as `None`.
fn unwrap_body<T: DeserializeOwned>(body: Value) -> ClientResult<Option<T>> {
    let enveloped = matches!(&body, Value::Object(map) if map.contains_key("success"));
    let payload = if enveloped {
        let env: Envelope = serde_json::from_value(body)?;
        if !env.success {
            return Err(ClientError::Rejected(
                env.error.unwrap_or_else(|| "unspecified".to_string()),
            ));
        }
        env.data
    } else {
        body
    };

    if payload.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(payload)?))
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    max_retries: u32,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        if base_url.trim().is_empty() {
            return Err(ClientError::Config("api base url is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent("wager-slip/0.1")
            .timeout(timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn slip_url(&self, user_id: &str) -> String {
        format!("{}/redis/betslip/{}/active", self.base_url, user_id)
    }

    pub fn bets_url(&self, user_id: &str) -> String {
        format!("{}/redis/bets/{}", self.base_url, user_id)
    }

    fn backoff(attempt: u32) -> Duration {
        let capped = attempt.min(4);
        Duration::from_millis((200 * (1_u64 << capped)).min(2_000))
    }

    /// Send a request, retrying transport and 5xx failures. A 404 reads as an empty body.
    async fn send<TBody>(&self, method: Method, url: &str, body: Option<&TBody>) -> ClientResult<Value>
    where
        TBody: Serialize + ?Sized,
    {
        let mut attempt = 0;
        loop {
            let mut req = self.http.request(method.clone(), url);
            if let Some(body) = body {
                req = req.json(body);
            }

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status == StatusCode::NOT_FOUND {
                        return Ok(Value::Null);
                    }
                    if status.is_success() {
                        let text = resp.text().await?;
                        if text.trim().is_empty() {
                            return Ok(Value::Null);
                        }
                        return Ok(serde_json::from_str(&text)?);
                    }
                    if status.is_server_error() && attempt < self.max_retries {
                        attempt += 1;
                        debug!(target: "sync", %url, %status, attempt, "retrying request");
                        sleep(Self::backoff(attempt)).await;
                        continue;
                    }
                    let body = resp.text().await.unwrap_or_default();
                    return Err(ClientError::HttpStatus { status, body });
                }
                Err(err) => {
                    if attempt < self.max_retries && !err.is_timeout() {
                        attempt += 1;
                        sleep(Self::backoff(attempt)).await;
                        continue;
                    }
                    return Err(ClientError::Http(err));
                }
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> ClientResult<Option<T>> {
        let body = self.send(Method::GET, url, Option::<&()>::None).await?;
        unwrap_body(body)
    }

    async fn post_json<TBody>(&self, url: &str, body: &TBody) -> ClientResult<()>
    where
        TBody: Serialize + ?Sized,
    {
        let resp = self.send(Method::POST, url, Some(body)).await?;
        // Only an explicit envelope failure counts; the payload itself is ignored.
        unwrap_body::<Value>(resp)?;
        Ok(())
    }
}

#[async_trait]
impl RemoteSlipStore for ApiClient {
    async fn read(&self, user_id: &str) -> StoreResult<Option<Slip>> {
        Ok(self.get_json(&self.slip_url(user_id)).await?)
    }

    async fn write(&self, user_id: &str, slip: &Slip) -> StoreResult<()> {
        Ok(self.post_json(&self.slip_url(user_id), slip).await?)
    }
}

#[async_trait]
impl PlacedBetsStore for ApiClient {
    /// The endpoint stores the whole collection, so appending rewrites it.
    async fn append(&self, user_id: &str, bet: &PlacedBet) -> StoreResult<()> {
        let mut bets = self.list(user_id).await?;
        bets.push(bet.clone());
        Ok(self.post_json(&self.bets_url(user_id), &bets).await?)
    }

    async fn list(&self, user_id: &str) -> StoreResult<Vec<PlacedBet>> {
        let bets: Option<Vec<PlacedBet>> = self.get_json(&self.bets_url(user_id)).await?;
        Ok(bets.unwrap_or_default())
    }
}

//! Remote basket transport.
//!
//! A basket is one JSON document per `(account, basket name)`. The transport
//! only moves documents; merging is done by the caller before `put_basket`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Response, StatusCode};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text};

/// Body of a successful basket response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteBody {
    Json(Value),
    /// The endpoint answered with something that is not JSON
    Text(String),
}

impl RemoteBody {
    /// Parse a body as JSON, keeping the raw text when it is not.
    #[must_use]
    pub fn parse(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }
}

/// Basket operations against one remote key-value store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read a basket. A missing basket is [`Error::NotFound`].
    async fn fetch_basket(&self, account_id: &str, basket_name: &str) -> Result<RemoteBody>;

    /// Create or replace a basket with `data`.
    async fn put_basket(
        &self,
        account_id: &str,
        basket_name: &str,
        data: &Value,
    ) -> Result<RemoteBody>;

    /// Remove a basket.
    async fn delete_basket(&self, account_id: &str, basket_name: &str) -> Result<()>;
}

/// HTTP client for the Pantry basket API
#[derive(Clone)]
pub struct PantryClient {
    base_url: String,
    client: reqwest::Client,
}

impl PantryClient {
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let mut builder = reqwest::Client::builder();
        if let Some(request_timeout) = request_timeout {
            builder = builder.timeout(request_timeout);
        }
        Ok(Self {
            base_url,
            client: builder.build()?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/{account}/basket/{basket}` with both segments percent-encoded
    #[must_use]
    pub fn basket_url(&self, account_id: &str, basket_name: &str) -> String {
        format!(
            "{}/{}/basket/{}",
            self.base_url,
            urlencoding::encode(account_id),
            urlencoding::encode(basket_name)
        )
    }
}

#[async_trait]
impl RemoteStore for PantryClient {
    async fn fetch_basket(&self, account_id: &str, basket_name: &str) -> Result<RemoteBody> {
        tracing::debug!(basket = basket_name, "Fetching basket");
        let response = self
            .client
            .get(self.basket_url(account_id, basket_name))
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        read_body(response, basket_name).await
    }

    async fn put_basket(
        &self,
        account_id: &str,
        basket_name: &str,
        data: &Value,
    ) -> Result<RemoteBody> {
        tracing::debug!(basket = basket_name, "Writing basket");
        // POST replaces the basket; PUT would deep-merge server side and
        // resurrect records deleted locally.
        let response = self
            .client
            .post(self.basket_url(account_id, basket_name))
            .json(data)
            .send()
            .await?;
        read_body(response, basket_name).await
    }

    async fn delete_basket(&self, account_id: &str, basket_name: &str) -> Result<()> {
        tracing::debug!(basket = basket_name, "Deleting basket");
        let response = self
            .client
            .delete(self.basket_url(account_id, basket_name))
            .send()
            .await?;
        check_status(response.status(), basket_name)
    }
}

async fn read_body(response: Response, basket_name: &str) -> Result<RemoteBody> {
    check_status(response.status(), basket_name)?;
    let text = response.text().await?;
    Ok(RemoteBody::parse(text))
}

fn check_status(status: StatusCode, basket_name: &str) -> Result<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(basket_name.to_string()));
    }
    if !status.is_success() {
        return Err(transport_error(status));
    }
    Ok(())
}

fn transport_error(status: StatusCode) -> Error {
    Error::Transport {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let base_url = normalize_text(raw)
        .ok_or_else(|| Error::InvalidInput("base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}

/// Which basket operation a [`MemoryRemoteStore`] failure applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    Fetch,
    Put,
    Delete,
}

/// In-process basket store that counts calls, for tests and offline demos.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    baskets: Mutex<HashMap<String, RemoteBody>>,
    failures: Mutex<HashMap<RemoteOperation, u16>>,
    fetch_calls: AtomicUsize,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_basket(&self, account_id: &str, basket_name: &str, body: RemoteBody) {
        lock(&self.baskets).insert(basket_key(account_id, basket_name), body);
    }

    #[must_use]
    pub fn basket(&self, account_id: &str, basket_name: &str) -> Option<RemoteBody> {
        lock(&self.baskets)
            .get(&basket_key(account_id, basket_name))
            .cloned()
    }

    /// Make every later `operation` answer with HTTP `status`.
    pub fn fail_operation(&self, operation: RemoteOperation, status: u16) {
        lock(&self.failures).insert(operation, status);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn put_count(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, operation: RemoteOperation) -> Result<()> {
        match lock(&self.failures).get(&operation) {
            Some(&status) => Err(StatusCode::from_u16(status).map_or_else(
                |_| Error::Transport {
                    status,
                    status_text: "Unknown Status".to_string(),
                },
                transport_error,
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_basket(&self, account_id: &str, basket_name: &str) -> Result<RemoteBody> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure(RemoteOperation::Fetch)?;
        self.basket(account_id, basket_name)
            .ok_or_else(|| Error::NotFound(basket_name.to_string()))
    }

    async fn put_basket(
        &self,
        account_id: &str,
        basket_name: &str,
        data: &Value,
    ) -> Result<RemoteBody> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure(RemoteOperation::Put)?;
        self.insert_basket(account_id, basket_name, RemoteBody::Json(data.clone()));
        Ok(RemoteBody::Text(format!(
            "Your Pantry was updated with basket: {basket_name}!"
        )))
    }

    async fn delete_basket(&self, account_id: &str, basket_name: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure(RemoteOperation::Delete)?;
        lock(&self.baskets)
            .remove(&basket_key(account_id, basket_name))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(basket_name.to_string()))
    }
}

fn basket_key(account_id: &str, basket_name: &str) -> String {
    format!("{account_id}/{basket_name}")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn basket_url_follows_pantry_layout() {
        let client = PantryClient::new("https://getpantry.cloud/apiv1/pantry/", None).unwrap();
        assert_eq!(
            client.basket_url("abc-123", "LCG"),
            "https://getpantry.cloud/apiv1/pantry/abc-123/basket/LCG"
        );
        assert_eq!(
            client.basket_url("a b", "my basket"),
            "https://getpantry.cloud/apiv1/pantry/a%20b/basket/my%20basket"
        );
    }

    #[test]
    fn pantry_client_rejects_invalid_base_url() {
        assert!(PantryClient::new("  ", None).is_err());
        assert!(PantryClient::new("getpantry.cloud", None).is_err());
    }

    #[test]
    fn non_json_body_falls_back_to_text() {
        assert_eq!(
            RemoteBody::parse("{\"a\":1}".to_string()),
            RemoteBody::Json(json!({"a": 1}))
        );
        assert_eq!(
            RemoteBody::parse("Your Pantry was updated".to_string()),
            RemoteBody::Text("Your Pantry was updated".to_string())
        );
    }

    #[test]
    fn status_mapping_distinguishes_not_found() {
        assert!(check_status(StatusCode::OK, "LCG").is_ok());
        assert!(check_status(StatusCode::NOT_FOUND, "LCG")
            .unwrap_err()
            .is_not_found());

        let error = check_status(StatusCode::BAD_REQUEST, "LCG").unwrap_err();
        assert_eq!(error.to_string(), "Remote API error: 400 Bad Request");
    }

    #[tokio::test]
    async fn memory_store_round_trip_and_counts() {
        let store = MemoryRemoteStore::new();
        assert!(store.fetch_basket("acct", "LCG").await.unwrap_err().is_not_found());

        store.put_basket("acct", "LCG", &json!({"version": "1.0"})).await.unwrap();
        assert_eq!(
            store.fetch_basket("acct", "LCG").await.unwrap(),
            RemoteBody::Json(json!({"version": "1.0"}))
        );

        store.delete_basket("acct", "LCG").await.unwrap();
        assert!(store.basket("acct", "LCG").is_none());
        assert_eq!(store.fetch_count(), 2);
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.delete_count(), 1);
    }

    #[tokio::test]
    async fn memory_store_injects_failures() {
        let store = MemoryRemoteStore::new();
        store.fail_operation(RemoteOperation::Put, 503);

        let error = store.put_basket("acct", "LCG", &json!({})).await.unwrap_err();
        assert!(matches!(error, Error::Transport { status: 503, .. }));
        assert!(store.basket("acct", "LCG").is_none());

        store.clear_failures();
        assert!(store.put_basket("acct", "LCG", &json!({})).await.is_ok());
    }
}

//! A data-client handle bound to exactly one access scope.
//!
//! The scope decides which key material rides on every request: anonymous
//! and admin clients authenticate as themselves, a user-scoped client
//! carries the caller's access token so the backing store's RLS engine
//! evaluates row policies as that principal. Identity flows only through
//! the `Authorization` header (the channel the RLS engine inspects), never
//! through custom headers.

use reqwest::Url;
use serde_json::Value;

use crate::error::{BrokerError, BrokerResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Anonymous,
    /// User scope, tagged with the short signature slice used as cache key.
    /// The full token lives in the client's bearer slot, never in the key.
    User(String),
    Admin,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Anonymous => write!(f, "anon"),
            Scope::User(tag) => write!(f, "user:{}", tag),
            Scope::Admin => write!(f, "admin"),
        }
    }
}

pub struct ScopedClient {
    scope: Scope,
    http: reqwest::Client,
    base: Url,
    pub(crate) api_key: String,
    pub(crate) bearer: String,
}

impl ScopedClient {
    pub(crate) fn new(
        scope: Scope,
        http: reqwest::Client,
        base: Url,
        api_key: String,
        bearer: String,
    ) -> Self {
        Self { scope, http, base, api_key, bearer }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Start a table request against the store's REST surface.
    pub fn from(&self, table: &str) -> TableRequest<'_> {
        TableRequest {
            client: self,
            table: table.to_string(),
            filters: Vec::new(),
            columns: None,
        }
    }

    fn table_url(&self, table: &str) -> BrokerResult<Url> {
        self.base
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| BrokerError::Database(format!("bad table path {}: {}", table, e)))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> BrokerResult<Value> {
        let resp = req
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.bearer)
            .send()
            .await
            .map_err(BrokerError::from_transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BrokerError::from_status(status, &body));
        }
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        resp.json::<Value>()
            .await
            .map_err(|e| BrokerError::Database(format!("malformed store response: {}", e)))
    }
}

/// PostgREST-style request builder. Filters render as `column=eq.value`.
pub struct TableRequest<'a> {
    client: &'a ScopedClient,
    table: String,
    filters: Vec<(String, String)>,
    columns: Option<String>,
}

impl<'a> TableRequest<'a> {
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut q = self.filters.clone();
        if let Some(cols) = &self.columns {
            q.push(("select".to_string(), cols.clone()));
        }
        q
    }

    /// GET matching rows as a JSON array.
    pub async fn fetch(self) -> BrokerResult<Value> {
        let url = self.client.table_url(&self.table)?;
        let req = self.client.http.get(url).query(&self.query());
        self.client.send(req).await
    }

    /// POST a row; returns the stored representation.
    pub async fn insert(self, body: &Value) -> BrokerResult<Value> {
        let url = self.client.table_url(&self.table)?;
        let req = self
            .client
            .http
            .post(url)
            .header("Prefer", "return=representation")
            .json(body);
        self.client.send(req).await
    }

    /// PATCH rows matching the accumulated filters.
    pub async fn update(self, body: &Value) -> BrokerResult<Value> {
        let url = self.client.table_url(&self.table)?;
        let req = self
            .client
            .http
            .patch(url)
            .query(&self.query())
            .header("Prefer", "return=representation")
            .json(body);
        self.client.send(req).await
    }

    /// DELETE rows matching the accumulated filters.
    pub async fn delete(self) -> BrokerResult<()> {
        let url = self.client.table_url(&self.table)?;
        let req = self.client.http.delete(url).query(&self.query());
        self.client.send(req).await.map(|_| ())
    }
}

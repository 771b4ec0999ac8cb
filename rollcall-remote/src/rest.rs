//! REST implementation of the remote store.
//!
//! Speaks the RTDB dialect: `GET/PUT/PATCH/POST/DELETE {base}/{path}.json`,
//! with equality queries encoded as `orderBy`/`equalTo` parameters. Absent
//! values read as JSON `null`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::{Map, Value};

use crate::error::{RemoteError, RemoteResult};
use crate::store::RemoteStore;

/// Remote endpoint configuration.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the remote database.
    pub base_url: String,
    /// Optional bearer token.
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

pub struct RestRemote {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl RestRemote {
    pub fn new(config: RemoteConfig) -> RemoteResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.config.base_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(token) = &self.config.auth_token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = req.send().await?;
        if !response.status().is_success() {
            return Err(RemoteError::Status(response.status().as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteStore for RestRemote {
    async fn read(&self, path: &str) -> RemoteResult<Option<Value>> {
        let url = self.url(path);
        let response = self.send(self.request(Method::GET, &url)).await?;
        let value: Value = response.json().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn query_equal(
        &self,
        path: &str,
        field: &str,
        value: &Value,
    ) -> RemoteResult<Vec<Value>> {
        let url = self.url(path);
        let order_by = format!("\"{}\"", field);
        let equal_to = serde_json::to_string(value)?;

        let req = self
            .request(Method::GET, &url)
            .query(&[("orderBy", order_by.as_str()), ("equalTo", equal_to.as_str())]);
        let response = self.send(req).await?;
        let body: Value = response.json().await?;

        // The result object is keyed by child name; its map iterates in
        // ascending key order, which fixes the "first match" of callers.
        match body {
            Value::Object(children) => Ok(children.into_iter().map(|(_, v)| v).collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn write_full(&self, path: &str, value: &Value) -> RemoteResult<()> {
        let url = self.url(path);
        self.send(self.request(Method::PUT, &url).json(value)).await?;
        Ok(())
    }

    async fn write_partial(&self, path: &str, fields: &Map<String, Value>) -> RemoteResult<()> {
        let url = self.url(path);
        self.send(self.request(Method::PATCH, &url).json(fields)).await?;
        Ok(())
    }

    async fn write_batch(&self, path: &str, children: &Map<String, Value>) -> RemoteResult<()> {
        let url = self.url(path);
        self.send(self.request(Method::PATCH, &url).json(children)).await?;
        Ok(())
    }

    async fn append(&self, path: &str, value: &Value) -> RemoteResult<String> {
        let url = self.url(path);
        let response = self.send(self.request(Method::POST, &url).json(value)).await?;
        let body: Value = response.json().await?;

        body.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                RemoteError::Serialization("append response carried no generated key".to_string())
            })
    }

    async fn delete(&self, path: &str) -> RemoteResult<()> {
        let url = self.url(path);
        self.send(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_building() {
        let remote = RestRemote::new(RemoteConfig {
            base_url: "https://rollcall.example.com/".to_string(),
            auth_token: None,
            timeout_secs: 5,
        })
        .unwrap();

        assert_eq!(
            remote.url("students/S1"),
            "https://rollcall.example.com/students/S1.json"
        );
        assert_eq!(
            remote.url("/config/schoolPeriod/"),
            "https://rollcall.example.com/config/schoolPeriod.json"
        );
    }
}

//! Client for the local service's prediction options resource

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::types::{NewPredictionOption, PredictionOption};
use crate::error::{ClientError, ClientResult};
use crate::session::SessionHandle;

const OPTIONS_PATH: &str = "/api/prediction-options";

#[derive(Clone)]
pub struct OptionsClient {
    client: Client,
    base_url: String,
    session: SessionHandle,
}

impl OptionsClient {
    pub fn new(base_url: &str, timeout: Duration, session: SessionHandle) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network {
                path: base_url.to_string(),
                source: e,
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.session.current().bearer() {
            Some(bearer) => builder.header(reqwest::header::AUTHORIZATION, bearer),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, path: &str, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await.map_err(|e| ClientError::Network {
            path: path.to_string(),
            source: e,
        })?;
        let response = check(path, response).await?;
        response.json().await.map_err(|e| ClientError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Options, optionally filtered by pair and active flag
    pub async fn list(&self, pair: Option<&str>, active: Option<bool>) -> ClientResult<Vec<PredictionOption>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(pair) = pair {
            query.push(("pair", pair.to_string()));
        }
        if let Some(active) = active {
            query.push(("isActive", active.to_string()));
        }
        let builder = self.request(Method::GET, OPTIONS_PATH).query(&query);
        self.send(OPTIONS_PATH, builder).await
    }

    pub async fn get(&self, id: &str) -> ClientResult<PredictionOption> {
        let path = format!("{}/{}", OPTIONS_PATH, id);
        self.send(&path, self.request(Method::GET, &path)).await
    }

    pub async fn create(&self, option: &NewPredictionOption) -> ClientResult<PredictionOption> {
        let builder = self.request(Method::POST, OPTIONS_PATH).json(option);
        self.send(OPTIONS_PATH, builder).await
    }

    /// PUT; fields in `body` overwrite the stored option
    pub async fn update(&self, id: &str, body: &Value) -> ClientResult<PredictionOption> {
        let path = format!("{}/{}", OPTIONS_PATH, id);
        let builder = self.request(Method::PUT, &path).json(body);
        self.send(&path, builder).await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        let path = format!("{}/{}", OPTIONS_PATH, id);
        let _: Value = self.send(&path, self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}

async fn check(path: &str, response: Response) -> ClientResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("request failed")
        .to_string();
    Err(ClientError::Status {
        path: path.to_string(),
        status,
        message,
    })
}

//! Thin wrapper over reqwest for talking to the task API.
//!
//! Every request goes out against a fixed base address with the bearer
//! token from the injected session store attached when one is present.
//! Status handling is centralized here: 2xx bodies are decoded into the
//! caller's type, non-2xx bodies are mined for the server's `detail`
//! message, 401 becomes its own error variant, and a request that never
//! produced a response is reported as a network failure. No retries.

use crate::errors::ClientError;
use crate::session::SessionStore;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

pub struct ApiClient {
    base_url: String,
    client: Client,
    session: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionStore>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("{} {}", method, url);
        let mut builder = self.client.request(method, &url);
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.request(Method::GET, path).send().await?;
        Self::decode(response).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        Self::decode(response).await
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.request(Method::PUT, path).json(body).send().await?;
        Self::decode(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.request(Method::DELETE, path).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// POST an `application/x-www-form-urlencoded` body. The token endpoint
    /// takes credentials with form semantics rather than JSON.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let response = self.request(Method::POST, path).form(fields).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check_status(response).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::ParsingError(format!("Failed to decode response: {}", e)))
    }

    async fn check_status(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = extract_detail(&body).unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.clone()
            }
        });

        if status == StatusCode::UNAUTHORIZED {
            Err(ClientError::Unauthorized(detail))
        } else {
            Err(ClientError::ApiError {
                status: status.as_u16(),
                detail,
            })
        }
    }
}

/// Pull the `detail` field out of a FastAPI-style error body. The field is
/// usually a string, but request validation errors carry a list.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_detail_string() {
        let body = r#"{"detail": "Incorrect username or password"}"#;
        assert_eq!(
            extract_detail(body),
            Some("Incorrect username or password".to_string())
        );
    }

    #[test]
    fn test_extract_detail_validation_list() {
        let body = r#"{"detail": [{"loc": ["body", "title"], "msg": "field required"}]}"#;
        let detail = extract_detail(body).unwrap();
        assert!(detail.contains("field required"));
    }

    #[test]
    fn test_extract_detail_absent() {
        assert_eq!(extract_detail("not json"), None);
        assert_eq!(extract_detail(r#"{"message": "nope"}"#), None);
    }

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let session = Arc::new(crate::session::MemorySessionStore::new());
        let api = ApiClient::new("http://localhost:8000/", session);
        assert_eq!(api.base_url(), "http://localhost:8000");
    }
}

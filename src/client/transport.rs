use crate::{
    client::traits::{HttpTransport, TransportFailure},
    error::{ImageError, Result},
};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Url,
};
use std::time::Duration;

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ImageError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn build_headers(
        headers: Vec<(String, String)>,
    ) -> std::result::Result<HeaderMap, TransportFailure> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportFailure::Other(format!("Invalid header name: {}", e)))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|e| TransportFailure::Other(format!("Invalid header value: {}", e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(
        &self,
        url: Url,
        body: Vec<u8>,
        headers: Vec<(String, String)>,
    ) -> std::result::Result<Vec<u8>, TransportFailure> {
        let headers = Self::build_headers(headers)?;

        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportFailure::Other(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            // An empty body carries no message; report the bare status.
            let body = response
                .bytes()
                .await
                .ok()
                .filter(|b| !b.is_empty())
                .map(|b| b.to_vec());
            return Err(TransportFailure::Status {
                code: status.as_u16(),
                body,
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| TransportFailure::Other(format!("Failed to read response body: {}", e)))
    }
}

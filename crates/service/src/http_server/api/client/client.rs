use reqwest::{header::HeaderMap, header::HeaderValue, Client, StatusCode};
use url::Url;

use super::error::ApiError;
use super::ApiRequest;
use crate::http_server::USER_HEADER;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    /// A client for `remote`, identifying every request as `user` when
    ///  one is given
    pub fn new(remote: &Url, user: Option<&str>) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        if let Some(user) = user {
            let value =
                HeaderValue::from_str(user).map_err(|_| ApiError::InvalidHeader(USER_HEADER))?;
            default_headers.insert(USER_HEADER, value);
        }
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    pub async fn call<T: ApiRequest>(&mut self, request: T) -> Result<T::Response, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client);
        let response = request_builder.send().await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        if status.is_success() {
            Ok(response.json::<T::Response>().await?)
        } else {
            Err(ApiError::HttpStatus(status, response.text().await?))
        }
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

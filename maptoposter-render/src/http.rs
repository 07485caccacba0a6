//! Blocking HTTP client shared by the geocoder and the map data source.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::RenderError;

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    /// Build a client. OpenStreetMap services reject requests without a
    /// descriptive User-Agent.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, RenderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| RenderError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RenderError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| RenderError::Http(format!("request to {url} failed: {e}")))?;
        decode(url, response)
    }

    /// POST a form body and decode the JSON response.
    pub fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T, RenderError> {
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .map_err(|e| RenderError::Http(format!("request to {url} failed: {e}")))?;
        decode(url, response)
    }
}

fn decode<T: DeserializeOwned>(
    url: &str,
    response: reqwest::blocking::Response,
) -> Result<T, RenderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RenderError::Http(format!("HTTP {status} from {url}")));
    }
    response
        .json()
        .map_err(|e| RenderError::Http(format!("invalid response from {url}: {e}")))
}

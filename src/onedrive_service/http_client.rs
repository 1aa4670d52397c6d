use anyhow::{Context, Result};
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// HTTP client for Microsoft Graph API operations
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    api_base: String,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_base(GRAPH_API_BASE)
    }

    pub fn with_base(api_base: &str) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Get full URL by prepending the API base if needed
    pub fn get_full_url(&self, url: &str) -> String {
        if url.starts_with("http") {
            url.to_string()
        } else {
            format!("{}{}", self.api_base, url)
        }
    }

    /// Make a GET request with authorization header
    pub async fn get<T>(&self, url: &str, auth_header: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.get_full_url(url);
        debug!("Getting url: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", auth_header)
            .send()
            .await
            .context("Failed to get response")?
            .error_for_status()
            .context("Not a success status")?;

        let response_json = response
            .json::<T>()
            .await
            .context("Failed to deserialize response to type T")?;
        Ok(response_json)
    }

    /// GET that reports 404 Not Found as `None` instead of an error
    pub async fn get_optional<T>(&self, url: &str, auth_header: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.get_full_url(url);
        debug!("Getting url: {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", auth_header)
            .send()
            .await
            .context("Failed to get response")?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("Nothing at {}", url);
            return Ok(None);
        }

        let response_json = response
            .error_for_status()
            .context("Not a success status")?
            .json::<T>()
            .await
            .context("Failed to deserialize response to type T")?;
        Ok(Some(response_json))
    }

    /// Make a POST request with authorization header
    pub async fn post<T, B>(&self, url: &str, body: &B, auth_header: &str) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = self.get_full_url(url);
        debug!("Posting to url: {}", url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to get response for post")?
            .error_for_status()
            .context("Not a success status")?
            .json::<T>()
            .await
            .context("Failed to deserialize response to type T")?;
        Ok(response)
    }

    /// Make a DELETE request with authorization header
    pub async fn delete(&self, url: &str, auth_header: &str) -> Result<()> {
        let url = self.get_full_url(url);
        debug!("Deleting url: {}", url);
        self.client
            .delete(&url)
            .header("Authorization", auth_header)
            .send()
            .await
            .context("Failed to get response for delete")?
            .error_for_status()
            .context("Not a success status")?;
        Ok(())
    }

    /// Upload file content with authorization header
    pub async fn upload_file(
        &self,
        url: &str,
        file_data: Vec<u8>,
        auth_header: &str,
    ) -> Result<reqwest::Response> {
        let url = self.get_full_url(url);
        let response = self
            .client
            .put(&url)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/octet-stream")
            .body(file_data)
            .send()
            .await
            .context("Failed to get response for upload")?;

        Ok(response)
    }

    /// Upload one byte range to a pre-authenticated upload session URL
    pub async fn upload_file_chunk(
        &self,
        upload_url: &str,
        chunk_data: Vec<u8>,
        content_range: &str,
    ) -> Result<reqwest::Response> {
        debug!("Uploading chunk {} to session", content_range);
        let response = self
            .client
            .put(upload_url)
            .header("Content-Range", content_range)
            .body(chunk_data)
            .send()
            .await
            .context("Failed to get response for chunk upload")?;

        Ok(response)
    }

    /// Start a download; the body is left unread for the caller to stream
    pub async fn download(&self, url: &str, auth_header: &str) -> Result<reqwest::Response> {
        let url = self.get_full_url(url);
        debug!("Downloading url: {}", url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", auth_header)
            .send()
            .await
            .context("Failed to get response for download")?
            .error_for_status()
            .context("Not a success status")?;

        Ok(response)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

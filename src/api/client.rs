use super::{
    Category, CategoryList, Envelope, FetchError, ForumApi, Pid, Topic, TopicList, VoteBody,
};
use crate::config::Config;
use crate::feed::PageRequest;
use crate::util::validate_base_url;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// `reqwest`-backed [`ForumApi`].
///
/// Every call is a single attempt bounded by the configured timeout. Bodies
/// are streamed with a size cap before JSON decoding.
pub struct HttpForumApi {
    client: reqwest::Client,
    /// Validated, without trailing slash.
    base_url: String,
    token: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpForumApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpForumApi")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpForumApi {
    /// Create a client for the forum at `base_url`.
    ///
    /// # Errors
    ///
    /// [`FetchError::InvalidRequest`] if the base URL is not a plain http(s)
    /// URL, [`FetchError::Network`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        token: Option<String>,
    ) -> Result<Self, FetchError> {
        let url = validate_base_url(base_url)
            .map_err(|e| FetchError::InvalidRequest(format!("base URL: {}", e)))?;

        if token.is_some() && url.scheme() == "http" {
            let local = matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"));
            if !local {
                tracing::warn!(base_url = %url, "API token will be sent over plain HTTP");
            }
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("mistree/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(3))
            .build()?;

        Ok(Self {
            client,
            base_url: url.as_str().trim_end_matches('/').to_string(),
            token: token.map(SecretString::from),
            timeout,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
            config.resolved_api_token(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint_url(&self, path: &str) -> Result<Url, FetchError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| FetchError::InvalidRequest(format!("endpoint URL: {}", e)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => {
                request.header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            }
            None => request,
        }
    }

    /// Send once, mapping timeout and non-2xx status to errors.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.authorize(request).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self.send(self.client.get(url)).await?;
        let bytes = tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_RESPONSE_SIZE))
            .await
            .map_err(|_| FetchError::Timeout)??;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ForumApi for HttpForumApi {
    async fn fetch_topics(&self, request: &PageRequest) -> Result<Vec<Topic>, FetchError> {
        let mut url = self.endpoint_url(&request.endpoint.path())?;
        url.query_pairs_mut()
            .append_pair("page", &request.page.to_string())
            .append_pair("pageSize", &request.page_size.to_string());

        let body: Envelope<TopicList> = self.get_json(url).await?;
        Ok(body.into_inner().topics)
    }

    async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        let url = self.endpoint_url("/api/v3/categories")?;
        let body: Envelope<CategoryList> = self.get_json(url).await?;
        Ok(body.into_inner().categories)
    }

    async fn vote(&self, pid: Pid, delta: i64) -> Result<(), FetchError> {
        let url = self.endpoint_url(&format!("/api/v3/posts/{}/vote", pid))?;
        let body = serde_json::to_vec(&VoteBody { delta })
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        self.send(request).await?;
        Ok(())
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

//! Authenticated Graph HTTP client
//!
//! Every call attaches a bearer token from the credential's [`TokenCache`].
//! A 401 invalidates the token and the request is retried once. Other
//! failures are returned as-is; the control loop owns retry scheduling.

use crate::auth::TokenCache;
use crate::cloud::GraphSettings;
use crate::error::{GraphError, GraphResult};
use entra_control::{ApplicationApi, DirectoryClient, GroupApi, ServicePrincipalApi};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Paged collection response
#[derive(Debug, Deserialize)]
pub(crate) struct ODataPage<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Any directory object reduced to its ID
#[derive(Debug, Deserialize)]
pub(crate) struct DirectoryObjectId {
    pub id: String,
}

/// `$ref` body pointing at a directory object
#[derive(Debug, Serialize)]
pub(crate) struct ReferenceCreate {
    #[serde(rename = "@odata.id")]
    pub odata_id: String,
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    tokens: TokenCache,
    base_url: String,
}

/// Microsoft Graph client for one credential
#[derive(Debug, Clone)]
pub struct GraphClient {
    inner: Arc<Inner>,
}

impl GraphClient {
    pub fn new(tokens: TokenCache, settings: &GraphSettings, http: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                tokens,
                base_url: settings.base_url(),
            }),
        }
    }

    /// Builds the shared HTTP client with the configured request timeout.
    pub fn http_client(settings: &GraphSettings) -> GraphResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| GraphError::Config(format!("failed to build HTTP client: {}", e)))
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// True when both handles point at the same client instance
    pub fn shares_connection_with(&self, other: &GraphClient) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// URL form of a directory object, as used in `@odata.id` and
    /// `@odata.bind` payloads
    pub(crate) fn directory_object_url(&self, id: &str) -> String {
        self.url(&format!("directoryObjects/{}", id))
    }

    /// Sends a request built by `build`, re-authenticating once on 401.
    async fn send(&self, build: impl Fn(&reqwest::Client) -> RequestBuilder) -> GraphResult<Response> {
        let mut reauthenticated = false;
        loop {
            let token = self.inner.tokens.token().await?;
            let response = build(&self.inner.http).bearer_auth(token).send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                tracing::debug!("Graph rejected the token, re-authenticating");
                self.inner.tokens.invalidate().await;
                reauthenticated = true;
                continue;
            }

            if status.is_success() {
                return Ok(response);
            }

            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            let err = GraphError::from_response(status.as_u16(), &body, retry_after_secs);
            tracing::debug!(status = status.as_u16(), error = %err, "Graph request failed");
            return Err(err);
        }
    }

    pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> GraphResult<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| GraphError::Decode(e.to_string()))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> GraphResult<T> {
        let response = self.send(|http| http.get(url)).await?;
        Self::decode(response).await
    }

    /// Follows `@odata.nextLink` until the collection is exhausted.
    pub(crate) async fn get_all<T: DeserializeOwned>(&self, url: &str) -> GraphResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        while let Some(url) = next {
            let page: ODataPage<T> = self.get_json(&url).await?;
            items.extend(page.value);
            next = page.next_link;
        }
        Ok(items)
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> GraphResult<T> {
        let response = self.send(|http| http.post(url).json(body)).await?;
        Self::decode(response).await
    }

    /// POST whose response carries no body (e.g. `$ref` creation)
    pub(crate) async fn post_empty<B: Serialize>(&self, url: &str, body: &B) -> GraphResult<()> {
        self.send(|http| http.post(url).json(body)).await?;
        Ok(())
    }

    pub(crate) async fn patch_json<B: Serialize>(&self, url: &str, body: &B) -> GraphResult<()> {
        self.send(|http| http.patch(url).json(body)).await?;
        Ok(())
    }

    /// PATCH with extra headers, returning the raw response
    pub(crate) async fn patch_with_headers<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        headers: &[(&'static str, &'static str)],
    ) -> GraphResult<Response> {
        self.send(|http| {
            headers
                .iter()
                .fold(http.request(Method::PATCH, url), |req, (name, value)| {
                    req.header(*name, *value)
                })
                .json(body)
        })
        .await
    }

    pub(crate) async fn delete_url(&self, url: &str) -> GraphResult<()> {
        self.send(|http| http.delete(url)).await?;
        Ok(())
    }
}

impl DirectoryClient for GraphClient {
    fn applications(&self) -> Arc<dyn ApplicationApi> {
        Arc::new(self.clone())
    }

    fn service_principals(&self) -> Arc<dyn ServicePrincipalApi> {
        Arc::new(self.clone())
    }

    fn groups(&self) -> Arc<dyn GroupApi> {
        Arc::new(self.clone())
    }
}

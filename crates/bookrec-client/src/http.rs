use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

use crate::config::ApiConfig;
use crate::error::Result;

/// Status and body text of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct FetchError(pub String);

/// Capability to perform one HTTP GET.
///
/// Timeouts, TLS and proxies belong to the implementation. Implementations
/// must not retry: every call is exactly one attempt.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> std::result::Result<FetchResponse, FetchError>;
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    async fn fetch(&self, url: &Url) -> std::result::Result<FetchResponse, FetchError> {
        (**self).fetch(url).await
    }
}

#[async_trait]
impl<'a, F: Fetch + ?Sized> Fetch for &'a F {
    async fn fetch(&self, url: &Url) -> std::result::Result<FetchResponse, FetchError> {
        (**self).fetch(url).await
    }
}

// ─── ReqwestFetcher ───────────────────────────────────────────────────────────

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent).gzip(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self> {
        Self::new(&api.user_agent, api.timeout_secs.map(Duration::from_secs))
    }
}

#[async_trait]
impl Fetch for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<FetchResponse, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError(e.to_string()))?;
        let status = resp.status().as_u16();
        // A body that cannot be read is treated like an empty one; the status already arrived.
        let body = resp.text().await.unwrap_or_default();
        Ok(FetchResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;

    #[tokio::test]
    async fn reqwest_fetcher_reports_status_and_body() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/categories")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"["fiction","poetry"]"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/books/nope")
            .with_status(404)
            .with_body(r#"{"detail":"Book not found"}"#)
            .create_async()
            .await;

        let fetcher = ReqwestFetcher::new("bookrec-test", None).unwrap();
        let base = Url::parse(&server.url()).unwrap();

        let ok = fetcher.fetch(&base.join("/categories").unwrap()).await.unwrap();
        assert_eq!(ok.status, 200);
        assert_eq!(ok.body, r#"["fiction","poetry"]"#);

        let missing = fetcher.fetch(&base.join("/books/nope").unwrap()).await.unwrap();
        assert_eq!(missing.status, 404);
        assert!(missing.body.contains("Book not found"));
    }

    #[tokio::test]
    async fn reqwest_fetcher_surfaces_connection_failures() {
        let fetcher = ReqwestFetcher::new("bookrec-test", Some(Duration::from_secs(2))).unwrap();
        // Port 9 (discard) on loopback is not expected to accept HTTP connections.
        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        assert!(fetcher.fetch(&url).await.is_err());
    }

    #[tokio::test]
    async fn shared_fetcher_forwards_through_arc() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(204)
            .create_async()
            .await;

        let fetcher: Arc<dyn Fetch> = Arc::new(ReqwestFetcher::new("bookrec-test", None).unwrap());
        let url = Url::parse(&server.url()).unwrap();
        let resp = fetcher.fetch(&url).await.unwrap();
        assert_eq!(resp.status, 204);
        assert!(resp.body.is_empty());
    }
}

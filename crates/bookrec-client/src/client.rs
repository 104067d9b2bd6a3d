use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError, Result};
use crate::http::{Fetch, ReqwestFetcher};
use crate::types::RequestOutcome;

/// Thin wrappers over the catalog API's GET endpoints.
///
/// Every operation is a single attempt. Success bodies are returned verbatim
/// (`Value::Null` when the body is not JSON); anything else becomes an [`ApiError`].
pub struct BookApiClient<F> {
    base_url: Url,
    fetcher: F,
}

impl BookApiClient<ReqwestFetcher> {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let fetcher = ReqwestFetcher::from_config(&config.api)?;
        Self::new(&config.api.base_url, fetcher)
    }
}

impl<F: Fetch> BookApiClient<F> {
    pub fn new(base_url: &str, fetcher: F) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(base_url.to_string(), e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(
                base_url.to_string(),
                "URL cannot be used as a base".to_string(),
            ));
        }
        Ok(Self { base_url, fetcher })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET {base}/?page={page}&page_size={page_size}`
    pub async fn list_books(
        &self,
        page: u32,
        page_size: u32,
    ) -> std::result::Result<Value, ApiError> {
        let mut url = self.endpoint(&[""]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("page_size", &page_size.to_string());
        self.request(&url).await
    }

    /// `GET {base}/books/{slug}?top_n={top_n}`
    pub async fn get_book_by_slug(
        &self,
        slug: &str,
        top_n: u32,
    ) -> std::result::Result<Value, ApiError> {
        let url = self.book_url(slug, top_n);
        self.request(&url).await
    }

    /// `GET {base}/categories`
    pub async fn list_categories(&self) -> std::result::Result<Value, ApiError> {
        let url = self.endpoint(&["categories"]);
        self.request(&url).await
    }

    /// `GET {base}/search?q={query}&limit={limit}`
    pub async fn search(&self, query: &str, limit: u32) -> std::result::Result<Value, ApiError> {
        let mut url = self.endpoint(&["search"]);
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &limit.to_string());
        self.request(&url).await
    }

    pub(crate) fn book_url(&self, slug: &str, top_n: u32) -> Url {
        let mut url = self.endpoint(&["books", slug]);
        url.query_pairs_mut().append_pair("top_n", &top_n.to_string());
        url
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn request(&self, url: &Url) -> std::result::Result<Value, ApiError> {
        let (outcome, raw) = self.fetch_outcome(url).await;
        if outcome.ok {
            return Ok(outcome.body.unwrap_or(Value::Null));
        }
        Err(ApiError::from_outcome(&outcome, &raw))
    }

    /// Performs the fetch and captures the outcome along with the raw body text.
    pub async fn fetch_outcome(&self, url: &Url) -> (RequestOutcome, String) {
        match self.fetcher.fetch(url).await {
            Ok(resp) => {
                debug!(%url, status = resp.status, "catalog API responded");
                (RequestOutcome::from_response(resp.status, &resp.body), resp.body)
            }
            Err(e) => {
                warn!(%url, error = %e, "catalog API unreachable");
                (RequestOutcome::network(), e.0)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::testing::StubFetcher;
    use super::*;

    fn query_of(url: &Url) -> Vec<(String, String)> {
        url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect()
    }

    #[tokio::test]
    async fn list_books_builds_paged_root_url() {
        let stub = StubFetcher::new().respond("/", 200, r#"[{"slug":"dune"}]"#);
        let client = BookApiClient::new("http://localhost:8000", &stub).unwrap();

        let books = client.list_books(2, 50).await.unwrap();
        assert_eq!(books, json!([{"slug": "dune"}]));

        let seen = stub.seen();
        assert_eq!(seen[0].as_str(), "http://localhost:8000/?page=2&page_size=50");
    }

    #[tokio::test]
    async fn base_path_prefix_is_kept() {
        let stub = StubFetcher::new()
            .respond("/api/", 200, "[]")
            .respond("/api/categories", 200, "[]");
        let client = BookApiClient::new("https://books.example.org/api/", &stub).unwrap();

        client.list_books(1, 20).await.unwrap();
        client.list_categories().await.unwrap();

        let seen = stub.seen();
        assert_eq!(seen[0].as_str(), "https://books.example.org/api/?page=1&page_size=20");
        assert_eq!(seen[1].as_str(), "https://books.example.org/api/categories");
    }

    #[tokio::test]
    async fn slug_is_encoded_as_single_segment() {
        let stub = StubFetcher::new();
        let client = BookApiClient::new("http://localhost:8000", &stub).unwrap();

        let slug = "a/b c-café";
        let url = client.book_url(slug, 10);
        let segments: Vec<_> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], "books");
        assert!(!segments[1].contains('/'));
        assert!(!segments[1].contains(' '));
        assert_eq!(segments[1], "a%2Fb%20c-caf%C3%A9");
        assert_eq!(query_of(&url), [("top_n".to_string(), "10".to_string())]);
    }

    #[tokio::test]
    async fn search_query_roundtrips() {
        let stub = StubFetcher::new().respond("/search", 200, "[]");
        let client = BookApiClient::new("http://localhost:8000", &stub).unwrap();

        let query = "tipping the velvet / ñandú & co";
        client.search(query, 8).await.unwrap();

        let seen = stub.seen();
        assert_eq!(
            query_of(&seen[0]),
            [
                ("q".to_string(), query.to_string()),
                ("limit".to_string(), "8".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn unparseable_success_body_is_null() {
        let stub = StubFetcher::new().respond("/categories", 200, "not json");
        let client = BookApiClient::new("http://localhost:8000", &stub).unwrap();
        assert_eq!(client.list_categories().await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn http_failure_becomes_api_error() {
        let stub = StubFetcher::new().respond(
            "/books/missing",
            404,
            r#"{"detail":"No book found for slug 'missing'."}"#,
        );
        let client = BookApiClient::new("http://localhost:8000", &stub).unwrap();

        let err = client.get_book_by_slug("missing", 10).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message, "No book found for slug 'missing'.");
        assert_eq!(err.body, Some(json!({"detail": "No book found for slug 'missing'."})));
    }

    #[tokio::test]
    async fn network_failure_has_no_status() {
        let stub = StubFetcher::new().fail("/search", "connection refused");
        let client = BookApiClient::new("http://localhost:8000", &stub).unwrap();

        let err = client.search("dune", 5).await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(err.body, None);
        assert!(err.message.contains("connection refused"));
    }

    #[test]
    fn rejects_unusable_base_urls() {
        let stub = StubFetcher::new();
        assert!(matches!(
            BookApiClient::new("not a url", &stub),
            Err(ClientError::InvalidBaseUrl(..))
        ));
        assert!(matches!(
            BookApiClient::new("mailto:books@example.org", &stub),
            Err(ClientError::InvalidBaseUrl(..))
        ));
    }
}

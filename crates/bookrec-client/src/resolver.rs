//! Resolves a requested slug to a book page.
//!
//! A direct lookup is tried first. A 404 falls back to searching by a title
//! guessed from the slug, which either yields a redirect to a canonical slug
//! or settles on "not found". Nothing here retries or caches.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::BookApiClient;
use crate::http::Fetch;
use crate::types::{RecommendationResult, normalize_response};

/// `top_n` sent with the direct lookup.
pub const DETAIL_TOP_N: u32 = 10;
/// `limit` sent with the fallback search.
pub const SEARCH_LIMIT: u32 = 8;

pub const UNEXPECTED_PAYLOAD: &str = "Book API returned an unexpected payload shape";

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(RecommendationResult),
    /// Temporary redirect; the caller re-resolves at `slug`.
    Redirect { slug: String },
    NotFound,
    /// The API failed or broke its contract. Not the user's fault.
    UpstreamError {
        message: String,
        status: Option<u16>,
    },
}

impl Resolution {
    /// HTTP status a page layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Found(_) => 200,
            Self::Redirect { .. } => 307,
            Self::NotFound => 404,
            Self::UpstreamError { .. } => 502,
        }
    }

    pub fn location(&self) -> Option<String> {
        match self {
            Self::Redirect { slug } => Some(book_path(slug)),
            _ => None,
        }
    }
}

/// Page path for a slug, e.g. `/books/the-great-gatsby`.
pub fn book_path(slug: &str) -> String {
    format!("/books/{}", urlencoding::encode(slug))
}

/// `the-great-gatsby` -> `the great gatsby`
pub fn guess_title(slug: &str) -> String {
    slug.replace('-', " ").trim().to_string()
}

/// Picks the slug a search result points at.
///
/// An entry whose slug equals `requested` wins outright, which makes the
/// requested slug canonical. Otherwise the first result's slug is used.
pub fn canonical_slug(search_body: &Value, requested: &str) -> Option<String> {
    let results = search_body.as_array().filter(|items| !items.is_empty())?;
    let slug_of = |item: &Value| item.get("slug").and_then(Value::as_str).map(ToOwned::to_owned);

    if results.iter().any(|item| slug_of(item).as_deref() == Some(requested)) {
        return Some(requested.to_string());
    }

    results
        .first()
        .and_then(slug_of)
        .filter(|slug| !slug.is_empty())
}

pub struct SlugResolver<F> {
    client: BookApiClient<F>,
}

impl<F: Fetch> SlugResolver<F> {
    pub fn new(client: BookApiClient<F>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &BookApiClient<F> {
        &self.client
    }

    pub async fn resolve(&self, slug: &str) -> Resolution {
        match self.client.get_book_by_slug(slug, DETAIL_TOP_N).await {
            Ok(body) => {
                return match normalize_response(&body) {
                    Some(result) => Resolution::Found(result),
                    None => {
                        warn!(slug, "detail payload matched no known shape");
                        Resolution::UpstreamError {
                            message: UNEXPECTED_PAYLOAD.to_string(),
                            status: None,
                        }
                    }
                };
            }
            Err(err) if err.is_not_found() => {
                debug!(slug, "direct lookup returned 404, trying search fallback");
            }
            Err(err) => {
                return Resolution::UpstreamError {
                    message: format!("Book API request failed ({})", err.status_label()),
                    status: err.status,
                };
            }
        }

        let guessed = guess_title(slug);
        if guessed.is_empty() {
            return Resolution::NotFound;
        }

        let body = match self.client.search(&guessed, SEARCH_LIMIT).await {
            Ok(body) => body,
            Err(err) => {
                return Resolution::UpstreamError {
                    message: format!("Search API request failed ({})", err.status_label()),
                    status: err.status,
                };
            }
        };

        // A hit on the requested slug means the 404 above was authoritative.
        match canonical_slug(&body, slug) {
            Some(canonical) if canonical != slug => {
                info!(slug, canonical = %canonical, "redirecting to canonical slug");
                Resolution::Redirect { slug: canonical }
            }
            _ => Resolution::NotFound,
        }
    }

    /// Resolves and then follows redirects, as a browser would after a 307.
    ///
    /// Stops after `max_hops` redirects or when a slug comes up a second time,
    /// returning the last resolution seen (possibly still a redirect).
    pub async fn resolve_following(&self, slug: &str, max_hops: usize) -> Resolution {
        let mut visited = vec![slug.to_string()];
        let mut resolution = self.resolve(slug).await;

        for _ in 0..max_hops {
            let Resolution::Redirect { slug: next } = &resolution else {
                break;
            };
            if visited.contains(next) {
                warn!(slug = %next, "redirect cycle detected");
                break;
            }
            let next = next.clone();
            resolution = self.resolve(&next).await;
            visited.push(next);
        }

        resolution
    }
}

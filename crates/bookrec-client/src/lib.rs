//! bookrec-client: data access for the book recommendation API.
//!
//! [`BookApiClient`] wraps the API's GET endpoints behind an injectable
//! [`Fetch`] capability; [`SlugResolver`] turns a requested slug into a book
//! page, a redirect, or a not-found/upstream failure.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod resolver;
pub mod types;

pub use client::BookApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, ClientError, Result};
pub use http::{Fetch, FetchError, FetchResponse, ReqwestFetcher};
pub use resolver::{Resolution, SlugResolver};
pub use types::{Book, DetailPayload, RecommendationResult, RequestOutcome, normalize_response};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A catalog entry as served by the API.
///
/// Only `slug` is checked. Every other field, nulls included, is kept as sent
/// in `fields`, so a book serializes back to exactly what the API returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub slug: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Book {
    pub fn from_json(v: &Value) -> Option<Self> {
        serde_json::from_value(v.clone()).ok()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.str_field("title")
    }

    pub fn category(&self) -> Option<&str> {
        self.str_field("category")
    }

    pub fn description(&self) -> Option<&str> {
        self.str_field("description")
    }

    pub fn img(&self) -> Option<&str> {
        self.str_field("img")
    }

    pub fn url(&self) -> Option<&str> {
        self.str_field("url")
    }

    /// Integer or fractional ratings are both accepted.
    pub fn rating(&self) -> Option<f64> {
        self.get("rating").and_then(Value::as_f64)
    }

    pub fn price(&self) -> Option<f64> {
        self.get("price_clean").and_then(Value::as_f64)
    }

    pub fn display_title(&self) -> &str {
        self.title().unwrap_or(&self.slug)
    }
}

/// A book together with the books recommended alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub book: Book,
    pub recommendations: Vec<Book>,
}

/// The two body shapes the detail endpoint is known to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailPayload {
    /// `{ "book": {...}, "recommendations": [...] }`
    Paired {
        book: Book,
        recommendations: Vec<Book>,
    },
    /// `{ "recommendations": [book, rec1, rec2, ...] }`
    Flattened { recommendations: Vec<Book> },
}

impl DetailPayload {
    /// Classifies a raw detail body. `None` means the body matches neither shape.
    ///
    /// A `book` that is null, `false`, `0` or `""` counts as absent.
    pub fn from_json(body: &Value) -> Option<Self> {
        let obj = body.as_object()?;

        if let Some(book) = obj.get("book").filter(|b| is_truthy(b)) {
            let book = Book::from_json(book)?;
            let recommendations = match obj.get("recommendations") {
                Some(Value::Array(items)) => parse_books(items)?,
                _ => Vec::new(),
            };
            return Some(Self::Paired {
                book,
                recommendations,
            });
        }

        let items = obj.get("recommendations").and_then(Value::as_array)?;
        if items.is_empty() {
            return None;
        }
        Some(Self::Flattened {
            recommendations: parse_books(items)?,
        })
    }

    pub fn into_result(self) -> Option<RecommendationResult> {
        match self {
            Self::Paired {
                book,
                recommendations,
            } => Some(RecommendationResult {
                book,
                recommendations,
            }),
            Self::Flattened { recommendations } => {
                let mut books = recommendations.into_iter();
                let book = books.next()?;
                Some(RecommendationResult {
                    book,
                    recommendations: books.collect(),
                })
            }
        }
    }
}

/// Collapses either detail shape into a [`RecommendationResult`].
pub fn normalize_response(body: &Value) -> Option<RecommendationResult> {
    DetailPayload::from_json(body).and_then(DetailPayload::into_result)
}

fn parse_books(items: &[Value]) -> Option<Vec<Book>> {
    items.iter().map(Book::from_json).collect()
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// What one fetch produced, before it is turned into a value or an [`ApiError`].
///
/// `status` is 0 when the fetch capability failed before any HTTP response.
///
/// [`ApiError`]: crate::error::ApiError
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub ok: bool,
    pub status: u16,
    pub body: Option<Value>,
}

impl RequestOutcome {
    pub fn from_response(status: u16, text: &str) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            body: serde_json::from_str(text).ok(),
        }
    }

    pub fn network() -> Self {
        Self {
            ok: false,
            status: 0,
            body: None,
        }
    }
}

use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookrec_client::{ApiError, BookApiClient, ClientConfig, Resolution, SlugResolver};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bookrec",
    about = "Browse the book recommendation API from the terminal",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting BOOKREC_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// API base URL; overrides config and environment.
    #[arg(long, global = true)]
    api_base: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List books page by page.
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Fetch the raw detail payload for a slug (no fallback).
    Book {
        slug: String,
        #[arg(long)]
        top_n: Option<u32>,
    },

    /// Resolve a slug the way the book page does, with search fallback.
    Resolve {
        slug: String,
        /// Re-resolve at redirect targets.
        #[arg(long)]
        follow: bool,
        #[arg(long, default_value = "3")]
        max_hops: usize,
    },

    /// List categories.
    Categories,

    /// Search books by title or category.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Show the effective configuration.
    Config,
}

#[repr(i32)]
#[derive(Clone, Copy)]
enum ExitCode {
    NotFound = 2,
    NetworkError = 6,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();
    init_tracing();

    let json_output = cli.json || std::env::var("BOOKREC_JSON").as_deref() == Ok("1");

    let mut config = ClientConfig::load()?;
    if let Some(base) = cli.api_base {
        config.api.base_url = base;
    }

    let connect = || -> Result<_> {
        let client = BookApiClient::from_config(&config)?;
        tracing::debug!(base = %client.base_url(), "using catalog API");
        Ok(client)
    };

    match cli.command {
        Commands::List { page, page_size } => {
            let page_size = page_size.unwrap_or(config.defaults.page_size);
            let client = connect()?;
            let books = client.list_books(page, page_size).await;
            let books = unwrap_or_exit(books, json_output, start);
            if json_output {
                let data = json!({"items": books, "page": page, "page_size": page_size});
                print_json(&ok_envelope(data, start))?;
            } else {
                print_book_rows(&books);
            }
        }

        Commands::Book { slug, top_n } => {
            let top_n = top_n.unwrap_or(config.defaults.top_n);
            let client = connect()?;
            let body = client.get_book_by_slug(&slug, top_n).await;
            let body = unwrap_or_exit(body, json_output, start);
            if json_output {
                print_json(&ok_envelope(body, start))?;
            } else {
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
        }

        Commands::Resolve {
            slug,
            follow,
            max_hops,
        } => {
            let resolver = SlugResolver::new(connect()?);
            let resolution = if follow {
                resolver.resolve_following(&slug, max_hops).await
            } else {
                resolver.resolve(&slug).await
            };
            let exit = exit_code_for(&resolution);

            if json_output {
                let mut out = resolution_json(&resolution);
                out["meta"] = json!({"duration_ms": start.elapsed().as_millis()});
                print_json(&out)?;
            } else {
                print_resolution(&slug, &resolution);
            }
            if let Some(code) = exit {
                std::process::exit(code as i32);
            }
        }

        Commands::Categories => {
            let client = connect()?;
            let categories = unwrap_or_exit(client.list_categories().await, json_output, start);
            if json_output {
                print_json(&ok_envelope(categories, start))?;
            } else if let Some(items) = categories.as_array() {
                for item in items {
                    match item.as_str() {
                        Some(name) => println!("{name}"),
                        None => println!("{item}"),
                    }
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            }
        }

        Commands::Search { query, limit } => {
            let limit = limit.unwrap_or(config.defaults.search_limit);
            let client = connect()?;
            let results = unwrap_or_exit(client.search(&query, limit).await, json_output, start);
            if json_output {
                print_json(&ok_envelope(json!({"items": results, "query": query}), start))?;
            } else if results.as_array().is_some_and(Vec::is_empty) {
                println!("No results for: {query}");
            } else {
                print_book_rows(&results);
            }
        }

        Commands::Config => print_config(&config, json_output)?,
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_config(config: &ClientConfig, json_output: bool) -> Result<()> {
    if json_output {
        return print_json(&json!({"status": "ok", "data": config}));
    }
    println!("config file: {}", ClientConfig::config_path().display());
    println!("api base:    {}", config.api.base_url);
    println!("user agent:  {}", config.api.user_agent);
    match config.api.timeout_secs {
        Some(secs) => println!("timeout:     {secs}s"),
        None => println!("timeout:     none"),
    }
    Ok(())
}

fn print_json(val: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn ok_envelope(data: Value, start: Instant) -> Value {
    json!({"status": "ok", "data": data, "meta": {"duration_ms": start.elapsed().as_millis()}})
}

fn unwrap_or_exit(
    result: std::result::Result<Value, ApiError>,
    json_output: bool,
    start: Instant,
) -> Value {
    match result {
        Ok(value) => value,
        Err(err) => {
            let code = if err.is_not_found() {
                ExitCode::NotFound
            } else {
                ExitCode::NetworkError
            };
            if json_output {
                let kind = if err.is_not_found() { "not_found" } else { "api_error" };
                let out = json!({
                    "status": "error",
                    "error": kind,
                    "message": err.message,
                    "http_status": err.status,
                    "meta": {"duration_ms": start.elapsed().as_millis()}
                });
                let text = serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string());
                println!("{text}");
            } else {
                eprintln!("API error ({}): {}", err.status_label(), err.message);
            }
            std::process::exit(code as i32);
        }
    }
}

fn exit_code_for(resolution: &Resolution) -> Option<ExitCode> {
    match resolution {
        Resolution::Found(_) | Resolution::Redirect { .. } => None,
        Resolution::NotFound => Some(ExitCode::NotFound),
        Resolution::UpstreamError { .. } => Some(ExitCode::NetworkError),
    }
}

fn resolution_json(resolution: &Resolution) -> Value {
    let http_status = resolution.status_code();
    match resolution {
        Resolution::Found(result) => json!({
            "status": "ok",
            "data": {
                "outcome": "found",
                "http_status": http_status,
                "book": result.book,
                "recommendations": result.recommendations,
            }
        }),
        Resolution::Redirect { slug } => json!({
            "status": "ok",
            "data": {
                "outcome": "redirect",
                "http_status": http_status,
                "slug": slug,
                "location": resolution.location(),
            }
        }),
        Resolution::NotFound => json!({
            "status": "error",
            "error": "not_found",
            "http_status": http_status,
            "message": "Book not found",
        }),
        Resolution::UpstreamError { message, status } => json!({
            "status": "error",
            "error": "upstream_error",
            "http_status": http_status,
            "upstream_status": status,
            "message": message,
        }),
    }
}

fn print_resolution(requested: &str, resolution: &Resolution) {
    match resolution {
        Resolution::Found(result) => {
            println!("{}  ({})", result.book.display_title(), result.book.slug);
            if let Some(category) = result.book.category() {
                println!("  category: {category}");
            }
            if let Some(rating) = result.book.rating() {
                println!("  rating:   {rating}/5");
            }
            if result.recommendations.is_empty() {
                println!("\nNo recommendations.");
            } else {
                println!("\nRecommended:");
                for rec in &result.recommendations {
                    println!("  {:<40}  {}", rec.display_title(), rec.slug);
                }
            }
        }
        Resolution::Redirect { slug } => {
            let location = resolution.location().unwrap_or_default();
            println!("307 {requested} -> {slug}  ({location})");
        }
        Resolution::NotFound => eprintln!("Book not found: {requested}"),
        Resolution::UpstreamError { message, .. } => eprintln!("Upstream error: {message}"),
    }
}

fn print_book_rows(body: &Value) {
    let Some(items) = body.as_array() else {
        println!("{}", serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string()));
        return;
    };
    for item in items {
        let slug = item.get("slug").and_then(Value::as_str).unwrap_or("-");
        let title = item.get("title").and_then(Value::as_str).unwrap_or(slug);
        let category = item.get("category").and_then(Value::as_str).unwrap_or_default();
        println!("{title:<40}  {category:<20}  {slug}");
    }
}

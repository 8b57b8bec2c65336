//! A small article API built from endpoint descriptions.
//!
//! Run with:
//!   RUST_LOG=servitor=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/articles/1
//!   curl 'http://localhost:3000/articles?tag=rust&limit=5'
//!   curl -X POST http://localhost:3000/articles \
//!        -H 'authorization: Token demo' \
//!        -H 'content-type: application/json' \
//!        -d '{"title":"Typed endpoints"}'
//!   curl -X DELETE http://localhost:3000/articles/1
//!   curl http://localhost:3000/articles/abc      # 400, capture does not parse
//!   curl http://localhost:3000/healthz

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use http::StatusCode;
use serde::{Deserialize, Serialize};
use servitor::{
    Capture, Context, QueryParam, Reply, RequestHeader, ResponseHeader, Router, Server, codec::json, codec::text,
    decode, delete, get, health, path, post,
};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize)]
struct Article {
    id: u64,
    title: String,
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NewArticle {
    title: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Default)]
struct Store {
    next: AtomicU64,
    articles: Mutex<BTreeMap<u64, Article>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let id = || Capture::with("id", decode::parse::<u64>());

    let list = get("/articles")?
        .query(QueryParam::optional("tag", decode::parse::<String>()))?
        .query(QueryParam::optional("limit", decode::parse::<usize>()))?
        .response(json::as_json::<Vec<Article>>());

    let show = get(path("/articles/").capture(id()))?
        .response(json::as_json::<Option<Article>>());

    let create = post("/articles")?
        .req_header(RequestHeader::new("authorization"))?
        .body(json::from_json::<NewArticle>())
        .res_header(ResponseHeader::new("location"))?
        .response_with(json::as_json::<Article>(), StatusCode::CREATED);

    let remove = delete(path("/articles/").capture(id()))?
        .req_header(RequestHeader::new("authorization"))?
        .response(text::as_text::<&'static str>());

    let store = Arc::new(Store::default());

    let app = Router::new()
        .route(list, {
            let store = Arc::clone(&store);
            move |ctx: Context| {
                let store = Arc::clone(&store);
                async move {
                    let tag = ctx.query::<Option<String>>("tag").cloned().flatten();
                    let limit = ctx.query::<Option<usize>>("limit").copied().flatten().unwrap_or(20);
                    let articles = store.articles.lock().unwrap_or_else(|e| e.into_inner());
                    articles.values()
                        .filter(|a| tag.as_ref().is_none_or(|t| a.tags.contains(t)))
                        .take(limit)
                        .cloned()
                        .collect::<Vec<_>>()
                }
            }
        })
        .route(show, {
            let store = Arc::clone(&store);
            move |ctx: Context| {
                let store = Arc::clone(&store);
                async move {
                    let id = ctx.capture::<u64>("id").copied().unwrap_or_default();
                    store.articles.lock().unwrap_or_else(|e| e.into_inner()).get(&id).cloned()
                }
            }
        })
        .route(create, {
            let store = Arc::clone(&store);
            move |mut ctx: Context| {
                let store = Arc::clone(&store);
                async move {
                    let new = ctx.take_body::<NewArticle>()
                        .unwrap_or(NewArticle { title: String::new(), tags: Vec::new() });
                    let id = store.next.fetch_add(1, Ordering::Relaxed) + 1;
                    let article = Article { id, title: new.title, tags: new.tags };
                    store.articles.lock().unwrap_or_else(|e| e.into_inner()).insert(id, article.clone());
                    Reply::new(article).header("location", format!("/articles/{id}"))
                }
            }
        })
        .route(remove, {
            let store = Arc::clone(&store);
            move |ctx: Context| {
                let store = Arc::clone(&store);
                async move {
                    let id = ctx.capture::<u64>("id").copied().unwrap_or_default();
                    match store.articles.lock().unwrap_or_else(|e| e.into_inner()).remove(&id) {
                        Some(_) => "deleted",
                        None => "absent",
                    }
                }
            }
        });

    Server::bind("0.0.0.0:3000")?
        .serve(health::register(app)?)
        .await?;
    Ok(())
}

//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. You register a finished
//! [`Endpoint`] with the handler that serves it; the endpoint already knows
//! its method and path, so there is nothing else to say.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use matchit::Router as MatchitRouter;
use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::dispatch::RawRequest;
use crate::element::{ElementKind, HeaderValue};
use crate::endpoint::Endpoint;
use crate::error::{DecodeError, DecodeErrors};
use crate::handler::{BoxedRoute, Handler, HttpResponse, bad_request, status_only};
use crate::method::Method;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::route`] call returns `self` so registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedRoute>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers `handler` to serve `endpoint`. Returns `self` for chaining.
    ///
    /// ```rust,no_run
    /// use servitor::{get, path, Capture, Context, Router, codec::text};
    ///
    /// # fn main() -> Result<(), servitor::BuildError> {
    /// let greet = get(path("/hello/").capture(Capture::new("name")))?
    ///     .response(text::as_text::<String>());
    ///
    /// let app = Router::new().route(greet, |ctx: Context| async move {
    ///     format!("hello, {}", ctx.capture::<String>("name").map_or("stranger", String::as_str))
    /// });
    /// # Ok(()) }
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the endpoint's path conflicts with one already registered
    /// for the same method. Route tables are built at startup, so this is a
    /// programming error.
    pub fn route<R, H>(mut self, endpoint: Endpoint<R>, handler: H) -> Self
    where
        H: Handler<R>,
    {
        let pattern = endpoint.parts.route_pattern();
        let method = endpoint.method();
        let described = endpoint.to_string();
        self.routes
            .entry(method)
            .or_default()
            .insert(pattern, handler.into_boxed_route(endpoint))
            .unwrap_or_else(|e| panic!("invalid route `{described}`: {e}"));
        self
    }

    fn lookup(&self, method: Method, path: &str) -> Option<(BoxedRoute, Vec<(String, String)>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let route = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((route, params))
    }

    fn allowed_elsewhere(&self, path: &str) -> bool {
        self.routes.values().any(|tree| tree.at(path).is_ok())
    }

    /// Routes one request whose body has already been read.
    ///
    /// `404` when no endpoint matches the path, `405` when one matches under
    /// a different method, `400` when the request does not decode. Captures
    /// are percent-decoded before their decoders see them.
    pub async fn handle(&self, req: http::Request<Bytes>) -> HttpResponse {
        let (head, body) = req.into_parts();

        let Ok(method) = Method::try_from(&head.method) else {
            debug!(method = %head.method, "unsupported method");
            return status_only(StatusCode::METHOD_NOT_ALLOWED);
        };
        let path = head.uri.path();

        let Some((route, params)) = self.lookup(method, path) else {
            return if self.allowed_elsewhere(path) {
                status_only(StatusCode::METHOD_NOT_ALLOWED)
            } else {
                status_only(StatusCode::NOT_FOUND)
            };
        };

        let mut errors = DecodeErrors::default();
        let mut raw = RawRequest::new().with_body(body);

        for (k, v) in params {
            match percent_decode_str(&v).decode_utf8() {
                Ok(segment) => raw = raw.with_capture(k, segment),
                Err(e) => errors.push(
                    DecodeError::new(format!("invalid UTF-8 after percent-decoding: {e}"))
                        .at(ElementKind::Capture, &k),
                ),
            }
        }

        match head.uri.query().map(parse_query) {
            None => {}
            Some(Ok(pairs)) => {
                for (k, v) in pairs {
                    raw = raw.with_query(k, v);
                }
            }
            Some(Err(e)) => errors.push(e),
        }

        if !errors.is_empty() {
            debug!(%path, %errors, "request rejected before decoding");
            return bad_request(&errors);
        }

        for (name, value) in collect_headers(&head.headers) {
            raw = raw.with_header(name, value);
        }

        route.call(raw).await
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// Splits a query string into decoded pairs. Escapes that do not decode to
/// UTF-8 are an error rather than being replaced.
fn parse_query(query: &str) -> Result<Vec<(String, String)>, DecodeError> {
    let malformed = |e: &dyn std::fmt::Display| DecodeError::new(format!("malformed query string: {e}"));
    percent_decode_str(query).decode_utf8().map_err(|e| malformed(&e))?;
    serde_urlencoded::from_str(query).map_err(|e| malformed(&e))
}

/// Folds a header map into one [`HeaderValue`] per name: `Text` for a single
/// occurrence, `List` for repeats. Values that are not visible ASCII are
/// dropped.
fn collect_headers(headers: &http::HeaderMap) -> Vec<(String, HeaderValue)> {
    headers.keys()
        .filter_map(|name| {
            let mut values: Vec<String> = headers.get_all(name).iter()
                .filter_map(|v| v.to_str().ok().map(str::to_owned))
                .collect();
            let value = match values.len() {
                0 => return None,
                1 => HeaderValue::Text(values.remove(0)),
                _ => HeaderValue::List(values),
            };
            Some((name.as_str().to_owned(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde::{Deserialize, Serialize};
    use serde_json::{Value, json};

    use crate::builder::{delete, get, post};
    use crate::codec::{json, text};
    use crate::decode;
    use crate::dispatch::{Context, Reply};
    use crate::element::{Capture, QueryParam, RequestHeader, ResponseHeader};
    use crate::path::path;

    #[derive(Debug, Deserialize, Serialize)]
    struct NewArticle {
        title: String,
    }

    fn request(method: &str, uri: &str, body: &str) -> http::Request<Bytes> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::from(body.to_owned()))
            .unwrap()
    }

    async fn body_json(res: HttpResponse) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn app() -> Router {
        let show = get(path("/articles/").capture(Capture::with("id", decode::parse::<u64>())))
            .unwrap()
            .query(QueryParam::optional("fields", decode::parse::<String>()))
            .unwrap()
            .response(json::as_json::<Value>());

        let create = post("/articles")
            .unwrap()
            .req_header(RequestHeader::new("authorization"))
            .unwrap()
            .body(json::from_json::<NewArticle>())
            .res_header(ResponseHeader::new("location"))
            .unwrap()
            .response_with(json::as_json::<NewArticle>(), StatusCode::CREATED);

        let remove = delete(path("/articles/").capture(Capture::new("id")))
            .unwrap()
            .response_with(text::as_text::<&'static str>(), StatusCode::NO_CONTENT);

        Router::new()
            .route(show, |ctx: Context| async move {
                let id = *ctx.capture::<u64>("id").unwrap();
                let fields = ctx.query::<Option<String>>("fields").cloned().flatten();
                json!({ "id": id, "fields": fields })
            })
            .route(create, |mut ctx: Context| async move {
                let article = ctx.take_body::<NewArticle>().unwrap();
                Reply::new(article).header("location", "/articles/1".to_owned())
            })
            .route(remove, |_: Context| async { "" })
    }

    #[tokio::test]
    async fn decodes_captures_and_query() {
        let res = app().handle(request("GET", "/articles/42?fields=title", "")).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!({ "id": 42, "fields": "title" }));
    }

    #[tokio::test]
    async fn bad_capture_is_a_400_with_details() {
        let res = app().handle(request("GET", "/articles/abc", "")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["errors"][0]["kind"], "capture");
        assert_eq!(body["errors"][0]["name"], "id");
    }

    #[tokio::test]
    async fn create_sets_status_and_headers() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/articles")
            .header("authorization", "Token abc")
            .body(Bytes::from_static(br#"{"title":"Rust"}"#))
            .unwrap();
        let res = app().handle(req).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()["location"], "/articles/1");
        assert_eq!(res.headers()["content-type"], "application/json");
        assert_eq!(body_json(res).await, json!({ "title": "Rust" }));
    }

    #[tokio::test]
    async fn missing_header_and_bad_body_reported_together() {
        let res = app().handle(request("POST", "/articles", "{")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn unknown_path_and_wrong_method() {
        let app = app();
        assert_eq!(app.handle(request("GET", "/nope", "")).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.handle(request("PUT", "/articles/1", "")).await.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(app.handle(request("PURGE", "/articles/1", "")).await.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(app.handle(request("DELETE", "/articles/1", "")).await.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn captures_are_percent_decoded() {
        let profile = get(path("/profiles/").capture(Capture::new("username")))
            .unwrap()
            .response(text::as_text::<String>());
        let app = Router::new().route(profile, |ctx: Context| async move {
            ctx.capture::<String>("username").cloned().unwrap_or_default()
        });

        let res = app.handle(request("GET", "/profiles/john%20doe", "")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, "john doe");

        let res = app.handle(request("GET", "/profiles/%FF", "")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["errors"][0]["kind"], "capture");
        assert_eq!(body["errors"][0]["name"], "username");
    }

    #[tokio::test]
    async fn malformed_query_reports_errors_as_json() {
        let res = app().handle(request("GET", "/articles/1?fields=%FF", "")).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(res.headers()["content-type"], "application/json");
        let body = body_json(res).await;
        let message = body["errors"][0]["message"].as_str().unwrap_or_default();
        assert!(message.starts_with("malformed query string"), "{message}");
    }

    #[test]
    fn query_pairs_keep_repeats_and_decode_plus() {
        let pairs = parse_query("tag=a+b&tag=c%2Fd&empty=").unwrap();
        assert_eq!(
            pairs,
            [
                ("tag".to_owned(), "a b".to_owned()),
                ("tag".to_owned(), "c/d".to_owned()),
                ("empty".to_owned(), String::new()),
            ],
        );
        assert!(parse_query("q=%C3%28").is_err());
    }

    #[test]
    fn repeated_headers_become_lists() {
        let mut map = http::HeaderMap::new();
        map.append("accept", http::HeaderValue::from_static("text/html"));
        map.append("accept", http::HeaderValue::from_static("application/json"));
        map.insert("host", http::HeaderValue::from_static("example.com"));
        let mut got = collect_headers(&map);
        got.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            got,
            [
                ("accept".to_owned(), HeaderValue::List(vec!["text/html".into(), "application/json".into()])),
                ("host".to_owned(), HeaderValue::from("example.com")),
            ],
        );
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let a = get(path("/x/").capture(Capture::new("a"))).unwrap().response(text::as_text::<String>());
        let b = get(path("/x/").capture(Capture::new("b"))).unwrap().response(text::as_text::<String>());
        let _ = Router::new()
            .route(a, |_: Context| async { String::new() })
            .route(b, |_: Context| async { String::new() });
    }
}

//! # servitor
//!
//! Declare HTTP endpoints as typed, immutable descriptions, then serve them.
//!
//! An endpoint states everything about one operation up front: verb, path
//! template with typed captures, request headers, query parameters, request
//! body, response headers, and response encoding. The builder checks the
//! declaration as it grows, so mistakes such as a repeated name or a body on
//! a GET surface at startup instead of at request time.
//!
//! ## The pieces
//!
//! - [`Builder`]: staged, typestate endpoint construction
//! - [`Endpoint`]: the frozen description, with the dispatch contract
//!   ([`Endpoint::assemble_context`], [`Endpoint::assemble_response`])
//! - [`Router`] and [`Server`]: a small hyper adapter that serves endpoints
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use servitor::{Context, Reply, ResponseHeader, Router, Server, capture, codec::json, get, health, path, post};
//!
//! #[derive(Deserialize, Serialize)]
//! struct User { name: String }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let show = get(path("/users/").capture(capture("id")))?
//!         .response(json::as_json::<User>());
//!     let create = post("/users")?
//!         .body(json::from_json::<User>())
//!         .res_header(ResponseHeader::new("location"))?
//!         .response_with(json::as_json::<User>(), http::StatusCode::CREATED);
//!
//!     let app = Router::new()
//!         .route(show, |ctx: Context| async move {
//!             User { name: ctx.capture::<String>("id").cloned().unwrap_or_default() }
//!         })
//!         .route(create, |mut ctx: Context| async move {
//!             let user = ctx.take_body::<User>().unwrap_or(User { name: String::new() });
//!             Reply::new(user).header("location", "/users/1".to_owned())
//!         });
//!
//!     Server::bind("0.0.0.0:3000")?.serve(health::register(app)?).await?;
//!     Ok(())
//! }
//! ```

mod builder;
mod dispatch;
mod element;
mod endpoint;
mod error;
mod handler;
mod method;
mod path;
mod router;
mod server;

pub mod codec;
pub mod decode;
pub mod health;

pub use builder::{Builder, connect, delete, endpoint, get, head, options, patch, post, put, stage, trace, verb};
pub use dispatch::{Context, RawRequest, RawResponse, Reply};
pub use element::{
    BodyDecoder, Capture, ElementKind, HeaderValue, QueryParam, RequestHeader, ResponseEncoder, ResponseHeader, capture,
};
pub use endpoint::Endpoint;
pub use error::{BuildError, DecodeError, DecodeErrors, EncodeError, Error, ResponseError};
pub use handler::Handler;
pub use method::{Method, UnknownMethod};
pub use path::{Path, PathCapture, path};
pub use router::Router;
pub use server::{DEFAULT_BODY_LIMIT, Server};

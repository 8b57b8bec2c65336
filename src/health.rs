//! Built-in health-check endpoints.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! ```rust,no_run
//! use servitor::{Router, health};
//!
//! let app = health::register(Router::new())?;
//! # Ok::<(), servitor::BuildError>(())
//! ```
//!
//! To gate readiness on your own dependencies, declare the endpoint yourself
//! and route it to your own handler.

use crate::builder::get;
use crate::codec::text;
use crate::dispatch::Context;
use crate::error::BuildError;
use crate::router::Router;

/// Always `"ok"`. If the process can respond to HTTP at all, it is alive.
pub async fn liveness(_: Context) -> &'static str {
    "ok"
}

/// Always `"ready"`.
pub async fn readiness(_: Context) -> &'static str {
    "ready"
}

/// Adds `GET /healthz` and `GET /readyz` to `router`.
pub fn register(router: Router) -> Result<Router, BuildError> {
    let live = get("/healthz")?.response(text::as_text::<&'static str>());
    let ready = get("/readyz")?.response(text::as_text::<&'static str>());
    Ok(router.route(live, liveness).route(ready, readiness))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn health_checks_answer_with_text() {
        let app = register(Router::new()).unwrap();
        for (uri, expected) in [("/healthz", "ok"), ("/readyz", "ready")] {
            let req = http::Request::get(uri).body(Bytes::new()).unwrap();
            let res = app.handle(req).await;
            assert_eq!(res.status(), StatusCode::OK);
            let body = res.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(body, expected);
        }
    }
}

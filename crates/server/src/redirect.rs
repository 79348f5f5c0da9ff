//! Plain-HTTP redirect listener for TLS deployments.
//!
//! When the main listener is only reachable over HTTPS, a second listener
//! (usually port 80) answers every request with a 301 to the public URL,
//! preserving path and query.

use axum::Router;
use axum::http::{StatusCode, Uri, header};

/// Build the catch-all redirect router.
pub fn redirect_router(public_url: String) -> Router {
    let public_url = public_url.trim_end_matches('/').to_string();
    Router::new().fallback(move |uri: Uri| {
        let public_url = public_url.clone();
        async move {
            let path_and_query = uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            let target = format!("{public_url}{path_and_query}");
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, target)])
        }
    })
}

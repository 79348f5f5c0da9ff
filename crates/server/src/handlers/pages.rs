//! Static landing page.

use axum::response::Html;

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Drover</title>
  <style>
    body { font-family: sans-serif; max-width: 42em; margin: 3em auto; padding: 0 1em; }
    code { background: #eee; padding: 0.1em 0.3em; }
  </style>
</head>
<body>
  <h1>Drover</h1>
  <p>Coordination server for a volunteer distributed-archiving swarm.</p>
  <p>Workers pull batches from <code>POST /api/batches</code>, upload archives
  through presigned URLs, and report back via <code>/api/commit</code> and
  <code>/api/finalize</code>. Progress lives at <code>/api/stats</code>.</p>
  <p>Have identifiers we are missing? Submit them to
  <code>/api/videos/submit</code>, <code>/api/playlists/submit</code>, or
  <code>/api/channels/submit</code>.</p>
</body>
</html>
"#;

/// GET / - Landing page.
pub async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

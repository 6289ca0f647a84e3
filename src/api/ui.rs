//! Debug View
//!
//! `GET /ui?key=..&pass=..` renders the current value of one key and a small
//! form that writes through the regular `POST /<key>` endpoint.

use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;
use tracing::debug;

use super::handlers::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UiQuery {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub pass: String,
}

/// Handler for /ui; every method except OPTIONS renders the page
///
/// Lookup failures render as an empty value.
pub async fn ui_handler(State(state): State<AppState>, Query(query): Query<UiQuery>) -> Html<String> {
    let mut value = String::new();
    if !query.key.is_empty() {
        match state.cache.get(&query.key).await {
            Ok(Some(bytes)) => value = String::from_utf8_lossy(&bytes).into_owned(),
            Ok(None) => {}
            Err(err) => debug!(error = %err, "debug view lookup failed"),
        }
    }
    Html(render_page(&query.key, &value, &query.pass))
}

fn render_page(key: &str, value: &str, pass: &str) -> String {
    let key = escape_html(key);
    let value = escape_html(value);
    let pass = escape_html(pass);
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>JSON store</title>
</head>
<body>
<form method="get" action="/ui">
<label>Key <input name="key" value="{key}"></label>
<label>Password <input name="pass" type="password" value="{pass}"></label>
<button type="submit">Load</button>
</form>
<textarea id="value" rows="20" cols="80">{value}</textarea>
<button id="save" type="button">Save</button>
<p id="status"></p>
<script>
document.getElementById("save").addEventListener("click", async () => {{
  const form = document.forms[0];
  const key = form.key.value;
  const response = await fetch("/" + encodeURIComponent(key), {{
    method: "POST",
    headers: {{ "Authorization": form.pass.value, "Content-Type": "application/json" }},
    body: document.getElementById("value").value,
  }});
  document.getElementById("status").textContent =
    response.ok ? "Saved" : response.status + " " + (await response.text());
}});
</script>
</body>
</html>
"#
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

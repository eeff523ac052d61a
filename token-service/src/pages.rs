//! Minimal HTML front end: landing page, token display and manual verification.

use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCopy {
    pub title: &'static str,
    pub description: &'static str,
    pub hint: &'static str,
}

const GENERIC_ERROR: ErrorCopy = ErrorCopy {
    title: "Sign-in error",
    description: "An error occurred while signing in.",
    hint: "Try starting a new session.",
};

/// Explanation shown on the landing page for a sign-in failure code.
pub fn error_copy(code: &str) -> ErrorCopy {
    match code {
        "state" => ErrorCopy {
            title: "Invalid state",
            description: "The request is expired or unsafe (state mismatch).",
            hint: "Start again from the \u{201c}Continue with Google\u{201d} button.",
        },
        "exchange" => ErrorCopy {
            title: "Token exchange failed",
            description: "Failed to exchange the authorization code for a token.",
            hint: "This may be a network issue. Please try again.",
        },
        "no_id" => ErrorCopy {
            title: "Missing ID token",
            description: "No ID token was received from Google.",
            hint: "Check your Google account permissions and retry.",
        },
        "id_token" => ErrorCopy {
            title: "ID token rejected",
            description: "The ID token from Google could not be verified.",
            hint: "Start again from the \u{201c}Continue with Google\u{201d} button.",
        },
        "nonce" => ErrorCopy {
            title: "Invalid nonce",
            description: "Replay protection (nonce) did not match.",
            hint: "Refresh the page and sign in again.",
        },
        // `not_chula` is the code older links still carry.
        "domain" | "not_chula" => ErrorCopy {
            title: "Email not allowed",
            description: "The email is outside the allowed domain or has not been verified.",
            hint: "Use your institutional email and ensure it is verified with Google.",
        },
        _ => GENERIC_ERROR,
    }
}

/// Explanation for a verification endpoint reason.
pub fn reason_explanation(reason: &str) -> &'static str {
    match reason {
        "format" => "This is not a token: it must be two parts separated by a single dot.",
        "signature" => "The signature does not match. The token was altered or issued elsewhere.",
        "payload" => "The token is damaged and its contents cannot be read.",
        "expired" => "The token was genuine but has expired. Sign in again for a new one.",
        "no_token" => "Paste a token first.",
        "bad_request" => "The request could not be understood.",
        _ => "The token could not be verified.",
    }
}

const VERIFY_REASONS: [&str; 6] = [
    "format",
    "signature",
    "payload",
    "expired",
    "no_token",
    "bad_request",
];

#[derive(Debug, Default, Deserialize)]
pub struct HomeParams {
    pub error: Option<String>,
}

pub async fn home_page(
    State(state): State<AppState>,
    Query(params): Query<HomeParams>,
) -> Html<String> {
    let domain = escape_html(state.policy.allowed_domain());
    let alert = params
        .error
        .as_deref()
        .map(render_error)
        .unwrap_or_default();

    Html(layout(
        "Anonymous token",
        &format!(
            r#"<h1>Prove you belong. Stay anonymous.</h1>
<p>We verify your <strong>@{domain}</strong> email with Google and issue a short-lived token that contains
only its issue and expiry time. No databases. No tracking.</p>
{alert}
<p><a class="button" href="/api/auth/google/start">Continue with Google</a></p>
<p><a href="/verify">Verify a token</a></p>"#
        ),
    ))
}

pub async fn token_page(State(state): State<AppState>) -> Html<String> {
    let ttl = state.signer.ttl_seconds();
    Html(layout(
        "Your token",
        &format!(
            r#"<h1>Your token</h1>
<div id="missing"><p>No token found. <a href="/">Sign in</a> to get one.</p></div>
<div id="present" hidden>
<textarea id="token" readonly rows="6" cols="80"></textarea>
<p>This token contains only <code>iat</code> and <code>exp</code> and is HMAC-signed.
It remains valid for {ttl} seconds from issue.</p>
<button id="copy" type="button">Copy</button> <span id="copied" hidden>Copied</span>
</div>
<script>
const params = new URLSearchParams(window.location.hash.replace(/^#/, ""));
const token = params.get("token");
if (token) {{
  document.getElementById("token").value = token;
  document.getElementById("present").hidden = false;
  document.getElementById("missing").hidden = true;
  history.replaceState(null, "", "/token");
}}
document.getElementById("copy").addEventListener("click", async () => {{
  const field = document.getElementById("token");
  try {{ await navigator.clipboard.writeText(field.value); }}
  catch (_) {{ field.select(); document.execCommand("copy"); }}
  const note = document.getElementById("copied");
  note.hidden = false;
  setTimeout(() => {{ note.hidden = true; }}, 1500);
}});
</script>"#
        ),
    ))
}

pub async fn verify_page() -> Html<String> {
    let explanations: serde_json::Map<String, serde_json::Value> = VERIFY_REASONS
        .iter()
        .map(|reason| (reason.to_string(), reason_explanation(reason).into()))
        .collect();
    let explanations = serde_json::Value::Object(explanations).to_string();

    Html(layout(
        "Verify token",
        &format!(
            r#"<h1>Verify token</h1>
<p>Paste a token to check its signature and expiry. Nothing is stored.</p>
<textarea id="token" rows="6" cols="80" placeholder="paste your token here"></textarea>
<p><button id="check" type="button">Check</button></p>
<pre id="result">&mdash;</pre>
<p id="explanation"></p>
<script>
const explanations = {explanations};
document.getElementById("check").addEventListener("click", async () => {{
  const response = await fetch("/api/verify", {{
    method: "POST",
    headers: {{ "Content-Type": "application/json" }},
    body: JSON.stringify({{ token: document.getElementById("token").value }}),
  }});
  const data = await response.json();
  document.getElementById("result").textContent = JSON.stringify(data, null, 2);
  document.getElementById("explanation").textContent = data.ok
    ? "Valid until " + new Date(data.payload.exp * 1000).toLocaleString() + "."
    : (explanations[data.reason] || "The token could not be verified.");
}});
</script>"#
        ),
    ))
}

fn render_error(code: &str) -> String {
    let copy = error_copy(code);
    let shown_code = if is_plain_code(code) { code } else { "unknown" };
    format!(
        r#"<div class="error" role="alert"><h2>{}</h2><p>{} <small>({})</small></p><p>{}</p></div>"#,
        copy.title, copy.description, shown_code, copy.hint
    )
}

fn is_plain_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= 32
        && code.chars().all(|ch| ch.is_ascii_lowercase() || ch == '_')
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1"><title>{title}</title></head>
<body><main>
{body}
</main></body>
</html>"#
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

//! Minimal HTML pages. Every interpolated value goes through [`escape_html`].

use crate::diagnostics::Diagnostics;
use axum::response::Html;

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, head: &str, body: &str, diagnostics: Option<&Diagnostics>) -> Html<String> {
    let debug = diagnostics
        .and_then(|diagnostics| serde_json::to_string_pretty(diagnostics).ok())
        .map(|json| format!("<pre class=\"diagnostics\">{}</pre>", escape_html(&json)))
        .unwrap_or_default();
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n{head}</head>\n<body>\n{body}\n{debug}\n</body>\n</html>\n",
        title = escape_html(title),
    ))
}

/// Refreshes to `target` after `delay_secs`, with a link for clients that do not.
pub fn redirect_page(target: &str, delay_secs: u32, diagnostics: Option<&Diagnostics>) -> Html<String> {
    let target = escape_html(target);
    let head = format!("<meta http-equiv=\"refresh\" content=\"{delay_secs};url={target}\">\n");
    let body = format!(
        "<h1>Almost there</h1>\n<p>You are being redirected. If nothing happens, <a href=\"{target}\">continue here</a>.</p>"
    );
    layout("Redirecting", &head, &body, diagnostics)
}

pub fn verified_page(diagnostics: Option<&Diagnostics>) -> Html<String> {
    layout(
        "Already verified",
        "",
        "<h1>Already verified</h1>\n<p>You are verified. You can return to the chat.</p>",
        diagnostics,
    )
}

pub fn message_page(title: &str, message: &str, diagnostics: Option<&Diagnostics>) -> Html<String> {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>",
        escape_html(title),
        escape_html(message)
    );
    layout(title, "", &body, diagnostics)
}

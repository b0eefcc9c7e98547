//! Email subject and HTML body rendering.
//!
//! Pure string builders; the stages and the failure notifier feed the output
//! straight to the mailer. Everything user-controlled is escaped before it is
//! placed into markup.

use std::fmt::Write as _;

use retitle_core::JobId;

use crate::record::ImprovedTitle;

/// Subject line for failure notifications.
pub const FAILURE_SUBJECT: &str = "Request failed for youtube title generation";

const RULE: &str = r#"<hr style="border: 1px solid #000; margin: 20px 0;">"#;

const FOOTER: &str =
    r#"<footer style="text-align: center; margin-top: 20px;">Powered by Retitle</footer>"#;

/// Subject line for the results email.
#[must_use]
pub fn success_subject(channel_name: &str) -> String {
    format!("New titles for {channel_name}")
}

/// HTML body for the results email: a header naming the channel, one block
/// per video with the original title, the improvement, the rationale, and a
/// link, separated by rules.
#[must_use]
pub fn success_body(channel_name: &str, titles: &[ImprovedTitle]) -> String {
    let mut html = format!("<h1>Improved titles for {}</h1>", escape_html(channel_name));
    html.push_str(RULE);
    for (idx, title) in titles.iter().enumerate() {
        let _ = write!(
            html,
            "<h2>Video {n}:</h2>\
             <p><strong>Original:</strong> {original}</p>\
             <p><strong>Improved:</strong> {improved}</p>\
             <p><strong>Why:</strong> {rationale}</p>\
             <p><strong>URL:</strong> <a href=\"{url}\">{url}</a></p>",
            n = idx + 1,
            original = escape_html(&title.original),
            improved = escape_html(&title.improved),
            rationale = escape_html(&title.rationale),
            url = escape_html(&title.url),
        );
        html.push_str(RULE);
    }
    html.push_str(FOOTER);
    html
}

/// HTML body for failure notifications, naming the job and what went wrong.
#[must_use]
pub fn failure_body(job_id: &JobId, error: &str) -> String {
    format!(
        "<h1>We could not finish your titles</h1>\
         <p>Sorry, your title request <code>{job_id}</code> failed:</p>\
         <p><strong>{}</strong></p>\
         <p>Please try submitting the channel again.</p>{FOOTER}",
        escape_html(error),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

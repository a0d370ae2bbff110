//! Server-rendered invitation page.
//!
//! Plain, unstyled markup: the page only has to present the resolved
//! department. Visual treatment belongs to whatever front end wraps it.

use std::fmt::Write;

use axum::{
    extract::{Query, State},
    response::Html,
};

use super::InvitationQuery;
use crate::models::ActiveDepartment;
use crate::resolver::resolve_active;
use crate::AppState;

/// GET / - Landing page for `?dept=<code>`.
pub async fn invitation_page(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Html<String> {
    let query = InvitationQuery::from_pairs(pairs);
    let mapping = state.departments.mapping().await;
    let active = resolve_active(&mapping, query.dept.as_deref());
    Html(render_invitation(&active, query.show_admin_login()))
}

/// Render the invitation document for `active`.
pub fn render_invitation(active: &ActiveDepartment, show_admin_login: bool) -> String {
    let record = &active.record;
    let mut html = String::with_capacity(4096);

    // Writing into a String cannot fail.
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{event} | {name}</title>\n</head>\n<body>\n<main>\n",
        event = escape(&record.event_name),
        name = escape(&record.name),
    );

    let _ = write!(
        html,
        "<section id=\"hero\">\n<h1>{}</h1>\n<p>{}</p>\n</section>\n",
        escape(&record.event_name),
        escape(&record.tagline),
    );

    if active.is_specific {
        let _ = write!(
            html,
            "<section id=\"department\" data-dept=\"{}\">\n<h2>{}</h2>\n</section>\n",
            escape(&active.code),
            escape(&record.name),
        );
    }

    html.push_str("<section id=\"message\">\n");
    for paragraph in record.message.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let _ = writeln!(html, "<p>{}</p>", escape(paragraph).replace('\n', "<br>"));
    }
    html.push_str("</section>\n");

    let _ = write!(
        html,
        "<section id=\"details\">\n<dl>\n<dt>Date</dt><dd>{}</dd>\n\
         <dt>Time</dt><dd>{}</dd>\n<dt>Venue</dt><dd>{}</dd>\n</dl>\n</section>\n",
        escape(&record.date),
        escape(&record.time),
        escape(&record.venue),
    );

    if !record.highlights.is_empty() {
        html.push_str("<section id=\"highlights\">\n<ul>\n");
        for highlight in &record.highlights {
            let _ = writeln!(html, "<li>{}</li>", escape(highlight));
        }
        html.push_str("</ul>\n</section>\n");
    }

    let _ = write!(
        html,
        "<footer>\n<p>{} Organizing Committee</p>\n</footer>\n</main>\n",
        escape(&record.event_name),
    );

    if show_admin_login {
        html.push_str(
            "<aside id=\"admin-login\">\n<form data-endpoint=\"/api/admin/login\">\n\
             <label>ADMIN_PASSWORD: <input type=\"password\" name=\"password\" \
             placeholder=\"ENTER PASSWORD\"></label>\n</form>\n</aside>\n",
        );
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// Escape text for HTML element and attribute content.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
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

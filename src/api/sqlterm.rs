//! Ad-hoc SQL terminal page.
//!
//! An administrative raw-query console: the submitted statement runs
//! verbatim against the accounting database. Access is gated by the admin
//! key middleware in `api::router`.

use std::fmt::Write;
use std::sync::Arc;

use axum::{
    extract::{RawForm, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::render;
use crate::store::postgres::AdHocResult;
use crate::AppState;

const PAGE_PATH: &str = "/sql-term";

/// GET/POST /sql-term.
///
/// Always renders the text area with the prior submission echoed back. When
/// a `sql` field is present the statement is executed; on success the rows
/// follow the form, on failure the response is only the database-supplied
/// error text.
pub async fn sql_terminal(
    State(state): State<Arc<AppState>>,
    RawForm(body): RawForm,
) -> Response {
    let params = super::parse_params(&body);
    // One unescaping pass, applied before both execution and redisplay.
    let submitted = params.get("sql").map(|s| strip_slashes(s));

    let mut page = render::page_header("SQL Terminal");
    page.push_str(&terminal_form(submitted.as_deref()));

    if let Some(sql) = &submitted {
        tracing::info!("SQL terminal statement: {}", sql);
        match state.db.run_adhoc(sql).await {
            Ok(result) => page.push_str(&result_table(&result)),
            Err(e) => {
                // Fatal for this request: no chrome, just the driver's message.
                return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
            }
        }
    }

    page.push_str(render::page_footer());
    Html(page).into_response()
}

/// The statement form, with any prior (already-unquoted) submission echoed
/// back in the textarea verbatim, matching the page's historical behavior.
fn terminal_form(submitted: Option<&str>) -> String {
    let mut form = render::begin_form(PAGE_PATH);
    form.push_str("<textarea name=\"sql\" cols=\"80\" rows=\"5\">");
    if let Some(sql) = submitted {
        form.push_str(sql);
    }
    form.push_str("</textarea>\n<br>\n");
    form.push_str(render::end_form());
    form
}

/// Result rows, no header row, every cell escaped.
fn result_table(result: &AdHocResult) -> String {
    let mut table = String::from("<table border=1>\n");
    for row in &result.rows {
        table.push_str("<tr valign=\"top\">");
        for cell in row {
            let _ = write!(table, "<td><pre>{}</pre></td>", render::escape_html(cell));
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</table>\n");
    table
}

/// Remove one level of backslash quoting: a backslash makes the following
/// character literal; a trailing lone backslash is dropped.
pub fn strip_slashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

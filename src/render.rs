//! HTML page chrome and form/table helpers shared by the report pages.
//!
//! Pages are built as plain strings; no template engine. Table cells on the
//! usage report are deliberately emitted unescaped (legacy parity — see
//! DESIGN.md); the SQL terminal escapes its cells.

use std::fmt::Write;

pub fn page_header(title: &str) -> String {
    let mut page = String::new();
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    page.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(page, "<title>{}</title>", escape_html(title));
    page.push_str(
        "<style>body{font-family:sans-serif;margin:2em}table{border-collapse:collapse}\
         td,th{padding:2px 8px}pre{margin:0}</style>\n",
    );
    page.push_str("</head>\n<body>\n");
    let _ = writeln!(page, "<h1>{}</h1>", escape_html(title));
    page
}

pub fn page_footer() -> &'static str {
    "</body>\n</html>\n"
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn begin_form(action: &str) -> String {
    format!("<form method=\"POST\" action=\"{action}\">\n")
}

pub fn end_form() -> &'static str {
    "<input type=\"submit\">\n<input type=\"reset\">\n</form>\n"
}

/// Dropdown of configured systems, or a free-text input when the site file
/// does not list any. The `%` wildcard option matches every system.
pub fn system_chooser(systems: &[String]) -> String {
    let mut out = String::from("<p>System:\n");
    if systems.is_empty() {
        out.push_str("<input type=\"text\" name=\"system\" value=\"%\">\n");
    } else {
        out.push_str("<select name=\"system\">\n<option value=\"%\">all</option>\n");
        for system in systems {
            let system = escape_html(system);
            let _ = writeln!(out, "<option value=\"{system}\">{system}</option>");
        }
        out.push_str("</select>\n");
    }
    out.push_str("</p>\n");
    out
}

pub fn date_fields(start: Option<&str>, end: Option<&str>) -> String {
    format!(
        "<p>Start date: <input type=\"text\" name=\"start_date\" value=\"{}\"></p>\n\
         <p>End date: <input type=\"text\" name=\"end_date\" value=\"{}\"></p>\n",
        escape_html(start.unwrap_or("")),
        escape_html(end.unwrap_or(""))
    )
}

pub fn checkboxes_from_array(label: &str, ids: &[&str]) -> String {
    let mut out = format!("<p>{}:</p>\n<p>\n", escape_html(label));
    for id in ids {
        let id = escape_html(id);
        let _ = writeln!(
            out,
            "<label><input type=\"checkbox\" name=\"{id}\" value=\"on\"> <code>{id}</code></label><br>"
        );
    }
    out.push_str("</p>\n");
    out
}

/// GET link reproducing the current parameter set, so a rendered report can
/// be bookmarked or fetched from the command line.
pub fn bookmarkable_url(path: &str, params: &[(&str, &str)]) -> String {
    let mut url = String::from(path);
    for (i, (key, value)) in params.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(&urlencoding::encode(key));
        url.push('=');
        url.push_str(&urlencoding::encode(value));
    }
    format!(
        "<p><a href=\"{url}\">Bookmarkable URL for this report</a></p>\n",
        url = escape_html(&url)
    )
}

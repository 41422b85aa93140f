//! Weekly software-usage report page.

use std::fmt::Write;
use std::sync::Arc;

use axum::{
    extract::{RawForm, State},
    response::Html,
};

use crate::errors::AppError;
use crate::models::report::{ReportRequest, WeeklyUsageRow};
use crate::render;
use crate::AppState;

const PAGE_PATH: &str = "/software-usage";

/// GET/POST /software-usage.
///
/// Without a `system` field this renders the selection form and touches no
/// database. With one, it runs one aggregate query per selected package
/// (sequentially, in catalog order) and renders one table per package.
pub async fn usage_report(
    State(state): State<Arc<AppState>>,
    RawForm(body): RawForm,
) -> Result<Html<String>, AppError> {
    let params = super::parse_params(&body);
    let req = ReportRequest::from_params(&params, &state.catalog);

    let mut page = render::page_header(&req.title());

    match &req.system {
        None => {
            let ids: Vec<&str> = state.catalog.ids().collect();
            page.push_str(&render::begin_form(PAGE_PATH));
            page.push_str(&render::system_chooser(&state.catalog.systems));
            page.push_str(&render::date_fields(None, None));
            page.push_str(&render::checkboxes_from_array("Packages", &ids));
            page.push_str(render::end_form());
        }
        Some(system) => {
            for id in &req.selected {
                let Some(fragment) = state.catalog.filter_for(id) else {
                    continue;
                };
                tracing::debug!(package = %id, system = %system, "running usage query");
                let rows = state
                    .db
                    .weekly_software_usage(system, &fragment, &req.range)
                    .await?;
                let _ = writeln!(page, "<h3><code>{}</code></h3>", render::escape_html(id));
                page.push_str(&usage_table(&rows));
            }
            page.push_str(&bookmark_link(&req, system));
        }
    }

    page.push_str(render::page_footer());
    Ok(Html(page))
}

/// One report table: fixed header row, one row per week, cells
/// right-aligned. Cell text is written into the page as-is (legacy parity,
/// see DESIGN.md).
fn usage_table(rows: &[WeeklyUsageRow]) -> String {
    let mut table = String::from("<table border=1>\n");
    table.push_str(
        "<tr><th>week</th><th>jobcount</th><th>cpuhours</th>\
         <th>cpuhours_alt</th><th>users</th><th>groups</th></tr>\n",
    );
    for row in rows {
        table.push_str("<tr>");
        for cell in [
            row.week.clone(),
            row.jobcount.to_string(),
            row.cpuhours.to_string(),
            row.cpuhours_alt.to_string(),
            row.users.to_string(),
            row.groups.to_string(),
        ] {
            let _ = write!(table, "<td align=\"right\"><pre>{cell}</pre></td>");
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</table>\n");
    table
}

fn bookmark_link(req: &ReportRequest, system: &str) -> String {
    let (start, end) = req.range.as_fields();
    let mut params: Vec<(&str, &str)> = vec![("system", system)];
    if let Some(start) = start {
        params.push(("start_date", start));
    }
    if let Some(end) = end {
        params.push(("end_date", end));
    }
    for id in &req.selected {
        params.push((id, "on"));
    }
    render::bookmarkable_url(PAGE_PATH, &params)
}

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod sqlterm;
pub mod usage;

/// Build the application router. Report pages accept GET or POST with
/// identical field semantics; the SQL terminal additionally requires the
/// admin key.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/software-usage",
            get(usage::usage_report).post(usage::usage_report),
        )
        .route(
            "/sql-term",
            get(sqlterm::sql_terminal)
                .post(sqlterm::sql_terminal)
                .layer(middleware::from_fn_with_state(state.clone(), admin_auth)),
        )
        .route("/api/v1/packages", get(list_packages))
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Decode query-string or form-body fields. Callers hand in whichever the
/// request carried; both surfaces share these semantics.
pub(crate) fn parse_params(bytes: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(bytes).into_owned().collect()
}

#[derive(Serialize)]
struct PackageInfo {
    id: String,
    filter: String,
}

/// GET /api/v1/packages — the reportable software catalog with each
/// package's effective match rule.
async fn list_packages(State(state): State<Arc<AppState>>) -> Json<Vec<PackageInfo>> {
    let packages = state
        .catalog
        .ids()
        .filter_map(|id| {
            state.catalog.filter_for(id).map(|filter| PackageInfo {
                id: id.to_string(),
                filter,
            })
        })
        .collect();
    Json(packages)
}

async fn readiness_check(State(state): State<Arc<AppState>>) -> Result<&'static str, StatusCode> {
    state.db.ping().await.map_err(|e| {
        tracing::warn!("readiness check failed: {}", e);
        StatusCode::SERVICE_UNAVAILABLE
    })?;
    Ok("ok")
}

/// Middleware: the SQL terminal is a privileged administrative console.
/// Validates `X-Admin-Key` (or `Authorization: Bearer`) against the
/// configured admin key; 503 when the deployment has no key at all.
async fn admin_auth(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let provided_key = req
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            req.headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(|t| t.trim())
        });

    let expected = state.config.admin_key.as_deref().ok_or_else(|| {
        tracing::error!("SQL terminal requested but PBSACCT_ADMIN_KEY is not set");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    match provided_key {
        Some(k) if k == expected => Ok(next.run(req).await),
        Some(k) => {
            // Never log the expected key or the full provided key.
            let masked = if k.len() > 8 {
                format!("{}…{}", &k[..4], &k[k.len() - 4..])
            } else {
                "****".to_string()
            };
            tracing::warn!("SQL terminal: invalid admin key (provided: '{}')", masked);
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("SQL terminal: missing X-Admin-Key header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_params_decodes_form_encoding() {
        let params = parse_params(b"system=glenn&start_date=2020-01-01&gaussian=on");
        assert_eq!(params.get("system").map(String::as_str), Some("glenn"));
        assert_eq!(params.get("gaussian").map(String::as_str), Some("on"));
    }

    #[test]
    fn parse_params_keeps_empty_values() {
        let params = parse_params(b"system=%25&matlab=");
        assert_eq!(params.get("system").map(String::as_str), Some("%"));
        assert!(params.contains_key("matlab"));
        assert_eq!(params.get("matlab").map(String::as_str), Some(""));
    }

    #[test]
    fn parse_params_last_value_wins() {
        let params = parse_params(b"system=a&system=b");
        assert_eq!(params.get("system").map(String::as_str), Some("b"));
    }
}

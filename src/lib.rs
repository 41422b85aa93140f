//! pbsacct-web — web reporting front-end for a job-scheduler accounting database.
//!
//! Serves two pages against the `jobs` accounting table: a weekly
//! software-usage report and an admin-gated SQL terminal.

pub mod api;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod render;
pub mod store;

use store::postgres::PgStore;

/// Shared application state passed to handlers and middleware.
pub struct AppState {
    pub db: PgStore,
    pub catalog: catalog::SiteCatalog,
    pub config: config::Config,
}

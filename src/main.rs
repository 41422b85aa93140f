use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pbsacct_web::catalog::SiteCatalog;
use pbsacct_web::store::postgres::PgStore;
use pbsacct_web::{api, config, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "pbsacct_web=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(cli::Commands::Query { sql }) => run_query(&cfg, &sql).await,
        Some(cli::Commands::Packages) => list_packages(&cfg),
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    let catalog = SiteCatalog::load(cfg.site_file.as_deref())?;
    tracing::info!(
        "Loaded software catalog: {} packages, {} systems",
        catalog.packages.len(),
        catalog.systems.len()
    );

    let state = Arc::new(AppState {
        db,
        catalog,
        config: cfg,
    });

    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("pbsacct-web listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// `pbsacct-web query` — the SQL terminal's command-line twin.
async fn run_query(cfg: &config::Config, sql: &str) -> anyhow::Result<()> {
    let db = PgStore::connect(&cfg.database_url).await?;
    let result = db.run_adhoc(sql).await?;

    if !result.columns.is_empty() {
        println!("{}", result.columns.join("\t"));
    }
    for row in &result.rows {
        println!("{}", row.join("\t"));
    }
    Ok(())
}

fn list_packages(cfg: &config::Config) -> anyhow::Result<()> {
    let catalog = SiteCatalog::load(cfg.site_file.as_deref())?;
    for id in catalog.ids() {
        match catalog.filter_for(id) {
            Some(filter) => println!("{:<16} {}", id, filter),
            None => println!("{}", id),
        }
    }
    Ok(())
}

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Key required to reach the SQL terminal. The terminal stays
    /// unreachable (503) until one is configured.
    pub admin_key: Option<String>,
    /// Optional YAML file describing the site's systems and software
    /// packages. Falls back to the built-in catalog when unset.
    pub site_file: Option<String>,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    let admin_key = std::env::var("PBSACCT_ADMIN_KEY").ok();
    if admin_key.is_none() {
        eprintln!("⚠️  PBSACCT_ADMIN_KEY is not set — the SQL terminal will be unavailable.");
    }

    Ok(Config {
        port: std::env::var("PBSACCT_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        database_url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgres://localhost/pbsacct".into()),
        admin_key,
        site_file: std::env::var("PBSACCT_SITE_FILE").ok(),
    })
}

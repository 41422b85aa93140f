use clap::{Parser, Subcommand};

/// pbsacct-web — web reporting front-end for a job-scheduler accounting
/// database.
#[derive(Parser)]
#[command(name = "pbsacct-web", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to bind (overrides PBSACCT_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run an ad-hoc SQL statement and print the rows tab-separated
    Query {
        /// SQL text to execute verbatim
        sql: String,
    },

    /// List the configured software packages and their match rules
    Packages,
}

use clap::Args;

/// Connection and logging settings, read from flags or the environment.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: String,

    /// Maximum pooled connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Log filter directive, e.g. `school_results_analytics=debug`
    #[arg(long, env = "RUST_LOG", default_value = "school_results_analytics=info")]
    pub log_filter: String,
}

use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub store: StoreBackend,
    pub teams_file: PathBuf,
    pub seed: Option<u64>,
    pub lock_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/league.db".to_string(),
            store: StoreBackend::Sqlite,
            teams_file: PathBuf::from("data/teams.txt"),
            seed: None,
            lock_timeout: Duration::from_millis(5000),
        }
    }
}

impl Config {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(store) = lookup("LEAGUE_STORE") {
            config.store = match store.to_lowercase().as_str() {
                "sqlite" => StoreBackend::Sqlite,
                "memory" => StoreBackend::Memory,
                other => return Err(anyhow!("LEAGUE_STORE must be 'sqlite' or 'memory', got '{}'", other)),
            };
        }

        if let Some(path) = lookup("LEAGUE_TEAMS_FILE") {
            config.teams_file = PathBuf::from(path);
        }

        if let Some(seed) = lookup("LEAGUE_SEED") {
            let seed = seed
                .trim()
                .parse::<u64>()
                .with_context(|| format!("LEAGUE_SEED is not a valid u64: '{}'", seed))?;
            config.seed = Some(seed);
        }

        if let Some(ms) = lookup("LEAGUE_LOCK_TIMEOUT_MS") {
            let ms = ms
                .trim()
                .parse::<u64>()
                .with_context(|| format!("LEAGUE_LOCK_TIMEOUT_MS is not a valid number: '{}'", ms))?;
            config.lock_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

pub mod memory;
pub mod seed;
pub mod sqlite;

pub use memory::MemoryStore;
pub use seed::{load_roster, seed_teams};
pub use sqlite::SqliteStore;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::models::{Schedule, StatField, Team, TeamStat};

/// Everything a season needs, read or written as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonSnapshot {
    pub teams: Vec<Team>,
    pub schedule: Schedule,
    pub current_week: usize,
    pub points: HashMap<u32, u32>,
    pub stats: HashMap<u32, TeamStat>,
}

/// Persistence contract for a single league season.
///
/// Missing values read back as their defaults: week 1, zero points and
/// all-zero stats.
#[async_trait]
pub trait LeagueStore: Send + Sync {
    async fn get_teams(&self) -> Result<Vec<Team>>;
    async fn set_teams(&self, teams: &[Team]) -> Result<()>;

    async fn get_schedule(&self) -> Result<Schedule>;
    async fn set_schedule(&self, schedule: &Schedule) -> Result<()>;

    async fn get_current_week(&self) -> Result<usize>;
    async fn set_current_week(&self, week: usize) -> Result<()>;

    async fn get_team_points(&self, team_id: u32) -> Result<u32>;
    async fn increment_team_points(&self, team_id: u32, delta: u32) -> Result<()>;
    async fn reset_all_points(&self, team_ids: &[u32]) -> Result<()>;

    async fn get_team_stat(&self, team_id: u32) -> Result<TeamStat>;
    async fn increment_team_stat(&self, team_id: u32, field: StatField, delta: u32) -> Result<()>;
    async fn clear_team_stat(&self, team_id: u32) -> Result<()>;

    /// Drop every stored value.
    async fn clear_all(&self) -> Result<()>;

    /// Read the whole season. The default composes the single-value reads
    /// and is only consistent when nothing writes concurrently; backends
    /// with a transaction or a lock override it.
    async fn load_season(&self) -> Result<SeasonSnapshot> {
        let teams = self.get_teams().await?;
        let schedule = self.get_schedule().await?;
        let current_week = match self.get_current_week().await {
            Ok(week) => week,
            Err(e) => {
                tracing::warn!("Failed to read current week, defaulting to 1: {:#}", e);
                1
            }
        };

        let mut points = HashMap::with_capacity(teams.len());
        let mut stats = HashMap::with_capacity(teams.len());
        for team in &teams {
            points.insert(team.id, self.get_team_points(team.id).await?);
            stats.insert(team.id, self.get_team_stat(team.id).await?);
        }

        Ok(SeasonSnapshot {
            teams,
            schedule,
            current_week,
            points,
            stats,
        })
    }

    /// Atomically replace schedule, current week, points and stats with the
    /// snapshot. Either all of it is written or none of it. The roster in
    /// `snapshot.teams` is left as stored; it only selects whose points and
    /// stats are written.
    async fn commit_season(&self, snapshot: &SeasonSnapshot) -> Result<()>;
}

/// Open the store selected by the configuration.
pub async fn open_store(config: &Config) -> Result<Arc<dyn LeagueStore>> {
    match config.store {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory league store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            let store = SqliteStore::connect(&config.database_url).await?;
            store.init_schema().await?;
            tracing::info!("Using sqlite league store at {}", config.database_url);
            Ok(Arc::new(store))
        }
    }
}

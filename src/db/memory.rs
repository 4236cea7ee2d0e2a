use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::{LeagueStore, SeasonSnapshot};
use crate::models::{Schedule, StatField, Team, TeamStat};

#[derive(Debug, Default)]
struct Inner {
    teams: Vec<Team>,
    schedule: Schedule,
    current_week: Option<usize>,
    points: HashMap<u32, u32>,
    stats: HashMap<u32, TeamStat>,
}

/// Process-local store, used for tests and `LEAGUE_STORE=memory`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeagueStore for MemoryStore {
    async fn get_teams(&self) -> Result<Vec<Team>> {
        Ok(self.inner.read().await.teams.clone())
    }

    async fn set_teams(&self, teams: &[Team]) -> Result<()> {
        self.inner.write().await.teams = teams.to_vec();
        Ok(())
    }

    async fn get_schedule(&self) -> Result<Schedule> {
        Ok(self.inner.read().await.schedule.clone())
    }

    async fn set_schedule(&self, schedule: &Schedule) -> Result<()> {
        self.inner.write().await.schedule = schedule.clone();
        Ok(())
    }

    async fn get_current_week(&self) -> Result<usize> {
        Ok(self.inner.read().await.current_week.unwrap_or(1))
    }

    async fn set_current_week(&self, week: usize) -> Result<()> {
        self.inner.write().await.current_week = Some(week);
        Ok(())
    }

    async fn get_team_points(&self, team_id: u32) -> Result<u32> {
        Ok(self.inner.read().await.points.get(&team_id).copied().unwrap_or(0))
    }

    async fn increment_team_points(&self, team_id: u32, delta: u32) -> Result<()> {
        *self.inner.write().await.points.entry(team_id).or_insert(0) += delta;
        Ok(())
    }

    async fn reset_all_points(&self, team_ids: &[u32]) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.points.clear();
        for id in team_ids {
            inner.points.insert(*id, 0);
        }
        Ok(())
    }

    async fn get_team_stat(&self, team_id: u32) -> Result<TeamStat> {
        Ok(self.inner.read().await.stats.get(&team_id).copied().unwrap_or_default())
    }

    async fn increment_team_stat(&self, team_id: u32, field: StatField, delta: u32) -> Result<()> {
        self.inner.write().await.stats.entry(team_id).or_default().add(field, delta);
        Ok(())
    }

    async fn clear_team_stat(&self, team_id: u32) -> Result<()> {
        self.inner.write().await.stats.remove(&team_id);
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        *self.inner.write().await = Inner::default();
        Ok(())
    }

    async fn load_season(&self) -> Result<SeasonSnapshot> {
        let inner = self.inner.read().await;
        let ids = inner.teams.iter().map(|t| t.id);
        Ok(SeasonSnapshot {
            teams: inner.teams.clone(),
            schedule: inner.schedule.clone(),
            current_week: inner.current_week.unwrap_or(1),
            points: ids.clone().map(|id| (id, inner.points.get(&id).copied().unwrap_or(0))).collect(),
            stats: ids.map(|id| (id, inner.stats.get(&id).copied().unwrap_or_default())).collect(),
        })
    }

    async fn commit_season(&self, snapshot: &SeasonSnapshot) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.schedule = snapshot.schedule.clone();
        inner.current_week = Some(snapshot.current_week);
        inner.points.clear();
        inner.stats.clear();
        for team in &snapshot.teams {
            inner.points.insert(team.id, snapshot.points.get(&team.id).copied().unwrap_or(0));
            if let Some(stat) = snapshot.stats.get(&team.id) {
                inner.stats.insert(team.id, *stat);
            }
        }
        Ok(())
    }
}

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

use crate::config::Config;
use crate::db::{seed_teams, LeagueStore};
use crate::error::{LeagueError, LeagueResult};
use crate::models::{FixtureWeek, LeagueState, Team};
use crate::services::Season;

/// Season controller. Every mutating call runs under a single writer lock:
/// load the season, apply one transition, write it back.
pub struct LeagueService {
    store: Arc<dyn LeagueStore>,
    // Guards both the RNG and the right to write the season.
    writer: Mutex<ChaCha8Rng>,
    lock_timeout: Duration,
}

impl LeagueService {
    pub fn new(store: Arc<dyn LeagueStore>, rng: ChaCha8Rng, lock_timeout: Duration) -> Self {
        Self {
            store,
            writer: Mutex::new(rng),
            lock_timeout,
        }
    }

    pub fn from_config(store: Arc<dyn LeagueStore>, config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::new(store, rng, config.lock_timeout)
    }

    async fn lock(&self) -> LeagueResult<MutexGuard<'_, ChaCha8Rng>> {
        tokio::time::timeout(self.lock_timeout, self.writer.lock())
            .await
            .map_err(|_| {
                tracing::error!("Timed out after {:?} waiting for the season lock", self.lock_timeout);
                LeagueError::StoreUnavailable("timed out waiting for the season lock".to_string())
            })
    }

    async fn load(&self) -> LeagueResult<Season> {
        let season = Season::load(self.store.as_ref()).await.map_err(|e| {
            tracing::error!("Failed to load league state: {:#}", e);
            LeagueError::StoreUnavailable(e.to_string())
        })?;

        season.validate().map_err(|e| {
            tracing::error!("League state is inconsistent: {:#}", e);
            LeagueError::Simulation(e)
        })?;

        Ok(season)
    }

    async fn save(&self, season: &Season) -> LeagueResult<()> {
        season.save(self.store.as_ref()).await.map_err(|e| {
            tracing::error!("Failed to save league state: {:#}", e);
            LeagueError::StoreUnavailable(e.to_string())
        })
    }

    pub async fn state(&self) -> LeagueResult<LeagueState> {
        Ok(self.load().await?.state())
    }

    pub async fn fixtures(&self) -> LeagueResult<Vec<FixtureWeek>> {
        Ok(self.load().await?.fixtures())
    }

    pub async fn teams(&self) -> LeagueResult<Vec<Team>> {
        self.store.get_teams().await.map_err(|e| {
            tracing::error!("Failed to get teams: {:#}", e);
            LeagueError::StoreUnavailable(e.to_string())
        })
    }

    /// Replace the roster, discarding any existing season.
    pub async fn seed(&self, teams: &[Team]) -> LeagueResult<()> {
        let _guard = self.lock().await?;
        seed_teams(self.store.as_ref(), teams).await
    }

    pub async fn generate_fixtures(&self) -> LeagueResult<LeagueState> {
        let _guard = self.lock().await?;
        let mut season = self.load().await?;

        if let Err(e) = season.generate_fixtures() {
            tracing::error!("Failed to build fixtures: {}", e);
            return Err(e);
        }
        self.save(&season).await?;

        tracing::info!(total_weeks = season.total_weeks(), "Fixtures generated successfully");
        Ok(season.state())
    }

    pub async fn play_next_week(&self) -> LeagueResult<LeagueState> {
        let mut rng = self.lock().await?;
        let mut season = self.load().await?;

        if season.is_complete() {
            tracing::info!(
                current_week = season.current_week,
                total_weeks = season.total_weeks(),
                "Season already completed"
            );
            return Ok(season.state());
        }

        let week = season.current_week;
        season.play_week(&mut *rng);
        self.save(&season).await?;

        tracing::info!(week, "Week played successfully");
        Ok(season.state())
    }

    pub async fn play_all_remaining(&self) -> LeagueResult<LeagueState> {
        let mut rng = self.lock().await?;
        let mut season = self.load().await?;

        if season.is_complete() {
            tracing::info!("Season already completed for play all");
            return Ok(season.state());
        }

        let weeks_played = season.play_all(&mut *rng);
        self.save(&season).await?;

        tracing::info!(weeks_played, "All remaining weeks played");
        Ok(season.state())
    }

    pub async fn edit_match(
        &self,
        week: usize,
        index: usize,
        home_score: u32,
        away_score: u32,
    ) -> LeagueResult<LeagueState> {
        let _guard = self.lock().await?;
        let mut season = self.load().await?;

        let (old_home, old_away) = match season.edit_match(week, index, home_score, away_score) {
            Ok(previous) => previous,
            Err(e) => {
                tracing::error!(week, match_index = index, "Failed to edit match: {}", e);
                return Err(e);
            }
        };
        self.save(&season).await?;

        tracing::info!(
            week,
            match_index = index,
            old_score = %format!("{}-{}", old_home, old_away),
            new_score = %format!("{}-{}", home_score, away_score),
            "Match edited successfully"
        );
        Ok(season.state())
    }

    pub async fn reset(&self) -> LeagueResult<LeagueState> {
        let _guard = self.lock().await?;
        let mut season = self.load().await?;

        season.reset();
        self.save(&season).await?;

        tracing::info!("League reset successfully");
        Ok(season.state())
    }
}

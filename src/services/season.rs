use anyhow::{anyhow, Result};
use rand::Rng;
use std::collections::{BTreeMap, HashSet};

use crate::db::{LeagueStore, SeasonSnapshot};
use crate::error::{LeagueError, LeagueResult};
use crate::models::{
    FixtureWeek, LeagueState, MatchStatus, MatchView, Schedule, Standing, Team, WeeklyResults,
};
use crate::services::{build_schedule, simulate_match, ChampionshipPredictor, StandingsTable};

/// The single active season: roster, fixtures, progress and table.
///
/// Transitions are pure; [`Season::load`] and [`Season::save`] move the whole
/// aggregate in and out of a [`LeagueStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    pub teams: Vec<Team>,
    pub schedule: Schedule,
    pub current_week: usize,
    pub table: StandingsTable,
}

impl Season {
    pub async fn load(store: &dyn LeagueStore) -> Result<Self> {
        let snapshot = store.load_season().await?;
        Ok(Self {
            teams: snapshot.teams,
            schedule: snapshot.schedule,
            current_week: snapshot.current_week.max(1),
            table: StandingsTable::from_parts(snapshot.points, snapshot.stats),
        })
    }

    /// Write schedule, week and table back as one commit.
    pub async fn save(&self, store: &dyn LeagueStore) -> Result<()> {
        store.commit_season(&self.snapshot()).await
    }

    fn snapshot(&self) -> SeasonSnapshot {
        SeasonSnapshot {
            teams: self.teams.clone(),
            schedule: self.schedule.clone(),
            current_week: self.current_week,
            points: self.teams.iter().map(|t| (t.id, self.table.points(t.id))).collect(),
            stats: self.teams.iter().map(|t| (t.id, self.table.stat(t.id))).collect(),
        }
    }

    /// Every fixture must reference a roster team.
    pub fn validate(&self) -> Result<()> {
        let ids: HashSet<u32> = self.teams.iter().map(|t| t.id).collect();
        for (week, m) in self.matches() {
            for id in [m.home.id, m.away.id] {
                if !ids.contains(&id) {
                    return Err(anyhow!("week {} fixture references unknown team {}", week, id));
                }
            }
        }
        Ok(())
    }

    pub fn total_weeks(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_complete(&self) -> bool {
        self.current_week > self.total_weeks()
    }

    pub fn remaining_weeks(&self) -> usize {
        (self.total_weeks() + 1).saturating_sub(self.current_week)
    }

    fn matches(&self) -> impl Iterator<Item = (usize, &crate::models::Match)> {
        self.schedule
            .iter()
            .enumerate()
            .flat_map(|(i, week)| week.iter().map(move |m| (i + 1, m)))
    }

    /// Fresh fixtures, week 1, empty table.
    pub fn generate_fixtures(&mut self) -> LeagueResult<()> {
        self.schedule = build_schedule(&self.teams)?;
        self.current_week = 1;
        self.table = StandingsTable::new();
        Ok(())
    }

    /// Simulate every still-scheduled match of the current week and advance.
    /// Returns false when the season was already complete.
    pub fn play_week<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.is_complete() {
            return false;
        }

        let week_index = self.current_week - 1;
        for m in self.schedule[week_index].iter_mut() {
            if m.is_completed() {
                continue;
            }
            let (home_goals, away_goals) = simulate_match(rng, &m.home, &m.away);
            m.complete(home_goals, away_goals);
            self.table.record_result(m.home.id, m.away.id, home_goals, away_goals);
        }

        self.current_week = (self.current_week + 1).min(self.total_weeks() + 1);
        true
    }

    /// Play until the season is complete, returning how many weeks were played.
    pub fn play_all<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut weeks_played = 0;
        while self.play_week(rng) {
            weeks_played += 1;
        }
        weeks_played
    }

    /// Overwrite a completed result and rebuild the table from every match.
    /// Returns the previous score.
    pub fn edit_match(
        &mut self,
        week: usize,
        index: usize,
        home_score: u32,
        away_score: u32,
    ) -> LeagueResult<(u32, u32)> {
        let m = week
            .checked_sub(1)
            .and_then(|w| self.schedule.get_mut(w))
            .and_then(|matches| matches.get_mut(index))
            .ok_or(LeagueError::MatchNotFound { week, index })?;

        let previous = m.score().ok_or(LeagueError::MatchNotEditable { week, index })?;
        m.complete(home_score, away_score);

        self.table = StandingsTable::from_schedule(&self.schedule);
        Ok(previous)
    }

    /// Clear all results but keep the pairings.
    pub fn reset(&mut self) {
        for m in self.schedule.iter_mut().flatten() {
            m.clear_result();
        }
        self.current_week = 1;
        self.table = StandingsTable::new();
    }

    pub fn standings(&self) -> Vec<Standing> {
        let mut ranked = self.table.ranked(&self.teams);
        let predictions = ChampionshipPredictor::new(&self.teams, &ranked, &self.schedule, self.current_week).predict();
        for row in ranked.iter_mut() {
            row.championship_probability = predictions.get(&row.team_id).copied().unwrap_or(0.0);
        }
        ranked
    }

    fn week_views(&self, week: usize, status: MatchStatus) -> Vec<MatchView> {
        week.checked_sub(1)
            .and_then(|w| self.schedule.get(w))
            .map(|matches| {
                matches
                    .iter()
                    .enumerate()
                    .filter(|(_, m)| m.status == status)
                    .map(|(index, m)| MatchView::new(week, index, m))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn fixtures(&self) -> Vec<FixtureWeek> {
        self.schedule
            .iter()
            .enumerate()
            .map(|(i, week)| FixtureWeek {
                week: i + 1,
                matches: week.iter().enumerate().map(|(index, m)| MatchView::new(i + 1, index, m)).collect(),
                match_count: week.len(),
            })
            .collect()
    }

    pub fn state(&self) -> LeagueState {
        let total_weeks = self.total_weeks();
        let season_complete = self.is_complete();
        let standings = self.standings();
        let predictions: BTreeMap<u32, f64> = standings
            .iter()
            .map(|s| (s.team_id, s.championship_probability))
            .collect();

        let weekly_results = if season_complete {
            (1..=total_weeks)
                .map(|week| WeeklyResults {
                    week,
                    matches: self.week_views(week, MatchStatus::Completed),
                })
                .filter(|w| !w.matches.is_empty())
                .collect()
        } else {
            Vec::new()
        };

        LeagueState {
            current_week: if season_complete { total_weeks } else { self.current_week },
            total_weeks,
            remaining_weeks: self.remaining_weeks(),
            season_complete,
            standings,
            upcoming_matches: self.week_views(self.current_week, MatchStatus::Scheduled),
            recent_results: self.week_views(self.current_week.saturating_sub(1), MatchStatus::Completed),
            predictions,
            weekly_results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn season() -> Season {
        let mut season = Season {
            teams: vec![
                Team::new(1, "A", 90),
                Team::new(2, "B", 80),
                Team::new(3, "C", 70),
                Team::new(4, "D", 60),
            ],
            schedule: Vec::new(),
            current_week: 1,
            table: StandingsTable::new(),
        };
        season.generate_fixtures().unwrap();
        season
    }

    #[test]
    fn test_play_all_and_reset() {
        let mut season = season();
        let pairings: Vec<Vec<(u32, u32)>> = season
            .schedule
            .iter()
            .map(|w| w.iter().map(|m| (m.home.id, m.away.id)).collect())
            .collect();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(season.play_all(&mut rng), 6);
        assert!(season.is_complete());
        assert_eq!(season.current_week, 7);
        for team in &season.teams {
            assert_eq!(season.table.stat(team.id).played, 6);
        }
        assert!(!season.play_week(&mut rng));
        assert_eq!(season.current_week, 7);

        season.reset();
        assert_eq!(season.current_week, 1);
        for team in &season.teams {
            assert_eq!(season.table.stat(team.id).played, 0);
            assert_eq!(season.table.points(team.id), 0);
        }
        let after: Vec<Vec<(u32, u32)>> = season
            .schedule
            .iter()
            .map(|w| w.iter().map(|m| (m.home.id, m.away.id)).collect())
            .collect();
        assert_eq!(pairings, after);
        assert!(season.schedule.iter().flatten().all(|m| m.status == MatchStatus::Scheduled));
    }

    #[test]
    fn test_partially_played_week_is_not_double_counted() {
        let mut season = season();
        season.schedule[0][0].complete(3, 0);
        season.table.record_match(&season.schedule[0][0].clone());

        let mut rng = ChaCha8Rng::seed_from_u64(9);
        season.play_week(&mut rng);

        assert_eq!(season.schedule[0][0].score(), Some((3, 0)));
        assert_eq!(season.table, StandingsTable::from_schedule(&season.schedule));
        for team in &season.teams {
            assert_eq!(season.table.stat(team.id).played, 1);
        }
    }

    #[test]
    fn test_edit_match() {
        let mut season = season();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        season.play_week(&mut rng);
        season.play_week(&mut rng);

        assert!(matches!(
            season.edit_match(0, 0, 1, 1),
            Err(LeagueError::MatchNotFound { week: 0, index: 0 })
        ));
        assert!(matches!(
            season.edit_match(1, 5, 1, 1),
            Err(LeagueError::MatchNotFound { .. })
        ));
        assert!(matches!(
            season.edit_match(3, 0, 1, 1),
            Err(LeagueError::MatchNotEditable { week: 3, index: 0 })
        ));

        let before = season.schedule[0][1].score().unwrap();
        assert_eq!(season.edit_match(1, 1, 7, 0).unwrap(), before);
        assert_eq!(season.schedule[0][1].score(), Some((7, 0)));

        // Same table as if 7-0 had been the simulated result.
        let mut expected = StandingsTable::new();
        for m in season.schedule.iter().flatten() {
            expected.record_match(m);
        }
        assert_eq!(season.table, expected);
        assert_eq!(season.current_week, 3);
    }

    #[test]
    fn test_state_views() {
        let mut season = season();
        let state = season.state();
        assert_eq!(state.current_week, 1);
        assert_eq!(state.total_weeks, 6);
        assert_eq!(state.remaining_weeks, 6);
        assert_eq!(state.upcoming_matches.len(), 2);
        assert!(state.recent_results.is_empty());
        assert!(state.weekly_results.is_empty());

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        season.play_week(&mut rng);
        let state = season.state();
        assert_eq!(state.recent_results.len(), 2);
        assert!(state.recent_results.iter().all(|m| m.result.is_some()));

        season.play_all(&mut rng);
        let state = season.state();
        assert!(state.season_complete);
        assert_eq!(state.current_week, 6);
        assert_eq!(state.remaining_weeks, 0);
        assert_eq!(state.weekly_results.len(), 6);
        assert!(state.upcoming_matches.is_empty());
        assert_eq!(state.predictions[&state.standings[0].team_id], 100.0);
        assert_eq!(state.standings[0].championship_probability, 100.0);
    }

    #[test]
    fn test_validate_rejects_foreign_team() {
        let mut season = season();
        assert!(season.validate().is_ok());
        season.teams.pop();
        assert!(season.validate().is_err());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = MemoryStore::new();
        let mut season = season();
        store.set_teams(&season.teams).await.unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        season.play_week(&mut rng);
        season.play_week(&mut rng);
        season.save(&store).await.unwrap();

        let loaded = Season::load(&store).await.unwrap();
        assert_eq!(loaded.schedule, season.schedule);
        assert_eq!(loaded.current_week, 3);
        assert_eq!(loaded.table.ranked(&loaded.teams), season.table.ranked(&season.teams));
    }
}

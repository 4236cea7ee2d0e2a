use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{Match, MatchOutcome, Schedule, StatField, Standing, Team, TeamStat};

/// Running league table. Points live apart from the per-team counters so
/// they can be persisted as a separate increment-only tally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandingsTable {
    points: HashMap<u32, u32>,
    stats: HashMap<u32, TeamStat>,
}

impl StandingsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(points: HashMap<u32, u32>, stats: HashMap<u32, TeamStat>) -> Self {
        Self { points, stats }
    }

    /// Rebuild the table from scratch by folding every completed match.
    pub fn from_schedule(schedule: &Schedule) -> Self {
        let mut table = Self::new();
        for m in schedule.iter().flatten() {
            table.record_match(m);
        }
        table
    }

    /// Fold a match into the table; matches without a final score are ignored.
    pub fn record_match(&mut self, m: &Match) {
        if let Some((home_score, away_score)) = m.score() {
            self.record_result(m.home.id, m.away.id, home_score, away_score);
        }
    }

    pub fn record_result(&mut self, home_id: u32, away_id: u32, home_score: u32, away_score: u32) {
        self.record_side(home_id, home_score, away_score);
        self.record_side(away_id, away_score, home_score);
    }

    fn record_side(&mut self, team_id: u32, scored: u32, conceded: u32) {
        let outcome = MatchOutcome::from_scores(scored, conceded);

        let stat = self.stats.entry(team_id).or_default();
        stat.add(StatField::Played, 1);
        stat.add(StatField::from(outcome), 1);
        stat.add(StatField::Gf, scored);
        stat.add(StatField::Ga, conceded);

        *self.points.entry(team_id).or_insert(0) += outcome.points();
    }

    pub fn points(&self, team_id: u32) -> u32 {
        self.points.get(&team_id).copied().unwrap_or(0)
    }

    pub fn stat(&self, team_id: u32) -> TeamStat {
        self.stats.get(&team_id).copied().unwrap_or_default()
    }

    /// Every roster team ranked by points, goal difference, goals for, then name.
    pub fn ranked(&self, teams: &[Team]) -> Vec<Standing> {
        let mut rows: Vec<Standing> = teams
            .iter()
            .map(|team| {
                let stat = self.stat(team.id);
                Standing {
                    position: 0,
                    team_id: team.id,
                    team: team.name.clone(),
                    stat,
                    goal_difference: stat.goal_difference(),
                    points: self.points(team.id),
                    championship_probability: 0.0,
                }
            })
            .collect();

        rows.sort_by(compare_standings);
        for (index, row) in rows.iter_mut().enumerate() {
            row.position = index + 1;
        }
        rows
    }
}

fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.goal_difference.cmp(&a.goal_difference))
        .then_with(|| b.stat.gf.cmp(&a.stat.gf))
        .then_with(|| a.team.cmp(&b.team))
        .then_with(|| a.team_id.cmp(&b.team_id))
}

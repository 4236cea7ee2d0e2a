use std::collections::BTreeMap;

use crate::models::{MatchStatus, Schedule, Standing, Team, DEFAULT_POWER};
use crate::services::match_simulator::HOME_ADVANTAGE;
use crate::utils::{normalize_percentages, round1};

/// Remaining weeks at or below which elimination analysis replaces the
/// heuristic score.
pub const LATE_SEASON_WEEKS: usize = 3;

// Early season weights
const POWER_WEIGHT: f64 = 0.3;
const FORM_WEIGHT: f64 = 0.5;
const GOAL_WEIGHT: f64 = 0.2;
const FORM_MULTIPLIER: f64 = 33.33;
const COLD_START_FORM: f64 = 0.33;
const GOAL_OFFSET: f64 = 50.0;
const MIN_SCORE: f64 = 10.0;

// Late season
const BASE_PROBABILITY: f64 = 25.0;
const DRAW_PROBABILITY: f64 = 0.25;
const MIN_PROBABILITY: f64 = 5.0;
const MAX_PROBABILITY: f64 = 95.0;

/// Forecasts each team's chance of finishing top, in percent.
#[derive(Debug, Clone, Copy)]
pub struct ChampionshipPredictor<'a> {
    teams: &'a [Team],
    standings: &'a [Standing],
    schedule: &'a Schedule,
    current_week: usize,
}

impl<'a> ChampionshipPredictor<'a> {
    /// `standings` must already be ranked.
    pub fn new(teams: &'a [Team], standings: &'a [Standing], schedule: &'a Schedule, current_week: usize) -> Self {
        Self {
            teams,
            standings,
            schedule,
            current_week,
        }
    }

    pub fn predict(&self) -> BTreeMap<u32, f64> {
        let total_weeks = self.schedule.len();

        if self.current_week > total_weeks {
            return self.final_table();
        }

        let remaining_weeks = total_weeks - self.current_week + 1;
        if remaining_weeks <= LATE_SEASON_WEEKS {
            self.late_season(remaining_weeks)
        } else {
            self.early_season()
        }
    }

    fn final_table(&self) -> BTreeMap<u32, f64> {
        let leader = self.standings.first().map(|s| s.team_id);
        self.teams
            .iter()
            .map(|team| {
                let share = if Some(team.id) == leader { 100.0 } else { 0.0 };
                (team.id, share)
            })
            .collect()
    }

    fn early_season(&self) -> BTreeMap<u32, f64> {
        let scores: BTreeMap<u32, f64> = self
            .teams
            .iter()
            .map(|team| (team.id, self.heuristic_score(team)))
            .collect();

        let total: f64 = scores.values().sum();
        scores
            .into_iter()
            .map(|(id, score)| {
                let share = if total > 0.0 { round1(score / total * 100.0) } else { 25.0 };
                (id, share)
            })
            .collect()
    }

    fn heuristic_score(&self, team: &Team) -> f64 {
        let power = team.power as f64;
        let (points, played, goal_difference) = match self.standing(team.id) {
            Some(s) => (s.points as f64, s.stat.played, s.goal_difference as f64),
            None => (0.0, 0, 0.0),
        };

        let form_score = if played > 0 {
            (points / played as f64) * FORM_MULTIPLIER
        } else {
            power * COLD_START_FORM
        };
        let goal_score = goal_difference * 2.0 + GOAL_OFFSET;

        let score = power * POWER_WEIGHT + form_score * FORM_WEIGHT + goal_score * GOAL_WEIGHT;
        score.max(MIN_SCORE)
    }

    fn late_season(&self, remaining_weeks: usize) -> BTreeMap<u32, f64> {
        let swing = 3 * remaining_weeks as u32;

        let raw: BTreeMap<u32, f64> = self
            .teams
            .iter()
            .map(|team| {
                let points = self.points(team.id);
                let share = if self.is_eliminated(team.id, points + swing) {
                    0.0
                } else if self.is_guaranteed(team.id, points, swing) {
                    100.0
                } else {
                    self.remaining_matches_probability(team)
                };
                (team.id, share)
            })
            .collect();

        normalize_percentages(raw)
            .into_iter()
            .map(|(id, share)| (id, round1(share)))
            .collect()
    }

    /// Someone already has more points than this team can still reach.
    fn is_eliminated(&self, team_id: u32, max_possible: u32) -> bool {
        self.standings
            .iter()
            .any(|other| other.team_id != team_id && max_possible < other.points)
    }

    /// Nobody else can reach this team's current total.
    fn is_guaranteed(&self, team_id: u32, points: u32, swing: u32) -> bool {
        self.standings
            .iter()
            .filter(|other| other.team_id != team_id)
            .all(|other| other.points + swing < points)
    }

    fn remaining_matches_probability(&self, team: &Team) -> f64 {
        let mut expected_points = 0.0;
        let mut remaining_matches = 0usize;

        for week in self.schedule.iter().skip(self.current_week.saturating_sub(1)) {
            for m in week {
                if m.status != MatchStatus::Scheduled || !m.involves(team.id) {
                    continue;
                }
                remaining_matches += 1;

                let is_home = m.home.id == team.id;
                let opponent_id = if is_home { m.away.id } else { m.home.id };
                let my_power = team.power as i32 + if is_home { HOME_ADVANTAGE } else { 0 };
                let power_diff = my_power - self.power(opponent_id) as i32;

                let win = (0.5 + power_diff as f64 * 0.01).clamp(0.1, 0.9);
                let draw = DRAW_PROBABILITY;
                let lose = 1.0 - win - draw;
                expected_points += win * 3.0 + draw * 1.0 + lose * 0.0;
            }
        }

        let position = self.standing(team.id).map(|s| s.position).unwrap_or(1) as f64;
        let position_bonus = (5.0 - position) * 10.0;
        let power_bonus = (team.power as f64 - DEFAULT_POWER as f64) * 0.5;
        let expected_bonus = if remaining_matches > 0 {
            (expected_points / remaining_matches as f64 - 1.5) * 20.0
        } else {
            0.0
        };

        (BASE_PROBABILITY + position_bonus + power_bonus + expected_bonus).clamp(MIN_PROBABILITY, MAX_PROBABILITY)
    }

    fn standing(&self, team_id: u32) -> Option<&Standing> {
        self.standings.iter().find(|s| s.team_id == team_id)
    }

    fn points(&self, team_id: u32) -> u32 {
        self.standing(team_id).map(|s| s.points).unwrap_or(0)
    }

    fn power(&self, team_id: u32) -> u8 {
        self.teams
            .iter()
            .find(|t| t.id == team_id)
            .map(|t| t.power)
            .unwrap_or(DEFAULT_POWER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Match;
    use crate::services::fixture_builder::build_schedule;
    use crate::services::standings::StandingsTable;
    use proptest::prelude::*;

    fn teams() -> Vec<Team> {
        vec![
            Team::new(1, "A", 90),
            Team::new(2, "B", 80),
            Team::new(3, "C", 70),
            Team::new(4, "D", 60),
        ]
    }

    fn assert_distribution(predictions: &BTreeMap<u32, f64>) {
        let total: f64 = predictions.values().sum();
        assert!((total - 100.0).abs() <= 0.2 + 1e-9, "predictions sum to {}", total);
        assert!(predictions.values().all(|p| (0.0..=100.0).contains(p)));
    }

    /// Play the first `weeks` weeks with a fixed result generator.
    fn play(schedule: &mut Schedule, weeks: usize, result: impl Fn(u32, u32) -> (u32, u32)) -> StandingsTable {
        for week in schedule.iter_mut().take(weeks) {
            for m in week.iter_mut() {
                let (h, a) = result(m.home.id, m.away.id);
                m.complete(h, a);
            }
        }
        StandingsTable::from_schedule(schedule)
    }

    #[test]
    fn test_cold_start_favours_power() {
        let t = teams();
        let schedule = build_schedule(&t).unwrap();
        let standings = StandingsTable::new().ranked(&t);
        let predictions = ChampionshipPredictor::new(&t, &standings, &schedule, 1).predict();

        assert_distribution(&predictions);
        assert!(predictions[&1] > predictions[&2]);
        assert!(predictions[&2] > predictions[&3]);
        assert!(predictions[&3] > predictions[&4]);
    }

    #[test]
    fn test_early_score_floor() {
        // A side losing heavily still keeps a floored share.
        let t = vec![Team::new(1, "Strong", 100), Team::new(2, "Weak", 1)];
        let mut schedule = vec![vec![], vec![], vec![], vec![], vec![]];
        schedule[0] = vec![Match::scheduled(t[0].clone(), t[1].clone())];
        let played = play(&mut schedule, 1, |_, _| (8, 0));
        let standings = played.ranked(&t);

        let predictor = ChampionshipPredictor::new(&t, &standings, &schedule, 2);
        assert_eq!(predictor.heuristic_score(&t[1]), MIN_SCORE);
        let predictions = predictor.predict();
        assert_distribution(&predictions);
        assert!(predictions[&2] > 0.0);
    }

    #[test]
    fn test_season_complete_gives_leader_everything() {
        let t = teams();
        let mut schedule = build_schedule(&t).unwrap();
        let table = play(&mut schedule, 6, |home, away| if home < away { (2, 0) } else { (0, 1) });
        let standings = table.ranked(&t);
        let predictions = ChampionshipPredictor::new(&t, &standings, &schedule, 7).predict();

        assert_eq!(predictions[&standings[0].team_id], 100.0);
        assert_eq!(predictions.values().filter(|p| **p == 0.0).count(), 3);
    }

    #[test]
    fn test_late_season_elimination() {
        let t = teams();
        let mut schedule = build_schedule(&t).unwrap();
        // The lower id always wins: A leads on 12 after four weeks, D has 0.
        let table = play(&mut schedule, 4, |home, away| if home < away { (1, 0) } else { (0, 1) });
        let standings = table.ranked(&t);
        assert_eq!(table.points(1), 12);
        assert_eq!(table.points(4), 0);

        // Two weeks left: D can reach 6 < 12.
        let predictions = ChampionshipPredictor::new(&t, &standings, &schedule, 5).predict();
        assert_distribution(&predictions);
        assert_eq!(predictions[&3], 0.0);
        assert_eq!(predictions[&4], 0.0);
        assert!(predictions[&1] > predictions[&2]);
        assert!(predictions[&2] > 0.0);
    }

    #[test]
    fn test_late_season_guarantee() {
        let t = teams();
        let mut schedule = build_schedule(&t).unwrap();
        // A wins every match, everything else is drawn.
        let table = play(&mut schedule, 5, |home, away| match (home, away) {
            (1, _) => (1, 0),
            (_, 1) => (0, 1),
            _ => (1, 1),
        });
        let standings = table.ranked(&t);
        assert_eq!(table.points(1), 15);
        assert_eq!(table.points(2), 4);

        // One week left: nobody else can get past 7.
        let predictions = ChampionshipPredictor::new(&t, &standings, &schedule, 6).predict();
        assert_eq!(predictions[&1], 100.0);
        assert_eq!(predictions[&2], 0.0);
        assert_eq!(predictions[&3], 0.0);
        assert_eq!(predictions[&4], 0.0);
    }

    #[test]
    fn test_regime_boundary() {
        let t = teams();
        let schedule = build_schedule(&t).unwrap();
        let standings = StandingsTable::new().ranked(&t);

        // Week 4 of 6 leaves exactly three weeks: late season, no one out yet.
        let late = ChampionshipPredictor::new(&t, &standings, &schedule, 4).predict();
        let early = ChampionshipPredictor::new(&t, &standings, &schedule, 3).predict();
        assert_distribution(&late);
        assert_distribution(&early);
        assert_ne!(late, early);
    }

    #[test]
    fn test_unknown_opponent_uses_default_power() {
        let t = teams();
        let schedule = build_schedule(&t).unwrap();
        let standings = StandingsTable::new().ranked(&t);
        let predictor = ChampionshipPredictor::new(&t[..2], &standings, &schedule, 1);
        assert_eq!(predictor.power(3), DEFAULT_POWER);
    }

    proptest! {
        #[test]
        fn prop_predictions_form_a_distribution(
            powers in prop::collection::vec(1u8..=100, 2..=4),
            scores in prop::collection::vec((0u32..=8, 0u32..=8), 12),
            week_pick in 0usize..64,
            partial_week in any::<bool>(),
        ) {
            let t: Vec<Team> = powers
                .iter()
                .enumerate()
                .map(|(i, power)| Team::new(i as u32 + 1, format!("T{}", i + 1), *power))
                .collect();
            let mut schedule = build_schedule(&t).unwrap();
            let total_weeks = schedule.len();
            let current_week = week_pick % (total_weeks + 1) + 1;

            let mut results = scores.iter().cycle();
            for (i, week) in schedule.iter_mut().enumerate() {
                let to_play = if i + 1 < current_week {
                    week.len()
                } else if i + 1 == current_week && partial_week {
                    1
                } else {
                    0
                };
                for m in week.iter_mut().take(to_play) {
                    let (h, a) = results.next().unwrap();
                    m.complete(*h, *a);
                }
            }

            let standings = StandingsTable::from_schedule(&schedule).ranked(&t);
            let predictions = ChampionshipPredictor::new(&t, &standings, &schedule, current_week).predict();

            prop_assert_eq!(predictions.len(), t.len());
            let total: f64 = predictions.values().sum();
            prop_assert!((total - 100.0).abs() <= 0.2 + 1e-9, "predictions sum to {}", total);
            prop_assert!(predictions.values().all(|p| (0.0..=100.0).contains(p)));

            let remaining = (total_weeks + 1).saturating_sub(current_week);
            if remaining > 0 && remaining <= LATE_SEASON_WEEKS {
                let leader_points = standings[0].points;
                for row in &standings {
                    if row.points + 3 * (remaining as u32) < leader_points {
                        prop_assert_eq!(predictions[&row.team_id], 0.0);
                    }
                }
            }
        }
    }
}

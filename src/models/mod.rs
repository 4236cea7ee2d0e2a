use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Power assumed for a team whose rating cannot be looked up.
pub const DEFAULT_POWER: u8 = 75;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub power: u8, // 1..=100
}

impl Team {
    pub fn new(id: u32, name: impl Into<String>, power: u8) -> Self {
        Self {
            id,
            name: name.into(),
            power,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(MatchStatus::Scheduled),
            "completed" => Ok(MatchStatus::Completed),
            other => Err(anyhow::anyhow!("Unknown match status: {}", other)),
        }
    }
}

/// Result of a match from one side's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Win,
    Draw,
    Loss,
}

impl MatchOutcome {
    pub fn from_scores(scored: u32, conceded: u32) -> Self {
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => MatchOutcome::Win,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
            std::cmp::Ordering::Less => MatchOutcome::Loss,
        }
    }

    pub fn points(&self) -> u32 {
        match self {
            MatchOutcome::Win => 3,
            MatchOutcome::Draw => 1,
            MatchOutcome::Loss => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub home: Team,
    pub away: Team,
    pub status: MatchStatus,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl Match {
    pub fn scheduled(home: Team, away: Team) -> Self {
        Self {
            home,
            away,
            status: MatchStatus::Scheduled,
            home_score: None,
            away_score: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Final score, only for completed matches that carry both sides' goals.
    pub fn score(&self) -> Option<(u32, u32)> {
        match (self.status, self.home_score, self.away_score) {
            (MatchStatus::Completed, Some(h), Some(a)) => Some((h, a)),
            _ => None,
        }
    }

    pub fn involves(&self, team_id: u32) -> bool {
        self.home.id == team_id || self.away.id == team_id
    }

    pub fn complete(&mut self, home_score: u32, away_score: u32) {
        self.status = MatchStatus::Completed;
        self.home_score = Some(home_score);
        self.away_score = Some(away_score);
    }

    pub fn clear_result(&mut self) {
        self.status = MatchStatus::Scheduled;
        self.home_score = None;
        self.away_score = None;
    }

    /// "home_win", "away_win" or "draw" once the match is completed.
    pub fn result_label(&self) -> Option<&'static str> {
        self.score().map(|(h, a)| match MatchOutcome::from_scores(h, a) {
            MatchOutcome::Win => "home_win",
            MatchOutcome::Loss => "away_win",
            MatchOutcome::Draw => "draw",
        })
    }
}

pub type Week = Vec<Match>;
pub type Schedule = Vec<Week>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStat {
    pub played: u32,
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
    pub gf: u32,
    pub ga: u32,
}

impl TeamStat {
    pub fn goal_difference(&self) -> i64 {
        self.gf as i64 - self.ga as i64
    }

    pub fn get(&self, field: StatField) -> u32 {
        match field {
            StatField::Played => self.played,
            StatField::Win => self.win,
            StatField::Draw => self.draw,
            StatField::Loss => self.loss,
            StatField::Gf => self.gf,
            StatField::Ga => self.ga,
        }
    }

    pub fn add(&mut self, field: StatField, delta: u32) {
        let slot = match field {
            StatField::Played => &mut self.played,
            StatField::Win => &mut self.win,
            StatField::Draw => &mut self.draw,
            StatField::Loss => &mut self.loss,
            StatField::Gf => &mut self.gf,
            StatField::Ga => &mut self.ga,
        };
        *slot += delta;
    }
}

/// Individual counters of a [`TeamStat`], as addressed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatField {
    Played,
    Win,
    Draw,
    Loss,
    Gf,
    Ga,
}

impl StatField {
    pub const ALL: [StatField; 6] = [
        StatField::Played,
        StatField::Win,
        StatField::Draw,
        StatField::Loss,
        StatField::Gf,
        StatField::Ga,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            StatField::Played => "played",
            StatField::Win => "win",
            StatField::Draw => "draw",
            StatField::Loss => "loss",
            StatField::Gf => "gf",
            StatField::Ga => "ga",
        }
    }
}

impl From<MatchOutcome> for StatField {
    fn from(outcome: MatchOutcome) -> Self {
        match outcome {
            MatchOutcome::Win => StatField::Win,
            MatchOutcome::Draw => StatField::Draw,
            MatchOutcome::Loss => StatField::Loss,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub position: usize,
    pub team_id: u32,
    pub team: String,
    #[serde(flatten)]
    pub stat: TeamStat,
    pub goal_difference: i64,
    pub points: u32,
    pub championship_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub week: usize,
    pub index: usize,
    pub home: String,
    pub away: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub status: MatchStatus,
    pub result: Option<String>,
}

impl MatchView {
    pub fn new(week: usize, index: usize, m: &Match) -> Self {
        Self {
            week,
            index,
            home: m.home.name.clone(),
            away: m.away.name.clone(),
            home_score: m.home_score,
            away_score: m.away_score,
            status: m.status,
            result: m.result_label().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureWeek {
    pub week: usize,
    pub matches: Vec<MatchView>,
    pub match_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyResults {
    pub week: usize,
    pub matches: Vec<MatchView>,
}

/// Snapshot of the whole league returned after every operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueState {
    pub current_week: usize,
    pub total_weeks: usize,
    pub remaining_weeks: usize,
    pub season_complete: bool,
    pub standings: Vec<Standing>,
    pub upcoming_matches: Vec<MatchView>,
    pub recent_results: Vec<MatchView>,
    pub predictions: BTreeMap<u32, f64>,
    pub weekly_results: Vec<WeeklyResults>,
}

// API Response types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

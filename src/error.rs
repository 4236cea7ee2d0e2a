use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("at least 2 teams required to generate fixtures, found {found}")]
    InsufficientTeams { found: usize },

    #[error("match not found: week {week}, index {index}")]
    MatchNotFound { week: usize, index: usize },

    #[error("only completed matches can be edited (week {week}, index {index})")]
    MatchNotEditable { week: usize, index: usize },

    #[error("league store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid roster: {0}")]
    InvalidRoster(String),

    #[error("simulation failed: {0:#}")]
    Simulation(#[from] anyhow::Error),
}

pub type LeagueResult<T> = Result<T, LeagueError>;

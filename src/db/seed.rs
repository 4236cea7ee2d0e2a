use std::path::Path;

use crate::db::LeagueStore;
use crate::error::{LeagueError, LeagueResult};
use crate::models::Team;
use crate::utils::validate_team_name;

/// Parse a roster of `name,power` lines. Ids follow file order starting at 1.
pub fn parse_roster(text: &str) -> LeagueResult<Vec<Team>> {
    let mut teams = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        let [name, power] = parts.as_slice() else {
            return Err(LeagueError::InvalidRoster(format!(
                "invalid team format in line {}: {}",
                line_no + 1,
                line
            )));
        };

        if !validate_team_name(name) {
            return Err(LeagueError::InvalidRoster(format!(
                "invalid team name in line {}: '{}'",
                line_no + 1,
                name
            )));
        }

        let power: i64 = power.parse().map_err(|_| {
            LeagueError::InvalidRoster(format!("invalid team power for {}: {}", name, power))
        })?;
        if !(1..=100).contains(&power) {
            return Err(LeagueError::InvalidRoster(format!(
                "invalid team power for {}: {} (must be 1-100)",
                name, power
            )));
        }

        teams.push(Team::new(teams.len() as u32 + 1, *name, power as u8));
    }

    if teams.len() < 2 {
        return Err(LeagueError::InsufficientTeams { found: teams.len() });
    }

    Ok(teams)
}

pub async fn load_roster(path: &Path) -> LeagueResult<Vec<Team>> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        LeagueError::InvalidRoster(format!("teams file not found: {} ({})", path.display(), e))
    })?;
    parse_roster(&text)
}

/// Wipe the store and load a fresh roster. Fixtures are generated separately.
pub async fn seed_teams(store: &dyn LeagueStore, teams: &[Team]) -> LeagueResult<()> {
    let written: anyhow::Result<()> = async {
        store.clear_all().await?;
        store.set_teams(teams).await
    }
    .await;

    written.map_err(|e| {
        tracing::error!("Failed to seed teams: {:#}", e);
        LeagueError::StoreUnavailable(e.to_string())
    })?;

    tracing::info!("{} teams loaded into the league store", teams.len());
    Ok(())
}

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;

use crate::db::{LeagueStore, SeasonSnapshot};
use crate::models::{Match, MatchStatus, Schedule, StatField, Team, TeamStat};

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
        let file_path = database_url
            .strip_prefix("sqlite:///")
            .or_else(|| database_url.strip_prefix("sqlite://"))
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        let in_memory = file_path.contains(":memory:");
        if !in_memory {
            if let Some(parent) = std::path::Path::new(file_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.ok();
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to ":memory:" is its own database.
        let max_connections = if in_memory { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                power INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fixtures (
                week INTEGER NOT NULL,
                match_index INTEGER NOT NULL,
                home_team_id INTEGER NOT NULL,
                home_team_name TEXT NOT NULL,
                home_team_power INTEGER NOT NULL,
                away_team_id INTEGER NOT NULL,
                away_team_name TEXT NOT NULL,
                away_team_power INTEGER NOT NULL,
                status TEXT NOT NULL DEFAULT 'scheduled',
                home_score INTEGER,
                away_score INTEGER,
                PRIMARY KEY (week, match_index)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS league_meta (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS standings (
                team_id INTEGER PRIMARY KEY,
                points INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS team_stats (
                team_id INTEGER PRIMARY KEY,
                played INTEGER NOT NULL DEFAULT 0,
                win INTEGER NOT NULL DEFAULT 0,
                draw INTEGER NOT NULL DEFAULT 0,
                loss INTEGER NOT NULL DEFAULT 0,
                gf INTEGER NOT NULL DEFAULT 0,
                ga INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        tracing::info!("Database initialized successfully");
        Ok(())
    }
}

fn team_from_row(row: &sqlx::sqlite::SqliteRow, prefix: &str) -> Team {
    Team {
        id: row.get::<i64, _>(format!("{}_id", prefix).as_str()) as u32,
        name: row.get(format!("{}_name", prefix).as_str()),
        power: row.get::<i64, _>(format!("{}_power", prefix).as_str()) as u8,
    }
}

async fn read_teams(conn: &mut SqliteConnection) -> Result<Vec<Team>> {
    let rows = sqlx::query("SELECT id, name, power FROM teams ORDER BY id")
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows
        .iter()
        .map(|row| Team {
            id: row.get::<i64, _>("id") as u32,
            name: row.get("name"),
            power: row.get::<i64, _>("power") as u8,
        })
        .collect())
}

async fn read_schedule(conn: &mut SqliteConnection) -> Result<Schedule> {
    let rows = sqlx::query(
        r#"
        SELECT week, home_team_id, home_team_name, home_team_power,
               away_team_id, away_team_name, away_team_power,
               status, home_score, away_score
        FROM fixtures
        ORDER BY week, match_index
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut schedule: Schedule = Vec::new();
    for row in rows {
        let week = row.get::<i64, _>("week") as usize;
        while schedule.len() < week {
            schedule.push(Vec::new());
        }

        let status = MatchStatus::from_str(&row.get::<String, _>("status"))?;
        schedule[week - 1].push(Match {
            home: team_from_row(&row, "home_team"),
            away: team_from_row(&row, "away_team"),
            status,
            home_score: row.get::<Option<i64>, _>("home_score").map(|s| s as u32),
            away_score: row.get::<Option<i64>, _>("away_score").map(|s| s as u32),
        });
    }

    Ok(schedule)
}

async fn write_schedule(conn: &mut SqliteConnection, schedule: &Schedule) -> Result<()> {
    sqlx::query("DELETE FROM fixtures").execute(&mut *conn).await?;

    for (week_index, week) in schedule.iter().enumerate() {
        for (match_index, m) in week.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO fixtures
                (week, match_index, home_team_id, home_team_name, home_team_power,
                 away_team_id, away_team_name, away_team_power, status, home_score, away_score)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind((week_index + 1) as i64)
            .bind(match_index as i64)
            .bind(m.home.id as i64)
            .bind(&m.home.name)
            .bind(m.home.power as i64)
            .bind(m.away.id as i64)
            .bind(&m.away.name)
            .bind(m.away.power as i64)
            .bind(m.status.as_str())
            .bind(m.home_score.map(|s| s as i64))
            .bind(m.away_score.map(|s| s as i64))
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

fn stat_from_row(row: &sqlx::sqlite::SqliteRow) -> TeamStat {
    let mut stat = TeamStat::default();
    for field in StatField::ALL {
        stat.add(field, row.get::<i64, _>(field.column()) as u32);
    }
    stat
}

#[async_trait]
impl LeagueStore for SqliteStore {
    async fn get_teams(&self) -> Result<Vec<Team>> {
        let mut conn = self.pool.acquire().await?;
        read_teams(&mut *conn).await
    }

    async fn set_teams(&self, teams: &[Team]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM teams").execute(&mut *tx).await?;
        for team in teams {
            sqlx::query("INSERT INTO teams (id, name, power) VALUES (?, ?, ?)")
                .bind(team.id as i64)
                .bind(&team.name)
                .bind(team.power as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_schedule(&self) -> Result<Schedule> {
        let mut conn = self.pool.acquire().await?;
        read_schedule(&mut *conn).await
    }

    async fn set_schedule(&self, schedule: &Schedule) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_schedule(&mut *tx, schedule).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_current_week(&self) -> Result<usize> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM league_meta WHERE key = 'current_week'")
            .fetch_optional(&self.pool)
            .await?;
        Ok(value.map(|w| w as usize).filter(|w| *w >= 1).unwrap_or(1))
    }

    async fn set_current_week(&self, week: usize) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO league_meta (key, value) VALUES ('current_week', ?)")
            .bind(week as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_team_points(&self, team_id: u32) -> Result<u32> {
        let points: Option<i64> = sqlx::query_scalar("SELECT points FROM standings WHERE team_id = ?")
            .bind(team_id as i64)
            .fetch_optional(&self.pool)
            .await?;
        Ok(points.unwrap_or(0) as u32)
    }

    async fn increment_team_points(&self, team_id: u32, delta: u32) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO standings (team_id, points) VALUES (?, ?)
            ON CONFLICT(team_id) DO UPDATE SET points = points + excluded.points
            "#,
        )
        .bind(team_id as i64)
        .bind(delta as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_all_points(&self, team_ids: &[u32]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM standings").execute(&mut *tx).await?;
        for id in team_ids {
            sqlx::query("INSERT INTO standings (team_id, points) VALUES (?, 0)")
                .bind(*id as i64)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_team_stat(&self, team_id: u32) -> Result<TeamStat> {
        let row = sqlx::query("SELECT played, win, draw, loss, gf, ga FROM team_stats WHERE team_id = ?")
            .bind(team_id as i64)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(stat_from_row).unwrap_or_default())
    }

    async fn increment_team_stat(&self, team_id: u32, field: StatField, delta: u32) -> Result<()> {
        // Column names come from a closed enum, never from input.
        let column = field.column();
        let query = format!(
            "INSERT INTO team_stats (team_id, {column}) VALUES (?, ?) \
             ON CONFLICT(team_id) DO UPDATE SET {column} = {column} + excluded.{column}"
        );
        sqlx::query(&query)
            .bind(team_id as i64)
            .bind(delta as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_team_stat(&self, team_id: u32) -> Result<()> {
        sqlx::query("DELETE FROM team_stats WHERE team_id = ?")
            .bind(team_id as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM fixtures").execute(&self.pool).await?;
        sqlx::query("DELETE FROM team_stats").execute(&self.pool).await?;
        sqlx::query("DELETE FROM standings").execute(&self.pool).await?;
        sqlx::query("DELETE FROM league_meta").execute(&self.pool).await?;
        sqlx::query("DELETE FROM teams").execute(&self.pool).await?;
        tracing::info!("All league data cleared");
        Ok(())
    }

    async fn load_season(&self) -> Result<SeasonSnapshot> {
        let mut tx = self.pool.begin().await?;

        let teams = read_teams(&mut *tx).await?;
        let schedule = read_schedule(&mut *tx).await?;
        let current_week: Option<i64> =
            sqlx::query_scalar("SELECT value FROM league_meta WHERE key = 'current_week'")
                .fetch_optional(&mut *tx)
                .await?;

        let stored_points: HashMap<u32, u32> = sqlx::query("SELECT team_id, points FROM standings")
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| (row.get::<i64, _>("team_id") as u32, row.get::<i64, _>("points") as u32))
            .collect();

        let stored_stats: HashMap<u32, TeamStat> =
            sqlx::query("SELECT team_id, played, win, draw, loss, gf, ga FROM team_stats")
                .fetch_all(&mut *tx)
                .await?
                .iter()
                .map(|row| (row.get::<i64, _>("team_id") as u32, stat_from_row(row)))
                .collect();

        tx.commit().await?;

        let points = teams
            .iter()
            .map(|t| (t.id, stored_points.get(&t.id).copied().unwrap_or(0)))
            .collect();
        let stats = teams
            .iter()
            .map(|t| (t.id, stored_stats.get(&t.id).copied().unwrap_or_default()))
            .collect();

        Ok(SeasonSnapshot {
            teams,
            schedule,
            current_week: current_week.map(|w| w as usize).filter(|w| *w >= 1).unwrap_or(1),
            points,
            stats,
        })
    }

    async fn commit_season(&self, snapshot: &SeasonSnapshot) -> Result<()> {
        // Dropping the transaction on any error rolls every statement back.
        let mut tx = self.pool.begin().await?;

        write_schedule(&mut *tx, &snapshot.schedule).await?;

        sqlx::query("INSERT OR REPLACE INTO league_meta (key, value) VALUES ('current_week', ?)")
            .bind(snapshot.current_week as i64)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM standings").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM team_stats").execute(&mut *tx).await?;

        for team in &snapshot.teams {
            sqlx::query("INSERT INTO standings (team_id, points) VALUES (?, ?)")
                .bind(team.id as i64)
                .bind(snapshot.points.get(&team.id).copied().unwrap_or(0) as i64)
                .execute(&mut *tx)
                .await?;

            let stat = snapshot.stats.get(&team.id).copied().unwrap_or_default();
            sqlx::query(
                "INSERT INTO team_stats (team_id, played, win, draw, loss, gf, ga) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(team.id as i64)
            .bind(stat.played as i64)
            .bind(stat.win as i64)
            .bind(stat.draw as i64)
            .bind(stat.loss as i64)
            .bind(stat.gf as i64)
            .bind(stat.ga as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixture_builder::build_schedule;

    async fn store() -> SqliteStore {
        let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    fn teams() -> Vec<Team> {
        vec![
            Team::new(1, "Liverpool", 90),
            Team::new(2, "Manchester City", 92),
            Team::new(3, "Chelsea", 80),
        ]
    }

    #[tokio::test]
    async fn test_teams_and_schedule_persist() {
        let store = store().await;
        let t = teams();
        store.set_teams(&t).await.unwrap();
        assert_eq!(store.get_teams().await.unwrap(), t);

        let mut schedule = build_schedule(&t).unwrap();
        schedule[0][0].complete(2, 1);
        store.set_schedule(&schedule).await.unwrap();
        assert_eq!(store.get_schedule().await.unwrap(), schedule);

        // Replacing the schedule drops the old rows.
        let shorter: Schedule = schedule[..2].to_vec();
        store.set_schedule(&shorter).await.unwrap();
        assert_eq!(store.get_schedule().await.unwrap(), shorter);
    }

    #[tokio::test]
    async fn test_current_week_defaults_to_one() {
        let store = store().await;
        assert_eq!(store.get_current_week().await.unwrap(), 1);
        store.set_current_week(4).await.unwrap();
        assert_eq!(store.get_current_week().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_points_and_stats() {
        let store = store().await;
        store.increment_team_points(1, 3).await.unwrap();
        store.increment_team_points(1, 1).await.unwrap();
        assert_eq!(store.get_team_points(1).await.unwrap(), 4);
        assert_eq!(store.get_team_points(2).await.unwrap(), 0);

        store.increment_team_stat(1, StatField::Played, 1).await.unwrap();
        store.increment_team_stat(1, StatField::Gf, 3).await.unwrap();
        store.increment_team_stat(1, StatField::Gf, 2).await.unwrap();
        let stat = store.get_team_stat(1).await.unwrap();
        assert_eq!(stat.played, 1);
        assert_eq!(stat.gf, 5);
        assert_eq!(stat.ga, 0);

        store.reset_all_points(&[1, 2]).await.unwrap();
        store.clear_team_stat(1).await.unwrap();
        assert_eq!(store.get_team_points(1).await.unwrap(), 0);
        assert_eq!(store.get_team_stat(1).await.unwrap(), TeamStat::default());
    }
    fn snapshot(teams: Vec<Team>, week: usize) -> SeasonSnapshot {
        let mut schedule = build_schedule(&teams).unwrap();
        schedule[0][0].complete(3, 1);
        let home = schedule[0][0].home.id;
        let away = schedule[0][0].away.id;
        SeasonSnapshot {
            schedule,
            current_week: week,
            points: HashMap::from([(home, 3)]),
            stats: HashMap::from([
                (home, TeamStat { played: 1, win: 1, gf: 3, ga: 1, ..Default::default() }),
                (away, TeamStat { played: 1, loss: 1, gf: 1, ga: 3, ..Default::default() }),
            ]),
            teams,
        }
    }

    #[tokio::test]
    async fn test_commit_and_load_season() {
        let store = store().await;
        let t = teams();
        store.set_teams(&t).await.unwrap();

        let written = snapshot(t.clone(), 2);
        store.commit_season(&written).await.unwrap();

        let loaded = store.load_season().await.unwrap();
        assert_eq!(loaded.teams, t);
        assert_eq!(loaded.schedule, written.schedule);
        assert_eq!(loaded.current_week, 2);
        for team in &t {
            assert_eq!(loaded.points[&team.id], written.points.get(&team.id).copied().unwrap_or(0));
            assert_eq!(loaded.stats[&team.id], written.stats.get(&team.id).copied().unwrap_or_default());
        }
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_previous_season() {
        let store = store().await;
        let t = teams();
        store.set_teams(&t).await.unwrap();
        let before = snapshot(t.clone(), 2);
        store.commit_season(&before).await.unwrap();

        // A repeated team id violates the standings key after the schedule
        // and week have already been written inside the transaction.
        let mut broken = snapshot(t.clone(), 5);
        broken.schedule[1][0].complete(0, 0);
        broken.teams.push(t[0].clone());
        assert!(store.commit_season(&broken).await.is_err());

        let loaded = store.load_season().await.unwrap();
        assert_eq!(loaded.schedule, before.schedule);
        assert_eq!(loaded.current_week, 2);
        let expected: HashMap<u32, u32> = t
            .iter()
            .map(|team| (team.id, before.points.get(&team.id).copied().unwrap_or(0)))
            .collect();
        assert_eq!(loaded.points, expected);
    }
}

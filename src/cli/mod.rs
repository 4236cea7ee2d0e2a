use anyhow::Result;
use std::io;
use std::path::Path;

use crate::db::load_roster;
use crate::models::{LeagueState, MatchView, Standing, Team};
use crate::services::LeagueService;
use crate::utils::{best_name_match, points_percentage};

const NAME_MATCH_THRESHOLD: f64 = 0.8;

pub async fn seed(service: &LeagueService, file: &Path) -> Result<()> {
    println!("📥 Loading teams from {}...", file.display());

    let teams = load_roster(file).await?;
    service.seed(&teams).await?;

    println!("✅ Loaded {} teams:", teams.len());
    for team in &teams {
        println!("   • {} (power {})", team.name, team.power);
    }
    println!("\n💡 Generate the schedule with: league generate");
    Ok(())
}

pub async fn generate_fixtures(service: &LeagueService) -> Result<()> {
    println!("🗓️  Generating fixtures...");
    let state = service.generate_fixtures().await?;
    println!("✅ Generated {} weeks of fixtures!\n", state.total_weeks);
    print_matches("📅 Week 1:", &state.upcoming_matches);
    Ok(())
}

pub async fn play_week(service: &LeagueService) -> Result<()> {
    let before = service.state().await?;
    if before.season_complete {
        println!("🏁 Season already completed.");
        print_standings(&before.standings);
        return Ok(());
    }

    println!("⚽ Playing week {}...\n", before.current_week);
    let state = service.play_next_week().await?;
    print_matches("📋 Results:", &state.recent_results);
    print_state(&state);
    Ok(())
}

pub async fn play_all(service: &LeagueService) -> Result<()> {
    println!("⚽ Playing all remaining weeks...\n");
    let state = service.play_all_remaining().await?;
    for week in &state.weekly_results {
        print_matches(&format!("📋 Week {}:", week.week), &week.matches);
    }
    print_state(&state);
    Ok(())
}

pub async fn reset(service: &LeagueService) -> Result<()> {
    let state = service.reset().await?;
    println!("🔄 League reset. {} weeks to play.", state.total_weeks);
    Ok(())
}

pub async fn edit_match(service: &LeagueService, week: usize, index: usize, home: u32, away: u32) -> Result<()> {
    let state = service.edit_match(week, index, home, away).await?;
    println!("✏️  Week {} match {} set to {}-{}\n", week, index, home, away);
    print_standings(&state.standings);
    Ok(())
}

pub async fn show_standings(service: &LeagueService) -> Result<()> {
    let state = service.state().await?;
    print_state(&state);
    Ok(())
}

pub async fn show_fixtures(service: &LeagueService) -> Result<()> {
    let fixtures = service.fixtures().await?;
    if fixtures.is_empty() {
        println!("📭 No fixtures yet. Try: league generate");
        return Ok(());
    }
    for week in &fixtures {
        print_matches(&format!("📅 Week {}:", week.week), &week.matches);
    }
    Ok(())
}

pub async fn query_team(service: &LeagueService, team_name: &str) -> Result<()> {
    println!("🔍 Searching for team: {}", team_name);

    let teams = service.teams().await?;
    let Some(team) = find_team(&teams, team_name) else {
        println!("❌ No teams found matching '{}'", team_name);
        println!("\n💡 Available teams:");
        for team in &teams {
            println!("   • {}", team.name);
        }
        return Ok(());
    };

    let state = service.state().await?;
    println!("📊 Team Details:");
    println!("   Name: {}", team.name);
    println!("   Power: {}", team.power);

    if let Some(row) = state.standings.iter().find(|s| s.team_id == team.id) {
        let stat = &row.stat;
        println!("   Position: {} of {}", row.position, state.standings.len());
        println!("   Record: {}W {}D {}L ({} pts)", stat.win, stat.draw, stat.loss, row.points);
        println!("   Goals: {}-{} ({:+})", stat.gf, stat.ga, row.goal_difference);
        println!("   Points won: {:.1}%", points_percentage(stat.win, stat.draw, stat.played));
        println!("   Title chance: {:.1}%", row.championship_probability);
    }

    println!("\n📅 Fixtures:");
    let fixtures = service.fixtures().await?;
    let mine: Vec<&MatchView> = fixtures
        .iter()
        .flat_map(|w| &w.matches)
        .filter(|m| m.home == team.name || m.away == team.name)
        .collect();
    if mine.is_empty() {
        println!("   No fixtures found");
    }
    for m in mine {
        println!("   W{:<2} {}", m.week, match_line(m));
    }

    Ok(())
}

pub async fn export_standings(service: &LeagueService, output: &Path) -> Result<()> {
    let state = service.state().await?;

    if let Some(dir) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir).await?;
    }
    let file = std::fs::File::create(output)?;
    write_standings_csv(file, &state.standings)?;

    println!("💾 Exported {} rows to {}", state.standings.len(), output.display());
    Ok(())
}

fn find_team<'a>(teams: &'a [Team], query: &str) -> Option<&'a Team> {
    let name = best_name_match(query, teams.iter().map(|t| t.name.as_str()), NAME_MATCH_THRESHOLD)?;
    teams.iter().find(|t| t.name == name)
}

fn write_standings_csv<W: io::Write>(writer: W, standings: &[Standing]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "position",
        "team",
        "played",
        "win",
        "draw",
        "loss",
        "gf",
        "ga",
        "goal_difference",
        "points",
        "championship_probability",
    ])?;

    for row in standings {
        let s = &row.stat;
        writer.write_record(&[
            row.position.to_string(),
            row.team.clone(),
            s.played.to_string(),
            s.win.to_string(),
            s.draw.to_string(),
            s.loss.to_string(),
            s.gf.to_string(),
            s.ga.to_string(),
            row.goal_difference.to_string(),
            row.points.to_string(),
            format!("{:.1}", row.championship_probability),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn match_line(m: &MatchView) -> String {
    match (m.home_score, m.away_score) {
        (Some(h), Some(a)) => format!("{} {}-{} {}", m.home, h, a, m.away),
        _ => format!("{} vs {}", m.home, m.away),
    }
}

fn print_matches(title: &str, matches: &[MatchView]) {
    println!("{}", title);
    for m in matches {
        println!("   [{}] {}", m.index, match_line(m));
    }
    println!();
}

fn print_standings(standings: &[Standing]) {
    println!("{:<4}{:<20}{:>4}{:>4}{:>4}{:>4}{:>5}{:>5}{:>5}{:>8}", "#", "Team", "P", "W", "D", "L", "GF", "GA", "Pts", "Title%");
    for row in standings {
        let s = &row.stat;
        println!(
            "{:<4}{:<20}{:>4}{:>4}{:>4}{:>4}{:>5}{:>5}{:>5}{:>8.1}",
            row.position, row.team, s.played, s.win, s.draw, s.loss, s.gf, s.ga, row.points, row.championship_probability
        );
    }
}

fn print_state(state: &LeagueState) {
    if state.season_complete {
        println!("🏆 Season complete after {} weeks\n", state.total_weeks);
    } else {
        println!("📊 Week {} of {} ({} remaining)\n", state.current_week, state.total_weeks, state.remaining_weeks);
    }
    print_standings(&state.standings);
    if !state.upcoming_matches.is_empty() {
        println!();
        print_matches("📅 Next up:", &state.upcoming_matches);
    }
}

use crate::error::{LeagueError, LeagueResult};
use crate::models::{Match, Schedule, Team, Week};

/// Build a double round-robin schedule using the circle method.
///
/// The first team stays fixed while the others rotate one place per round.
/// An odd roster gets a bye slot; pairings against it are dropped, so the
/// team meeting the bye sits that week out. The second leg replays every
/// first-leg week with home and away swapped.
pub fn build_schedule(teams: &[Team]) -> LeagueResult<Schedule> {
    if teams.len() < 2 {
        return Err(LeagueError::InsufficientTeams { found: teams.len() });
    }

    // None marks the bye slot.
    let mut slots: Vec<Option<&Team>> = teams.iter().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }

    let count = slots.len();
    let half = count / 2;
    let first = slots[0];
    let mut rotating: Vec<Option<&Team>> = slots[1..].to_vec();
    let mut first_leg: Schedule = Vec::with_capacity(count - 1);

    for round in 0..count - 1 {
        let mut current = Vec::with_capacity(count);
        current.push(first);
        current.extend(rotating.iter().copied());

        let mut week: Week = Vec::with_capacity(half);
        for i in 0..half {
            let (Some(mut home), Some(mut away)) = (current[i], current[count - 1 - i]) else {
                continue;
            };

            if (round + i) % 2 == 1 {
                std::mem::swap(&mut home, &mut away);
            }

            week.push(Match::scheduled(home.clone(), away.clone()));
        }

        if !week.is_empty() {
            first_leg.push(week);
        }

        rotating.rotate_right(1);
    }

    let second_leg: Schedule = first_leg
        .iter()
        .map(|week| {
            week.iter()
                .map(|m| Match::scheduled(m.away.clone(), m.home.clone()))
                .collect()
        })
        .collect();

    let mut schedule = first_leg;
    schedule.extend(second_leg);
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchStatus;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn roster(n: usize) -> Vec<Team> {
        (1..=n as u32)
            .map(|id| Team::new(id, format!("Team {}", id), 50 + id as u8))
            .collect()
    }

    fn pair_counts(schedule: &Schedule) -> HashMap<(u32, u32), usize> {
        let mut counts = HashMap::new();
        for week in schedule {
            for m in week {
                *counts.entry((m.home.id, m.away.id)).or_insert(0) += 1;
            }
        }
        counts
    }

    #[test]
    fn test_rejects_small_roster() {
        assert!(matches!(
            build_schedule(&[]),
            Err(LeagueError::InsufficientTeams { found: 0 })
        ));
        assert!(matches!(
            build_schedule(&roster(1)),
            Err(LeagueError::InsufficientTeams { found: 1 })
        ));
    }

    #[test]
    fn test_two_teams() {
        let schedule = build_schedule(&roster(2)).unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].len(), 1);
        assert_eq!(schedule[0][0].home.id, schedule[1][0].away.id);
        assert_eq!(schedule[0][0].away.id, schedule[1][0].home.id);
    }

    #[test]
    fn test_four_team_layout() {
        let schedule = build_schedule(&roster(4)).unwrap();
        assert_eq!(schedule.len(), 6);
        assert!(schedule.iter().all(|w| w.len() == 2));

        // Round 0: 1 v 4 at home, 2 v 3 swapped.
        assert_eq!((schedule[0][0].home.id, schedule[0][0].away.id), (1, 4));
        assert_eq!((schedule[0][1].home.id, schedule[0][1].away.id), (3, 2));

        for week in &schedule {
            for m in week {
                assert_eq!(m.status, MatchStatus::Scheduled);
                assert_eq!(m.home_score, None);
                assert_eq!(m.away_score, None);
            }
        }
    }

    #[test]
    fn test_second_leg_mirrors_first() {
        let schedule = build_schedule(&roster(6)).unwrap();
        let legs = schedule.len() / 2;
        for w in 0..legs {
            for (a, b) in schedule[w].iter().zip(&schedule[w + legs]) {
                assert_eq!(a.home.id, b.away.id);
                assert_eq!(a.away.id, b.home.id);
            }
        }
    }

    #[test]
    fn test_odd_roster_has_one_bye_per_leg() {
        let teams = roster(5);
        let schedule = build_schedule(&teams).unwrap();
        assert_eq!(schedule.len(), 10);
        assert!(schedule.iter().all(|w| w.len() == 2));

        let legs = schedule.len() / 2;
        for team in &teams {
            for leg in [&schedule[..legs], &schedule[legs..]] {
                let byes = leg.iter().filter(|w| !w.iter().any(|m| m.involves(team.id))).count();
                assert_eq!(byes, 1, "team {} should sit out exactly one week per leg", team.id);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_every_pair_meets_home_and_away(n in 2usize..14) {
            let teams = roster(n);
            let schedule = build_schedule(&teams).unwrap();
            let rounds = if n % 2 == 0 { n - 1 } else { n };
            prop_assert_eq!(schedule.len(), 2 * rounds);
            prop_assert!(schedule.iter().all(|w| w.len() == n / 2));

            let counts = pair_counts(&schedule);
            for a in &teams {
                for b in &teams {
                    if a.id != b.id {
                        prop_assert_eq!(counts.get(&(a.id, b.id)).copied(), Some(1));
                    }
                }
            }

            for week in &schedule {
                let mut seen: Vec<u32> = week.iter().flat_map(|m| [m.home.id, m.away.id]).collect();
                seen.sort_unstable();
                seen.dedup();
                prop_assert_eq!(seen.len(), week.len() * 2);
            }
        }
    }
}

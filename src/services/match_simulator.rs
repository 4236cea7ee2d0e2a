use rand::Rng;

use crate::models::Team;

pub const HOME_ADVANTAGE: i32 = 5;
pub const MAX_GOALS: u32 = 8;
const BASE_EXPECTANCY: f64 = 1.5;
const POWER_FACTOR: f64 = 0.02;
const MIN_EXPECTANCY: f64 = 0.3;
const MAX_EXPECTANCY: f64 = 4.0;
const UPSET_CHANCE: f64 = 0.2;
const UPSET_MAX_GOALS: u32 = 3;

/// Simulate a full match, returning `(home_goals, away_goals)`.
///
/// Each side is sampled independently.
pub fn simulate_match<R: Rng + ?Sized>(rng: &mut R, home: &Team, away: &Team) -> (u32, u32) {
    let home_goals = simulate_goals(rng, home, away, true);
    let away_goals = simulate_goals(rng, away, home, false);
    (home_goals, away_goals)
}

/// Mean goals for `attacking` against `defending`.
pub fn goal_expectancy(attacking: &Team, defending: &Team, is_home: bool) -> f64 {
    let mut attack_power = attacking.power as i32;
    if is_home {
        attack_power += HOME_ADVANTAGE;
    }
    let power_diff = attack_power - defending.power as i32;

    (BASE_EXPECTANCY + POWER_FACTOR * power_diff as f64).clamp(MIN_EXPECTANCY, MAX_EXPECTANCY)
}

/// Goals scored by one side. One draw in five ignores the ratings entirely
/// and picks a shock score in 0..=3.
pub fn simulate_goals<R: Rng + ?Sized>(
    rng: &mut R,
    attacking: &Team,
    defending: &Team,
    is_home: bool,
) -> u32 {
    let expectancy = goal_expectancy(attacking, defending, is_home);

    let goals = if rng.gen::<f64>() < UPSET_CHANCE {
        rng.gen_range(0..=UPSET_MAX_GOALS)
    } else {
        poisson_goals(rng, expectancy)
    };

    goals.min(MAX_GOALS)
}

/// Knuth's product method: multiply uniforms until the running product
/// drops to e^-λ.
pub fn poisson_goals<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> u32 {
    let limit = (-lambda).exp();
    let mut k: u32 = 0;
    let mut p: f64 = 1.0;
    loop {
        k += 1;
        p *= rng.gen::<f64>();
        if p <= limit {
            return k - 1;
        }
    }
}

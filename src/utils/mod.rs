use std::collections::BTreeMap;

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Scale percentages so they sum to 100. An all-zero map is returned as is.
pub fn normalize_percentages(values: BTreeMap<u32, f64>) -> BTreeMap<u32, f64> {
    let sum: f64 = values.values().sum();
    if sum <= 0.0 {
        return values;
    }
    values
        .into_iter()
        .map(|(id, v)| (id, v / sum * 100.0))
        .collect()
}

/// Share of available points won, as a percentage.
pub fn points_percentage(wins: u32, draws: u32, played: u32) -> f64 {
    if played == 0 {
        return 0.0;
    }
    let points = wins * 3 + draws;
    (points as f64) / ((played * 3) as f64) * 100.0
}

/// Validate team name format
pub fn validate_team_name(name: &str) -> bool {
    !name.trim().is_empty() && name.len() <= 100
}

/// Closest candidate by Jaro-Winkler similarity, if any scores at least `threshold`.
pub fn best_name_match<'a, I>(query: &str, candidates: I, threshold: f64) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let query = query.trim().to_lowercase();
    candidates
        .into_iter()
        .map(|name| (name, strsim::jaro_winkler(&query, &name.to_lowercase())))
        .filter(|(_, score)| *score >= threshold)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name)
}

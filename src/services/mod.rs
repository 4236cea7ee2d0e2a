pub mod fixture_builder;
pub mod league;
pub mod match_simulator;
pub mod predictor;
pub mod season;
pub mod standings;

pub use fixture_builder::build_schedule;
pub use league::LeagueService;
pub use match_simulator::simulate_match;
pub use predictor::ChampionshipPredictor;
pub use season::Season;
pub use standings::StandingsTable;

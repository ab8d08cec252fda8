pub mod ledger;
pub mod match_cache;
pub mod occupancy;
pub mod permissions;
pub mod revalidation;
pub mod roster;
pub mod team_sort;

pub use match_cache::MatchCache;
pub use revalidation::Revalidator;
pub use roster::RosterEngine;

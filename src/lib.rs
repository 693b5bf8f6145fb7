//! Lycee Match - recommends vocational high schools to businesses
//!
//! Given a business sector (typed in or resolved from its SIRET) and an
//! optional location, the matcher filters, narrows, scores and ranks the
//! schools of the national education directory, and explains every step.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{Matcher, MatchingError, distance::{haversine_distance, calculate_bounding_box}};
pub use crate::models::{BusinessContext, MatchPreferences, MatchingCriteria, MatchingResult, School, ScoredMatch, ScoringWeights};
pub use crate::services::MatchingService;

// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    normalize_programs, BoundingBox, BusinessContext, BusinessIdentity, EstablishmentType, Location,
    MatchPreferences, RegisteredBusiness, School, ScoredMatch, ScoringWeights,
};
pub use requests::{BusinessCriteria, MatchingCriteria, PreferencesCriteria};
pub use responses::{CacheStats, ErrorResponse, HealthResponse, MatchingResult, SectorResponse};

// Core algorithm exports
pub mod context;
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod scoring;
pub mod sectors;

pub use context::{normalize_tax_id, resolve_business_context, resolve_preferences, MatchingError};
pub use distance::{calculate_bounding_box, haversine_distance, is_within_bounding_box};
pub use filters::{filter_by_establishment_type, filter_by_sector, narrow_by_geography, GeoStrategy, SectorPass};
pub use matcher::{rank_matches, AuditTrail, Matcher};
pub use scoring::calculate_match_score;
pub use sectors::{keywords_for, normalize_sector};

use serde::{Deserialize, Serialize};
use crate::models::domain::{BusinessIdentity, ScoredMatch};

/// Response for the matching search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingResult {
    pub business: Option<BusinessIdentity>,
    pub matches: Vec<ScoredMatch>,
    #[serde(rename = "criteriaApplied")]
    pub criteria_applied: Vec<String>,
    pub suggestions: Vec<String>,
}

/// One row of the sector table endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorResponse {
    pub id: String,
    pub keywords: Vec<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "registryCache", default, skip_serializing_if = "Option::is_none")]
    pub registry_cache: Option<CacheStats>,
}

/// Registry cache statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    #[serde(rename = "hitCount")]
    pub hit_count: u64,
    #[serde(rename = "missCount")]
    pub miss_count: u64,
    #[serde(rename = "hitRate")]
    pub hit_rate: f64,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

use thiserror::Error;
use crate::models::{
    BusinessContext, BusinessCriteria, MatchPreferences, PreferencesCriteria, RegisteredBusiness,
};
use crate::core::sectors::normalize_sector;

/// Errors that cross the matching boundary
#[derive(Debug, Error, PartialEq)]
pub enum MatchingError {
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),
}

/// Merge caller-supplied business fields with the registry answer.
///
/// Caller values always win; the registry only fills missing fields. The
/// location is taken as a whole: a caller location with any usable field
/// replaces the registry location entirely. A missing sector after the merge
/// is an error.
pub fn resolve_business_context(
    criteria: Option<&BusinessCriteria>,
    registered: Option<RegisteredBusiness>,
) -> Result<BusinessContext, MatchingError> {
    let user_sector = criteria.and_then(BusinessCriteria::sector);
    let registry_sector = registered
        .as_ref()
        .and_then(|r| r.sector.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let sector = user_sector
        .or(registry_sector)
        .map(normalize_sector)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            MatchingError::InvalidCriteria(
                "no business sector could be resolved: provide business.sector or a taxId known to the registry"
                    .to_string(),
            )
        })?;

    let user_location = criteria
        .and_then(|c| c.location.clone())
        .filter(|l| !l.is_empty());
    let registry_location = registered
        .as_ref()
        .and_then(|r| r.location.clone())
        .filter(|l| !l.is_empty());

    let location = user_location.or(registry_location);

    Ok(BusinessContext {
        sector,
        identity: registered.map(|r| r.identity),
        location,
    })
}

/// Apply defaults to the caller's preferences
pub fn resolve_preferences(
    criteria: Option<&PreferencesCriteria>,
    defaults: &MatchPreferences,
    max_results_cap: usize,
) -> Result<MatchPreferences, MatchingError> {
    let Some(criteria) = criteria else {
        return Ok(*defaults);
    };

    let max_distance_km = match criteria.max_distance_km {
        Some(km) if !km.is_finite() || km <= 0.0 => {
            return Err(MatchingError::InvalidCriteria(format!(
                "maxDistanceKm must be a positive number, got {}",
                km
            )));
        }
        Some(km) => km,
        None => defaults.max_distance_km,
    };

    let max_results = match criteria.max_results {
        Some(0) => {
            return Err(MatchingError::InvalidCriteria(
                "maxResults must be at least 1".to_string(),
            ));
        }
        Some(n) => n as usize,
        None => defaults.max_results,
    };

    Ok(MatchPreferences {
        max_distance_km,
        establishment_type: criteria
            .establishment_type
            .unwrap_or(defaults.establishment_type),
        max_results: max_results.min(max_results_cap.max(1)),
    })
}

/// Normalize a SIRET (14 digits) or SIREN (9 digits), ignoring whitespace
pub fn normalize_tax_id(tax_id: &str) -> Option<String> {
    let compact: String = tax_id.chars().filter(|c| !c.is_whitespace()).collect();
    let valid = (compact.len() == 14 || compact.len() == 9) && compact.chars().all(|c| c.is_ascii_digit());
    valid.then_some(compact)
}

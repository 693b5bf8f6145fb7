use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::models::domain::{EstablishmentType, Location};

/// Request to find schools for a business
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingCriteria {
    #[serde(default)]
    pub business: Option<BusinessCriteria>,
    #[serde(default)]
    pub preferences: Option<PreferencesCriteria>,
}

/// Business fields supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BusinessCriteria {
    #[validate(length(min = 1))]
    #[serde(alias = "siret", rename = "taxId", default)]
    pub tax_id: Option<String>,
    #[validate(length(min = 1))]
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl BusinessCriteria {
    pub fn sector(&self) -> Option<&str> {
        self.sector.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn tax_id(&self) -> Option<&str> {
        self.tax_id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Matching preferences supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PreferencesCriteria {
    #[validate(range(exclusive_min = 0.0, max = 1000.0))]
    #[serde(rename = "maxDistanceKm", default)]
    pub max_distance_km: Option<f64>,
    #[serde(rename = "establishmentType", default)]
    pub establishment_type: Option<EstablishmentType>,
    #[validate(range(min = 1, max = 100))]
    #[serde(rename = "maxResults", default)]
    pub max_results: Option<u16>,
}

impl MatchingCriteria {
    /// Validate the nested business and preference blocks
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        if let Some(business) = &self.business {
            business.validate()?;
        }
        if let Some(preferences) = &self.preferences {
            preferences.validate()?;
        }
        Ok(())
    }
}

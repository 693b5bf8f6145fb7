use crate::core::sectors::sector_for_naf;
use crate::models::{BusinessIdentity, Location, RegisteredBusiness};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when resolving a business
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Source of business identities keyed by SIRET/SIREN
///
/// `Ok(None)` means the registry answered but does not know the business.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn resolve_business(&self, tax_id: &str) -> Result<Option<RegisteredBusiness>, RegistryError>;
}

/// Public company search API client
pub struct CompanyRegistryClient {
    base_url: String,
    client: Client,
}

impl CompanyRegistryClient {
    /// Create a new registry client
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { base_url, client })
    }
}

/// Coordinate sent either as a JSON number or as a numeric string
pub(crate) fn coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Convert one search result into a registered business
fn parse_company(company: &Value, tax_id: &str) -> Option<RegisteredBusiness> {
    let legal_name = text(company.get("nom_complet"))
        .or_else(|| text(company.get("nom_raison_sociale")))?;

    // Prefer the establishment matching the SIRET over the head office
    let establishment = company
        .get("matching_etablissements")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .find(|e| e.get("siret").and_then(Value::as_str) == Some(tax_id))
        })
        .or_else(|| company.get("siege"));

    let activity_code = establishment
        .and_then(|e| text(e.get("activite_principale")))
        .or_else(|| text(company.get("activite_principale")));

    let location = establishment.map(|e| Location {
        commune: text(e.get("libelle_commune")),
        department: None,
        postal_code: text(e.get("code_postal")),
        latitude: coordinate(e.get("latitude")),
        longitude: coordinate(e.get("longitude")),
    });

    Some(RegisteredBusiness {
        identity: BusinessIdentity {
            legal_name,
            tax_id: tax_id.to_string(),
            activity_code: activity_code.clone(),
        },
        sector: activity_code
            .as_deref()
            .and_then(sector_for_naf)
            .map(str::to_string),
        location: location.filter(|l| !l.is_empty()),
    })
}

#[async_trait]
impl RegistrySource for CompanyRegistryClient {
    async fn resolve_business(&self, tax_id: &str) -> Result<Option<RegisteredBusiness>, RegistryError> {
        let url = format!(
            "{}/search?q={}&page=1&per_page=1",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(tax_id)
        );

        tracing::debug!("Resolving business {} from: {}", tax_id, url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RegistryError::ApiError(format!(
                "Failed to resolve business: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let results = json
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| RegistryError::InvalidResponse("Missing results array".into()))?;

        Ok(results.first().and_then(|company| parse_company(company, tax_id)))
    }
}

/// Deterministic in-memory registry
///
/// Serves as fallback when the live registry is unreachable, and as a
/// fixture in tests. SIREN lookups match the first nine digits of a SIRET.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    businesses: HashMap<String, RegisteredBusiness>,
}

impl StaticRegistry {
    pub fn new(businesses: Vec<RegisteredBusiness>) -> Self {
        Self {
            businesses: businesses
                .into_iter()
                .map(|b| (b.identity.tax_id.clone(), b))
                .collect(),
        }
    }

    /// Load businesses from a JSON array file
    pub fn from_json_file(path: &str) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::InvalidResponse(format!("Failed to read {}: {}", path, e)))?;
        let businesses: Vec<RegisteredBusiness> = serde_json::from_str(&content)
            .map_err(|e| RegistryError::InvalidResponse(format!("Failed to parse {}: {}", path, e)))?;
        Ok(Self::new(businesses))
    }

    /// Small built-in sample covering a few sectors
    pub fn builtin() -> Self {
        let entry = |tax_id: &str, name: &str, naf: &str, commune: &str, postal: &str, lat: f64, lon: f64| {
            RegisteredBusiness {
                identity: BusinessIdentity {
                    legal_name: name.to_string(),
                    tax_id: tax_id.to_string(),
                    activity_code: Some(naf.to_string()),
                },
                sector: sector_for_naf(naf).map(str::to_string),
                location: Some(Location {
                    commune: Some(commune.to_string()),
                    department: None,
                    postal_code: Some(postal.to_string()),
                    latitude: Some(lat),
                    longitude: Some(lon),
                }),
            }
        };

        Self::new(vec![
            entry("90000000000011", "ATELIER NUMERIQUE DE LA MARNE", "62.01Z", "Meaux", "77100", 48.9601, 2.8788),
            entry("90000000100028", "BOULANGERIE DU CENTRE", "10.71C", "Melun", "77000", 48.5421, 2.6554),
            entry("90000000200035", "MAISON DUPONT BATIMENT", "43.22A", "Lyon", "69003", 45.7597, 4.8422),
            entry("90000000300042", "BRASSERIE DU PORT", "56.10A", "Marseille", "13002", 43.2965, 5.3698),
            entry("90000000400059", "TRANSPORTS LEROY", "49.41A", "Lille", "59000", 50.6292, 3.0573),
        ])
    }

    pub fn len(&self) -> usize {
        self.businesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.businesses.is_empty()
    }
}

#[async_trait]
impl RegistrySource for StaticRegistry {
    async fn resolve_business(&self, tax_id: &str) -> Result<Option<RegisteredBusiness>, RegistryError> {
        if let Some(business) = self.businesses.get(tax_id) {
            return Ok(Some(business.clone()));
        }

        if tax_id.len() == 9 {
            let mut matches: Vec<&RegisteredBusiness> = self
                .businesses
                .values()
                .filter(|b| b.identity.tax_id.starts_with(tax_id))
                .collect();
            matches.sort_by(|a, b| a.identity.tax_id.cmp(&b.identity.tax_id));
            return Ok(matches.first().map(|b| (*b).clone()));
        }

        Ok(None)
    }
}

/// Registry chain: the secondary source answers only when the primary fails
///
/// A secondary miss during a primary outage surfaces the primary error, so
/// callers never mistake an outage for an unknown business. Wrap the primary,
/// not the chain, in a [`CachedRegistry`](crate::services::CachedRegistry) so
/// fallback answers are never cached.
pub struct FallbackRegistry {
    primary: Arc<dyn RegistrySource>,
    secondary: Arc<dyn RegistrySource>,
}

impl FallbackRegistry {
    pub fn new(primary: Arc<dyn RegistrySource>, secondary: Arc<dyn RegistrySource>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl RegistrySource for FallbackRegistry {
    async fn resolve_business(&self, tax_id: &str) -> Result<Option<RegisteredBusiness>, RegistryError> {
        match self.primary.resolve_business(tax_id).await {
            Ok(found) => Ok(found),
            Err(e) => {
                tracing::warn!("Primary registry failed for {}, using fallback: {}", tax_id, e);
                match self.secondary.resolve_business(tax_id).await {
                    Ok(Some(business)) => Ok(Some(business)),
                    Ok(None) => Err(e),
                    Err(fallback_error) => {
                        tracing::warn!("Fallback registry failed for {}: {}", tax_id, fallback_error);
                        Err(e)
                    }
                }
            }
        }
    }
}

use serde::{Deserialize, Serialize};

/// Vocational school as returned by the directory provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: String,
    pub name: String,
    #[serde(rename = "establishmentType", default)]
    pub establishment_type: String,
    #[serde(rename = "isPublic", default)]
    pub is_public: bool,
    #[serde(default)]
    pub commune: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub region: String,
    #[serde(rename = "postalCode", default)]
    pub postal_code: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub programs: Vec<String>,
}

impl School {
    /// Coordinates of the school, if both are known and finite
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        coordinates_of(self.latitude, self.longitude)
    }

    pub fn has_phone(&self) -> bool {
        is_present(self.phone.as_deref())
    }

    pub fn has_email(&self) -> bool {
        is_present(self.email.as_deref())
    }

    pub fn has_website(&self) -> bool {
        is_present(self.website.as_deref())
    }
}

/// Remove blank and duplicate program labels, keeping the first occurrence.
///
/// Duplicates are detected case-insensitively.
pub fn normalize_programs<I, S>(programs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();

    for program in programs {
        let label = program.as_ref().trim();
        if label.is_empty() {
            continue;
        }
        if seen.insert(label.to_lowercase()) {
            result.push(label.to_string());
        }
    }

    result
}

fn is_present(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn coordinates_of(latitude: Option<f64>, longitude: Option<f64>) -> Option<(f64, f64)> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
        _ => None,
    }
}

/// Business location, every field optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub commune: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(rename = "postalCode", default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Location {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        coordinates_of(self.latitude, self.longitude)
    }

    pub fn commune(&self) -> Option<&str> {
        non_blank(self.commune.as_deref())
    }

    pub fn department(&self) -> Option<&str> {
        non_blank(self.department.as_deref())
    }

    pub fn postal_code(&self) -> Option<&str> {
        non_blank(self.postal_code.as_deref())
    }

    /// True when no field carries usable data
    pub fn is_empty(&self) -> bool {
        self.coordinates().is_none()
            && self.commune().is_none()
            && self.department().is_none()
            && self.postal_code().is_none()
    }

    /// Department code derived from the postal code, e.g. "77" or "974"
    pub fn postal_department(&self) -> Option<&str> {
        let code = self.postal_code()?;
        if code.len() != 5 || !code.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let width = if code.starts_with("97") || code.starts_with("98") { 3 } else { 2 };
        code.get(..width)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Legal identity of a business resolved through the company registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessIdentity {
    #[serde(rename = "legalName")]
    pub legal_name: String,
    #[serde(rename = "taxId")]
    pub tax_id: String,
    #[serde(rename = "activityCode", default)]
    pub activity_code: Option<String>,
}

/// Registry answer for a tax identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredBusiness {
    pub identity: BusinessIdentity,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

/// Business side of a matching request, after registry resolution
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessContext {
    pub sector: String,
    pub identity: Option<BusinessIdentity>,
    pub location: Option<Location>,
}

/// Establishment type filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstablishmentType {
    Public,
    Private,
    #[default]
    Any,
}

impl EstablishmentType {
    pub fn accepts(self, school: &School) -> bool {
        match self {
            EstablishmentType::Public => school.is_public,
            EstablishmentType::Private => !school.is_public,
            EstablishmentType::Any => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EstablishmentType::Public => "public",
            EstablishmentType::Private => "private",
            EstablishmentType::Any => "any",
        }
    }
}

/// Matching preferences with defaults applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPreferences {
    pub max_distance_km: f64,
    pub establishment_type: EstablishmentType,
    pub max_results: usize,
}

impl Default for MatchPreferences {
    fn default() -> Self {
        Self {
            max_distance_km: 50.0,
            establishment_type: EstablishmentType::Any,
            max_results: 10,
        }
    }
}

/// Scored and explained school recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub school: School,
    pub score: u32,
    #[serde(rename = "distanceKm")]
    pub distance_km: Option<f64>,
    pub reasons: Vec<String>,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Point values of each score component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringWeights {
    pub sector_base: u32,
    pub sector_step: u32,
    pub sector_cap: u32,
    pub sector_name_bonus: u32,
    pub public_bonus: u32,
    pub full_contact_bonus: u32,
    pub partial_contact_bonus: u32,
    pub website_bonus: u32,
    pub baseline_floor: u32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            sector_base: 30,
            sector_step: 10,
            sector_cap: 60,
            sector_name_bonus: 10,
            public_bonus: 5,
            full_contact_bonus: 5,
            partial_contact_bonus: 3,
            website_bonus: 3,
            baseline_floor: 10,
        }
    }
}

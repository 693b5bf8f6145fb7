use crate::core::distance::is_within_bounding_box;
use crate::core::sectors::fold_text;
use crate::models::{normalize_programs, BoundingBox, School};
use crate::services::registry::coordinate;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Records per page accepted by the open data API
const PAGE_SIZE: usize = 100;

/// Errors that can occur when fetching schools
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Filters forwarded to the school directory
///
/// The service sets at most one geographic filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchoolQuery {
    /// Department label, e.g. "Seine-et-Marne", matched case-insensitively
    pub department: Option<String>,
    /// Leading digits of the postal code, e.g. "77" or "974"
    pub postal_prefix: Option<String>,
    /// Rough area around the business, used when no department is known
    pub area: Option<BoundingBox>,
    /// Commune name, the last resort when nothing else locates the business
    pub commune: Option<String>,
    /// Only schools offering the vocational stream
    pub vocational_only: bool,
    pub limit: usize,
}

/// Source of candidate schools
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn list_schools(&self, query: &SchoolQuery) -> Result<Vec<School>, DirectoryError>;
}

/// National education directory client
///
/// Queries the Opendatasoft records API of the school directory dataset and
/// converts each record into a [`School`].
pub struct EducationDirectoryClient {
    base_url: String,
    dataset: String,
    client: Client,
}

impl EducationDirectoryClient {
    /// Create a new directory client
    pub fn new(base_url: String, dataset: String, timeout_secs: u64) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            dataset,
            client,
        })
    }

    /// ODSQL filter; `search()` matches labels regardless of case and accents
    fn where_clause(query: &SchoolQuery) -> String {
        let mut clauses = vec![r#"type_etablissement="Lycée""#.to_string()];

        if query.vocational_only {
            clauses.push(r#"voie_professionnelle="1""#.to_string());
        }
        if let Some(department) = &query.department {
            clauses.push(format!(r#"search(libelle_departement, "{}")"#, quoted(department)));
        }
        if let Some(prefix) = &query.postal_prefix {
            clauses.push(format!(r#"startswith(code_postal, "{}")"#, quoted(prefix)));
        }
        if let Some(area) = &query.area {
            clauses.push(format!(
                "latitude>={} and latitude<={} and longitude>={} and longitude<={}",
                area.min_lat, area.max_lat, area.min_lon, area.max_lon
            ));
        }
        if let Some(commune) = &query.commune {
            clauses.push(format!(r#"search(nom_commune, "{}")"#, quoted(commune)));
        }

        clauses.join(" and ")
    }

    fn page_url(&self, query: &SchoolQuery, offset: usize, limit: usize) -> String {
        format!(
            "{}/catalog/datasets/{}/records?limit={}&offset={}&where={}",
            self.base_url.trim_end_matches('/'),
            self.dataset,
            limit,
            offset,
            urlencoding::encode(&Self::where_clause(query))
        )
    }
}

fn quoted(value: &str) -> String {
    value.trim().replace('"', "\\\"")
}

#[async_trait]
impl DirectorySource for EducationDirectoryClient {
    async fn list_schools(&self, query: &SchoolQuery) -> Result<Vec<School>, DirectoryError> {
        let mut schools = Vec::new();
        let mut offset = 0;
        let mut skipped = 0;
        let wanted = query.limit.max(1);

        while schools.len() < wanted {
            let limit = PAGE_SIZE.min(wanted - schools.len());
            let url = self.page_url(query, offset, limit);
            tracing::debug!("Fetching schools from: {}", url);

            let response = self.client.get(&url).send().await?;
            if !response.status().is_success() {
                return Err(DirectoryError::ApiError(format!(
                    "Failed to list schools: {}",
                    response.status()
                )));
            }

            let json: Value = response.json().await?;
            let results = json
                .get("results")
                .and_then(|r| r.as_array())
                .ok_or_else(|| DirectoryError::InvalidResponse("Missing results array".into()))?;

            let page_len = results.len();
            for record in results {
                match serde_json::from_value::<SchoolRecord>(record.clone()) {
                    Ok(record) => schools.push(record.into_school()),
                    Err(e) => {
                        skipped += 1;
                        tracing::debug!("Skipping malformed school record: {}", e);
                    }
                }
            }

            if page_len < limit {
                break;
            }
            offset += page_len;
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} malformed school records", skipped);
        }
        tracing::debug!("Fetched {} schools from directory", schools.len());
        Ok(schools)
    }
}

/// Raw record of the school directory dataset
#[derive(Debug, Clone, Deserialize)]
struct SchoolRecord {
    identifiant_de_l_etablissement: String,
    nom_etablissement: String,
    #[serde(default)]
    type_etablissement: Option<String>,
    #[serde(default)]
    statut_public_prive: Option<String>,
    #[serde(default)]
    nom_commune: Option<String>,
    #[serde(default)]
    libelle_departement: Option<String>,
    #[serde(default)]
    libelle_region: Option<String>,
    #[serde(default)]
    code_postal: Option<String>,
    #[serde(default)]
    adresse_1: Option<String>,
    #[serde(default)]
    latitude: Option<Value>,
    #[serde(default)]
    longitude: Option<Value>,
    #[serde(default)]
    telephone: Option<String>,
    #[serde(default)]
    mail: Option<String>,
    #[serde(default)]
    web: Option<String>,
    #[serde(default)]
    formations: Option<Value>,
    #[serde(default)]
    voie_professionnelle: Option<Value>,
    #[serde(default)]
    voie_technologique: Option<Value>,
    #[serde(default)]
    lycee_agricole: Option<Value>,
}

fn flag(value: &Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true" | "oui" | "Oui"),
        _ => false,
    }
}

fn program_labels(value: &Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(text)) => text.split(';').map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

impl SchoolRecord {
    fn into_school(self) -> School {
        let mut programs = program_labels(&self.formations);
        if flag(&self.voie_professionnelle) {
            programs.push("Voie professionnelle".to_string());
        }
        if flag(&self.voie_technologique) {
            programs.push("Voie technologique".to_string());
        }
        if flag(&self.lycee_agricole) {
            programs.push("Lycée agricole".to_string());
        }

        let is_public = self
            .statut_public_prive
            .as_deref()
            .map(|s| fold_text(s.trim()) == "public")
            .unwrap_or(false);

        School {
            id: self.identifiant_de_l_etablissement,
            name: self.nom_etablissement,
            establishment_type: self.type_etablissement.unwrap_or_default(),
            is_public,
            commune: self.nom_commune.unwrap_or_default(),
            department: self.libelle_departement.unwrap_or_default(),
            region: self.libelle_region.unwrap_or_default(),
            postal_code: self.code_postal.unwrap_or_default(),
            address: self.adresse_1.unwrap_or_default(),
            latitude: coordinate(self.latitude.as_ref()),
            longitude: coordinate(self.longitude.as_ref()),
            phone: self.telephone.filter(|v| !v.trim().is_empty()),
            email: self.mail.filter(|v| !v.trim().is_empty()),
            website: self.web.filter(|v| !v.trim().is_empty()),
            programs: normalize_programs(programs),
        }
    }
}

/// In-memory directory used for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    schools: Vec<School>,
}

impl StaticDirectory {
    pub fn new(schools: Vec<School>) -> Self {
        let schools = schools
            .into_iter()
            .map(|mut school| {
                school.programs = normalize_programs(&school.programs);
                school
            })
            .collect();
        Self { schools }
    }

    /// Load schools from a JSON array file
    pub fn from_json_file(path: &str) -> Result<Self, DirectoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DirectoryError::InvalidResponse(format!("Failed to read {}: {}", path, e)))?;
        let schools: Vec<School> = serde_json::from_str(&content)
            .map_err(|e| DirectoryError::InvalidResponse(format!("Failed to parse {}: {}", path, e)))?;
        Ok(Self::new(schools))
    }

    pub fn len(&self) -> usize {
        self.schools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schools.is_empty()
    }
}

#[async_trait]
impl DirectorySource for StaticDirectory {
    async fn list_schools(&self, query: &SchoolQuery) -> Result<Vec<School>, DirectoryError> {
        let department = query.department.as_deref().map(fold_text);
        let commune = query.commune.as_deref().map(fold_text);

        Ok(self
            .schools
            .iter()
            .filter(|school| {
                department
                    .as_deref()
                    .map(|d| fold_text(&school.department) == d)
                    .unwrap_or(true)
            })
            .filter(|school| {
                query
                    .postal_prefix
                    .as_deref()
                    .map(|prefix| school.postal_code.trim().starts_with(prefix))
                    .unwrap_or(true)
            })
            .filter(|school| match (&query.area, school.coordinates()) {
                (Some(area), Some((lat, lon))) => is_within_bounding_box(lat, lon, area),
                _ => true,
            })
            .filter(|school| {
                commune
                    .as_deref()
                    .map(|c| fold_text(&school.commune) == c)
                    .unwrap_or(true)
            })
            .take(query.limit.max(1))
            .cloned()
            .collect())
    }
}

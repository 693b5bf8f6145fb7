use crate::core::{
    calculate_bounding_box, normalize_tax_id, resolve_business_context, resolve_preferences, AuditTrail,
    Matcher, MatchingError,
};
use crate::models::{BusinessContext, MatchPreferences, MatchingCriteria, MatchingResult, RegisteredBusiness};
use crate::services::directory::{DirectorySource, SchoolQuery};
use crate::services::registry::RegistrySource;
use std::sync::Arc;

/// Service-level knobs for a search
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub defaults: MatchPreferences,
    pub max_results_cap: usize,
    /// Number of directory records fetched per search
    pub fetch_limit: usize,
    /// Radius of the directory pre-filter when only coordinates are known
    pub search_radius_km: f64,
    pub vocational_only: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            defaults: MatchPreferences::default(),
            max_results_cap: 100,
            fetch_limit: 500,
            search_radius_km: 150.0,
            vocational_only: true,
        }
    }
}

/// Matching use case: resolves the business, fetches candidate schools and
/// runs the matcher
pub struct MatchingService {
    directory: Arc<dyn DirectorySource>,
    registry: Arc<dyn RegistrySource>,
    matcher: Matcher,
    settings: SearchSettings,
}

impl MatchingService {
    pub fn new(
        directory: Arc<dyn DirectorySource>,
        registry: Arc<dyn RegistrySource>,
        matcher: Matcher,
        settings: SearchSettings,
    ) -> Self {
        Self {
            directory,
            registry,
            matcher,
            settings,
        }
    }

    pub fn registry(&self) -> Arc<dyn RegistrySource> {
        Arc::clone(&self.registry)
    }

    /// Find and rank schools for the given criteria
    ///
    /// Upstream failures never fail the search: they degrade to manual
    /// fields or an empty candidate pool, each with a suggestion.
    pub async fn search(&self, criteria: &MatchingCriteria) -> Result<MatchingResult, MatchingError> {
        let business_criteria = criteria.business.as_ref();
        let sector = business_criteria.and_then(|b| b.sector());
        let tax_id = business_criteria.and_then(|b| b.tax_id());

        if sector.is_none() && tax_id.is_none() {
            return Err(MatchingError::InvalidCriteria(
                "either business.sector or business.taxId is required".to_string(),
            ));
        }

        let preferences = resolve_preferences(
            criteria.preferences.as_ref(),
            &self.settings.defaults,
            self.settings.max_results_cap,
        )?;

        let mut trail = AuditTrail::new();
        let registered = match tax_id {
            Some(raw) => self.lookup_business(raw, &mut trail).await,
            None => None,
        };

        let business = resolve_business_context(business_criteria, registered)?;

        let query = self.directory_query(&business);
        let schools = match self.directory.list_schools(&query).await {
            Ok(schools) => schools,
            Err(e) => {
                tracing::warn!("School directory unavailable: {}", e);
                trail.suggest("School directory unavailable: no candidate schools could be fetched, please retry later");
                Vec::new()
            }
        };
        tracing::debug!("Directory returned {} candidate schools", schools.len());

        let result = self
            .matcher
            .find_matches_with_trail(&business, &preferences, schools, trail);

        tracing::info!(
            "Search for sector '{}' returned {} matches",
            business.sector,
            result.matches.len()
        );

        Ok(result)
    }

    async fn lookup_business(&self, raw: &str, trail: &mut AuditTrail) -> Option<RegisteredBusiness> {
        let Some(tax_id) = normalize_tax_id(raw) else {
            trail.suggest(format!(
                "Tax id '{}' is not a valid SIRET (14 digits) or SIREN (9 digits): registry lookup skipped",
                raw
            ));
            return None;
        };

        match self.registry.resolve_business(&tax_id).await {
            Ok(Some(business)) => {
                trail.criterion(format!("business resolved from registry ({})", tax_id));
                Some(business)
            }
            Ok(None) => {
                trail.suggest(format!(
                    "No business found for tax id {}: using the fields provided manually",
                    tax_id
                ));
                None
            }
            Err(e) => {
                tracing::warn!("Business registry unavailable for {}: {}", tax_id, e);
                trail.suggest("Business registry unavailable: using the fields provided manually");
                None
            }
        }
    }

    /// Directory pre-filter, the first that applies of: department label,
    /// area around the coordinates, postal code department, commune
    fn directory_query(&self, business: &BusinessContext) -> SchoolQuery {
        let mut query = SchoolQuery {
            vocational_only: self.settings.vocational_only,
            limit: self.settings.fetch_limit,
            ..Default::default()
        };
        let Some(location) = business.location.as_ref() else {
            return query;
        };

        if let Some(department) = location.department() {
            query.department = Some(department.to_string());
        } else if let Some((lat, lon)) = location.coordinates() {
            query.area = Some(calculate_bounding_box(lat, lon, self.settings.search_radius_km));
        } else if let Some(prefix) = location.postal_department() {
            query.postal_prefix = Some(prefix.to_string());
        } else if let Some(commune) = location.commune() {
            query.commune = Some(commune.to_string());
        }

        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusinessCriteria, Location, School};
    use crate::services::directory::{DirectoryError, StaticDirectory};
    use crate::services::registry::{FallbackRegistry, RegistryError, StaticRegistry};
    use async_trait::async_trait;

    struct DownDirectory;

    #[async_trait]
    impl DirectorySource for DownDirectory {
        async fn list_schools(&self, _query: &SchoolQuery) -> Result<Vec<School>, DirectoryError> {
            Err(DirectoryError::ApiError("503 Service Unavailable".to_string()))
        }
    }

    struct DownRegistry;

    #[async_trait]
    impl RegistrySource for DownRegistry {
        async fn resolve_business(&self, _tax_id: &str) -> Result<Option<RegisteredBusiness>, RegistryError> {
            Err(RegistryError::ApiError("503 Service Unavailable".to_string()))
        }
    }

    fn school(id: &str, programs: &[&str]) -> School {
        School {
            id: id.to_string(),
            name: format!("Lycée professionnel {}", id),
            establishment_type: "Lycée".to_string(),
            is_public: true,
            commune: "Meaux".to_string(),
            department: "Seine-et-Marne".to_string(),
            region: String::new(),
            postal_code: "77100".to_string(),
            address: String::new(),
            latitude: None,
            longitude: None,
            phone: None,
            email: None,
            website: None,
            programs: programs.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn service(directory: Arc<dyn DirectorySource>, registry: Arc<dyn RegistrySource>) -> MatchingService {
        MatchingService::new(directory, registry, Matcher::default(), SearchSettings::default())
    }

    fn criteria(sector: Option<&str>, tax_id: Option<&str>) -> MatchingCriteria {
        MatchingCriteria {
            business: Some(BusinessCriteria {
                tax_id: tax_id.map(str::to_string),
                sector: sector.map(str::to_string),
                location: None,
            }),
            preferences: None,
        }
    }

    #[tokio::test]
    async fn test_requires_sector_or_tax_id() {
        let service = service(Arc::new(StaticDirectory::default()), Arc::new(StaticRegistry::default()));

        let result = service.search(&MatchingCriteria::default()).await;
        assert!(matches!(result, Err(MatchingError::InvalidCriteria(_))));
    }

    #[tokio::test]
    async fn test_sector_resolved_from_registry() {
        let directory = StaticDirectory::new(vec![school("A", &["Bac pro Systèmes numériques"])]);
        let service = service(Arc::new(directory), Arc::new(StaticRegistry::builtin()));

        let result = service.search(&criteria(None, Some("900 000 000 00011"))).await.unwrap();

        assert_eq!(result.business.unwrap().legal_name, "ATELIER NUMERIQUE DE LA MARNE");
        assert!(result.criteria_applied[0].starts_with("business resolved from registry"));
        assert_eq!(result.matches.len(), 1);
    }

    #[tokio::test]
    async fn test_registry_outage_falls_back_to_manual_fields() {
        let directory = StaticDirectory::new(vec![school("A", &["Bac pro Commerce"])]);
        let service = service(Arc::new(directory), Arc::new(DownRegistry));

        let result = service
            .search(&criteria(Some("commerce"), Some("90000000000011")))
            .await
            .unwrap();

        assert!(result.business.is_none());
        assert_eq!(result.matches.len(), 1);
        assert!(result.suggestions[0].starts_with("Business registry unavailable"));
    }

    #[tokio::test]
    async fn test_unknown_tax_id_without_sector_is_invalid() {
        let service = service(Arc::new(StaticDirectory::default()), Arc::new(StaticRegistry::builtin()));

        let result = service.search(&criteria(None, Some("11111111111111"))).await;
        assert!(matches!(result, Err(MatchingError::InvalidCriteria(_))));
    }

    #[tokio::test]
    async fn test_directory_outage_yields_empty_result() {
        let service = service(Arc::new(DownDirectory), Arc::new(StaticRegistry::default()));

        let result = service.search(&criteria(Some("commerce"), None)).await.unwrap();

        assert!(result.matches.is_empty());
        assert!(result.suggestions[0].starts_with("School directory unavailable"));
        assert_eq!(result.suggestions.last().unwrap(), "No matching school found");
    }

    #[test]
    fn test_directory_query_prefers_department() {
        let service = service(Arc::new(StaticDirectory::default()), Arc::new(StaticRegistry::default()));
        let mut business = BusinessContext {
            sector: "commerce".to_string(),
            identity: None,
            location: Some(Location {
                department: Some("Seine-et-Marne".to_string()),
                latitude: Some(48.96),
                longitude: Some(2.88),
                ..Default::default()
            }),
        };

        let query = service.directory_query(&business);
        assert_eq!(query.department.as_deref(), Some("Seine-et-Marne"));
        assert!(query.area.is_none());

        if let Some(location) = business.location.as_mut() {
            location.department = None;
        }
        let query = service.directory_query(&business);
        assert!(query.department.is_none());
        assert!(query.area.is_some());
    }

    #[test]
    fn test_directory_query_without_department_or_coordinates() {
        let service = service(Arc::new(StaticDirectory::default()), Arc::new(StaticRegistry::default()));
        let business = |location: Location| BusinessContext {
            sector: "commerce".to_string(),
            identity: None,
            location: Some(location),
        };

        let query = service.directory_query(&business(Location {
            postal_code: Some("77100".to_string()),
            ..Default::default()
        }));
        assert_eq!(query.postal_prefix.as_deref(), Some("77"));
        assert!(query.department.is_none() && query.area.is_none() && query.commune.is_none());

        let query = service.directory_query(&business(Location {
            commune: Some("Meaux".to_string()),
            ..Default::default()
        }));
        assert_eq!(query.commune.as_deref(), Some("Meaux"));
        assert!(query.postal_prefix.is_none());

        let query = service.directory_query(&business(Location {
            commune: Some("Meaux".to_string()),
            postal_code: Some("77100".to_string()),
            ..Default::default()
        }));
        assert_eq!(query.postal_prefix.as_deref(), Some("77"));
        assert!(query.commune.is_none());
    }

    #[tokio::test]
    async fn test_commune_only_search_reaches_local_schools() {
        let mut paris = school("P", &["Bac pro Commerce"]);
        paris.commune = "Paris".to_string();
        paris.department = "Paris".to_string();
        paris.postal_code = "75011".to_string();
        let mut schools: Vec<School> = (0..5).map(|_| paris.clone()).collect();
        schools.push(school("M", &["Bac pro Commerce"]));

        let directory = StaticDirectory::new(schools);
        let settings = SearchSettings {
            fetch_limit: 3,
            ..Default::default()
        };
        let service = MatchingService::new(
            Arc::new(directory),
            Arc::new(StaticRegistry::default()),
            Matcher::default(),
            settings,
        );

        let mut criteria = criteria(Some("commerce"), None);
        if let Some(business) = criteria.business.as_mut() {
            business.location = Some(Location {
                commune: Some("meaux".to_string()),
                ..Default::default()
            });
        }
        let result = service.search(&criteria).await.unwrap();

        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].school.id, "M");
    }

    #[tokio::test]
    async fn test_user_location_overrides_registry_location() {
        let mut meaux = school("M", &["Bac pro Commerce"]);
        meaux.latitude = Some(48.9601);
        meaux.longitude = Some(2.8788);
        let mut lyon = school("L", &["Bac pro Commerce"]);
        lyon.commune = "Lyon".to_string();
        lyon.department = "Rhône".to_string();
        lyon.postal_code = "69003".to_string();
        lyon.latitude = Some(45.7597);
        lyon.longitude = Some(4.8422);

        let directory = StaticDirectory::new(vec![lyon, meaux]);
        let service = service(Arc::new(directory), Arc::new(StaticRegistry::builtin()));

        let mut criteria = criteria(Some("commerce"), Some("90000000200035"));
        if let Some(business) = criteria.business.as_mut() {
            business.location = Some(Location {
                commune: Some("Meaux".to_string()),
                ..Default::default()
            });
        }
        let result = service.search(&criteria).await.unwrap();

        assert_eq!(result.business.unwrap().legal_name, "MAISON DUPONT BATIMENT");
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].school.id, "M");
        assert!(result.matches[0].distance_km.is_none());
    }

    #[tokio::test]
    async fn test_registry_outage_with_unknown_id_reports_outage() {
        let directory = StaticDirectory::new(vec![school("A", &["Bac pro Commerce"])]);
        let registry = FallbackRegistry::new(Arc::new(DownRegistry), Arc::new(StaticRegistry::builtin()));
        let service = service(Arc::new(directory), Arc::new(registry));

        let result = service
            .search(&criteria(Some("commerce"), Some("12345678900012")))
            .await
            .unwrap();

        assert!(result.business.is_none());
        assert!(result.suggestions[0].starts_with("Business registry unavailable"));
        assert!(!result.suggestions.iter().any(|s| s.starts_with("No business found")));
    }
}

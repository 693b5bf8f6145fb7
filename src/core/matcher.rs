use std::cmp::Ordering;
use crate::models::{
    BusinessContext, BusinessIdentity, EstablishmentType, MatchPreferences, MatchingResult, School,
    ScoredMatch, ScoringWeights,
};
use crate::core::{
    filters::{
        filter_by_establishment_type, filter_by_sector, narrow_by_geography, GeoStrategy,
        SectorPass,
    },
    scoring::calculate_match_score,
    sectors::{is_known_sector, keywords_for},
};

/// Ordered record of the decisions taken while matching
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditTrail {
    pub criteria: Vec<String>,
    pub suggestions: Vec<String>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn criterion(&mut self, criterion: impl Into<String>) {
        self.criteria.push(criterion.into());
    }

    pub fn suggest(&mut self, suggestion: impl Into<String>) {
        self.suggestions.push(suggestion.into());
    }
}

/// Main matching orchestrator - implements the school ranking pipeline
///
/// # Pipeline Stages
/// 1. Sector keyword filter, with one relaxed generic pass
/// 2. Geographic narrowing, with one widening pass
/// 3. Establishment type filter
/// 4. Scoring and ranking
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
}

impl Matcher {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn with_default_weights() -> Self {
        Self {
            weights: ScoringWeights::default(),
        }
    }

    /// Rank schools for a business
    ///
    /// # Arguments
    /// * `business` - Resolved business sector, identity and location
    /// * `preferences` - Distance, establishment type and result count
    /// * `schools` - Every school fetched from the directory
    pub fn find_matches(
        &self,
        business: &BusinessContext,
        preferences: &MatchPreferences,
        schools: Vec<School>,
    ) -> MatchingResult {
        self.find_matches_with_trail(business, preferences, schools, AuditTrail::new())
    }

    /// Same as [`Matcher::find_matches`], appending to an existing trail
    pub fn find_matches_with_trail(
        &self,
        business: &BusinessContext,
        preferences: &MatchPreferences,
        schools: Vec<School>,
        mut trail: AuditTrail,
    ) -> MatchingResult {
        // Stage 1: sector
        let keyword_count = keywords_for(&business.sector).len();
        if is_known_sector(&business.sector) {
            trail.criterion(format!("sector: {} ({} keywords)", business.sector, keyword_count));
        } else {
            trail.criterion(format!("sector: {} (unrecognized, matched literally)", business.sector));
        }

        let sector = filter_by_sector(&schools, &business.sector);
        tracing::debug!(
            "Sector filter for '{}': {} of {} schools ({:?})",
            business.sector,
            sector.matched(),
            sector.total_schools,
            sector.pass
        );

        match sector.pass {
            SectorPass::Strict => {
                trail.criterion(format!(
                    "sector filter: {} of {} schools matched",
                    sector.matched(),
                    sector.total_schools
                ));
            }
            SectorPass::Relaxed => {
                trail.criterion(format!(
                    "sector filter relaxed: no school matched '{}', {} of {} matched generic vocational keywords",
                    business.sector,
                    sector.matched(),
                    sector.total_schools
                ));
                trail.suggest(format!(
                    "No school explicitly mentions the '{}' sector; showing vocational schools in general",
                    business.sector
                ));
            }
            SectorPass::Empty => {
                trail.criterion(format!(
                    "sector filter: none of {} schools matched, even with generic vocational keywords",
                    sector.total_schools
                ));
                trail.suggest("No matching school found: try a wider area or check the sector spelling");
                return finish(trail, Vec::new(), business.identity.clone());
            }
        }

        // Stage 2: geography
        let geo = narrow_by_geography(
            sector.candidates,
            business.location.as_ref(),
            preferences.max_distance_km,
        );

        match &geo.strategy {
            GeoStrategy::Skipped => match business.location.as_ref().and_then(|l| l.postal_code()) {
                Some(postal_code) => {
                    trail.criterion(format!(
                        "geography: postal code only ({}), no narrowing applied",
                        postal_code
                    ));
                    trail.suggest(
                        "Only a postal code was provided: schools are not narrowed by area, those in the same postal area rank higher",
                    );
                }
                None => {
                    trail.criterion("geography: skipped (no usable business location)");
                    trail.suggest("No location provided: results are sorted by relevance only, not by distance");
                }
            },
            GeoStrategy::Radius { max_distance_km } => {
                trail.criterion(format!("geography: within {} km of the business", max_distance_km));
                if geo.widened {
                    trail.criterion("geography: widened to all sector matches");
                    trail.suggest(format!(
                        "No school within {} km: geographic narrowing was relaxed",
                        max_distance_km
                    ));
                }
            }
            GeoStrategy::Locality { commune, department } => {
                let area = describe_locality(commune.as_deref(), department.as_deref());
                trail.criterion(format!("geography: {}", area));
                if geo.widened {
                    trail.criterion("geography: widened to all sector matches");
                    trail.suggest(format!("No school found in {}: geographic narrowing was relaxed", area));
                }
            }
        }

        // Stage 3: establishment type
        let before_type = geo.candidates.len();
        let candidates = filter_by_establishment_type(geo.candidates, preferences.establishment_type);
        if preferences.establishment_type != EstablishmentType::Any {
            trail.criterion(format!(
                "establishment type: {} ({} of {} kept)",
                preferences.establishment_type.as_str(),
                candidates.len(),
                before_type
            ));
            if candidates.is_empty() && before_type > 0 {
                trail.suggest(format!(
                    "No {} school matched: try the 'any' establishment type",
                    preferences.establishment_type.as_str()
                ));
            }
        }

        // Stage 4: scoring and ranking
        let scored: Vec<ScoredMatch> = candidates
            .iter()
            .map(|school| calculate_match_score(school, business, &self.weights))
            .collect();

        let total = scored.len();
        let ranked = rank_matches(scored, preferences.max_results);
        trail.criterion(format!(
            "max results: {} ({} candidates scored)",
            preferences.max_results, total
        ));

        finish(trail, ranked, business.identity.clone())
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

fn describe_locality(commune: Option<&str>, department: Option<&str>) -> String {
    match (commune, department) {
        (Some(c), Some(d)) => format!("commune {} or department {}", c, d),
        (Some(c), None) => format!("commune {}", c),
        (None, Some(d)) => format!("department {}", d),
        (None, None) => "the business area".to_string(),
    }
}

fn finish(
    mut trail: AuditTrail,
    matches: Vec<ScoredMatch>,
    business: Option<BusinessIdentity>,
) -> MatchingResult {
    let summary = match matches.len() {
        0 => "No matching school found".to_string(),
        1 => "Found 1 matching school".to_string(),
        n => format!("Found {} matching schools", n),
    };
    trail.suggest(summary);

    MatchingResult {
        business,
        matches,
        criteria_applied: trail.criteria,
        suggestions: trail.suggestions,
    }
}

/// Order two matches: score descending, then distance ascending.
///
/// A missing distance sorts after any known distance.
pub fn compare_matches(a: &ScoredMatch, b: &ScoredMatch) -> Ordering {
    b.score.cmp(&a.score).then_with(|| match (a.distance_km, b.distance_km) {
        (Some(da), Some(db)) => da.partial_cmp(&db).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    })
}

/// Sort (stable) and truncate scored matches
pub fn rank_matches(mut matches: Vec<ScoredMatch>, limit: usize) -> Vec<ScoredMatch> {
    matches.sort_by(compare_matches);
    matches.truncate(limit.max(1));
    matches
}

use crate::models::{EstablishmentType, Location, School};
use crate::core::{
    distance::distance_between,
    sectors::{fold_text, keywords_for, GENERIC_KEYWORDS},
};

/// Folded text blob used for keyword matching: name, type and programs
pub fn school_text(school: &School) -> String {
    let mut text = String::with_capacity(
        school.name.len() + school.establishment_type.len() + school.programs.len() * 24,
    );
    text.push_str(&school.name);
    text.push(' ');
    text.push_str(&school.establishment_type);
    for program in &school.programs {
        text.push(' ');
        text.push_str(program);
    }
    fold_text(&text)
}

/// Distinct keywords found in a text blob, in keyword order
pub fn matched_keywords<'a, K>(text: &str, keywords: &'a [K]) -> Vec<&'a str>
where
    K: AsRef<str>,
{
    keywords
        .iter()
        .map(|keyword| keyword.as_ref())
        .filter(|keyword| text.contains(keyword))
        .collect()
}

/// Which keyword pass produced the sector candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorPass {
    /// Sector keywords matched at least one school
    Strict,
    /// Only the generic vocational keywords matched
    Relaxed,
    /// Neither pass matched anything
    Empty,
}

/// Output of the sector filter stage
#[derive(Debug, Clone)]
pub struct SectorFilterOutcome {
    pub candidates: Vec<School>,
    pub pass: SectorPass,
    pub total_schools: usize,
}

impl SectorFilterOutcome {
    pub fn matched(&self) -> usize {
        self.candidates.len()
    }
}

/// Keep the schools whose text mentions the sector.
///
/// When nothing matches, a second pass is made with the generic vocational
/// keywords. No further retry happens after that pass.
pub fn filter_by_sector(schools: &[School], sector: &str) -> SectorFilterOutcome {
    let keywords = keywords_for(sector);
    let texts: Vec<String> = schools.iter().map(school_text).collect();

    let keep = |terms: &[&str]| -> Vec<School> {
        schools
            .iter()
            .zip(&texts)
            .filter(|(_, text)| terms.iter().any(|term| text.contains(term)))
            .map(|(school, _)| school.clone())
            .collect()
    };

    let sector_keywords: Vec<&str> = keywords.iter().map(String::as_str).collect();
    let strict = keep(&sector_keywords);
    if !strict.is_empty() {
        return SectorFilterOutcome {
            candidates: strict,
            pass: SectorPass::Strict,
            total_schools: schools.len(),
        };
    }

    let relaxed = keep(GENERIC_KEYWORDS);
    let pass = if relaxed.is_empty() {
        SectorPass::Empty
    } else {
        SectorPass::Relaxed
    };

    SectorFilterOutcome {
        candidates: relaxed,
        pass,
        total_schools: schools.len(),
    }
}

/// How the geographic narrowing was decided
#[derive(Debug, Clone, PartialEq)]
pub enum GeoStrategy {
    /// No business location, or only a postal code: every candidate passes
    Skipped,
    /// Distance radius around the business coordinates, with commune or
    /// department as fallback for schools lacking coordinates
    Radius { max_distance_km: f64 },
    /// Commune or department text match
    Locality {
        commune: Option<String>,
        department: Option<String>,
    },
}

/// Output of the geographic narrowing stage
#[derive(Debug, Clone)]
pub struct GeoNarrowOutcome {
    pub candidates: Vec<School>,
    pub strategy: GeoStrategy,
    /// Narrowing emptied the set and the sector candidates were restored
    pub widened: bool,
}

/// Case and accent insensitive equality of two non-blank labels
pub(crate) fn same_text(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && fold_text(a) == fold_text(b)
}

/// Commune or department text match between a business and a school
pub fn matches_locality(location: &Location, school: &School) -> bool {
    location
        .commune()
        .map(|commune| same_text(commune, &school.commune))
        .unwrap_or(false)
        || location
            .department()
            .map(|department| same_text(department, &school.department))
            .unwrap_or(false)
}

fn within_area(location: &Location, school: &School, max_distance_km: f64) -> bool {
    match (location.coordinates(), school.coordinates()) {
        (Some(from), Some(to)) => distance_between(from, to) <= max_distance_km,
        _ => matches_locality(location, school),
    }
}

/// Narrow sector candidates to the business surroundings.
///
/// An empty narrowing restores the input candidates and sets `widened`.
pub fn narrow_by_geography(
    candidates: Vec<School>,
    location: Option<&Location>,
    max_distance_km: f64,
) -> GeoNarrowOutcome {
    let location = match location {
        Some(location) if location.coordinates().is_some()
            || location.commune().is_some()
            || location.department().is_some() => location,
        _ => {
            return GeoNarrowOutcome {
                candidates,
                strategy: GeoStrategy::Skipped,
                widened: false,
            };
        }
    };

    let strategy = if location.coordinates().is_some() {
        GeoStrategy::Radius { max_distance_km }
    } else {
        GeoStrategy::Locality {
            commune: location.commune().map(str::to_string),
            department: location.department().map(str::to_string),
        }
    };

    let narrowed: Vec<School> = candidates
        .iter()
        .filter(|school| within_area(location, school, max_distance_km))
        .cloned()
        .collect();

    if narrowed.is_empty() && !candidates.is_empty() {
        return GeoNarrowOutcome {
            candidates,
            strategy,
            widened: true,
        };
    }

    GeoNarrowOutcome {
        candidates: narrowed,
        strategy,
        widened: false,
    }
}

/// Keep schools accepted by the establishment type filter
pub fn filter_by_establishment_type(
    candidates: Vec<School>,
    establishment_type: EstablishmentType,
) -> Vec<School> {
    candidates
        .into_iter()
        .filter(|school| establishment_type.accepts(school))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_school(id: &str, name: &str, programs: &[&str], commune: &str) -> School {
        School {
            id: id.to_string(),
            name: name.to_string(),
            establishment_type: "Lycée professionnel".to_string(),
            is_public: true,
            commune: commune.to_string(),
            department: "Seine-et-Marne".to_string(),
            region: "Île-de-France".to_string(),
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

    #[test]
    fn test_school_text_is_folded() {
        let school = create_school("1", "Lycée du Numérique", &["Développement web"], "Meaux");
        let text = school_text(&school);
        assert!(text.contains("numerique"));
        assert!(text.contains("developpement web"));
        assert!(text.contains("lycee professionnel"));
    }

    #[test]
    fn test_filter_by_sector_strict() {
        let schools = vec![
            create_school("1", "Lycée Jean Moulin", &["Bac pro Commerce"], "Meaux"),
            create_school("2", "Lycée Blaise Pascal", &["CAP Cuisine"], "Meaux"),
        ];

        let outcome = filter_by_sector(&schools, "commerce");

        assert_eq!(outcome.pass, SectorPass::Strict);
        assert_eq!(outcome.matched(), 1);
        assert_eq!(outcome.candidates[0].id, "1");
        assert_eq!(outcome.total_schools, 2);
    }

    #[test]
    fn test_filter_by_sector_relaxed() {
        let mut school = create_school("1", "Lycée Gustave Eiffel", &["Maintenance des matériels"], "Meaux");
        school.establishment_type = "Lycée professionnel".to_string();

        let outcome = filter_by_sector(&[school], "sante");

        assert_eq!(outcome.pass, SectorPass::Relaxed);
        assert_eq!(outcome.matched(), 1);
    }

    #[test]
    fn test_filter_by_sector_empty() {
        let mut school = create_school("1", "Collège Victor Hugo", &[], "Meaux");
        school.establishment_type = "Collège".to_string();

        let outcome = filter_by_sector(&[school], "sante");

        assert_eq!(outcome.pass, SectorPass::Empty);
        assert!(outcome.candidates.is_empty());
    }

    #[test]
    fn test_narrow_skipped_without_location() {
        let schools = vec![create_school("1", "Lycée A", &[], "Meaux")];

        let outcome = narrow_by_geography(schools, None, 50.0);

        assert_eq!(outcome.strategy, GeoStrategy::Skipped);
        assert_eq!(outcome.candidates.len(), 1);
        assert!(!outcome.widened);
    }

    #[test]
    fn test_narrow_by_commune_case_insensitive() {
        let schools = vec![
            create_school("1", "Lycée A", &[], "Meaux"),
            create_school("2", "Lycée B", &[], "Paris"),
        ];
        let location = Location {
            commune: Some("MEAUX".to_string()),
            ..Default::default()
        };

        let outcome = narrow_by_geography(schools, Some(&location), 50.0);

        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].id, "1");
        assert!(!outcome.widened);
    }

    #[test]
    fn test_narrow_by_radius() {
        let mut near = create_school("near", "Lycée A", &[], "Paris");
        near.latitude = Some(48.8944);
        near.longitude = Some(2.3522);
        let mut far = create_school("far", "Lycée B", &[], "Lyon");
        far.latitude = Some(45.7640);
        far.longitude = Some(4.8357);
        let location = Location {
            latitude: Some(48.8566),
            longitude: Some(2.3522),
            ..Default::default()
        };

        let outcome = narrow_by_geography(vec![near, far], Some(&location), 50.0);

        assert_eq!(outcome.strategy, GeoStrategy::Radius { max_distance_km: 50.0 });
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].id, "near");
    }

    #[test]
    fn test_narrow_widens_when_empty() {
        let schools = vec![
            create_school("1", "Lycée A", &[], "Lyon"),
            create_school("2", "Lycée B", &[], "Marseille"),
        ];
        let location = Location {
            commune: Some("Brest".to_string()),
            ..Default::default()
        };

        let outcome = narrow_by_geography(schools, Some(&location), 50.0);

        assert!(outcome.widened);
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[test]
    fn test_filter_by_establishment_type() {
        let public = create_school("1", "Lycée A", &[], "Meaux");
        let mut private = create_school("2", "Lycée B", &[], "Meaux");
        private.is_public = false;

        let kept = filter_by_establishment_type(vec![public, private], EstablishmentType::Private);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "2");
    }
}

use crate::models::{BusinessContext, Location, School, ScoredMatch, ScoringWeights};
use crate::core::{
    distance::{distance_between, round_km},
    filters::{matched_keywords, same_text, school_text},
    sectors::{fold_text, keywords_for, normalize_sector},
};

/// Points for the same commune when only text location is known
pub const SAME_COMMUNE_POINTS: u32 = 35;
/// Points for the same department when only text location is known
pub const SAME_DEPARTMENT_POINTS: u32 = 25;
/// Points for the same two-digit postal prefix
pub const SAME_POSTAL_AREA_POINTS: u32 = 15;

/// Calculate the score of a school for a business and explain it
///
/// Scoring formula:
/// score = (
///     sector relevance +      # 30 for one keyword, +10 per extra, capped at 60, +10 name bonus
///     geography +             # distance bands 40/30/20/10/5, or 35/25/15 on locality
///     public bonus +          # public establishment
///     contact bonus +         # phone and email, or only one of them
///     website bonus
/// )
///
/// A total of zero is lifted to the baseline floor so no match is ever
/// returned with a null score.
pub fn calculate_match_score(
    school: &School,
    business: &BusinessContext,
    weights: &ScoringWeights,
) -> ScoredMatch {
    let mut score = 0;
    let mut reasons = Vec::new();

    // Sector relevance
    let (sector_score, sector_reasons) = calculate_sector_score(school, &business.sector, weights);
    score += sector_score;
    reasons.extend(sector_reasons);

    // Geography
    let geo = calculate_geo_score(school, business.location.as_ref());
    score += geo.points;
    reasons.extend(geo.reason);

    if school.is_public && weights.public_bonus > 0 {
        score += weights.public_bonus;
        reasons.push("public establishment".to_string());
    }

    match (school.has_phone(), school.has_email()) {
        (true, true) => {
            score += weights.full_contact_bonus;
            reasons.push("complete contact details (phone and email)".to_string());
        }
        (true, false) | (false, true) => {
            score += weights.partial_contact_bonus;
            reasons.push("partial contact details".to_string());
        }
        (false, false) => {}
    }

    if school.has_website() && weights.website_bonus > 0 {
        score += weights.website_bonus;
        reasons.push("website available".to_string());
    }

    if score == 0 {
        score = weights.baseline_floor.max(1);
        reasons = vec!["included from candidate pool".to_string()];
    }

    ScoredMatch {
        school: school.clone(),
        score,
        distance_km: geo.distance_km.map(round_km),
        reasons,
    }
}

/// Sector relevance points for a number of distinct matched keywords,
/// before the name bonus
#[inline]
pub fn sector_points(matched: usize, weights: &ScoringWeights) -> u32 {
    if matched == 0 {
        return 0;
    }
    let extra = (matched - 1) as u32;
    weights
        .sector_base
        .saturating_add(weights.sector_step.saturating_mul(extra))
        .min(weights.sector_cap)
}

/// Sector relevance score (0-70) with its reasons
pub fn calculate_sector_score(
    school: &School,
    sector: &str,
    weights: &ScoringWeights,
) -> (u32, Vec<String>) {
    let keywords = keywords_for(sector);
    let text = school_text(school);
    let matched = matched_keywords(&text, &keywords);

    let mut reasons = Vec::new();
    let mut points = sector_points(matched.len(), weights);
    if points > 0 {
        reasons.push(format!(
            "matches {} sector keyword{} ({})",
            matched.len(),
            if matched.len() > 1 { "s" } else { "" },
            matched.join(", ")
        ));
    }

    let sector_id = normalize_sector(sector);
    if !sector_id.is_empty() && fold_text(&school.name).contains(&sector_id) {
        points += weights.sector_name_bonus;
        reasons.push(format!("name mentions sector '{}'", sector_id));
    }

    (points, reasons)
}

/// Geographic contribution of a school
#[derive(Debug, Clone, PartialEq)]
pub struct GeoScore {
    pub points: u32,
    pub reason: Option<String>,
    /// Raw haversine distance when both sides have coordinates
    pub distance_km: Option<f64>,
}

/// Points for a distance band
#[inline]
pub fn distance_points(distance_km: f64) -> u32 {
    match distance_km {
        d if d <= 5.0 => 40,
        d if d <= 15.0 => 30,
        d if d <= 30.0 => 20,
        d if d <= 50.0 => 10,
        _ => 5,
    }
}

fn distance_label(distance_km: f64) -> &'static str {
    match distance_km {
        d if d <= 5.0 => "very close",
        d if d <= 15.0 => "close",
        d if d <= 30.0 => "nearby",
        d if d <= 50.0 => "within reach",
        _ => "far away",
    }
}

fn postal_area(postal_code: &str) -> Option<&str> {
    let code = postal_code.trim();
    code.get(..2).filter(|prefix| prefix.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Geographic score (0-40).
///
/// Coordinates on both sides use distance bands; otherwise the commune,
/// department and postal prefix are compared in that order.
pub fn calculate_geo_score(school: &School, location: Option<&Location>) -> GeoScore {
    let none = GeoScore {
        points: 0,
        reason: None,
        distance_km: None,
    };
    let Some(location) = location else {
        return none;
    };

    if let (Some(from), Some(to)) = (location.coordinates(), school.coordinates()) {
        let distance_km = distance_between(from, to);
        return GeoScore {
            points: distance_points(distance_km),
            reason: Some(format!("{} ({:.1} km)", distance_label(distance_km), round_km(distance_km))),
            distance_km: Some(distance_km),
        };
    }

    if let Some(commune) = location.commune().filter(|c| same_text(c, &school.commune)) {
        return GeoScore {
            points: SAME_COMMUNE_POINTS,
            reason: Some(format!("same commune ({})", commune)),
            distance_km: None,
        };
    }

    if let Some(department) = location.department().filter(|d| same_text(d, &school.department)) {
        return GeoScore {
            points: SAME_DEPARTMENT_POINTS,
            reason: Some(format!("same department ({})", department)),
            distance_km: None,
        };
    }

    let business_area = location.postal_code().and_then(postal_area);
    if let Some(area) = business_area.filter(|area| postal_area(&school.postal_code) == Some(*area)) {
        return GeoScore {
            points: SAME_POSTAL_AREA_POINTS,
            reason: Some(format!("same postal area ({})", area)),
            distance_km: None,
        };
    }

    none
}

use actix_web::{web, HttpResponse, Responder};
use crate::core::{normalize_tax_id, sectors::sector_table, MatchingError};
use crate::models::{ErrorResponse, HealthResponse, MatchingCriteria, SectorResponse};
use crate::services::{CachedRegistry, MatchingService, RegistrySource};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MatchingService>,
    /// Cache in front of the live registry, reported by the health check
    pub registry_cache: Option<Arc<CachedRegistry>>,
}

/// Configure all matching-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matching/search", web::post().to(search))
        .route("/sectors", web::get().to(list_sectors))
        .route("/businesses/{tax_id}", web::get().to(get_business));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        registry_cache: state.registry_cache.as_ref().map(|cache| cache.stats()),
    })
}

/// Search schools for a business
///
/// POST /api/v1/matching/search
///
/// Request body:
/// ```json
/// {
///   "business": { "taxId": "string", "sector": "string", "location": { "commune": "string" } },
///   "preferences": { "maxDistanceKm": 30, "establishmentType": "public", "maxResults": 10 }
/// }
/// ```
async fn search(state: web::Data<AppState>, req: web::Json<MatchingCriteria>) -> impl Responder {
    let request_id = uuid::Uuid::new_v4();

    if let Err(errors) = req.validate_all() {
        tracing::info!("[{}] Validation failed for search request: {:?}", request_id, errors);
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Validation failed",
            errors.to_string(),
        );
    }

    tracing::info!(
        "[{}] Searching schools: sector={:?}, taxId={:?}",
        request_id,
        req.business.as_ref().and_then(|b| b.sector()),
        req.business.as_ref().and_then(|b| b.tax_id())
    );

    match state.service.search(&req).await {
        Ok(result) => {
            tracing::info!("[{}] Returning {} matches", request_id, result.matches.len());
            HttpResponse::Ok().json(result)
        }
        Err(MatchingError::InvalidCriteria(message)) => {
            tracing::info!("[{}] Invalid criteria: {}", request_id, message);
            error_response(actix_web::http::StatusCode::BAD_REQUEST, "Invalid criteria", message)
        }
    }
}

/// Canonical sector keyword table
///
/// GET /api/v1/sectors
async fn list_sectors() -> impl Responder {
    let sectors: Vec<SectorResponse> = sector_table()
        .map(|(id, keywords)| SectorResponse {
            id: id.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect();

    HttpResponse::Ok().json(sectors)
}

/// Look up a business in the registry
///
/// GET /api/v1/businesses/{taxId}
async fn get_business(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let raw = path.into_inner();
    let Some(tax_id) = normalize_tax_id(&raw) else {
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "Invalid tax id",
            format!("'{}' is not a SIRET (14 digits) or SIREN (9 digits)", raw),
        );
    };

    match state.service.registry().resolve_business(&tax_id).await {
        Ok(Some(business)) => HttpResponse::Ok().json(business),
        Ok(None) => error_response(
            actix_web::http::StatusCode::NOT_FOUND,
            "Business not found",
            format!("No business registered under {}", tax_id),
        ),
        Err(e) => {
            tracing::warn!("Registry lookup failed for {}: {}", tax_id, e);
            error_response(
                actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                "Registry unavailable",
                e.to_string(),
            )
        }
    }
}

use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use lycee_match::config::{LoggingSettings, Settings};
use lycee_match::core::Matcher;
use lycee_match::routes::{self, AppState};
use lycee_match::services::{
    CachedRegistry, CompanyRegistryClient, DirectorySource, EducationDirectoryClient, FallbackRegistry,
    MatchingService, RegistrySource, StaticDirectory, StaticRegistry,
};
use std::sync::Arc;
use tracing::{info, error};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// LOG_LEVEL and LOG_FORMAT override the configured logging section
fn init_logging(logging: &LoggingSettings) {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

fn config_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("Configuration error: {}", e))
}

fn build_directory(settings: &Settings) -> std::io::Result<Arc<dyn DirectorySource>> {
    if let Some(path) = &settings.directory.static_path {
        let directory = StaticDirectory::from_json_file(path).map_err(config_error)?;
        info!("Serving {} schools from {}", directory.len(), path);
        return Ok(Arc::new(directory));
    }

    let client = EducationDirectoryClient::new(
        settings.directory.endpoint.clone(),
        settings.directory.dataset.clone(),
        settings.directory.timeout_secs.unwrap_or(10),
    )
    .map_err(config_error)?;

    info!(
        "School directory client initialized ({}, dataset {})",
        settings.directory.endpoint, settings.directory.dataset
    );
    Ok(Arc::new(client))
}

/// Live registry behind the cache, with the static dataset as fallback.
///
/// Only live answers are cached; fallback answers are served fresh each time.
fn build_registry(settings: &Settings) -> std::io::Result<(Arc<dyn RegistrySource>, Arc<CachedRegistry>)> {
    let live: Arc<dyn RegistrySource> = Arc::new(
        CompanyRegistryClient::new(
            settings.registry.endpoint.clone(),
            settings.registry.timeout_secs.unwrap_or(5),
        )
        .map_err(config_error)?,
    );

    let capacity = settings.cache.capacity.unwrap_or(10_000);
    let ttl_secs = settings.cache.ttl_secs.unwrap_or(3600);
    let cached = Arc::new(CachedRegistry::new(live, capacity, ttl_secs));
    info!("Registry cache initialized ({} entries, TTL: {}s)", capacity, ttl_secs);

    let registry: Arc<dyn RegistrySource> = if settings.registry.static_fallback {
        let fallback = match &settings.registry.fallback_path {
            Some(path) => StaticRegistry::from_json_file(path).map_err(config_error)?,
            None => StaticRegistry::builtin(),
        };
        info!("Registry fallback enabled ({} businesses)", fallback.len());
        Arc::new(FallbackRegistry::new(cached.clone(), Arc::new(fallback)))
    } else {
        cached.clone()
    };

    Ok((registry, cached))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(config_error(e));
        }
    };

    init_logging(&settings.logging);

    info!("Starting Lycee Match service...");

    let directory = build_directory(&settings).map_err(|e| {
        error!("Failed to initialize school directory: {}", e);
        e
    })?;
    let (registry, registry_cache) = build_registry(&settings).map_err(|e| {
        error!("Failed to initialize company registry: {}", e);
        e
    })?;

    let weights = settings.scoring_weights();
    let matcher = Matcher::new(weights);
    info!("Matcher initialized with weights: {:?}", weights);

    let search_settings = settings.search_settings();
    info!(
        "Search defaults: {} km, {} results (cap {})",
        search_settings.defaults.max_distance_km,
        search_settings.defaults.max_results,
        search_settings.max_results_cap
    );

    let app_state = AppState {
        service: Arc::new(MatchingService::new(directory, registry, matcher, search_settings)),
        registry_cache: Some(registry_cache),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}

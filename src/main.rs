use actix_cors::Cors;
use actix_web::{App, HttpServer, http, middleware::Logger, web};
use dotenv::dotenv;
use env_logger::Env;
use std::sync::Arc;

use storefront_analytics::config::{Settings, StorageBackend};
use storefront_analytics::db::memory::MemoryStore;
use storefront_analytics::db::mongodb::{MongoStore, get_database};
use storefront_analytics::db::store::AnalyticsStore;
use storefront_analytics::middlewares::session_mw::SESSION_HEADER;
use storefront_analytics::routes::init_routes;
use storefront_analytics::state::app_state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize the store
    let store: Arc<dyn AnalyticsStore> = match settings.storage {
        StorageBackend::MongoDb => {
            let db = match get_database(&settings).await {
                Ok(db) => db,
                Err(e) => {
                    log::error!("Error connecting to the database: {:#}", e);
                    std::process::exit(1);
                }
            };
            let store = MongoStore::new(db);
            if let Err(e) = store.ensure_indexes().await {
                log::error!("Error creating indexes: {:#}", e);
                std::process::exit(1);
            }
            Arc::new(store)
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Create shared state
    let app_state = web::Data::new(AppState {
        store,
        tracking: settings.tracking.clone(),
        reports: settings.reports.clone(),
        ip_hash_salt: settings.ip_hash_salt.clone(),
        cookie_secure: settings.cookie_secure,
    });

    let origins = settings.allowed_origins.clone();
    log::info!(
        "Listening on {}:{}",
        settings.bind_address,
        settings.port
    );

    HttpServer::new(move || {
        let logger = Logger::new("%a \"%r\" %s %b \"%{Referer}i\" \"%{User-Agent}i\" %D ms");
        let cors = origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![http::header::ACCEPT, http::header::CONTENT_TYPE])
            .allowed_header(SESSION_HEADER)
            .supports_credentials()
            .max_age(3600);
        App::new()
            .wrap(logger)
            .wrap(cors)
            .app_data(app_state.clone())
            .configure(init_routes)
    })
    .bind((settings.bind_address.as_str(), settings.port))?
    .run()
    .await
}

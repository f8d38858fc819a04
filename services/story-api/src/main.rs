use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use shared::config::Settings;
use shared::tales::TaleCatalog;

mod routes;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let settings = Settings::new().unwrap_or_else(|e| {
        warn!(%e, "failed to read settings from environment, using defaults");
        Settings::default()
    });
    let catalog = TaleCatalog::load_or_builtin(&settings.tale_catalog_path);
    info!(
        tales = catalog.len(),
        model = %settings.story_model,
        "story-api starting on {}:{}",
        settings.bind_host,
        settings.bind_port
    );

    let bind = (settings.bind_host.clone(), settings.bind_port);
    let settings = web::Data::new(settings);
    let catalog = web::Data::new(catalog);
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(settings.clone())
            .app_data(catalog.clone())
            .route("/", web::get().to(routes::root))
            .route("/health", web::get().to(routes::health))
            .service(
                web::scope("/api")
                    .route("/tales", web::get().to(routes::tales))
                    .route("/generate-tale", web::post().to(routes::generate_tale)),
            )
    })
    .bind(bind)?
    .run()
    .await?;
    Ok(())
}

use actix_web::{web, App, HttpResponse, HttpServer, middleware::Compress};
use actix_cors::Cors;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;

use anonboard::config::{Config, StoreKind};
use anonboard::openapi::ApiDoc;
use anonboard::repo::{inmem::InMemRepo, mongo::MongoRepo, ThreadRepo};
use anonboard::{pages, routes, AppState, SecurityHeaders, ThreadService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env automatically only in debug builds; production takes the real environment.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping message board");
    let config = Config::from_env().map_err(|e| {
        error!("invalid configuration: {e:#}");
        e
    })?;

    let repo: Arc<dyn ThreadRepo> = match &config.store {
        StoreKind::Mongo { uri, db_name } => {
            info!("Using MongoDB repository backend");
            let repo = MongoRepo::connect(uri, db_name).await.map_err(|e| {
                error!("could not reach MongoDB: {e}");
                e
            })?;
            Arc::new(repo)
        }
        StoreKind::Memory => {
            info!("Using in-memory repository backend (data is lost on exit)");
            Arc::new(InMemRepo::new())
        }
    };
    let service = ThreadService::new(repo);
    let state = AppState::new(service.clone()).with_site_title(config.site_title.clone());

    let openapi = ApiDoc::openapi();
    let security = SecurityHeaders::from_env();

    let server = HttpServer::new(move || {
        // anonymous API: any origin, no credentials
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_header()
            .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .max_age(3600);

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .configure(routes::config)
            .configure(pages::config)
            .service(SwaggerUi::new("/docs/{_:.*}").url("/docs/openapi.json", openapi.clone()))
            .default_service(web::to(|| async {
                HttpResponse::NotFound().content_type("text/plain; charset=utf-8").body("Not Found")
            }))
    })
    .bind((config.host.as_str(), config.port))?;

    info!("Listening on http://{}:{}", config.host, config.port);

    server.run().await?;

    service.shutdown().await;
    info!("Server stopped");
    Ok(())
}

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use common::{db::PgStore, DocumentStore, MemoryStore};
use donation_api::{
    auth::{FirebaseVerifier, IdentityVerifier, SecretVerifier},
    config::{Config, IdentityConfig},
    configure,
    security::configure_cors,
    AppState,
};
use dotenv::dotenv;
use payments::{PaymentGateway, StripeClient};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting the donation api");
    let config = Config::from_env()?;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(db_url) => {
            info!("Connecting to the document database");
            Arc::new(PgStore::establish_connection(db_url).await?)
        }
        None => {
            warn!("DATABASE_URL is not set, documents will only live in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier: Arc<dyn IdentityVerifier> = match &config.identity {
        IdentityConfig::Firebase { project_id } => {
            info!("Verifying Firebase ID tokens for project {}", project_id);
            Arc::new(FirebaseVerifier::new(project_id.clone(), config.request_timeout)?)
        }
        IdentityConfig::SharedSecret { secret } => {
            warn!("Verifying tokens with JWT_SECRET, not for production use");
            Arc::new(SecretVerifier::new(secret.clone()))
        }
    };

    let payments: Arc<dyn PaymentGateway> = Arc::new(StripeClient::new(
        config.stripe_secret_key.clone(),
        config.request_timeout,
    )?);

    let app_state = web::Data::new(AppState::new(store, verifier, payments));
    let allowed_origins = config.allowed_origins.clone();

    info!("Starting HTTP server on {}", config.server_address());
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(Logger::default())
            .wrap(configure_cors(&allowed_origins))
            .configure(configure)
    })
    .client_request_timeout(config.request_timeout)
    .bind(config.server_address())?
    .run()
    .await?;

    Ok(())
}

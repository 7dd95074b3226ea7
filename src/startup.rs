use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::SessionService;
use crate::configuration::DatabaseSettings;
use crate::error::{AppError, StoreError};
use crate::logger::LoggerMiddleware;
use crate::middleware::BearerAuth;
use crate::routes::{
    create_user, get_current_user, health_check, login, polka_webhook, refresh, revoke,
    update_user, ServiceApiKey,
};
use crate::store::{InMemoryStore, PgStore, RefreshTokenStore, UserStore};

/// Storage collaborators handed to the session service
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenStore>,
}

/// Connect to Postgres and migrate, or fall back to the in-memory store
pub async fn build_stores(database: Option<&DatabaseSettings>) -> Result<Stores, StoreError> {
    match database {
        Some(settings) => {
            tracing::info!(host = %settings.host, database = %settings.database_name, "Connecting to database");
            let pool = PgPoolOptions::new()
                .max_connections(settings.max_connections)
                .connect(&settings.connection_string())
                .await?;

            let store = Arc::new(PgStore::new(pool));
            store.migrate().await?;
            tracing::info!("Database migrations applied");

            Ok(Stores {
                users: store.clone(),
                refresh_tokens: store,
            })
        }
        None => {
            tracing::warn!("No database configured; using in-memory store");
            let store = Arc::new(InMemoryStore::new());
            Ok(Stores {
                users: store.clone(),
                refresh_tokens: store,
            })
        }
    }
}

pub fn run(
    listener: TcpListener,
    session: SessionService,
    api_key: ServiceApiKey,
) -> Result<Server, std::io::Error> {
    let token_secret = session.settings().token_secret.clone();
    let session = web::Data::new(session);
    let api_key = web::Data::new(api_key);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(session.clone())
            .app_data(api_key.clone())
            .app_data(
                web::JsonConfig::default()
                    .error_handler(|err, _req| AppError::from(err).into()),
            )
            .route("/api/healthz", web::get().to(health_check))
            .route("/api/users", web::post().to(create_user))
            .route("/api/users", web::put().to(update_user))
            .route("/api/login", web::post().to(login))
            .route("/api/refresh", web::post().to(refresh))
            .route("/api/revoke", web::post().to(revoke))
            .route("/api/polka/webhooks", web::post().to(polka_webhook))
            // Protected routes (require a valid access token)
            .service(
                web::scope("/api/me")
                    .wrap(BearerAuth::new(&token_secret))
                    .route("", web::get().to(get_current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

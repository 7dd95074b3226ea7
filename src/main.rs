use std::net::TcpListener;

use chirpy::auth::{SessionService, SessionSettings};
use chirpy::configuration::get_configuration;
use chirpy::routes::ServiceApiKey;
use chirpy::startup::{build_stores, run};
use chirpy::telemetry::init_telemetry;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    if let Err(e) = init_telemetry("info") {
        eprintln!("Failed to initialize logging: {}", e);
    }

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!(auth = ?config.auth, "Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(startup_error(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let stores = build_stores(configuration.database.as_ref())
        .await
        .map_err(|e| {
            tracing::error!("Failed to initialize storage: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Storage error")
        })?;

    let session = SessionService::new(
        stores.users,
        stores.refresh_tokens,
        SessionSettings::from(&configuration.auth),
    )
    .map_err(|e| {
        tracing::error!("Failed to initialize session service: {}", e);
        startup_error(std::io::ErrorKind::Other, "Session service error")
    })?;

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(
        listener,
        session,
        ServiceApiKey(configuration.auth.api_key.clone()),
    )?;

    server.await
}

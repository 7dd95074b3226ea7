use config::ConfigError;
use std::fmt;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    /// Absent means the service runs on the in-memory stores.
    pub database: Option<DatabaseSettings>,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Server-level connection, used to create a database before migrating it
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_name", &self.database_name)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Session credential settings
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// HMAC key for access tokens. Never logged.
    pub token_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_days: i64,
    pub bcrypt_cost: u32,
    /// Key expected in `Authorization: ApiKey <key>` on the webhook.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl AuthSettings {
    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_ttl_seconds)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_ttl_days)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_secret.trim().is_empty() {
            return Err(ConfigError::Message(
                "auth.token_secret must not be empty".to_string(),
            ));
        }
        if self.access_token_ttl_seconds <= 0 || self.refresh_token_ttl_days <= 0 {
            return Err(ConfigError::Message(
                "auth token lifetimes must be positive".to_string(),
            ));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::Message(format!(
                "auth.bcrypt_cost {} is outside 4..=31",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("token_secret", &"[redacted]")
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_days", &self.refresh_token_ttl_days)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Load settings from `configuration.*` (optional) and `APP_*` environment
/// variables, e.g. `APP_AUTH__TOKEN_SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("auth.access_token_ttl_seconds", 3600)?
        .set_default("auth.refresh_token_ttl_days", 60)?
        .set_default("auth.bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    settings.auth.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_settings() -> AuthSettings {
        AuthSettings {
            token_secret: "super-secret-value".to_string(),
            access_token_ttl_seconds: 3600,
            refresh_token_ttl_days: 60,
            bcrypt_cost: 10,
            api_key: Some("f271c81ff7084ee5b99a5091b42d486e".to_string()),
        }
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let rendered = format!("{:?}", auth_settings());
        assert!(!rendered.contains("super-secret-value"));
        assert!(!rendered.contains("f271c81ff7084ee5b99a5091b42d486e"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let mut settings = auth_settings();
        settings.token_secret = "   ".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn out_of_range_cost_is_rejected() {
        let mut settings = auth_settings();
        settings.bcrypt_cost = 2;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn ttls_convert_to_durations() {
        let settings = auth_settings();
        assert_eq!(settings.access_token_ttl(), chrono::Duration::hours(1));
        assert_eq!(settings.refresh_token_ttl(), chrono::Duration::days(60));
    }
}

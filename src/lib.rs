use std::sync::Arc;

use sqlx::SqlitePool;

pub mod api;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod mailer;
pub mod pages;
pub mod weather;

use crate::{
    auth::JwtKeys, chat::ChatRoom, config::Config, error::AppError, mailer::ResetMailer,
    weather::WeatherClient,
};

/// Everything a request handler can reach.
pub struct AppState {
    pub db: SqlitePool,
    pub keys: Arc<JwtKeys>,
    pub weather: WeatherClient,
    pub mailer: Arc<dyn ResetMailer>,
    pub chat: Arc<ChatRoom>,
    /// Prefix of the links placed in password-reset mails.
    pub public_base_url: String,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Connects the database (creating tables if needed) and builds the
    /// outbound clients described by `config`.
    pub async fn from_config(config: &Config) -> Result<SharedState, AppError> {
        let db = db::connect(&config.database_url).await?;
        db::migrate(&db).await?;

        Ok(Arc::new(AppState {
            db,
            keys: Arc::new(JwtKeys::new(&config.jwt_secret, config.session_ttl)),
            weather: WeatherClient::new(&config.weather_url, &config.weather_api_key),
            mailer: Arc::from(mailer::from_config(&config.smtp)?),
            chat: Arc::new(ChatRoom::new()),
            public_base_url: config.public_base_url.clone(),
        }))
    }
}

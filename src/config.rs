use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub images_profile_path: PathBuf,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let images_profile_path = std::env::var("IMAGES_PROFILE_PATH")
            .unwrap_or_else(|_| "./var/images/profile".into())
            .into();
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "useradmin".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "useradmin-admins".into()),
        };
        Ok(Self {
            database_url,
            images_profile_path,
            jwt,
        })
    }
}

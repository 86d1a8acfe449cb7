use std::env;
use std::path::PathBuf;

use crate::geocoder::NaverCredentials;

/// Default photo size limit (10 MiB)
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub max_photo_bytes: usize,
    pub naver_credentials: Option<NaverCredentials>,
    pub naver_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            max_photo_bytes: env::var("MAX_PHOTO_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_PHOTO_BYTES),
            naver_credentials: naver_credentials_from_env(),
            naver_base_url: env::var("NAVER_MAPS_BASE_URL").ok().filter(|v| !v.is_empty()),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

/// Both halves must be present; a lone id or secret counts as unconfigured
pub fn naver_credentials_from_env() -> Option<NaverCredentials> {
    let client_id = env::var("NAVER_MAPS_CLIENT_ID").ok().filter(|v| !v.is_empty())?;
    let client_secret = env::var("NAVER_MAPS_CLIENT_SECRET")
        .ok()
        .filter(|v| !v.is_empty())?;

    Some(NaverCredentials {
        client_id,
        client_secret,
    })
}

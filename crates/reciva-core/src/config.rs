//! Configuration module
//!
//! Environment-based configuration for the API and background services.
//! `Config::from_env` reads (and `.env`-loads via dotenvy) every setting;
//! `validate` is called once at startup so misconfiguration fails fast.

use std::env;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 3600;
const DEFAULT_FILE_RETENTION_DAYS: i64 = 30;
const DEFAULT_TASK_MAX_WORKERS: usize = 2;
const DEFAULT_TASK_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_TASK_MAX_RETRIES: i32 = 2;

/// Which storage backend to use for uploaded receipt files.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackendKind {
    Local,
    S3,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,

    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,

    pub storage_backend: StorageBackendKind,
    pub local_storage_path: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,

    /// Base URL of the external OCR/extraction service.
    pub extraction_base_url: String,
    /// Optional bearer key forwarded to the extraction service.
    pub extraction_api_key: Option<String>,

    /// Secret for signing/verifying user access tokens.
    pub token_secret: String,
    /// Shared secret for subscription webhook signature verification.
    pub webhook_secret: String,

    pub cleanup_interval_secs: u64,
    /// Days before a non-permanent processed file expires and is swept.
    pub file_retention_days: i64,

    pub task_queue_max_workers: usize,
    pub task_queue_poll_interval_ms: u64,
    pub task_queue_max_retries: i32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = match env::var("STORAGE_BACKEND").as_deref() {
            Ok("s3") => StorageBackendKind::S3,
            Ok("local") | Err(_) => StorageBackendKind::Local,
            Ok(other) => {
                anyhow::bail!("Invalid STORAGE_BACKEND: {} (expected 'local' or 's3')", other)
            }
        };

        Ok(Config {
            server_port: env_parse("SERVER_PORT", DEFAULT_PORT)?,
            cors_origins: env::var("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECS)?,

            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),

            extraction_base_url: env::var("EXTRACTION_BASE_URL")
                .map_err(|_| anyhow::anyhow!("EXTRACTION_BASE_URL must be set"))?,
            extraction_api_key: env::var("EXTRACTION_API_KEY").ok(),

            token_secret: env::var("TOKEN_SECRET")
                .map_err(|_| anyhow::anyhow!("TOKEN_SECRET must be set"))?,
            webhook_secret: env::var("WEBHOOK_SECRET")
                .map_err(|_| anyhow::anyhow!("WEBHOOK_SECRET must be set"))?,

            cleanup_interval_secs: env_parse("CLEANUP_INTERVAL_SECS", DEFAULT_CLEANUP_INTERVAL_SECS)?,
            file_retention_days: env_parse("FILE_RETENTION_DAYS", DEFAULT_FILE_RETENTION_DAYS)?,

            task_queue_max_workers: env_parse("TASK_QUEUE_MAX_WORKERS", DEFAULT_TASK_MAX_WORKERS)?,
            task_queue_poll_interval_ms: env_parse(
                "TASK_QUEUE_POLL_INTERVAL_MS",
                DEFAULT_TASK_POLL_INTERVAL_MS,
            )?,
            task_queue_max_retries: env_parse("TASK_QUEUE_MAX_RETRIES", DEFAULT_TASK_MAX_RETRIES)?,
        })
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.token_secret.len() < 32 {
            anyhow::bail!("TOKEN_SECRET must be at least 32 bytes");
        }
        if self.webhook_secret.is_empty() {
            anyhow::bail!("WEBHOOK_SECRET must not be empty");
        }
        match self.storage_backend {
            StorageBackendKind::Local => {
                if self.local_storage_path.is_none() {
                    anyhow::bail!("LOCAL_STORAGE_PATH must be set for local storage");
                }
            }
            StorageBackendKind::S3 => {
                if self.s3_bucket.is_none() {
                    anyhow::bail!("S3_BUCKET must be set for s3 storage");
                }
            }
        }
        if !self.extraction_base_url.starts_with("http://")
            && !self.extraction_base_url.starts_with("https://")
        {
            anyhow::bail!("EXTRACTION_BASE_URL must be an http(s) URL");
        }
        if self.task_queue_max_workers == 0 {
            anyhow::bail!("TASK_QUEUE_MAX_WORKERS must be at least 1");
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            server_port: 3000,
            cors_origins: vec![],
            environment: "test".to_string(),
            database_url: "postgres://localhost/reciva".to_string(),
            db_max_connections: 5,
            db_timeout_seconds: 30,
            storage_backend: StorageBackendKind::Local,
            local_storage_path: Some("/tmp/reciva".to_string()),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            extraction_base_url: "http://localhost:8000".to_string(),
            extraction_api_key: None,
            token_secret: "0123456789abcdef0123456789abcdef".to_string(),
            webhook_secret: "whsec".to_string(),
            cleanup_interval_secs: 3600,
            file_retention_days: 30,
            task_queue_max_workers: 2,
            task_queue_poll_interval_ms: 1000,
            task_queue_max_retries: 2,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn short_token_secret_rejected() {
        let mut config = base_config();
        config.token_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn local_storage_requires_path() {
        let mut config = base_config();
        config.local_storage_path = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn s3_storage_requires_bucket() {
        let mut config = base_config();
        config.storage_backend = StorageBackendKind::S3;
        assert!(config.validate().is_err());
        config.s3_bucket = Some("receipts".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_http_extraction_url_rejected() {
        let mut config = base_config();
        config.extraction_base_url = "ftp://ocr".to_string();
        assert!(config.validate().is_err());
    }
}

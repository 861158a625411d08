use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Where uploaded product images end up.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        root: PathBuf,
    },
    S3 {
        endpoint: String,
        bucket: String,
        access_key: String,
        secret_key: String,
        region: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Public base URL, used to build pagination links.
    pub app_url: String,
    /// `APP_HOST:APP_PORT`, what the HTTP server binds.
    pub listen_addr: SocketAddr,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "catalog".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "catalog-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(60),
        };
        let app_url = std::env::var("APP_URL")
            .unwrap_or_else(|_| "http://localhost:8080".into())
            .trim_end_matches('/')
            .to_string();
        let listen_addr = listen_addr(|key| std::env::var(key).ok())?;
        let driver = std::env::var("STORAGE_DRIVER").unwrap_or_else(|_| "local".into());
        let storage = StorageConfig::from_driver(&driver, |key| std::env::var(key).ok())?;

        Ok(Self {
            database_url,
            app_url,
            listen_addr,
            jwt,
            storage,
        })
    }
}

fn listen_addr(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<SocketAddr> {
    let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
    let port = lookup("APP_PORT").unwrap_or_else(|| "8080".into());
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid APP_HOST/APP_PORT {host}:{port}"))
}

impl StorageConfig {
    fn from_driver(
        driver: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key).with_context(|| format!("{key} is required for the s3 storage driver"))
        };
        match driver.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local {
                root: lookup("STORAGE_ROOT")
                    .unwrap_or_else(|| "storage/app/public".into())
                    .into(),
            }),
            "s3" => Ok(Self::S3 {
                endpoint: required("S3_ENDPOINT")?,
                bucket: required("S3_BUCKET")?,
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
                region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
            }),
            other => anyhow::bail!("unknown STORAGE_DRIVER {other:?}, expected local or s3"),
        }
    }
}

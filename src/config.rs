use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MongoDb,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(StorageBackend::MongoDb),
            "memory" => Ok(StorageBackend::Memory),
            other => bail!("Unknown storage backend: {}", other),
        }
    }
}

/// Server settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub port: u16,
    pub bind_address: String,
    pub storage: StorageBackend,
    pub mongodb_uri: Option<String>,
    pub database_name: String,
    pub allowed_origins: Vec<String>,
    pub cookie_secure: bool,
    pub ip_hash_salt: String,
    pub tracking: TrackingSettings,
    pub reports: ReportSettings,
}

#[derive(Debug, Clone)]
pub struct TrackingSettings {
    pub bounce_threshold_ms: i64,
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub default_period_days: u32,
    pub max_period_days: u32,
    pub popular_pages_limit: usize,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            bounce_threshold_ms: 10_000,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            default_period_days: 30,
            max_period_days: 365,
            popular_pages_limit: 10,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let storage: StorageBackend = var_or("STORAGE_BACKEND", "mongodb").parse()?;
        let mongodb_uri = env::var("MONGODB_URI").ok();
        if storage == StorageBackend::MongoDb && mongodb_uri.is_none() {
            bail!("MONGODB_URI not set");
        }

        let allowed_origins = var_or(
            "ALLOWED_ORIGINS",
            "http://localhost:5173,http://localhost:4173",
        )
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();

        let tracking = TrackingSettings {
            bounce_threshold_ms: parse_var("BOUNCE_THRESHOLD_MS", 10_000)?,
        };

        let reports = ReportSettings {
            default_period_days: parse_var("DEFAULT_REPORT_PERIOD_DAYS", 30)?,
            max_period_days: parse_var("MAX_REPORT_PERIOD_DAYS", 365)?,
            popular_pages_limit: parse_var("POPULAR_PAGES_LIMIT", 10)?,
        };
        if reports.default_period_days == 0 || reports.default_period_days > reports.max_period_days {
            bail!("DEFAULT_REPORT_PERIOD_DAYS must be between 1 and MAX_REPORT_PERIOD_DAYS");
        }

        let ip_hash_salt = env::var("IP_HASH_SALT").unwrap_or_else(|_| {
            log::warn!("IP_HASH_SALT not set, using the built-in salt");
            "storefront_analytics_salt".to_string()
        });

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            bind_address: var_or("BIND_ADDRESS", "127.0.0.1"),
            storage,
            mongodb_uri,
            database_name: var_or("DATABASE_NAME", "storefront_analytics"),
            allowed_origins,
            cookie_secure: parse_var("SESSION_COOKIE_SECURE", false)?,
            ip_hash_salt,
            tracking,
            reports,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_storage_backend_names() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(" MongoDB ".parse::<StorageBackend>().unwrap(), StorageBackend::MongoDb);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn defaults_match_reference_behaviour() {
        assert_eq!(TrackingSettings::default().bounce_threshold_ms, 10_000);
        let reports = ReportSettings::default();
        assert_eq!(reports.default_period_days, 30);
        assert_eq!(reports.popular_pages_limit, 10);
    }
}

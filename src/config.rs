use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDRESS: ([u8; 4], u16) = ([127, 0, 0, 1], 3001);
const DEFAULT_RECORDS_PER_PAGE: usize = 10;
const DEFAULT_INDEX_CACHE_TTL_SECS: u64 = 20;
const DEFAULT_MEDIA_ROOT: &str = "media";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_address: SocketAddr,
    /// Page size for every paginated listing.
    pub records_per_page: usize,
    /// How long a rendered home listing is served before it is recomputed.
    pub index_cache_ttl: Duration,
    pub media_root: PathBuf,
}

impl Config {
    /// Reads the configuration from the process environment. Call `dotenvy::dotenv()`
    /// first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let bind_address = match std::env::var("BIND_ADDRESS") {
            Ok(address) => address
                .parse()
                .context("BIND_ADDRESS must be a socket address")?,
            Err(_) => SocketAddr::from(DEFAULT_BIND_ADDRESS),
        };
        let records_per_page = parse_or("RECORDS_PER_PAGE", DEFAULT_RECORDS_PER_PAGE)?;
        if records_per_page == 0 {
            anyhow::bail!("RECORDS_PER_PAGE must be positive");
        }
        let ttl = parse_or("INDEX_CACHE_TTL_SECS", DEFAULT_INDEX_CACHE_TTL_SECS)?;
        let media_root = std::env::var("MEDIA_ROOT")
            .unwrap_or_else(|_| DEFAULT_MEDIA_ROOT.to_owned())
            .into();

        Ok(Config {
            database_url,
            jwt_secret,
            bind_address,
            records_per_page,
            index_cache_ttl: Duration::from_secs(ttl),
            media_root,
        })
    }

    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Config {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            bind_address: SocketAddr::from(DEFAULT_BIND_ADDRESS),
            records_per_page: DEFAULT_RECORDS_PER_PAGE,
            index_cache_ttl: Duration::from_secs(DEFAULT_INDEX_CACHE_TTL_SECS),
            media_root: DEFAULT_MEDIA_ROOT.into(),
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", key, value)),
        Err(_) => Ok(default),
    }
}

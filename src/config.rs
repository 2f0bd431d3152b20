use std::{fmt, net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{bail, Context};
use tracing::warn;

/// Used when `JWT_SECRET` is absent outside production. Never valid in production.
pub const DEV_JWT_SECRET: &str = "clinicdesk-insecure-development-secret";
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

pub const DEFAULT_HASH_TIME_COST: u32 = 2;
pub const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" | "test" | "local" => Ok(Self::Development),
            other => bail!("unknown APP_ENV {other:?}"),
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

/// Argon2 work factor.
#[derive(Debug, Clone, Copy)]
pub struct HashConfig {
    pub time_cost: u32,
    pub memory_kib: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub jwt: JwtConfig,
    pub hashing: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Production refuses to start
    /// without an explicit signing secret and work factor; other environments
    /// fall back to insecure defaults and say so loudly.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("APP_ENV") {
            Some(v) => v.parse()?,
            None => Environment::Development,
        };
        let production = environment == Environment::Production;

        let database_url = get("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = match get("JWT_SECRET") {
            Some(secret) => {
                if production && secret.len() < MIN_PRODUCTION_SECRET_LEN {
                    bail!("JWT_SECRET must be at least {MIN_PRODUCTION_SECRET_LEN} bytes in production");
                }
                secret
            }
            None if production => bail!("JWT_SECRET must be set when APP_ENV=production"),
            None => {
                warn!("JWT_SECRET not set; signing tokens with the insecure development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let hashing = match (get("HASH_TIME_COST"), get("HASH_MEMORY_KIB")) {
            (Some(t), Some(m)) => HashConfig {
                time_cost: parse_value("HASH_TIME_COST", &t)?,
                memory_kib: parse_value("HASH_MEMORY_KIB", &m)?,
            },
            _ if production => {
                bail!("HASH_TIME_COST and HASH_MEMORY_KIB must be set when APP_ENV=production")
            }
            (t, m) => {
                warn!("password hash work factor not fully configured; using development defaults");
                HashConfig {
                    time_cost: t
                        .map(|v| parse_value("HASH_TIME_COST", &v))
                        .transpose()?
                        .unwrap_or(DEFAULT_HASH_TIME_COST),
                    memory_kib: m
                        .map(|v| parse_value("HASH_MEMORY_KIB", &v))
                        .transpose()?
                        .unwrap_or(DEFAULT_HASH_MEMORY_KIB),
                }
            }
        };

        let jwt = JwtConfig {
            secret,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "clinicdesk".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "clinicdesk-doctors".into()),
        };

        Ok(Self {
            environment,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: get("APP_PORT")
                .map(|v| parse_value("APP_PORT", &v))
                .transpose()?
                .unwrap_or(8080),
            database_url,
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .map(|v| parse_value("DB_MAX_CONNECTIONS", &v))
                .transpose()?
                .unwrap_or(10),
            db_acquire_timeout: Duration::from_secs(
                get("DB_ACQUIRE_TIMEOUT_SECS")
                    .map(|v| parse_value("DB_ACQUIRE_TIMEOUT_SECS", &v))
                    .transpose()?
                    .unwrap_or(5),
            ),
            jwt,
            hashing,
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn parse_value<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} has an invalid value {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn development_falls_back_to_defaults() {
        let cfg = load(&[("DATABASE_URL", "postgres://localhost/clinic")]).unwrap();
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.jwt.secret, DEV_JWT_SECRET);
        assert_eq!(cfg.hashing.time_cost, DEFAULT_HASH_TIME_COST);
        assert_eq!(cfg.hashing.memory_kib, DEFAULT_HASH_MEMORY_KIB);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_max_connections, 10);
    }

    #[test]
    fn production_requires_secret() {
        let err = load(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://db/clinic"),
            ("HASH_TIME_COST", "3"),
            ("HASH_MEMORY_KIB", "65536"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn production_rejects_short_secret() {
        let err = load(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://db/clinic"),
            ("JWT_SECRET", "short"),
            ("HASH_TIME_COST", "3"),
            ("HASH_MEMORY_KIB", "65536"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("at least"));
    }

    #[test]
    fn production_requires_work_factor() {
        let err = load(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://db/clinic"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("HASH_TIME_COST"));
    }

    #[test]
    fn production_with_everything_set_loads() {
        let cfg = load(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://db/clinic"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("HASH_TIME_COST", "3"),
            ("HASH_MEMORY_KIB", "65536"),
            ("APP_PORT", "3000"),
        ])
        .unwrap();
        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.hashing.time_cost, 3);
        assert_eq!(cfg.bind_addr().unwrap().port(), 3000);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = load(&[("DATABASE_URL", "postgres://db"), ("APP_PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }

    #[test]
    fn debug_output_redacts_secret() {
        let cfg = load(&[
            ("DATABASE_URL", "postgres://db"),
            ("JWT_SECRET", "super-secret-value"),
        ])
        .unwrap();
        let dbg = format!("{:?}", cfg.jwt);
        assert!(!dbg.contains("super-secret-value"));
    }
}

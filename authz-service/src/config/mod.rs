use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub schema_sync: SchemaSyncConfig,
    pub warming: WarmingConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaSyncConfig {
    pub endpoint: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarmingConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    pub max_concurrent_warms: usize,
    pub warm_hierarchies: bool,
    pub warm_stats: bool,
    pub warm_effective_roles: bool,
    /// Organizations whose views are kept warm.
    pub organizations: Vec<Uuid>,
    /// `(organization, user)` pairs whose effective roles are kept warm.
    pub users: Vec<(Uuid, Uuid)>,
}

impl AuthzConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = AuthzConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("authz-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            redis: RedisConfig {
                url: get_env("REDIS_URL", None, is_prod)?,
            },
            schema_sync: SchemaSyncConfig {
                endpoint: get_env(
                    "SCHEMA_SYNC_ENDPOINT",
                    Some("http://localhost:8443/schema"),
                    is_prod,
                )?,
                enabled: get_env("SCHEMA_SYNC_ENABLED", Some("true"), is_prod)?
                    .parse()
                    .unwrap_or(true),
            },
            warming: WarmingConfig {
                enabled: get_env("CACHE_WARMING_ENABLED", Some("false"), is_prod)?
                    .parse()
                    .unwrap_or(false),
                interval_seconds: get_env("CACHE_WARMING_INTERVAL_SECONDS", Some("300"), is_prod)?
                    .parse()
                    .unwrap_or(300),
                max_concurrent_warms: get_env("CACHE_WARMING_MAX_CONCURRENT", Some("4"), is_prod)?
                    .parse()
                    .unwrap_or(4),
                warm_hierarchies: get_env("CACHE_WARMING_HIERARCHIES", Some("true"), is_prod)?
                    .parse()
                    .unwrap_or(true),
                warm_stats: get_env("CACHE_WARMING_STATS", Some("true"), is_prod)?
                    .parse()
                    .unwrap_or(true),
                warm_effective_roles: get_env(
                    "CACHE_WARMING_EFFECTIVE_ROLES",
                    Some("true"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(true),
                organizations: parse_uuid_list(&get_env(
                    "CACHE_WARMING_ORGANIZATIONS",
                    Some(""),
                    false,
                )?)?,
                users: parse_user_list(&get_env("CACHE_WARMING_USERS", Some(""), false)?)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MAX_CONNECTIONS must be greater than 0"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.warming.enabled && self.warming.interval_seconds == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "CACHE_WARMING_INTERVAL_SECONDS must be greater than 0"
            )));
        }

        if self.warming.enabled && self.warming.max_concurrent_warms == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "CACHE_WARMING_MAX_CONCURRENT must be greater than 0"
            )));
        }

        Ok(())
    }
}

/// Comma-separated UUID list, e.g. `CACHE_WARMING_ORGANIZATIONS=a,b,c`.
fn parse_uuid_list(raw: &str) -> Result<Vec<Uuid>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|e| AppError::ConfigError(anyhow::anyhow!("invalid UUID {}: {}", s, e)))
        })
        .collect()
}

/// Comma-separated `org:user` UUID pairs, e.g. `CACHE_WARMING_USERS=a:b,c:d`.
fn parse_user_list(raw: &str) -> Result<Vec<(Uuid, Uuid)>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let (org, user) = pair.split_once(':').ok_or_else(|| {
                AppError::ConfigError(anyhow::anyhow!("expected org:user pair, got {}", pair))
            })?;
            let org = org.trim().parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("invalid UUID {}: {}", org, e))
            })?;
            let user = user.trim().parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("invalid UUID {}: {}", user, e))
            })?;
            Ok((org, user))
        })
        .collect()
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid_list() {
        assert!(parse_uuid_list("").unwrap().is_empty());
        assert!(parse_uuid_list(" , ").unwrap().is_empty());

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parsed = parse_uuid_list(&format!("{}, {}", a, b)).unwrap();
        assert_eq!(parsed, vec![a, b]);

        assert!(parse_uuid_list("not-a-uuid").is_err());
    }

    #[test]
    fn test_parse_user_list() {
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();
        let parsed = parse_user_list(&format!("{}:{}", org, user)).unwrap();
        assert_eq!(parsed, vec![(org, user)]);

        assert!(parse_user_list("missing-separator").is_err());
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("staging".parse::<Environment>().is_err());
    }
}

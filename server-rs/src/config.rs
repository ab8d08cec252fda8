use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub store: StoreBackend,
    pub db: DbConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub roster: RosterPolicy,
    pub revalidate: RevalidateConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_min: u32,
    pub pool_max: u32,
    pub run_migrations: bool,
}

#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: u8,
    pub key_prefix: String,
    pub match_ttl_secs: u64,
    /// How long an invalidated match key refuses read-through repopulation.
    pub invalidation_hold_secs: u64,
    pub op_timeout_ms: u64,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
}

/// Time windows that gate self-service roster changes.
#[derive(Clone, Copy, Debug)]
pub struct RosterPolicy {
    pub leave_cutoff_hours: i64,
    pub friend_removal_cutoff_hours: i64,
}

impl Default for RosterPolicy {
    fn default() -> Self {
        Self {
            leave_cutoff_hours: 10,
            friend_removal_cutoff_hours: 8,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RevalidateConfig {
    pub url: Option<String>,
    pub secret: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = RosterPolicy::default();
        Self {
            port: env_or_parse("PORT", 3000),
            cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            store: match env_or("STORE_BACKEND", "postgres").to_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                _ => StoreBackend::Postgres,
            },
            db: DbConfig {
                host: env_or("DB_HOST", "localhost"),
                port: env_or_parse("DB_PORT", 5432),
                database: env_or("DB_NAME", "matchday"),
                user: env_or("DB_USER", "matchday"),
                password: env_or("DB_PASSWORD", ""),
                pool_min: env_or_parse("DB_POOL_MIN", 2),
                pool_max: env_or_parse("DB_POOL_MAX", 20),
                run_migrations: env_or_parse("DB_RUN_MIGRATIONS", true),
            },
            redis: RedisConfig {
                host: env_or("REDIS_HOST", "localhost"),
                port: env_or_parse("REDIS_PORT", 6379),
                password: env::var("REDIS_PASSWORD").ok().filter(|s| !s.is_empty()),
                db: env_or_parse("REDIS_DB", 0),
                key_prefix: env_or("REDIS_KEY_PREFIX", ""),
                match_ttl_secs: parse_duration_to_secs(&env_or("MATCH_CACHE_TTL", "12h")),
                invalidation_hold_secs: parse_duration_to_secs(&env_or("MATCH_CACHE_HOLD", "5s")),
                op_timeout_ms: env_or_parse("REDIS_OP_TIMEOUT_MS", 250),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "change-me-to-a-secure-random-string"),
            },
            roster: RosterPolicy {
                leave_cutoff_hours: env_or_parse("LEAVE_CUTOFF_HOURS", defaults.leave_cutoff_hours),
                friend_removal_cutoff_hours: env_or_parse(
                    "FRIEND_REMOVAL_CUTOFF_HOURS",
                    defaults.friend_removal_cutoff_hours,
                ),
            },
            revalidate: RevalidateConfig {
                url: env::var("REVALIDATE_URL").ok().filter(|s| !s.is_empty()),
                secret: env_or("REVALIDATE_SECRET", ""),
            },
        }
    }

    pub fn database_url(&self) -> String {
        if let Ok(url) = env::var("DATABASE_URL") {
            return url;
        }
        if let Ok(url) = env::var("POSTGRES_URL") {
            return url;
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db.user, self.db.password, self.db.host, self.db.port, self.db.database
        )
    }

    pub fn redis_url(&self) -> String {
        if let Ok(url) = env::var("REDIS_URL") {
            return url;
        }
        if let Ok(url) = env::var("KV_URL") {
            return url;
        }
        match &self.redis.password {
            Some(pw) if !pw.is_empty() => format!(
                "redis://:{}@{}:{}/{}",
                pw, self.redis.host, self.redis.port, self.redis.db
            ),
            _ => format!(
                "redis://{}:{}/{}",
                self.redis.host, self.redis.port, self.redis.db
            ),
        }
    }
}

fn parse_duration_to_secs(s: &str) -> u64 {
    const TWELVE_HOURS: u64 = 12 * 3600;
    let s = s.trim();
    if s.is_empty() {
        return TWELVE_HOURS;
    }
    let (num_str, unit) = s.split_at(s.len() - 1);
    let num: u64 = num_str.parse().unwrap_or(1);
    match unit {
        "s" => num,
        "m" => num * 60,
        "h" => num * 3600,
        "d" => num * 86400,
        _ => s.parse().unwrap_or(TWELVE_HOURS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_units() {
        assert_eq!(parse_duration_to_secs("12h"), 43_200);
        assert_eq!(parse_duration_to_secs("30m"), 1_800);
        assert_eq!(parse_duration_to_secs("2d"), 172_800);
        assert_eq!(parse_duration_to_secs("45s"), 45);
        assert_eq!(parse_duration_to_secs("900"), 900);
    }

    #[test]
    fn falls_back_to_twelve_hours() {
        assert_eq!(parse_duration_to_secs(""), 43_200);
        assert_eq!(parse_duration_to_secs("soon"), 43_200);
    }

    #[test]
    fn default_policy_windows() {
        let policy = RosterPolicy::default();
        assert_eq!(policy.leave_cutoff_hours, 10);
        assert_eq!(policy.friend_removal_cutoff_hours, 8);
    }
}

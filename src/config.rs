use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub points: PointsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// 与外部认证服务共享的 HS256 密钥，本服务只做校验
    pub secret: String,
}

/// 扣费时是否同时扣减积分流水
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionPolicy {
    /// 只扣余额缓存，流水由对账修正
    #[default]
    CacheOnly,
    /// 同一事务内按到期时间先后扣减流水
    LedgerFifo,
}

impl std::str::FromStr for ConsumptionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache_only" => Ok(ConsumptionPolicy::CacheOnly),
            "ledger_fifo" => Ok(ConsumptionPolicy::LedgerFifo),
            other => Err(format!("unknown consumption policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
    #[serde(default = "default_daily_attendance_points")]
    pub daily_attendance_points: i64,
    #[serde(default = "default_referral_points")]
    pub referral_points: i64,
    #[serde(default = "default_referee_points")]
    pub referee_points: i64,
    #[serde(default)]
    pub consumption_policy: ConsumptionPolicy,
    /// 0 表示不启动后台对账
    #[serde(default)]
    pub reconcile_interval_secs: u64,
    #[serde(default = "default_max_history_limit")]
    pub max_history_limit: u64,
}

fn default_expiry_days() -> i64 {
    365
}

fn default_daily_attendance_points() -> i64 {
    10
}

fn default_referral_points() -> i64 {
    100
}

fn default_referee_points() -> i64 {
    50
}

fn default_max_history_limit() -> u64 {
    100
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
            daily_attendance_points: default_daily_attendance_points(),
            referral_points: default_referral_points(),
            referee_points: default_referee_points(),
            consumption_policy: ConsumptionPolicy::default(),
            reconcile_interval_secs: 0,
            max_history_limit: default_max_history_limit(),
        }
    }
}

impl PointsConfig {
    /// 发放额度必须能写出合法流水（0 ≤ balance ≤ amount 且 amount > 0）
    pub fn validate(&self) -> Result<(), String> {
        if self.expiry_days <= 0 {
            return Err(format!("points.expiry_days must be positive, got {}", self.expiry_days));
        }
        if self.daily_attendance_points <= 0 {
            return Err(format!(
                "points.daily_attendance_points must be positive, got {}",
                self.daily_attendance_points
            ));
        }
        if self.referral_points < 0 || self.referee_points < 0 {
            return Err("points.referral_points and points.referee_points must not be negative"
                .to_string());
        }
        Ok(())
    }

    pub fn grant_lifetime(&self) -> chrono::Duration {
        chrono::Duration::days(self.expiry_days)
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 数据库 URL 在无配置文件时必须提供
                let database_url = env::var("DATABASE_URL")
                    .map_err(|_| "DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: "0.0.0.0".to_string(),
                        port: 8080,
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: 10,
                    },
                    jwt: JwtConfig {
                        secret: "change-me-in-production".to_string(),
                    },
                    points: PointsConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_env_overrides();
        config.points.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;
        config.points.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.parse::<T>().ok())
        }

        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env_parse("SERVER_PORT") {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = get_env_parse("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }

        // Points
        if let Some(n) = get_env_parse("POINTS_EXPIRY_DAYS") {
            self.points.expiry_days = n;
        }
        if let Some(n) = get_env_parse("POINTS_DAILY_ATTENDANCE") {
            self.points.daily_attendance_points = n;
        }
        if let Some(n) = get_env_parse("POINTS_REFERRAL") {
            self.points.referral_points = n;
        }
        if let Some(n) = get_env_parse("POINTS_REFEREE") {
            self.points.referee_points = n;
        }
        if let Some(p) = get_env_parse("POINTS_CONSUMPTION_POLICY") {
            self.points.consumption_policy = p;
        }
        if let Some(n) = get_env_parse("POINTS_RECONCILE_INTERVAL_SECS") {
            self.points.reconcile_interval_secs = n;
        }
        if let Some(n) = get_env_parse("POINTS_MAX_HISTORY_LIMIT") {
            self.points.max_history_limit = n;
        }
    }
}

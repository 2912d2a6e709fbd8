use std::net::SocketAddr;
use thiserror::Error;

/// 設定値の読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    InvalidValue {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// アプリケーション設定
///
/// 環境変数（`.env`があればそれも）から読み込む。
/// `DATABASE_URL`が未設定ならインメモリストアで起動する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub server_host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 5,
            server_host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "debug".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の取得関数から読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let database_max_connections = parse_or(
            &lookup,
            "DATABASE_MAX_CONNECTIONS",
            "unsigned integer",
            defaults.database_max_connections,
        )?;
        let server_host = lookup("SERVER_HOST").unwrap_or(defaults.server_host);
        let port = parse_or(&lookup, "PORT", "port number", defaults.port)?;
        let log_level = lookup("LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            database_url,
            database_max_connections,
            server_host,
            port,
            log_level,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.port)
    }

    /// 待ち受けアドレス（ホスト名ではなくIPアドレスの場合のみ）
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.bind_address().parse().ok()
    }
}

fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            name,
            expected,
            value,
        }),
    }
}

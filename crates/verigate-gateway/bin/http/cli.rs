use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "VERIGATE_LISTEN_ADDR";
pub const BOT_USERNAME_ENV: &str = "VERIGATE_BOT_USERNAME";
pub const SHORTENER_DOMAIN_ENV: &str = "VERIGATE_SHORTENER_DOMAIN";
pub const SHORTENER_API_KEY_ENV: &str = "VERIGATE_SHORTENER_API_KEY";
pub const ALLOWED_DOMAINS_ENV: &str = "VERIGATE_ALLOWED_DOMAINS";
pub const SESSION_TTL_ENV: &str = "VERIGATE_SESSION_TTL_SECS";
pub const REDIRECT_TTL_ENV: &str = "VERIGATE_REDIRECT_TTL_SECS";
pub const SHORTENER_TIMEOUT_ENV: &str = "VERIGATE_SHORTENER_TIMEOUT_SECS";
pub const RESOLVE_TIMEOUT_ENV: &str = "VERIGATE_RESOLVE_TIMEOUT_SECS";
pub const STORE_TIMEOUT_ENV: &str = "VERIGATE_STORE_TIMEOUT_SECS";
pub const RATE_LIMIT_ENV: &str = "VERIGATE_RATE_LIMIT";
pub const RATE_WINDOW_ENV: &str = "VERIGATE_RATE_WINDOW_SECS";
pub const REQUIRE_SHORTLINK_ENV: &str = "VERIGATE_REQUIRE_SHORTLINK";
pub const DEBUG_ENV: &str = "VERIGATE_DEBUG";
pub const STORAGE_BACKEND_ENV: &str = "VERIGATE_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "VERIGATE_MYSQL_DSN";
pub const LOG_FORMAT_ENV: &str = "VERIGATE_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "verigate", about = "Verification-gated redirect gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Bot receiving the `verify_<token>` deep link.
    #[arg(long, env = BOT_USERNAME_ENV)]
    pub bot_username: Option<String>,

    #[arg(long, env = SHORTENER_DOMAIN_ENV)]
    pub shortener_domain: Option<String>,

    #[arg(long, env = SHORTENER_API_KEY_ENV, hide_env_values = true)]
    pub shortener_api_key: Option<String>,

    /// Comma-separated authorities accepted for deep links and short URLs.
    #[arg(long, env = ALLOWED_DOMAINS_ENV, value_delimiter = ',')]
    pub allowed_domains: Vec<String>,

    #[arg(long, env = SESSION_TTL_ENV, default_value_t = 300)]
    pub session_ttl_secs: u64,

    #[arg(long, env = REDIRECT_TTL_ENV, default_value_t = 120)]
    pub redirect_ttl_secs: u64,

    #[arg(long, env = SHORTENER_TIMEOUT_ENV, default_value_t = 15)]
    pub shortener_timeout_secs: u64,

    #[arg(long, env = RESOLVE_TIMEOUT_ENV, default_value_t = 10)]
    pub resolve_timeout_secs: u64,

    #[arg(long, env = STORE_TIMEOUT_ENV, default_value_t = 10)]
    pub store_timeout_secs: u64,

    #[arg(long, env = RATE_LIMIT_ENV, default_value_t = 60)]
    pub rate_limit: u32,

    #[arg(long, env = RATE_WINDOW_ENV, default_value_t = 60)]
    pub rate_window_secs: u64,

    /// Fail instead of serving the raw deep link when shortening fails.
    #[arg(long, env = REQUIRE_SHORTLINK_ENV)]
    pub require_shortlink: bool,

    /// Attach diagnostics to responses.
    #[arg(long, env = DEBUG_ENV)]
    pub debug: bool,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"), hide_env_values = true)]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = CLI::try_parse_from(["verigate"]).unwrap();
        assert_eq!(cli.session_ttl_secs, 300);
        assert_eq!(cli.redirect_ttl_secs, 120);
        assert_eq!(cli.rate_limit, 60);
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert!(cli.allowed_domains.is_empty());
        assert!(!cli.debug);
    }

    #[test]
    fn mysql_requires_dsn() {
        assert!(CLI::try_parse_from(["verigate", "--storage", "mysql"]).is_err());
    }

    #[test]
    fn allowed_domains_are_comma_separated() {
        let cli =
            CLI::try_parse_from(["verigate", "--allowed-domains", "t.me,short.example"]).unwrap();
        assert_eq!(cli.allowed_domains, vec!["t.me", "short.example"]);
    }
}

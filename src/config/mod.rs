use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{GameError, Result};

pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of browser client assets, served at `/` when set
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room_code_attempts: u32,
    /// How long a created-but-never-joined room survives. Zero disables the reaper.
    pub empty_room_ttl: Duration,
    pub prompts_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_code_attempts: 5,
            empty_room_ttl: Duration::from_secs(600),
            prompts_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = SessionConfig::default();

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("SERVER_PORT", 3000)?,
                static_dir: non_empty_var("STATIC_DIR"),
            },
            session: SessionConfig {
                room_code_attempts: parse_var("ROOM_CODE_ATTEMPTS", defaults.room_code_attempts)?,
                empty_room_ttl: Duration::from_secs(parse_var(
                    "EMPTY_ROOM_TTL_SECS",
                    defaults.empty_room_ttl.as_secs(),
                )?),
                prompts_file: non_empty_var("PROMPTS_FILE"),
            },
            logging: LoggingConfig {
                format: match env::var("LOG_FORMAT").as_deref() {
                    Ok("json") => LogFormat::Json,
                    _ => LogFormat::Text,
                },
            },
        })
    }

    pub fn bind_address(&self) -> ([u8; 4], u16) {
        let ip_addr = self.parse_host_to_ipv4();
        (ip_addr.octets(), self.server.port)
    }

    fn parse_host_to_ipv4(&self) -> Ipv4Addr {
        if let Ok(addr) = self.server.host.parse::<IpAddr>() {
            match addr {
                IpAddr::V4(ipv4) => return ipv4,
                IpAddr::V6(_) => {
                    tracing::warn!(
                        host = %self.server.host,
                        "IPv6 address provided but only IPv4 supported, using 0.0.0.0"
                    );
                    return Ipv4Addr::new(0, 0, 0, 0);
                }
            }
        }

        match self.server.host.as_str() {
            "localhost" => Ipv4Addr::new(127, 0, 0, 1),
            "" | "0.0.0.0" => Ipv4Addr::new(0, 0, 0, 0),
            _ => {
                tracing::warn!(
                    host = %self.server.host,
                    "Unable to parse host as IPv4, using 0.0.0.0"
                );
                Ipv4Addr::new(0, 0, 0, 0)
            }
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GameError::config(format!("{key} has invalid value {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_host(host: &str, port: u16) -> Config {
        Config {
            server: ServerConfig {
                host: host.to_string(),
                port,
                static_dir: None,
            },
            session: SessionConfig::default(),
            logging: LoggingConfig {
                format: LogFormat::Text,
            },
        }
    }

    #[test]
    fn test_parse_localhost() {
        let config = config_with_host("localhost", 3000);
        assert_eq!(config.bind_address(), ([127, 0, 0, 1], 3000));
    }

    #[test]
    fn test_parse_ipv4_address() {
        let config = config_with_host("192.168.1.1", 3000);
        assert_eq!(config.bind_address(), ([192, 168, 1, 1], 3000));
    }

    #[test]
    fn test_parse_empty_host() {
        let config = config_with_host("", 8080);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 8080));
    }

    #[test]
    fn test_parse_invalid_hostname_defaults_to_all() {
        let config = config_with_host("invalid-hostname", 9000);
        assert_eq!(config.bind_address(), ([0, 0, 0, 0], 9000));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("GANG_UP_TEST_PORT", "not-a-port");
        let parsed: Result<u16> = parse_var("GANG_UP_TEST_PORT", 3000);
        assert!(matches!(parsed, Err(GameError::InvalidConfiguration(_))));
        env::remove_var("GANG_UP_TEST_PORT");
    }

    #[test]
    fn test_parse_var_default_when_unset() {
        let parsed: u32 = parse_var("GANG_UP_TEST_UNSET_VAR", 5).unwrap();
        assert_eq!(parsed, 5);
    }

    #[test]
    fn test_session_defaults() {
        let session = SessionConfig::default();
        assert_eq!(session.room_code_attempts, 5);
        assert_eq!(session.empty_room_ttl, Duration::from_secs(600));
        assert!(session.prompts_file.is_none());
    }
}

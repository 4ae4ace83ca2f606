//! Server settings read from the environment

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_DATA_DIR: &str = ".vernite-data";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8081";

/// Trimmed, non-empty value of an environment variable
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn env_flag(name: &str, default: bool) -> bool {
    match env_string(name) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

/// Parsed value of an environment variable; unparsable values count as unset
pub fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = env_string(name)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub cors_permissive: bool,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = env_string("VERNITE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let bind_addr = env_string("VERNITE_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid VERNITE_BIND_ADDR '{}': {}", bind_addr, err))?;

        Ok(Self {
            data_dir,
            bind_addr,
            cors_permissive: env_flag("VERNITE_CORS_PERMISSIVE", true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_helpers() {
        std::env::set_var("VERNITE_TEST_FLAG", " Yes ");
        std::env::set_var("VERNITE_TEST_NUMBER", "42");
        std::env::set_var("VERNITE_TEST_BLANK", "   ");

        assert!(env_flag("VERNITE_TEST_FLAG", false));
        assert!(env_flag("VERNITE_TEST_MISSING", true));
        assert_eq!(env_parse::<i64>("VERNITE_TEST_NUMBER"), Some(42));
        assert_eq!(env_parse::<i64>("VERNITE_TEST_FLAG"), None);
        assert_eq!(env_string("VERNITE_TEST_BLANK"), None);
    }
}

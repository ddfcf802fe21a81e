use std::{net::SocketAddr, str::FromStr};

use crate::{error::ConfigError, stream::StreamPolicy};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_INVIDIOUS_INSTANCE: &str = "https://invidious.nikkosphere.com";
pub const DEFAULT_PIPED_INSTANCE: &str = "https://pipedapi.kavin.rocks";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
  #[default]
  Ytdlp,
  Rustube,
  Invidious,
  Piped,
}

impl FromStr for Backend {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "ytdlp" | "yt-dlp" => Ok(Backend::Ytdlp),
      "rustube" => Ok(Backend::Rustube),
      "invidious" => Ok(Backend::Invidious),
      "piped" => Ok(Backend::Piped),
      _ => Err(ConfigError::Invalid {
        var: "EXTRACTOR",
        value: s.to_string(),
        reason: "expected one of ytdlp, rustube, invidious, piped",
      }),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  pub port: u16,
  pub backend: Backend,
  pub ytdlp_path: String,
  pub ytdlp_proxy: Option<String>,
  pub invidious_instance: String,
  pub piped_instance: String,
  pub stream_policy: StreamPolicy,
  pub insecure_tls: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      port: DEFAULT_PORT,
      backend: Backend::default(),
      ytdlp_path: "yt-dlp".to_string(),
      ytdlp_proxy: None,
      invidious_instance: DEFAULT_INVIDIOUS_INSTANCE.to_string(),
      piped_instance: DEFAULT_PIPED_INSTANCE.to_string(),
      stream_policy: StreamPolicy::default(),
      insecure_tls: true,
    }
  }
}

impl Config {
  pub fn from_env() -> Result<Self, ConfigError> {
    Self::from_lookup(|var| std::env::var(var).ok())
  }

  /// Build the config from an arbitrary variable lookup. Unset and blank
  /// variables fall back to their defaults.
  pub fn from_lookup(
    lookup: impl Fn(&str) -> Option<String>,
  ) -> Result<Self, ConfigError> {
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
    let mut config = Config::default();

    if let Some(port) = get("PORT") {
      config.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
        var: "PORT",
        value: port.clone(),
        reason: "expected a port number",
      })?;
    }
    if let Some(backend) = get("EXTRACTOR") {
      config.backend = backend.parse()?;
    }
    if let Some(path) = get("YTDLP_PATH") {
      config.ytdlp_path = path;
    }
    config.ytdlp_proxy = get("YTDLP_PROXY");
    if let Some(instance) = get("INVIDIOUS_INSTANCE") {
      config.invidious_instance = instance.trim_end_matches('/').to_string();
    }
    if let Some(instance) = get("PIPED_INSTANCE") {
      config.piped_instance = instance.trim_end_matches('/').to_string();
    }
    if let Some(policy) = get("STREAM_POLICY") {
      config.stream_policy = policy.parse()?;
    }
    if let Some(flag) = get("INSECURE_TLS") {
      config.insecure_tls = parse_bool("INSECURE_TLS", &flag)?;
    }

    Ok(config)
  }

  pub fn listen_addr(&self) -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], self.port))
  }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => Err(ConfigError::Invalid {
      var,
      value: value.to_string(),
      reason: "expected a boolean",
    }),
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let vars: HashMap<String, String> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    Config::from_lookup(|var| vars.get(var).cloned())
  }

  #[test]
  fn test_defaults() {
    let config = config_from(&[]).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.listen_addr().to_string(), "0.0.0.0:5000");
  }

  #[test]
  fn test_overrides() {
    let config = config_from(&[
      ("PORT", "8080"),
      ("EXTRACTOR", "Invidious"),
      ("INVIDIOUS_INSTANCE", "https://inv.example.org/"),
      ("STREAM_POLICY", "best"),
      ("INSECURE_TLS", "off"),
      ("YTDLP_PROXY", "socks5://127.0.0.1:1080"),
    ])
    .unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.backend, Backend::Invidious);
    assert_eq!(config.invidious_instance, "https://inv.example.org");
    assert_eq!(config.stream_policy, StreamPolicy::Best);
    assert!(!config.insecure_tls);
    assert_eq!(config.ytdlp_proxy.as_deref(), Some("socks5://127.0.0.1:1080"));
  }

  #[test]
  fn test_blank_values_use_defaults() {
    let config = config_from(&[("PORT", ""), ("YTDLP_PROXY", " ")]).unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.ytdlp_proxy, None);
  }

  #[test]
  fn test_invalid_values() {
    assert!(matches!(
      config_from(&[("PORT", "http")]),
      Err(ConfigError::Invalid { var: "PORT", .. })
    ));
    assert!(matches!(
      config_from(&[("EXTRACTOR", "pytube")]),
      Err(ConfigError::Invalid { var: "EXTRACTOR", .. })
    ));
    assert!(matches!(
      config_from(&[("INSECURE_TLS", "maybe")]),
      Err(ConfigError::Invalid {
        var: "INSECURE_TLS",
        ..
      })
    ));
  }
}

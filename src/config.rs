//! Service configuration, read once from the environment at start-up.
//!
//! Supported:
//! - MEDIPREDICT_BIND_ADDR (default `127.0.0.1:8000`)
//! - MEDIPREDICT_MODEL_DIR (default `models`)
//! - MEDIPREDICT_ARTIFACT_PUBKEY_B64_FILE (enables signed-manifest enforcement)
//! - MEDIPREDICT_REQUIRE_MANIFEST
//! - GEMINI_API_KEY (narration is disabled when unset)
//! - MEDIPREDICT_NARRATIVE_MODEL, MEDIPREDICT_NARRATIVE_ENDPOINT
//! - MEDIPREDICT_NARRATIVE_TIMEOUT_SECS (default 20)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::adapters::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not a valid socket address: {value}")]
    BindAddr { name: &'static str, value: String },

    #[error("{name} must be a positive integer number of seconds, got {value}")]
    Timeout { name: &'static str, value: String },

    #[error("{name} must be a bare model name, got {value}")]
    ModelName { name: &'static str, value: String },
}

/// Narrative generator settings. Present only when an API key is set.
pub struct NarrativeConfig {
    pub api_key: Zeroizing<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for NarrativeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub model_dir: PathBuf,
    pub artifact_pubkey_file: Option<PathBuf>,
    pub require_manifest: bool,
    pub narrative: Option<NarrativeConfig>,
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for values that are present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`; unset variables map to `None`.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for values that are present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("MEDIPREDICT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::BindAddr {
            name: "MEDIPREDICT_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let model_dir = get("MEDIPREDICT_MODEL_DIR")
            .unwrap_or_else(|| DEFAULT_MODEL_DIR.into())
            .into();
        let artifact_pubkey_file = get("MEDIPREDICT_ARTIFACT_PUBKEY_B64_FILE").map(PathBuf::from);
        let require_manifest = get("MEDIPREDICT_REQUIRE_MANIFEST")
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        let narrative = match get("GEMINI_API_KEY") {
            None => None,
            Some(key) => {
                let timeout = match get("MEDIPREDICT_NARRATIVE_TIMEOUT_SECS") {
                    None => DEFAULT_NARRATIVE_TIMEOUT_SECS,
                    Some(v) => v
                        .parse::<u64>()
                        .ok()
                        .filter(|s| *s > 0)
                        .ok_or(ConfigError::Timeout {
                            name: "MEDIPREDICT_NARRATIVE_TIMEOUT_SECS",
                            value: v.clone(),
                        })?,
                };
                Some(NarrativeConfig {
                    api_key: Zeroizing::new(key),
                    model: get("MEDIPREDICT_NARRATIVE_MODEL")
                        .unwrap_or_else(|| DEFAULT_MODEL.into()),
                    endpoint: get("MEDIPREDICT_NARRATIVE_ENDPOINT")
                        .unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
                    timeout: Duration::from_secs(timeout),
                })
            }
        };

        if let Some(n) = &narrative {
            // Interpolated into the request path.
            if n.model.contains(&['/', '?', '#'][..]) {
                return Err(ConfigError::ModelName {
                    name: "MEDIPREDICT_NARRATIVE_MODEL",
                    value: n.model.clone(),
                });
            }
        }

        Ok(Self {
            bind_addr,
            model_dir,
            artifact_pubkey_file,
            require_manifest,
            narrative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServiceConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).expect("defaults");
        assert_eq!(cfg.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.model_dir, PathBuf::from("models"));
        assert!(cfg.artifact_pubkey_file.is_none());
        assert!(!cfg.require_manifest);
        assert!(cfg.narrative.is_none());
    }

    #[test]
    fn test_narrative_enabled_by_api_key() {
        let cfg = config(&[
            ("GEMINI_API_KEY", "secret"),
            ("MEDIPREDICT_NARRATIVE_TIMEOUT_SECS", "5"),
        ])
        .expect("config");
        let narrative = cfg.narrative.expect("narrative enabled");
        assert_eq!(narrative.model, DEFAULT_MODEL);
        assert_eq!(narrative.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(narrative.timeout, Duration::from_secs(5));
        assert!(!format!("{narrative:?}").contains("secret"));
    }

    #[test]
    fn test_blank_api_key_disables_narrative() {
        let cfg = config(&[("GEMINI_API_KEY", "  ")]).expect("config");
        assert!(cfg.narrative.is_none());
    }

    #[test]
    fn test_bool_parsing() {
        for v in ["1", "true", "TRUE", "yes", "YES"] {
            let cfg = config(&[("MEDIPREDICT_REQUIRE_MANIFEST", v)]).expect("config");
            assert!(cfg.require_manifest, "{v}");
        }
        let cfg = config(&[("MEDIPREDICT_REQUIRE_MANIFEST", "no")]).expect("config");
        assert!(!cfg.require_manifest);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("MEDIPREDICT_BIND_ADDR", "localhost")]),
            Err(ConfigError::BindAddr { .. })
        ));
        assert!(matches!(
            config(&[
                ("GEMINI_API_KEY", "k"),
                ("MEDIPREDICT_NARRATIVE_TIMEOUT_SECS", "0")
            ]),
            Err(ConfigError::Timeout { .. })
        ));
        assert!(matches!(
            config(&[
                ("GEMINI_API_KEY", "k"),
                ("MEDIPREDICT_NARRATIVE_MODEL", "../admin")
            ]),
            Err(ConfigError::ModelName { .. })
        ));
    }
}

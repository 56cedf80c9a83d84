//! Deployment configuration.
//!
//! `berth.toml` is parsed into raw serde structs and then resolved into the
//! typed, read-only [`DeployConfig`] and [`AccessoryConfig`] values the
//! command builders consume. Resolution precomputes every docker argument
//! set, so builders never touch the raw file.
//!
//! Settings are loaded with priority: env var > config file > default.
//!
//! ```toml
//! service = "app"
//!
//! [proxy]
//! container_name = "kamal-proxy"
//!
//! [logging]
//! driver = "json-file"
//! options = { max-size = "10m" }
//!
//! [ssh]
//! user = "deploy"
//!
//! [accessories.redis]
//! image = "redis:7"
//! host = "10.0.0.1"
//! port = 6379
//! directories = ["data:/data"]
//! ```

pub mod accessory;
pub(crate) mod helpers;
pub mod proxy;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::commands::AccessoryCommands;
use crate::commands::shell_escape;
use crate::config::accessory::{RawAccessory, ResolveContext};
use crate::config::helpers::{optional_env, parse_optional};
use crate::error::ConfigError;

pub use accessory::{AccessoryConfig, AccessoryFile, FileSource};
pub use proxy::{ProxyConfig, ProxyHealthcheck};

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/berth.toml";

/// Name of the reverse proxy's container and of its control binary.
pub const DEFAULT_PROXY_NAME: &str = "kamal-proxy";

/// Global logging driver settings applied to every `docker run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    pub driver: Option<String>,
    pub options: BTreeMap<String, String>,
}

impl LoggingConfig {
    /// `--log-driver` / `--log-opt` arguments.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(driver) = &self.driver {
            args.push("--log-driver".to_string());
            args.push(shell_escape(driver));
        }
        for (k, v) in &self.options {
            args.push("--log-opt".to_string());
            args.push(shell_escape(&format!("{k}={v}")));
        }
        args
    }
}

/// How to reach hosts over ssh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshConfig {
    pub user: String,
    pub port: u16,
    /// Jump host passed to `ssh -J`.
    pub proxy: Option<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            port: 22,
            proxy: None,
        }
    }
}

/// Resolved deployment configuration.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Deployment service name.
    pub service: String,
    /// Container that runs the reverse proxy.
    pub proxy_container_name: String,
    /// Control binary inside the proxy container.
    pub proxy_binary: String,
    pub logging: LoggingConfig,
    pub ssh: SshConfig,
    pub accessories: BTreeMap<String, AccessoryConfig>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            service: String::new(),
            proxy_container_name: DEFAULT_PROXY_NAME.to_string(),
            proxy_binary: DEFAULT_PROXY_NAME.to_string(),
            logging: LoggingConfig::default(),
            ssh: SshConfig::default(),
            accessories: BTreeMap::new(),
        }
    }
}

impl DeployConfig {
    /// Config file path: `BERTH_CONFIG`, else [`DEFAULT_CONFIG_PATH`].
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(optional_env("BERTH_CONFIG")?
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)))
    }

    /// Load and resolve a config file, reading secrets and overrides from
    /// the process environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path, &optional_env)
    }

    /// Resolve config text with an explicit environment lookup.
    pub fn from_toml(
        text: &str,
        path: &Path,
        env: &dyn Fn(&str) -> Result<Option<String>, ConfigError>,
    ) -> Result<Self, ConfigError> {
        let raw: RawDeploy = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        raw.resolve(env)
    }

    /// Global `--log-driver`/`--log-opt` arguments.
    pub fn logging_args(&self) -> Vec<String> {
        self.logging.args()
    }

    /// Look up an accessory by name.
    pub fn accessory(&self, name: &str) -> Result<&AccessoryConfig, ConfigError> {
        self.accessories
            .get(name)
            .ok_or_else(|| ConfigError::UnknownAccessory {
                name: name.to_string(),
            })
    }

    /// Command builder for the named accessory.
    pub fn accessory_commands(&self, name: &str) -> Result<AccessoryCommands<'_>, ConfigError> {
        Ok(AccessoryCommands::new(self, self.accessory(name)?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeploy {
    service: Option<String>,
    #[serde(default)]
    proxy: RawGlobalProxy,
    #[serde(default)]
    logging: RawLogging,
    #[serde(default)]
    ssh: RawSsh,
    #[serde(default)]
    accessories: BTreeMap<String, RawAccessory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGlobalProxy {
    container_name: Option<String>,
    binary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogging {
    driver: Option<String>,
    #[serde(default)]
    options: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSsh {
    user: Option<String>,
    port: Option<u16>,
    proxy: Option<String>,
}

impl RawDeploy {
    fn resolve(
        self,
        env: &dyn Fn(&str) -> Result<Option<String>, ConfigError>,
    ) -> Result<DeployConfig, ConfigError> {
        let defaults = DeployConfig::default();

        let service = self.service.ok_or_else(|| ConfigError::MissingField {
            key: "service".to_string(),
        })?;

        let ssh = SshConfig {
            user: env("BERTH_SSH_USER")?
                .or(self.ssh.user)
                .unwrap_or(defaults.ssh.user),
            port: match env("BERTH_SSH_PORT")? {
                Some(port) => parse_optional("BERTH_SSH_PORT", Some(port), defaults.ssh.port)?,
                None => self.ssh.port.unwrap_or(defaults.ssh.port),
            },
            proxy: self.ssh.proxy,
        };

        let proxy_container_name = env("BERTH_PROXY_CONTAINER")?
            .or(self.proxy.container_name)
            .unwrap_or(defaults.proxy_container_name);

        let ctx = ResolveContext {
            service: &service,
            lookup: env,
        };
        let mut accessories = BTreeMap::new();
        for (name, raw) in self.accessories {
            let accessory = raw.resolve(&name, &ctx)?;
            accessories.insert(name, accessory);
        }

        Ok(DeployConfig {
            service,
            proxy_container_name,
            proxy_binary: self.proxy.binary.unwrap_or(defaults.proxy_binary),
            logging: LoggingConfig {
                driver: self.logging.driver,
                options: self.logging.options,
            },
            ssh,
            accessories,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
        service = "app"

        [proxy]
        container_name = "edge-proxy"

        [logging]
        driver = "json-file"
        options = { max-size = "10m" }

        [ssh]
        user = "deploy"
        port = 2222

        [accessories.redis]
        image = "redis:7"
        hosts = ["10.0.0.1", "10.0.0.2"]
        port = 6379
    "#;

    fn empty_env(_: &str) -> Result<Option<String>, ConfigError> {
        Ok(None)
    }

    fn parse(text: &str) -> Result<DeployConfig, ConfigError> {
        DeployConfig::from_toml(text, Path::new("berth.toml"), &empty_env)
    }

    #[test]
    fn resolves_globals() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.service, "app");
        assert_eq!(config.proxy_container_name, "edge-proxy");
        assert_eq!(config.proxy_binary, DEFAULT_PROXY_NAME);
        assert_eq!(config.ssh.user, "deploy");
        assert_eq!(config.ssh.port, 2222);
        assert_eq!(
            config.logging_args(),
            ["--log-driver", "json-file", "--log-opt", "max-size=10m"]
        );
    }

    #[test]
    fn defaults_apply_without_tables() {
        let config = parse(r#"service = "app""#).unwrap();
        assert_eq!(config.proxy_container_name, "kamal-proxy");
        assert_eq!(config.ssh, SshConfig::default());
        assert!(config.logging_args().is_empty());
        assert!(config.accessories.is_empty());
    }

    #[test]
    fn env_overrides_file() {
        let env = |key: &str| -> Result<Option<String>, ConfigError> {
            Ok(match key {
                "BERTH_SSH_USER" => Some("ops".to_string()),
                "BERTH_SSH_PORT" => Some("2200".to_string()),
                "BERTH_PROXY_CONTAINER" => Some("proxy-2".to_string()),
                _ => None,
            })
        };
        let config = DeployConfig::from_toml(SAMPLE, Path::new("berth.toml"), &env).unwrap();
        assert_eq!(config.ssh.user, "ops");
        assert_eq!(config.ssh.port, 2200);
        assert_eq!(config.proxy_container_name, "proxy-2");
    }

    #[test]
    fn invalid_port_override_is_reported() {
        let env = |key: &str| -> Result<Option<String>, ConfigError> {
            Ok((key == "BERTH_SSH_PORT").then(|| "twenty-two".to_string()))
        };
        let err = DeployConfig::from_toml(SAMPLE, Path::new("berth.toml"), &env).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "BERTH_SSH_PORT"));
    }

    #[test]
    fn unknown_accessory() {
        let config = parse(SAMPLE).unwrap();
        assert!(config.accessory("redis").is_ok());
        assert!(matches!(
            config.accessory("postgres"),
            Err(ConfigError::UnknownAccessory { .. })
        ));
    }

    #[test]
    fn service_is_required() {
        let err = parse("[ssh]\nuser = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { key } if key == "service"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse("service = \"app\"\nsevrice = \"typo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeployConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("berth.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = DeployConfig::load(&path).unwrap();
        assert_eq!(config.accessory("redis").unwrap().hosts.len(), 2);
    }
}

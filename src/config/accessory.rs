//! Resolved, read-only description of one accessory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::commands::shell_escape;
use crate::config::proxy::{ProxyConfig, RawProxy};
use crate::error::ConfigError;

/// Where the bytes of an uploaded file come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// Generated content held in memory; never looked up on disk.
    Buffer(Vec<u8>),
}

impl From<&str> for FileSource {
    fn from(path: &str) -> Self {
        Self::Path(PathBuf::from(path))
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// A local file mounted into the accessory container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessoryFile {
    pub source: FileSource,
    /// Absolute path inside the container.
    pub remote: String,
}

/// One accessory after configuration resolution.
///
/// Argument sets are stored exactly as the container runtime must receive
/// them; their order is significant and is never rearranged by the command
/// builders.
#[derive(Debug, Clone, Default)]
pub struct AccessoryConfig {
    /// Key of the accessory in the configuration file.
    pub name: String,
    /// Container name and `service=` label value.
    pub service_name: String,
    pub image: String,
    /// Target hosts; host-bound operations use the first.
    pub hosts: Vec<String>,
    pub port: Option<String>,
    pub files: Vec<AccessoryFile>,
    /// Host-side directories as `host:container` pairs.
    pub directories: Vec<String>,
    /// Entry command override, passed to the shell verbatim.
    pub cmd: Option<String>,
    pub network_args: Vec<String>,
    pub publish_args: Vec<String>,
    pub env_args: Vec<String>,
    pub volume_args: Vec<String>,
    pub label_args: Vec<String>,
    pub option_args: Vec<String>,
    pub proxy: ProxyConfig,
    /// Whether the accessory is registered behind the reverse proxy.
    pub running_proxy: bool,
    /// Secret environment values written to `secrets_path`.
    pub secrets: Vec<(String, SecretString)>,
    pub env_directory: String,
    pub secrets_path: String,
}

impl AccessoryConfig {
    /// First configured host.
    pub fn primary_host(&self) -> Option<&str> {
        self.hosts.first().map(String::as_str)
    }

    /// Contents of the secrets env file, one `KEY=value` per line.
    pub fn secrets_io(&self) -> SecretString {
        let body: String = self
            .secrets
            .iter()
            .map(|(key, value)| format!("{key}={}\n", value.expose_secret()))
            .collect();
        SecretString::from(body)
    }

    /// Host-side path of a directory entry (`host:container`).
    ///
    /// Relative host paths live under the service directory.
    pub fn directory_host_path(&self, directory: &str) -> String {
        let host = directory.split_once(':').map_or(directory, |(h, _)| h);
        if host.starts_with('/') {
            host.to_string()
        } else {
            format!("$PWD/{}/{}", self.service_name, host.trim_start_matches("./"))
        }
    }

    /// Host-side location of a file mounted at `remote` in the container.
    pub fn file_host_path(&self, remote: &str) -> String {
        format!(
            "$PWD/{}/{}",
            self.service_name,
            remote.trim_start_matches('/')
        )
    }
}

/// `[accessories.<name>]` table as written in the config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawAccessory {
    service: Option<String>,
    image: Option<String>,
    host: Option<String>,
    #[serde(default)]
    hosts: Vec<String>,
    port: Option<RawPort>,
    cmd: Option<String>,
    network: Option<String>,
    #[serde(default)]
    files: Vec<String>,
    #[serde(default)]
    directories: Vec<String>,
    #[serde(default)]
    volumes: Vec<String>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    options: BTreeMap<String, RawOption>,
    #[serde(default)]
    env: RawEnv,
    proxy: Option<RawProxy>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPort {
    Number(u16),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOption {
    Flag(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEnv {
    #[serde(default)]
    clear: BTreeMap<String, String>,
    #[serde(default)]
    secret: Vec<String>,
}

/// Inputs shared by every accessory during resolution.
pub(crate) struct ResolveContext<'a> {
    /// Deployment service name, used to namespace env files.
    pub service: &'a str,
    /// Looks up secret values (normally the process environment).
    pub lookup: &'a dyn Fn(&str) -> Result<Option<String>, ConfigError>,
}

impl RawAccessory {
    pub(crate) fn resolve(
        self,
        name: &str,
        ctx: &ResolveContext<'_>,
    ) -> Result<AccessoryConfig, ConfigError> {
        let key = |field: &str| format!("accessories.{name}.{field}");

        let image = self.image.ok_or_else(|| ConfigError::MissingField { key: key("image") })?;

        let mut hosts: Vec<String> = self.host.into_iter().collect();
        hosts.extend(self.hosts);
        if hosts.is_empty() {
            return Err(ConfigError::NoHosts {
                accessory: name.to_string(),
            });
        }

        let service_name = self.service.unwrap_or_else(|| name.to_string());

        let port = self.port.map(|p| match p {
            RawPort::Number(n) => format!("{n}:{n}"),
            RawPort::Text(s) if s.contains(':') => s,
            RawPort::Text(s) => format!("{s}:{s}"),
        });

        let mut files = Vec::with_capacity(self.files.len());
        for entry in &self.files {
            let (local, remote) = entry.split_once(':').ok_or_else(|| ConfigError::InvalidValue {
                key: key("files"),
                message: format!("expected 'local:remote', got '{entry}'"),
            })?;
            files.push(AccessoryFile {
                source: FileSource::from(local),
                remote: remote.to_string(),
            });
        }

        for entry in &self.directories {
            if !entry.contains(':') {
                return Err(ConfigError::InvalidValue {
                    key: key("directories"),
                    message: format!("expected 'host:container', got '{entry}'"),
                });
            }
        }

        let mut secrets = Vec::with_capacity(self.env.secret.len());
        for secret in &self.env.secret {
            let value = (ctx.lookup)(secret)?.ok_or_else(|| ConfigError::MissingField {
                key: format!("{} ({secret})", key("env.secret")),
            })?;
            secrets.push((secret.clone(), SecretString::from(value)));
        }

        let env_directory = format!(".berth/apps/{}/env/accessories", ctx.service);
        let secrets_path = format!("{env_directory}/{service_name}.env");

        let network_args = argumentize("--network", self.network.iter());
        let publish_args = argumentize("--publish", port.iter());

        let mut env_args = Vec::new();
        for (k, v) in &self.env.clear {
            env_args.push("--env".to_string());
            env_args.push(format!("{k}={}", shell_escape(v)));
        }
        if !secrets.is_empty() {
            env_args.push("--env-file".to_string());
            env_args.push(secrets_path.clone());
        }

        let mut config = AccessoryConfig {
            name: name.to_string(),
            service_name,
            image,
            hosts,
            port,
            files,
            directories: self.directories,
            cmd: self.cmd,
            network_args,
            publish_args,
            env_args,
            volume_args: Vec::new(),
            label_args: Vec::new(),
            option_args: options_args(&self.options),
            running_proxy: self.proxy.is_some(),
            proxy: self.proxy.map(ProxyConfig::from).unwrap_or_default(),
            secrets,
            env_directory,
            secrets_path,
        };

        config.volume_args = volume_args(&config, &self.volumes);
        config.label_args = label_args(&config.service_name, &self.labels);

        Ok(config)
    }
}

fn argumentize<'a>(flag: &str, values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values
        .flat_map(|value| [flag.to_string(), value.clone()])
        .collect()
}

fn volume_args(config: &AccessoryConfig, volumes: &[String]) -> Vec<String> {
    let files = config
        .files
        .iter()
        .map(|f| format!("{}:{}", config.file_host_path(&f.remote), f.remote));
    let directories = config.directories.iter().map(|d| {
        let container = d.split_once(':').map(|(_, c)| c).unwrap_or(d);
        format!("{}:{container}", config.directory_host_path(d))
    });

    let all: Vec<String> = volumes.iter().cloned().chain(files).chain(directories).collect();
    argumentize("--volume", all.iter())
}

fn label_args(service_name: &str, labels: &BTreeMap<String, String>) -> Vec<String> {
    let mut args = vec!["--label".to_string(), format!("service={service_name}")];
    for (k, v) in labels {
        args.push("--label".to_string());
        args.push(format!("{k}={}", shell_escape(v)));
    }
    args
}

fn options_args(options: &BTreeMap<String, RawOption>) -> Vec<String> {
    let mut args = Vec::new();
    for (k, v) in options {
        match v {
            RawOption::Flag(true) => args.push(format!("--{k}")),
            RawOption::Flag(false) => {}
            RawOption::Integer(n) => {
                args.push(format!("--{k}"));
                args.push(n.to_string());
            }
            RawOption::Float(n) => {
                args.push(format!("--{k}"));
                args.push(n.to_string());
            }
            RawOption::Text(s) => {
                args.push(format!("--{k}"));
                args.push(shell_escape(s));
            }
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_secrets(_: &str) -> Result<Option<String>, ConfigError> {
        Ok(None)
    }

    fn resolve(toml_src: &str) -> Result<AccessoryConfig, ConfigError> {
        let raw: RawAccessory = toml::from_str(toml_src).unwrap();
        let ctx = ResolveContext {
            service: "app",
            lookup: &no_secrets,
        };
        raw.resolve("redis", &ctx)
    }

    #[test]
    fn minimal_accessory() {
        let config = resolve(
            r#"
            image = "redis:7"
            host = "10.0.0.1"
            "#,
        )
        .unwrap();

        assert_eq!(config.service_name, "redis");
        assert_eq!(config.hosts, ["10.0.0.1"]);
        assert!(config.network_args.is_empty());
        assert!(config.publish_args.is_empty());
        assert!(config.env_args.is_empty());
        assert!(config.volume_args.is_empty());
        assert_eq!(config.label_args, ["--label", "service=redis"]);
        assert!(!config.running_proxy);
        assert_eq!(config.env_directory, ".berth/apps/app/env/accessories");
        assert_eq!(
            config.secrets_path,
            ".berth/apps/app/env/accessories/redis.env"
        );
    }

    #[test]
    fn bare_port_publishes_same_port() {
        let config = resolve(
            r#"
            image = "redis:7"
            host = "10.0.0.1"
            port = 6379
            "#,
        )
        .unwrap();
        assert_eq!(config.publish_args, ["--publish", "6379:6379"]);
    }

    #[test]
    fn mapped_port_is_kept() {
        let config = resolve(
            r#"
            image = "redis:7"
            host = "10.0.0.1"
            port = "127.0.0.1:6380:6379"
            "#,
        )
        .unwrap();
        assert_eq!(config.publish_args, ["--publish", "127.0.0.1:6380:6379"]);
    }

    #[test]
    fn volumes_files_then_directories() {
        let config = resolve(
            r#"
            image = "mysql:8"
            host = "10.0.0.1"
            volumes = ["/var/log/mysql:/var/log/mysql"]
            files = ["config/my.cnf:/etc/mysql/my.cnf"]
            directories = ["data:/var/lib/mysql"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.volume_args,
            [
                "--volume",
                "/var/log/mysql:/var/log/mysql",
                "--volume",
                "$PWD/redis/etc/mysql/my.cnf:/etc/mysql/my.cnf",
                "--volume",
                "$PWD/redis/data:/var/lib/mysql",
            ]
        );
        assert_eq!(config.files[0].source, FileSource::from("config/my.cnf"));
    }

    #[test]
    fn env_clear_and_secrets() {
        let raw: RawAccessory = toml::from_str(
            r#"
            image = "mysql:8"
            host = "10.0.0.1"
            env.clear = { MYSQL_DATABASE = "app", GREETING = "hello world" }
            env.secret = ["MYSQL_ROOT_PASSWORD"]
            "#,
        )
        .unwrap();
        let lookup = |key: &str| -> Result<Option<String>, ConfigError> {
            Ok((key == "MYSQL_ROOT_PASSWORD").then(|| "s3cret".to_string()))
        };
        let ctx = ResolveContext {
            service: "app",
            lookup: &lookup,
        };
        let config = raw.resolve("mysql", &ctx).unwrap();

        assert_eq!(
            config.env_args,
            [
                "--env",
                "GREETING='hello world'",
                "--env",
                "MYSQL_DATABASE=app",
                "--env-file",
                ".berth/apps/app/env/accessories/mysql.env",
            ]
        );
        assert_eq!(
            config.secrets_io().expose_secret(),
            "MYSQL_ROOT_PASSWORD=s3cret\n"
        );
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = resolve(
            r#"
            image = "mysql:8"
            host = "10.0.0.1"
            env.secret = ["NOPE"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn labels_and_options() {
        let config = resolve(
            r#"
            image = "redis:7"
            host = "10.0.0.1"
            labels = { tier = "cache" }
            options = { memory = "1g", cpus = 2, init = true, privileged = false }
            "#,
        )
        .unwrap();

        assert_eq!(
            config.label_args,
            ["--label", "service=redis", "--label", "tier=cache"]
        );
        assert_eq!(
            config.option_args,
            ["--cpus", "2", "--init", "--memory", "1g"]
        );
    }

    #[test]
    fn fractional_options_are_accepted() {
        let config = resolve(
            r#"
            image = "redis:7"
            host = "10.0.0.1"
            options = { cpus = 0.5 }
            "#,
        )
        .unwrap();

        assert_eq!(config.option_args, ["--cpus", "0.5"]);
    }

    #[test]
    fn no_hosts_is_rejected() {
        let err = resolve(r#"image = "redis:7""#).unwrap_err();
        assert!(matches!(err, ConfigError::NoHosts { .. }));
    }

    #[test]
    fn image_is_required() {
        let err = resolve(r#"host = "10.0.0.1""#).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { key } if key == "accessories.redis.image"));
    }

    #[test]
    fn proxy_table_enables_running_proxy() {
        let config = resolve(
            r#"
            image = "grafana/grafana"
            host = "10.0.0.1"
            [proxy]
            host = "grafana.example.com"
            app_port = 3000
            "#,
        )
        .unwrap();
        assert!(config.running_proxy);
        assert_eq!(config.proxy.app_port, 3000);
    }
}

//! Reverse-proxy registration settings for an accessory.

use std::time::Duration;

use serde::Deserialize;

use crate::commands::shell_escape;

/// Health check settings forwarded to the proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyHealthcheck {
    /// Path probed by the proxy (e.g. `/up`).
    pub path: Option<String>,
    /// Time between probes.
    pub interval: Option<Duration>,
    /// Per-probe timeout.
    pub timeout: Option<Duration>,
}

/// How an accessory is exposed behind the reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Hostnames routed to this accessory.
    pub hosts: Vec<String>,
    /// Port the accessory listens on inside its container.
    pub app_port: u16,
    /// Whether the proxy terminates TLS for these hosts.
    pub ssl: bool,
    pub deploy_timeout: Option<Duration>,
    pub drain_timeout: Option<Duration>,
    pub response_timeout: Option<Duration>,
    pub healthcheck: ProxyHealthcheck,
    pub path_prefix: Option<String>,
    pub strip_path_prefix: Option<bool>,
    pub forward_headers: Option<bool>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            hosts: Vec::new(),
            app_port: 80,
            ssl: false,
            deploy_timeout: None,
            drain_timeout: None,
            response_timeout: None,
            healthcheck: ProxyHealthcheck::default(),
            path_prefix: None,
            strip_path_prefix: None,
            forward_headers: None,
        }
    }
}

impl ProxyConfig {
    /// Arguments for the proxy's `deploy` subcommand.
    pub fn deploy_command_args(&self, target: &str) -> Vec<String> {
        let mut args = vec![self.target_arg(target)];

        if !self.hosts.is_empty() {
            args.push(option("host", &self.hosts.join(",")));
        }
        if self.ssl {
            args.push("--tls".to_string());
        }

        let timeouts = [
            ("deploy-timeout", self.deploy_timeout),
            ("drain-timeout", self.drain_timeout),
            ("health-check-interval", self.healthcheck.interval),
            ("health-check-timeout", self.healthcheck.timeout),
            ("target-timeout", self.response_timeout),
        ];
        if let Some(path) = &self.healthcheck.path {
            args.push(option("health-check-path", path));
        }
        for (key, value) in timeouts {
            if let Some(value) = value {
                args.push(option(key, &seconds(value)));
            }
        }

        if let Some(prefix) = &self.path_prefix {
            args.push(option("path-prefix", prefix));
        }
        if let Some(strip) = self.strip_path_prefix {
            args.push(option("strip-path-prefix", &strip.to_string()));
        }
        if let Some(forward) = self.forward_headers {
            args.push(option("forward-headers", &forward.to_string()));
        }

        args
    }

    /// Arguments for the proxy's `remove` subcommand.
    pub fn remove_command_args(&self, target: &str) -> Vec<String> {
        vec![self.target_arg(target)]
    }

    fn target_arg(&self, target: &str) -> String {
        option("target", &format!("{target}:{}", self.app_port))
    }
}

fn option(key: &str, value: &str) -> String {
    format!("--{key}={}", shell_escape(value))
}

fn seconds(d: Duration) -> String {
    format!("{}s", d.as_secs())
}

/// `[accessories.<name>.proxy]` table as written in the config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawProxy {
    host: Option<String>,
    #[serde(default)]
    hosts: Vec<String>,
    app_port: Option<u16>,
    #[serde(default)]
    ssl: bool,
    deploy_timeout: Option<u64>,
    drain_timeout: Option<u64>,
    response_timeout: Option<u64>,
    #[serde(default)]
    healthcheck: RawHealthcheck,
    path_prefix: Option<String>,
    strip_path_prefix: Option<bool>,
    forward_headers: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHealthcheck {
    path: Option<String>,
    interval: Option<u64>,
    timeout: Option<u64>,
}

impl From<RawProxy> for ProxyConfig {
    fn from(raw: RawProxy) -> Self {
        let defaults = Self::default();
        let mut hosts: Vec<String> = raw.host.into_iter().collect();
        hosts.extend(raw.hosts);

        Self {
            hosts,
            app_port: raw.app_port.unwrap_or(defaults.app_port),
            ssl: raw.ssl,
            deploy_timeout: raw.deploy_timeout.map(Duration::from_secs),
            drain_timeout: raw.drain_timeout.map(Duration::from_secs),
            response_timeout: raw.response_timeout.map(Duration::from_secs),
            healthcheck: ProxyHealthcheck {
                path: raw.healthcheck.path,
                interval: raw.healthcheck.interval.map(Duration::from_secs),
                timeout: raw.healthcheck.timeout.map(Duration::from_secs),
            },
            path_prefix: raw.path_prefix,
            strip_path_prefix: raw.strip_path_prefix,
            forward_headers: raw.forward_headers,
        }
    }
}

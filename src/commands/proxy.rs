//! Commands for the reverse proxy's control surface.
//!
//! The proxy runs in its own container; registering or deregistering a
//! target means exec-ing its control binary there. Reachability and success
//! are left to the exit status of the executed command.

use crate::commands::Command;

/// Builds `docker exec <proxy> <binary> ...` invocations.
#[derive(Debug, Clone, Copy)]
pub struct ProxyCommands<'a> {
    container_name: &'a str,
    binary: &'a str,
}

impl<'a> ProxyCommands<'a> {
    pub fn new(container_name: &'a str, binary: &'a str) -> Self {
        Self {
            container_name,
            binary,
        }
    }

    /// Route `service` to a target.
    pub fn deploy(&self, service: &str, args: Vec<String>) -> Command {
        self.exec("deploy", service, args)
    }

    /// Stop routing `service` to a target.
    pub fn remove(&self, service: &str, args: Vec<String>) -> Command {
        self.exec("remove", service, args)
    }

    fn exec(&self, subcommand: &str, service: &str, args: Vec<String>) -> Command {
        Command::docker()
            .arg("exec")
            .arg(self.container_name)
            .arg(self.binary)
            .arg(subcommand)
            .arg(service)
            .args(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deploy_execs_into_proxy_container() {
        let proxy = ProxyCommands::new("kamal-proxy", "kamal-proxy");
        let cmd = proxy.deploy("grafana", vec!["--target=grafana:3000".into()]);
        assert_eq!(
            cmd.to_string(),
            "docker exec kamal-proxy kamal-proxy deploy grafana --target=grafana:3000"
        );
    }

    #[test]
    fn remove_uses_configured_names() {
        let proxy = ProxyCommands::new("edge", "edge-ctl");
        let cmd = proxy.remove("grafana", vec!["--target=grafana:3000".into()]);
        assert_eq!(
            cmd.tokens(),
            [
                "docker",
                "exec",
                "edge",
                "edge-ctl",
                "remove",
                "grafana",
                "--target=grafana:3000"
            ]
        );
    }
}
